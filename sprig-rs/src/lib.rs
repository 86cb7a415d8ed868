//! Sprig for Rust: IoC container facade, JSON bean configuration, `#[intercepted]` decorators.

pub mod config;
pub mod logging;
pub mod tweets;

pub use config::{BeanSpec, ConfigError, ContextConfig};
pub use logging::{init_logging, level_filter, parse_log_level, LoggingConfig, LoggingError};
pub use sprig_core::{
    lower_first, simple_type_name, ArgumentError, Args, Bean, BeanDescription, BeanFactory,
    BeanType, BeanTypeBuilder, BoxError, Container, ContainerBuilder, ContainerError,
    ContainerSettings, Dependency, DescriptionSource, HookFailurePolicy, HookKind, HookResult,
    Intercepted, InvocationObserver, InvocationTiming, MethodTable, NamingStrategy,
    RecordingObserver, RegistrationError, Scope, TracingObserver, TypeNameConvention,
    TypeRegistry, WiringTable,
};
pub use sprig_rs_macros::intercepted;
