//! Sprig core: bean descriptions, type registry, bean factory, lifecycle hooks, interception.

pub mod bean;
pub mod cache;
pub mod container;
pub mod description;
pub mod factory;
pub mod intercept;
pub mod naming;
pub mod registry;

pub use bean::Bean;
pub use cache::{InstanceCache, WouldDeadlock};
pub use container::{Container, ContainerBuilder, ContainerSettings, HookFailurePolicy};
pub use description::{BeanDescription, DescriptionSource, Scope};
pub use factory::BeanFactory;
pub use intercept::{
    Intercepted, InvocationObserver, InvocationTiming, MethodTable, RecordingObserver,
    TracingObserver,
};
pub use naming::{lower_first, simple_type_name, NamingStrategy, TypeNameConvention, WiringTable};
pub use registry::{Args, BeanType, BeanTypeBuilder, Dependency, HookResult, TypeRegistry};

use std::fmt;
use thiserror::Error;

/// Boxed error returned by constructors, hooks and description sources.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Lifecycle hook kind, used in error messages and logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookKind {
    PostConstruct,
    Init,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookKind::PostConstruct => f.write_str("post-construct"),
            HookKind::Init => f.write_str("init"),
        }
    }
}

/// Errors raised while declaring bean types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("bean type `{0}` declares no constructor")]
    MissingConstructor(String),
    #[error("bean type `{0}` declares more than one constructor")]
    DuplicateConstructor(String),
    #[error("bean type `{0}` declares more than one init method")]
    DuplicateInit(String),
    #[error("bean type `{type_name}` marks method `{method}` for benchmarking more than once")]
    DuplicateBenchmark { type_name: String, method: String },
    #[error("bean type `{0}` has benchmark markers but no interception adapter")]
    MissingInterceptor(String),
    #[error("bean type `{0}` is already registered")]
    DuplicateType(String),
}

/// Errors raised while pulling constructor arguments out of [`Args`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("constructor of `{type_name}` asked for more than its {declared} declared parameter(s)")]
    Exhausted { type_name: String, declared: usize },
    #[error("dependency `{bean}` of `{type_name}` is not a `{expected}`")]
    TypeMismatch {
        type_name: String,
        bean: String,
        expected: &'static str,
    },
}

/// Errors raised by the container while building or looking up beans.
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("no bean named `{0}`")]
    NoSuchBean(String),
    #[error("bean `{bean}`: cannot resolve dependency `{dependency}`")]
    Dependency {
        bean: String,
        dependency: String,
        #[source]
        source: Box<ContainerError>,
    },
    #[error("failed to construct bean `{name}`")]
    Construction {
        name: String,
        #[source]
        source: BoxError,
    },
    #[error("{hook} hook `{method}` of bean `{name}` failed")]
    LifecycleHook {
        name: String,
        hook: HookKind,
        method: String,
        #[source]
        source: BoxError,
    },
    #[error("bean `{name}` is not a `{expected}`")]
    TypeMismatch { name: String, expected: &'static str },
    #[error("bean `{name}` refers to unregistered type `{type_name}`")]
    UnknownType { name: String, type_name: String },
    #[error("bean name `{0}` is declared more than once")]
    DuplicateName(String),
    #[error("bean description with an empty name")]
    EmptyName,
    #[error("circular dependency: {0}")]
    Circular(String),
    #[error("description source failed")]
    Source(#[source] BoxError),
}

impl ContainerError {
    /// Innermost error, looking through dependency wrapping.
    pub fn root(&self) -> &ContainerError {
        let mut current = self;
        while let ContainerError::Dependency { source, .. } = current {
            current = source;
        }
        current
    }

    /// True when the root cause is a missing bean definition.
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), ContainerError::NoSuchBean(_))
    }
}
