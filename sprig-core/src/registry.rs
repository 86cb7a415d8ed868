//! Type registry: explicit per-type metadata in place of runtime reflection.
//!
//! Each bean type is declared once with its constructor (and the types of its
//! parameters), its lifecycle hooks, its benchmark markers and how the finished
//! instance is published. The factory drives these steps in a fixed order.

use std::any::Any;
use std::borrow::Cow;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::bean::Bean;
use crate::intercept::{Intercepted, MethodTable};
use crate::naming::simple_type_name;
use crate::{ArgumentError, BoxError, RegistrationError};

pub(crate) type Instance = Box<dyn Any + Send + Sync>;
pub(crate) type Published = Arc<dyn Any + Send + Sync>;

type ConstructFn = Box<dyn Fn(&mut Args) -> Result<Instance, BoxError> + Send + Sync>;
type HookFn = Box<dyn Fn(&mut (dyn Any + Send + Sync)) -> Result<(), BoxError> + Send + Sync>;
type PublishFn = Box<dyn Fn(Instance) -> Result<Published, BoxError> + Send + Sync>;
type InterceptFn = Box<dyn Fn(Instance, Interception) -> Result<Published, BoxError> + Send + Sync>;

/// A declared constructor parameter, identified by its type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    type_name: Cow<'static, str>,
}

impl Dependency {
    /// Dependency on `T`, e.g. `Dependency::of::<dyn TweetRepository>()`.
    pub fn of<T: ?Sized>() -> Self {
        Self {
            type_name: Cow::Borrowed(simple_type_name::<T>()),
        }
    }

    /// Dependency given by type name only.
    pub fn named(type_name: impl Into<String>) -> Self {
        Self {
            type_name: Cow::Owned(type_name.into()),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

/// Resolved constructor arguments, in declaration order.
pub struct Args {
    type_name: String,
    declared: usize,
    resolved: std::vec::IntoIter<Bean>,
}

impl Args {
    pub(crate) fn new(type_name: &str, resolved: Vec<Bean>) -> Self {
        Self {
            type_name: type_name.to_owned(),
            declared: resolved.len(),
            resolved: resolved.into_iter(),
        }
    }

    /// Take the next argument as its published form (`Arc<T>`, `Arc<dyn Trait>`, ...).
    pub fn next<P: Any + Clone>(&mut self) -> Result<P, ArgumentError> {
        let bean = self.resolved.next().ok_or_else(|| ArgumentError::Exhausted {
            type_name: self.type_name.clone(),
            declared: self.declared,
        })?;
        bean.get::<P>().ok_or_else(|| ArgumentError::TypeMismatch {
            type_name: self.type_name.clone(),
            bean: bean.name().to_owned(),
            expected: std::any::type_name::<P>(),
        })
    }

    /// Take the next argument as a raw bean handle.
    pub fn next_bean(&mut self) -> Result<Bean, ArgumentError> {
        self.resolved.next().ok_or_else(|| ArgumentError::Exhausted {
            type_name: self.type_name.clone(),
            declared: self.declared,
        })
    }

    pub fn remaining(&self) -> usize {
        self.resolved.len()
    }
}

/// Hook return values: `()` or `Result<(), E>`.
pub trait HookResult {
    fn into_result(self) -> Result<(), BoxError>;
}

impl HookResult for () {
    fn into_result(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<E: Into<BoxError>> HookResult for Result<(), E> {
    fn into_result(self) -> Result<(), BoxError> {
        self.map_err(Into::into)
    }
}

pub(crate) struct Hook {
    pub(crate) method: String,
    pub(crate) call: HookFn,
}

/// Everything the interception adapter needs besides the instance.
pub(crate) struct Interception {
    pub(crate) bean: Arc<str>,
    pub(crate) methods: Arc<MethodTable>,
    pub(crate) observer: Arc<dyn crate::intercept::InvocationObserver>,
}

/// Registered metadata for one bean type.
pub struct BeanType {
    type_name: String,
    params: Vec<Dependency>,
    construct: ConstructFn,
    pub(crate) post_construct: Vec<Hook>,
    pub(crate) init: Option<Hook>,
    pub(crate) benchmarks: Arc<MethodTable>,
    publish: PublishFn,
    intercept: Option<InterceptFn>,
}

impl BeanType {
    /// Start declaring `T`, named by its simple type name.
    pub fn of<T: Any + Send + Sync>() -> BeanTypeBuilder<T> {
        BeanTypeBuilder::new(simple_type_name::<T>().to_owned())
    }

    /// Start declaring `T` under an explicit type name.
    pub fn named<T: Any + Send + Sync>(type_name: impl Into<String>) -> BeanTypeBuilder<T> {
        BeanTypeBuilder::new(type_name.into())
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Declared constructor parameters, in order.
    pub fn params(&self) -> &[Dependency] {
        &self.params
    }

    /// True when at least one method carries a benchmark marker.
    pub fn is_intercepted(&self) -> bool {
        !self.benchmarks.is_empty()
    }

    pub fn benchmarks(&self) -> &MethodTable {
        &self.benchmarks
    }

    pub(crate) fn construct(&self, args: &mut Args) -> Result<Instance, BoxError> {
        (self.construct)(args)
    }

    pub(crate) fn publish(&self, instance: Instance) -> Result<Published, BoxError> {
        (self.publish)(instance)
    }

    pub(crate) fn intercept(
        &self,
        instance: Instance,
        interception: Interception,
    ) -> Result<Published, BoxError> {
        match &self.intercept {
            Some(f) => f(instance, interception),
            None => Err(format!("bean type `{}` has no interception adapter", self.type_name).into()),
        }
    }
}

fn unexpected_instance<T>() -> BoxError {
    format!("instance is not a `{}`", std::any::type_name::<T>()).into()
}

/// Builder for [`BeanType`]. Conflicting declarations are reported by `build`.
pub struct BeanTypeBuilder<T> {
    type_name: String,
    constructor: Option<(Vec<Dependency>, ConstructFn)>,
    post_construct: Vec<Hook>,
    init: Option<Hook>,
    benchmarks: MethodTable,
    publish: Option<PublishFn>,
    intercept: Option<InterceptFn>,
    error: Option<RegistrationError>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> BeanTypeBuilder<T> {
    fn new(type_name: String) -> Self {
        Self {
            type_name,
            constructor: None,
            post_construct: Vec::new(),
            init: None,
            benchmarks: MethodTable::default(),
            publish: None,
            intercept: None,
            error: None,
            _marker: PhantomData,
        }
    }

    fn fail(&mut self, error: RegistrationError) {
        self.error.get_or_insert(error);
    }

    /// The single constructor. `params` lists the declared parameter types in order;
    /// `f` receives them resolved, in the same order.
    pub fn constructor<F, E>(mut self, params: impl IntoIterator<Item = Dependency>, f: F) -> Self
    where
        F: Fn(&mut Args) -> Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        if self.constructor.is_some() {
            let name = self.type_name.clone();
            self.fail(RegistrationError::DuplicateConstructor(name));
            return self;
        }
        let construct: ConstructFn =
            Box::new(move |args| f(args).map(|t| Box::new(t) as Instance).map_err(Into::into));
        self.constructor = Some((params.into_iter().collect(), construct));
        self
    }

    /// Zero-parameter constructor through `Default`.
    pub fn default_constructor(self) -> Self
    where
        T: Default,
    {
        self.constructor(Vec::new(), |_| Ok::<_, std::convert::Infallible>(T::default()))
    }

    /// Post-construct callback. Several may be declared; they run in declaration order.
    pub fn post_construct<F, R>(mut self, method: &str, f: F) -> Self
    where
        F: Fn(&mut T) -> R + Send + Sync + 'static,
        R: HookResult,
    {
        self.post_construct.push(Hook {
            method: method.to_owned(),
            call: typed_hook(f),
        });
        self
    }

    /// The reserved `init` method, run after every post-construct callback.
    pub fn init<F, R>(mut self, f: F) -> Self
    where
        F: Fn(&mut T) -> R + Send + Sync + 'static,
        R: HookResult,
    {
        if self.init.is_some() {
            let name = self.type_name.clone();
            self.fail(RegistrationError::DuplicateInit(name));
            return self;
        }
        self.init = Some(Hook {
            method: "init".to_owned(),
            call: typed_hook(f),
        });
        self
    }

    /// Mark `method` for benchmarking (enabled).
    pub fn benchmark(self, method: &str) -> Self {
        self.benchmark_with(method, true)
    }

    /// Mark `method` for benchmarking with an explicit `enabled` flag. A disabled
    /// marker still makes the type intercepted; calls to that method are just not timed.
    pub fn benchmark_with(mut self, method: &str, enabled: bool) -> Self {
        if !self.benchmarks.insert(method, enabled) {
            let error = RegistrationError::DuplicateBenchmark {
                type_name: self.type_name.clone(),
                method: method.to_owned(),
            };
            self.fail(error);
        }
        self
    }

    /// Published form of the finished bean, e.g. `|b| Arc::new(b) as Arc<dyn Service>`.
    /// Without this the bean is published as `Arc<T>`.
    pub fn expose<P, F>(mut self, f: F) -> Self
    where
        P: Any + Send + Sync,
        F: Fn(T) -> P + Send + Sync + 'static,
    {
        let publish: PublishFn = Box::new(move |instance: Instance| {
            let t = instance.downcast::<T>().map_err(|_| unexpected_instance::<T>())?;
            Ok(Arc::new(f(*t)) as Published)
        });
        self.publish = Some(publish);
        self
    }

    /// Published form of the bean once wrapped in the benchmark decorator.
    /// Only used when at least one benchmark marker is declared.
    pub fn intercept<P, F>(mut self, f: F) -> Self
    where
        P: Any + Send + Sync,
        F: Fn(Intercepted<T>) -> P + Send + Sync + 'static,
    {
        let intercept: InterceptFn = Box::new(move |instance: Instance, interception: Interception| {
            let t = instance.downcast::<T>().map_err(|_| unexpected_instance::<T>())?;
            let proxy = Intercepted::new(
                *t,
                interception.bean,
                interception.methods,
                interception.observer,
            );
            Ok(Arc::new(f(proxy)) as Published)
        });
        self.intercept = Some(intercept);
        self
    }

    pub fn build(self) -> Result<BeanType, RegistrationError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let (params, construct) = self
            .constructor
            .ok_or_else(|| RegistrationError::MissingConstructor(self.type_name.clone()))?;
        if !self.benchmarks.is_empty() && self.intercept.is_none() {
            return Err(RegistrationError::MissingInterceptor(self.type_name));
        }
        let publish = self.publish.unwrap_or_else(|| {
            Box::new(|instance: Instance| {
                let t = instance.downcast::<T>().map_err(|_| unexpected_instance::<T>())?;
                Ok(Arc::new(Arc::<T>::from(t)) as Published)
            }) as PublishFn
        });
        Ok(BeanType {
            type_name: self.type_name,
            params,
            construct,
            post_construct: self.post_construct,
            init: self.init,
            benchmarks: Arc::new(self.benchmarks),
            publish,
            intercept: self.intercept,
        })
    }
}

fn typed_hook<T, F, R>(f: F) -> HookFn
where
    T: Any + Send + Sync,
    F: Fn(&mut T) -> R + Send + Sync + 'static,
    R: HookResult,
{
    Box::new(move |instance: &mut (dyn Any + Send + Sync)| {
        let t = instance
            .downcast_mut::<T>()
            .ok_or_else(unexpected_instance::<T>)?;
        f(t).into_result()
    })
}

/// Bean types by type name.
#[derive(Default)]
pub struct TypeRegistry {
    types: HashMap<String, Arc<BeanType>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finish a declaration and store it under its type name.
    pub fn register<T: Any + Send + Sync>(
        &mut self,
        builder: BeanTypeBuilder<T>,
    ) -> Result<&mut Self, RegistrationError> {
        let bean_type = builder.build()?;
        self.insert(bean_type)
    }

    pub fn insert(&mut self, bean_type: BeanType) -> Result<&mut Self, RegistrationError> {
        if self.types.contains_key(bean_type.type_name()) {
            return Err(RegistrationError::DuplicateType(bean_type.type_name().to_owned()));
        }
        self.types
            .insert(bean_type.type_name().to_owned(), Arc::new(bean_type));
        Ok(self)
    }

    pub fn get(&self, type_name: &str) -> Option<&Arc<BeanType>> {
        self.types.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Plain;

    #[test]
    fn missing_constructor_is_rejected() {
        let err = BeanType::of::<Plain>().build().err();
        assert_eq!(err, Some(RegistrationError::MissingConstructor("Plain".into())));
    }

    #[test]
    fn second_constructor_is_rejected() {
        let err = BeanType::of::<Plain>()
            .default_constructor()
            .default_constructor()
            .build()
            .err();
        assert_eq!(err, Some(RegistrationError::DuplicateConstructor("Plain".into())));
    }

    #[test]
    fn second_init_is_rejected() {
        let err = BeanType::of::<Plain>()
            .default_constructor()
            .init(|_: &mut Plain| {})
            .init(|_: &mut Plain| {})
            .build()
            .err();
        assert_eq!(err, Some(RegistrationError::DuplicateInit("Plain".into())));
    }

    #[test]
    fn benchmark_without_interceptor_is_rejected() {
        let err = BeanType::of::<Plain>()
            .default_constructor()
            .benchmark("run")
            .build()
            .err();
        assert_eq!(err, Some(RegistrationError::MissingInterceptor("Plain".into())));
    }

    #[test]
    fn duplicate_benchmark_marker_is_rejected() {
        let err = BeanType::of::<Plain>()
            .default_constructor()
            .benchmark("run")
            .benchmark_with("run", false)
            .intercept(|p: Intercepted<Plain>| Arc::new(p))
            .build()
            .err();
        assert_eq!(
            err,
            Some(RegistrationError::DuplicateBenchmark {
                type_name: "Plain".into(),
                method: "run".into(),
            })
        );
    }

    #[test]
    fn registry_rejects_duplicate_type() {
        let mut registry = TypeRegistry::new();
        registry
            .register(BeanType::of::<Plain>().default_constructor())
            .unwrap();
        let err = registry
            .register(BeanType::of::<Plain>().default_constructor())
            .err();
        assert_eq!(err, Some(RegistrationError::DuplicateType("Plain".into())));
        assert_eq!(registry.len(), 1);
    }
}
