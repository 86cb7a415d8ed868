//! Container: looks beans up by name, builds them on a cache miss, caches singletons.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::bean::Bean;
use crate::cache::InstanceCache;
use crate::description::{BeanDescription, DescriptionSource};
use crate::factory::BeanFactory;
use crate::intercept::{InvocationObserver, TracingObserver};
use crate::naming::{NamingStrategy, TypeNameConvention};
use crate::registry::TypeRegistry;
use crate::ContainerError;

/// What happens when a post-construct callback fails. `init` failures always abort the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookFailurePolicy {
    /// Abort the build and return the error.
    #[default]
    Propagate,
    /// Log a warning and carry on with the next hook.
    Log,
}

/// Container behaviour that configuration may change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContainerSettings {
    /// Resolve every description, in declared order, when the container is built.
    pub eager_init: bool,
    pub post_construct_failure: HookFailurePolicy,
}

static NEXT_CONTAINER_ID: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    /// (container id, bean name) currently being resolved on this thread.
    static RESOLVING: RefCell<Vec<(usize, String)>> = const { RefCell::new(Vec::new()) };
}

struct ResolutionGuard;

impl ResolutionGuard {
    fn enter(container: usize, name: &str) -> Result<Self, ContainerError> {
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(start) = stack
                .iter()
                .position(|(id, pending)| *id == container && pending == name)
            {
                let path: Vec<&str> = stack[start..]
                    .iter()
                    .filter(|(id, _)| *id == container)
                    .map(|(_, pending)| pending.as_str())
                    .chain(std::iter::once(name))
                    .collect();
                return Err(ContainerError::Circular(path.join(" -> ")));
            }
            stack.push((container, name.to_owned()));
            Ok(ResolutionGuard)
        })
    }
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        RESOLVING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// IoC container: descriptions in declared order, a type registry, the singleton cache.
pub struct Container {
    id: usize,
    descriptions: Vec<BeanDescription>,
    index: HashMap<String, usize>,
    registry: TypeRegistry,
    instances: InstanceCache,
    factory: BeanFactory,
}

impl Container {
    pub fn builder(registry: TypeRegistry) -> ContainerBuilder {
        ContainerBuilder::new(registry)
    }

    /// Container over `source` with default settings.
    pub fn new(
        registry: TypeRegistry,
        source: impl DescriptionSource + 'static,
    ) -> Result<Self, ContainerError> {
        Self::builder(registry).source(source).build()
    }

    /// Container with no descriptions: every lookup fails with `NoSuchBean`.
    pub fn empty() -> Self {
        Self::assemble(Vec::new(), HashMap::new(), TypeRegistry::new(), BeanFactory::default())
    }

    fn assemble(
        descriptions: Vec<BeanDescription>,
        index: HashMap<String, usize>,
        registry: TypeRegistry,
        factory: BeanFactory,
    ) -> Self {
        Self {
            id: NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed),
            descriptions,
            index,
            registry,
            instances: InstanceCache::new(),
            factory,
        }
    }

    /// Bean by name. Singletons are built once and then served from the cache;
    /// prototypes are built on every call and never cached.
    pub fn get_bean(&self, name: &str) -> Result<Bean, ContainerError> {
        let description = self
            .description(name)
            .ok_or_else(|| ContainerError::NoSuchBean(name.to_owned()))?;
        let _guard = ResolutionGuard::enter(self.id, name)?;
        if description.is_prototype() {
            return self.create(description);
        }
        self.instances
            .get_or_try_insert_with(name, || self.create(description))
    }

    /// Bean by name as its published form, e.g. `get::<Arc<dyn TweetService>>("tweetService")`.
    pub fn get<P: Any + Clone>(&self, name: &str) -> Result<P, ContainerError> {
        let bean = self.get_bean(name)?;
        bean.get::<P>().ok_or_else(|| ContainerError::TypeMismatch {
            name: name.to_owned(),
            expected: std::any::type_name::<P>(),
        })
    }

    fn create(&self, description: &BeanDescription) -> Result<Bean, ContainerError> {
        let bean_type =
            self.registry
                .get(description.type_name())
                .ok_or_else(|| ContainerError::UnknownType {
                    name: description.name().to_owned(),
                    type_name: description.type_name().to_owned(),
                })?;
        self.factory.build(description, bean_type, self)
    }

    /// Names of all descriptions, in declared order.
    pub fn bean_names(&self) -> Vec<&str> {
        self.descriptions.iter().map(BeanDescription::name).collect()
    }

    pub fn descriptions(&self) -> &[BeanDescription] {
        &self.descriptions
    }

    pub fn description(&self, name: &str) -> Option<&BeanDescription> {
        self.index.get(name).map(|&i| &self.descriptions[i])
    }

    pub fn contains_bean(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// True once the singleton `name` has been built.
    pub fn is_instantiated(&self, name: &str) -> bool {
        self.instances.contains(name)
    }

    /// Number of singletons built so far.
    pub fn singleton_count(&self) -> usize {
        self.instances.len()
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Resolve every description in declared order. Prototypes are built and dropped,
    /// which still runs their lifecycle hooks once.
    pub fn preinstantiate(&self) -> Result<(), ContainerError> {
        for description in &self.descriptions {
            self.get_bean(description.name())?;
        }
        tracing::debug!(singletons = self.singleton_count(), "container preinstantiated");
        Ok(())
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::empty()
    }
}

/// Collects descriptions, settings, naming strategy and observer, then validates and builds.
pub struct ContainerBuilder {
    registry: TypeRegistry,
    sources: Vec<Box<dyn DescriptionSource>>,
    settings: ContainerSettings,
    naming: Box<dyn NamingStrategy>,
    observer: Arc<dyn InvocationObserver>,
}

impl ContainerBuilder {
    pub fn new(registry: TypeRegistry) -> Self {
        Self {
            registry,
            sources: Vec::new(),
            settings: ContainerSettings::default(),
            naming: Box::new(TypeNameConvention),
            observer: Arc::new(TracingObserver),
        }
    }

    /// Add a description source; sources are read in the order they were added.
    pub fn source(mut self, source: impl DescriptionSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn bean(self, description: BeanDescription) -> Self {
        self.source(vec![description])
    }

    pub fn settings(mut self, settings: ContainerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn naming(mut self, naming: impl NamingStrategy + 'static) -> Self {
        self.naming = Box::new(naming);
        self
    }

    /// Sink for benchmark timings. Defaults to [`TracingObserver`].
    pub fn observer(mut self, observer: Arc<dyn InvocationObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn build(self) -> Result<Container, ContainerError> {
        let mut descriptions = Vec::new();
        for source in &self.sources {
            descriptions.extend(source.descriptions().map_err(ContainerError::Source)?);
        }

        let mut index = HashMap::with_capacity(descriptions.len());
        for (i, description) in descriptions.iter().enumerate() {
            if description.name().is_empty() {
                return Err(ContainerError::EmptyName);
            }
            if !self.registry.contains(description.type_name()) {
                return Err(ContainerError::UnknownType {
                    name: description.name().to_owned(),
                    type_name: description.type_name().to_owned(),
                });
            }
            if index.insert(description.name().to_owned(), i).is_some() {
                return Err(ContainerError::DuplicateName(description.name().to_owned()));
            }
        }

        let factory = BeanFactory::new(
            self.naming,
            self.observer,
            self.settings.post_construct_failure,
        );
        let container = Container::assemble(descriptions, index, self.registry, factory);
        tracing::debug!(
            beans = container.descriptions.len(),
            types = container.registry.len(),
            "container built"
        );
        if self.settings.eager_init {
            container.preinstantiate()?;
        }
        Ok(container)
    }
}
