//! Bean factory: turns a description into a live instance.
//!
//! Steps, in order: resolve constructor dependencies through the container,
//! construct, run post-construct callbacks, run `init`, publish (wrapped in the
//! benchmark decorator when the type carries a marker).

use std::sync::Arc;

use crate::bean::Bean;
use crate::container::{Container, HookFailurePolicy};
use crate::description::BeanDescription;
use crate::intercept::{InvocationObserver, TracingObserver};
use crate::naming::{NamingStrategy, TypeNameConvention};
use crate::registry::{Args, BeanType, Hook, Instance, Interception};
use crate::{ContainerError, HookKind};

pub struct BeanFactory {
    naming: Box<dyn NamingStrategy>,
    observer: Arc<dyn InvocationObserver>,
    post_construct_failure: HookFailurePolicy,
}

impl BeanFactory {
    pub fn new(
        naming: Box<dyn NamingStrategy>,
        observer: Arc<dyn InvocationObserver>,
        post_construct_failure: HookFailurePolicy,
    ) -> Self {
        Self {
            naming,
            observer,
            post_construct_failure,
        }
    }

    /// Bean name a dependency resolves to under this factory's naming strategy.
    pub fn dependency_name(&self, dependency: &crate::registry::Dependency) -> String {
        self.naming.bean_name(dependency)
    }

    /// Build one instance of `description`. Dependencies go through `container.get_bean`,
    /// so they are cached or rebuilt according to their own scope.
    pub fn build(
        &self,
        description: &BeanDescription,
        bean_type: &BeanType,
        container: &Container,
    ) -> Result<Bean, ContainerError> {
        let name = description.name();
        let mut resolved = Vec::with_capacity(bean_type.params().len());
        for dependency in bean_type.params() {
            let dependency_name = self.dependency_name(dependency);
            let bean = container
                .get_bean(&dependency_name)
                .map_err(|source| ContainerError::Dependency {
                    bean: name.to_owned(),
                    dependency: dependency_name,
                    source: Box::new(source),
                })?;
            resolved.push(bean);
        }

        let mut args = Args::new(bean_type.type_name(), resolved);
        let mut instance = bean_type
            .construct(&mut args)
            .map_err(|source| ContainerError::Construction {
                name: name.to_owned(),
                source,
            })?;

        for hook in &bean_type.post_construct {
            if let Err(error) = run_hook(name, HookKind::PostConstruct, hook, &mut instance) {
                match self.post_construct_failure {
                    HookFailurePolicy::Propagate => return Err(error),
                    HookFailurePolicy::Log => {
                        tracing::warn!(
                            bean = name,
                            method = %hook.method,
                            error = %error,
                            "post-construct hook failed; continuing"
                        );
                    }
                }
            }
        }
        if let Some(init) = &bean_type.init {
            run_hook(name, HookKind::Init, init, &mut instance)?;
        }

        let published = if bean_type.is_intercepted() {
            let interception = Interception {
                bean: Arc::from(name),
                methods: Arc::clone(&bean_type.benchmarks),
                observer: Arc::clone(&self.observer),
            };
            tracing::debug!(
                bean = name,
                first_marked = bean_type.benchmarks().first_marked().unwrap_or_default(),
                "wrapping bean in benchmark decorator"
            );
            bean_type.intercept(instance, interception)
        } else {
            bean_type.publish(instance)
        }
        .map_err(|source| ContainerError::Construction {
            name: name.to_owned(),
            source,
        })?;

        tracing::debug!(
            bean = name,
            type_name = bean_type.type_name(),
            scope = ?description.scope(),
            "bean created"
        );
        Ok(Bean::new(name, published))
    }
}

impl Default for BeanFactory {
    fn default() -> Self {
        Self::new(
            Box::new(TypeNameConvention),
            Arc::new(TracingObserver),
            HookFailurePolicy::default(),
        )
    }
}

fn run_hook(
    name: &str,
    hook_kind: HookKind,
    hook: &Hook,
    instance: &mut Instance,
) -> Result<(), ContainerError> {
    (hook.call)(&mut **instance).map_err(|source| ContainerError::LifecycleHook {
        name: name.to_owned(),
        hook: hook_kind,
        method: hook.method.clone(),
        source,
    })
}
