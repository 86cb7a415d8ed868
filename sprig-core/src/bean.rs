//! Live bean handle handed out by the container.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Shared handle to a constructed bean. Cloning is cheap; singleton lookups
/// hand out clones of the same handle, so [`Bean::ptr_eq`] tells instances apart.
#[derive(Clone)]
pub struct Bean {
    name: Arc<str>,
    instance: Arc<dyn Any + Send + Sync>,
}

impl Bean {
    pub(crate) fn new(name: &str, instance: Arc<dyn Any + Send + Sync>) -> Self {
        Self {
            name: Arc::from(name),
            instance,
        }
    }

    /// Name of the description this bean was built from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Borrow the published value (`Arc<T>` by default, or whatever the type exposes).
    pub fn downcast_ref<P: Any>(&self) -> Option<&P> {
        self.instance.downcast_ref::<P>()
    }

    /// Clone the published value out, e.g. `bean.get::<Arc<dyn TweetService>>()`.
    pub fn get<P: Any + Clone>(&self) -> Option<P> {
        self.downcast_ref::<P>().cloned()
    }

    pub fn is<P: Any>(&self) -> bool {
        self.instance.is::<P>()
    }

    /// Identity comparison: true only for handles to the same instance.
    pub fn ptr_eq(&self, other: &Bean) -> bool {
        Arc::ptr_eq(&self.instance, &other.instance)
    }
}

impl fmt::Debug for Bean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bean").field("name", &self.name).finish_non_exhaustive()
    }
}
