//! Singleton instance cache with compute-if-absent semantics per bean name.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread::{self, ThreadId};

use crate::bean::Bean;
use crate::ContainerError;

type Slot = Arc<Mutex<Option<Bean>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Waiting on a slot would close a cycle of threads, each holding a slot the next one needs.
/// `path` lists the contended names starting with the one requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WouldDeadlock {
    pub path: Vec<String>,
}

impl From<WouldDeadlock> for ContainerError {
    fn from(deadlock: WouldDeadlock) -> Self {
        let mut path = deadlock.path;
        if let Some(first) = path.first().cloned() {
            path.push(first);
        }
        ContainerError::Circular(path.join(" -> "))
    }
}

/// Which thread is building which name, and which name each blocked thread waits for.
#[derive(Default)]
struct WaitGraph {
    builders: HashMap<String, ThreadId>,
    waiting: HashMap<ThreadId, String>,
}

/// Name -> singleton instance. Entries only ever grow; a failed build leaves
/// its slot empty so the next lookup builds again.
#[derive(Default)]
pub struct InstanceCache {
    slots: Mutex<HashMap<String, Slot>>,
    graph: Mutex<WaitGraph>,
}

impl InstanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached instance for `name`, or build it with `create` and store it.
    /// The slot stays locked while `create` runs, so concurrent first lookups of
    /// the same name build exactly once; other names are not blocked. Blocking on a
    /// slot whose builder is itself (transitively) blocked on this thread fails with
    /// [`WouldDeadlock`] instead.
    pub fn get_or_try_insert_with<E: From<WouldDeadlock>>(
        &self,
        name: &str,
        create: impl FnOnce() -> Result<Bean, E>,
    ) -> Result<Bean, E> {
        let slot = Arc::clone(lock(&self.slots).entry(name.to_owned()).or_default());
        let mut entry = match slot.try_lock() {
            Ok(entry) => entry,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                self.start_waiting(name)?;
                let entry = lock(&slot);
                lock(&self.graph).waiting.remove(&thread::current().id());
                entry
            }
        };
        if let Some(bean) = entry.as_ref() {
            tracing::trace!(bean = name, "singleton cache hit");
            return Ok(bean.clone());
        }
        let _building = Building::start(self, name);
        let bean = create()?;
        *entry = Some(bean.clone());
        Ok(bean)
    }

    fn start_waiting(&self, name: &str) -> Result<(), WouldDeadlock> {
        let me = thread::current().id();
        let mut graph = lock(&self.graph);
        let mut path = vec![name.to_owned()];
        let mut current = name;
        // each hop visits a distinct waiting thread unless the chain loops elsewhere
        for _ in 0..=graph.waiting.len() {
            let Some(builder) = graph.builders.get(current) else {
                break;
            };
            if *builder == me {
                return Err(WouldDeadlock { path });
            }
            let Some(next) = graph.waiting.get(builder) else {
                break;
            };
            path.push(next.clone());
            current = next;
        }
        graph.waiting.insert(me, name.to_owned());
        Ok(())
    }

    /// Cached instance, if built. A slot whose build is still running counts as empty.
    pub fn get(&self, name: &str) -> Option<Bean> {
        let slot = lock(&self.slots).get(name).cloned()?;
        peek(&slot)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of built singletons.
    pub fn len(&self) -> usize {
        lock(&self.slots)
            .values()
            .filter(|slot| peek(slot).is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Marks the current thread as the builder of `name` until dropped.
struct Building<'a> {
    cache: &'a InstanceCache,
    name: &'a str,
}

impl<'a> Building<'a> {
    fn start(cache: &'a InstanceCache, name: &'a str) -> Self {
        lock(&cache.graph)
            .builders
            .insert(name.to_owned(), thread::current().id());
        Self { cache, name }
    }
}

impl Drop for Building<'_> {
    fn drop(&mut self) {
        lock(&self.cache.graph).builders.remove(self.name);
    }
}

fn peek(slot: &Mutex<Option<Bean>>) -> Option<Bean> {
    match slot.try_lock() {
        Ok(entry) => entry.clone(),
        Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().clone(),
        Err(TryLockError::WouldBlock) => None,
    }
}
