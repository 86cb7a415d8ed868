//! Benchmark interception: a pass-through wrapper that times marked methods.
//!
//! A bean type with at least one benchmark marker is published wrapped in
//! [`Intercepted`]. The wrapper implements the bean's capability trait by
//! forwarding every method through [`Intercepted::invoke`]; only calls to a
//! method whose marker is enabled are timed and reported to the
//! [`InvocationObserver`]. Return values are never touched.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime};

/// Benchmark markers of one bean type: method name -> enabled, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodTable {
    methods: Vec<(String, bool)>,
}

impl MethodTable {
    /// Returns false when `method` is already marked.
    pub(crate) fn insert(&mut self, method: &str, enabled: bool) -> bool {
        if self.is_marked(method) {
            return false;
        }
        self.methods.push((method.to_owned(), enabled));
        true
    }

    pub fn is_marked(&self, method: &str) -> bool {
        self.methods.iter().any(|(m, _)| m == method)
    }

    /// Marked and enabled: calls to this method are timed.
    pub fn is_enabled(&self, method: &str) -> bool {
        self.methods.iter().any(|(m, enabled)| m == method && *enabled)
    }

    /// First declared marker; its presence alone decides that the type is wrapped.
    pub fn first_marked(&self) -> Option<&str> {
        self.methods.first().map(|(m, _)| m.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }
}

/// Later duplicates of a method are ignored.
impl<'a> FromIterator<(&'a str, bool)> for MethodTable {
    fn from_iter<I: IntoIterator<Item = (&'a str, bool)>>(iter: I) -> Self {
        let mut table = MethodTable::default();
        for (method, enabled) in iter {
            table.insert(method, enabled);
        }
        table
    }
}

/// One timed invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationTiming {
    pub bean: String,
    pub method: String,
    pub started_at: SystemTime,
    pub elapsed: Duration,
}

/// Receives timings of benchmarked calls.
pub trait InvocationObserver: Send + Sync {
    fn record(&self, timing: InvocationTiming);
}

/// Reports timings as `tracing` debug events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl InvocationObserver for TracingObserver {
    fn record(&self, timing: InvocationTiming) {
        tracing::debug!(
            bean = %timing.bean,
            method = %timing.method,
            elapsed_ns = timing.elapsed.as_nanos() as u64,
            "benchmarked call"
        );
    }
}

/// Keeps timings in memory; useful in tests and for ad-hoc profiling.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    timings: Mutex<Vec<InvocationTiming>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timings(&self) -> Vec<InvocationTiming> {
        self.timings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.timings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl InvocationObserver for RecordingObserver {
    fn record(&self, timing: InvocationTiming) {
        self.timings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(timing);
    }
}

/// Decorator around a bean of type `T`. Implement the bean's capability trait for
/// `Intercepted<T>` by forwarding through [`invoke`](Intercepted::invoke) (the
/// `#[intercepted]` attribute of `sprig-rs` generates that impl).
pub struct Intercepted<T> {
    target: T,
    bean: Arc<str>,
    methods: Arc<MethodTable>,
    observer: Arc<dyn InvocationObserver>,
}

impl<T> Intercepted<T> {
    pub(crate) fn new(
        target: T,
        bean: Arc<str>,
        methods: Arc<MethodTable>,
        observer: Arc<dyn InvocationObserver>,
    ) -> Self {
        Self {
            target,
            bean,
            methods,
            observer,
        }
    }

    /// Wrap `target` outside a container, e.g. to decorate a hand-built instance.
    pub fn wrap(
        target: T,
        bean: &str,
        methods: MethodTable,
        observer: Arc<dyn InvocationObserver>,
    ) -> Self {
        Self::new(target, Arc::from(bean), Arc::new(methods), observer)
    }

    /// Route a `&self` call. Timed only when `method` is marked and enabled.
    pub fn invoke<'a, R>(&'a self, method: &str, call: impl FnOnce(&'a T) -> R) -> R {
        if !self.methods.is_enabled(method) {
            return call(&self.target);
        }
        let started_at = SystemTime::now();
        let start = Instant::now();
        let result = call(&self.target);
        report(&*self.observer, &self.bean, method, started_at, start.elapsed());
        result
    }

    /// Route a `&mut self` call. Timed only when `method` is marked and enabled.
    pub fn invoke_mut<'a, R>(&'a mut self, method: &str, call: impl FnOnce(&'a mut T) -> R) -> R {
        if !self.methods.is_enabled(method) {
            return call(&mut self.target);
        }
        let observer = Arc::clone(&self.observer);
        let bean = Arc::clone(&self.bean);
        let started_at = SystemTime::now();
        let start = Instant::now();
        let result = call(&mut self.target);
        report(&*observer, &bean, method, started_at, start.elapsed());
        result
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn bean_name(&self) -> &str {
        &self.bean
    }

    pub fn methods(&self) -> &MethodTable {
        &self.methods
    }

    pub fn into_inner(self) -> T {
        self.target
    }
}

fn report(
    observer: &dyn InvocationObserver,
    bean: &str,
    method: &str,
    started_at: SystemTime,
    elapsed: Duration,
) {
    observer.record(InvocationTiming {
        bean: bean.to_owned(),
        method: method.to_owned(),
        started_at,
        elapsed,
    });
}

impl<T: fmt::Debug> fmt::Debug for Intercepted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Intercepted")
            .field("bean", &self.bean)
            .field("target", &self.target)
            .field("methods", &self.methods)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Reverser;

    impl Reverser {
        fn reverse(&self, s: &str) -> String {
            s.chars().rev().collect()
        }
    }

    fn table(entries: &[(&str, bool)]) -> MethodTable {
        entries.iter().copied().collect()
    }

    #[test]
    fn only_enabled_markers_are_timed() {
        let observer = Arc::new(RecordingObserver::new());
        let proxy = Intercepted::wrap(
            Reverser,
            "reverser",
            table(&[("reverse", true), ("quiet", false)]),
            observer.clone(),
        );
        assert_eq!(proxy.invoke("reverse", |r| r.reverse("ryy")), "yyr");
        assert_eq!(proxy.invoke("quiet", |r| r.reverse("ab")), "ba");
        assert_eq!(proxy.invoke("unmarked", |r| r.reverse("xy")), "yx");

        let timings = observer.timings();
        assert_eq!(timings.len(), 1);
        assert_eq!(timings[0].bean, "reverser");
        assert_eq!(timings[0].method, "reverse");
    }

    #[test]
    fn first_marked_follows_declaration_order() {
        let t = table(&[("b", false), ("a", true)]);
        assert_eq!(t.first_marked(), Some("b"));
        assert!(t.is_marked("b"));
        assert!(!t.is_enabled("b"));
        assert!(t.is_enabled("a"));
    }

    #[test]
    fn duplicate_markers_keep_the_first() {
        let t = table(&[("a", false), ("a", true)]);
        assert_eq!(t.len(), 1);
        assert!(!t.is_enabled("a"));
    }
}
