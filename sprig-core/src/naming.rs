//! Dependency naming: maps a declared constructor parameter type to a bean name.

use std::collections::HashMap;

use crate::registry::Dependency;

/// Derives the bean name a constructor dependency is resolved by.
pub trait NamingStrategy: Send + Sync {
    fn bean_name(&self, dependency: &Dependency) -> String;
}

/// Default convention: simple type name with the first character lower-cased
/// (`TweetRepository` -> `tweetRepository`).
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeNameConvention;

impl NamingStrategy for TypeNameConvention {
    fn bean_name(&self, dependency: &Dependency) -> String {
        lower_first(dependency.type_name())
    }
}

/// Explicit type name -> bean name table. Unlisted types fall back to [`TypeNameConvention`].
#[derive(Debug, Clone, Default)]
pub struct WiringTable {
    entries: HashMap<String, String>,
}

impl WiringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire every dependency of type `type_name` to the bean `bean_name`.
    pub fn wire(mut self, type_name: impl Into<String>, bean_name: impl Into<String>) -> Self {
        self.entries.insert(type_name.into(), bean_name.into());
        self
    }
}

impl NamingStrategy for WiringTable {
    fn bean_name(&self, dependency: &Dependency) -> String {
        self.entries
            .get(dependency.type_name())
            .cloned()
            .unwrap_or_else(|| TypeNameConvention.bean_name(dependency))
    }
}

/// Lower-case the first character, keep the rest.
pub fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Simple name of `T`: last path segment with `dyn`, auto-trait bounds and generics removed.
/// `dyn my_app::repo::TweetRepository + Send` -> `TweetRepository`.
pub fn simple_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let full = full.strip_prefix("dyn ").unwrap_or(full);
    let full = full.split(" + ").next().unwrap_or(full);
    let full = full.split('<').next().unwrap_or(full);
    full.rsplit("::").next().unwrap_or(full)
}
