//! Bean descriptions and the sources that produce them.

use serde::{Deserialize, Serialize};

use crate::BoxError;

/// Bean scope: one cached instance per name, or a fresh instance per lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Singleton,
    Prototype,
}

/// Immutable record describing one bean: name, implementation type name, scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeanDescription {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default, alias = "isPrototype")]
    prototype: bool,
}

impl BeanDescription {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, prototype: bool) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            prototype,
        }
    }

    pub fn singleton(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(name, type_name, false)
    }

    pub fn prototype(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::new(name, type_name, true)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the registered bean type to instantiate.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn is_prototype(&self) -> bool {
        self.prototype
    }

    pub fn scope(&self) -> Scope {
        if self.prototype {
            Scope::Prototype
        } else {
            Scope::Singleton
        }
    }
}

/// Yields an ordered sequence of bean descriptions. Configuration loaders implement this.
pub trait DescriptionSource {
    fn descriptions(&self) -> Result<Vec<BeanDescription>, BoxError>;
}

impl DescriptionSource for Vec<BeanDescription> {
    fn descriptions(&self) -> Result<Vec<BeanDescription>, BoxError> {
        Ok(self.clone())
    }
}

impl DescriptionSource for [BeanDescription] {
    fn descriptions(&self) -> Result<Vec<BeanDescription>, BoxError> {
        Ok(self.to_vec())
    }
}

impl<S: DescriptionSource + ?Sized> DescriptionSource for Box<S> {
    fn descriptions(&self) -> Result<Vec<BeanDescription>, BoxError> {
        (**self).descriptions()
    }
}
