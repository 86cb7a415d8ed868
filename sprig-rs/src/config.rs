//! JSON context configuration: container settings, logging and bean descriptions.
//!
//! ```json
//! {
//!   "settings": { "eagerInit": true, "postConstructFailure": "log" },
//!   "logging": { "level": "debug" },
//!   "beans": {
//!     "tweetRepository": { "type": "InMemTweetRepository" },
//!     "tweet": { "type": "Tweet", "isPrototype": true }
//!   }
//! }
//! ```
//!
//! `beans` may also be a list of `{ "name", "type", "prototype" }` objects. Either way the
//! document order is the declared order.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use sprig_core::{
    BeanDescription, BoxError, Container, ContainerError, ContainerSettings, DescriptionSource,
    TypeRegistry,
};

use crate::logging::LoggingConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid context config")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub settings: ContainerSettings,
    pub logging: LoggingConfig,
    #[serde(deserialize_with = "deserialize_beans")]
    pub beans: Vec<BeanDescription>,
}

impl ContextConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&json)?;
        tracing::debug!(path = %path.display(), beans = config.beans.len(), "config loaded");
        Ok(config)
    }

    /// Build a container over `registry` with these settings and beans.
    pub fn container(&self, registry: TypeRegistry) -> Result<Container, ContainerError> {
        Container::builder(registry)
            .settings(self.settings.clone())
            .source(self.beans.clone())
            .build()
    }
}

impl DescriptionSource for ContextConfig {
    fn descriptions(&self) -> Result<Vec<BeanDescription>, BoxError> {
        Ok(self.beans.clone())
    }
}

/// Value of one entry in the name-keyed `beans` form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BeanSpec {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, alias = "isPrototype")]
    pub prototype: bool,
}

impl BeanSpec {
    pub fn describe(self, name: impl Into<String>) -> BeanDescription {
        BeanDescription::new(name, self.type_name, self.prototype)
    }
}

fn deserialize_beans<'de, D>(deserializer: D) -> Result<Vec<BeanDescription>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(BeansVisitor)
}

struct BeansVisitor;

impl<'de> Visitor<'de> for BeansVisitor {
    type Value = Vec<BeanDescription>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a list of bean descriptions or a map of bean name to bean spec")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(Vec::new())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut beans = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(description) = seq.next_element::<BeanDescription>()? {
            beans.push(description);
        }
        Ok(beans)
    }

    // Entries are taken as they stream in, so document order survives without an ordered map.
    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut beans = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((name, spec)) = map.next_entry::<String, BeanSpec>()? {
            beans.push(spec.describe(name));
        }
        Ok(beans)
    }
}
