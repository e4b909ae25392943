//! Configuration store and the profile inheritance resolver.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::profile::Profile;

/// Numeric schema version gating backward-compatible default behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaVersion(pub u32);

impl SchemaVersion {
    pub const V1: SchemaVersion = SchemaVersion(1);
    /// First version where retention inherits the backup tags by default.
    pub const V2: SchemaVersion = SchemaVersion(2);
}

impl Default for SchemaVersion {
    fn default() -> Self {
        SchemaVersion::V1
    }
}

/// How multi-value flags are rendered on the derived command line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagGrammar {
    /// One `--flag value` occurrence per value.
    #[default]
    Repeat,
    /// A single occurrence carrying the comma-joined values (legacy
    /// grammar of older tool versions).
    Collapse,
}

/// Read-only store of raw profile trees, backing profile lookup.
///
/// The store is passed around as an explicit handle; nothing in the
/// resolution pipeline reaches for ambient process-wide state.
#[derive(Clone, Debug, Default)]
pub struct ConfigStore {
    profiles: BTreeMap<String, Value>,
    groups: BTreeMap<String, Vec<String>>,
    version: SchemaVersion,
    grammar: FlagGrammar,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(version: SchemaVersion) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    /// Builds a store from a whole raw configuration document: the
    /// `version` and `groups` keys are split off, every other top-level
    /// key is a profile tree.
    pub fn from_document(document: Value) -> Result<Self> {
        let Value::Object(mut document) = document else {
            return Err(ConfigError::Decode {
                key: String::new(),
                message: "configuration root must be a map".to_string(),
            });
        };

        let version = match document.remove("version") {
            Some(value) => {
                serde_json::from_value(value).map_err(|error| ConfigError::Decode {
                    key: "version".to_string(),
                    message: error.to_string(),
                })?
            }
            None => SchemaVersion::V1,
        };
        let groups = match document.remove("groups") {
            Some(value) => serde_json::from_value(value).map_err(|error| ConfigError::Decode {
                key: "groups".to_string(),
                message: error.to_string(),
            })?,
            None => BTreeMap::new(),
        };

        let mut store = ConfigStore::new(version);
        store.groups = groups;
        for (name, raw) in document {
            store.profiles.insert(name, raw);
        }
        Ok(store)
    }

    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = path.into();
        self
    }

    pub fn with_grammar(mut self, grammar: FlagGrammar) -> Self {
        self.grammar = grammar;
        self
    }

    pub fn insert_profile(&mut self, name: impl Into<String>, raw: Value) {
        self.profiles.insert(name.into(), raw);
    }

    pub fn insert_group(&mut self, name: impl Into<String>, profiles: Vec<String>) {
        self.groups.insert(name.into(), profiles);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    /// Names of every stored profile, sorted.
    pub fn profile_names(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }

    /// Named profile groups.
    pub fn groups(&self) -> &BTreeMap<String, Vec<String>> {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&[String]> {
        self.groups.get(name).map(Vec::as_slice)
    }

    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    pub fn grammar(&self) -> FlagGrammar {
        self.grammar
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Loads and decodes one profile, resolving its inheritance chain
    /// parent-first.
    ///
    /// Returns `Ok(None)` when the key is not present. A declared parent
    /// that does not exist, an inheritance cycle, or raw data that cannot
    /// be coerced into the declared field types are fatal errors.
    pub fn load_profile(&self, key: &str) -> Result<Option<Profile>> {
        let Some(raw) = self.merged_raw(key, &mut Vec::new())? else {
            return Ok(None);
        };
        let mut profile: Profile =
            serde_json::from_value(raw).map_err(|error| ConfigError::Decode {
                key: key.to_string(),
                message: error.to_string(),
            })?;
        // The profile keeps the requested key even when its content came
        // from a parent, so inheritance never leaks an ancestor's name.
        profile.name = key.to_string();
        profile.version = self.version;
        profile.grammar = self.grammar;
        profile.config_file = self.config_file.clone();
        debug!(profile = key, "loaded profile");
        Ok(Some(profile))
    }

    /// Merges the raw tree of `key` over its parent chain, child fields
    /// overriding parent fields one by one.
    fn merged_raw(&self, key: &str, visited: &mut Vec<String>) -> Result<Option<Value>> {
        let Some(raw) = self.profiles.get(key) else {
            return Ok(None);
        };
        if visited.iter().any(|seen| seen == key) {
            let mut chain = visited.join(" -> ");
            chain.push_str(" -> ");
            chain.push_str(key);
            return Err(ConfigError::InheritanceCycle {
                profile: visited.first().cloned().unwrap_or_else(|| key.to_string()),
                chain,
            });
        }
        visited.push(key.to_string());

        let parent_key = raw
            .get("inherit")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if parent_key.is_empty() {
            return Ok(Some(raw.clone()));
        }
        debug!(profile = key, parent = parent_key, "inheriting parent profile");
        match self.merged_raw(parent_key, visited)? {
            None => Err(ConfigError::UnknownParent {
                profile: key.to_string(),
                parent: parent_key.to_string(),
            }),
            Some(parent) => Ok(Some(deep_merge(parent, raw.clone()))),
        }
    }
}

/// Overlays `child` on `base`: maps merge key-wise recursively, any other
/// value (scalars and lists alike) replaces the inherited one wholesale.
fn deep_merge(base: Value, child: Value) -> Value {
    match (base, child) {
        (Value::Object(mut base), Value::Object(child)) => {
            for (key, value) in child {
                match base.remove(&key) {
                    Some(existing) => {
                        base.insert(key, deep_merge(existing, value));
                    }
                    None => {
                        base.insert(key, value);
                    }
                }
            }
            Value::Object(base)
        }
        (_, child) => child,
    }
}
