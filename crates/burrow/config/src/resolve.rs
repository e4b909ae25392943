//! Cross-field invariants enforced after loading.

use burrow_types::FlagValue;
use tracing::debug;

use crate::profile::Profile;
use crate::store::SchemaVersion;

impl Profile {
    /// Enforces cross-field defaults after loading, before the root-path
    /// normalization runs. Mutates the profile in place; the pass is
    /// idempotent and meant to run once per load.
    ///
    /// In order: a stdin-source command forces the stdin flag on; a
    /// retention section defaults its `path` flag (and, from schema
    /// version 2 on, its `tag` flag) to the inherit-from-backup sentinel;
    /// sentinel `tag` flags are substituted with the backup section's
    /// literal tags; sentinel `path` flags are always resolved against the
    /// backup source list, even when there is no backup section.
    pub fn resolve_configuration(&mut self) {
        debug!(profile = %self.name, "resolving configuration");

        if let Some(backup) = &mut self.backup {
            if !backup.stdin_command.is_empty() && !backup.use_stdin {
                debug!(profile = %self.name, "stdin command defined, forcing stdin flag");
                backup.use_stdin = true;
            }
        }

        let version = self.version;
        if let Some(retention) = &mut self.retention {
            retention
                .other_flags
                .entry("path".to_string())
                .or_insert(FlagValue::Bool(true));
            if version >= SchemaVersion::V2 {
                retention
                    .other_flags
                    .entry("tag".to_string())
                    .or_insert(FlagValue::Bool(true));
            }
        }

        // A literal boolean `tag` flag means "use the backup tags"; collect
        // the literal tag values and substitute them everywhere.
        let tags = self
            .backup
            .as_ref()
            .and_then(|backup| backup.other_flags.get("tag"))
            .map(FlagValue::values)
            .unwrap_or_default();
        self.set_tag(&tags);

        let sources = self
            .backup
            .as_ref()
            .map(|backup| backup.source.clone())
            .unwrap_or_default();
        self.set_path(&sources);
    }
}

#[cfg(test)]
mod tests {
    use crate::store::{ConfigStore, SchemaVersion};
    use burrow_types::FlagValue;
    use serde_json::json;

    fn load(version: SchemaVersion, raw: serde_json::Value) -> crate::profile::Profile {
        let mut store = ConfigStore::new(version);
        store.insert_profile("test", raw);
        let mut profile = store.load_profile("test").unwrap().unwrap();
        profile.resolve_configuration();
        profile
    }

    #[test]
    fn stdin_command_forces_stdin_flag() {
        let profile = load(
            SchemaVersion::V1,
            json!({"backup": {"stdin-command": "pg_dumpall"}}),
        );
        assert!(profile.backup.unwrap().use_stdin);
    }

    #[test]
    fn retention_path_defaults_to_backup_sources() {
        let profile = load(
            SchemaVersion::V1,
            json!({
                "backup": {"source": ["/data"]},
                "retention": {"keep-last": 3},
            }),
        );
        let retention = profile.retention.unwrap();
        match retention.other_flags.get("path") {
            Some(FlagValue::List(paths)) => {
                assert_eq!(paths.len(), 1);
                assert!(paths[0].ends_with("/data"), "path: {}", paths[0]);
            }
            other => panic!("expected resolved path list, got {other:?}"),
        }
    }

    #[test]
    fn retention_tag_default_is_version_gated() {
        let raw = json!({
            "backup": {"source": ["/data"], "tag": ["prod"]},
            "retention": {"keep-last": 3},
        });

        let old = load(SchemaVersion::V1, raw.clone());
        assert!(!old.retention.unwrap().other_flags.contains_key("tag"));

        let new = load(SchemaVersion::V2, raw);
        assert_eq!(
            new.retention.unwrap().other_flags.get("tag"),
            Some(&FlagValue::List(vec!["prod".to_string()]))
        );
    }

    #[test]
    fn explicit_retention_tag_is_kept() {
        let profile = load(
            SchemaVersion::V2,
            json!({
                "backup": {"tag": ["prod"]},
                "retention": {"tag": ["archive"]},
            }),
        );
        assert_eq!(
            profile.retention.unwrap().other_flags.get("tag"),
            Some(&FlagValue::List(vec!["archive".to_string()]))
        );
    }

    #[test]
    fn boolean_backup_tag_resolves_to_empty_tag_list() {
        let profile = load(SchemaVersion::V1, json!({"backup": {"tag": true}}));
        assert_eq!(
            profile.backup.unwrap().other_flags.get("tag"),
            Some(&FlagValue::List(Vec::new()))
        );
    }

    #[test]
    fn resolution_is_idempotent() {
        let mut profile = load(
            SchemaVersion::V2,
            json!({
                "backup": {"source": ["/data"], "tag": ["prod"]},
                "retention": {"keep-last": 3},
            }),
        );
        let snapshot = format!("{profile:?}");
        profile.resolve_configuration();
        assert_eq!(format!("{profile:?}"), snapshot);
    }
}
