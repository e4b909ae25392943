//! The profile aggregate and its capability introspection.

use std::collections::BTreeMap;
use std::path::PathBuf;

use burrow_types::{ConfidentialValue, OtherFlags};
use serde::{Deserialize, Serialize};

use crate::sections::{
    BackupSection, CommandSection, CopySection, GenericSection, InitSection, RetentionSection,
    RunShellCommandsSection, SendMonitoringSections,
};
use crate::store::{FlagGrammar, SchemaVersion};

/// Known command section names, in enumeration order.
pub const COMMAND_NAMES: [&str; 15] = [
    "backup", "check", "copy", "dump", "forget", "find", "ls", "mount", "prune", "restore",
    "snapshots", "stats", "tag", "init", "retention",
];

/// A named, inheritable bundle of settings describing how to run
/// backup-related commands with the external tool.
///
/// Profiles are constructed by [`ConfigStore::load_profile`], mutated in
/// place by the resolution and path-normalization passes, then read-only
/// for the rest of the run.
///
/// [`ConfigStore::load_profile`]: crate::ConfigStore::load_profile
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// Configuration key the profile was loaded under. Forced by the
    /// loader, never read from the raw data, even when the content came
    /// from a parent profile.
    #[serde(skip)]
    pub name: String,

    pub description: String,
    pub quiet: bool,
    pub verbose: bool,
    pub repository: ConfidentialValue,
    #[serde(rename = "repository-file")]
    pub repository_file: String,
    #[serde(rename = "password-file")]
    pub password_file: String,
    #[serde(rename = "cache-dir")]
    pub cache_dir: String,
    pub cacert: String,
    #[serde(rename = "tls-client-cert")]
    pub tls_client_cert: String,
    pub initialize: bool,
    /// Parent profile key. Operational metadata, never forwarded.
    pub inherit: String,
    pub lock: String,
    #[serde(rename = "force-inactive-lock")]
    pub force_inactive_lock: bool,
    #[serde(rename = "env")]
    pub environment: BTreeMap<String, ConfidentialValue>,

    pub backup: Option<BackupSection>,
    pub check: Option<GenericSection>,
    pub copy: Option<CopySection>,
    pub dump: Option<GenericSection>,
    pub forget: Option<GenericSection>,
    pub find: Option<GenericSection>,
    pub ls: Option<GenericSection>,
    pub mount: Option<GenericSection>,
    pub prune: Option<GenericSection>,
    pub restore: Option<GenericSection>,
    pub snapshots: Option<GenericSection>,
    pub stats: Option<GenericSection>,
    pub tag: Option<GenericSection>,
    pub init: Option<InitSection>,
    pub retention: Option<RetentionSection>,

    /// Profile-level shell hooks, run around every command.
    #[serde(flatten)]
    pub shell_hooks: RunShellCommandsSection,
    /// Profile-level monitoring hooks.
    #[serde(flatten)]
    pub monitoring: SendMonitoringSections,
    /// Free-form flags forwarded to every command.
    #[serde(flatten)]
    pub other_flags: OtherFlags,

    // Stamped by the loader from the owning store; not part of the raw
    // data and not serialized.
    #[serde(skip)]
    pub(crate) version: SchemaVersion,
    #[serde(skip)]
    pub(crate) grammar: FlagGrammar,
    #[serde(skip)]
    pub(crate) config_file: PathBuf,
    #[serde(skip)]
    pub(crate) path_rewrites: BTreeMap<String, Vec<String>>,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Schema version of the configuration the profile was loaded from.
    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    /// Flag grammar used when deriving multi-value flags.
    pub fn grammar(&self) -> FlagGrammar {
        self.grammar
    }

    /// Path of the configuration file the profile was loaded from.
    pub fn config_file(&self) -> &std::path::Path {
        &self.config_file
    }

    /// Diagnostic map of path rewrites performed by the normalization
    /// passes, keyed `"<origin> <original path>"`. Informational only.
    pub fn path_rewrites(&self) -> &BTreeMap<String, Vec<String>> {
        &self.path_rewrites
    }

    /// All defined, non-empty command sections with their configuration
    /// names, in enumeration order.
    pub fn command_sections(&self) -> Vec<(&'static str, &dyn CommandSection)> {
        let mut sections: Vec<(&'static str, &dyn CommandSection)> = Vec::new();
        fn push<'a, S: CommandSection>(
            sections: &mut Vec<(&'static str, &'a dyn CommandSection)>,
            name: &'static str,
            section: &'a Option<S>,
        ) {
            if let Some(section) = section {
                if !section.is_empty() {
                    sections.push((name, section));
                }
            }
        }
        push(&mut sections, "backup", &self.backup);
        push(&mut sections, "check", &self.check);
        push(&mut sections, "copy", &self.copy);
        push(&mut sections, "dump", &self.dump);
        push(&mut sections, "forget", &self.forget);
        push(&mut sections, "find", &self.find);
        push(&mut sections, "ls", &self.ls);
        push(&mut sections, "mount", &self.mount);
        push(&mut sections, "prune", &self.prune);
        push(&mut sections, "restore", &self.restore);
        push(&mut sections, "snapshots", &self.snapshots);
        push(&mut sections, "stats", &self.stats);
        push(&mut sections, "tag", &self.tag);
        push(&mut sections, "init", &self.init);
        push(&mut sections, "retention", &self.retention);
        sections
    }

    /// Mutable variant of [`Profile::command_sections`] used by the
    /// resolution and path passes. Includes empty sections.
    pub fn command_sections_mut(&mut self) -> Vec<(&'static str, &mut dyn CommandSection)> {
        let mut sections: Vec<(&'static str, &mut dyn CommandSection)> = Vec::new();
        if let Some(section) = self.backup.as_mut() {
            sections.push(("backup", section));
        }
        if let Some(section) = self.check.as_mut() {
            sections.push(("check", section));
        }
        if let Some(section) = self.copy.as_mut() {
            sections.push(("copy", section));
        }
        if let Some(section) = self.dump.as_mut() {
            sections.push(("dump", section));
        }
        if let Some(section) = self.forget.as_mut() {
            sections.push(("forget", section));
        }
        if let Some(section) = self.find.as_mut() {
            sections.push(("find", section));
        }
        if let Some(section) = self.ls.as_mut() {
            sections.push(("ls", section));
        }
        if let Some(section) = self.mount.as_mut() {
            sections.push(("mount", section));
        }
        if let Some(section) = self.prune.as_mut() {
            sections.push(("prune", section));
        }
        if let Some(section) = self.restore.as_mut() {
            sections.push(("restore", section));
        }
        if let Some(section) = self.snapshots.as_mut() {
            sections.push(("snapshots", section));
        }
        if let Some(section) = self.stats.as_mut() {
            sections.push(("stats", section));
        }
        if let Some(section) = self.tag.as_mut() {
            sections.push(("tag", section));
        }
        if let Some(section) = self.init.as_mut() {
            sections.push(("init", section));
        }
        if let Some(section) = self.retention.as_mut() {
            sections.push(("retention", section));
        }
        sections
    }

    /// Looks up one command section by name, defined or empty.
    pub fn section(&self, command: &str) -> Option<&dyn CommandSection> {
        match command {
            "backup" => self.backup.as_ref().map(|s| s as &dyn CommandSection),
            "check" => self.check.as_ref().map(|s| s as &dyn CommandSection),
            "copy" => self.copy.as_ref().map(|s| s as &dyn CommandSection),
            "dump" => self.dump.as_ref().map(|s| s as &dyn CommandSection),
            "forget" => self.forget.as_ref().map(|s| s as &dyn CommandSection),
            "find" => self.find.as_ref().map(|s| s as &dyn CommandSection),
            "ls" => self.ls.as_ref().map(|s| s as &dyn CommandSection),
            "mount" => self.mount.as_ref().map(|s| s as &dyn CommandSection),
            "prune" => self.prune.as_ref().map(|s| s as &dyn CommandSection),
            "restore" => self.restore.as_ref().map(|s| s as &dyn CommandSection),
            "snapshots" => self.snapshots.as_ref().map(|s| s as &dyn CommandSection),
            "stats" => self.stats.as_ref().map(|s| s as &dyn CommandSection),
            "tag" => self.tag.as_ref().map(|s| s as &dyn CommandSection),
            "init" => self.init.as_ref().map(|s| s as &dyn CommandSection),
            "retention" => self.retention.as_ref().map(|s| s as &dyn CommandSection),
            _ => None,
        }
    }

    /// Names of all defined, non-empty command sections.
    pub fn defined_commands(&self) -> Vec<&'static str> {
        self.command_sections().iter().map(|(name, _)| *name).collect()
    }

    /// Names of the defined sections that can be scheduled.
    pub fn schedulable_commands(&self) -> Vec<&'static str> {
        self.command_sections()
            .iter()
            .filter(|(_, section)| section.schedule().is_some())
            .map(|(name, _)| *name)
            .collect()
    }

    /// Command-level shell hooks for one command, when its section defines
    /// them. Profile-level hooks live in [`Profile::shell_hooks`]; callers
    /// decide precedence between the two.
    pub fn shell_hooks_for(&self, command: &str) -> Option<&RunShellCommandsSection> {
        self.section(command).and_then(|section| section.shell_hooks())
    }

    /// Command-level monitoring hooks for one command, when its section
    /// defines them. Profile-level hooks live in [`Profile::monitoring`].
    pub fn monitoring_for(&self, command: &str) -> Option<&SendMonitoringSections> {
        self.section(command).and_then(|section| section.monitoring())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_with_sections() -> Profile {
        serde_json::from_value(serde_json::json!({
            "repository": "s3:host/repo",
            "backup": {"source": ["/data"]},
            "check": {"schedule": "weekly"},
            "retention": {"keep-last": 3},
            "prune": {},
        }))
        .unwrap()
    }

    #[test]
    fn command_sections_skip_absent_and_empty() {
        let profile = profile_with_sections();
        assert_eq!(profile.defined_commands(), vec!["backup", "check", "retention"]);
    }

    #[test]
    fn schedulable_commands_exclude_retention() {
        let profile = profile_with_sections();
        assert_eq!(profile.schedulable_commands(), vec!["backup", "check"]);
    }

    #[test]
    fn section_lookup_covers_empty_sections() {
        let profile = profile_with_sections();
        assert!(profile.section("prune").is_some());
        assert!(profile.section("mount").is_none());
        assert!(profile.section("no-such-command").is_none());
    }

    #[test]
    fn profile_level_hooks_are_separate_from_command_hooks() {
        let profile: Profile = serde_json::from_value(serde_json::json!({
            "run-before": "echo profile",
            "backup": {"run-before": "echo backup"},
        }))
        .unwrap();

        assert_eq!(profile.shell_hooks.run_before, vec!["echo profile".to_string()]);
        assert_eq!(
            profile.shell_hooks_for("backup").unwrap().run_before,
            vec!["echo backup".to_string()]
        );
        assert!(profile.shell_hooks_for("check").is_none());
    }

    #[test]
    fn unknown_profile_keys_become_free_form_flags() {
        let profile: Profile = serde_json::from_value(serde_json::json!({
            "repository": "local:/srv/backup",
            "option": ["s3.storage-class=STANDARD_IA"],
            "limit-upload": 1024,
        }))
        .unwrap();

        assert!(profile.other_flags.contains_key("option"));
        assert!(profile.other_flags.contains_key("limit-upload"));
        assert!(!profile.other_flags.contains_key("repository"));
    }
}
