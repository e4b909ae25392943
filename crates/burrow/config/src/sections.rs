//! Typed command sections of a profile.
//!
//! Sections are composed by embedding: scheduling, monitoring hooks, shell
//! hooks and the free-form flag remainder are flattened into each section
//! that supports them. Consumers discover what a section supports through
//! the [`CommandSection`] capability accessors instead of matching on a
//! closed list of section types, so new sections can be added without
//! touching the introspection code.

use burrow_types::{ConfidentialValue, OtherFlags};
use serde::{Deserialize, Deserializer, Serialize};

/// Capability surface of a command section.
///
/// Every accessor returns `None` (or `false`) unless the section variant
/// opts in by overriding it.
pub trait CommandSection {
    /// Free-form flags forwarded to the external tool.
    fn other_flags(&self) -> Option<&OtherFlags> {
        None
    }

    fn other_flags_mut(&mut self) -> Option<&mut OtherFlags> {
        None
    }

    /// Scheduling settings, for sections that can be scheduled.
    fn schedule(&self) -> Option<&ScheduleBaseSection> {
        None
    }

    /// Monitoring hooks sent around the command run.
    fn monitoring(&self) -> Option<&SendMonitoringSections> {
        None
    }

    fn monitoring_mut(&mut self) -> Option<&mut SendMonitoringSections> {
        None
    }

    /// Shell commands run around the command run.
    fn shell_hooks(&self) -> Option<&RunShellCommandsSection> {
        None
    }

    /// True when the section carries no settings at all.
    fn is_empty(&self) -> bool {
        false
    }
}

/// Accepts either a single element or a list of elements.
pub(crate) fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(values) => values,
        OneOrMany::One(value) => vec![value],
    })
}

/// Scheduling settings shared by every schedulable section.
///
/// Operational metadata for the scheduler collaborator; never forwarded as
/// command-line flags.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleBaseSection {
    #[serde(rename = "schedule", deserialize_with = "one_or_many")]
    pub schedules: Vec<String>,
    #[serde(rename = "schedule-permission")]
    pub permission: String,
    #[serde(rename = "schedule-lock-mode")]
    pub lock_mode: String,
    #[serde(rename = "schedule-lock-wait")]
    pub lock_wait: String,
    #[serde(rename = "schedule-priority")]
    pub priority: String,
    #[serde(rename = "schedule-log")]
    pub log: String,
}

/// One monitoring hook: an HTTP request description sent to the monitoring
/// dispatcher around a command run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendMonitoringSection {
    pub method: String,
    pub url: ConfidentialValue,
    pub headers: Vec<SendMonitoringHeader>,
    pub body: String,
    #[serde(rename = "body-template")]
    pub body_template: String,
    #[serde(rename = "skip-tls-verification")]
    pub skip_tls_verification: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendMonitoringHeader {
    pub name: String,
    pub value: ConfidentialValue,
}

/// Ordered monitoring hooks grouped by trigger.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendMonitoringSections {
    #[serde(rename = "send-before", deserialize_with = "one_or_many")]
    pub send_before: Vec<SendMonitoringSection>,
    #[serde(rename = "send-after", deserialize_with = "one_or_many")]
    pub send_after: Vec<SendMonitoringSection>,
    #[serde(rename = "send-after-fail", deserialize_with = "one_or_many")]
    pub send_after_fail: Vec<SendMonitoringSection>,
    #[serde(rename = "send-finally", deserialize_with = "one_or_many")]
    pub send_finally: Vec<SendMonitoringSection>,
}

impl SendMonitoringSections {
    pub fn is_empty(&self) -> bool {
        self.send_before.is_empty()
            && self.send_after.is_empty()
            && self.send_after_fail.is_empty()
            && self.send_finally.is_empty()
    }

    pub fn all(&self) -> impl Iterator<Item = &SendMonitoringSection> {
        self.send_before
            .iter()
            .chain(&self.send_after)
            .chain(&self.send_after_fail)
            .chain(&self.send_finally)
    }

    pub fn all_mut(&mut self) -> impl Iterator<Item = &mut SendMonitoringSection> {
        self.send_before
            .iter_mut()
            .chain(&mut self.send_after)
            .chain(&mut self.send_after_fail)
            .chain(&mut self.send_finally)
    }
}

/// Shell commands run around a command invocation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunShellCommandsSection {
    #[serde(rename = "run-before", deserialize_with = "one_or_many")]
    pub run_before: Vec<String>,
    #[serde(rename = "run-after", deserialize_with = "one_or_many")]
    pub run_after: Vec<String>,
    #[serde(rename = "run-after-fail", deserialize_with = "one_or_many")]
    pub run_after_fail: Vec<String>,
    #[serde(rename = "run-finally", deserialize_with = "one_or_many")]
    pub run_finally: Vec<String>,
}

impl RunShellCommandsSection {
    pub fn is_empty(&self) -> bool {
        self.run_before.is_empty()
            && self.run_after.is_empty()
            && self.run_after_fail.is_empty()
            && self.run_finally.is_empty()
    }
}

/// Backup command settings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupSection {
    #[serde(rename = "check-before")]
    pub check_before: bool,
    #[serde(rename = "check-after")]
    pub check_after: bool,
    #[serde(rename = "stdin")]
    pub use_stdin: bool,
    #[serde(rename = "stdin-command", deserialize_with = "one_or_many")]
    pub stdin_command: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub source: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub exclude: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub iexclude: Vec<String>,
    #[serde(rename = "exclude-file", deserialize_with = "one_or_many")]
    pub exclude_file: Vec<String>,
    #[serde(rename = "files-from", deserialize_with = "one_or_many")]
    pub files_from: Vec<String>,
    #[serde(flatten)]
    pub schedule: ScheduleBaseSection,
    #[serde(flatten)]
    pub shell_hooks: RunShellCommandsSection,
    #[serde(flatten)]
    pub monitoring: SendMonitoringSections,
    #[serde(flatten)]
    pub other_flags: OtherFlags,
}

impl CommandSection for BackupSection {
    fn other_flags(&self) -> Option<&OtherFlags> {
        Some(&self.other_flags)
    }

    fn other_flags_mut(&mut self) -> Option<&mut OtherFlags> {
        Some(&mut self.other_flags)
    }

    fn schedule(&self) -> Option<&ScheduleBaseSection> {
        Some(&self.schedule)
    }

    fn monitoring(&self) -> Option<&SendMonitoringSections> {
        Some(&self.monitoring)
    }

    fn monitoring_mut(&mut self) -> Option<&mut SendMonitoringSections> {
        Some(&mut self.monitoring)
    }

    fn shell_hooks(&self) -> Option<&RunShellCommandsSection> {
        Some(&self.shell_hooks)
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Retention settings applied around a backup (a forget variant, not
/// independently schedulable).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionSection {
    #[serde(rename = "before-backup")]
    pub before_backup: bool,
    #[serde(rename = "after-backup")]
    pub after_backup: bool,
    #[serde(flatten)]
    pub other_flags: OtherFlags,
}

impl CommandSection for RetentionSection {
    fn other_flags(&self) -> Option<&OtherFlags> {
        Some(&self.other_flags)
    }

    fn other_flags_mut(&mut self) -> Option<&mut OtherFlags> {
        Some(&mut self.other_flags)
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Repository initialization settings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitSection {
    #[serde(rename = "from-repository")]
    pub from_repository: ConfidentialValue,
    #[serde(rename = "from-repository-file")]
    pub from_repository_file: String,
    #[serde(rename = "from-password-file")]
    pub from_password_file: String,
    #[serde(flatten)]
    pub other_flags: OtherFlags,
}

impl CommandSection for InitSection {
    fn other_flags(&self) -> Option<&OtherFlags> {
        Some(&self.other_flags)
    }

    fn other_flags_mut(&mut self) -> Option<&mut OtherFlags> {
        Some(&mut self.other_flags)
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Copy command settings: the destination repository and its credentials.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopySection {
    pub initialize: bool,
    pub repository: ConfidentialValue,
    #[serde(rename = "repository-file")]
    pub repository_file: String,
    #[serde(rename = "password-file")]
    pub password_file: String,
    #[serde(flatten)]
    pub schedule: ScheduleBaseSection,
    #[serde(flatten)]
    pub shell_hooks: RunShellCommandsSection,
    #[serde(flatten)]
    pub monitoring: SendMonitoringSections,
    #[serde(flatten)]
    pub other_flags: OtherFlags,
}

impl CommandSection for CopySection {
    fn other_flags(&self) -> Option<&OtherFlags> {
        Some(&self.other_flags)
    }

    fn other_flags_mut(&mut self) -> Option<&mut OtherFlags> {
        Some(&mut self.other_flags)
    }

    fn schedule(&self) -> Option<&ScheduleBaseSection> {
        Some(&self.schedule)
    }

    fn monitoring(&self) -> Option<&SendMonitoringSections> {
        Some(&self.monitoring)
    }

    fn monitoring_mut(&mut self) -> Option<&mut SendMonitoringSections> {
        Some(&mut self.monitoring)
    }

    fn shell_hooks(&self) -> Option<&RunShellCommandsSection> {
        Some(&self.shell_hooks)
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Catch-all section for commands without dedicated fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenericSection {
    #[serde(flatten)]
    pub schedule: ScheduleBaseSection,
    #[serde(flatten)]
    pub shell_hooks: RunShellCommandsSection,
    #[serde(flatten)]
    pub monitoring: SendMonitoringSections,
    #[serde(flatten)]
    pub other_flags: OtherFlags,
}

impl CommandSection for GenericSection {
    fn other_flags(&self) -> Option<&OtherFlags> {
        Some(&self.other_flags)
    }

    fn other_flags_mut(&mut self) -> Option<&mut OtherFlags> {
        Some(&mut self.other_flags)
    }

    fn schedule(&self) -> Option<&ScheduleBaseSection> {
        Some(&self.schedule)
    }

    fn monitoring(&self) -> Option<&SendMonitoringSections> {
        Some(&self.monitoring)
    }

    fn monitoring_mut(&mut self) -> Option<&mut SendMonitoringSections> {
        Some(&mut self.monitoring)
    }

    fn shell_hooks(&self) -> Option<&RunShellCommandsSection> {
        Some(&self.shell_hooks)
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
