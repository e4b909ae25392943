//! Profile configuration engine for an external backup tool.
//!
//! A profile is a named, inheritable bundle of settings describing how to
//! run backup-related commands. This crate loads profiles from a
//! [`ConfigStore`], resolves inheritance and cross-field defaults,
//! normalizes filesystem paths, redacts confidential values and derives
//! the ordered argument list for each command.
//!
//! The pipeline, in order:
//!
//! ```no_run
//! # fn main() -> Result<(), burrow_config::ConfigError> {
//! use burrow_config::{process_confidential_values, ConfigStore};
//!
//! let store = ConfigStore::from_document(serde_json::json!({
//!     "version": 2,
//!     "nightly": {
//!         "repository": "s3:host/repo",
//!         "backup": {"source": ["/data"]},
//!     },
//! }))?;
//!
//! if let Some(mut profile) = store.load_profile("nightly")? {
//!     profile.resolve_configuration();
//!     profile.set_root_path("/etc/burrow");
//!     process_confidential_values(&mut profile);
//!
//!     let args = profile.command_flags("backup");
//!     # let _ = args;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Everything here is synchronous and single-threaded: one profile is one
//! in-memory value transformed in place, and the store is read-only shared
//! state. Callers resolving several profiles may do so independently.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod error;
mod flags;
mod path;
mod profile;
mod redact;
mod resolve;
mod schedule;
mod sections;
mod store;

pub use error::{ConfigError, Result};
pub use profile::{Profile, COMMAND_NAMES};
pub use redact::{non_confidential_args, non_confidential_values, process_confidential_values};
pub use schedule::ScheduleConfig;
pub use sections::{
    BackupSection, CommandSection, CopySection, GenericSection, InitSection, RetentionSection,
    RunShellCommandsSection, ScheduleBaseSection, SendMonitoringHeader, SendMonitoringSection,
    SendMonitoringSections,
};
pub use store::{ConfigStore, FlagGrammar, SchemaVersion};
