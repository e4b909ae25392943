//! Derivation of command-line arguments from a resolved profile.
//!
//! Flag ordering is stable: common fields in declaration order, then the
//! command section's dedicated fields in declaration order, then the
//! section's free-form flags in sorted key order. Confidential fields emit
//! their real value with the confidential marker set; callers redact for
//! display with [`crate::non_confidential_args`].

use burrow_types::{Arg, ArgList, ArgStyle, ConfidentialValue, FlagValue, OtherFlags};
use tracing::warn;

use crate::profile::Profile;
use crate::sections::{BackupSection, CopySection, InitSection};
use crate::store::FlagGrammar;

impl Profile {
    /// Arguments shared by every command.
    pub fn common_flags(&self) -> ArgList {
        let mut args = ArgList::new();
        push_bool(&mut args, "quiet", self.quiet);
        push_bool(&mut args, "verbose", self.verbose);
        push_confidential(&mut args, "repo", &self.repository);
        push_value(&mut args, "repository-file", &self.repository_file);
        push_value(&mut args, "password-file", &self.password_file);
        push_value(&mut args, "cache-dir", &self.cache_dir);
        push_value(&mut args, "cacert", &self.cacert);
        push_value(&mut args, "tls-client-cert", &self.tls_client_cert);
        push_other_flags(&mut args, &self.other_flags, self.grammar);
        args
    }

    /// Arguments for one command: the common flags, the section's dedicated
    /// field mappings, then its free-form flags.
    ///
    /// A missing section is not an error: the common flags alone are a
    /// valid invocation, a warning notes the degraded derivation.
    pub fn command_flags(&self, command: &str) -> ArgList {
        let mut args = self.common_flags();
        let Some(section) = self.section(command) else {
            warn!(profile = %self.name, command, "no section for command, using common flags only");
            return args;
        };
        match command {
            "backup" => {
                if let Some(backup) = &self.backup {
                    backup.append_arguments(&mut args, self.grammar);
                }
            }
            "copy" => {
                if let Some(copy) = &self.copy {
                    copy.append_arguments(&mut args);
                }
            }
            "init" => {
                if let Some(init) = &self.init {
                    init.append_arguments(&mut args);
                }
            }
            _ => {}
        }
        if let Some(flags) = section.other_flags() {
            push_other_flags(&mut args, flags, self.grammar);
        }
        args
    }

    /// Arguments for the retention run around a backup: the common flags
    /// plus the retention section's free-form flags. The section's own
    /// fixed fields are operational and never forwarded.
    pub fn retention_flags(&self) -> ArgList {
        let mut args = self.common_flags();
        match &self.retention {
            Some(retention) => push_other_flags(&mut args, &retention.other_flags, self.grammar),
            None => {
                warn!(profile = %self.name, "no retention section, using common flags only");
            }
        }
        args
    }
}

impl BackupSection {
    fn append_arguments(&self, args: &mut ArgList, grammar: FlagGrammar) {
        if self.use_stdin {
            args.push(Arg::flag("stdin"));
        }
        push_list(args, "source", &self.source, grammar, ArgStyle::Plain);
        push_list(args, "exclude", &self.exclude, grammar, ArgStyle::NoGlob);
        push_list(args, "iexclude", &self.iexclude, grammar, ArgStyle::NoGlob);
        push_list(args, "exclude-file", &self.exclude_file, grammar, ArgStyle::Plain);
        push_list(args, "files-from", &self.files_from, grammar, ArgStyle::Plain);
    }
}

impl CopySection {
    fn append_arguments(&self, args: &mut ArgList) {
        push_confidential(args, "repo2", &self.repository);
        push_value(args, "repository-file2", &self.repository_file);
        push_value(args, "password-file2", &self.password_file);
    }
}

impl InitSection {
    fn append_arguments(&self, args: &mut ArgList) {
        push_confidential(args, "from-repo", &self.from_repository);
        push_value(args, "from-repository-file", &self.from_repository_file);
        push_value(args, "from-password-file", &self.from_password_file);
    }
}

fn push_bool(args: &mut ArgList, name: &str, set: bool) {
    if set {
        args.push(Arg::flag(name));
    }
}

fn push_value(args: &mut ArgList, name: &str, value: &str) {
    if !value.is_empty() {
        args.push(Arg::value(name, value));
    }
}

fn push_confidential(args: &mut ArgList, name: &str, value: &ConfidentialValue) {
    if !value.is_empty() {
        args.push(Arg::value(name, value.value()).confidential(value.is_confidential()));
    }
}

fn push_list(args: &mut ArgList, name: &str, values: &[String], grammar: FlagGrammar, style: ArgStyle) {
    match grammar {
        FlagGrammar::Repeat => {
            for value in values {
                args.push(Arg::value(name, value).styled(style));
            }
        }
        FlagGrammar::Collapse => {
            if !values.is_empty() {
                args.push(Arg::value(name, values.join(",")).styled(style));
            }
        }
    }
}

fn push_other_flags(args: &mut ArgList, flags: &OtherFlags, grammar: FlagGrammar) {
    for (name, value) in flags {
        match value {
            FlagValue::Bool(true) => args.push(Arg::flag(name)),
            FlagValue::Bool(false) => {}
            FlagValue::Int(value) => args.push(Arg::value(name, value.to_string())),
            FlagValue::Float(value) => args.push(Arg::value(name, value.to_string())),
            FlagValue::Single(value) => {
                if !value.is_empty() {
                    args.push(Arg::value(name, value));
                }
            }
            FlagValue::List(values) => push_list(args, name, values, grammar, ArgStyle::Plain),
        }
    }
}
