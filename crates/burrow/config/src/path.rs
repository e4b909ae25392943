//! Filesystem path normalization over a resolved profile.
//!
//! Two orthogonal operations: [`Profile::set_root_path`] rewrites every
//! path that is relative to the configuration file against its root
//! directory, and [`Profile::set_path`] substitutes sentinel `path` flags
//! with the resolved backup source list. Both compose small string
//! transformers applied left-to-right: environment-variable expansion,
//! then one of root-prefixing, home expansion or making absolute.
//!
//! Normalization never fails: unknown variables, missing home directories,
//! unreadable directories and non-matching glob patterns all degrade to
//! the literal input.

use std::collections::BTreeMap;
use std::path::Path;

use burrow_types::{FlagValue, OtherFlags};
use tracing::debug;

use crate::profile::Profile;

/// Free-form flag names whose values are filesystem paths relative to the
/// configuration root, rewritten wherever they appear in any section.
const ROOT_PREFIXED_FLAGS: [&str; 5] = [
    "cacert",
    "tls-client-cert",
    "cache-dir",
    "repository-file",
    "password-file",
];

impl Profile {
    /// Rewrites every path that is relative to the configuration file
    /// against `root`, expands environment variables and home directories,
    /// and expands backup source globs.
    ///
    /// Backup sources stay relative to the invocation directory and are
    /// never root-prefixed; exclude patterns only get environment
    /// expansion. Every rewrite that changes a path's literal text is
    /// recorded in the profile's diagnostic map.
    pub fn set_root_path(&mut self, root: impl AsRef<Path>) {
        let root = root.as_ref();
        debug!(profile = %self.name, root = %root.display(), "normalizing paths");
        let mut log = RewriteLog::default();

        fix_field("lock", &mut self.lock, PathFix::Root(root), &mut log);
        fix_field(
            "password-file",
            &mut self.password_file,
            PathFix::Root(root),
            &mut log,
        );
        fix_field(
            "repository-file",
            &mut self.repository_file,
            PathFix::Root(root),
            &mut log,
        );
        fix_field("cache-dir", &mut self.cache_dir, PathFix::Root(root), &mut log);
        fix_field("cacert", &mut self.cacert, PathFix::Root(root), &mut log);
        fix_field(
            "tls-client-cert",
            &mut self.tls_client_cert,
            PathFix::Root(root),
            &mut log,
        );

        if let Some(backup) = &mut self.backup {
            fix_list(
                "backup exclude-file",
                &mut backup.exclude_file,
                PathFix::Root(root),
                &mut log,
            );
            fix_list(
                "backup files-from",
                &mut backup.files_from,
                PathFix::Root(root),
                &mut log,
            );
            fix_list("backup exclude", &mut backup.exclude, PathFix::EnvOnly, &mut log);
            fix_list("backup iexclude", &mut backup.iexclude, PathFix::EnvOnly, &mut log);

            let mut sources = Vec::with_capacity(backup.source.len());
            for pattern in &backup.source {
                let expanded = fix_path(pattern, PathFix::Home);
                let matches = expand_glob(&expanded);
                log.record("backup source", pattern, &matches);
                sources.extend(matches);
            }
            backup.source = sources;
        }

        if let Some(copy) = &mut self.copy {
            fix_field(
                "copy repository-file",
                &mut copy.repository_file,
                PathFix::Root(root),
                &mut log,
            );
            fix_field(
                "copy password-file",
                &mut copy.password_file,
                PathFix::Root(root),
                &mut log,
            );
        }
        if let Some(init) = &mut self.init {
            fix_field(
                "init from-repository-file",
                &mut init.from_repository_file,
                PathFix::Root(root),
                &mut log,
            );
            fix_field(
                "init from-password-file",
                &mut init.from_password_file,
                PathFix::Root(root),
                &mut log,
            );
        }

        for hook in self.monitoring.all_mut() {
            fix_field(
                "monitoring body-template",
                &mut hook.body_template,
                PathFix::Root(root),
                &mut log,
            );
        }
        for (name, section) in self.command_sections_mut() {
            if let Some(monitoring) = section.monitoring_mut() {
                for hook in monitoring.all_mut() {
                    let origin = format!("{name} body-template");
                    fix_field(&origin, &mut hook.body_template, PathFix::Root(root), &mut log);
                }
            }
            if let Some(flags) = section.other_flags_mut() {
                fix_flag_paths(name, flags, root, &mut log);
            }
        }
        fix_flag_paths("profile", &mut self.other_flags, root, &mut log);

        log.merge_into(&mut self.path_rewrites);
    }

    /// Substitutes sentinel `path` flags in every section exposing
    /// free-form flags: a literal boolean `true` becomes the resolved,
    /// de-duplicated backup source list (computed once, on first use);
    /// string values are made absolute in place.
    pub fn set_path(&mut self, sources: &[String]) {
        let mut log = RewriteLog::default();
        let mut resolved: Option<Vec<String>> = None;

        substitute_path_flag("profile", &mut self.other_flags, sources, &mut resolved, &mut log);
        for (name, section) in self.command_sections_mut() {
            if let Some(flags) = section.other_flags_mut() {
                substitute_path_flag(name, flags, sources, &mut resolved, &mut log);
            }
        }

        log.merge_into(&mut self.path_rewrites);
    }

    /// Replaces sentinel boolean `tag` flags with the literal tags, in
    /// every section exposing free-form flags.
    pub fn set_tag(&mut self, tags: &[String]) {
        self.substitute_bool_flag("tag", tags);
    }

    /// Replaces sentinel boolean `host` flags with the literal host names.
    pub fn set_host(&mut self, hosts: &[String]) {
        self.substitute_bool_flag("host", hosts);
    }

    fn substitute_bool_flag(&mut self, name: &str, values: &[String]) {
        if let Some(flag) = self.other_flags.get_mut(name) {
            if flag.is_true() {
                *flag = FlagValue::List(values.to_vec());
            }
        }
        for (_, section) in self.command_sections_mut() {
            if let Some(flags) = section.other_flags_mut() {
                if let Some(flag) = flags.get_mut(name) {
                    if flag.is_true() {
                        *flag = FlagValue::List(values.to_vec());
                    }
                }
            }
        }
    }
}

/// A single path rewriting step applied after environment expansion.
#[derive(Clone, Copy)]
enum PathFix<'a> {
    /// Environment expansion only.
    EnvOnly,
    /// Prefix relative paths with the configuration root.
    Root(&'a Path),
    /// Expand a leading `~` to the home directory.
    Home,
    /// Make the path absolute against the current directory.
    Absolute,
}

/// Environment expansion followed by one path fix.
fn fix_path(value: &str, fix: PathFix<'_>) -> String {
    apply_fix(&expand_env(value), fix)
}

fn apply_fix(value: &str, fix: PathFix<'_>) -> String {
    if value.is_empty() {
        return String::new();
    }
    match fix {
        PathFix::EnvOnly => value.to_string(),
        PathFix::Root(root) => {
            let expanded = expand_home(value);
            if Path::new(&expanded).is_absolute() {
                expanded
            } else {
                root.join(&expanded).to_string_lossy().into_owned()
            }
        }
        PathFix::Home => expand_home(value),
        PathFix::Absolute => match std::path::absolute(value) {
            Ok(path) => path.to_string_lossy().into_owned(),
            Err(_) => value.to_string(),
        },
    }
}

/// Expands `$NAME` and `${NAME}` references. Unknown variables keep their
/// literal text.
fn expand_env(value: &str) -> String {
    if !value.contains('$') {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(position) = rest.find('$') {
        out.push_str(&rest[..position]);
        let after = &rest[position + 1..];
        if let Some(name_end) = after.strip_prefix('{').and_then(|braced| braced.find('}')) {
            let name = &after[1..1 + name_end];
            match std::env::var(name) {
                Ok(resolved) => out.push_str(&resolved),
                Err(_) => out.push_str(&rest[position..position + name_end + 3]),
            }
            rest = &after[name_end + 2..];
        } else {
            let name_length = after
                .bytes()
                .take_while(|byte| byte.is_ascii_alphanumeric() || *byte == b'_')
                .count();
            if name_length == 0 {
                out.push('$');
                rest = after;
                continue;
            }
            let name = &after[..name_length];
            match std::env::var(name) {
                Ok(resolved) => out.push_str(&resolved),
                Err(_) => {
                    out.push('$');
                    out.push_str(name);
                }
            }
            rest = &after[name_length..];
        }
    }
    out.push_str(rest);
    out
}

/// Expands a leading `~` to the home directory. When the home directory
/// cannot be determined the value is kept unchanged.
fn expand_home(value: &str) -> String {
    if value == "~" {
        if let Some(home) = dirs::home_dir() {
            return home.to_string_lossy().into_owned();
        }
    } else if let Some(rest) = value.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest).to_string_lossy().into_owned();
        }
    }
    value.to_string()
}

/// Expands one glob pattern, preserving the match order reported by the
/// filesystem walk. Patterns that match nothing, unreadable directories
/// and invalid patterns all degrade to the literal input.
fn expand_glob(pattern: &str) -> Vec<String> {
    match glob::glob(pattern) {
        Ok(entries) => {
            let matches: Vec<String> = entries
                .filter_map(|entry| entry.ok())
                .map(|path| path.to_string_lossy().into_owned())
                .collect();
            if matches.is_empty() {
                vec![pattern.to_string()]
            } else {
                matches
            }
        }
        Err(_) => vec![pattern.to_string()],
    }
}

/// Resolves backup source patterns for the sentinel `path` flag:
/// environment and home expansion, glob expansion, made absolute, then
/// de-duplicated with order preserved.
fn resolve_source_paths(sources: &[String]) -> Vec<String> {
    let mut resolved = Vec::new();
    for pattern in sources {
        let expanded = fix_path(pattern, PathFix::Home);
        for matched in expand_glob(&expanded) {
            let absolute = apply_fix(&matched, PathFix::Absolute);
            if !resolved.contains(&absolute) {
                resolved.push(absolute);
            }
        }
    }
    resolved
}

fn substitute_path_flag(
    origin: &str,
    flags: &mut OtherFlags,
    sources: &[String],
    resolved: &mut Option<Vec<String>>,
    log: &mut RewriteLog,
) {
    let Some(value) = flags.get_mut("path") else {
        return;
    };
    match value {
        FlagValue::Bool(true) => {
            let paths = resolved
                .get_or_insert_with(|| resolve_source_paths(sources))
                .clone();
            debug!(origin, ?paths, "substituting sentinel path flag");
            *value = FlagValue::List(paths);
        }
        FlagValue::Single(path) => {
            let origin = format!("{origin} path");
            fix_field(&origin, path, PathFix::Absolute, log);
        }
        FlagValue::List(paths) => {
            let origin = format!("{origin} path");
            fix_list(&origin, paths, PathFix::Absolute, log);
        }
        _ => {}
    }
}

fn fix_flag_paths(origin: &str, flags: &mut OtherFlags, root: &Path, log: &mut RewriteLog) {
    for name in ROOT_PREFIXED_FLAGS {
        let Some(value) = flags.get_mut(name) else {
            continue;
        };
        let origin = format!("{origin} {name}");
        match value {
            FlagValue::Single(path) => fix_field(&origin, path, PathFix::Root(root), log),
            FlagValue::List(paths) => fix_list(&origin, paths, PathFix::Root(root), log),
            _ => {}
        }
    }
}

fn fix_field(origin: &str, value: &mut String, fix: PathFix<'_>, log: &mut RewriteLog) {
    if value.is_empty() {
        return;
    }
    let fixed = fix_path(value, fix);
    if fixed != *value {
        log.record(origin, value, std::slice::from_ref(&fixed));
        *value = fixed;
    }
}

fn fix_list(origin: &str, values: &mut Vec<String>, fix: PathFix<'_>, log: &mut RewriteLog) {
    for value in values {
        fix_field(origin, value, fix, log);
    }
}

/// Collects path rewrites during a pass; merged into the profile's
/// diagnostic map once the pass has released its section borrows. The
/// recording is informational, never a failure.
#[derive(Default)]
struct RewriteLog(BTreeMap<String, Vec<String>>);

impl RewriteLog {
    fn record(&mut self, origin: &str, original: &str, resolved: &[String]) {
        if resolved.len() == 1 && resolved[0] == original {
            return;
        }
        debug!(origin, original, ?resolved, "rewrote path");
        self.0
            .entry(format!("{origin} {original}"))
            .or_default()
            .extend(resolved.iter().cloned());
    }

    fn merge_into(self, rewrites: &mut BTreeMap<String, Vec<String>>) {
        for (key, values) in self.0 {
            rewrites.entry(key).or_default().extend(values);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Profile;
    use serde_json::json;

    fn profile(raw: serde_json::Value) -> Profile {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn expand_env_resolves_known_variables() {
        std::env::set_var("BURROW_PATH_TEST", "resolved");
        assert_eq!(expand_env("/srv/$BURROW_PATH_TEST/data"), "/srv/resolved/data");
        assert_eq!(expand_env("/srv/${BURROW_PATH_TEST}/data"), "/srv/resolved/data");
    }

    #[test]
    fn expand_env_keeps_unknown_variables_literal() {
        assert_eq!(expand_env("/srv/$BURROW_NO_SUCH_VAR"), "/srv/$BURROW_NO_SUCH_VAR");
        assert_eq!(
            expand_env("/srv/${BURROW_NO_SUCH_VAR}/x"),
            "/srv/${BURROW_NO_SUCH_VAR}/x"
        );
        assert_eq!(expand_env("price: 100$"), "price: 100$");
    }

    #[test]
    fn root_prefix_skips_absolute_paths() {
        let root = Path::new("/etc/burrow");
        assert_eq!(apply_fix("keyfile", PathFix::Root(root)), "/etc/burrow/keyfile");
        assert_eq!(apply_fix("/srv/key", PathFix::Root(root)), "/srv/key");
    }

    #[test]
    fn glob_without_matches_passes_through() {
        assert_eq!(
            expand_glob("/burrow-does-not-exist/*.txt"),
            vec!["/burrow-does-not-exist/*.txt".to_string()]
        );
    }

    #[test]
    fn glob_expands_matching_patterns_in_order() {
        let dir = std::env::temp_dir().join(format!("burrow-glob-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("a.txt"), b"a").unwrap();
        std::fs::write(dir.join("b.txt"), b"b").unwrap();

        let pattern = dir.join("*.txt").to_string_lossy().into_owned();
        let matches = expand_glob(&pattern);
        assert_eq!(
            matches,
            vec![
                dir.join("a.txt").to_string_lossy().into_owned(),
                dir.join("b.txt").to_string_lossy().into_owned(),
            ]
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn set_root_path_rewrites_relative_files() {
        let mut profile = profile(json!({
            "password-file": "key",
            "repository-file": "/absolute/repo",
            "backup": {
                "source": ["/data"],
                "exclude-file": ["excludes"],
                "exclude": ["$HOME/tmp/*"],
            },
        }));
        profile.set_root_path("/etc/burrow");

        assert_eq!(profile.password_file, "/etc/burrow/key");
        assert_eq!(profile.repository_file, "/absolute/repo");

        let backup = profile.backup.as_ref().unwrap();
        assert_eq!(backup.exclude_file, vec!["/etc/burrow/excludes".to_string()]);
        // sources stay relative to the invocation directory
        assert_eq!(backup.source, vec!["/data".to_string()]);
        // excludes are env-expanded but never prefixed
        let home = std::env::var("HOME").unwrap_or_default();
        if !home.is_empty() {
            assert_eq!(backup.exclude, vec![format!("{home}/tmp/*")]);
        }
    }

    #[test]
    fn set_root_path_records_rewrite_diagnostics() {
        let mut profile = profile(json!({"password-file": "key"}));
        profile.set_root_path("/etc/burrow");
        assert_eq!(
            profile.path_rewrites().get("password-file key"),
            Some(&vec!["/etc/burrow/key".to_string()])
        );
    }

    #[test]
    fn set_root_path_rewrites_allow_listed_flags_in_any_section() {
        let mut profile = profile(json!({
            "check": {"cacert": "ca.pem"},
            "cache-dir": "cache",
        }));
        profile.set_root_path("/etc/burrow");

        assert_eq!(profile.cache_dir, "/etc/burrow/cache");
        let check = profile.check.as_ref().unwrap();
        assert_eq!(
            check.other_flags.get("cacert"),
            Some(&FlagValue::Single("/etc/burrow/ca.pem".to_string()))
        );
    }

    #[test]
    fn set_root_path_rewrites_monitoring_body_templates() {
        let mut profile = profile(json!({
            "send-before": {"url": "https://ping.example.com", "body-template": "body.json"},
            "backup": {
                "send-after": [{"url": "https://ping.example.com", "body-template": "done.json"}],
            },
        }));
        profile.set_root_path("/etc/burrow");

        assert_eq!(profile.monitoring.send_before[0].body_template, "/etc/burrow/body.json");
        let backup = profile.backup.as_ref().unwrap();
        assert_eq!(
            backup.monitoring.send_after[0].body_template,
            "/etc/burrow/done.json"
        );
    }

    #[test]
    fn sentinel_path_flag_resolves_to_deduplicated_sources() {
        let mut profile = profile(json!({
            "forget": {"path": true},
            "snapshots": {"path": "relative/dir"},
        }));
        profile.set_path(&["/data".to_string(), "/data".to_string(), "/srv".to_string()]);

        let forget = profile.forget.as_ref().unwrap();
        assert_eq!(
            forget.other_flags.get("path"),
            Some(&FlagValue::List(vec!["/data".to_string(), "/srv".to_string()]))
        );

        let snapshots = profile.snapshots.as_ref().unwrap();
        match snapshots.other_flags.get("path") {
            Some(FlagValue::Single(path)) => {
                assert!(Path::new(path).is_absolute(), "path: {path}");
                assert!(path.ends_with("relative/dir"), "path: {path}");
            }
            other => panic!("expected absolute single path, got {other:?}"),
        }
    }

    #[test]
    fn set_tag_replaces_only_boolean_sentinels() {
        let mut profile = profile(json!({
            "forget": {"tag": true},
            "check": {"tag": ["explicit"]},
        }));
        profile.set_tag(&["prod".to_string(), "db".to_string()]);

        assert_eq!(
            profile.forget.as_ref().unwrap().other_flags.get("tag"),
            Some(&FlagValue::List(vec!["prod".to_string(), "db".to_string()]))
        );
        assert_eq!(
            profile.check.as_ref().unwrap().other_flags.get("tag"),
            Some(&FlagValue::List(vec!["explicit".to_string()]))
        );
    }
}
