//! Flattened schedule view handed to the scheduler collaborator.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::profile::Profile;

/// Self-contained scheduling request for one schedulable section.
///
/// A value object: it carries everything the scheduler needs and holds no
/// back-reference to the profile it was derived from.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Profile name.
    pub title: String,
    /// Section (command) name.
    pub subtitle: String,
    /// Schedule expressions, at least one.
    pub schedules: Vec<String>,
    pub permission: String,
    pub lock_mode: String,
    pub lock_wait: String,
    pub priority: String,
    pub log: String,
    /// Environment snapshot as `NAME=value` pairs, real values.
    pub environment: Vec<String>,
    /// Configuration file the profile was loaded from.
    pub config_file: PathBuf,
}

impl Profile {
    /// One schedule per schedulable section carrying at least one schedule
    /// expression.
    pub fn schedules(&self) -> Vec<ScheduleConfig> {
        let environment: Vec<String> = self
            .environment
            .iter()
            .map(|(name, value)| format!("{name}={}", value.value()))
            .collect();

        self.command_sections()
            .into_iter()
            .filter_map(|(name, section)| {
                let schedule = section.schedule()?;
                if schedule.schedules.is_empty() {
                    return None;
                }
                Some(ScheduleConfig {
                    title: self.name.clone(),
                    subtitle: name.to_string(),
                    schedules: schedule.schedules.clone(),
                    permission: schedule.permission.clone(),
                    lock_mode: schedule.lock_mode.clone(),
                    lock_wait: schedule.lock_wait.clone(),
                    priority: schedule.priority.clone(),
                    log: schedule.log.clone(),
                    environment: environment.clone(),
                    config_file: self.config_file.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ConfigStore, SchemaVersion};
    use serde_json::json;

    #[test]
    fn schedules_cover_only_sections_with_expressions() {
        let mut store = ConfigStore::new(SchemaVersion::V1).with_config_file("/etc/burrow/profiles.json");
        store.insert_profile(
            "nightly",
            json!({
                "env": {"TZ": "UTC"},
                "backup": {
                    "source": ["/data"],
                    "schedule": ["daily", "weekly"],
                    "schedule-permission": "system",
                    "schedule-priority": "background",
                },
                "check": {"schedule": "monthly"},
                "prune": {},
                "retention": {"keep-last": 3},
            }),
        );
        let profile = store.load_profile("nightly").unwrap().unwrap();

        let schedules = profile.schedules();
        assert_eq!(schedules.len(), 2);

        let backup = &schedules[0];
        assert_eq!(backup.title, "nightly");
        assert_eq!(backup.subtitle, "backup");
        assert_eq!(backup.schedules, vec!["daily".to_string(), "weekly".to_string()]);
        assert_eq!(backup.permission, "system");
        assert_eq!(backup.priority, "background");
        assert_eq!(backup.environment, vec!["TZ=UTC".to_string()]);
        assert_eq!(backup.config_file, PathBuf::from("/etc/burrow/profiles.json"));

        assert_eq!(schedules[1].subtitle, "check");
        assert_eq!(schedules[1].schedules, vec!["monthly".to_string()]);
    }

    #[test]
    fn sections_without_schedule_capability_are_ignored() {
        let mut store = ConfigStore::new(SchemaVersion::V1);
        store.insert_profile(
            "plain",
            json!({"retention": {"keep-last": 3, "schedule": "daily"}}),
        );
        let profile = store.load_profile("plain").unwrap().unwrap();
        assert!(profile.schedules().is_empty());
    }
}
