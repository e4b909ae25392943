//! Ordered, typed argument lists handed to the process launcher.

use serde::Serialize;

/// Rendering style of a flag value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgStyle {
    /// Regular value, escaped by the launcher as needed.
    #[default]
    Plain,
    /// Value that must never undergo shell glob expansion.
    NoGlob,
}

/// One `--flag` or `--flag value` entry of a derived command line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Arg {
    name: String,
    value: Option<String>,
    confidential: bool,
    style: ArgStyle,
}

impl Arg {
    /// A bare flag with no value.
    pub fn flag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            confidential: false,
            style: ArgStyle::Plain,
        }
    }

    /// A flag carrying one value.
    pub fn value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            confidential: false,
            style: ArgStyle::Plain,
        }
    }

    pub fn confidential(mut self, confidential: bool) -> Self {
        self.confidential = confidential;
        self
    }

    pub fn styled(mut self, style: ArgStyle) -> Self {
        self.style = style;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get_value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn is_confidential(&self) -> bool {
        self.confidential
    }

    pub fn style(&self) -> ArgStyle {
        self.style
    }
}

/// Ordered argument list for one command invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ArgList(Vec<Arg>);

impl ArgList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, arg: Arg) {
        self.0.push(arg);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arg> {
        self.0.iter()
    }

    /// The real command line, one token per flag occurrence and value.
    pub fn to_command_line(&self) -> Vec<String> {
        let mut line = Vec::with_capacity(self.0.len() * 2);
        for arg in &self.0 {
            line.push(format!("--{}", arg.name));
            if let Some(value) = &arg.value {
                line.push(value.clone());
            }
        }
        line
    }

    /// Returns a copy of the list with every value rewritten through `map`.
    /// Entries for which `map` returns `None` keep their current value.
    pub fn map_values(&self, map: impl Fn(&str) -> Option<String>) -> ArgList {
        let mut mapped = self.clone();
        for arg in &mut mapped.0 {
            if let Some(value) = &arg.value {
                if let Some(replacement) = map(value) {
                    arg.value = Some(replacement);
                }
            }
        }
        mapped
    }
}

impl<'a> IntoIterator for &'a ArgList {
    type Item = &'a Arg;
    type IntoIter = std::slice::Iter<'a, Arg>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for ArgList {
    type Item = Arg;
    type IntoIter = std::vec::IntoIter<Arg>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<Arg> for ArgList {
    fn from_iter<I: IntoIterator<Item = Arg>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_interleaves_flags_and_values() {
        let mut args = ArgList::new();
        args.push(Arg::flag("quiet"));
        args.push(Arg::value("repo", "s3:host/repo"));
        assert_eq!(
            args.to_command_line(),
            vec!["--quiet".to_string(), "--repo".to_string(), "s3:host/repo".to_string()]
        );
    }

    #[test]
    fn map_values_replaces_only_mapped_entries() {
        let mut args = ArgList::new();
        args.push(Arg::value("repo", "secret").confidential(true));
        args.push(Arg::value("cache-dir", "/var/cache"));
        let mapped = args.map_values(|value| (value == "secret").then(|| "×××".to_string()));
        let values: Vec<Option<&str>> = mapped.iter().map(Arg::get_value).collect();
        assert_eq!(values, vec![Some("×××"), Some("/var/cache")]);
        assert!(mapped.iter().next().unwrap().is_confidential());
    }

    #[test]
    fn no_glob_style_is_preserved() {
        let arg = Arg::value("exclude", "*.tmp").styled(ArgStyle::NoGlob);
        assert_eq!(arg.style(), ArgStyle::NoGlob);
    }
}
