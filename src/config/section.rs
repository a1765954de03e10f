// Licensed under the Open Software License version 3.0
use super::error::ConfigError;
use std::{collections::HashMap, time::Duration};

/// One INI section with case-insensitive keys
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Section {
    name: String,
    entries: HashMap<String, String>,
}

/// Typed view of an optional INI section
pub trait IniSection: Sized {
    const NAME: &'static str;

    fn from_section(section: &Section) -> Result<Self, ConfigError>;

    /// Entries written to the example config file
    fn to_entries(&self) -> Vec<(&'static str, String)>;
}

impl Section {
    pub fn new<I, K, V>(name: &str, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            name: name.to_lowercase(),
            entries: entries
                .into_iter()
                .map(|(key, value)| (key.as_ref().trim().to_lowercase(), value.into()))
                .collect(),
        }
    }

    /// Stand-in for a section that isn't present in the file
    pub fn empty(name: &str) -> Self {
        Self::new::<_, &str, String>(name, [])
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::missing_key(&self.name, key))
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(String::from)
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        let Some(value) = self.get_string(key) else {
            return Ok(None);
        };
        // Same spellings configparser accepts
        match value.to_lowercase().as_str() {
            "1" | "yes" | "true" | "on" => Ok(Some(true)),
            "0" | "no" | "false" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::invalid_value(
                &self.name,
                key,
                "expected a boolean (true/false, yes/no, on/off, 1/0)",
            )),
        }
    }

    pub fn get_u16(&self, key: &str) -> Result<Option<u16>, ConfigError> {
        self.get_string(key)
            .map(|value| {
                value.parse::<u16>().map_err(|error| {
                    ConfigError::invalid_value(&self.name, key, error.to_string())
                })
            })
            .transpose()
    }

    /// Durations use humantime syntax, e.g. `10s`, `1m 30s`
    pub fn get_duration(&self, key: &str) -> Result<Option<Duration>, ConfigError> {
        self.get_string(key)
            .map(|value| {
                humantime::parse_duration(&value).map_err(|error| {
                    ConfigError::invalid_value(&self.name, key, error.to_string())
                })
            })
            .transpose()
    }

    /// Comma separated list, empty items dropped
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }
}

pub fn format_duration(duration: Duration) -> String {
    humantime::format_duration(duration).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section() -> Section {
        Section::new(
            "Poll",
            [
                ("Interval", "1m 30s"),
                ("enabled", "Yes"),
                ("port", "70000"),
                ("endpoints", "http://a, ,http://b"),
            ],
        )
    }

    #[test]
    fn keys_are_case_insensitive() {
        let section = section();
        assert_eq!(section.name(), "poll");
        assert_eq!(section.get("interval"), Some("1m 30s"));
    }

    #[test]
    fn parses_typed_values() {
        let section = section();
        assert_eq!(
            section.get_duration("interval").unwrap(),
            Some(Duration::from_secs(90))
        );
        assert_eq!(section.get_bool("enabled").unwrap(), Some(true));
        assert_eq!(section.get_bool("missing").unwrap(), None);
        assert_eq!(section.get_list("endpoints"), vec!["http://a", "http://b"]);
    }

    #[test]
    fn out_of_range_port_is_invalid() {
        let error = section().get_u16("port").unwrap_err();
        assert!(matches!(error, ConfigError::InvalidValue { key, .. } if key == "port"));
    }

    #[test]
    fn require_reports_key_name() {
        let error = section().require("password").unwrap_err();
        assert_eq!(error, ConfigError::missing_key("poll", "password"));
    }
}
