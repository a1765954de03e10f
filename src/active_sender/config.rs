// Licensed under the Open Software License version 3.0
use crate::config::{
    error::ConfigError,
    section::{format_duration, IniSection, Section},
    types::Example,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub url: String,
    pub bearer_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSenderConfig {
    enabled: Option<bool>,
    cooldown: Option<Duration>,
    ignore_connection_errors: Option<bool>,
    endpoints: Option<Vec<String>>,
    // Shared by every endpoint
    bearer_token: Option<String>,
}

impl Default for ActiveSenderConfig {
    fn default() -> Self {
        Self {
            enabled: Some(false),
            cooldown: Some(Duration::from_secs(10)),
            ignore_connection_errors: Some(false),
            endpoints: None,
            bearer_token: None,
        }
    }
}

impl Example for ActiveSenderConfig {
    fn example() -> Self {
        Self {
            enabled: Some(false),
            cooldown: Some(Duration::from_secs(10)),
            ignore_connection_errors: Some(true),
            endpoints: Some(vec![
                String::from("http://localhost:3001/anything/status/200"),
                String::from("https://home-panel.lan/api/trpc/m2m.storeBmcSnapshot"),
            ]),
            bearer_token: Some(String::from("EXAMPLE_TOKEN")),
        }
    }
}

impl IniSection for ActiveSenderConfig {
    const NAME: &'static str = "active_sender";

    fn from_section(section: &Section) -> Result<Self, ConfigError> {
        let endpoints = section.get_list("endpoints");
        Ok(Self {
            enabled: section.get_bool("enabled")?,
            cooldown: section.get_duration("cooldown")?,
            ignore_connection_errors: section.get_bool("ignore_connection_errors")?,
            endpoints: (!endpoints.is_empty()).then_some(endpoints),
            bearer_token: section.get_string("bearer_token"),
        })
    }

    fn to_entries(&self) -> Vec<(&'static str, String)> {
        let mut entries = vec![
            ("enabled", self.is_enabled().to_string()),
            ("cooldown", format_duration(self.get_cooldown())),
            (
                "ignore_connection_errors",
                self.get_ignore_connection_errors().to_string(),
            ),
            (
                "endpoints",
                self.endpoints.clone().unwrap_or_default().join(", "),
            ),
        ];
        if let Some(token) = &self.bearer_token {
            entries.push(("bearer_token", token.clone()));
        }
        entries
    }
}

impl ActiveSenderConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or_default()
    }

    pub fn get_cooldown(&self) -> Duration {
        self.cooldown.unwrap_or_default()
    }

    pub fn get_endpoints(&self) -> Vec<Endpoint> {
        self.endpoints
            .clone()
            .unwrap_or_default()
            .into_iter()
            .map(|url| Endpoint {
                url,
                bearer_token: self.bearer_token.clone(),
            })
            .collect()
    }

    pub fn get_ignore_connection_errors(&self) -> bool {
        self.ignore_connection_errors.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_share_token() {
        let section = Section::new(
            "active_sender",
            [
                ("enabled", "true"),
                ("endpoints", "http://a/snap, http://b/snap"),
                ("bearer_token", "token"),
            ],
        );
        let config = ActiveSenderConfig::from_section(&section).unwrap();
        assert!(config.is_enabled());
        let endpoints = config.get_endpoints();
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[1].url, "http://b/snap");
        assert_eq!(endpoints[1].bearer_token.as_deref(), Some("token"));
    }

    #[test]
    fn disabled_by_default() {
        assert!(!ActiveSenderConfig::default().is_enabled());
        assert!(ActiveSenderConfig::default().get_endpoints().is_empty());
    }
}
