// Licensed under the Open Software License version 3.0
use crate::config::{
    error::ConfigError,
    section::{IniSection, Section},
    types::Example,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassiveEndpointConfig {
    enabled: Option<bool>,
    port: Option<u16>,
}

impl Default for PassiveEndpointConfig {
    fn default() -> Self {
        Self {
            enabled: Some(false),
            port: Some(63623),
        }
    }
}

impl Example for PassiveEndpointConfig {
    fn example() -> Self {
        Self {
            enabled: Some(true),
            port: Some(63623),
        }
    }
}

impl IniSection for PassiveEndpointConfig {
    const NAME: &'static str = "passive_endpoint";

    fn from_section(section: &Section) -> Result<Self, ConfigError> {
        Ok(Self {
            enabled: section.get_bool("enabled")?,
            port: section.get_u16("port")?,
        })
    }

    fn to_entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("enabled", self.is_enabled().to_string()),
            ("port", self.get_port().to_string()),
        ]
    }
}

impl PassiveEndpointConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or_default()
    }

    pub fn get_port(&self) -> u16 {
        self.port.unwrap_or(63623)
    }
}
