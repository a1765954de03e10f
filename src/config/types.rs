// Licensed under the Open Software License version 3.0
use super::{
    connection::ConnectionParams,
    error::ConfigError,
    section::{format_duration, IniSection, Section},
};
use crate::{
    active_sender::config::ActiveSenderConfig, passive_endpoint::config::PassiveEndpointConfig,
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, str::FromStr, time::Duration};

// Values to generate example config file
pub trait Example {
    fn example() -> Self;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum Transport {
    /// ipmi-sensors subprocess
    #[default]
    Cli,
    /// Redfish HTTP API
    Redfish,
}

impl FromStr for Transport {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "cli" | "ipmi" => Ok(Self::Cli),
            "redfish" => Ok(Self::Redfish),
            other => Err(format!("unknown transport \"{}\"", other)),
        }
    }
}

/// One BMC, read from `[bmc]` or `[bmc.<label>]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetConfig {
    pub label: String,
    pub connection: ConnectionParams,
    pub transport: Option<Transport>,
}

impl TargetConfig {
    pub fn from_section(label: String, section: &Section) -> Result<Self, ConfigError> {
        // Check presence of every key before validating any of them
        let host = section.require("name")?;
        let user = section.require("user")?;
        let password = section.require("password")?;
        let connection =
            ConnectionParams::new(host, user, password).map_err(|error| match error {
                ConfigError::InvalidValue { key, reason, .. } => ConfigError::InvalidValue {
                    section: section.name().to_string(),
                    key,
                    reason,
                },
                other => other,
            })?;
        let transport = section
            .get_string("transport")
            .map(|value| {
                value.parse::<Transport>().map_err(|reason| {
                    ConfigError::invalid_value(section.name(), "transport", reason)
                })
            })
            .transpose()?;
        Ok(Self {
            label,
            connection,
            transport,
        })
    }

    pub fn get_transport(&self) -> Transport {
        self.transport.unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IpmiConfig {
    tool: Option<String>,
}

impl Example for IpmiConfig {
    fn example() -> Self {
        Self {
            tool: Some(String::from("/usr/sbin/ipmi-sensors")),
        }
    }
}

impl IniSection for IpmiConfig {
    const NAME: &'static str = "ipmi";

    fn from_section(section: &Section) -> Result<Self, ConfigError> {
        Ok(Self {
            tool: section.get_string("tool"),
        })
    }

    fn to_entries(&self) -> Vec<(&'static str, String)> {
        vec![("tool", self.get_tool().display().to_string())]
    }
}

impl IpmiConfig {
    pub fn get_tool(&self) -> PathBuf {
        PathBuf::from(
            self.tool
                .clone()
                .unwrap_or_else(|| String::from("/usr/sbin/ipmi-sensors")),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RedfishConfig {
    scheme: Option<String>,
    port: Option<u16>,
    resource: Option<String>,
    accept_invalid_certs: Option<bool>,
}

const REDFISH_PREFIX: &str = "/redfish/v1/";

impl Example for RedfishConfig {
    fn example() -> Self {
        Self {
            scheme: Some(String::from("https")),
            port: None,
            resource: Some(String::from("/redfish/v1/Chassis/1/Sensors")),
            accept_invalid_certs: Some(true),
        }
    }
}

impl IniSection for RedfishConfig {
    const NAME: &'static str = "redfish";

    fn from_section(section: &Section) -> Result<Self, ConfigError> {
        let scheme = section.get_string("scheme").map(|scheme| scheme.to_lowercase());
        if let Some(scheme) = &scheme {
            if scheme != "http" && scheme != "https" {
                return Err(ConfigError::invalid_value(
                    Self::NAME,
                    "scheme",
                    "expected http or https",
                ));
            }
        }
        Ok(Self {
            scheme,
            port: section.get_u16("port")?,
            resource: section.get_string("resource"),
            accept_invalid_certs: section.get_bool("accept_invalid_certs")?,
        })
    }

    fn to_entries(&self) -> Vec<(&'static str, String)> {
        let mut entries = vec![("scheme", self.get_scheme())];
        if let Some(port) = self.port {
            entries.push(("port", port.to_string()));
        }
        entries.push(("resource", self.get_resource()));
        entries.push((
            "accept_invalid_certs",
            self.get_accept_invalid_certs().to_string(),
        ));
        entries
    }
}

impl RedfishConfig {
    pub fn get_scheme(&self) -> String {
        self.scheme.clone().unwrap_or_else(|| String::from("https"))
    }

    /// `scheme://host[:port]`, without a trailing slash
    pub fn base_url(&self, host: &str) -> String {
        match self.port {
            Some(port) => format!("{}://{}:{}", self.get_scheme(), host, port),
            None => format!("{}://{}", self.get_scheme(), host),
        }
    }

    /// Sensor resource path, always under `/redfish/v1/`
    pub fn get_resource(&self) -> String {
        let resource = self
            .resource
            .clone()
            .unwrap_or_else(|| String::from("/redfish/v1/Chassis/1/Sensors"));
        let trimmed = resource.trim_start_matches('/');
        if trimmed.starts_with(&REDFISH_PREFIX[1..]) {
            format!("/{}", trimmed)
        } else {
            format!("{}{}", REDFISH_PREFIX, trimmed)
        }
    }

    pub fn get_accept_invalid_certs(&self) -> bool {
        self.accept_invalid_certs.unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PollConfig {
    interval: Option<Duration>,
    timeout: Option<Duration>,
    backoff_ceiling: Option<Duration>,
}

impl Example for PollConfig {
    fn example() -> Self {
        Self {
            interval: Some(Duration::from_secs(10)),
            timeout: Some(Duration::from_secs(30)),
            backoff_ceiling: Some(Duration::from_secs(300)),
        }
    }
}

impl IniSection for PollConfig {
    const NAME: &'static str = "poll";

    fn from_section(section: &Section) -> Result<Self, ConfigError> {
        let timeout = section.get_duration("timeout")?;
        if timeout == Some(Duration::ZERO) {
            return Err(ConfigError::invalid_value(
                Self::NAME,
                "timeout",
                "must be greater than zero",
            ));
        }
        Ok(Self {
            interval: section.get_duration("interval")?,
            timeout,
            backoff_ceiling: section.get_duration("backoff_ceiling")?,
        })
    }

    fn to_entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("interval", format_duration(self.get_interval())),
            ("timeout", format_duration(self.get_timeout())),
            ("backoff_ceiling", format_duration(self.get_backoff_ceiling())),
        ]
    }
}

impl PollConfig {
    pub fn get_interval(&self) -> Duration {
        self.interval.unwrap_or(Duration::from_secs(10))
    }

    pub fn get_timeout(&self) -> Duration {
        self.timeout.unwrap_or(Duration::from_secs(30))
    }

    pub fn get_backoff_ceiling(&self) -> Duration {
        self.backoff_ceiling.unwrap_or(Duration::from_secs(300))
    }
}

/// Everything read from the config file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub primary: TargetConfig,
    pub extra_targets: Vec<TargetConfig>,
    pub ipmi: IpmiConfig,
    pub redfish: RedfishConfig,
    pub poll: PollConfig,
    pub active_data_sender: ActiveSenderConfig,
    pub passive_data_endpoint: PassiveEndpointConfig,
}

impl Config {
    /// Primary target first, then the labelled ones in file order
    pub fn targets(&self) -> impl Iterator<Item = &TargetConfig> {
        std::iter::once(&self.primary).chain(self.extra_targets.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_requires_password() {
        let section = Section::new("bmc", [("name", "bmc-1"), ("user", "admin")]);
        let error = TargetConfig::from_section(String::from("bmc"), &section).unwrap_err();
        assert_eq!(error, ConfigError::missing_key("bmc", "password"));
    }

    #[test]
    fn target_transport_is_parsed() {
        let section = Section::new(
            "bmc.rack2",
            [
                ("name", "bmc-2"),
                ("user", "admin"),
                ("password", "secret"),
                ("transport", "Redfish"),
            ],
        );
        let target = TargetConfig::from_section(String::from("rack2"), &section).unwrap();
        assert_eq!(target.get_transport(), Transport::Redfish);
        assert_eq!(target.connection.host(), "bmc-2");
    }

    #[test]
    fn empty_host_is_reported_against_its_section() {
        let section = Section::new(
            "bmc.rack2",
            [("name", " "), ("user", "admin"), ("password", "secret")],
        );
        let error = TargetConfig::from_section(String::from("rack2"), &section).unwrap_err();
        assert!(
            matches!(error, ConfigError::InvalidValue { section, key, .. } if section == "bmc.rack2" && key == "name")
        );
    }

    #[test]
    fn redfish_resource_gets_prefix() {
        let section = Section::new("redfish", [("resource", "Systems/1")]);
        let config = RedfishConfig::from_section(&section).unwrap();
        assert_eq!(config.get_resource(), "/redfish/v1/Systems/1");

        let section = Section::new("redfish", [("resource", "/redfish/v1/Chassis/1/Thermal")]);
        let config = RedfishConfig::from_section(&section).unwrap();
        assert_eq!(config.get_resource(), "/redfish/v1/Chassis/1/Thermal");
    }

    #[test]
    fn redfish_base_url() {
        let section = Section::new("redfish", [("scheme", "HTTP"), ("port", "8000")]);
        let config = RedfishConfig::from_section(&section).unwrap();
        assert_eq!(config.base_url("bmc-1"), "http://bmc-1:8000");
        assert_eq!(RedfishConfig::default().base_url("bmc-1"), "https://bmc-1");
    }

    #[test]
    fn redfish_rejects_unknown_scheme() {
        let section = Section::new("redfish", [("scheme", "ftp")]);
        assert!(RedfishConfig::from_section(&section).is_err());
    }

    #[test]
    fn poll_defaults() {
        let config = PollConfig::from_section(&Section::empty("poll")).unwrap();
        assert_eq!(config.get_interval(), Duration::from_secs(10));
        assert_eq!(config.get_timeout(), Duration::from_secs(30));
        assert_eq!(config.get_backoff_ceiling(), Duration::from_secs(300));
    }

    #[test]
    fn poll_rejects_zero_timeout() {
        let section = Section::new("poll", [("timeout", "0s")]);
        assert_eq!(
            PollConfig::from_section(&section),
            Err(ConfigError::invalid_value(
                "poll",
                "timeout",
                "must be greater than zero"
            ))
        );
        let section = Section::new("poll", [("timeout", "250ms")]);
        let config = PollConfig::from_section(&section).unwrap();
        assert_eq!(config.get_timeout(), Duration::from_millis(250));
    }
}
