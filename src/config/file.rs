// Licensed under the Open Software License version 3.0
use super::{
    connection::ConnectionParams,
    error::ConfigError,
    section::{IniSection, Section},
    types::{Config, Example, IpmiConfig, PollConfig, RedfishConfig, TargetConfig},
};
use crate::{
    active_sender::config::ActiveSenderConfig, passive_endpoint::config::PassiveEndpointConfig,
};
use ini::{EscapePolicy, Ini, ParseOption};
use regex::Regex;
use std::{fs, path::Path};

const PRIMARY_SECTION: &str = "bmc";
const TARGET_SECTION_REGEX: &str = r"^bmc(?:\.([A-Za-z0-9_-]+))?$";

fn parse_options() -> ParseOption {
    // Values are taken verbatim, passwords may contain quotes and backslashes
    ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    }
}

fn read_sections(path: &Path) -> Result<Vec<Section>, ConfigError> {
    tracing::trace!("Reading config file {}", path.display());
    let text = fs::read_to_string(path).map_err(|error| ConfigError::NotFound {
        path: path.display().to_string(),
        reason: error.to_string(),
    })?;
    let ini = Ini::load_from_str_opt(&text, parse_options()).map_err(|error| {
        ConfigError::MalformedSection {
            section: String::from("<file>"),
            reason: error.to_string(),
        }
    })?;
    // Keys outside of any section are ignored
    Ok(ini
        .iter()
        .filter_map(|(name, properties)| {
            name.map(|name| Section::new(name.trim(), properties.iter()))
        })
        .collect())
}

fn find_section<'a>(sections: &'a [Section], name: &str) -> Option<&'a Section> {
    sections.iter().find(|section| section.name() == name)
}

fn read_optional<T: IniSection + Default>(sections: &[Section]) -> Result<T, ConfigError> {
    match find_section(sections, T::NAME) {
        Some(section) => T::from_section(section),
        None => Ok(T::default()),
    }
}

fn read_targets(sections: &[Section]) -> Result<(TargetConfig, Vec<TargetConfig>), ConfigError> {
    let target_regex = Regex::new(TARGET_SECTION_REGEX).map_err(|error| {
        ConfigError::MalformedSection {
            section: String::from(PRIMARY_SECTION),
            reason: error.to_string(),
        }
    })?;
    let primary = find_section(sections, PRIMARY_SECTION).ok_or_else(|| {
        ConfigError::MalformedSection {
            section: String::from(PRIMARY_SECTION),
            reason: String::from("required section is missing"),
        }
    })?;
    let primary = TargetConfig::from_section(String::from(PRIMARY_SECTION), primary)?;

    let mut extra_targets: Vec<TargetConfig> = Vec::new();
    for section in sections
        .iter()
        .filter(|section| section.name().starts_with("bmc."))
    {
        let label = target_regex
            .captures(section.name())
            .and_then(|captures| captures.get(1))
            .map(|label| label.as_str().to_string())
            .ok_or_else(|| ConfigError::MalformedSection {
                section: section.name().to_string(),
                reason: String::from("target label may only contain letters, digits, '_' and '-'"),
            })?;
        if extra_targets.iter().any(|target| target.label == label) {
            return Err(ConfigError::MalformedSection {
                section: section.name().to_string(),
                reason: String::from("duplicate target section"),
            });
        }
        extra_targets.push(TargetConfig::from_section(label, section)?);
    }
    Ok((primary, extra_targets))
}

/// Reads the whole config file. Reading is the only side effect.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let sections = read_sections(path)?;
    let (primary, extra_targets) = read_targets(&sections)?;
    let config = Config {
        primary,
        extra_targets,
        ipmi: read_optional::<IpmiConfig>(&sections)?,
        redfish: read_optional::<RedfishConfig>(&sections)?,
        poll: read_optional::<PollConfig>(&sections)?,
        active_data_sender: read_optional::<ActiveSenderConfig>(&sections)?,
        passive_data_endpoint: read_optional::<PassiveEndpointConfig>(&sections)?,
    };
    tracing::debug!(
        "Read config with {} target(s)",
        1 + config.extra_targets.len()
    );
    Ok(config)
}

/// Credentials of the `[bmc]` section only
pub fn load_connection_params(path: &Path) -> Result<ConnectionParams, ConfigError> {
    Ok(load(path)?.primary.connection)
}

fn push_section<T: IniSection>(ini: &mut Ini, section: &T) {
    for (key, value) in section.to_entries() {
        ini.set_to(Some(T::NAME), key.to_string(), value);
    }
}

pub fn example_ini() -> Ini {
    let mut ini = Ini::new();
    ini.with_section(Some(PRIMARY_SECTION))
        .set("name", "bmc.lan")
        .set("user", "admin")
        .set("password", "EXAMPLE_PASSWORD")
        .set("transport", "cli");
    push_section(&mut ini, &IpmiConfig::example());
    push_section(&mut ini, &RedfishConfig::example());
    push_section(&mut ini, &PollConfig::example());
    push_section(&mut ini, &ActiveSenderConfig::example());
    push_section(&mut ini, &PassiveEndpointConfig::example());
    ini
}

///  Writes an example config file unless one already exists
/// # Returns
/// `true` if config was written to file
/// `false` if config file already exists or couldn't be written
pub fn create_example_config_if_not_exists(path: &Path) -> bool {
    if path.exists() {
        return false;
    }
    match example_ini().write_to_file_policy(path, EscapePolicy::Nothing) {
        Ok(()) => true,
        Err(error) => {
            tracing::error!("Failed to write {}: {}", path.display(), error);
            false
        }
    }
}

#[cfg(test)]
// Use tempfile::TempDir
mod tests {
    use super::*;
    use crate::config::types::Transport;
    use std::time::Duration;

    fn write_config(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_file_path = temp_dir.path().join("config.ini");
        fs::write(&config_file_path, contents).unwrap();
        (temp_dir, config_file_path)
    }

    #[test]
    fn test_load_connection_params() {
        let (_temp_dir, path) =
            write_config("[BMC]\nName = bmc-oahu10000\nuser = admin\npassword = p\"a\\ss;word\n");
        let params = load_connection_params(&path).unwrap();
        assert_eq!(params.host(), "bmc-oahu10000");
        assert_eq!(params.user(), "admin");
        assert_eq!(params.password(), "p\"a\\ss;word");
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("absent.ini");
        let error = load(&path).unwrap_err();
        assert!(matches!(error, ConfigError::NotFound { .. }));
    }

    #[test]
    fn test_missing_section() {
        let (_temp_dir, path) = write_config("[poll]\ninterval = 5s\n");
        let error = load(&path).unwrap_err();
        assert!(
            matches!(error, ConfigError::MalformedSection { section, .. } if section == "bmc")
        );
    }

    #[test]
    fn test_missing_password() {
        let (_temp_dir, path) = write_config("[bmc]\nname = bmc-1\nuser = admin\n");
        let error = load(&path).unwrap_err();
        assert_eq!(error, ConfigError::missing_key("bmc", "password"));
    }

    #[test]
    fn test_error_text_has_no_secrets() {
        let (_temp_dir, path) = write_config("[bmc]\nname = \nuser = admin\npassword = hunter2\n");
        let error = load(&path).unwrap_err();
        assert!(!error.to_string().contains("hunter2"));
    }

    #[test]
    fn test_extra_targets_and_sections() {
        let (_temp_dir, path) = write_config(
            "[bmc]\nname = bmc-1\nuser = admin\npassword = a\n\n\
             [bmc.rack2]\nname = bmc-2\nuser = root\npassword = b\ntransport = redfish\n\n\
             [poll]\ninterval = 2s\nbackoff_ceiling = 1m\n\n\
             [ipmi]\ntool = /opt/freeipmi/sbin/ipmi-sensors\n",
        );
        let config = load(&path).unwrap();
        let targets: Vec<&TargetConfig> = config.targets().collect();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].label, "bmc");
        assert_eq!(targets[1].label, "rack2");
        assert_eq!(targets[1].get_transport(), Transport::Redfish);
        assert_eq!(config.poll.get_interval(), Duration::from_secs(2));
        assert_eq!(config.poll.get_backoff_ceiling(), Duration::from_secs(60));
        assert_eq!(config.poll.get_timeout(), Duration::from_secs(30));
        assert_eq!(
            config.ipmi.get_tool(),
            std::path::PathBuf::from("/opt/freeipmi/sbin/ipmi-sensors")
        );
    }

    #[test]
    fn test_bad_target_label() {
        let (_temp_dir, path) = write_config(
            "[bmc]\nname = bmc-1\nuser = admin\npassword = a\n\n[bmc.rack 2]\nname = x\n",
        );
        let error = load(&path).unwrap_err();
        assert!(matches!(error, ConfigError::MalformedSection { .. }));
    }

    #[test]
    fn test_example_config_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.ini");
        assert!(create_example_config_if_not_exists(&path));
        assert!(!create_example_config_if_not_exists(&path));
        let config = load(&path).unwrap();
        assert_eq!(config.primary.connection.host(), "bmc.lan");
        assert_eq!(config.ipmi, IpmiConfig::example());
        assert_eq!(config.redfish, RedfishConfig::example());
        assert_eq!(config.poll, PollConfig::example());
        assert_eq!(config.active_data_sender, ActiveSenderConfig::example());
        assert_eq!(config.passive_data_endpoint, PassiveEndpointConfig::example());
    }
}
