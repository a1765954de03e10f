// Licensed under the Open Software License version 3.0
use super::error::ConfigError;
use std::fmt;
use zeroize::Zeroizing;

/// Credentials for one BMC. The password is wiped from memory on drop
/// and never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    host: String,
    user: String,
    password: Zeroizing<String>,
}

impl ConnectionParams {
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let host = host.into().trim().to_string();
        let user = user.into();
        let password = Zeroizing::new(password.into());
        if host.is_empty() {
            return Err(ConfigError::invalid_value("bmc", "name", "host is empty"));
        }
        if user.trim().is_empty() {
            return Err(ConfigError::invalid_value("bmc", "user", "user is empty"));
        }
        Ok(Self {
            host,
            user,
            password,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_hides_password() {
        let params = ConnectionParams::new("bmc-1", "admin", "hunter2").unwrap();
        let printed = format!("{:?}", params);
        assert!(printed.contains("bmc-1"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn rejects_empty_host() {
        let error = ConnectionParams::new("  ", "admin", "hunter2").unwrap_err();
        assert!(matches!(error, ConfigError::InvalidValue { key, .. } if key == "name"));
    }

    #[test]
    fn empty_password_is_allowed() {
        // Some BMCs ship with a blank password for the default account
        let params = ConnectionParams::new("bmc-1", "admin", "").unwrap();
        assert_eq!(params.password(), "");
    }
}
