use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::network;


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllowedOrigin {
    Any,
    // Exact value of the `Origin` header, e.g. "https://duel.example.org".
    ThisSite(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    // Waiting sessions are closed after this long. Human-readable, e.g. "5m".
    #[serde(default, with = "humantime_serde")]
    pub join_timeout: Option<Duration>,
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: AllowedOrigin,
}

fn default_port() -> u16 { network::PORT }
fn default_allowed_origin() -> AllowedOrigin { AllowedOrigin::Any }

impl ServerConfig {
    pub fn from_yaml(contents: &str) -> anyhow::Result<Self> { Ok(serde_yaml::from_str(contents)?) }
}


#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = ServerConfig::from_yaml("{}").unwrap();
        assert_eq!(config, ServerConfig {
            port: network::PORT,
            join_timeout: None,
            allowed_origin: AllowedOrigin::Any,
        });
    }

    #[test]
    fn full_config() {
        let config = ServerConfig::from_yaml(
            r#"
port: 8080
join_timeout: 5m
allowed_origin: !ThisSite "https://duel.example.org"
"#,
        )
        .unwrap();
        assert_eq!(config, ServerConfig {
            port: 8080,
            join_timeout: Some(Duration::from_secs(300)),
            allowed_origin: AllowedOrigin::ThisSite("https://duel.example.org".to_owned()),
        });
    }

    #[test]
    fn unknown_fields_rejected() {
        assert!(ServerConfig::from_yaml("prot: 8080").is_err());
        assert!(ServerConfig::from_yaml("join_timeout: soon").is_err());
    }
}
