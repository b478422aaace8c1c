pub mod etcd;

use std::{collections::HashSet, fs, time::Duration};

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::{
    config_error,
    core::{model::Profile, RouterResult},
};

#[derive(Default, Debug, Serialize, Deserialize, Validate)]
#[validate(schema(function = "Config::validate_profiles"))]
pub struct Config {
    #[serde(default)]
    #[validate(nested)]
    pub agent: AgentConfig,

    #[validate(nested)]
    pub etcd: Option<Etcd>,

    #[serde(default)]
    pub profiles: Vec<Profile>,

    pub log: Option<Log>,
}

// Config file load and validation
impl Config {
    pub fn load_from_yaml<P>(path: P) -> RouterResult<Self>
    where
        P: AsRef<std::path::Path> + std::fmt::Display,
    {
        let conf_str = fs::read_to_string(&path)
            .map_err(|e| config_error!("Unable to read conf file from {}: {}", path, e))?;
        debug!("Conf file read from {path}");
        Self::from_yaml(&conf_str)
    }

    pub fn from_yaml(conf_str: &str) -> RouterResult<Self> {
        trace!("Read conf file: {conf_str}");
        let conf: Config = serde_yaml::from_str(conf_str)
            .map_err(|e| config_error!("Unable to parse yaml conf: {}", e))?;

        trace!("Loaded conf: {conf:?}");

        conf.validate()
            .map_err(|e| config_error!("Conf file valid failed: {}", e))?;

        Ok(conf)
    }

    pub fn to_yaml(&self) -> RouterResult<String> {
        serde_yaml::to_string(self).map_err(|e| config_error!(e))
    }

    fn validate_profiles(&self) -> Result<(), ValidationError> {
        let mut names = HashSet::new();
        for profile in &self.profiles {
            if profile.name.is_empty() {
                return Err(ValidationError::new("profile_name_required"));
            }
            if !names.insert(profile.name.as_str()) {
                let mut err = ValidationError::new("duplicate_profile_name");
                err.add_param("name".into(), &profile.name);
                return Err(err);
            }
        }
        Ok(())
    }
}

/// Control-plane agent client settings.
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct AgentConfig {
    /// Upper bound in seconds for a single agent call.
    #[serde(default = "AgentConfig::default_timeout")]
    #[validate(range(min = 1))]
    pub timeout: u64,
    #[serde(default = "AgentConfig::default_jk_manager_path")]
    pub jk_manager_path: String,
    #[serde(default = "AgentConfig::default_server_manager_path")]
    pub server_manager_path: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            timeout: Self::default_timeout(),
            jk_manager_path: Self::default_jk_manager_path(),
            server_manager_path: Self::default_server_manager_path(),
        }
    }
}

impl AgentConfig {
    fn default_timeout() -> u64 {
        30
    }

    fn default_jk_manager_path() -> String {
        "jkmanager".to_string()
    }

    fn default_server_manager_path() -> String {
        "apache-manager".to_string()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct Etcd {
    #[validate(length(min = 1))]
    pub host: Vec<String>,
    #[serde(default = "Etcd::default_prefix")]
    pub prefix: String,
    pub timeout: Option<u32>,
    pub connect_timeout: Option<u32>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl Etcd {
    fn default_prefix() -> String {
        "/router-manager".to_string()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Log {
    pub path: String,
}
