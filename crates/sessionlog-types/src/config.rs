use std::{fmt, fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{Result, SessionLogError};

/// Identity of the host application embedded in every snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
    pub bundle_version_code: Option<String>,
}

impl AppInfo {
    pub fn bundle_version_code(&self) -> &str {
        self.bundle_version_code
            .as_deref()
            .filter(|code| !code.is_empty())
            .unwrap_or(&self.version)
    }
}

impl Default for AppInfo {
    fn default() -> Self {
        Self {
            name: "sessionlog".into(),
            version: "0.0.0".into(),
            bundle_version_code: None,
        }
    }
}

/// Which environment the host is running in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Editor,
    Build,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Editor => f.write_str("editor"),
            RunMode::Build => f.write_str("build"),
        }
    }
}

/// Save/send toggles for one run mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ModeConfig {
    pub save_local_json: bool,
    pub send_to_server: bool,
}

impl ModeConfig {
    /// True when at least one delivery channel is enabled.
    pub fn is_active(&self) -> bool {
        self.save_local_json || self.send_to_server
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModesConfig {
    pub editor: ModeConfig,
    pub build: ModeConfig,
}

impl Default for ModesConfig {
    fn default() -> Self {
        Self {
            editor: ModeConfig {
                save_local_json: true,
                send_to_server: false,
            },
            build: ModeConfig {
                save_local_json: true,
                send_to_server: true,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub api_key_header: Option<String>,
}

impl ServerConfig {
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.trim().is_empty())
    }

    /// Header name/value pair, present only when both halves are configured.
    pub fn auth_header(&self) -> Option<(&str, &str)> {
        let name = self.api_key_header.as_deref().filter(|h| !h.is_empty())?;
        let value = self.api_key.as_deref().filter(|k| !k.is_empty())?;
        Some((name, value))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            api_key_header: Some("X-API-Key".into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SessionConfig {
    pub action_names: Vec<String>,
    pub periodic_save_interval_secs: f64,
}

impl SessionConfig {
    /// Periodic save cadence; zero or negative disables it.
    pub fn periodic_save_interval(&self) -> Option<Duration> {
        (self.periodic_save_interval_secs > 0.0)
            .then(|| Duration::from_secs_f64(self.periodic_save_interval_secs))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    pub max_quit_wait_secs: f64,
}

impl ShutdownConfig {
    pub fn ceiling(&self) -> Duration {
        Duration::from_secs_f64(self.max_quit_wait_secs.max(0.0))
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            max_quit_wait_secs: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpsConfig {
    pub log_level: String,
    pub storage_dir: Option<String>,
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            storage_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SessionLoggerConfig {
    pub app: AppInfo,
    pub modes: ModesConfig,
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub shutdown: ShutdownConfig,
    pub ops: OpsConfig,
}

impl SessionLoggerConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|err| {
            SessionLogError::Configuration(format!(
                "unable to read config file {}: {err}",
                path_ref.display()
            ))
        })?;
        toml::from_str(&contents).map_err(|err| {
            SessionLogError::Configuration(format!(
                "failed to parse config file {}: {err}",
                path_ref.display()
            ))
        })
    }

    pub fn mode(&self, run_mode: RunMode) -> ModeConfig {
        match run_mode {
            RunMode::Editor => self.modes.editor,
            RunMode::Build => self.modes.build,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.app.name.trim().is_empty() {
            return Err(SessionLogError::Configuration(
                "app.name must not be empty".into(),
            ));
        }
        if !self.session.periodic_save_interval_secs.is_finite() {
            return Err(SessionLogError::Configuration(
                "session.periodic_save_interval_secs must be a finite number".into(),
            ));
        }
        if !self.shutdown.max_quit_wait_secs.is_finite() || self.shutdown.max_quit_wait_secs < 0.0
        {
            return Err(SessionLogError::Configuration(
                "shutdown.max_quit_wait_secs must be a finite, non-negative number".into(),
            ));
        }
        if let Some(index) = self
            .session
            .action_names
            .iter()
            .position(|name| name.trim().is_empty())
        {
            return Err(SessionLogError::Configuration(format!(
                "session.action_names[{index}] must not be empty"
            )));
        }
        Ok(())
    }
}
