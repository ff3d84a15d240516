use crate::app::ShutdownSignal;
use crate::simulated::SimulatedModuleConfig;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Top-level configuration of the `appcycle` binary
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppcycleConfig {
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Simulated modules registered by the demo binary
    #[serde(default)]
    pub modules: Vec<SimulatedModuleConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OrchestratorConfig {
    /// Application name attached to every log line
    #[serde(default = "default_name")]
    pub name: String,

    /// Deadline for the init phase, measured from start; unset means none
    #[serde(default)]
    pub init_timeout_ms: Option<u64>,

    /// Deadline for every shutdown phase and for the final sweep
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,

    /// Deadline for a healthcheck round; unset means none
    #[serde(default)]
    pub healthcheck_timeout_ms: Option<u64>,

    /// OS signals that trigger graceful shutdown; empty disables signal handling
    #[serde(default = "default_signals")]
    pub signals: Vec<ShutdownSignal>,

    /// Exit code reported when shutdown was not started by an explicit trigger
    #[serde(default)]
    pub exit_code: i32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            init_timeout_ms: None,
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            healthcheck_timeout_ms: None,
            signals: default_signals(),
            exit_code: 0,
        }
    }
}

impl OrchestratorConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_healthcheck_timeout(mut self, timeout: Duration) -> Self {
        self.healthcheck_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_signals(mut self, signals: Vec<ShutdownSignal>) -> Self {
        self.signals = signals;
        self
    }

    pub fn with_exit_code(mut self, exit_code: i32) -> Self {
        self.exit_code = exit_code;
        self
    }

    pub fn init_timeout(&self) -> Option<Duration> {
        self.init_timeout_ms.map(Duration::from_millis)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn healthcheck_timeout(&self) -> Option<Duration> {
        self.healthcheck_timeout_ms.map(Duration::from_millis)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Message(
                "Application name must not be empty".to_string(),
            ));
        }

        if self.shutdown_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Shutdown timeout must be greater than 0".to_string(),
            ));
        }

        if self.init_timeout_ms == Some(0) {
            return Err(ConfigError::Message(
                "Init timeout must be greater than 0 when set".to_string(),
            ));
        }

        if self.healthcheck_timeout_ms == Some(0) {
            return Err(ConfigError::Message(
                "Healthcheck timeout must be greater than 0 when set".to_string(),
            ));
        }

        Ok(())
    }
}

impl AppcycleConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("appcycle.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let default_signal_names: Vec<String> =
            default_signals().iter().map(ToString::to_string).collect();

        let settings = Config::builder()
            // Start with default values
            .set_default("orchestrator.name", default_name())?
            .set_default(
                "orchestrator.shutdown_timeout_ms",
                default_shutdown_timeout_ms() as i64,
            )?
            .set_default("orchestrator.signals", default_signal_names)?
            .set_default("orchestrator.exit_code", 0)?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Add environment variables, e.g. APPCYCLE_ORCHESTRATOR__SHUTDOWN_TIMEOUT_MS
            .add_source(
                Environment::with_prefix("APPCYCLE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppcycleConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.orchestrator.validate()?;
        for module in &self.modules {
            module.validate()?;
        }
        Ok(())
    }
}

// Default value functions
fn default_name() -> String {
    "unnamed".to_string()
}
fn default_shutdown_timeout_ms() -> u64 {
    3_000
}
fn default_signals() -> Vec<ShutdownSignal> {
    vec![ShutdownSignal::Terminate, ShutdownSignal::Interrupt]
}
