use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::llm::{LLMConfig, LLMProvider};
use crate::script::{ResponseMode, TemplateVersion};

/// Locations searched when no config file is given explicitly
const CONFIG_PATHS: &[&str] = &[
    "scene-script.toml",
    "config/scene-script.toml",
    "/etc/scene-script/config.toml",
];

/// Configuration for the scene script service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// HTTP listener settings
    pub server: ServerConfig,

    /// Generation backend settings
    pub llm: LLMConfig,

    /// Script generation settings
    pub script: ScriptConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScriptConfig {
    /// Prompt template revision
    pub template: TemplateVersion,

    /// Plain text or schema-validated output
    pub response_mode: ResponseMode,

    /// Fewest scenes a request may ask for
    pub min_scenes: u8,

    /// Most scenes a request may ask for
    pub max_scenes: u8,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            template: TemplateVersion::V2,
            response_mode: ResponseMode::Text,
            min_scenes: 2,
            max_scenes: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is not set
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// First config file that exists in the standard locations
    pub fn find_config_file() -> Option<&'static str> {
        first_existing(CONFIG_PATHS)
    }

    /// Defaults with environment overrides, no config file
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load a specific config file, then apply environment overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML config file without environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Override settings from environment variables read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api_key) = lookup("OPENAI_API_KEY") {
            self.llm.api_key = Some(api_key);
        }

        if let Some(model) = lookup("OPENAI_MODEL") {
            self.llm.model = model;
        }

        if let Some(provider) = lookup("SCENE_SCRIPT_PROVIDER") {
            self.llm.provider = provider.parse::<LLMProvider>()?;
        }

        if let Some(endpoint) = lookup("SCENE_SCRIPT_ENDPOINT") {
            self.llm.endpoint = Some(endpoint);
        }

        if let Some(timeout) = lookup("SCENE_SCRIPT_TIMEOUT_SECONDS") {
            self.llm.timeout_seconds = timeout
                .parse()
                .with_context(|| format!("Invalid SCENE_SCRIPT_TIMEOUT_SECONDS: {}", timeout))?;
        }

        if let Some(host) = lookup("SCENE_SCRIPT_HOST") {
            self.server.host = host;
        }

        if let Some(port) = lookup("SCENE_SCRIPT_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid SCENE_SCRIPT_PORT: {}", port))?;
        }

        if let Some(template) = lookup("SCENE_SCRIPT_TEMPLATE") {
            self.script.template = template.parse().map_err(|e: String| anyhow!(e))?;
        }

        if let Some(mode) = lookup("SCENE_SCRIPT_RESPONSE_MODE") {
            self.script.response_mode = mode.parse().map_err(|e: String| anyhow!(e))?;
        }

        if let Some(log_level) = lookup("SCENE_SCRIPT_LOG_LEVEL") {
            self.logging.log_level = log_level;
        }

        Ok(())
    }

    /// Save configuration to file. The API key is never written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration. Run once at startup.
    pub fn validate(&self) -> Result<()> {
        self.validate_settings()?;

        if self.llm.provider == LLMProvider::OpenAI
            && self.llm.api_key.as_deref().map_or(true, |k| k.trim().is_empty())
        {
            return Err(anyhow!("Missing OPENAI_API_KEY environment variable"));
        }

        tracing::info!("✅ Configuration validation passed");
        Ok(())
    }

    /// Validate everything except credentials
    pub fn validate_settings(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow!("server.port must be greater than 0"));
        }

        if self.script.min_scenes == 0 {
            return Err(anyhow!("script.min_scenes must be greater than 0"));
        }

        if self.script.min_scenes > self.script.max_scenes {
            return Err(anyhow!(
                "script.min_scenes ({}) must not exceed script.max_scenes ({})",
                self.script.min_scenes,
                self.script.max_scenes
            ));
        }

        if self.llm.model.trim().is_empty() {
            return Err(anyhow!("llm.model must not be empty"));
        }

        if self.llm.timeout_seconds == 0 {
            return Err(anyhow!("llm.timeout_seconds must be greater than 0"));
        }

        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Scene Script Service Configuration:\n\
            - Listen: {}:{}\n\
            - Provider: {:?}\n\
            - Model: {}\n\
            - Timeout: {}s\n\
            - Template: {}\n\
            - Response Mode: {}\n\
            - Scenes: {}-{}",
            self.server.host,
            self.server.port,
            self.llm.provider,
            self.llm.model,
            self.llm.timeout_seconds,
            self.script.template,
            self.script.response_mode,
            self.script.min_scenes,
            self.script.max_scenes
        )
    }
}

fn first_existing<'a>(paths: &[&'a str]) -> Option<&'a str> {
    paths.iter().copied().find(|path| Path::new(path).is_file())
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_provider(mut self, provider: LLMProvider) -> Self {
        self.config.llm.provider = provider;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.llm.model = model.into();
        self
    }

    pub fn with_template(mut self, template: TemplateVersion) -> Self {
        self.config.script.template = template;
        self
    }

    pub fn with_response_mode(mut self, mode: ResponseMode) -> Self {
        self.config.script.response_mode = mode;
        self
    }

    pub fn with_scene_limits(mut self, min_scenes: u8, max_scenes: u8) -> Self {
        self.config.script.min_scenes = min_scenes;
        self.config.script.max_scenes = max_scenes;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
