use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chatgate::llm::GeminiConfig;
use chatgate::llm::gemini::{DEFAULT_API_KEY_ENV, DEFAULT_MODEL, GEMINI_API_URL};
use chatgate::{AdmissionConfig, DrainConfig};

const DEFAULT_SYSTEM_PROMPT: &str = "You are a medical assistant. Your role is to provide general medical \
information, answer health-related questions, and offer guidance on common health concerns. However, you should \
always remind users that you are not a substitute for professional medical advice, diagnosis, or treatment. For \
serious medical conditions or emergencies, users should always consult a qualified healthcare provider.";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub llm: LlmConfig,
    pub queue: QueueConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub base_url: String,
    pub api_key_env: String,
    pub timeout_ms: u64,
    pub system_prompt: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: GEMINI_API_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_ms: 120000,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub max_requests_per_window: usize,
    pub window_ms: u64,
    pub cooldown_ms: u64,
    pub poll_delay_ms: u64,
    pub max_tokens_per_window: Option<u64>,
    pub call_timeout_ms: Option<u64>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_requests_per_window: 5,
            window_ms: 60000,
            cooldown_ms: 20000,
            poll_delay_ms: 1000,
            max_tokens_per_window: None,
            call_timeout_ms: Some(120000),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            llm: LlmConfig::default(),
            queue: QueueConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.queue.max_requests_per_window == 0 {
            eyre::bail!("queue.max_requests_per_window must be at least 1");
        }
        if self.queue.window_ms == 0 {
            eyre::bail!("queue.window_ms must be greater than zero");
        }
        if self.queue.poll_delay_ms == 0 {
            eyre::bail!("queue.poll_delay_ms must be greater than zero");
        }
        if self.queue.max_tokens_per_window == Some(0) {
            eyre::bail!("queue.max_tokens_per_window must be at least 1, or omitted for no token budget");
        }
        Ok(())
    }

    pub fn admission_config(&self) -> AdmissionConfig {
        let q = &self.queue;
        AdmissionConfig {
            max_requests_per_window: q.max_requests_per_window,
            window: Duration::from_millis(q.window_ms),
            cooldown: Duration::from_millis(q.cooldown_ms),
            max_tokens_per_window: q.max_tokens_per_window,
        }
    }

    pub fn drain_config(&self) -> DrainConfig {
        DrainConfig::default()
            .with_poll_delay(Duration::from_millis(self.queue.poll_delay_ms))
            .with_call_timeout(self.queue.call_timeout_ms.map(Duration::from_millis))
    }

    pub fn gemini_config(&self) -> GeminiConfig {
        GeminiConfig {
            model: self.llm.model.clone(),
            base_url: self.llm.base_url.clone(),
            api_key_env: self.llm.api_key_env.clone(),
            timeout: Duration::from_millis(self.llm.timeout_ms),
            system_prompt: self.llm.system_prompt.clone(),
        }
    }
}
