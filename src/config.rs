use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ai::GEMINI_API_BASE;
use crate::analyzer::{AnalyzerOptions, DEFAULT_DURATION_MINUTES, DEFAULT_MAX_BODY_CHARS};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gmail: GmailConfig,
    pub ai: AiConfig,
    pub calendar: CalendarConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GmailConfig {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_body_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// IANA zone used for meetings whose time carries no offset.
    pub timezone: String,
    pub default_duration_minutes: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-2.5-flash-lite".to_string(),
            base_url: GEMINI_API_BASE.to_string(),
            timeout_secs: 30,
            max_body_chars: DEFAULT_MAX_BODY_CHARS,
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            timezone: "Europe/Madrid".to_string(),
            default_duration_minutes: DEFAULT_DURATION_MINUTES,
        }
    }
}

impl Config {
    /// Returns the config directory path ($MAILPILOT_HOME or ~/.mailpilot)
    pub fn config_dir() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var("MAILPILOT_HOME")
            && !dir.is_empty()
        {
            return Ok(PathBuf::from(dir));
        }
        let home = dirs::home_dir().ok_or_else(|| Error::Config("could not find home directory".to_string()))?;
        Ok(home.join(".mailpilot"))
    }

    /// Returns the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Returns the token file path
    pub fn token_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("token.json"))
    }

    /// Load config from the default location, then apply env overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env();
        Ok(config)
    }

    /// Load config from file or fall back to defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    fn apply_env(&mut self) {
        let overrides = [
            ("GEMINI_API_KEY", &mut self.ai.api_key),
            ("GOOGLE_CLIENT_ID", &mut self.gmail.client_id),
            ("GOOGLE_CLIENT_SECRET", &mut self.gmail.client_secret),
        ];
        for (var, field) in overrides {
            if let Ok(value) = std::env::var(var)
                && !value.is_empty()
            {
                *field = value;
            }
        }
    }

    /// Set one value by its dotted key, validating it first
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "gmail.client_id" => self.gmail.client_id = value.to_string(),
            "gmail.client_secret" => self.gmail.client_secret = value.to_string(),
            "ai.api_key" => self.ai.api_key = value.to_string(),
            "ai.model" => self.ai.model = value.to_string(),
            "ai.timeout_secs" => {
                self.ai.timeout_secs = value
                    .parse()
                    .map_err(|_| Error::Config(format!("not a number of seconds: {}", value)))?;
            }
            "calendar.timezone" => {
                value
                    .parse::<Tz>()
                    .map_err(|_| Error::Config(format!("unknown timezone: {}", value)))?;
                self.calendar.timezone = value.to_string();
            }
            _ => return Err(Error::Config(format!("unknown config key: {}", key))),
        }
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.calendar
            .timezone
            .parse()
            .map_err(|_| Error::Config(format!("unknown timezone: {}", self.calendar.timezone)))
    }

    pub fn analyzer_options(&self) -> AnalyzerOptions {
        AnalyzerOptions {
            max_body_chars: self.ai.max_body_chars,
        }
    }

    /// Check if the config is valid for operation
    pub fn is_valid(&self) -> bool {
        !self.gmail.client_id.is_empty()
            && !self.gmail.client_secret.is_empty()
            && !self.ai.api_key.is_empty()
    }
}
