use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf, time::Duration};

pub const DEFAULT_BASE_URL: &str = "https://yunyi.cfd/claude";
/// Sent when no key is configured anywhere; the proxy will reject it.
pub const DEFAULT_API_KEY: &str = "sk-ant-REDACTED";
pub const DEFAULT_TIMEOUT_SECS: f64 = 60.0;
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";
pub const DEFAULT_MAX_TOKENS: u32 = 50;
pub const DEFAULT_PROMPT: &str = "请用一句话回复：你好";

pub const ENV_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const ENV_BASE_URL: &str = "ANTHROPIC_BASE_URL";
pub const ENV_TIMEOUT: &str = "LLM_PROBE_TIMEOUT";
pub const ENV_MODEL: &str = "LLM_PROBE_MODEL";

const MASK_VISIBLE_CHARS: usize = 20;

/// Settings stored on disk. Every field is optional; missing ones fall
/// through to the environment and then to the built-in defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<f64>,
    pub model: Option<String>,
}

impl FileConfig {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "llm-probe", "llm-probe")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// Values given on the command line. These win over everything else.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub timeout_secs: Option<f64>,
    pub model: Option<String>,
}

/// Fully resolved settings for one probe run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub model: String,
    pub max_tokens: u32,
    pub prompt: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            api_key: DEFAULT_API_KEY.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }
}

impl ProbeConfig {
    /// Resolve from the config file, the process environment and `overrides`.
    pub fn load(overrides: Overrides) -> Result<Self> {
        let file = FileConfig::load()?;
        Self::resolve(file, |name| std::env::var(name).ok(), overrides)
    }

    /// Layering: defaults < file < environment < overrides.
    ///
    /// Empty environment values count as unset.
    pub fn resolve<F>(file: FileConfig, env: F, overrides: Overrides) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |name: &str| env(name).filter(|v| !v.trim().is_empty());
        let mut cfg = Self::default();

        if let Some(key) = env(ENV_API_KEY).or(file.api_key) {
            cfg.api_key = key;
        }

        if let Some(url) = overrides.base_url.or_else(|| env(ENV_BASE_URL)).or(file.base_url) {
            cfg.base_url = url;
        }

        if let Some(model) = overrides.model.or_else(|| env(ENV_MODEL)).or(file.model) {
            cfg.model = model;
        }

        let timeout_secs = match overrides.timeout_secs {
            Some(secs) => Some(secs),
            None => match env(ENV_TIMEOUT) {
                Some(raw) => Some(raw.trim().parse::<f64>().with_context(|| {
                    format!("Invalid {ENV_TIMEOUT} value '{raw}': expected seconds")
                })?),
                None => file.timeout_secs,
            },
        };
        if let Some(secs) = timeout_secs {
            cfg.timeout = parse_timeout(secs)?;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.base_url.trim();
        if url.is_empty() {
            return Err(anyhow!(
                "Base URL must not be empty.\n\
                 Hint: set {ENV_BASE_URL} or run `llm-probe configure`."
            ));
        }

        let parsed = reqwest::Url::parse(url)
            .with_context(|| format!("Invalid base URL '{url}'"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(anyhow!(
                "Unsupported base URL scheme '{}': expected http or https",
                parsed.scheme()
            ));
        }

        if self.max_tokens == 0 {
            return Err(anyhow!("max_tokens must be greater than zero"));
        }

        Ok(())
    }

    /// The key as shown in the report: first 20 characters and an ellipsis.
    pub fn masked_api_key(&self) -> String {
        if self.api_key.chars().count() > MASK_VISIBLE_CHARS {
            let head: String = self.api_key.chars().take(MASK_VISIBLE_CHARS).collect();
            format!("{head}...")
        } else {
            self.api_key.clone()
        }
    }
}

fn parse_timeout(secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(anyhow!("Timeout must be a positive number of seconds, got {secs}"));
    }
    Duration::try_from_secs_f64(secs).with_context(|| format!("Timeout {secs}s is out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let cfg =
            ProbeConfig::resolve(FileConfig::default(), env_from(&[]), Overrides::default())
                .expect("defaults must validate");

        assert_eq!(cfg, ProbeConfig::default());
        assert_eq!(cfg.api_key, DEFAULT_API_KEY);
        assert_eq!(cfg.max_tokens, 50);
        assert_eq!(cfg.timeout, Duration::from_secs(60));
    }

    #[test]
    fn env_wins_over_file_and_overrides_win_over_env() {
        let file = FileConfig {
            api_key: Some("FILE_KEY".into()),
            base_url: Some("https://file.test/claude".into()),
            timeout_secs: Some(5.0),
            model: Some("file-model".into()),
        };
        let env = env_from(&[
            (ENV_API_KEY, "ENV_KEY"),
            (ENV_BASE_URL, "https://env.test/claude"),
            (ENV_TIMEOUT, "12.5"),
        ]);
        let overrides = Overrides {
            base_url: Some("https://flag.test/claude".into()),
            ..Overrides::default()
        };

        let cfg = ProbeConfig::resolve(file, env, overrides).expect("valid config");

        assert_eq!(cfg.api_key, "ENV_KEY");
        assert_eq!(cfg.base_url, "https://flag.test/claude");
        assert_eq!(cfg.timeout, Duration::from_secs_f64(12.5));
        assert_eq!(cfg.model, "file-model");
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let env = env_from(&[(ENV_API_KEY, ""), (ENV_BASE_URL, "   ")]);
        let cfg = ProbeConfig::resolve(FileConfig::default(), env, Overrides::default())
            .expect("valid config");

        assert_eq!(cfg.api_key, DEFAULT_API_KEY);
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn rejects_empty_base_url() {
        let overrides = Overrides { base_url: Some(String::new()), ..Overrides::default() };
        let err = ProbeConfig::resolve(FileConfig::default(), env_from(&[]), overrides)
            .unwrap_err();

        assert!(err.to_string().contains("Base URL must not be empty"));
    }

    #[test]
    fn rejects_non_http_base_url() {
        let overrides =
            Overrides { base_url: Some("ftp://example.test".into()), ..Overrides::default() };
        let err = ProbeConfig::resolve(FileConfig::default(), env_from(&[]), overrides)
            .unwrap_err();

        assert!(err.to_string().contains("Unsupported base URL scheme"));
    }

    #[test]
    fn rejects_bad_timeouts() {
        let err = ProbeConfig::resolve(
            FileConfig::default(),
            env_from(&[(ENV_TIMEOUT, "soon")]),
            Overrides::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Invalid LLM_PROBE_TIMEOUT value"));

        let overrides = Overrides { timeout_secs: Some(0.0), ..Overrides::default() };
        let err = ProbeConfig::resolve(FileConfig::default(), env_from(&[]), overrides)
            .unwrap_err();
        assert!(err.to_string().contains("positive number of seconds"));
    }

    #[test]
    fn masks_long_keys_only() {
        let mut cfg = ProbeConfig { api_key: "short".into(), ..ProbeConfig::default() };
        assert_eq!(cfg.masked_api_key(), "short");

        cfg.api_key = "ABCDEFGHIJKLMNOPQRSTUVWXYZ".into();
        assert_eq!(cfg.masked_api_key(), "ABCDEFGHIJKLMNOPQRST...");

        cfg.api_key = "12345678901234567890".into();
        assert_eq!(cfg.masked_api_key(), "12345678901234567890");
    }

    #[test]
    fn file_config_roundtrips_through_toml() {
        let dir = std::env::temp_dir().join(format!("llm-probe-test-{}", std::process::id()));
        let path = dir.join("nested").join("config.toml");

        let cfg = FileConfig {
            api_key: Some("KEY".into()),
            base_url: Some("https://example.test/claude".into()),
            timeout_secs: Some(30.0),
            model: None,
        };
        cfg.save_to(&path).expect("save must succeed");

        let loaded = FileConfig::load_from(&path).expect("load must succeed");
        assert_eq!(loaded, cfg);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_config_file_loads_as_default() {
        let path = std::env::temp_dir().join("llm-probe-definitely-missing").join("config.toml");
        let loaded = FileConfig::load_from(&path).expect("missing file is not an error");
        assert_eq!(loaded, FileConfig::default());
    }
}
