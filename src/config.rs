use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Explicit kubeconfig file; `None` lets the client infer.
    #[serde(default)]
    pub kubeconfig: Option<String>,

    #[serde(default = "default_delegate_label")]
    pub delegate_label: String,

    /// Local manifest file. When unset, the manifest is fetched from
    /// `endpoint`/`yaml_path`/`token`.
    #[serde(default)]
    pub manifest: Option<String>,

    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_yaml_path")]
    pub yaml_path: String,

    #[serde(default = "default_cache_path")]
    pub cache_path: String,

    /// Upper bound on waiting for the delegate pod, in seconds. Unset
    /// means wait indefinitely.
    #[serde(default)]
    pub watch_timeout_secs: Option<u64>,
}

fn default_delegate_label() -> String {
    "app=chaos-delegate".to_string()
}

fn default_yaml_path() -> String {
    "file".to_string()
}

fn default_cache_path() -> String {
    crate::manifest::DEFAULT_CACHE_FILE.to_string()
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Environment::default())
            .build()?;

        let settings: Config = config
            .try_deserialize()
            .unwrap_or_else(|_| Config::default());

        Ok(settings)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            delegate_label: default_delegate_label(),
            manifest: None,
            endpoint: None,
            token: None,
            yaml_path: default_yaml_path(),
            cache_path: default_cache_path(),
            watch_timeout_secs: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.delegate_label, "app=chaos-delegate");
        assert_eq!(config.cache_path, "chaos-delegate-manifest.yaml");
        assert_eq!(config.kubeconfig, None);
        assert_eq!(config.watch_timeout_secs, None);
    }
}
