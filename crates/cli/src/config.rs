use config::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;

const ENV_PREFIX: &str = "COMMENTS_";

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub api: ApiSettings,
    pub target: TargetSettings,
    #[serde(default)]
    pub page: PageSettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ApiSettings {
    pub base_url: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct TargetSettings {
    pub project_id: String,
    pub post_id: String,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct PageSettings {
    pub take: Option<u32>,
    pub skip: Option<u32>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());
        Self::from_sources(&run_mode, collect_env_vars(std::env::vars()))
    }

    fn from_sources(run_mode: &str, env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let env_json = serde_json::to_string(&env_map)
            .map_err(|e| ConfigError::Message(format!("Failed to encode environment: {}", e)))?;

        let s = config::Config::builder()
            .set_default("api.base_url", "http://127.0.0.1:3000")?
            .set_default("target.project_id", "demo")?
            .set_default("target.post_id", "hello-world")?
            .add_source(config::File::with_name("comments").required(false))
            .add_source(config::File::with_name(&format!("comments.{}", run_mode)).required(false))
            .add_source(config::File::from_str(&env_json, config::FileFormat::Json))
            .build()?;

        s.try_deserialize()
    }
}

// COMMENTS_API__BASE_URL -> api.base_url
fn collect_env_vars(vars: impl Iterator<Item = (String, String)>) -> HashMap<String, String> {
    vars.filter(|(k, _)| k.starts_with(ENV_PREFIX))
        .map(|(k, v)| {
            let new_key = k
                .trim_start_matches(ENV_PREFIX)
                .replace("__", ".")
                .to_lowercase();
            (new_key, v)
        })
        .collect()
}
