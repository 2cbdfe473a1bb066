use std::time::Duration;

use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

use crate::domain::ProductProfile;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub batch: BatchSettings,
    pub store: StoreSettings,
    pub product: ProductProfile,
}

#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    pub webdriver_url: String,
    pub headless: bool,
}

#[derive(Deserialize, Clone)]
pub struct BatchSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub analyze_workers: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub verify_workers: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub discover_workers: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub submit_workers: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub nav_timeout_ms: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub settle_ms: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub settle_deep_ms: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub fetch_timeout_s: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub verify_hard_limit_s: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub discover_hard_limit_s: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub submit_hard_limit_s: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub checkpoint_every: usize,
}

impl BatchSettings {
    pub fn nav_timeout(&self) -> Duration {
        Duration::from_millis(self.nav_timeout_ms)
    }

    pub fn settle(&self, deep: bool) -> Duration {
        match deep {
            true => Duration::from_millis(self.settle_deep_ms),
            false => Duration::from_millis(self.settle_ms),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_s)
    }

    pub fn verify_hard_limit(&self) -> Duration {
        Duration::from_secs(self.verify_hard_limit_s)
    }

    pub fn discover_hard_limit(&self) -> Duration {
        Duration::from_secs(self.discover_hard_limit_s)
    }

    pub fn submit_hard_limit(&self) -> Duration {
        Duration::from_secs(self.submit_hard_limit_s)
    }
}

#[derive(Deserialize, Clone)]
pub struct StoreSettings {
    pub entries_path: String,
    pub worklist_path: String,
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");

    let settings = config::Config::builder()
        .add_source(config::File::from(base_path.join("configuration.yaml")))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
