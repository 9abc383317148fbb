use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub listing: ListingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Without a URL the API runs on in-memory repositories.
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: None, max_connections: default_max_connections() }
    }
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ListingConfig {
    #[serde(default = "default_page_sizes")]
    pub page_sizes: Vec<usize>,
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self { page_sizes: default_page_sizes(), default_page_size: default_page_size() }
    }
}

fn default_page_sizes() -> Vec<usize> {
    konak_core::query::PAGE_SIZE_CHOICES.to_vec()
}

fn default_page_size() -> usize {
    25
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `KONAK__DATABASE__URL=postgres://...`
            .add_source(config::Environment::with_prefix("KONAK").separator("__"))
            .build()?;

        s.try_deserialize::<Config>()?.validated()
    }

    fn validated(self) -> Result<Self, config::ConfigError> {
        if self.listing.page_sizes.is_empty() || self.listing.page_sizes.contains(&0) {
            return Err(config::ConfigError::Message(
                "listing.page_sizes must be a non-empty list of positive sizes".into(),
            ));
        }
        if !self.listing.page_sizes.contains(&self.listing.default_page_size) {
            return Err(config::ConfigError::Message(format!(
                "listing.default_page_size {} is not one of {:?}",
                self.listing.default_page_size, self.listing.page_sizes
            )));
        }
        Ok(self)
    }
}
