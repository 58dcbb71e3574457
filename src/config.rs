use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::core::allergen::{AllergenMatchPolicy, SubstringPolicy, SynonymPolicy};
use crate::services::ollama::GenerationOptions;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub profile_store: ProfileStoreSettings,
    #[serde(default)]
    pub ollama: OllamaSettings,
    #[serde(default)]
    pub mealdb: MealDbSettings,
    #[serde(default)]
    pub wger: WgerSettings,
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub allergen: AllergenSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 5000 }

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileStoreSettings {
    #[serde(default = "default_firestore_endpoint")]
    pub endpoint: String,
    pub project_id: String,
    #[serde(default = "default_profile_collection")]
    pub collection: String,
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_firestore_endpoint() -> String { "https://firestore.googleapis.com/v1".to_string() }
fn default_profile_collection() -> String { "users".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct OllamaSettings {
    #[serde(default = "default_ollama_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_ollama_model")]
    pub model: String,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_num_predict")]
    pub num_predict: i32,
    #[serde(default = "default_num_ctx")]
    pub num_ctx: u32,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            endpoint: default_ollama_endpoint(),
            model: default_ollama_model(),
            timeout_secs: default_generation_timeout_secs(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            num_predict: default_num_predict(),
            num_ctx: default_num_ctx(),
        }
    }
}

impl OllamaSettings {
    pub fn options(&self) -> GenerationOptions {
        GenerationOptions {
            temperature: self.temperature,
            top_p: self.top_p,
            top_k: self.top_k,
            num_predict: self.num_predict,
            num_ctx: self.num_ctx,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_ollama_endpoint() -> String { "http://localhost:11434".to_string() }
fn default_ollama_model() -> String { "llama3".to_string() }
fn default_generation_timeout_secs() -> u64 { 120 }
fn default_temperature() -> f64 { 0.7 }
fn default_top_p() -> f64 { 0.9 }
fn default_top_k() -> u32 { 40 }
fn default_num_predict() -> i32 { 512 }
fn default_num_ctx() -> u32 { 4096 }

/// TheMealDB recipe lookup
#[derive(Debug, Clone, Deserialize)]
pub struct MealDbSettings {
    #[serde(default = "default_mealdb_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MealDbSettings {
    fn default() -> Self {
        Self {
            endpoint: default_mealdb_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl MealDbSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// wger exercise database
#[derive(Debug, Clone, Deserialize)]
pub struct WgerSettings {
    #[serde(default = "default_wger_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WgerSettings {
    fn default() -> Self {
        Self {
            endpoint: default_wger_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl WgerSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_mealdb_endpoint() -> String { "https://www.themealdb.com/api/json/v1/1".to_string() }
fn default_wger_endpoint() -> String { "https://wger.de/api/v2".to_string() }
fn default_timeout_secs() -> u64 { 30 }

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSettings {
    #[serde(default = "default_catalog_path")]
    pub path: String,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self { path: default_catalog_path() }
    }
}

fn default_catalog_path() -> String { "data/meals_with_nutrition.json".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_suggestion_limit")]
    pub suggestion_limit: usize,
    #[serde(default = "default_check_concurrency")]
    pub check_concurrency: usize,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            suggestion_limit: default_suggestion_limit(),
            check_concurrency: default_check_concurrency(),
        }
    }
}

fn default_tolerance() -> f64 { 0.15 }
fn default_suggestion_limit() -> usize { 5 }
fn default_check_concurrency() -> usize { 4 }

/// Allergen matching policy selection
#[derive(Debug, Clone, Deserialize)]
pub struct AllergenSettings {
    /// `substring` or `synonym`
    #[serde(default = "default_allergen_policy")]
    pub policy: String,
    /// Extra synonyms merged over the built-in table when `policy = "synonym"`
    #[serde(default)]
    pub synonyms: HashMap<String, Vec<String>>,
}

impl Default for AllergenSettings {
    fn default() -> Self {
        Self {
            policy: default_allergen_policy(),
            synonyms: HashMap::new(),
        }
    }
}

impl AllergenSettings {
    /// Build the configured match policy; unknown names fall back to substring
    pub fn policy(&self) -> Arc<dyn AllergenMatchPolicy> {
        match self.policy.trim().to_lowercase().as_str() {
            "synonym" | "synonyms" => Arc::new(
                SynonymPolicy::with_common_allergens().merged(self.synonyms.clone()),
            ),
            "substring" => Arc::new(SubstringPolicy),
            other => {
                tracing::warn!("Unknown allergen policy {:?}, using substring matching", other);
                Arc::new(SubstringPolicy)
            }
        }
    }
}

fn default_allergen_policy() -> String { "substring".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

fn environment() -> Environment {
    // e.g., NUTRI__OLLAMA__MODEL -> ollama.model
    Environment::with_prefix("NUTRI")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration files (config/default.toml, then config/local.toml)
    /// 3. Environment variables (prefixed with NUTRI__)
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("config/default").required(false))
            // Local overrides for development
            .add_source(File::with_name("config/local").required(false))
            .add_source(environment())
            .build()?
            .try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment())
            .build()?
            .try_deserialize()
    }
}
