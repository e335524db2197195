use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub google_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub faculty_passcode: String,
    pub data_file: String,
    pub app_url: String,
    pub bind_addr: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Load environment variables from a local .env file if present
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let config_builder = config::Config::builder()
            // Load base config from TOML file
            .add_source(
                config::File::with_name(&format!("config/{}", env)).required(false), // Allow missing config file, fallback to ENV
            )
            // Override with environment variables (prefix: APP_)
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        let settings = config_builder.build()?;

        // Extract values with fallbacks to ENV or defaults
        let google_api_key = settings
            .get_string("gemini.api_key")
            .or_else(|_| env::var("GOOGLE_API_KEY"))
            .unwrap_or_else(|_| {
                if env == "prod" {
                    panic!("FATAL: GOOGLE_API_KEY must be set in production!");
                }
                eprintln!("WARNING: GOOGLE_API_KEY is not set; question generation will fail");
                String::new()
            });

        let gemini_model = settings
            .get_string("gemini.model")
            .or_else(|_| env::var("GEMINI_MODEL"))
            .unwrap_or_else(|_| "gemini-2.0-flash".to_string());

        let gemini_base_url = settings
            .get_string("gemini.base_url")
            .or_else(|_| env::var("GEMINI_BASE_URL"))
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string());

        let faculty_passcode = settings
            .get_string("auth.faculty_passcode")
            .or_else(|_| env::var("FACULTY_PASSCODE"))
            .unwrap_or_else(|_| {
                if env == "prod" {
                    panic!("FATAL: FACULTY_PASSCODE must be set in production!");
                }
                eprintln!("WARNING: Using default faculty passcode (dev mode only!)");
                "faculty123".to_string()
            });

        let data_file = settings
            .get_string("store.data_file")
            .or_else(|_| env::var("DATA_FILE"))
            .unwrap_or_else(|_| "data/exit_tickets.json".to_string());

        let app_url = settings
            .get_string("server.app_url")
            .or_else(|_| env::var("APP_URL"))
            .unwrap_or_else(|_| "http://localhost:8081".to_string());

        let bind_addr = settings
            .get_string("server.bind_addr")
            .or_else(|_| env::var("BIND_ADDR"))
            .unwrap_or_else(|_| "0.0.0.0:8081".to_string());

        Ok(Config {
            google_api_key,
            gemini_model,
            gemini_base_url,
            faculty_passcode,
            data_file,
            app_url,
            bind_addr,
        })
    }
}
