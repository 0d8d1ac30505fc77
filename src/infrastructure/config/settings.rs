use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub websocket: WebSocketConfig,
    #[serde(default)]
    pub otel: OtelConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub files: FilesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    /// Token lifetime in seconds
    #[serde(default = "default_token_ttl")]
    pub expires_in_seconds: u64,
}

/// User directory persistence. Without a URL the in-memory store is used.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// bcrypt work factor for new password hashes
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    /// Heartbeat interval in seconds (server sends heartbeat frames)
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval: u64,
    /// Outbound buffer per connection; a full buffer drops frames
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
    /// Seconds clients are told to wait before reconnecting after shutdown
    #[serde(default = "default_reconnect_after")]
    pub reconnect_after_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// `text` for humans, `json` for log shippers
    #[serde(default)]
    pub format: LogFormat,
}

/// Product image uploads.
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Directory uploaded images are written to
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    /// Public base URL used to build image links
    #[serde(default = "default_public_url")]
    pub public_url: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_token_ttl() -> u64 {
    2 * 60 * 60 // 2 hours
}

fn default_pool_size() -> u32 {
    10
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_idle_timeout() -> u64 {
    600
}

fn default_bcrypt_cost() -> u32 {
    10
}

fn default_heartbeat_interval() -> u64 {
    30 // 30 seconds
}

fn default_outbound_buffer() -> usize {
    32
}

fn default_reconnect_after() -> u64 {
    5
}

fn default_upload_dir() -> String {
    "./static/products".to_string()
}

fn default_public_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_max_upload_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "shopfront-service".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("jwt.expires_in_seconds", 7200)?
            .set_default("auth.bcrypt_cost", 10)?
            .set_default("websocket.heartbeat_interval", 30)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // SHOP_JWT__SECRET, SHOP_DATABASE__URL, SHOP_SERVER__PORT, ...
            .add_source(
                Environment::with_prefix("SHOP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins"),
            );

        builder.build()?.try_deserialize()
    }

    /// All defaults, signing tokens with `secret`.
    pub fn with_jwt_secret(secret: impl Into<String>) -> Self {
        Self {
            server: ServerConfig::default(),
            jwt: JwtConfig::with_secret(secret),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            websocket: WebSocketConfig::default(),
            otel: OtelConfig::default(),
            logging: LoggingConfig::default(),
            files: FilesConfig::default(),
        }
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.trim().is_empty() {
            return Err(ConfigError::Message("jwt.secret must not be empty".into()));
        }
        if self.websocket.heartbeat_interval == 0 {
            return Err(ConfigError::Message(
                "websocket.heartbeat_interval must be at least 1 second".into(),
            ));
        }
        if self.websocket.outbound_buffer == 0 {
            return Err(ConfigError::Message(
                "websocket.outbound_buffer must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.otel.sampling_ratio) {
            return Err(ConfigError::Message(format!(
                "otel.sampling_ratio must be within 0.0..=1.0, got {}",
                self.otel.sampling_ratio
            )));
        }
        if self.files.max_upload_bytes == 0 {
            return Err(ConfigError::Message(
                "files.max_upload_bytes must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            pool_size: default_pool_size(),
            connect_timeout_seconds: default_connect_timeout(),
            idle_timeout_seconds: default_idle_timeout(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: default_bcrypt_cost(),
        }
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: default_heartbeat_interval(),
            outbound_buffer: default_outbound_buffer(),
            reconnect_after_seconds: default_reconnect_after(),
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_service_name(),
            sampling_ratio: default_sampling_ratio(),
        }
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            public_url: default_public_url(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl JwtConfig {
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: None,
            audience: None,
            expires_in_seconds: default_token_ttl(),
        }
    }
}
