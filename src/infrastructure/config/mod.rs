mod settings;

pub use settings::{
    AuthConfig, DatabaseConfig, FilesConfig, JwtConfig, LogFormat, LoggingConfig, OtelConfig,
    ServerConfig, Settings, WebSocketConfig,
};
