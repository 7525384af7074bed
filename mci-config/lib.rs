pub use self::config::{
    ALL_NAMESPACES, APP_NAME, APP_VERSION, ClusterConfig, ClusterMetadata, Config, DEFAULT_CONFIG_PATH, RateLimitConfig,
    ResourceConfig,
};
pub use self::errors::ConfigError;

mod config;
mod errors;
