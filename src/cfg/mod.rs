//! cfg 模块 - 配置加载
//!
//! 启动时读取一次静态配置文件，支持 YAML/JSON/TOML

mod error;
pub mod file_source;
mod spider_config;

pub use error::ConfigError;
pub use file_source::ConfigFormat;
pub use spider_config::{SpiderConfig, DEFAULT_CONFIG_FILE, STORAGE_BUCKET_KEY};
