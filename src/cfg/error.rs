use thiserror::Error;

/// 配置加载错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    NotFound { path: String },

    #[error("读取配置文件失败: {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("解析配置文件失败 [{format}] {path}: {message}")]
    Parse {
        path: String,
        format: &'static str,
        message: String,
    },

    #[error("缺少必填配置项: {key}")]
    MissingKey { key: String },

    #[error("配置项无效: {0}")]
    Invalid(String),
}
