use thiserror::Error;

use crate::auth::CredentialError;

/// 对象存储统一错误类型
#[derive(Error, Debug)]
pub enum ObjectStoreError {
    #[error("对象不存在: {key}")]
    NotFound { key: String },

    #[error("本地文件不存在: {path}")]
    LocalFileNotFound { path: String },

    #[error("凭证获取失败: {0}")]
    Credential(#[from] CredentialError),

    #[error("后端错误 [{operation}] HTTP {status}: {message}")]
    Backend {
        operation: String,
        status: u16,
        message: String,
    },

    #[error("网络错误 [{operation}]: {source}")]
    Network {
        operation: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("无效参数: {0}")]
    InvalidInput(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

impl ObjectStoreError {
    /// 本地文件或远端对象不存在
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ObjectStoreError::NotFound { .. } | ObjectStoreError::LocalFileNotFound { .. }
        )
    }

    /// 后端返回的错误或请求未能送达后端
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            ObjectStoreError::Backend { .. } | ObjectStoreError::Network { .. }
        )
    }

    pub(crate) fn network(operation: &str, source: reqwest::Error) -> Self {
        ObjectStoreError::Network {
            operation: operation.to_string(),
            source,
        }
    }
}
