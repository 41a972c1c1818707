use garde::Validate;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use smart_default::SmartDefault;
use std::path::{Path, PathBuf};

use super::{file_source, ConfigError};
use crate::auth::CredentialsConfig;
use crate::oss::GcpGcsObjectStoreConfig;

/// 存储桶配置项名称
pub const STORAGE_BUCKET_KEY: &str = "storage_bucket";

/// 默认配置文件路径（相对于工作目录）
pub const DEFAULT_CONFIG_FILE: &str = "spider.yaml";

/// spider 配置
///
/// ```yaml
/// storage_bucket: my-bucket
/// endpoint: http://localhost:4443   # 可选，本地模拟器
/// test_upload_file: ./README.md     # 可选，默认上传生成的临时文件
/// credentials:
///   key_path: ~/keys/sa.json
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, SmartDefault, Validate)]
#[serde(default)]
pub struct SpiderConfig {
    /// 存储桶名称
    #[garde(length(min = 1))]
    #[default = ""]
    pub storage_bucket: String,

    /// 自定义端点（fake-gcs-server 等模拟器）
    #[garde(skip)]
    pub endpoint: Option<String>,

    /// `run --test-upload` 上传的本地文件
    #[garde(skip)]
    pub test_upload_file: Option<PathBuf>,

    /// 下载分块大小（字节）
    #[garde(range(min = 1))]
    #[default = 104857600]
    pub download_chunk_size: usize,

    /// 凭证配置，未配置时使用默认凭证链
    #[garde(skip)]
    pub credentials: CredentialsConfig,
}

impl SpiderConfig {
    /// 从文件加载配置
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let value = file_source::load_value(path)?;
        Self::from_value(value)
    }

    /// 从已解析的配置文档构造
    ///
    /// 必须包含 `storage_bucket`，其余配置项均有默认值
    pub fn from_value(value: JsonValue) -> Result<Self, ConfigError> {
        match value.get(STORAGE_BUCKET_KEY) {
            None | Some(JsonValue::Null) => {
                return Err(ConfigError::MissingKey {
                    key: STORAGE_BUCKET_KEY.to_string(),
                })
            }
            Some(_) => {}
        }

        let config: Self =
            serde_json::from_value(value).map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if let Err(errors) = config.validate() {
            return Err(ConfigError::Invalid(format!("{}", errors)));
        }

        Ok(config)
    }

    /// 对象存储客户端配置
    pub fn store_config(&self) -> GcpGcsObjectStoreConfig {
        GcpGcsObjectStoreConfig {
            bucket: self.storage_bucket.clone(),
            endpoint: self.endpoint.clone(),
            download_chunk_size: self.download_chunk_size,
            ..Default::default()
        }
    }

    /// 冒烟测试上传的文件（展开 `~`），未配置时返回 `None`
    pub fn test_upload_path(&self) -> Option<PathBuf> {
        self.test_upload_file
            .as_ref()
            .map(|path| PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned()))
    }
}
