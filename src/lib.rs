//! spider - Google Cloud Storage 存储桶客户端
//!
//! 读取配置、从环境中获取默认凭证，对单个存储桶执行基础操作：
//! 获取元数据、上传、下载、删除、列举。
//!
//! ## 模块
//!
//! - **cfg**: 配置加载（YAML/JSON/TOML）
//! - **auth**: 凭证获取（固定令牌、服务账号、用户凭证、元数据服务）
//! - **oss**: 对象存储接口及 GCS JSON API 实现
//!
//! 所有操作同步阻塞，不做重试、缓存或并发传输。

pub mod auth;
pub mod cfg;
pub mod oss;

pub use auth::{ApplicationDefaultCredentials, CredentialError, CredentialProvider};
pub use cfg::{ConfigError, SpiderConfig};
pub use oss::{GcpGcsObjectStore, GcpGcsObjectStoreConfig, ObjectMeta, ObjectStore, ObjectStoreError};
