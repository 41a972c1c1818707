//! auth 模块 - 凭证获取
//!
//! 凭证以 `CredentialProvider` 的形式注入存储客户端，
//! 默认凭证链由 `ApplicationDefaultCredentials` 从进程环境中解析，
//! 凭证文件和元数据服务的令牌交换由 google-cloud-auth 完成

mod application_default;
mod error;
mod google_auth;
mod provider;

pub use application_default::{
    AmbientEnv, ApplicationDefaultCredentials, CredentialsConfig, ACCESS_TOKEN_ENV,
    APPLICATION_CREDENTIALS_ENV,
};
pub use error::CredentialError;
pub use google_auth::GoogleAuthProvider;
pub use provider::{AccessToken, CredentialProvider, StaticTokenProvider};

/// 写 ACL 需要 full_control 权限
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.full_control";
