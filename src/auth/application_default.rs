//! 默认凭证链
//!
//! 从进程环境中隐式解析凭证，优先级从高到低：
//! 1. 配置中的 `access_token`，或环境变量 `GOOGLE_OAUTH_ACCESS_TOKEN`
//! 2. 配置中的 `key_json` / `key_path`
//! 3. 环境变量 `GOOGLE_APPLICATION_CREDENTIALS` 指向的文件
//! 4. google-cloud-auth 的默认查找：gcloud 默认凭证文件，然后是 GCE/GKE 元数据服务

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{CredentialError, CredentialProvider, GoogleAuthProvider, StaticTokenProvider};

pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";
pub const APPLICATION_CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// 凭证配置，全部为空时完全依赖环境
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// 固定访问令牌（优先级 1）
    pub access_token: Option<String>,

    /// 凭证 JSON 内容（优先级 2）
    pub key_json: Option<String>,

    /// 凭证文件路径（优先级 2，`key_json` 之后）
    pub key_path: Option<String>,
}

impl CredentialsConfig {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.key_json.is_none() && self.key_path.is_none()
    }
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .field("key_json", &self.key_json.as_ref().map(|_| "***"))
            .field("key_path", &self.key_path)
            .finish()
    }
}

/// 解析凭证链时读取的环境变量
#[derive(Debug, Clone, Default)]
pub struct AmbientEnv {
    pub access_token: Option<String>,
    pub application_credentials: Option<String>,
}

impl AmbientEnv {
    pub fn from_process() -> Self {
        Self {
            access_token: non_empty_env(ACCESS_TOKEN_ENV),
            application_credentials: non_empty_env(APPLICATION_CREDENTIALS_ENV),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// 默认凭证
pub struct ApplicationDefaultCredentials;

impl ApplicationDefaultCredentials {
    /// 按默认凭证链解析当前进程的凭证
    pub fn resolve(config: &CredentialsConfig) -> Result<Box<dyn CredentialProvider>, CredentialError> {
        Self::resolve_in(config, &AmbientEnv::from_process())
    }

    /// 在给定环境中解析凭证
    pub fn resolve_in(
        config: &CredentialsConfig,
        env: &AmbientEnv,
    ) -> Result<Box<dyn CredentialProvider>, CredentialError> {
        let provider = Self::select(config, env)?;
        tracing::info!(credentials = provider.kind(), "已解析默认凭证");
        Ok(provider)
    }

    fn select(
        config: &CredentialsConfig,
        env: &AmbientEnv,
    ) -> Result<Box<dyn CredentialProvider>, CredentialError> {
        if let Some(token) = config.access_token.as_ref().or(env.access_token.as_ref()) {
            return Ok(Box::new(StaticTokenProvider::new(token.clone())));
        }

        if let Some(json) = &config.key_json {
            return Ok(Box::new(GoogleAuthProvider::from_json(json)?));
        }

        if let Some(path) = &config.key_path {
            let path = shellexpand::tilde(path).into_owned();
            return Ok(Box::new(GoogleAuthProvider::from_file(Path::new(&path))?));
        }

        // 显式指定的文件读不到时报错，不再继续查找
        if let Some(path) = &env.application_credentials {
            return Ok(Box::new(GoogleAuthProvider::from_file(Path::new(path))?));
        }

        Ok(Box::new(GoogleAuthProvider::ambient()?))
    }
}
