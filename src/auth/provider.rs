use chrono::{DateTime, Utc};

use super::CredentialError;

/// OAuth 访问令牌
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// 没有过期时间的令牌视为永不过期
    pub fn is_expired(&self) -> bool {
        self.expires_at.map(|t| t <= Utc::now()).unwrap_or(false)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"***")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// 凭证提供者
///
/// 存储客户端构造时调用一次 `access_token`，失败即构造失败
pub trait CredentialProvider: Send + Sync {
    /// 获取访问令牌
    fn access_token(&self) -> Result<AccessToken, CredentialError>;

    /// 凭证来源名称，用于日志
    fn kind(&self) -> &'static str;
}

/// 固定令牌
///
/// 来自配置或 `GOOGLE_OAUTH_ACCESS_TOKEN`，也用作测试替身
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: AccessToken,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: AccessToken::new(token),
        }
    }
}

impl CredentialProvider for StaticTokenProvider {
    fn access_token(&self) -> Result<AccessToken, CredentialError> {
        Ok(self.token.clone())
    }

    fn kind(&self) -> &'static str {
        "static_token"
    }
}
