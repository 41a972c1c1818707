//! google-cloud-auth 凭证
//!
//! 令牌的签发和交换都交给 `google-cloud-auth`，这里只负责选择凭证来源，
//! 并用独立的 runtime 把异步的 token source 包装成同步的 `CredentialProvider`

use google_cloud_auth::credentials::CredentialsFile;
use google_cloud_auth::project::{
    create_token_source, create_token_source_from_credentials, Config,
};
use google_cloud_auth::token_source::TokenSource;
use serde_json::Value as JsonValue;
use std::path::Path;
use tokio::runtime::Runtime;

use super::{AccessToken, CredentialError, CredentialProvider, DEFAULT_SCOPE};

const SCOPES: [&str; 1] = [DEFAULT_SCOPE];

/// 基于 google-cloud-auth token source 的凭证
pub struct GoogleAuthProvider {
    source: Box<dyn TokenSource>,
    runtime: Runtime,
    kind: &'static str,
}

impl GoogleAuthProvider {
    /// 从凭证 JSON 内容创建（`service_account` / `authorized_user`）
    pub fn from_json(json: &str) -> Result<Self, CredentialError> {
        let kind = credential_kind(json)?;
        let runtime = new_runtime()?;

        let source = runtime.block_on(async {
            let credentials = CredentialsFile::new_from_str(json)
                .await
                .map_err(|e| CredentialError::Parse(e.to_string()))?;
            create_token_source_from_credentials(&credentials, &scoped_config())
                .await
                .map_err(|e| CredentialError::Auth(e.to_string()))
        })?;

        Ok(Self {
            source,
            runtime,
            kind,
        })
    }

    /// 从凭证文件创建，文件读不到时报错
    pub fn from_file(path: &Path) -> Result<Self, CredentialError> {
        let json = std::fs::read_to_string(path).map_err(|source| CredentialError::ReadFile {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// gcloud 默认凭证文件，或 GCE/GKE 元数据服务
    pub fn ambient() -> Result<Self, CredentialError> {
        let runtime = new_runtime()?;
        let source = runtime
            .block_on(create_token_source(scoped_config()))
            .map_err(|e| CredentialError::NotFound(e.to_string()))?;

        Ok(Self {
            source,
            runtime,
            kind: "application_default",
        })
    }
}

impl CredentialProvider for GoogleAuthProvider {
    fn access_token(&self) -> Result<AccessToken, CredentialError> {
        tracing::debug!(credentials = self.kind, "请求访问令牌");

        let token = self
            .runtime
            .block_on(self.source.token())
            .map_err(|e| CredentialError::Auth(e.to_string()))?;
        Ok(AccessToken::new(token.access_token))
    }

    fn kind(&self) -> &'static str {
        self.kind
    }
}

fn scoped_config() -> Config<'static> {
    Config::default().with_scopes(&SCOPES)
}

fn new_runtime() -> Result<Runtime, CredentialError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CredentialError::Auth(format!("创建 runtime 失败: {}", e)))
}

/// 凭证 JSON 的 `type` 字段
fn credential_kind(json: &str) -> Result<&'static str, CredentialError> {
    let value: JsonValue =
        serde_json::from_str(json).map_err(|e| CredentialError::Parse(e.to_string()))?;

    match value.get("type").and_then(|t| t.as_str()) {
        Some("service_account") => Ok("service_account"),
        Some("authorized_user") => Ok("authorized_user"),
        Some(other) => Err(CredentialError::UnsupportedType(other.to_string())),
        None => Err(CredentialError::Parse("缺少 type 字段".to_string())),
    }
}
