use thiserror::Error;

/// 凭证获取错误
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("未找到可用的默认凭证: {0}")]
    NotFound(String),

    #[error("读取凭证文件失败: {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("解析凭证失败: {0}")]
    Parse(String),

    #[error("不支持的凭证类型: {0}")]
    UnsupportedType(String),

    #[error("获取访问令牌失败: {0}")]
    Auth(String),
}
