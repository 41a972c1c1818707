//! 文件配置源
//!
//! 从本地文件加载配置，根据扩展名选择 JSON/YAML/TOML 解析器，
//! 解析前展开 `${VAR}` 形式的环境变量引用

use regex_lite::{Captures, Regex};
use serde_json::Value as JsonValue;
use std::path::Path;

use super::ConfigError;

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

impl ConfigFormat {
    /// 根据扩展名判断格式，未知扩展名按 YAML 处理
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("json") => ConfigFormat::Json,
            Some("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Yaml,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Json => "json",
            ConfigFormat::Toml => "toml",
        }
    }

    fn parse(&self, content: &str) -> Result<JsonValue, String> {
        match self {
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        }
    }
}

/// 读取并解析配置文件
pub fn load_value(path: &Path) -> Result<JsonValue, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.display().to_string(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let format = ConfigFormat::from_path(path);
    parse_value(&content, format).map_err(|message| ConfigError::Parse {
        path: path.display().to_string(),
        format: format.name(),
        message,
    })
}

/// 展开环境变量后解析配置内容
///
/// 空文档解析为 `Null`
pub fn parse_value(content: &str, format: ConfigFormat) -> Result<JsonValue, String> {
    let expanded = expand_env_vars(content)?;
    if expanded.trim().is_empty() {
        return Ok(JsonValue::Null);
    }
    format.parse(&expanded)
}

/// 展开 `${VAR_NAME}`，未设置的变量保持原样
fn expand_env_vars(content: &str) -> Result<String, String> {
    let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| e.to_string())?;
    let expanded = re.replace_all(content, |caps: &Captures| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    });
    Ok(expanded.into_owned())
}
