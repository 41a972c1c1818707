use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use smart_default::SmartDefault;
use std::collections::HashMap;
use std::sync::Arc;

/// 列举时默认返回的自定义元数据键
pub const DEFAULT_METADATA_KEY: &str = "my-key";

/// 存储桶元数据
///
/// 只解析常用字段，其余字段原样保存在 `extra` 中
#[serde_as]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketMeta {
    #[serde(default)]
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,

    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_number: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_created: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub extra: JsonMap<String, JsonValue>,
}

/// 对象元数据
///
/// 列举时按字段投影返回，除 `name` 外的字段都可能缺失。
/// `size` 和 `generation` 在 JSON API 中是十进制字符串
#[serde_as]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,

    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// 自定义元数据
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub acl: Option<Vec<AclEntry>>,

    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

/// ACL 角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AclRole {
    Reader,
    Owner,
}

/// 对象 ACL 条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclEntry {
    /// 授权实体，如 `user-alice@example.com`
    pub entity: String,
    pub role: AclRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl AclEntry {
    /// 为用户邮箱授权
    pub fn user(email: &str, role: AclRole) -> Self {
        Self {
            entity: format!("user-{}", email),
            role,
            email: Some(email.to_string()),
        }
    }

    pub fn reader(email: &str) -> Self {
        Self::user(email, AclRole::Reader)
    }

    pub fn owner(email: &str) -> Self {
        Self::user(email, AclRole::Owner)
    }
}

/// 删除确认
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedObject {
    pub name: String,
    pub status: u16,
}

/// 传输进度信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub transferred_bytes: u64,
    pub total_bytes: u64,
}

impl TransferProgress {
    /// 向下取整的百分比，空对象视为 100%
    pub fn percent(&self) -> u8 {
        if self.total_bytes == 0 {
            return 100;
        }
        let ratio = self.transferred_bytes.min(self.total_bytes) as f64 / self.total_bytes as f64;
        (ratio * 100.0).floor() as u8
    }
}

/// 进度回调 trait
pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, progress: &TransferProgress);
}

/// 把下载进度打印到标准输出
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintProgress;

impl ProgressCallback for PrintProgress {
    fn on_progress(&self, progress: &TransferProgress) {
        println!("Download {}%.", progress.percent());
    }
}

/// 文件上传选项
#[derive(Debug, Clone, SmartDefault)]
pub struct PutFileOptions {
    /// 对象名，默认使用本地文件名
    pub name: Option<String>,
    #[default(Some("application/octet-stream".to_string()))]
    pub content_type: Option<String>,
    pub metadata: HashMap<String, String>,
    /// 授予 READER 的用户邮箱
    pub readers: Vec<String>,
    /// 授予 OWNER 的用户邮箱
    pub owners: Vec<String>,
}

impl PutFileOptions {
    /// 由 readers/owners 生成的 ACL，为空表示使用存储桶默认 ACL
    pub fn acl(&self) -> Vec<AclEntry> {
        self.readers
            .iter()
            .map(|r| AclEntry::reader(r))
            .chain(self.owners.iter().map(|o| AclEntry::owner(o)))
            .collect()
    }
}

/// 对象下载选项
#[derive(Clone, SmartDefault)]
pub struct GetObjectOptions {
    /// 分块大小，默认使用客户端配置
    pub chunk_size: Option<usize>,
    /// 进度回调，默认打印到标准输出
    #[default(Some(Arc::new(PrintProgress)))]
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl GetObjectOptions {
    /// 不报告进度
    pub fn quiet() -> Self {
        Self {
            progress_callback: None,
            ..Default::default()
        }
    }
}

impl std::fmt::Debug for GetObjectOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GetObjectOptions")
            .field("chunk_size", &self.chunk_size)
            .field("progress_callback", &self.progress_callback.as_ref().map(|_| "..."))
            .finish()
    }
}

/// 列举选项
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub prefix: Option<String>,
    /// 每页最大条数，由后端决定默认值
    pub page_size: Option<u32>,
    pub fields: ObjectFields,
}

/// 列举时的字段投影
///
/// 默认只返回 `name,size,contentType` 和自定义元数据 `my-key`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectFields {
    fields: Option<Vec<String>>,
    metadata_keys: Vec<String>,
}

impl Default for ObjectFields {
    fn default() -> Self {
        Self::only(["name", "size", "contentType"]).with_metadata_keys([DEFAULT_METADATA_KEY])
    }
}

impl ObjectFields {
    /// 返回全部字段，包括全部自定义元数据
    ///
    /// 之后调用 [`with_metadata_keys`](Self::with_metadata_keys) 不起作用
    pub fn all() -> Self {
        Self {
            fields: None,
            metadata_keys: Vec::new(),
        }
    }

    /// 只返回指定字段，`name` 总是包含在内
    pub fn only<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        if !fields.iter().any(|f| f == "name") {
            fields.insert(0, "name".to_string());
        }
        Self {
            fields: Some(fields),
            metadata_keys: Vec::new(),
        }
    }

    /// 追加需要返回的自定义元数据键
    ///
    /// 对 [`all`](Self::all) 无效，未投影时已返回全部元数据
    pub fn with_metadata_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.fields.is_some() {
            self.metadata_keys.extend(keys.into_iter().map(Into::into));
        }
        self
    }

    /// `fields` 查询参数，`None` 表示不做投影
    pub fn to_query(&self) -> Option<String> {
        let fields = self.fields.as_ref()?;

        let mut items = fields.clone();
        if !self.metadata_keys.is_empty() {
            items.push(format!("metadata({})", self.metadata_keys.join(",")));
        }
        Some(format!("nextPageToken,items({})", items.join(",")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_projection() {
        assert_eq!(
            ObjectFields::default().to_query().as_deref(),
            Some("nextPageToken,items(name,size,contentType,metadata(my-key))")
        );
    }

    #[test]
    fn test_custom_projection() {
        let fields = ObjectFields::only(["size", "updated"]).with_metadata_keys(["a", "b"]);
        assert_eq!(
            fields.to_query().as_deref(),
            Some("nextPageToken,items(name,size,updated,metadata(a,b))")
        );

        assert_eq!(ObjectFields::only(["name"]).to_query().as_deref(), Some("nextPageToken,items(name)"));
        assert_eq!(ObjectFields::all().to_query(), None);
    }

    #[test]
    fn test_all_ignores_metadata_keys() {
        let fields = ObjectFields::all().with_metadata_keys(["a"]);
        assert_eq!(fields, ObjectFields::all());
        assert_eq!(fields.to_query(), None);
    }

    #[test]
    fn test_object_meta_from_json() {
        let meta: ObjectMeta = serde_json::from_value(json!({
            "name": "report.csv",
            "bucket": "b",
            "size": "1024",
            "contentType": "text/csv",
            "generation": "1700000000000000",
            "metadata": { "my-key": "v" },
            "acl": [
                { "entity": "user-a@x.com", "role": "READER", "email": "a@x.com" }
            ],
            "updated": "2024-01-02T03:04:05.678Z"
        }))
        .unwrap();

        assert_eq!(meta.name, "report.csv");
        assert_eq!(meta.size, Some(1024));
        assert_eq!(meta.content_type.as_deref(), Some("text/csv"));
        assert_eq!(meta.metadata.get("my-key").map(String::as_str), Some("v"));
        assert_eq!(meta.generation, Some(1_700_000_000_000_000));
        assert_eq!(meta.acl.unwrap()[0].role, AclRole::Reader);
        assert!(meta.updated.is_some());
    }

    #[test]
    fn test_object_meta_projected() {
        // 投影后只剩部分字段，emulator 可能把 size 当数字返回
        let meta: ObjectMeta = serde_json::from_value(json!({ "name": "a", "size": 7 })).unwrap();
        assert_eq!(meta.size, Some(7));
        assert_eq!(meta.content_type, None);
        assert!(meta.metadata.is_empty());
    }

    #[test]
    fn test_bucket_meta_keeps_unknown_fields() {
        let meta: BucketMeta = serde_json::from_value(json!({
            "kind": "storage#bucket",
            "name": "my-bucket",
            "location": "US",
            "storageClass": "STANDARD",
            "projectNumber": "123456",
            "versioning": { "enabled": true }
        }))
        .unwrap();

        assert_eq!(meta.name, "my-bucket");
        assert_eq!(meta.storage_class.as_deref(), Some("STANDARD"));
        assert_eq!(meta.project_number, Some(123456));
        assert_eq!(meta.extra["kind"], "storage#bucket");
        assert_eq!(meta.extra["versioning"]["enabled"], true);

        let out = serde_json::to_value(&meta).unwrap();
        assert_eq!(out["storageClass"], "STANDARD");
        assert_eq!(out["kind"], "storage#bucket");
        assert!(out.get("id").is_none());
    }

    #[test]
    fn test_acl_from_options() {
        let options = PutFileOptions {
            readers: vec!["a@x.com".to_string()],
            owners: vec!["b@x.com".to_string()],
            ..Default::default()
        };

        let acl = options.acl();
        assert_eq!(acl, vec![AclEntry::reader("a@x.com"), AclEntry::owner("b@x.com")]);
        assert_eq!(
            serde_json::to_value(&acl[0]).unwrap(),
            json!({ "entity": "user-a@x.com", "role": "READER", "email": "a@x.com" })
        );
        assert!(PutFileOptions::default().acl().is_empty());
    }

    #[test]
    fn test_progress_percent() {
        let p = |transferred, total| TransferProgress {
            transferred_bytes: transferred,
            total_bytes: total,
        };
        assert_eq!(p(0, 10).percent(), 0);
        assert_eq!(p(3, 10).percent(), 30);
        assert_eq!(p(2, 3).percent(), 66);
        assert_eq!(p(10, 10).percent(), 100);
        assert_eq!(p(0, 0).percent(), 100);
    }

    #[test]
    fn test_default_get_options_report_progress() {
        assert!(GetObjectOptions::default().progress_callback.is_some());
        assert!(GetObjectOptions::quiet().progress_callback.is_none());
    }
}
