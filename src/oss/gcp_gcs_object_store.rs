// API 文档参考：
// GCS JSON API: https://cloud.google.com/storage/docs/json_api/v1
// objects.insert 多段上传: https://cloud.google.com/storage/docs/uploading-objects#uploading-an-object
// objects.get (alt=media) 范围下载: https://cloud.google.com/storage/docs/json_api/v1/objects/get
// objects.list 字段投影: https://cloud.google.com/storage/docs/json_api#partial-response

use garde::Validate;
use rand::Rng;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{CONTENT_RANGE, CONTENT_TYPE, RANGE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use urlencoding::encode;

use crate::auth::{AccessToken, CredentialProvider};
use crate::oss::object_pager::{ObjectPage, ObjectPager};
use crate::oss::object_store::object_name_for;
use crate::oss::{
    AclEntry, BucketMeta, DeletedObject, GetObjectOptions, ListOptions, ObjectIter, ObjectMeta,
    ObjectStore, ObjectStoreError, PutFileOptions, TransferProgress,
};

/// GCS JSON API 默认端点
pub const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

/// 默认下载分块 100MB
pub const DEFAULT_DOWNLOAD_CHUNK_SIZE: usize = 100 * 1024 * 1024;

/// GCP GCS 配置
#[derive(Debug, Deserialize, Serialize, SmartDefault, Clone, Validate)]
#[serde(default)]
pub struct GcpGcsObjectStoreConfig {
    /// 存储桶名称
    #[garde(length(min = 1))]
    #[default = ""]
    pub bucket: String,

    /// 自定义端点（可选，用于本地模拟器如 fake-gcs-server）
    #[garde(skip)]
    pub endpoint: Option<String>,

    /// 下载分块大小（字节）
    #[garde(range(min = 1))]
    #[default = 104857600]
    pub download_chunk_size: usize,

    /// User-Agent
    #[garde(skip)]
    #[default(default_user_agent())]
    pub user_agent: String,
}

/// GCP GCS 实现
///
/// 基于 JSON API 的同步客户端，构造时获取一次访问令牌，之后所有请求复用
pub struct GcpGcsObjectStore {
    http: Client,
    config: GcpGcsObjectStoreConfig,
    token: AccessToken,
}

impl GcpGcsObjectStore {
    /// 唯一的构造方法
    ///
    /// 凭证获取失败时返回 `ObjectStoreError::Credential`
    pub fn new(
        config: GcpGcsObjectStoreConfig,
        credentials: &dyn CredentialProvider,
    ) -> Result<Self, ObjectStoreError> {
        if let Err(errors) = config.validate() {
            return Err(ObjectStoreError::Configuration(format!("{}", errors)));
        }

        let token = credentials.access_token()?;

        // 传输不设超时
        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(None::<std::time::Duration>)
            .build()
            .map_err(|e| ObjectStoreError::Configuration(format!("创建 HTTP 客户端失败: {}", e)))?;

        tracing::info!(
            bucket = %config.bucket,
            endpoint = %endpoint_of(&config),
            credentials = credentials.kind(),
            "GCS 客户端已创建"
        );

        Ok(Self {
            http,
            config,
            token,
        })
    }

    fn bucket_url(&self) -> String {
        format!(
            "{}/storage/v1/b/{}",
            endpoint_of(&self.config),
            encode(&self.config.bucket)
        )
    }

    fn object_url(&self, name: &str) -> String {
        format!("{}/o/{}", self.bucket_url(), encode(name))
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/upload/storage/v1/b/{}/o",
            endpoint_of(&self.config),
            encode(&self.config.bucket)
        )
    }

    fn send(&self, operation: &str, request: RequestBuilder) -> Result<Response, ObjectStoreError> {
        request
            .bearer_auth(&self.token.token)
            .send()
            .map_err(|e| ObjectStoreError::network(operation, e))
    }

    /// 非 2xx 响应转换为错误，对象操作的 404 为 `NotFound`
    fn check(
        operation: &str,
        response: Response,
        object: Option<&str>,
    ) -> Result<Response, ObjectStoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match object {
            Some(key) if status == StatusCode::NOT_FOUND => Err(ObjectStoreError::NotFound {
                key: key.to_string(),
            }),
            _ => Err(ObjectStoreError::Backend {
                operation: operation.to_string(),
                status: status.as_u16(),
                message: error_message(response),
            }),
        }
    }

    fn fetch_object_page(
        &self,
        options: &ListOptions,
        fields: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<ObjectPage, ObjectStoreError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(fields) = fields {
            query.push(("fields", fields.to_string()));
        }
        if let Some(prefix) = &options.prefix {
            query.push(("prefix", prefix.clone()));
        }
        if let Some(page_size) = options.page_size {
            query.push(("maxResults", page_size.to_string()));
        }
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        let url = format!("{}/o", self.bucket_url());
        let response = self.send("objects.list", self.http.get(&url).query(&query))?;
        let response = Self::check("objects.list", response, None)?;

        let page: ObjectPage = response
            .json()
            .map_err(|e| ObjectStoreError::network("objects.list", e))?;

        tracing::debug!(
            bucket = %self.config.bucket,
            items = page.items.len(),
            has_next = page.next_page_token.is_some(),
            "列举对象分页"
        );
        Ok(page)
    }
}

impl ObjectStore for GcpGcsObjectStore {
    fn bucket(&self) -> &str {
        &self.config.bucket
    }

    // buckets.get
    fn get_bucket_metadata(&self) -> Result<BucketMeta, ObjectStoreError> {
        tracing::debug!(bucket = %self.config.bucket, "获取存储桶元数据");

        let response = self.send("buckets.get", self.http.get(self.bucket_url()))?;
        let response = Self::check("buckets.get", response, None)?;

        response
            .json()
            .map_err(|e| ObjectStoreError::network("buckets.get", e))
    }

    // objects.insert (uploadType=multipart)
    fn put_file(
        &self,
        local_path: &Path,
        options: PutFileOptions,
    ) -> Result<ObjectMeta, ObjectStoreError> {
        let name = match &options.name {
            Some(name) => name.clone(),
            None => object_name_for(local_path)?,
        };

        let media = match std::fs::read(local_path) {
            Ok(media) => media,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ObjectStoreError::LocalFileNotFound {
                    path: local_path.display().to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        let acl = options.acl();
        let content_type = options
            .content_type
            .as_deref()
            .unwrap_or("application/octet-stream");

        let resource = InsertObjectResource {
            name: &name,
            content_type,
            metadata: &options.metadata,
            acl: &acl,
        };
        let metadata = serde_json::to_vec(&resource)?;
        let (boundary, body) = multipart_related(&metadata, content_type, &media);

        tracing::info!(
            bucket = %self.config.bucket,
            object = %name,
            bytes = media.len(),
            acl_entries = acl.len(),
            "上传对象"
        );

        let request = self
            .http
            .post(self.upload_url())
            .query(&[("uploadType", "multipart")])
            .header(CONTENT_TYPE, format!("multipart/related; boundary={}", boundary))
            .body(body);

        let response = self.send("objects.insert", request)?;
        let response = Self::check("objects.insert", response, None)?;

        response
            .json()
            .map_err(|e| ObjectStoreError::network("objects.insert", e))
    }

    // objects.get (alt=media)，每块一个 Range 请求
    fn get_object_to(
        &self,
        name: &str,
        sink: &mut dyn Write,
        options: &GetObjectOptions,
    ) -> Result<u64, ObjectStoreError> {
        let chunk_size = options
            .chunk_size
            .unwrap_or(self.config.download_chunk_size)
            .max(1) as u64;
        let url = self.object_url(name);
        let report = |transferred_bytes: u64, total_bytes: u64| {
            if let Some(callback) = &options.progress_callback {
                callback.on_progress(&TransferProgress {
                    transferred_bytes,
                    total_bytes,
                });
            }
        };

        tracing::info!(bucket = %self.config.bucket, object = %name, chunk_size, "下载对象");

        let mut offset: u64 = 0;
        loop {
            let range = format!("bytes={}-{}", offset, offset + chunk_size - 1);
            let request = self
                .http
                .get(&url)
                .query(&[("alt", "media")])
                .header(RANGE, range);
            let response = self.send("objects.get_media", request)?;
            let status = response.status();

            // 空对象或上一块恰好读到结尾
            if status == StatusCode::RANGE_NOT_SATISFIABLE {
                report(offset, offset);
                break;
            }

            let response = Self::check("objects.get_media", response, Some(name))?;
            let partial = status == StatusCode::PARTIAL_CONTENT;
            let total = if partial {
                response
                    .headers()
                    .get(CONTENT_RANGE)
                    .and_then(|v| v.to_str().ok())
                    .and_then(parse_content_range)
                    .and_then(|r| r.total)
            } else {
                None
            };

            let chunk = response
                .bytes()
                .map_err(|e| ObjectStoreError::network("objects.get_media", e))?;
            sink.write_all(&chunk)?;
            offset += chunk.len() as u64;

            // 200 表示服务端忽略了 Range，整个对象已在本块中
            let done = !partial
                || chunk.is_empty()
                || match total {
                    Some(total) => offset >= total,
                    None => (chunk.len() as u64) < chunk_size,
                };

            // 总大小未知时只在最后一块报告
            match (done, total) {
                (true, _) => report(offset, offset),
                (false, Some(total)) => report(offset, total),
                (false, None) => {}
            }
            tracing::debug!(object = %name, offset, total = ?total, "下载分块完成");

            if done {
                break;
            }
        }

        sink.flush()?;
        Ok(offset)
    }

    // objects.delete
    fn delete_object(&self, name: &str) -> Result<DeletedObject, ObjectStoreError> {
        tracing::info!(bucket = %self.config.bucket, object = %name, "删除对象");

        let response = self.send("objects.delete", self.http.delete(self.object_url(name)))?;
        let response = Self::check("objects.delete", response, Some(name))?;

        Ok(DeletedObject {
            name: name.to_string(),
            status: response.status().as_u16(),
        })
    }

    // objects.list
    fn list_objects(&self, options: ListOptions) -> ObjectIter<'_> {
        let fields = options.fields.to_query();
        Box::new(ObjectPager::new(move |token: Option<&str>| {
            self.fetch_object_page(&options, fields.as_deref(), token)
        }))
    }
}

fn default_user_agent() -> String {
    format!("spider/{}", env!("CARGO_PKG_VERSION"))
}

fn endpoint_of(config: &GcpGcsObjectStoreConfig) -> &str {
    config
        .endpoint
        .as_deref()
        .unwrap_or(DEFAULT_ENDPOINT)
        .trim_end_matches('/')
}

/// objects.insert 请求体中的对象资源
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertObjectResource<'a> {
    name: &'a str,
    content_type: &'a str,
    #[serde(skip_serializing_if = "is_empty_map")]
    metadata: &'a HashMap<String, String>,
    #[serde(skip_serializing_if = "is_empty_acl")]
    acl: &'a [AclEntry],
}

fn is_empty_map(map: &&HashMap<String, String>) -> bool {
    map.is_empty()
}

fn is_empty_acl(acl: &&[AclEntry]) -> bool {
    acl.is_empty()
}

/// 组装 multipart/related 请求体：JSON 元数据 + 文件内容
fn multipart_related(metadata: &[u8], content_type: &str, media: &[u8]) -> (String, Vec<u8>) {
    let mut rng = rand::thread_rng();
    let mut boundary = format!("==============={:020}==", rng.gen::<u64>());
    while contains(media, boundary.as_bytes()) {
        boundary = format!("==============={:020}==", rng.gen::<u64>());
    }

    let mut body = Vec::with_capacity(metadata.len() + media.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata);
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(media);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    (boundary, body)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// 解析后的 Content-Range 头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub start: Option<u64>,
    pub end: Option<u64>,
    pub total: Option<u64>,
}

/// 解析 `bytes 0-99/1234`、`bytes 0-99/*` 或 `bytes */1234`
pub fn parse_content_range(value: &str) -> Option<ContentRange> {
    let rest = value.trim().strip_prefix("bytes")?.trim_start();
    let (range, total) = rest.split_once('/')?;

    let total = match total.trim() {
        "*" => None,
        t => Some(t.parse().ok()?),
    };

    let (start, end) = match range.trim() {
        "*" => (None, None),
        r => {
            let (s, e) = r.split_once('-')?;
            (Some(s.trim().parse().ok()?), Some(e.trim().parse().ok()?))
        }
    };

    Some(ContentRange { start, end, total })
}

/// 错误响应的可读信息
///
/// 优先取 JSON 错误体中的 `error.message`
fn error_message(response: Response) -> String {
    let reason = response
        .status()
        .canonical_reason()
        .unwrap_or("unknown")
        .to_string();
    let body = match response.text() {
        Ok(body) => body,
        Err(_) => return reason,
    };

    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }
    #[derive(Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) => parsed.error.message,
        Err(_) if body.trim().is_empty() => reason,
        Err(_) => body.trim().to_string(),
    }
}
