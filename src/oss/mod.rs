//! oss 模块 - 对象存储客户端
//!
//! `ObjectStore` 定义单个存储桶上的同步操作，
//! `GcpGcsObjectStore` 基于 GCS JSON API 实现

mod error;
mod gcp_gcs_object_store;
mod object_pager;
mod object_store;
mod object_store_types;

pub use error::ObjectStoreError;
pub use gcp_gcs_object_store::{
    parse_content_range, ContentRange, GcpGcsObjectStore, GcpGcsObjectStoreConfig,
    DEFAULT_DOWNLOAD_CHUNK_SIZE, DEFAULT_ENDPOINT,
};
pub use object_pager::{ObjectPage, ObjectPager};
pub use object_store::{object_name_for, ObjectIter, ObjectStore};
pub use object_store_types::{
    AclEntry, AclRole, BucketMeta, DeletedObject, GetObjectOptions, ListOptions, ObjectFields,
    ObjectMeta, PrintProgress, ProgressCallback, PutFileOptions, TransferProgress,
    DEFAULT_METADATA_KEY,
};
