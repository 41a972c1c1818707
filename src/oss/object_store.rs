use std::io::Write;
use std::path::Path;

use crate::oss::{
    BucketMeta, DeletedObject, GetObjectOptions, ListOptions, ObjectMeta, ObjectStoreError,
    PutFileOptions,
};

/// 惰性的对象列举结果
pub type ObjectIter<'a> = Box<dyn Iterator<Item = Result<ObjectMeta, ObjectStoreError>> + 'a>;

/// 单个存储桶上的对象存储接口
///
/// 所有操作同步阻塞，不做重试，失败直接返回给调用方
pub trait ObjectStore: Send + Sync {
    /// 构造时确定的存储桶名称
    fn bucket(&self) -> &str;

    /// 获取存储桶元数据
    fn get_bucket_metadata(&self) -> Result<BucketMeta, ObjectStoreError>;

    /// 上传本地文件，返回创建的对象
    fn put_file(
        &self,
        local_path: &Path,
        options: PutFileOptions,
    ) -> Result<ObjectMeta, ObjectStoreError>;

    /// 分块下载对象写入 `sink`，返回写入的字节数
    fn get_object_to(
        &self,
        name: &str,
        sink: &mut dyn Write,
        options: &GetObjectOptions,
    ) -> Result<u64, ObjectStoreError>;

    /// 删除对象
    fn delete_object(&self, name: &str) -> Result<DeletedObject, ObjectStoreError>;

    /// 按页惰性列举对象
    fn list_objects(&self, options: ListOptions) -> ObjectIter<'_>;

    /// 上传文件并为 readers/owners 授权，对象名取本地文件名
    fn upload_object(
        &self,
        local_path: &Path,
        readers: &[String],
        owners: &[String],
    ) -> Result<ObjectMeta, ObjectStoreError> {
        let options = PutFileOptions {
            readers: readers.to_vec(),
            owners: owners.to_vec(),
            ..Default::default()
        };
        self.put_file(local_path, options)
    }

    /// 下载对象到 `sink`，完成后交还 `sink`
    fn get_object<W: Write>(&self, name: &str, mut sink: W) -> Result<W, ObjectStoreError>
    where
        Self: Sized,
    {
        self.get_object_to(name, &mut sink, &GetObjectOptions::default())?;
        Ok(sink)
    }

    /// 列举存储桶中的全部对象
    ///
    /// 结果全部保存在内存中，只适合对象数量有限的存储桶；
    /// 大存储桶请直接迭代 `list_objects`
    fn list_bucket(&self) -> Result<Vec<ObjectMeta>, ObjectStoreError> {
        self.list_objects(ListOptions::default()).collect()
    }
}

/// 本地路径对应的对象名（文件名部分）
pub fn object_name_for(local_path: &Path) -> Result<String, ObjectStoreError> {
    local_path
        .file_name()
        .and_then(|n| n.to_str())
        .map(String::from)
        .ok_or_else(|| {
            ObjectStoreError::InvalidInput(format!(
                "无法从路径获取对象名: {}",
                local_path.display()
            ))
        })
}
