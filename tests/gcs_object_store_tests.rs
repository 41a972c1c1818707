//! GcpGcsObjectStore 集成测试
//!
//! 用 mockito 模拟 GCS JSON API，覆盖元数据、上传、分块下载、删除和分页列举

use mockito::{Matcher, Server};
use std::path::Path;
use std::sync::{Arc, Mutex};

use spider::auth::StaticTokenProvider;
use spider::oss::{
    GcpGcsObjectStore, GcpGcsObjectStoreConfig, GetObjectOptions, ListOptions, ObjectFields,
    ObjectStore, ObjectStoreError, ProgressCallback, TransferProgress,
};

const BUCKET: &str = "my-bucket";
const TOKEN: &str = "test-token";

fn new_store(server: &Server, chunk_size: usize) -> GcpGcsObjectStore {
    let config = GcpGcsObjectStoreConfig {
        bucket: BUCKET.to_string(),
        endpoint: Some(server.url()),
        download_chunk_size: chunk_size,
        ..Default::default()
    };
    GcpGcsObjectStore::new(config, &StaticTokenProvider::new(TOKEN)).unwrap()
}

/// 记录每次回调的百分比
#[derive(Default)]
struct RecordingProgress {
    percents: Mutex<Vec<u8>>,
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, progress: &TransferProgress) {
        self.percents.lock().unwrap().push(progress.percent());
    }
}

fn recording_options(chunk_size: Option<usize>) -> (Arc<RecordingProgress>, GetObjectOptions) {
    let progress = Arc::new(RecordingProgress::default());
    let options = GetObjectOptions {
        chunk_size,
        progress_callback: Some(progress.clone()),
    };
    (progress, options)
}

#[test]
fn test_bucket_metadata_name_matches() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/storage/v1/b/my-bucket")
        .match_header("authorization", "Bearer test-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "kind": "storage#bucket",
                "id": "my-bucket",
                "name": "my-bucket",
                "location": "US",
                "storageClass": "STANDARD",
                "projectNumber": "123456789",
                "timeCreated": "2024-01-02T03:04:05.678Z"
            }"#,
        )
        .create();

    let store = new_store(&server, 1024);
    let meta = store.get_bucket_metadata().unwrap();

    mock.assert();
    assert_eq!(meta.name, store.bucket());
    assert_eq!(meta.location.as_deref(), Some("US"));
    assert_eq!(meta.project_number, Some(123456789));
    assert_eq!(meta.extra["kind"], "storage#bucket");
}

#[test]
fn test_bucket_metadata_forbidden() {
    let mut server = Server::new();
    server
        .mock("GET", "/storage/v1/b/my-bucket")
        .with_status(403)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":{"code":403,"message":"caller does not have storage.buckets.get access"}}"#)
        .create();

    let err = new_store(&server, 1024).get_bucket_metadata().unwrap_err();
    match err {
        ObjectStoreError::Backend {
            operation,
            status,
            message,
        } => {
            assert_eq!(operation, "buckets.get");
            assert_eq!(status, 403);
            assert_eq!(message, "caller does not have storage.buckets.get access");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_bucket_metadata_missing_bucket_is_backend_error() {
    let mut server = Server::new();
    server
        .mock("GET", "/storage/v1/b/my-bucket")
        .with_status(404)
        .with_body("Not Found")
        .create();

    let err = new_store(&server, 1024).get_bucket_metadata().unwrap_err();
    assert!(err.is_backend());
}

#[test]
fn test_upload_with_readers_and_owners() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("sample.txt");
    std::fs::write(&file, b"hello").unwrap();

    let mut server = Server::new();
    let acl = concat!(
        r#""acl":\[\{"entity":"user-r@example\.com","role":"READER","email":"r@example\.com"\},"#,
        r#"\{"entity":"user-o@example\.com","role":"OWNER","email":"o@example\.com"\}\]"#,
    );
    let mock = server
        .mock("POST", "/upload/storage/v1/b/my-bucket/o")
        .match_query(Matcher::UrlEncoded("uploadType".into(), "multipart".into()))
        .match_header("authorization", "Bearer test-token")
        .match_header("content-type", Matcher::Regex("^multipart/related; boundary=".into()))
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#""name":"sample\.txt""#.into()),
            Matcher::Regex(acl.into()),
            Matcher::Regex("\r\n\r\nhello\r\n".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"name":"sample.txt","bucket":"my-bucket","size":"5","contentType":"application/octet-stream"}"#)
        .create();

    let store = new_store(&server, 1024);
    let object = store
        .upload_object(&file, &["r@example.com".to_string()], &["o@example.com".to_string()])
        .unwrap();

    mock.assert();
    assert_eq!(object.name, "sample.txt");
    assert_eq!(object.size, Some(5));
}

#[test]
fn test_upload_without_acl_omits_field() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("plain.bin");
    std::fs::write(&file, b"x").unwrap();

    let mut server = Server::new();
    let mock = server
        .mock("POST", "/upload/storage/v1/b/my-bucket/o")
        .match_query(Matcher::UrlEncoded("uploadType".into(), "multipart".into()))
        .match_body(Matcher::Regex(
            r#"\{"name":"plain\.bin","contentType":"application/octet-stream"\}"#.into(),
        ))
        .with_status(200)
        .with_body(r#"{"name":"plain.bin","size":"1"}"#)
        .create();

    new_store(&server, 1024).upload_object(&file, &[], &[]).unwrap();
    mock.assert();
}

#[test]
fn test_upload_missing_local_file() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create();

    let err = new_store(&server, 1024)
        .upload_object(Path::new("/nonexistent/sample.txt"), &[], &[])
        .unwrap_err();

    mock.assert();
    assert!(matches!(err, ObjectStoreError::LocalFileNotFound { .. }));
}

#[test]
fn test_chunked_download_reassembles_content() {
    let mut server = Server::new();
    let chunks = [
        ("bytes=0-4", "hello", "bytes 0-4/12"),
        ("bytes=5-9", " worl", "bytes 5-9/12"),
        ("bytes=10-14", "d!", "bytes 10-11/12"),
    ];
    let mocks: Vec<_> = chunks
        .iter()
        .map(|(range, body, content_range)| {
            server
                .mock("GET", "/storage/v1/b/my-bucket/o/dir%2Fgreeting.txt")
                .match_query(Matcher::UrlEncoded("alt".into(), "media".into()))
                .match_header("range", *range)
                .with_status(206)
                .with_header("content-range", *content_range)
                .with_body(*body)
                .create()
        })
        .collect();

    let store = new_store(&server, 1024);
    let (progress, options) = recording_options(Some(5));
    let mut sink = Vec::new();
    let written = store
        .get_object_to("dir/greeting.txt", &mut sink, &options)
        .unwrap();

    for mock in &mocks {
        mock.assert();
    }
    assert_eq!(written, 12);
    assert_eq!(sink, b"hello world!");
    assert_eq!(*progress.percents.lock().unwrap(), vec![41, 83, 100]);
}

#[test]
fn test_chunked_download_with_unknown_total() {
    let mut server = Server::new();
    let chunks = [
        ("bytes=0-4", "hello", "bytes 0-4/*"),
        ("bytes=5-9", " worl", "bytes 5-9/*"),
        ("bytes=10-14", "d!", "bytes 10-11/*"),
    ];
    let mocks: Vec<_> = chunks
        .iter()
        .map(|(range, body, content_range)| {
            server
                .mock("GET", "/storage/v1/b/my-bucket/o/stream.txt")
                .match_query(Matcher::UrlEncoded("alt".into(), "media".into()))
                .match_header("range", *range)
                .with_status(206)
                .with_header("content-range", *content_range)
                .with_body(*body)
                .create()
        })
        .collect();

    let store = new_store(&server, 1024);
    let (progress, options) = recording_options(Some(5));
    let mut sink = Vec::new();
    let written = store.get_object_to("stream.txt", &mut sink, &options).unwrap();

    for mock in &mocks {
        mock.assert();
    }
    assert_eq!(written, 12);
    assert_eq!(sink, b"hello world!");
    // 总大小未知，中间块不报告进度
    assert_eq!(*progress.percents.lock().unwrap(), vec![100]);
}

#[test]
fn test_chunked_download_unknown_total_exact_multiple() {
    let mut server = Server::new();
    let chunks = [
        ("bytes=0-4", "hello", "bytes 0-4/*"),
        ("bytes=5-9", "world", "bytes 5-9/*"),
    ];
    let mut mocks: Vec<_> = chunks
        .iter()
        .map(|(range, body, content_range)| {
            server
                .mock("GET", "/storage/v1/b/my-bucket/o/even.txt")
                .match_query(Matcher::UrlEncoded("alt".into(), "media".into()))
                .match_header("range", *range)
                .with_status(206)
                .with_header("content-range", *content_range)
                .with_body(*body)
                .create()
        })
        .collect();
    mocks.push(
        server
            .mock("GET", "/storage/v1/b/my-bucket/o/even.txt")
            .match_query(Matcher::UrlEncoded("alt".into(), "media".into()))
            .match_header("range", "bytes=10-14")
            .with_status(416)
            .create(),
    );

    let store = new_store(&server, 1024);
    let (progress, options) = recording_options(Some(5));
    let mut sink = Vec::new();
    let written = store.get_object_to("even.txt", &mut sink, &options).unwrap();

    for mock in &mocks {
        mock.assert();
    }
    assert_eq!(written, 10);
    assert_eq!(sink, b"helloworld");
    assert_eq!(*progress.percents.lock().unwrap(), vec![100]);
}

#[test]
fn test_download_when_range_ignored() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/storage/v1/b/my-bucket/o/a.txt")
        .match_query(Matcher::UrlEncoded("alt".into(), "media".into()))
        .with_status(200)
        .with_body("the whole object")
        .expect(2)
        .create();

    let store = new_store(&server, 4);
    let sink = store.get_object("a.txt", Vec::new()).unwrap();
    assert_eq!(sink, b"the whole object");

    // 服务端返回 200 时整个对象就是唯一的一块
    let (progress, options) = recording_options(None);
    let mut recorded = Vec::new();
    assert_eq!(store.get_object_to("a.txt", &mut recorded, &options).unwrap(), 16);
    assert_eq!(recorded, b"the whole object");
    assert_eq!(*progress.percents.lock().unwrap(), vec![100]);

    mock.assert();
}

#[test]
fn test_download_empty_object() {
    let mut server = Server::new();
    server
        .mock("GET", "/storage/v1/b/my-bucket/o/empty")
        .match_query(Matcher::UrlEncoded("alt".into(), "media".into()))
        .with_status(416)
        .create();

    let store = new_store(&server, 1024);
    let (progress, options) = recording_options(None);
    let mut sink = Vec::new();

    assert_eq!(store.get_object_to("empty", &mut sink, &options).unwrap(), 0);
    assert!(sink.is_empty());
    assert_eq!(*progress.percents.lock().unwrap(), vec![100]);
}

#[test]
fn test_download_missing_object() {
    let mut server = Server::new();
    server
        .mock("GET", "/storage/v1/b/my-bucket/o/missing.txt")
        .match_query(Matcher::UrlEncoded("alt".into(), "media".into()))
        .with_status(404)
        .with_body(r#"{"error":{"code":404,"message":"No such object"}}"#)
        .create();

    let err = new_store(&server, 1024)
        .get_object_to("missing.txt", &mut Vec::new(), &GetObjectOptions::quiet())
        .unwrap_err();

    match err {
        ObjectStoreError::NotFound { key } => assert_eq!(key, "missing.txt"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_second_delete_is_not_found() {
    let mut server = Server::new();
    let first = server
        .mock("DELETE", "/storage/v1/b/my-bucket/o/sample.txt")
        .match_header("authorization", "Bearer test-token")
        .with_status(204)
        .expect(1)
        .create();
    let second = server
        .mock("DELETE", "/storage/v1/b/my-bucket/o/sample.txt")
        .with_status(404)
        .with_body(r#"{"error":{"code":404,"message":"No such object"}}"#)
        .expect(1)
        .create();

    let store = new_store(&server, 1024);
    let deleted = store.delete_object("sample.txt").unwrap();
    assert_eq!(deleted.name, "sample.txt");
    assert_eq!(deleted.status, 204);

    let err = store.delete_object("sample.txt").unwrap_err();
    assert!(matches!(err, ObjectStoreError::NotFound { .. }));

    first.assert();
    second.assert();
}

#[test]
fn test_list_bucket_follows_page_tokens() {
    let default_fields = "nextPageToken,items(name,size,contentType,metadata(my-key))";

    let mut server = Server::new();
    let page1 = server
        .mock("GET", "/storage/v1/b/my-bucket/o")
        .match_query(Matcher::Regex("^fields=[^&]+$".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "nextPageToken": "token-1",
                "items": [
                    {"name": "a.txt", "size": "1", "contentType": "text/plain", "metadata": {"my-key": "x"}},
                    {"name": "b.txt", "size": "2", "contentType": "text/plain"}
                ]
            }"#,
        )
        .create();
    let page2 = server
        .mock("GET", "/storage/v1/b/my-bucket/o")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("fields".into(), default_fields.into()),
            Matcher::UrlEncoded("pageToken".into(), "token-1".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"items": [{"name": "c.txt", "size": "3"}]}"#)
        .create();

    let objects = new_store(&server, 1024).list_bucket().unwrap();

    page1.assert();
    page2.assert();
    let names: Vec<&str> = objects.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
    assert_eq!(objects[0].metadata.get("my-key").map(String::as_str), Some("x"));
    assert_eq!(objects[2].size, Some(3));
}

#[test]
fn test_list_with_prefix_and_projection() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/storage/v1/b/my-bucket/o")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("fields".into(), "nextPageToken,items(name,updated)".into()),
            Matcher::UrlEncoded("prefix".into(), "logs/".into()),
            Matcher::UrlEncoded("maxResults".into(), "2".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"items": [{"name": "logs/1", "updated": "2024-05-06T07:08:09Z"}]}"#)
        .create();

    let store = new_store(&server, 1024);
    let objects: Vec<_> = store
        .list_objects(ListOptions {
            prefix: Some("logs/".to_string()),
            page_size: Some(2),
            fields: ObjectFields::only(["updated"]),
        })
        .collect::<Result<_, _>>()
        .unwrap();

    mock.assert();
    assert_eq!(objects.len(), 1);
    assert!(objects[0].updated.is_some());
}

#[test]
fn test_list_error_aborts() {
    let mut server = Server::new();
    server
        .mock("GET", "/storage/v1/b/my-bucket/o")
        .match_query(Matcher::Regex("^fields=[^&]+$".into()))
        .with_status(200)
        .with_body(r#"{"nextPageToken": "token-1", "items": [{"name": "a.txt"}]}"#)
        .create();
    server
        .mock("GET", "/storage/v1/b/my-bucket/o")
        .match_query(Matcher::UrlEncoded("pageToken".into(), "token-1".into()))
        .with_status(500)
        .with_body(r#"{"error":{"code":500,"message":"backend unavailable"}}"#)
        .create();

    let store = new_store(&server, 1024);
    let err = store.list_bucket().unwrap_err();
    match err {
        ObjectStoreError::Backend { status, message, .. } => {
            assert_eq!(status, 500);
            assert_eq!(message, "backend unavailable");
        }
        other => panic!("unexpected error: {other}"),
    }

    // 迭代器先产出第一页的对象，再产出错误后结束
    let mut iter = store.list_objects(ListOptions::default());
    assert_eq!(iter.next().unwrap().unwrap().name, "a.txt");
    assert!(iter.next().unwrap().is_err());
    assert!(iter.next().is_none());
}
