// Run command implementation

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::cli::RunArgs;
use spider::oss::ObjectStore;

/// Execute the run command
///
/// Always prints the bucket metadata. With `--test-upload` the configured
/// file, or a generated one when none is configured, is uploaded and the
/// resulting object deleted again.
pub fn execute_run(
    args: &RunArgs,
    store: &dyn ObjectStore,
    upload_file: Option<&Path>,
    out: &mut dyn Write,
) -> Result<()> {
    let bucket = store.bucket();

    let meta = store
        .get_bucket_metadata()
        .with_context(|| format!("Failed to get metadata for bucket: {}", bucket))?;
    writeln!(out, "{}", serde_json::to_string_pretty(&meta)?)?;

    if !args.test_upload {
        return Ok(());
    }

    // keeps the generated file alive until the upload is done
    let (_scratch, upload_file) = match upload_file {
        Some(path) => (None, path.to_path_buf()),
        None => {
            let (dir, path) = generate_smoke_test_file()?;
            (Some(dir), path)
        }
    };

    let object = store
        .upload_object(&upload_file, &[], &[])
        .with_context(|| format!("Failed to upload file: {}", upload_file.display()))?;
    let size = object
        .size
        .map(|s| format!(" ({} bytes)", s))
        .unwrap_or_default();
    writeln!(out, "Uploaded: gs://{}/{}{}", bucket, object.name, size)?;

    let deleted = store
        .delete_object(&object.name)
        .with_context(|| format!("Failed to delete object: gs://{}/{}", bucket, object.name))?;
    writeln!(out, "Deleted: gs://{}/{}", bucket, deleted.name)?;

    Ok(())
}

/// File uploaded when no `test_upload_file` is configured
pub const SMOKE_TEST_FILE_NAME: &str = "spider-smoke-test.txt";

const SMOKE_TEST_CONTENT: &str = "spider smoke test\n";

/// Write the smoke-test file into a fresh temp dir, removed when dropped
fn generate_smoke_test_file() -> Result<(TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("Failed to create temp dir for smoke-test file")?;
    let path = dir.path().join(SMOKE_TEST_FILE_NAME);
    std::fs::write(&path, SMOKE_TEST_CONTENT)
        .with_context(|| format!("Failed to write smoke-test file: {}", path.display()))?;
    Ok((dir, path))
}
