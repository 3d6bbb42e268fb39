use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::format::DocumentFormat;
use super::ImportError;

/// Prefix of every transient upload copy.
pub const STAGING_PREFIX: &str = "upload_";

/// A transient on-disk copy of an uploaded report.
///
/// The file carries a random name (`upload_<random>.<ext>`) and is removed
/// when the value is dropped, whichever way the ingestion call exits.
#[derive(Debug)]
pub struct StagedUpload {
    file: NamedTempFile,
    format: DocumentFormat,
}

impl StagedUpload {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }
}

/// Write upload bytes to a uniquely named file under `staging_dir`.
pub fn stage_upload(
    bytes: &[u8],
    format: DocumentFormat,
    staging_dir: &Path,
) -> Result<StagedUpload, ImportError> {
    std::fs::create_dir_all(staging_dir)?;

    let suffix = format!(".{}", format.extension());
    let mut file = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .suffix(&suffix)
        .tempfile_in(staging_dir)?;
    file.write_all(bytes)?;
    file.flush()?;

    tracing::debug!(
        path = %file.path().display(),
        size = bytes.len(),
        "Upload staged"
    );

    Ok(StagedUpload { file, format })
}

/// Default staging location when none is configured.
pub fn default_staging_dir() -> PathBuf {
    std::env::temp_dir().join("healthinsight")
}
