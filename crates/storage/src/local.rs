use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use chrono::NaiveDate;
use engine::{ArchiveError, ArchiveService, ReceiptFile, StorageInfo, StorageKind};
use tokio::{fs, io::AsyncWriteExt};

use crate::key::object_key;

pub const DEFAULT_DIRECTORY: &str = "./uploads";

/// Archive writing receipts into a directory of the local filesystem.
#[derive(Clone, Debug)]
pub struct LocalArchive {
    directory: PathBuf,
    date_subdirectories: bool,
}

impl LocalArchive {
    pub fn new(directory: impl Into<PathBuf>, date_subdirectories: bool) -> Self {
        tracing::info!("Initializing local archive...");
        Self {
            directory: directory.into(),
            date_subdirectories,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

/// `name.ext` becomes `name (n).ext`.
fn numbered(path: &Path, n: u32) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem} ({n}).{}", ext.to_string_lossy()),
        None => format!("{stem} ({n})"),
    };
    path.with_file_name(name)
}

#[async_trait]
impl ArchiveService for LocalArchive {
    async fn upload_file(
        &self,
        merchant: &str,
        date: NaiveDate,
        file: &ReceiptFile,
    ) -> Result<(), ArchiveError> {
        if file.is_empty() {
            return Err(ArchiveError::InvalidInput("empty file".to_string()));
        }

        let key = object_key(merchant, date, file, self.date_subdirectories);
        let target = self.directory.join(&key);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut candidate = target.clone();
        let mut n = 0;
        let mut out = loop {
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
                .await
            {
                Ok(out) => break out,
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    n += 1;
                    candidate = numbered(&target, n);
                }
                Err(err) => return Err(err.into()),
            }
        };
        out.write_all(&file.bytes).await?;
        out.flush().await?;

        tracing::info!(path = %candidate.display(), size = file.len(), "receipt archived");
        Ok(())
    }

    fn storage_info(&self) -> StorageInfo {
        StorageInfo::configured(StorageKind::Local, self.directory.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_keeps_extension() {
        let path = Path::new("uploads/2024-03-01 Ikea.jpg");
        assert_eq!(
            numbered(path, 2),
            Path::new("uploads/2024-03-01 Ikea (2).jpg")
        );
        assert_eq!(numbered(Path::new("a/b"), 1), Path::new("a/b (1)"));
    }

    #[test]
    fn storage_info_reports_directory() {
        let archive = LocalArchive::new(DEFAULT_DIRECTORY, true);
        assert_eq!(
            archive.storage_info(),
            StorageInfo::configured(StorageKind::Local, "./uploads")
        );
    }
}
