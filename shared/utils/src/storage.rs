//! Blob Storage
//!
//! Durable save/retrieve/delete for uploaded report files and generated
//! worksheet documents, addressed by generated filename under a root
//! directory. Deletion after a failed transaction is compensating
//! cleanup; it is not itself transactional.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path a stored name resolves to.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Persist a blob under `name`, creating the root directory on first
    /// use. Returns the stored path.
    pub async fn save(&self, name: &str, data: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.root)
            .await
            .context("Failed to create upload directory")?;

        let path = self.path_for(name);
        fs::write(&path, data)
            .await
            .with_context(|| format!("Failed to write blob {}", path.display()))?;

        Ok(path)
    }

    pub async fn exists(&self, path: &Path) -> bool {
        fs::metadata(path).await.is_ok()
    }

    pub async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path)
            .await
            .with_context(|| format!("Failed to read blob {}", path.display()))
    }

    /// Best-effort delete; missing files are not an error.
    pub async fn delete(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete blob {}", path.display())),
        }
    }
}

/// Lowercased extension of a filename including the dot, or `default`
/// when the name has none.
pub fn extension_of(filename: &str, default: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_else(|| default.to_string())
}

/// Content type for a stored file extension (without the dot).
pub fn content_type_for(file_type: &str) -> &'static str {
    match file_type.to_lowercase().as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("report.DOCX", ".docx"), ".docx");
        assert_eq!(extension_of("archive.tar.gz", ".docx"), ".gz");
        assert_eq!(extension_of("no_extension", ".docx"), ".docx");
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("pdf"), "application/pdf");
        assert_eq!(
            content_type_for("XLSX"),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        assert_eq!(content_type_for("bin"), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_save_read_delete_roundtrip() {
        let dir = std::env::temp_dir().join(format!("terralab-store-{}", uuid::Uuid::new_v4()));
        let store = FileStore::new(&dir);

        let path = store.save("blob.bin", b"hello").await.unwrap();
        assert!(store.exists(&path).await);
        assert_eq!(store.read(&path).await.unwrap(), b"hello");

        store.delete(&path).await.unwrap();
        assert!(!store.exists(&path).await);
        // Deleting again is not an error
        store.delete(&path).await.unwrap();

        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}
