//! Uploaded image storage
//!
//! Validated uploads are written under the images directory with a generated
//! collision-resistant filename; records store the bare filename and the view
//! layer joins it with the `/images/` URL prefix.

use bookshelf_common::Result;
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

/// An uploaded file held in memory for validation and storage
#[derive(Debug, Clone)]
pub struct FileUpload {
    /// Filename as submitted by the browser (untrusted, used for extension only)
    pub original_name: String,
    /// Content type as submitted by the browser
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    /// Lowercased extension of the original filename, empty when absent
    pub fn extension(&self) -> String {
        Path::new(&self.original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default()
    }
}

/// Filesystem store for book cover images
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist an already-validated upload, returning the generated filename
    ///
    /// The filename is a fresh UUIDv4 with the upload's original extension
    /// preserved, so concurrent uploads never collide and replacing a book's
    /// image never reuses a name.
    pub fn process(&self, upload: &FileUpload) -> Result<String> {
        let ext = upload.extension();
        let filename = if ext.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            format!("{}.{}", Uuid::new_v4(), ext)
        };

        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.dir.join(&filename), &upload.bytes)?;

        Ok(filename)
    }

    /// Best-effort removal of a stored image
    ///
    /// Runs during failure cleanup of other operations, so failures here are
    /// logged and swallowed rather than propagated.
    pub fn delete_image(&self, filename: &str) {
        // Stored filenames are server-generated; anything path-like is not ours
        if filename.is_empty() || filename.contains('/') || filename.contains("..") {
            warn!("Refusing to delete suspicious image filename: {}", filename);
            return;
        }

        let path = self.dir.join(filename);
        if let Err(e) = std::fs::remove_file(&path) {
            warn!("Failed to delete image {}: {}", path.display(), e);
        }
    }

    /// Whether a stored image exists on disk
    pub fn exists(&self, filename: &str) -> bool {
        self.dir.join(filename).is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str) -> FileUpload {
        FileUpload {
            original_name: name.to_string(),
            content_type: "image/jpeg".to_string(),
            bytes: vec![0xFF, 0xD8, 0xFF, 0xE0],
        }
    }

    #[test]
    fn process_preserves_extension_and_writes_bytes() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ImageStore::new(tmp.path().to_path_buf());

        let filename = store.process(&upload("Cover Art.JPG")).unwrap();

        assert!(filename.ends_with(".jpg"), "extension lowercased: {}", filename);
        assert!(store.exists(&filename));
        assert_eq!(std::fs::read(tmp.path().join(&filename)).unwrap().len(), 4);
    }

    #[test]
    fn process_generates_distinct_names() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ImageStore::new(tmp.path().to_path_buf());

        let a = store.process(&upload("cover.png")).unwrap();
        let b = store.process(&upload("cover.png")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn delete_image_swallows_missing_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ImageStore::new(tmp.path().to_path_buf());

        // Must not panic or error
        store.delete_image("no-such-file.jpg");
    }

    #[test]
    fn delete_image_refuses_path_traversal() {
        let tmp = tempfile::tempdir().unwrap();
        let outside = tmp.path().join("outside.txt");
        std::fs::write(&outside, b"keep").unwrap();

        let store = ImageStore::new(tmp.path().join("images"));
        store.delete_image("../outside.txt");

        assert!(outside.exists());
    }
}
