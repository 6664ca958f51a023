//! Payment slip uploads.

use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::{Result, StoreError};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp", "heic"];

/// Where an uploaded slip ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedSlip {
    pub file_name: String,
    pub url: String,
}

pub trait SlipStore: Send + Sync {
    fn upload(&self, bytes: &[u8], filename: &str) -> Result<UploadedSlip>;
}

/// Keep only characters that are safe in a file name.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "slip".to_string()
    } else {
        trimmed.to_string()
    }
}

fn is_image(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Slips written to `<root>` and served under `<public_base>/slips/`.
#[derive(Debug, Clone)]
pub struct DiskSlipStore {
    root: PathBuf,
    public_base: String,
}

impl DiskSlipStore {
    pub fn new(root: impl AsRef<Path>, public_base: &str) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SlipStore for DiskSlipStore {
    fn upload(&self, bytes: &[u8], filename: &str) -> Result<UploadedSlip> {
        if bytes.is_empty() {
            return Err(StoreError::EmptyUpload);
        }
        let clean = sanitize_file_name(filename);
        if !is_image(&clean) {
            return Err(StoreError::UnsupportedFile(clean));
        }
        std::fs::create_dir_all(&self.root)?;
        let file_name = format!("{}-{}", Uuid::new_v4(), clean);
        std::fs::write(self.root.join(&file_name), bytes)?;
        tracing::info!(file = %file_name, size = bytes.len(), "stored payment slip");
        Ok(UploadedSlip {
            url: format!("{}/slips/{}", self.public_base, file_name),
            file_name,
        })
    }
}
