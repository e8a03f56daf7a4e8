//! Encoding local files for image and file messages.
//!
//! Both travel inline as `data:` URIs; files are wrapped in a
//! [`FileDescriptor`] carrying name, size and MIME type.

use std::path::Path;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::protocol::FileDescriptor;

/// MIME type guessed from the file extension.
pub fn mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

/// `data:<mime>;base64,<payload>`
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Read an image file as a data URI.
pub fn read_image(path: &Path) -> Result<String> {
    let mime = mime_type(path);
    if !mime.starts_with("image/") {
        anyhow::bail!("{} is not an image", path.display());
    }
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(data_uri(mime, &bytes))
}

/// Read any file into a descriptor.
pub fn read_file(path: &Path) -> Result<FileDescriptor> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("file name is not valid UTF-8")?
        .to_string();
    let mime = mime_type(path);

    Ok(FileDescriptor {
        name,
        size: bytes.len() as u64,
        mime_type: mime.to_string(),
        data: data_uri(mime, &bytes),
    })
}
