//! Serving of hydrated and local source files.

use crate::config::FileConfig;
use crate::error::{ChatFrontError, Result};
use crate::types::source::resolve_under;
use std::path::{Path, PathBuf};

/// Resolve a request path below the file root.
///
/// The first segment must be one of the allowed roots and no component may
/// leave the root.
pub fn resolve_file(config: &FileConfig, path: &str) -> Result<PathBuf> {
    let path = path.trim_start_matches('/');
    let root = path.split('/').next().unwrap_or_default();
    if !config.allowed_roots.iter().any(|allowed| allowed == root) {
        return Err(ChatFrontError::PathRejected(format!(
            "'{}' is not under an allowed root ({})",
            path,
            config.allowed_roots.join(", ")
        )));
    }
    resolve_under(&config.file_root, path)
}

/// Read a served file, returning its content type and bytes.
pub async fn read_file(config: &FileConfig, path: &str) -> Result<(&'static str, Vec<u8>)> {
    let full_path = resolve_file(config, path)?;
    let metadata = match tokio::fs::metadata(&full_path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ChatFrontError::FileNotFound(path.to_string()))
        }
        Err(e) => return Err(anyhow::Error::from(e).into()),
    };
    if !metadata.is_file() {
        return Err(ChatFrontError::FileNotFound(path.to_string()));
    }
    let bytes = tokio::fs::read(&full_path)
        .await
        .map_err(anyhow::Error::from)?;
    Ok((content_type_for(&full_path), bytes))
}

pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("txt") | Some("log") => "text/plain; charset=utf-8",
        Some("md") => "text/markdown; charset=utf-8",
        Some("csv") => "text/csv; charset=utf-8",
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(root: &Path) -> FileConfig {
        FileConfig {
            file_root: root.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_allowlist() {
        let config = config(Path::new("/srv"));
        assert_eq!(
            resolve_file(&config, "data/a.pdf").unwrap(),
            PathBuf::from("/srv/data/a.pdf")
        );
        assert_eq!(
            resolve_file(&config, "/output/cloud/p$a.pdf").unwrap(),
            PathBuf::from("/srv/output/cloud/p$a.pdf")
        );
        assert!(matches!(
            resolve_file(&config, "secrets/key.pem"),
            Err(ChatFrontError::PathRejected(_))
        ));
        assert!(matches!(
            resolve_file(&config, "data/../../etc/passwd"),
            Err(ChatFrontError::PathRejected(_))
        ));
        assert!(resolve_file(&config, "").is_err());
    }

    #[tokio::test]
    async fn test_read_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        std::fs::write(dir.path().join("data/notes.md"), "# Notes").unwrap();
        let config = config(dir.path());

        let (content_type, bytes) = read_file(&config, "data/notes.md").await.unwrap();
        assert_eq!(content_type, "text/markdown; charset=utf-8");
        assert_eq!(bytes, b"# Notes");

        assert!(matches!(
            read_file(&config, "data/missing.pdf").await,
            Err(ChatFrontError::FileNotFound(_))
        ));
        assert!(matches!(
            read_file(&config, "data").await,
            Err(ChatFrontError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("a.PDF")), "application/pdf");
        assert_eq!(
            content_type_for(Path::new("noext")),
            "application/octet-stream"
        );
    }
}
