//! Template input resolution: turn a template's `pdf_path` into a local file.
//!
//! Template records carry either a filesystem path or an HTTP(S) URL in
//! `pdf_path`; either way the renderer needs a real file, because pdfium
//! cannot stream from a byte buffer. Remote templates are fetched into a
//! `TempDir` owned by the returned handle, so the file lives exactly as long
//! as paints can still reference it. Both arms verify the `%PDF` magic
//! before the renderer ever sees the file — and before a downloaded body
//! touches the filesystem, so an HTML error page is never cached as a
//! template.

use crate::error::ConteurError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A template PDF pinned to a local path.
///
/// For remote templates, dropping the handle deletes the backing temp
/// directory; local templates are left untouched.
#[derive(Debug)]
pub struct ResolvedInput {
    path: PathBuf,
    /// Present only for downloads; keeps the file's directory alive.
    _download: Option<TempDir>,
}

impl ResolvedInput {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Whether `pdf_path` names a remote template.
pub fn is_url(input: &str) -> bool {
    reqwest::Url::parse(input)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Pin `input` to a local file, downloading first when it is a URL.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, ConteurError> {
    if is_url(input) {
        fetch_remote(input, timeout_secs).await
    } else {
        open_local(Path::new(input))
    }
}

/// Check the first bytes of a would-be template against the PDF magic.
///
/// A body shorter than the magic fails the same way as wrong bytes:
/// whatever this is, it is not a document we can open.
fn verify_pdf_magic(head: &[u8], path: &Path) -> Result<(), ConteurError> {
    if head.len() >= PDF_MAGIC.len() && &head[..PDF_MAGIC.len()] == PDF_MAGIC {
        return Ok(());
    }
    let mut magic = [0u8; 4];
    let n = head.len().min(magic.len());
    magic[..n].copy_from_slice(&head[..n]);
    Err(ConteurError::NotAPdf {
        path: path.to_path_buf(),
        magic,
    })
}

fn open_local(path: &Path) -> Result<ResolvedInput, ConteurError> {
    use std::io::Read;

    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ConteurError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(_) => {
            return Err(ConteurError::FileNotFound {
                path: path.to_path_buf(),
            })
        }
    };

    let mut head = [0u8; 4];
    let read = file
        .read(&mut head)
        .map_err(|e| ConteurError::Internal(e.to_string()))?;
    verify_pdf_magic(&head[..read], path)?;

    debug!("using local template PDF: {}", path.display());
    Ok(ResolvedInput {
        path: path.to_path_buf(),
        _download: None,
    })
}

async fn fetch_remote(url: &str, timeout_secs: u64) -> Result<ResolvedInput, ConteurError> {
    info!("fetching remote template: {url}");

    let fail = |reason: String| ConteurError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| fail(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| {
            if e.is_timeout() {
                ConteurError::DownloadTimeout {
                    url: url.to_string(),
                    secs: timeout_secs,
                }
            } else if let Some(status) = e.status() {
                fail(format!("HTTP {status}"))
            } else {
                fail(e.to_string())
            }
        })?;

    let body = response.bytes().await.map_err(|e| fail(e.to_string()))?;

    let file_name = remote_filename(url);
    verify_pdf_magic(&body, Path::new(&file_name))?;

    let dir = TempDir::new().map_err(|e| ConteurError::Internal(e.to_string()))?;
    let path = dir.path().join(&file_name);
    tokio::fs::write(&path, &body)
        .await
        .map_err(|e| ConteurError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        })?;

    info!("template cached at {}", path.display());
    Ok(ResolvedInput {
        path,
        _download: Some(dir),
    })
}

/// The last URL path segment when it looks like a file name, else a fixed
/// fallback so the temp file always carries an extension pdfium accepts.
fn remote_filename(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()?
                .next_back()
                .filter(|s| s.contains('.'))
                .map(str::to_string)
        })
        .unwrap_or_else(|| "template.pdf".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn url_detection_requires_http_scheme() {
        assert!(is_url("https://example.com/template.pdf"));
        assert!(is_url("http://example.com/template.pdf"));
        assert!(!is_url("ftp://example.com/template.pdf"));
        assert!(!is_url("/data/template.pdf"));
        assert!(!is_url("template.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn filename_from_url_path() {
        assert_eq!(
            remote_filename("https://cdn.example.com/books/foret.pdf"),
            "foret.pdf"
        );
        assert_eq!(remote_filename("https://example.com/"), "template.pdf");
        assert_eq!(
            remote_filename("https://example.com/books/latest"),
            "template.pdf"
        );
    }

    #[test]
    fn magic_check_accepts_pdf_header_only() {
        let p = Path::new("x.pdf");
        assert!(verify_pdf_magic(b"%PDF-1.7", p).is_ok());
        assert!(verify_pdf_magic(b"<htm", p).is_err());
    }

    #[test]
    fn magic_check_rejects_short_bodies() {
        // A truncated body must fail here, not later as a corrupt document.
        let err = verify_pdf_magic(b"%P", Path::new("x.pdf")).unwrap_err();
        match err {
            ConteurError::NotAPdf { magic, .. } => assert_eq!(&magic[..2], b"%P"),
            other => panic!("expected NotAPdf, got {other:?}"),
        }
        assert!(verify_pdf_magic(b"", Path::new("x.pdf")).is_err());
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let err = resolve_input("/definitely/not/here.pdf", 5)
            .await
            .unwrap_err();
        assert!(matches!(err, ConteurError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn non_pdf_magic_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"<html>nope</html>").unwrap();
        let err = resolve_input(f.path().to_str().unwrap(), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, ConteurError::NotAPdf { .. }));
    }

    #[tokio::test]
    async fn truncated_local_file_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%P").unwrap();
        let err = resolve_input(f.path().to_str().unwrap(), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, ConteurError::NotAPdf { .. }));
    }

    #[tokio::test]
    async fn pdf_magic_accepted() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7\n...").unwrap();
        let resolved = resolve_input(f.path().to_str().unwrap(), 5).await.unwrap();
        assert_eq!(resolved.path(), f.path());
    }
}
