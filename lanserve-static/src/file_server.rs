//! File server implementation

use std::io::{self, SeekFrom};
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::mime::guess_mime_type;

/// Configuration for the file server
#[derive(Debug, Clone)]
pub struct FileServerConfig {
    /// Root directory to serve
    pub root: PathBuf,
    /// Index files to look for when a directory is requested
    pub index: Vec<String>,
}

impl Default for FileServerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            index: vec!["index.html".to_string()],
        }
    }
}

/// Static file server confined to a root directory
pub struct FileServer {
    config: FileServerConfig,
}

/// Outcome of resolving a request path
#[derive(Debug)]
pub enum Lookup {
    /// A readable file, ready to send
    File(ServedFile),
    /// The path is a directory with no index file in it
    DirectoryWithoutIndex,
    /// Nothing at this path, or the path escapes the root
    NotFound,
}

/// A resolved file plus the response metadata derived from it
#[derive(Debug)]
pub struct ServedFile {
    pub content: Vec<u8>,
    pub mime_type: String,
    pub status: u16,
    pub content_range: Option<String>,
    pub last_modified: Option<String>,
    pub etag: Option<String>,
}

impl FileServer {
    /// Create a new file server
    pub fn new(config: FileServerConfig) -> Self {
        Self { config }
    }

    /// Create a file server for a directory
    pub fn serve_dir(root: impl Into<PathBuf>) -> Self {
        Self::new(FileServerConfig {
            root: root.into(),
            ..Default::default()
        })
    }

    /// Root directory files are resolved against
    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Resolve a request path against the root
    ///
    /// Directory paths resolve to their index file when one exists and to
    /// [`Lookup::DirectoryWithoutIndex`] otherwise; contents are never
    /// enumerated. Paths that would escape the root resolve to
    /// [`Lookup::NotFound`].
    pub async fn lookup(&self, path: &str, range_header: Option<&str>) -> io::Result<Lookup> {
        let rel = match sanitize(path) {
            Some(p) => p,
            None => return Ok(Lookup::NotFound),
        };
        let mut file_path = self.config.root.join(rel);

        tracing::debug!("resolving {} -> {:?}", path, file_path);

        let metadata = match tokio::fs::metadata(&file_path).await {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Lookup::NotFound),
            Err(e) => return Err(e),
        };

        if metadata.is_dir() {
            let mut index_found = false;
            for index in &self.config.index {
                let candidate = file_path.join(index);
                if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                    file_path = candidate;
                    index_found = true;
                    break;
                }
            }
            if !index_found {
                return Ok(Lookup::DirectoryWithoutIndex);
            }
        }

        // Refresh metadata: file_path may now point at an index file
        let metadata = match tokio::fs::metadata(&file_path).await {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Lookup::NotFound),
            Err(e) => return Err(e),
        };
        let file_size = metadata.len();

        let last_modified = metadata.modified().ok().map(httpdate::fmt_http_date);
        let etag = metadata.modified().ok().map(|t| {
            let secs = t
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            format!("\"{:x}-{:x}\"", file_size, secs)
        });

        let mut status = 200;
        let mut content_range = None;
        let mut start = 0;
        let mut length = file_size;

        if let Some(range) = range_header {
            if let Some((s, e)) = parse_range(range, file_size) {
                start = s;
                length = e - s + 1;
                status = 206;
                content_range = Some(format!("bytes {}-{}/{}", s, e, file_size));
            }
        }

        let mut file = tokio::fs::File::open(&file_path).await?;
        if start > 0 {
            file.seek(SeekFrom::Start(start)).await?;
        }
        let mut content = vec![0u8; length as usize];
        file.read_exact(&mut content).await?;

        let mime_type = guess_mime_type(&file_path);

        Ok(Lookup::File(ServedFile {
            content,
            mime_type,
            status,
            content_range,
            last_modified,
            etag,
        }))
    }
}

/// Strip the request path down to root-relative normal components
///
/// Parent and absolute components are rejected outright rather than
/// normalized away.
fn sanitize(path: &str) -> Option<PathBuf> {
    let trimmed = path.trim_start_matches('/');
    let mut clean = PathBuf::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(clean)
}

/// Parse a single-range `Range` header (bytes=start-end)
fn parse_range(header: &str, file_size: u64) -> Option<(u64, u64)> {
    if file_size == 0 {
        return None;
    }
    let val = header.strip_prefix("bytes=")?;
    let (start_str, end_str) = val.split_once('-')?;

    let start = start_str.parse::<u64>().ok().unwrap_or(0);
    let end = if end_str.is_empty() {
        file_size - 1
    } else {
        end_str.parse::<u64>().ok().unwrap_or(file_size - 1)
    };

    if start > end || start >= file_size {
        return None;
    }

    Some((start, end.min(file_size - 1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> (tempfile::TempDir, FileServer) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>Hello World</h1>").unwrap();
        std::fs::write(dir.path().join("style.css"), "body { margin: 0; }").unwrap();
        std::fs::create_dir(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("assets/app.js"), "console.log('hi');").unwrap();
        let server = FileServer::serve_dir(dir.path());
        (dir, server)
    }

    #[tokio::test]
    async fn test_file_round_trip() {
        let (_dir, server) = site();
        match server.lookup("/style.css", None).await.unwrap() {
            Lookup::File(file) => {
                assert_eq!(file.status, 200);
                assert_eq!(file.content, b"body { margin: 0; }");
                assert_eq!(file.mime_type, "text/css");
                assert!(file.last_modified.is_some());
                assert!(file.etag.is_some());
            }
            other => panic!("expected file, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_file() {
        let (_dir, server) = site();
        assert!(matches!(
            server.lookup("/missing.html", None).await.unwrap(),
            Lookup::NotFound
        ));
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let (_dir, server) = site();
        assert!(matches!(
            server.lookup("/../etc/passwd", None).await.unwrap(),
            Lookup::NotFound
        ));
        assert!(matches!(
            server.lookup("/assets/../../etc/passwd", None).await.unwrap(),
            Lookup::NotFound
        ));
    }

    #[tokio::test]
    async fn test_directory_resolves_to_index() {
        let (_dir, server) = site();
        match server.lookup("/", None).await.unwrap() {
            Lookup::File(file) => {
                assert_eq!(file.content, b"<h1>Hello World</h1>");
                assert_eq!(file.mime_type, "text/html");
            }
            other => panic!("expected index file, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_directory_without_index() {
        let (_dir, server) = site();
        assert!(matches!(
            server.lookup("/assets", None).await.unwrap(),
            Lookup::DirectoryWithoutIndex
        ));
    }

    #[tokio::test]
    async fn test_range_request() {
        let (_dir, server) = site();
        match server.lookup("/style.css", Some("bytes=0-3")).await.unwrap() {
            Lookup::File(file) => {
                assert_eq!(file.status, 206);
                assert_eq!(file.content, b"body");
                assert_eq!(file.content_range.as_deref(), Some("bytes 0-3/19"));
            }
            other => panic!("expected partial file, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("bytes=0-99", 1000), Some((0, 99)));
        assert_eq!(parse_range("bytes=500-", 1000), Some((500, 999)));
        assert_eq!(parse_range("bytes=0-5000", 1000), Some((0, 999)));
        assert_eq!(parse_range("bytes=900-100", 1000), None);
        assert_eq!(parse_range("bytes=1000-", 1000), None);
        assert_eq!(parse_range("items=0-9", 1000), None);
        assert_eq!(parse_range("bytes=0-", 0), None);
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("/a/b.html"), Some(PathBuf::from("a/b.html")));
        assert_eq!(sanitize("/./a.html"), Some(PathBuf::from("a.html")));
        assert_eq!(sanitize("/../secret"), None);
        assert_eq!(sanitize("/a/../../secret"), None);
    }
}
