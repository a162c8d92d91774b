//! Resolution of request urls to the bytes that answer them.
//!
//! [`DocRoot`] serves files below a directory. A file is only served when it exists,
//! is readable by "others" and is not a directory; those checks happen in that
//! order, so an unreadable directory is reported as forbidden. Files larger than
//! the configured limit are refused so a connection never holds more than that in memory.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use tracing::debug;

use crate::ensure;
use crate::protocol::ResourceError;

/// Looks up the content for a request url.
#[cfg_attr(test, mockall::automock)]
pub trait ResourceResolver {
    /// Returns the full content of the resource behind `url`.
    ///
    /// # Errors
    ///
    /// Returns `ResourceError` if the resource is missing, not readable, a directory,
    /// or could not be loaded.
    fn resolve(&self, url: &str) -> Result<Bytes, ResourceError>;
}

impl<R: ResourceResolver + ?Sized> ResourceResolver for std::sync::Arc<R> {
    fn resolve(&self, url: &str) -> Result<Bytes, ResourceError> {
        (**self).resolve(url)
    }
}

/// Largest file served by a [`DocRoot`] unless configured otherwise.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 64 * 1024 * 1024;

/// Serves files from a document root directory.
#[derive(Debug, Clone)]
pub struct DocRoot {
    root: PathBuf,
    max_file_size: u64,
}

impl DocRoot {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self::with_max_file_size(root, DEFAULT_MAX_FILE_SIZE)
    }

    pub fn with_max_file_size<P: Into<PathBuf>>(root: P, max_file_size: u64) -> Self {
        Self { root: root.into(), max_file_size }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }
}

impl ResourceResolver for DocRoot {
    fn resolve(&self, url: &str) -> Result<Bytes, ResourceError> {
        let path = url.split(['?', '#']).next().unwrap_or_default();
        let relative = Path::new(path.trim_start_matches('/'));
        ensure!(!relative.components().any(|c| matches!(c, Component::ParentDir)), ResourceError::forbidden(url));

        let real_file = self.root.join(relative);
        let metadata = match fs::metadata(&real_file) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(ResourceError::not_found(url)),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => return Err(ResourceError::forbidden(url)),
            Err(e) => return Err(e.into()),
        };

        ensure!(is_world_readable(&metadata), ResourceError::forbidden(url));
        ensure!(!metadata.is_dir(), ResourceError::is_directory(url));
        ensure!(
            metadata.len() <= self.max_file_size,
            ResourceError::too_large(url, metadata.len(), self.max_file_size)
        );

        let content = fs::read(&real_file)?;
        debug!(file = %real_file.display(), size = content.len(), "resolved resource");
        Ok(Bytes::from(content))
    }
}

#[cfg(unix)]
fn is_world_readable(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o004 != 0
}

#[cfg(not(unix))]
fn is_world_readable(_metadata: &fs::Metadata) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TempRoot(PathBuf);

    impl TempRoot {
        fn new() -> Self {
            static COUNTER: AtomicUsize = AtomicUsize::new(0);
            let dir = std::env::temp_dir()
                .join(format!("micro-httpd-resource-{}-{}", std::process::id(), COUNTER.fetch_add(1, Ordering::Relaxed)));
            fs::create_dir_all(&dir).unwrap();
            Self(dir)
        }
    }

    impl Drop for TempRoot {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    #[test]
    fn serves_readable_file() {
        let root = TempRoot::new();
        fs::write(root.0.join("index.html"), b"<h1>hi</h1>").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(root.0.join("index.html"), fs::Permissions::from_mode(0o644)).unwrap();
        }

        let content = DocRoot::new(&root.0).resolve("/index.html?v=1").unwrap();
        assert_eq!(&content[..], b"<h1>hi</h1>");
    }

    #[test]
    fn missing_file_is_not_found() {
        let root = TempRoot::new();
        assert!(matches!(DocRoot::new(&root.0).resolve("/nope.html"), Err(ResourceError::NotFound { .. })));
    }

    #[test]
    fn directory_is_rejected() {
        let root = TempRoot::new();
        fs::create_dir(root.0.join("sub")).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(root.0.join("sub"), fs::Permissions::from_mode(0o755)).unwrap();
        }
        assert!(matches!(DocRoot::new(&root.0).resolve("/sub"), Err(ResourceError::IsDirectory { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn not_world_readable_is_forbidden() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempRoot::new();
        fs::write(root.0.join("secret"), b"x").unwrap();
        fs::set_permissions(root.0.join("secret"), fs::Permissions::from_mode(0o640)).unwrap();
        assert!(matches!(DocRoot::new(&root.0).resolve("/secret"), Err(ResourceError::Forbidden { .. })));
    }

    #[test]
    fn file_over_size_limit_is_refused() {
        let root = TempRoot::new();
        fs::write(root.0.join("big.bin"), [0_u8; 10]).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(root.0.join("big.bin"), fs::Permissions::from_mode(0o644)).unwrap();
        }

        let error = DocRoot::with_max_file_size(&root.0, 4).resolve("/big.bin").unwrap_err();
        assert!(matches!(error, ResourceError::TooLarge { size: 10, limit: 4, .. }));
        assert_eq!(error.status_code(), http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(&DocRoot::with_max_file_size(&root.0, 10).resolve("/big.bin").unwrap()[..], &[0_u8; 10]);
    }

    #[test]
    fn parent_components_are_forbidden() {
        let root = TempRoot::new();
        assert!(matches!(DocRoot::new(&root.0).resolve("/../etc/passwd"), Err(ResourceError::Forbidden { .. })));
    }
}
