//! Where template text comes from

use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Reads raw template bytes by name
///
/// A missing template must be reported as [`io::ErrorKind::NotFound`]; the
/// loader tells "not found" apart from every other failure by that kind.
pub trait TemplateSource: Send + Sync {
    fn read(&self, name: &str) -> io::Result<Vec<u8>>;
}

/// Caller-supplied loader function, e.g. over an embedded asset table
pub type LoaderFn = Arc<dyn Fn(&str) -> io::Result<Vec<u8>> + Send + Sync>;

pub struct FnSource(LoaderFn);

impl FnSource {
    pub fn new(loader: LoaderFn) -> Self {
        Self(loader)
    }
}

impl TemplateSource for FnSource {
    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        (self.0)(name)
    }
}

impl fmt::Debug for FnSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnSource")
    }
}

/// Templates stored under a directory, named by their relative path
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> io::Result<PathBuf> {
        let relative = Path::new(name);
        let contained = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if name.is_empty() || !contained {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("template name {name:?} escapes the template directory"),
            ));
        }
        Ok(self.root.join(relative))
    }
}

impl TemplateSource for DirSource {
    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        let path = self.resolve(name)?;
        std::fs::read(&path).map_err(|e| match e.kind() {
            // `page.html/x.html`: a file standing in for a directory
            io::ErrorKind::NotADirectory => io::Error::new(
                io::ErrorKind::NotFound,
                format!("template {name:?} not found: {e}"),
            ),
            _ => e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_source_reads_nested() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("partials")).unwrap();
        std::fs::write(dir.path().join("partials/nav.html"), "<nav></nav>").unwrap();

        let source = DirSource::new(dir.path());
        assert_eq!(source.read("partials/nav.html").unwrap(), b"<nav></nav>");
        assert_eq!(source.read("./partials/nav.html").unwrap(), b"<nav></nav>");
    }

    #[test]
    fn test_dir_source_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = DirSource::new(dir.path()).read("nope.html").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_as_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "home").unwrap();
        let err = DirSource::new(dir.path()).read("index.html/x.html").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_dir_source_rejects_escapes() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirSource::new(dir.path());
        for name in ["../secret.html", "a/../../b.html", "/etc/passwd", ""] {
            let err = source.read(name).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidInput, "{name:?}");
        }
    }

    #[test]
    fn test_fn_source_delegates() {
        let source = FnSource::new(Arc::new(|name: &str| {
            if name == "index.html" {
                Ok(b"hello".to_vec())
            } else {
                Err(io::ErrorKind::NotFound.into())
            }
        }));
        assert_eq!(source.read("index.html").unwrap(), b"hello");
        assert_eq!(
            source.read("other.html").unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }
}
