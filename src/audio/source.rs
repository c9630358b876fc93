// Media source resolution
use std::fmt;
use std::path::{Path, PathBuf};

/// Where a piece of media comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// A direct filesystem locator.
    Locator(PathBuf),
    /// A resource shipped with the application, looked up by name and type.
    Bundled { name: String, ext: Option<String> },
}

impl MediaSource {
    pub fn bundled(name: impl Into<String>, ext: Option<&str>) -> Self {
        Self::Bundled {
            name: name.into(),
            ext: ext.map(str::to_string),
        }
    }

    pub fn resolve(&self, bundle: &dyn BundleResolver) -> Option<PathBuf> {
        match self {
            Self::Locator(path) => Some(path.clone()),
            Self::Bundled { name, ext } => bundle.resolve(name, ext.as_deref()),
        }
    }
}

impl fmt::Display for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Locator(path) => write!(f, "{}", path.display()),
            Self::Bundled { name, ext: Some(ext) } => write!(f, "bundle:{}.{}", name, ext),
            Self::Bundled { name, ext: None } => write!(f, "bundle:{}", name),
        }
    }
}

/// Host lookup of bundled resources.
pub trait BundleResolver: Send {
    fn resolve(&self, name: &str, ext: Option<&str>) -> Option<PathBuf>;
}

/// Resolves bundled resources as files inside one directory.
pub struct DirectoryBundle {
    root: PathBuf,
}

impl DirectoryBundle {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl BundleResolver for DirectoryBundle {
    fn resolve(&self, name: &str, ext: Option<&str>) -> Option<PathBuf> {
        let file = match ext {
            Some(ext) if !ext.is_empty() => format!("{}.{}", name, ext),
            _ => name.to_string(),
        };
        let path = self.root.join(file);
        path.is_file().then_some(path)
    }
}

/// Last path component of a locator, used as the display title and resume key.
pub fn filename_of(locator: &Path) -> Option<String> {
    locator
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn filename_is_last_path_component() {
        assert_eq!(
            filename_of(Path::new("/music/albums/Song.mp3")).as_deref(),
            Some("Song.mp3")
        );
        assert_eq!(filename_of(Path::new("/")), None);
    }

    #[test]
    fn directory_bundle_resolves_existing_files_only() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("intro.mp4"), b"").unwrap();
        let bundle = DirectoryBundle::new(dir.path().to_path_buf());

        assert_eq!(
            bundle.resolve("intro", Some("mp4")),
            Some(dir.path().join("intro.mp4"))
        );
        assert_eq!(bundle.resolve("intro", Some("mov")), None);
        assert_eq!(bundle.resolve("intro.mp4", None), Some(dir.path().join("intro.mp4")));
    }

    #[test]
    fn locator_resolves_to_itself() {
        let dir = TempDir::new().unwrap();
        let bundle = DirectoryBundle::new(dir.path().to_path_buf());
        let source = MediaSource::Locator(PathBuf::from("/tmp/clip.mov"));

        assert_eq!(source.resolve(&bundle), Some(PathBuf::from("/tmp/clip.mov")));
        assert_eq!(MediaSource::bundled("missing", Some("mp3")).resolve(&bundle), None);
    }
}
