//! Directory discovery.
//!
//! First stage of the pipeline. Walks an input root recursively and returns
//! every file whose extension is on the image allow-list, with its path
//! relative to the root so the output tree can mirror it.
//!
//! ## Traversal policy
//!
//! - Entries are visited sorted by file name, so repeated runs over an
//!   unchanged tree yield the same order (and byte-identical markup).
//! - Symbolic links are followed. A link that points back at one of its own
//!   ancestors is skipped with a warning instead of being walked forever.
//! - Sub-directories that cannot be read are skipped with a warning. Only a
//!   missing or unreadable *root* is an error.
//! - Directories passed to [`discover_excluding`] (typically the output root
//!   when it lives inside the input root) are pruned.
//!
//! ```text
//! images/                      DiscoveredImage.relative_path
//! ├── b.png                    b.png            (sub_directory "")
//! ├── notes.txt                (ignored)
//! └── photos/
//!     ├── a.jpg                photos/a.jpg     (sub_directory "photos")
//!     └── 2024/
//!         └── C.JPEG           photos/2024/C.JPEG
//! ```

use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Input directory not found: {0}")]
    RootNotFound(PathBuf),
    #[error("Input path is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Cannot read input directory {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Extensions (compared case-insensitively) that are treated as source images.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "tiff", "webp"];

/// A source image found under the input root.
///
/// Identity is `absolute_path`. `sub_directory` is empty for files directly
/// in the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredImage {
    pub absolute_path: PathBuf,
    pub relative_path: PathBuf,
    pub file_name: String,
    pub sub_directory: PathBuf,
}

impl DiscoveredImage {
    /// Build from a file path under `root`. Returns `None` if `path` is not
    /// inside `root` or has no file name.
    pub fn new(root: &Path, path: &Path) -> Option<Self> {
        let relative_path = path.strip_prefix(root).ok()?.to_path_buf();
        let file_name = path.file_name()?.to_string_lossy().into_owned();
        let sub_directory = relative_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let absolute_path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

        Some(Self {
            absolute_path,
            relative_path,
            file_name,
            sub_directory,
        })
    }

    /// A single explicitly named file, treated as if it sat in the root.
    pub fn single(path: &Path) -> Option<Self> {
        let root = path.parent().unwrap_or_else(|| Path::new(""));
        Self::new(root, path)
    }

    /// File name without its extension; the base of every variant name.
    pub fn stem(&self) -> String {
        Path::new(&self.file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.file_name.clone())
    }
}

/// Whether a path has an allow-listed image extension.
pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

/// Discover every image under `root`.
pub fn discover(root: &Path) -> Result<Vec<DiscoveredImage>, DiscoveryError> {
    discover_excluding(root, &[])
}

/// Discover every image under `root`, pruning the `excluded` directories.
///
/// Excluded paths that do not exist yet are ignored.
pub fn discover_excluding(
    root: &Path,
    excluded: &[&Path],
) -> Result<Vec<DiscoveredImage>, DiscoveryError> {
    check_root(root)?;

    let excluded: Vec<PathBuf> = excluded
        .iter()
        .filter_map(|p| p.canonicalize().ok())
        .collect();

    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_excluded(e, &excluded));

    let mut images = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                return Err(DiscoveryError::Unreadable {
                    path: root.to_path_buf(),
                    source: err.into(),
                });
            }
            Err(err) => {
                if let Some(ancestor) = err.loop_ancestor() {
                    warn!(
                        path = ?err.path(),
                        ancestor = ?ancestor,
                        "skipping symbolic link cycle"
                    );
                } else {
                    warn!(path = ?err.path(), error = %err, "skipping unreadable entry");
                }
                continue;
            }
        };

        if !entry.file_type().is_file() || !is_image(entry.path()) {
            continue;
        }
        if let Some(image) = DiscoveredImage::new(root, entry.path()) {
            debug!(path = %image.relative_path.display(), "discovered image");
            images.push(image);
        }
    }

    Ok(images)
}

fn check_root(root: &Path) -> Result<(), DiscoveryError> {
    let meta = fs::metadata(root).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => DiscoveryError::RootNotFound(root.to_path_buf()),
        _ => DiscoveryError::Unreadable {
            path: root.to_path_buf(),
            source,
        },
    })?;
    if !meta.is_dir() {
        return Err(DiscoveryError::NotADirectory(root.to_path_buf()));
    }
    fs::read_dir(root).map_err(|source| DiscoveryError::Unreadable {
        path: root.to_path_buf(),
        source,
    })?;
    Ok(())
}

fn is_excluded(entry: &DirEntry, excluded: &[PathBuf]) -> bool {
    if excluded.is_empty() || entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    entry
        .path()
        .canonicalize()
        .map(|canonical| excluded.contains(&canonical))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::touch;
    use tempfile::TempDir;

    fn relative_paths(images: &[DiscoveredImage]) -> Vec<String> {
        images
            .iter()
            .map(|i| crate::naming::url_path(&i.relative_path))
            .collect()
    }

    #[test]
    fn finds_images_at_any_depth_and_ignores_others() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join("b.png"));
        touch(&root.join("notes.txt"));
        touch(&root.join("photos/a.jpg"));
        touch(&root.join("photos/a.xmp"));
        touch(&root.join("photos/2024/deep/c.webp"));
        touch(&root.join("photos/2024/deep/README"));
        touch(&root.join("x/y/z/anim.gif"));

        let images = discover(root).unwrap();
        assert_eq!(
            relative_paths(&images),
            vec!["b.png", "photos/2024/deep/c.webp", "photos/a.jpg", "x/y/z/anim.gif"]
        );
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("A.JPG"));
        touch(&tmp.path().join("b.Png"));
        touch(&tmp.path().join("c.TIFF"));

        assert_eq!(discover(tmp.path()).unwrap().len(), 3);
    }

    #[test]
    fn allow_list_is_exact() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("scan.tif"));
        touch(&tmp.path().join("raw.cr2"));
        touch(&tmp.path().join("photo.avif"));
        touch(&tmp.path().join("jpg"));

        assert!(discover(tmp.path()).unwrap().is_empty());
    }

    #[test]
    fn directory_named_like_image_is_not_a_file() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("album.jpg")).unwrap();
        touch(&tmp.path().join("album.jpg/inner.png"));

        let images = discover(tmp.path()).unwrap();
        assert_eq!(relative_paths(&images), vec!["album.jpg/inner.png"]);
    }

    #[test]
    fn populates_image_fields() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("photos/a.jpg"));

        let images = discover(tmp.path()).unwrap();
        let image = &images[0];
        assert_eq!(image.file_name, "a.jpg");
        assert_eq!(image.stem(), "a");
        assert_eq!(image.sub_directory, PathBuf::from("photos"));
        assert_eq!(image.relative_path, PathBuf::from("photos").join("a.jpg"));
        assert!(image.absolute_path.is_absolute());
        assert!(image.absolute_path.ends_with("photos/a.jpg"));
    }

    #[test]
    fn root_level_image_has_empty_sub_directory() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("b.png"));

        let images = discover(tmp.path()).unwrap();
        assert_eq!(images[0].sub_directory, PathBuf::new());
    }

    #[test]
    fn empty_root_yields_nothing() {
        let tmp = TempDir::new().unwrap();
        assert!(discover(tmp.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_root_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = discover(&tmp.path().join("nope"));
        assert!(matches!(result, Err(DiscoveryError::RootNotFound(_))));
    }

    #[test]
    fn file_root_is_error() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.jpg");
        touch(&file);
        assert!(matches!(discover(&file), Err(DiscoveryError::NotADirectory(_))));
    }

    #[test]
    fn order_is_stable_across_runs() {
        let tmp = TempDir::new().unwrap();
        for name in ["zeta.jpg", "alpha.png", "m/mid.webp", "beta.gif"] {
            touch(&tmp.path().join(name));
        }

        let first = relative_paths(&discover(tmp.path()).unwrap());
        let second = relative_paths(&discover(tmp.path()).unwrap());
        assert_eq!(first, second);
        assert_eq!(first, vec!["alpha.png", "beta.gif", "m/mid.webp", "zeta.jpg"]);
    }

    #[test]
    fn excluded_output_root_is_pruned() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("a.jpg"));
        touch(&tmp.path().join("out/a-400w.webp"));

        let out = tmp.path().join("out");
        let images = discover_excluding(tmp.path(), &[out.as_path()]).unwrap();
        assert_eq!(relative_paths(&images), vec!["a.jpg"]);
    }

    #[test]
    fn nonexistent_exclusion_is_ignored() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("a.jpg"));

        let missing = tmp.path().join("not-yet");
        let images = discover_excluding(tmp.path(), &[missing.as_path()]).unwrap();
        assert_eq!(images.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn symlink_cycle_is_skipped() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("loop/a.jpg"));
        std::os::unix::fs::symlink(tmp.path(), tmp.path().join("loop/back")).unwrap();

        let images = discover(tmp.path()).unwrap();
        assert_eq!(relative_paths(&images), vec!["loop/a.jpg"]);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directory_is_followed() {
        let tmp = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        touch(&elsewhere.path().join("linked.png"));
        std::os::unix::fs::symlink(elsewhere.path(), tmp.path().join("shared")).unwrap();

        let images = discover(tmp.path()).unwrap();
        assert_eq!(relative_paths(&images), vec!["shared/linked.png"]);
    }

    #[test]
    fn single_file_has_no_sub_directory() {
        let image = DiscoveredImage::single(Path::new("/photos/trip/a.jpg")).unwrap();
        assert_eq!(image.relative_path, PathBuf::from("a.jpg"));
        assert_eq!(image.sub_directory, PathBuf::new());
        assert_eq!(image.file_name, "a.jpg");
    }

    #[test]
    fn is_image_checks_extension_only() {
        assert!(is_image(Path::new("x/y.JPEG")));
        assert!(!is_image(Path::new("x/y")));
        assert!(!is_image(Path::new("x/.jpg")));
    }
}
