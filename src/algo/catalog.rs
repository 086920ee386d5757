use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::{GalleryError, Result};

/// Product image folders directly under one root, each with its image file
/// names in case-insensitive order (see [`sort_images`]). Folders iterate in
/// byte order, which is what makes tie-breaking in the matcher deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Catalog {
    #[serde(skip)]
    root: PathBuf,
    folders: BTreeMap<String, Vec<String>>,
}

impl Catalog {
    /// List `root`'s subdirectories and the images directly inside each.
    /// Entries that are neither plain files nor directories are ignored.
    pub fn build(root: &Path, extensions: &[String]) -> Result<Self> {
        if !root.exists() {
            return Err(GalleryError::NotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(GalleryError::NotADirectory(root.to_path_buf()));
        }

        let mut folders = BTreeMap::new();
        for entry in read_dir(root)? {
            let path = entry.path();
            let file_type = entry
                .file_type()
                .map_err(|_| GalleryError::NotADirectory(path.clone()))?;
            if !file_type.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                debug!(path = %path.display(), "skipping non-UTF-8 folder name");
                continue;
            };
            let images = list_images(&path, extensions)?;
            debug!(folder = %name, images = images.len(), "catalog folder");
            folders.insert(name, images);
        }

        Ok(Self {
            root: root.to_path_buf(),
            folders,
        })
    }

    /// Build from an in-memory listing. Image lists are sorted here so the
    /// ordering guarantee holds regardless of the caller.
    pub fn from_folders<I, F, S>(folders: I) -> Self
    where
        I: IntoIterator<Item = (F, Vec<S>)>,
        F: Into<String>,
        S: Into<String>,
    {
        let folders = folders
            .into_iter()
            .map(|(name, images)| {
                let mut images: Vec<String> = images.into_iter().map(Into::into).collect();
                sort_images(&mut images);
                (name.into(), images)
            })
            .collect();
        Self {
            root: PathBuf::new(),
            folders,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn folder_names(&self) -> impl Iterator<Item = &str> {
        self.folders.keys().map(String::as_str)
    }

    pub fn images(&self, folder: &str) -> Option<&[String]> {
        self.folders.get(folder).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.folders
            .iter()
            .map(|(name, images)| (name.as_str(), images.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }
}

fn read_dir(dir: &Path) -> Result<Vec<std::fs::DirEntry>> {
    std::fs::read_dir(dir)
        .and_then(|entries| entries.collect::<std::io::Result<Vec<_>>>())
        .map_err(|e| GalleryError::io(dir, e))
}

fn list_images(dir: &Path, extensions: &[String]) -> Result<Vec<String>> {
    let mut images = Vec::new();
    for entry in read_dir(dir)? {
        let path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|_| GalleryError::NotADirectory(path.clone()))?;
        if !file_type.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if has_image_extension(&name, extensions) {
            images.push(name);
        }
    }
    sort_images(&mut images);
    Ok(images)
}

/// Case-insensitive order, byte order breaking ties, so `back.jpg` comes
/// before `Front.jpg`.
pub fn sort_images(images: &mut [String]) {
    images.sort_by(|a, b| {
        a.to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b))
    });
}

/// Case-insensitive extension check against a list of bare extensions.
pub fn has_image_extension(name: &str, extensions: &[String]) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn exts() -> Vec<String> {
        crate::config::CatalogConfig::default().extensions
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        let e = exts();
        assert!(has_image_extension("a.PNG", &e));
        assert!(has_image_extension("b.JpEg", &e));
        assert!(has_image_extension("c.webp", &e));
        assert!(!has_image_extension("d.gif", &e));
        assert!(!has_image_extension("png", &e));
        assert!(!has_image_extension("notes.txt", &e));
    }

    #[test]
    fn build_lists_folders_and_sorted_images() {
        let dir = tempfile::tempdir().unwrap();
        let mug = dir.path().join("mug");
        fs::create_dir(&mug).unwrap();
        for f in ["b.png", "a.png", "notes.txt", "C.JPG"] {
            fs::write(mug.join(f), b"x").unwrap();
        }
        fs::create_dir(mug.join("nested")).unwrap();
        fs::write(mug.join("nested").join("deep.png"), b"x").unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();
        fs::write(dir.path().join("stray.png"), b"x").unwrap();

        let catalog = Catalog::build(dir.path(), &exts()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.folder_names().collect::<Vec<_>>(), vec!["empty", "mug"]);
        assert_eq!(catalog.images("mug").unwrap(), ["a.png", "b.png", "C.JPG"]);
        assert!(catalog.images("empty").unwrap().is_empty());
        assert!(catalog.images("stray.png").is_none());
    }

    #[test]
    fn image_order_ignores_case() {
        let mut images: Vec<String> = ["Front.jpg", "back.jpg", "side.png", "Back.jpg"]
            .map(String::from)
            .to_vec();
        sort_images(&mut images);
        assert_eq!(images, ["Back.jpg", "back.jpg", "Front.jpg", "side.png"]);
    }

    #[test]
    fn missing_root_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = Catalog::build(&dir.path().join("nope"), &exts()).unwrap_err();
        assert!(matches!(err, GalleryError::NotFound(_)));
    }

    #[test]
    fn file_root_is_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file.txt");
        fs::write(&file, b"x").unwrap();
        let err = Catalog::build(&file, &exts()).unwrap_err();
        assert!(matches!(err, GalleryError::NotADirectory(_)));
    }

    #[test]
    fn from_folders_sorts_images() {
        let catalog = Catalog::from_folders([("tshirt", vec!["2.jpg", "1.jpg"])]);
        assert_eq!(catalog.images("tshirt").unwrap(), ["1.jpg", "2.jpg"]);
    }
}
