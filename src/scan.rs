// Copyright 2025 Tomoki Hayashi
// MIT License (https://opensource.org/licenses/MIT)

//! Image enumeration.
//!
//! Two traversal shapes:
//! - [`enumerate`]: recursive walk with a bounded depth, used by the HTTP
//!   gallery. The depth bound keeps a pathological tree from exhausting the
//!   process.
//! - [`list_folder`] / [`subfolders`]: one-level listings, used by the
//!   terminal browser's per-folder view and folder tree.
//!
//! Results are name-sorted so that repeated calls within one session yield
//! the same order and page boundaries never shift between requests.

use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

use crate::error::{Error, Result};

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// One enumerated image file. Equality and hashing are by path only; the
/// modified timestamp is display/sort metadata.
#[derive(Debug, Clone)]
pub struct ImageRef {
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
}

impl ImageRef {
    pub fn new(path: PathBuf, modified: Option<SystemTime>) -> Self {
        Self { path, modified }
    }

    pub fn name(&self) -> String {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string()
    }

    fn ext(&self) -> String {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase()
    }
}

impl PartialEq for ImageRef {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for ImageRef {}

impl Hash for ImageRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        return Err(Error::NotFound(dir.to_path_buf()));
    }
    Ok(())
}

fn image_ref(path: &Path, meta: Option<fs::Metadata>) -> ImageRef {
    let modified = meta.and_then(|m| m.modified().ok());
    ImageRef::new(path.to_path_buf(), modified)
}

/// Recursively collect every image under `root`, up to `max_depth` levels
/// deep, name-sorted. Fails with `NotFound` if `root` is missing or not a
/// directory.
pub fn enumerate(root: &Path, max_depth: usize) -> Result<Vec<ImageRef>> {
    ensure_dir(root)?;
    let mut images: Vec<ImageRef> = WalkDir::new(root)
        .max_depth(max_depth.max(1))
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_image_file(entry.path()))
        .map(|entry| {
            let meta = entry.metadata().ok();
            image_ref(entry.path(), meta)
        })
        .collect();
    images.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(images)
}

/// Images directly inside `dir` (no recursion), name-sorted.
pub fn list_folder(dir: &Path) -> Result<Vec<ImageRef>> {
    ensure_dir(dir)?;
    let mut images: Vec<ImageRef> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let p = entry.path();
            p.is_file() && is_image_file(&p)
        })
        .map(|entry| image_ref(&entry.path(), entry.metadata().ok()))
        .collect();
    images.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(images)
}

/// Immediate subdirectory names of `dir`, sorted. Feeds the folder tree and
/// its cache.
pub fn subfolders(dir: &Path) -> Result<Vec<String>> {
    ensure_dir(dir)?;
    let mut folders: Vec<String> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .collect();
    folders.sort();
    Ok(folders)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    NameAsc,
    NameDesc,
    ModifiedAsc,
    ModifiedDesc,
    Type,
}

impl SortKey {
    pub fn cycle(self) -> Self {
        match self {
            SortKey::NameAsc => SortKey::NameDesc,
            SortKey::NameDesc => SortKey::ModifiedAsc,
            SortKey::ModifiedAsc => SortKey::ModifiedDesc,
            SortKey::ModifiedDesc => SortKey::Type,
            SortKey::Type => SortKey::NameAsc,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortKey::NameAsc => "name",
            SortKey::NameDesc => "name desc",
            SortKey::ModifiedAsc => "modified",
            SortKey::ModifiedDesc => "modified desc",
            SortKey::Type => "type",
        }
    }
}

/// Sort in place. Every mode breaks ties by path so the order is total and
/// stable across calls.
pub fn sort_refs(refs: &mut [ImageRef], key: SortKey) {
    refs.sort_by(|a, b| match key {
        SortKey::NameAsc => a.path.cmp(&b.path),
        SortKey::NameDesc => b.path.cmp(&a.path),
        SortKey::ModifiedAsc => a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)),
        SortKey::ModifiedDesc => b.modified.cmp(&a.modified).then_with(|| a.path.cmp(&b.path)),
        SortKey::Type => a.ext().cmp(&b.ext()).then_with(|| a.path.cmp(&b.path)),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn touch(dir: &Path, name: &str) {
        File::create(dir.join(name)).unwrap();
    }

    #[test]
    fn test_is_image_file_allowed_extensions() {
        assert!(is_image_file(&PathBuf::from("a.jpg")));
        assert!(is_image_file(&PathBuf::from("a.jpeg")));
        assert!(is_image_file(&PathBuf::from("a.png")));
        assert!(is_image_file(&PathBuf::from("a.gif")));
        assert!(is_image_file(&PathBuf::from("a.JPG")));
    }

    #[test]
    fn test_is_image_file_rejects_others() {
        assert!(!is_image_file(&PathBuf::from("a.txt")));
        assert!(!is_image_file(&PathBuf::from("a.webp")));
        assert!(!is_image_file(&PathBuf::from("noextension")));
    }

    #[test]
    fn test_enumerate_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "c.jpg");
        touch(dir.path(), "b.txt");
        touch(dir.path(), "d.JPG");
        touch(dir.path(), "a.png");

        let images = enumerate(dir.path(), 16).unwrap();
        let names: Vec<String> = images.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["a.png", "c.jpg", "d.JPG"]);
    }

    #[test]
    fn test_enumerate_is_stable_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "z.gif");
        touch(dir.path(), "m.jpeg");
        touch(dir.path(), "a.jpg");

        let first = enumerate(dir.path(), 16).unwrap();
        let second = enumerate(dir.path(), 16).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_enumerate_recurses() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        touch(dir.path(), "top.jpg");
        touch(&dir.path().join("sub"), "nested.png");

        let images = enumerate(dir.path(), 16).unwrap();
        assert_eq!(images.len(), 2);
    }

    #[test]
    fn test_enumerate_honors_depth_bound() {
        let dir = tempfile::tempdir().unwrap();
        let deep = dir.path().join("a").join("b");
        std::fs::create_dir_all(&deep).unwrap();
        touch(dir.path(), "top.jpg");
        touch(&deep, "deep.jpg");

        // max_depth 1 = the root's own entries only.
        let images = enumerate(dir.path(), 1).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].name(), "top.jpg");
    }

    #[test]
    fn test_enumerate_missing_root() {
        let err = enumerate(&PathBuf::from("/no/such/dir"), 16).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_enumerate_rejects_plain_file_root() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.jpg");
        let err = enumerate(&dir.path().join("a.jpg"), 16).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_list_folder_is_one_level() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        touch(dir.path(), "top.jpg");
        touch(&dir.path().join("sub"), "nested.png");

        let images = list_folder(dir.path()).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].name(), "top.jpg");
    }

    #[test]
    fn test_subfolders_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("zoo")).unwrap();
        std::fs::create_dir(dir.path().join("alpha")).unwrap();
        touch(dir.path(), "not_a_dir.jpg");

        let folders = subfolders(dir.path()).unwrap();
        assert_eq!(folders, vec!["alpha", "zoo"]);
    }

    #[test]
    fn test_image_ref_equality_ignores_modified() {
        let a = ImageRef::new(PathBuf::from("x.png"), Some(SystemTime::UNIX_EPOCH));
        let b = ImageRef::new(PathBuf::from("x.png"), None);
        assert_eq!(a, b);
    }

    fn named_refs(names: &[&str]) -> Vec<ImageRef> {
        names
            .iter()
            .map(|n| ImageRef::new(PathBuf::from(n), None))
            .collect()
    }

    #[test]
    fn test_sort_name_desc() {
        let mut refs = named_refs(&["a.png", "c.jpg", "b.gif"]);
        sort_refs(&mut refs, SortKey::NameDesc);
        let names: Vec<String> = refs.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["c.jpg", "b.gif", "a.png"]);
    }

    #[test]
    fn test_sort_modified_breaks_ties_by_name() {
        let t = SystemTime::UNIX_EPOCH;
        let mut refs = vec![
            ImageRef::new(PathBuf::from("b.png"), Some(t)),
            ImageRef::new(PathBuf::from("a.png"), Some(t)),
        ];
        sort_refs(&mut refs, SortKey::ModifiedAsc);
        assert_eq!(refs[0].name(), "a.png");
    }

    #[test]
    fn test_sort_by_type_groups_extensions() {
        let mut refs = named_refs(&["b.png", "a.jpg", "c.png", "d.gif"]);
        sort_refs(&mut refs, SortKey::Type);
        let exts: Vec<String> = refs.iter().map(|r| r.ext()).collect();
        assert_eq!(exts, vec!["gif", "jpg", "png", "png"]);
    }

    #[test]
    fn test_sort_cycle_visits_all_modes() {
        let mut key = SortKey::NameAsc;
        let mut seen = vec![key];
        for _ in 0..4 {
            key = key.cycle();
            seen.push(key);
        }
        assert_eq!(key.cycle(), SortKey::NameAsc);
        seen.dedup();
        assert_eq!(seen.len(), 5);
    }
}
