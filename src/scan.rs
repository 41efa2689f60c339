//! Local image directory scanning and reference matching.
//!
//! The media library is a flat directory of files downloaded from the old
//! site. It is scanned exactly once per run into a [`LocalImageIndex`]:
//!
//! ```text
//! images/
//! ├── Photo.JPG              exact: "photo.jpg"              → "Photo.JPG"
//! ├── photo-300x200.jpg      exact: "photo-300x200.jpg"      → "photo-300x200.jpg"
//! └── gala-2019.png          exact: "gala-2019.png"          → "gala-2019.png"
//!
//! canonical: "photo.jpg"     → ["Photo.JPG", "photo-300x200.jpg"]
//!            "gala-2019.png" → ["gala-2019.png"]
//! ```
//!
//! ## Matching
//!
//! [`LocalImageIndex::resolve`] runs two tiers, in order:
//!
//! 1. **Exact**: case-insensitive filename equality.
//! 2. **Canonical**: the reference's [`canonical key`](crate::naming::canonicalize)
//!    selects a bucket; its best-scored candidate wins.
//!
//! A literal filename always beats a heuristic one, even when the canonical
//! bucket holds a better-scored file.

use crate::naming;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Image directory not found: {0}")]
    DirNotFound(PathBuf),
    #[error("Failed to read image directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Which matching tier produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Canonical,
}

/// A reference resolved to a file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMatch {
    /// Actual filename in the image directory.
    pub file: String,
    pub kind: MatchKind,
}

/// Immutable lookup tables built from one directory snapshot.
#[derive(Debug, Clone, Default)]
pub struct LocalImageIndex {
    by_exact_lower: BTreeMap<String, String>,
    by_canonical: BTreeMap<String, Vec<String>>,
    files: BTreeSet<String>,
}

impl LocalImageIndex {
    /// Scan `dir` (non-recursive, files only).
    pub fn scan(dir: &Path) -> Result<Self, ScanError> {
        if !dir.is_dir() {
            return Err(ScanError::DirNotFound(dir.to_path_buf()));
        }
        let mut names = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry?;
            if entry.file_type().is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(Self::from_filenames(names))
    }

    /// Build an index from bare filenames.
    pub fn from_filenames<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut files: Vec<String> = names.into_iter().map(Into::into).collect();
        // Directory order is filesystem-dependent
        files.sort();
        files.dedup();

        let mut by_exact_lower = BTreeMap::new();
        let mut by_canonical: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for file in &files {
            by_exact_lower
                .entry(file.to_lowercase())
                .or_insert_with(|| file.clone());
            by_canonical
                .entry(naming::canonicalize(file))
                .or_default()
                .push(file.clone());
        }
        for bucket in by_canonical.values_mut() {
            bucket.sort_by_cached_key(|f| (naming::candidate_score(f), f.clone()));
        }

        Self {
            by_exact_lower,
            by_canonical,
            files: files.into_iter().collect(),
        }
    }

    /// Resolve a filename or URL to a local file.
    pub fn resolve(&self, reference: &str) -> Option<ImageMatch> {
        let basename = decoded_basename(reference);
        if basename.is_empty() {
            return None;
        }
        if let Some(file) = self.by_exact_lower.get(&basename.to_lowercase()) {
            return Some(ImageMatch {
                file: file.clone(),
                kind: MatchKind::Exact,
            });
        }
        self.bucket(&naming::canonicalize(&basename))
            .and_then(|bucket| bucket.first())
            .map(|file| ImageMatch {
                file: file.clone(),
                kind: MatchKind::Canonical,
            })
    }

    /// Candidates sharing a canonical key, best first.
    pub fn bucket(&self, key: &str) -> Option<&[String]> {
        self.by_canonical.get(key).map(Vec::as_slice)
    }

    pub fn canonical_keys(&self) -> impl Iterator<Item = &str> {
        self.by_canonical.keys().map(String::as_str)
    }

    pub fn has_canonical(&self, key: &str) -> bool {
        self.by_canonical.contains_key(key)
    }

    /// Byte-exact membership test.
    pub fn contains_file(&self, name: &str) -> bool {
        self.files.contains(name)
    }

    /// All filenames, sorted.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Last path segment of a URL or path, without query or fragment.
///
/// Absolute URLs are parsed so the host never leaks into the result;
/// anything else is treated as a relative path.
pub fn basename_from_url(reference: &str) -> String {
    let path = match url::Url::parse(reference) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => reference
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// [`basename_from_url`], percent-decoded: the name as it would be on disk.
pub fn decoded_basename(reference: &str) -> String {
    let basename = basename_from_url(reference);
    percent_encoding::percent_decode_str(&basename)
        .decode_utf8_lossy()
        .into_owned()
}
