//! Centralized filename canonicalization for WordPress media.
//!
//! WordPress rewrites an uploaded file into many siblings: resized copies
//! (`photo-300x200.jpg`), big-image downscales (`photo-scaled.jpg`), editor
//! crops (`photo-e1612345678.jpg`), and upload collisions (`photo-1.jpg`).
//! Manual downloads add their own duplicates (`photo (1).jpg`). All of these
//! refer to one underlying asset, so matching groups them under a single
//! canonical key:
//!
//! - `photo-300x200.jpg` → `photo.jpg`
//! - `Photo-scaled.JPG` → `photo.jpg`
//! - `photo-e123.jpg` → `photo.jpg`
//! - `photo (1).jpg` → `photo.jpg`
//! - `photo-1.jpg` → `photo.jpg`
//! - `photo-2.jpg` → `photo-2.jpg` (see [`strip_duplicate_counter`])
//!
//! Suffixes are stripped repeatedly until none remain, so
//! `canonicalize(canonicalize(f)) == canonicalize(f)` for every input.

use regex::Regex;
use std::sync::LazyLock;

/// Extensions treated as images by the audit pass.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "svg"];

static RESIZE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-\d{2,4}x\d{2,4}$").expect("valid regex"));
static SCALED_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-scaled$").expect("valid regex"));
static EDIT_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-e\d+$").expect("valid regex"));
static COPY_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(\d+\)$").expect("valid regex"));
static COUNTER_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-(\d+)$").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

// Variant markers as they appear on a full filename, used for scoring.
static HAS_DIMENSIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-\d{2,4}x\d{2,4}\.[^.]+$").expect("valid regex"));
static HAS_SCALED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-scaled\.[^.]+$").expect("valid regex"));
static HAS_EDIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-e\d+(-|\.|$)").expect("valid regex"));
static HAS_COPY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\d+\)\.[^.]+$").expect("valid regex"));

/// Split a filename into `(stem, extension)`, extension including the dot.
///
/// A leading dot is part of the stem, so `.jpg` has no extension.
pub fn split_extension(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(pos) if pos > 0 => (&filename[..pos], &filename[pos..]),
        _ => (filename, ""),
    }
}

/// Normalize a media filename to its dedup key.
pub fn canonicalize(filename: &str) -> String {
    let (stem, ext) = split_extension(filename);
    let mut name = stem.to_lowercase();
    loop {
        let next = strip_variant_suffixes(&name);
        if next == name {
            break;
        }
        name = next;
    }
    format!("{}{}", name, ext.to_lowercase())
}

/// One pass of suffix stripping over a lower-cased stem.
fn strip_variant_suffixes(stem: &str) -> String {
    let name = RESIZE_SUFFIX.replace(stem, "");
    let name = SCALED_SUFFIX.replace(&name, "");
    let name = EDIT_SUFFIX.replace(&name, "");
    let name = COPY_SUFFIX.replace(&name, "");
    let name = strip_duplicate_counter(&name);
    WHITESPACE.replace_all(&name, " ").trim().to_string()
}

/// The counter WordPress appends on an upload-name collision.
const DUPLICATE_COUNTER: &str = "1";

/// Strip a trailing `-1` duplicate counter and keep every other number.
///
/// `-1` is almost always a collision copy, while `-2`, `-2019` and friends
/// often name genuinely different images. This is a heuristic tuned to one
/// site's uploads rather than a rule.
pub fn strip_duplicate_counter(stem: &str) -> String {
    match COUNTER_SUFFIX.captures(stem) {
        Some(caps) if &caps[1] == DUPLICATE_COUNTER => {
            let start = caps.get(0).map(|m| m.start()).unwrap_or(stem.len());
            stem[..start].to_string()
        }
        _ => stem.to_string(),
    }
}

/// Preference score for a bucket candidate. Lower is better.
///
/// Each variant marker costs 10 000; filename length breaks ties so the
/// shortest unmodified name wins.
pub fn candidate_score(filename: &str) -> u64 {
    let lower = filename.to_lowercase();
    let markers = [&HAS_DIMENSIONS, &HAS_SCALED, &HAS_EDIT, &HAS_COPY]
        .iter()
        .filter(|re| re.is_match(&lower))
        .count() as u64;
    markers * 10_000 + lower.len() as u64
}

/// Whether a filename carries one of [`IMAGE_EXTENSIONS`].
pub fn is_image_filename(filename: &str) -> bool {
    let (_, ext) = split_extension(filename);
    let ext = ext.trim_start_matches('.').to_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str())
}
