//! # wp2mdx
//!
//! Migrates a WordPress site into MDX content for a static site. The inputs
//! are a WordPress XML export (WXR) and a flat directory of media files
//! downloaded from the old site's uploads. The output is one `.mdx`
//! document per published page and post, plus data files and reports.
//!
//! # Architecture: Migrate, Then Audit
//!
//! ```text
//! 1. Migrate   export.xml + images/  →  content/   (documents, data, report)
//! 2. Audit     export.xml + images/ + content/  →  IMAGE_AUDIT_REPORT.md
//! ```
//!
//! The two passes have opposite failure policies:
//!
//! - **Migrate is lenient.** An image that cannot be matched, or a page
//!   that ends up empty, is recorded in `MIGRATION_REPORT.md` and the
//!   document is still written with the original reference intact.
//! - **Audit is strict.** An expected image with no local file, or a
//!   generated reference to a file that does not exist, fails the run so it
//!   can gate a build.
//!
//! Only missing inputs are fatal for a migration, and they abort before any
//! output is written.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`naming`] | WordPress filename variants (`-300x200`, `-scaled`, `-e123`, ` (1)`) and their canonical key |
//! | [`scan`] | Local image index and exact-then-canonical image matching |
//! | [`export`] | Streaming WXR reader producing typed records |
//! | [`dom`] | Helpers over the html5ever DOM |
//! | [`rewrite`] | HTML cleanup and media URL rewriting for one body |
//! | [`markdown`] | HTML → MDX-flavoured Markdown |
//! | [`menu`] | Navigation tree reconstruction from flat menu records |
//! | [`report`] | Migration report accumulation and rendering |
//! | [`migrate`] | End-to-end migration: plan in memory, then write |
//! | [`audit`] | Post-migration image audit |
//! | [`types`] | JSON and frontmatter shapes read by the rendering layer |
//! | [`config`] | `wp2mdx.toml` loading, merging and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Exact Match Before Fuzzy Match
//!
//! WordPress stores every upload several times (`photo.jpg`,
//! `photo-300x200.jpg`, `photo-scaled.jpg`) and manual downloads add their
//! own duplicates (`photo (1).jpg`). A reference is first looked up by its
//! exact, case-insensitive filename. Only when that fails is it reduced to a
//! canonical key and resolved to the best-scored local variant, preferring
//! the plainest filename. See [`naming::canonicalize`] and
//! [`scan::LocalImageIndex::resolve`].
//!
//! ## Deterministic Output
//!
//! The same export and the same image directory always produce
//! byte-identical artifacts. Every map is a `BTreeMap`, menu siblings sort
//! on `(menu_order, id)`, canonical buckets sort on `(score, name)`, and
//! every report listing is sorted.
//!
//! ## MDX-Safe Markup
//!
//! MDX parses inline HTML as JSX. Void elements are always self-closed
//! (`<img ... />`), and braces and `<` in text are escaped so prose never
//! opens a JSX expression or tag.

pub mod audit;
pub mod config;
pub mod dom;
pub mod export;
pub mod markdown;
pub mod menu;
pub mod migrate;
pub mod naming;
pub mod output;
pub mod report;
pub mod rewrite;
pub mod scan;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
