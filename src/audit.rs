//! Post-migration image audit.
//!
//! Runs after [`crate::migrate`] and never modifies documents. It answers
//! three questions and writes the answers to `IMAGE_AUDIT_REPORT.md`:
//!
//! 1. **Missing expected images**: image attachments in the export whose
//!    canonical key has no local file at all.
//! 2. **Broken references**: local media references in generated documents
//!    that do not name an existing file exactly. No fuzzy matching here; a
//!    generated reference must point at a real file byte for byte.
//! 3. **Unused images**: local files no document references.
//!
//! The first two make the audit fail (see [`AuditResult::gate`]); the third
//! is informational.

use crate::config::{MigrateConfig, SiteConfig};
use crate::export::{Export, ExportError, read_export};
use crate::migrate::{PAGES_DIR, POSTS_DIR};
use crate::naming::{canonicalize, is_image_filename};
use crate::scan::{LocalImageIndex, ScanError, decoded_basename};
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Export file not found: {0}")]
    ExportNotFound(PathBuf),
    #[error("Images directory not found: {0}")]
    ImagesDirNotFound(PathBuf),
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error(
        "Image audit failed: {missing_expected} expected image(s) missing, \
         {broken_references} broken reference(s)"
    )]
    Failed {
        missing_expected: usize,
        broken_references: usize,
    },
}

pub const REPORT_FILE: &str = "IMAGE_AUDIT_REPORT.md";

// Attribute values end at the quote they opened with: `"O'Brien.jpg"`.
static SRC_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|[^\w-])src\s*=\s*(?:"([^"]+)"|'([^']+)')"#).expect("valid regex")
});
static SRCSET_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|[^\w-])srcset\s*=\s*(?:"([^"]+)"|'([^']+)')"#).expect("valid regex")
});
static LAZY_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bdata-(?:src|lazy-src|original)\s*=\s*(?:"([^"]+)"|'([^']+)')"#)
        .expect("valid regex")
});
static MARKDOWN_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"!\[[^\]]*\]\((?:<([^>]+)>|([^)\s]+))(?:\s+["'][^"']*["'])?\)"#)
        .expect("valid regex")
});

/// An expected image with no local counterpart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingExpected {
    pub key: String,
    /// Every export basename that canonicalized to `key`.
    pub originals: Vec<String>,
}

/// A document reference to a local file that does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenReference {
    /// Path relative to the content directory (`pages/about.mdx`).
    pub document: String,
    pub reference: String,
}

/// A generated document as read back from disk.
#[derive(Debug, Clone)]
pub struct ScannedDocument {
    pub name: String,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct AuditResult {
    /// Distinct image basenames among export attachments.
    pub expected: usize,
    pub local_images: usize,
    pub documents: usize,
    /// Distinct local basenames referenced by any document.
    pub referenced: usize,
    pub missing_expected: Vec<MissingExpected>,
    pub broken_references: Vec<BrokenReference>,
    pub unused: Vec<String>,
}

impl AuditResult {
    pub fn passed(&self) -> bool {
        self.missing_expected.is_empty() && self.broken_references.is_empty()
    }

    /// `Err(AuditError::Failed)` unless the audit passed.
    pub fn gate(&self) -> Result<(), AuditError> {
        if self.passed() {
            Ok(())
        } else {
            Err(AuditError::Failed {
                missing_expected: self.missing_expected.len(),
                broken_references: self.broken_references.len(),
            })
        }
    }

    /// Render as Markdown.
    pub fn render(&self) -> String {
        let mut lines: Vec<String> = vec![
            "# Image Audit Report".into(),
            String::new(),
            format!("- **Expected attachments (from export)**: {}", self.expected),
            format!("- **Local images present**: {}", self.local_images),
            format!("- **MDX files scanned**: {}", self.documents),
            format!("- **Referenced local images**: {}", self.referenced),
            String::new(),
            "## Missing images (expected by export but not found locally)".into(),
            String::new(),
        ];
        if self.missing_expected.is_empty() {
            lines.push("None".into());
        }
        for missing in &self.missing_expected {
            for original in &missing.originals {
                lines.push(format!("- {original}"));
            }
        }
        lines.push(String::new());

        lines.push("## Broken references (MDX points to a non-existent local file)".into());
        lines.push(String::new());
        if self.broken_references.is_empty() {
            lines.push("None".into());
        }
        for broken in &self.broken_references {
            lines.push(format!("- **{}** → `{}`", broken.document, broken.reference));
        }
        lines.push(String::new());

        lines.push("## Unused local images (present locally but never referenced)".into());
        lines.push(String::new());
        if self.unused.is_empty() {
            lines.push("None".into());
        }
        for name in &self.unused {
            lines.push(format!("- {name}"));
        }
        lines.push(String::new());

        lines.join("\n") + "\n"
    }
}

/// Run the audit and write its report. Does not gate; see [`AuditResult::gate`].
pub fn run_audit(config: &MigrateConfig) -> Result<AuditResult, AuditError> {
    let export_path = config.export_path();
    if !export_path.is_file() {
        return Err(AuditError::ExportNotFound(export_path));
    }
    let images_dir = config.images_dir();
    if !images_dir.is_dir() {
        return Err(AuditError::ImagesDirNotFound(images_dir));
    }

    let images = LocalImageIndex::scan(&images_dir)?;
    let export = read_export(&export_path)?;
    let content = config.content_dir();
    let documents = read_documents(&content)?;

    let result = audit_documents(&export, &images, &documents, &config.site);
    fs::create_dir_all(&content)?;
    fs::write(content.join(REPORT_FILE), result.render())?;
    Ok(result)
}

/// Read `pages/*.mdx` then `posts/*.mdx`, each sorted by name.
pub fn read_documents(content_dir: &Path) -> Result<Vec<ScannedDocument>, AuditError> {
    let mut documents = Vec::new();
    for dir in [PAGES_DIR, POSTS_DIR] {
        let path = content_dir.join(dir);
        if !path.is_dir() {
            continue;
        }
        let walker = WalkDir::new(&path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();
        for entry in walker {
            let entry = entry?;
            let is_document = entry.file_type().is_file()
                && entry.path().extension().and_then(|e| e.to_str()) == Some("mdx");
            if !is_document {
                continue;
            }
            documents.push(ScannedDocument {
                name: format!("{dir}/{}", entry.file_name().to_string_lossy()),
                text: fs::read_to_string(entry.path())?,
            });
        }
    }
    Ok(documents)
}

/// Compare export, local files and generated documents.
pub fn audit_documents(
    export: &Export,
    images: &LocalImageIndex,
    documents: &[ScannedDocument],
    site: &SiteConfig,
) -> AuditResult {
    let mut expected_basenames = BTreeSet::new();
    let mut expected: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for record in &export.attachments {
        let url = if record.attachment_url.is_empty() {
            &record.guid
        } else {
            &record.attachment_url
        };
        if url.is_empty() {
            continue;
        }
        let basename = decoded_basename(url);
        if !is_image_filename(&basename) {
            continue;
        }
        expected
            .entry(canonicalize(&basename))
            .or_default()
            .insert(basename.clone());
        expected_basenames.insert(basename);
    }

    let missing_expected = expected
        .into_iter()
        .filter(|(key, _)| !images.has_canonical(key))
        .map(|(key, originals)| MissingExpected {
            key,
            originals: originals.into_iter().collect(),
        })
        .collect();

    let prefixes = local_prefixes(&site.media_prefix);
    let mut referenced = BTreeSet::new();
    let mut broken_references = Vec::new();
    for doc in documents {
        for reference in image_references(&doc.text) {
            if !prefixes.iter().any(|p| reference.starts_with(p.as_str())) {
                continue;
            }
            let basename = local_basename(&reference);
            if !images.contains_file(&basename) {
                broken_references.push(BrokenReference {
                    document: doc.name.clone(),
                    reference: reference.clone(),
                });
            }
            referenced.insert(basename);
        }
    }

    let unused = images
        .files()
        .filter(|f| !referenced.contains(*f))
        .map(str::to_string)
        .collect();

    AuditResult {
        expected: expected_basenames.len(),
        local_images: images.len(),
        documents: documents.len(),
        referenced: referenced.len(),
        missing_expected,
        broken_references,
        unused,
    }
}

/// Every image reference in a document, in pattern order.
pub fn image_references(text: &str) -> Vec<String> {
    let mut refs: Vec<String> = SRC_ATTR
        .captures_iter(text)
        .map(|c| quoted_value(&c).to_string())
        .collect();
    for caps in SRCSET_ATTR.captures_iter(text) {
        refs.extend(
            quoted_value(&caps)
                .split(',')
                .filter_map(|part| part.split_whitespace().next())
                .map(str::to_string),
        );
    }
    refs.extend(
        LAZY_ATTR
            .captures_iter(text)
            .map(|c| quoted_value(&c).to_string()),
    );
    refs.extend(MARKDOWN_IMAGE.captures_iter(text).filter_map(|c| {
        c.get(1)
            .or_else(|| c.get(2))
            .map(|m| m.as_str().to_string())
    }));
    refs
}

/// The double- or single-quoted alternative of an attribute match.
fn quoted_value<'t>(caps: &regex::Captures<'t>) -> &'t str {
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str())
        .unwrap_or_default()
}

/// `/images/`, `images/` and `./images/` for a media prefix of `/images`.
fn local_prefixes(media_prefix: &str) -> Vec<String> {
    let dir = media_prefix.trim_matches('/');
    vec![format!("/{dir}/"), format!("{dir}/"), format!("./{dir}/")]
}

/// Decoded last path segment of a local reference.
fn local_basename(reference: &str) -> String {
    let path = reference.split(['?', '#']).next().unwrap_or_default();
    let name = path.rsplit('/').next().unwrap_or_default();
    percent_decode_str(name).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::parse_export;
    use crate::test_helpers::*;

    const UPLOADS: &str = "https://site.test/wp-content/uploads/2024/01";

    fn doc(name: &str, text: &str) -> ScannedDocument {
        ScannedDocument {
            name: name.into(),
            text: text.into(),
        }
    }

    fn audit(attachments: &[&str], files: &[&str], docs: &[ScannedDocument]) -> AuditResult {
        let items: Vec<String> = attachments
            .iter()
            .enumerate()
            .map(|(i, url)| attachment_item(100 + i as u64, &format!("{UPLOADS}/{url}")))
            .collect();
        let export = parse_export(&wxr(&items)).unwrap();
        audit_documents(&export, &index(files), docs, &SiteConfig::default())
    }

    #[test]
    fn finds_references_in_all_four_forms() {
        let text = r#"![A](/images/a.jpg "A") ![B](</images/b c.jpg>)
<img src="/images/d.jpg" srcset="/images/e.jpg 300w, /images/f.jpg 2x" data-lazy-src='/images/g.jpg' />"#;
        assert_eq!(
            image_references(text),
            vec![
                "/images/d.jpg",
                "/images/e.jpg",
                "/images/f.jpg",
                "/images/g.jpg",
                "/images/a.jpg",
                "/images/b c.jpg"
            ]
        );
    }

    #[test]
    fn clean_audit_passes() {
        let result = audit(
            &["a-300x200.jpg", "b.png", "doc.pdf"],
            &["a.jpg", "b.png", "spare.gif"],
            &[doc("pages/about.mdx", "![](/images/a.jpg)\n<img src=\"/images/b.png\" />")],
        );
        assert!(result.passed());
        assert!(result.gate().is_ok());
        assert_eq!(result.expected, 2);
        assert_eq!(result.referenced, 2);
        assert_eq!(result.unused, vec!["spare.gif"]);
    }

    #[test]
    fn expected_images_compare_by_canonical_key() {
        let result = audit(
            &["photo-300x200.jpg", "photo-scaled.jpg", "gone-1024x768.png"],
            &["photo.jpg"],
            &[],
        );
        assert_eq!(
            result.missing_expected,
            vec![MissingExpected {
                key: "gone.png".into(),
                originals: vec!["gone-1024x768.png".into()],
            }]
        );
        assert!(matches!(
            result.gate(),
            Err(AuditError::Failed {
                missing_expected: 1,
                broken_references: 0
            })
        ));
    }

    #[test]
    fn broken_references_need_exact_filenames() {
        let result = audit(
            &[],
            &["a.jpg"],
            &[doc(
                "posts/news.mdx",
                "![](/images/a-300x200.jpg) ![](/images/a.jpg?v=2) ![](https://cdn.example/x.jpg)",
            )],
        );
        assert_eq!(
            result.broken_references,
            vec![BrokenReference {
                document: "posts/news.mdx".into(),
                reference: "/images/a-300x200.jpg".into(),
            }]
        );
        assert!(!result.passed());
    }

    #[test]
    fn percent_encoded_references_are_decoded() {
        let result = audit(&[], &["a b.jpg"], &[doc("pages/x.mdx", "![](./images/a%20b.jpg)")]);
        assert!(result.passed());
        assert!(result.unused.is_empty());
    }

    #[test]
    fn encoded_attachment_urls_match_decoded_files() {
        let result = audit(&["caf%C3%A9-300x200.jpg"], &["café.jpg"], &[]);
        assert!(result.missing_expected.is_empty(), "{:?}", result.missing_expected);
        assert_eq!(result.expected, 1);

        let images = index(&["café.jpg"]);
        let matched = images
            .resolve(&format!("{UPLOADS}/caf%C3%A9-300x200.jpg"))
            .unwrap();
        assert_eq!(matched.file, "café.jpg");
    }

    #[test]
    fn quoted_values_may_contain_the_other_quote() {
        let text = r#"<blockquote><img src="/images/O'Brien.jpg" /><img src='/images/say "hi".png' /></blockquote>"#;
        assert_eq!(
            image_references(text),
            vec!["/images/O'Brien.jpg", r#"/images/say "hi".png"#]
        );
        let result = audit(&[], &["O'Brien.jpg"], &[doc("pages/team.mdx", text)]);
        assert_eq!(result.broken_references.len(), 1);
        assert_eq!(result.broken_references[0].reference, r#"/images/say "hi".png"#);
    }

    #[test]
    fn report_lists_every_section() {
        let result = AuditResult {
            expected: 1,
            local_images: 1,
            documents: 1,
            referenced: 0,
            missing_expected: vec![MissingExpected {
                key: "gone.png".into(),
                originals: vec!["gone-300x200.png".into(), "gone.png".into()],
            }],
            broken_references: vec![BrokenReference {
                document: "pages/about.mdx".into(),
                reference: "/images/x.jpg".into(),
            }],
            unused: vec!["spare.gif".into()],
        };
        let text = result.render();
        assert!(text.starts_with("# Image Audit Report\n"));
        assert!(text.contains("- gone-300x200.png\n- gone.png\n"));
        assert!(text.contains("- **pages/about.mdx** → `/images/x.jpg`"));
        assert!(text.contains("- spare.gif\n"));
    }

    #[test]
    fn documents_are_read_sorted_pages_first() {
        let tmp = tempfile::TempDir::new().unwrap();
        for (dir, name) in [("posts", "a.mdx"), ("pages", "z.mdx"), ("pages", "b.mdx")] {
            fs::create_dir_all(tmp.path().join(dir)).unwrap();
            fs::write(tmp.path().join(dir).join(name), "x").unwrap();
        }
        fs::write(tmp.path().join("pages/notes.txt"), "x").unwrap();

        let names: Vec<String> = read_documents(tmp.path())
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["pages/b.mdx", "pages/z.mdx", "posts/a.mdx"]);
    }
}
