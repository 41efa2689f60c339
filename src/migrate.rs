//! End-to-end migration: one export file and one image directory in, a
//! complete `content/` tree out.
//!
//! The run has two halves. [`plan`] validates the inputs, reads them and
//! produces every artifact in memory as a [`Migration`]. [`write_outputs`]
//! then writes that set to disk. A missing or unreadable input therefore
//! aborts before any output is touched, and a re-run regenerates the whole
//! set rather than merging into it.
//!
//! ```text
//! content/
//! ├── pages/<slug>.mdx
//! ├── posts/<slug>.mdx
//! ├── data/attachments.json
//! ├── data/menu.json
//! └── MIGRATION_REPORT.md
//! ```

use crate::config::MigrateConfig;
use crate::export::{Export, ExportError, ExportRecord, RecordKind, read_export};
use crate::menu::{LinkTarget, MenuTargets, build_menu};
use crate::report::{EmptyPage, MigrationReport};
use crate::rewrite::{DocContext, Rewriter, is_empty_body};
use crate::scan::{LocalImageIndex, ScanError, basename_from_url};
use crate::types::{AttachmentRecord, Frontmatter, MenuData, date_part};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum MigrateError {
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
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

pub const PAGES_DIR: &str = "pages";
pub const POSTS_DIR: &str = "posts";
pub const DATA_DIR: &str = "data";
pub const REPORT_FILE: &str = "MIGRATION_REPORT.md";
const DOCUMENT_EXT: &str = "mdx";

/// Console summary printed at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationSummary {
    pub pages: usize,
    pub posts: usize,
    pub attachments: usize,
    pub nav_menu_items: usize,
    /// Distinct unresolved basenames.
    pub missing_images: usize,
}

/// One generated content document.
#[derive(Debug, Clone)]
pub struct Document {
    pub kind: RecordKind,
    pub slug: String,
    pub title: String,
    /// Relative to the content directory.
    pub path: PathBuf,
    pub text: String,
}

/// Everything a run produces, held in memory until written.
#[derive(Debug, Clone)]
pub struct Migration {
    pub documents: Vec<Document>,
    pub attachments: Vec<AttachmentRecord>,
    pub menu: MenuData,
    pub report: MigrationReport,
    pub summary: MigrationSummary,
    /// Drafts and other unpublished pages/posts that were skipped.
    pub unpublished: usize,
    /// Files in the image directory.
    pub local_images: usize,
}

/// Run the whole migration and write every artifact.
pub fn migrate(config: &MigrateConfig) -> Result<Migration, MigrateError> {
    let migration = plan(config)?;
    write_outputs(&migration, config)?;
    if let Some(publish_dir) = config.publish_dir() {
        publish_images(&config.images_dir(), &publish_dir)?;
    }
    Ok(migration)
}

/// Validate inputs and build every artifact in memory.
pub fn plan(config: &MigrateConfig) -> Result<Migration, MigrateError> {
    let export_path = config.export_path();
    if !export_path.is_file() {
        return Err(MigrateError::ExportNotFound(export_path));
    }
    let images_dir = config.images_dir();
    if !images_dir.is_dir() {
        return Err(MigrateError::ImagesDirNotFound(images_dir));
    }

    let images = LocalImageIndex::scan(&images_dir)?;
    let export = read_export(&export_path)?;
    Ok(plan_export(&export, &images, config))
}

/// Build every artifact from already-loaded inputs.
pub fn plan_export(export: &Export, images: &LocalImageIndex, config: &MigrateConfig) -> Migration {
    let mut report = MigrationReport {
        pages: export.pages.len(),
        posts: export.posts.len(),
        attachments: export.attachments.len(),
        nav_items: export.nav_items.len(),
        ..Default::default()
    };
    let mut targets = MenuTargets::default();
    let mut documents = Vec::new();

    for record in export.pages.iter().chain(&export.posts) {
        let slug = normalize_slug(&record.slug);
        let title = display_title(&record.title);
        let ctx = DocContext {
            kind: record.kind,
            slug: &slug,
        };
        let body = Rewriter {
            images,
            site: &config.site,
            report: &mut report,
        }
        .rewrite_body(&record.content, &ctx);

        let target = LinkTarget {
            slug: slug.clone(),
            title: title.clone(),
        };
        let dir = match record.kind {
            RecordKind::Page => {
                report.page_slugs.push(slug.clone());
                targets.pages.insert(record.id, target);
                if is_empty_body(&body) {
                    report.empty_pages.push(EmptyPage {
                        slug: slug.clone(),
                        title: title.clone(),
                    });
                }
                PAGES_DIR
            }
            _ => {
                report.post_slugs.push(slug.clone());
                targets.posts.insert(record.id, target);
                POSTS_DIR
            }
        };

        let text = document_text(record, &slug, &title, &body);
        documents.push(Document {
            kind: record.kind,
            path: Path::new(dir).join(format!("{slug}.{DOCUMENT_EXT}")),
            slug,
            title,
            text,
        });
    }

    let attachments = export
        .attachments
        .iter()
        .map(|record| attachment_record(record, images, config))
        .collect();
    let menu = MenuData {
        items: build_menu(&export.nav_items, &targets, &config.site),
    };

    let summary = MigrationSummary {
        pages: report.pages,
        posts: report.posts,
        attachments: report.attachments,
        nav_menu_items: report.nav_items,
        missing_images: report.missing_by_basename().len(),
    };

    Migration {
        documents,
        attachments,
        menu,
        report,
        summary,
        unpublished: export.unpublished,
        local_images: images.len(),
    }
}

/// Write a planned migration under the content directory.
///
/// Stale `.mdx` documents from earlier runs are removed first.
pub fn write_outputs(migration: &Migration, config: &MigrateConfig) -> Result<(), MigrateError> {
    let content = config.content_dir();
    for dir in [PAGES_DIR, POSTS_DIR, DATA_DIR] {
        fs::create_dir_all(content.join(dir))?;
    }
    for dir in [PAGES_DIR, POSTS_DIR] {
        remove_documents(&content.join(dir))?;
    }

    for doc in &migration.documents {
        fs::write(content.join(&doc.path), &doc.text)?;
    }
    write_json(
        &content.join(DATA_DIR).join("attachments.json"),
        &migration.attachments,
    )?;
    write_json(&content.join(DATA_DIR).join("menu.json"), &migration.menu)?;
    fs::write(
        content.join(REPORT_FILE),
        migration.report.render(&config.site.post_route),
    )?;
    Ok(())
}

/// Copy every file of the image directory into `publish_dir`.
pub fn publish_images(images_dir: &Path, publish_dir: &Path) -> Result<usize, MigrateError> {
    fs::create_dir_all(publish_dir)?;
    let mut copied = 0;
    for entry in WalkDir::new(images_dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        if entry.file_type().is_file() {
            fs::copy(entry.path(), publish_dir.join(entry.file_name()))?;
            copied += 1;
        }
    }
    Ok(copied)
}

fn remove_documents(dir: &Path) -> Result<(), MigrateError> {
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        let is_document = entry.file_type().is_file()
            && entry.path().extension().and_then(|e| e.to_str()) == Some(DOCUMENT_EXT);
        if is_document {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), MigrateError> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json + "\n")?;
    Ok(())
}

/// Trimmed slug usable as a filename; `untitled` when empty.
pub fn normalize_slug(slug: &str) -> String {
    let slug = slug.trim();
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug.replace(['/', '\\'], "-")
    }
}

fn display_title(title: &str) -> String {
    let title = title.trim();
    if title.is_empty() {
        "Untitled".to_string()
    } else {
        title.to_string()
    }
}

fn document_text(record: &ExportRecord, slug: &str, title: &str, body: &str) -> String {
    let frontmatter = Frontmatter {
        title: title.to_string(),
        slug: slug.to_string(),
        kind: record.kind,
        date: date_part(&record.post_date),
        updated: date_part(&record.post_modified),
        wp_id: record.id,
        wp_link: record.link.clone(),
    };
    let mut text = frontmatter.render();
    if !body.is_empty() {
        text.push_str(body);
        text.push('\n');
    }
    text
}

fn attachment_record(
    record: &ExportRecord,
    images: &LocalImageIndex,
    config: &MigrateConfig,
) -> AttachmentRecord {
    let source = if record.attachment_url.is_empty() {
        &record.guid
    } else {
        &record.attachment_url
    };
    let basename = basename_from_url(source);
    let found = images.resolve(&basename);
    let images_dir_name = config
        .images_dir()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "images".to_string());
    AttachmentRecord {
        original_url: source.clone(),
        basename,
        local_match: found.is_some(),
        local_path: found.map(|m| format!("./{images_dir_name}/{}", m.file)),
    }
}
