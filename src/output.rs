//! CLI output formatting for the migrate, check and audit commands.
//!
//! Output is **content-first**: documents are listed by positional index and
//! title, with the file they were written to as an indented context line.
//! The menu is shown as a tree, one level of indentation per depth.
//!
//! # Output Format
//!
//! ## Migrate
//!
//! ```text
//! Pages
//! 001 About
//!     Output: pages/about.mdx
//!
//! Posts
//! 001 Hello
//!     Output: posts/hello.mdx
//!
//! Menu
//! 001 Home → /
//!     001 Team → /team
//! 002 Donate → https://donate.example (external)
//!
//! Data
//!     data/attachments.json (3 attachments, 2 matched)
//!     data/menu.json (3 items)
//!     MIGRATION_REPORT.md (1 missing image, 4 external links, 0 empty pages)
//! ```
//!
//! ## Audit
//!
//! ```text
//! Expected attachments: 12
//! Local images: 14
//! Documents scanned: 9
//! Referenced images: 11
//! Missing expected: 1
//!     gone-300x200.png
//! Broken references: 0
//! Unused images: 3
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::audit::AuditResult;
use crate::export::RecordKind;
use crate::migrate::{Migration, REPORT_FILE};
use crate::types::MenuItem;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 image`, `2 images`.
fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

fn walk_menu(items: &[MenuItem], depth: usize, lines: &mut Vec<String>) {
    for (i, item) in items.iter().enumerate() {
        let external = if item.external { " (external)" } else { "" };
        lines.push(format!(
            "{}{} {} → {}{}",
            indent(depth),
            format_index(i + 1),
            item.title,
            item.url,
            external
        ));
        walk_menu(&item.children, depth + 1, lines);
    }
}

fn count_menu(items: &[MenuItem]) -> usize {
    items.iter().map(|i| 1 + count_menu(&i.children)).sum()
}

// ============================================================================
// Migrate
// ============================================================================

/// Format the documents, menu and data files a migration wrote.
pub fn format_migrate_output(migration: &Migration) -> Vec<String> {
    let mut lines = Vec::new();

    for (heading, kind) in [("Pages", RecordKind::Page), ("Posts", RecordKind::Post)] {
        lines.push(heading.to_string());
        let docs = migration.documents.iter().filter(|d| d.kind == kind);
        for (i, doc) in docs.enumerate() {
            lines.push(format!("{} {}", format_index(i + 1), doc.title));
            lines.push(format!("    Output: {}", doc.path.display()));
        }
        lines.push(String::new());
    }

    if !migration.menu.items.is_empty() {
        lines.push("Menu".to_string());
        walk_menu(&migration.menu.items, 0, &mut lines);
        lines.push(String::new());
    }

    let matched = migration
        .attachments
        .iter()
        .filter(|a| a.local_match)
        .count();
    let report = &migration.report;
    lines.push("Data".to_string());
    lines.push(format!(
        "    data/attachments.json ({}, {} matched)",
        plural(migration.attachments.len(), "attachment"),
        matched
    ));
    lines.push(format!(
        "    data/menu.json ({})",
        plural(count_menu(&migration.menu.items), "item")
    ));
    lines.push(format!(
        "    {} ({}, {}, {})",
        REPORT_FILE,
        plural(migration.summary.missing_images, "missing image"),
        plural(report.external_links.len(), "external link"),
        plural(report.empty_pages.len(), "empty page")
    ));

    lines
}

pub fn print_migrate_output(migration: &Migration) {
    for line in format_migrate_output(migration) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format the inventory of an export and image directory without writing.
pub fn format_check_output(migration: &Migration) -> Vec<String> {
    let summary = &migration.summary;
    let matched = migration
        .attachments
        .iter()
        .filter(|a| a.local_match)
        .count();
    let mut lines = vec![
        "Export".to_string(),
        format!("    Pages: {}", summary.pages),
        format!("    Posts: {}", summary.posts),
        format!(
            "    Attachments: {} ({} matched locally)",
            summary.attachments, matched
        ),
        format!("    Menu items: {}", summary.nav_menu_items),
    ];
    if migration.unpublished > 0 {
        lines.push(format!(
            "    Skipped: {} unpublished",
            migration.unpublished
        ));
    }
    lines.push("Images".to_string());
    lines.push(format!("    Local files: {}", migration.local_images));
    lines.push(format!("    Missing references: {}", summary.missing_images));
    for (basename, refs) in migration.report.missing_by_basename() {
        lines.push(format!("        {} ({})", basename, plural(refs.len(), "reference")));
    }
    lines
}

pub fn print_check_output(migration: &Migration) {
    for line in format_check_output(migration) {
        println!("{}", line);
    }
}

// ============================================================================
// Audit
// ============================================================================

/// Format audit counts and every failing entry.
pub fn format_audit_output(result: &AuditResult) -> Vec<String> {
    let mut lines = vec![
        format!("Expected attachments: {}", result.expected),
        format!("Local images: {}", result.local_images),
        format!("Documents scanned: {}", result.documents),
        format!("Referenced images: {}", result.referenced),
        format!("Missing expected: {}", result.missing_expected.len()),
    ];
    for missing in &result.missing_expected {
        for original in &missing.originals {
            lines.push(format!("    {}", original));
        }
    }
    lines.push(format!(
        "Broken references: {}",
        result.broken_references.len()
    ));
    for broken in &result.broken_references {
        lines.push(format!("    {} → {}", broken.document, broken.reference));
    }
    lines.push(format!("Unused images: {}", result.unused.len()));
    lines
}

pub fn print_audit_output(result: &AuditResult) {
    for line in format_audit_output(result) {
        println!("{}", line);
    }
}

/// JSON failure counts, as printed to stderr when the audit fails.
pub fn format_audit_failure(result: &AuditResult) -> String {
    let counts = serde_json::json!({
        "missingExpected": result.missing_expected.len(),
        "brokenReferences": result.broken_references.len(),
    });
    serde_json::to_string_pretty(&counts).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{BrokenReference, MissingExpected};
    use crate::migrate::{Document, MigrationSummary};
    use crate::report::MigrationReport;
    use crate::types::{AttachmentRecord, MenuData};
    use std::path::PathBuf;

    fn item(title: &str, url: &str, external: bool, children: Vec<MenuItem>) -> MenuItem {
        MenuItem {
            title: title.into(),
            url: url.into(),
            external,
            children,
        }
    }

    fn document(kind: RecordKind, slug: &str, title: &str) -> Document {
        let dir = if kind == RecordKind::Page { "pages" } else { "posts" };
        Document {
            kind,
            slug: slug.into(),
            title: title.into(),
            path: PathBuf::from(dir).join(format!("{slug}.mdx")),
            text: String::new(),
        }
    }

    fn migration() -> Migration {
        let mut report = MigrationReport::default();
        report.record_missing_image("gone.jpg", "page:about", "https://x/gone.jpg");
        report.record_missing_image("gone.jpg", "post:hello", "https://x/gone.jpg");
        report.record_external_link("https://donate.example");
        Migration {
            documents: vec![
                document(RecordKind::Page, "about", "About"),
                document(RecordKind::Post, "hello", "Hello"),
            ],
            attachments: vec![
                AttachmentRecord {
                    original_url: "https://x/a.jpg".into(),
                    basename: "a.jpg".into(),
                    local_match: true,
                    local_path: Some("./images/a.jpg".into()),
                },
                AttachmentRecord {
                    original_url: "https://x/gone.jpg".into(),
                    basename: "gone.jpg".into(),
                    local_match: false,
                    local_path: None,
                },
            ],
            menu: MenuData {
                items: vec![
                    item("Home", "/", false, vec![item("Team", "/team", false, vec![])]),
                    item("Donate", "https://donate.example", true, vec![]),
                ],
            },
            report,
            summary: MigrationSummary {
                pages: 1,
                posts: 1,
                attachments: 2,
                nav_menu_items: 3,
                missing_images: 1,
            },
            unpublished: 2,
            local_images: 4,
        }
    }

    #[test]
    fn format_index_pads_to_three_digits() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn plural_handles_one() {
        assert_eq!(plural(1, "item"), "1 item");
        assert_eq!(plural(0, "item"), "0 items");
    }

    #[test]
    fn migrate_output_lists_documents_menu_and_data() {
        let lines = format_migrate_output(&migration());
        let expected_docs = vec![
            "Pages".to_string(),
            "001 About".to_string(),
            format!("    Output: {}", PathBuf::from("pages/about.mdx").display()),
            String::new(),
            "Posts".to_string(),
            "001 Hello".to_string(),
        ];
        assert_eq!(lines[..6], expected_docs[..]);
        assert!(lines.contains(&"001 Home → /".to_string()));
        assert!(lines.contains(&"    001 Team → /team".to_string()));
        assert!(lines.contains(&"002 Donate → https://donate.example (external)".to_string()));
        assert!(lines.contains(&"    data/attachments.json (2 attachments, 1 matched)".to_string()));
        assert!(lines.contains(&"    data/menu.json (3 items)".to_string()));
        assert_eq!(
            lines.last().unwrap(),
            "    MIGRATION_REPORT.md (1 missing image, 1 external link, 0 empty pages)"
        );
    }

    #[test]
    fn check_output_summarizes_inventory() {
        let lines = format_check_output(&migration());
        assert_eq!(
            lines,
            vec![
                "Export",
                "    Pages: 1",
                "    Posts: 1",
                "    Attachments: 2 (1 matched locally)",
                "    Menu items: 3",
                "    Skipped: 2 unpublished",
                "Images",
                "    Local files: 4",
                "    Missing references: 1",
                "        gone.jpg (2 references)",
            ]
        );
    }

    #[test]
    fn audit_output_lists_failures() {
        let result = AuditResult {
            expected: 3,
            local_images: 2,
            documents: 1,
            referenced: 1,
            missing_expected: vec![MissingExpected {
                key: "gone.png".into(),
                originals: vec!["gone-300x200.png".into()],
            }],
            broken_references: vec![BrokenReference {
                document: "pages/about.mdx".into(),
                reference: "/images/x.jpg".into(),
            }],
            unused: vec!["spare.gif".into()],
        };
        let lines = format_audit_output(&result);
        assert!(lines.contains(&"Missing expected: 1".to_string()));
        assert!(lines.contains(&"    gone-300x200.png".to_string()));
        assert!(lines.contains(&"    pages/about.mdx → /images/x.jpg".to_string()));
        assert_eq!(lines.last().unwrap(), "Unused images: 1");

        let json: serde_json::Value =
            serde_json::from_str(&format_audit_failure(&result)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"missingExpected": 1, "brokenReferences": 1})
        );
    }
}
