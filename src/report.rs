//! Migration report accumulation and rendering.
//!
//! Nothing that goes wrong inside a single document stops the migration.
//! Unresolved images, off-site links and empty pages are collected in a
//! [`MigrationReport`] while documents are rewritten, then rendered once as
//! `MIGRATION_REPORT.md` at the end of the run. Every listing is sorted so
//! identical inputs produce an identical report.

use std::collections::{BTreeMap, BTreeSet};

/// An image reference that matched no local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingImage {
    pub basename: String,
    /// Referring document as `kind:slug`.
    pub location: String,
    /// The reference exactly as it appeared.
    pub original: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyPage {
    pub slug: String,
    pub title: String,
}

#[derive(Debug, Clone, Default)]
pub struct MigrationReport {
    pub pages: usize,
    pub posts: usize,
    pub attachments: usize,
    pub nav_items: usize,
    pub page_slugs: Vec<String>,
    pub post_slugs: Vec<String>,
    pub external_links: BTreeSet<String>,
    pub missing_images: Vec<MissingImage>,
    pub empty_pages: Vec<EmptyPage>,
}

impl MigrationReport {
    pub fn record_external_link(&mut self, href: &str) {
        self.external_links.insert(href.to_string());
    }

    pub fn record_missing_image(&mut self, basename: &str, location: &str, original: &str) {
        self.missing_images.push(MissingImage {
            basename: basename.to_string(),
            location: location.to_string(),
            original: original.to_string(),
        });
    }

    /// Missing images keyed by basename, referrers in discovery order.
    pub fn missing_by_basename(&self) -> BTreeMap<&str, Vec<&MissingImage>> {
        let mut grouped: BTreeMap<&str, Vec<&MissingImage>> = BTreeMap::new();
        for missing in &self.missing_images {
            grouped.entry(&missing.basename).or_default().push(missing);
        }
        grouped
    }

    /// Render as Markdown. `post_route` prefixes post slugs (`/blog`).
    pub fn render(&self, post_route: &str) -> String {
        let mut lines: Vec<String> = vec![
            "# WordPress → MDX Migration Report".into(),
            String::new(),
            format!("- **Pages migrated**: {}", self.pages),
            format!("- **Posts migrated**: {}", self.posts),
            format!("- **Attachments found**: {}", self.attachments),
            format!("- **Menu items found**: {}", self.nav_items),
            String::new(),
            "## Slugs created".into(),
            String::new(),
            "### Pages".into(),
            String::new(),
        ];
        for slug in sorted(&self.page_slugs) {
            lines.push(format!("- `/{slug}`"));
        }
        lines.push(String::new());
        lines.push("### Posts".into());
        lines.push(String::new());
        let route = post_route.trim_end_matches('/');
        for slug in sorted(&self.post_slugs) {
            lines.push(format!("- `{route}/{slug}`"));
        }
        lines.push(String::new());

        lines.push("## External links discovered".into());
        lines.push(String::new());
        for url in &self.external_links {
            lines.push(format!("- {url}"));
        }
        lines.push(String::new());

        lines.push("## Missing images".into());
        lines.push(String::new());
        let grouped = self.missing_by_basename();
        if grouped.is_empty() {
            lines.push("None".into());
        } else {
            for (basename, refs) in grouped {
                lines.push(format!("- **{basename}**"));
                for r in refs {
                    lines.push(format!("  - {}: {}", r.location, r.original));
                }
            }
        }
        lines.push(String::new());

        lines.push("## Pages with empty content".into());
        lines.push(String::new());
        if self.empty_pages.is_empty() {
            lines.push("None".into());
        } else {
            for page in &self.empty_pages {
                lines.push(format!("- `{}` — {}", page.slug, page.title));
            }
        }
        lines.push(String::new());

        lines.join("\n") + "\n"
    }
}

fn sorted(items: &[String]) -> Vec<&str> {
    let mut out: Vec<&str> = items.iter().map(String::as_str).collect();
    out.sort_unstable();
    out
}
