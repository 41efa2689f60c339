//! Output shapes shared with the site's rendering layer.
//!
//! The rendering layer reads `content/data/*.json` and the frontmatter of
//! each `.mdx` document, so field names here are part of that contract
//! (camelCase in JSON, as the renderer expects).

use crate::export::RecordKind;
use serde::{Deserialize, Serialize};

/// Navigation tree item.
///
/// `external` marks links leaving the site (absolute HTTP(S), `mailto:`,
/// `tel:`) and is omitted from JSON when false. `children` is always
/// present, empty for leaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub external: bool,
    #[serde(default)]
    pub children: Vec<MenuItem>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Top-level shape of `menu.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuData {
    pub items: Vec<MenuItem>,
}

/// One entry of `attachments.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRecord {
    pub original_url: String,
    pub basename: String,
    pub local_match: bool,
    /// `./<images dir>/<file>` when matched.
    pub local_path: Option<String>,
}

/// Frontmatter block at the top of every content document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frontmatter {
    pub title: String,
    pub slug: String,
    pub kind: RecordKind,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `YYYY-MM-DD`
    pub updated: String,
    pub wp_id: u64,
    pub wp_link: String,
}

impl Frontmatter {
    /// Render as a `---` delimited block, ending with a newline.
    pub fn render(&self) -> String {
        [
            "---".to_string(),
            format!("title: \"{}\"", escape_value(&self.title)),
            format!("slug: \"{}\"", escape_value(&self.slug)),
            format!("type: \"{}\"", self.kind.label()),
            format!("date: \"{}\"", escape_value(&self.date)),
            format!("updated: \"{}\"", escape_value(&self.updated)),
            format!("wpId: {}", self.wp_id),
            format!("wpLink: \"{}\"", escape_value(&self.wp_link)),
            "---".to_string(),
            String::new(),
        ]
        .join("\n")
    }
}

fn escape_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// First ten characters of a WordPress timestamp (`2024-01-02 03:04:05`).
pub fn date_part(timestamp: &str) -> String {
    timestamp.chars().take(10).collect()
}
