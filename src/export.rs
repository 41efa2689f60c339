//! WordPress export (WXR) reading.
//!
//! A WXR file is an RSS document whose `rss/channel/item` elements carry
//! every post type the site ever stored. Only four are migrated:
//!
//! | `wp:post_type`  | Kept when            | Becomes                       |
//! |-----------------|----------------------|-------------------------------|
//! | `page`          | `wp:status = publish`| [`RecordKind::Page`]          |
//! | `post`          | `wp:status = publish`| [`RecordKind::Post`]          |
//! | `attachment`    | always               | [`RecordKind::Attachment`]    |
//! | `nav_menu_item` | always               | [`RecordKind::NavMenuItem`]   |
//!
//! ## Text Extraction
//!
//! Exporters mix `<![CDATA[...]]>` sections, escaped text, and stray
//! whitespace inside the same field. Every field goes through one rule:
//! CDATA content when the element has any, otherwise its unescaped text,
//! otherwise the empty string. Downstream code only ever sees `String`s.
//!
//! Repeated `wp:postmeta` blocks are flattened into a key → value map per
//! item; the last value for a key wins and empty keys are dropped.

use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Export file not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML error at byte {position}: {source}")]
    Xml {
        position: u64,
        source: quick_xml::Error,
    },
    #[error("Not a WordPress export: no rss/channel element")]
    MissingChannel,
}

/// Post types the migration understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Page,
    Post,
    Attachment,
    NavMenuItem,
}

impl RecordKind {
    fn from_post_type(post_type: &str) -> Option<Self> {
        match post_type {
            "page" => Some(Self::Page),
            "post" => Some(Self::Post),
            "attachment" => Some(Self::Attachment),
            "nav_menu_item" => Some(Self::NavMenuItem),
            _ => None,
        }
    }

    /// Short label used in report locations (`page:about`).
    pub fn label(self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Post => "post",
            Self::Attachment => "attachment",
            Self::NavMenuItem => "nav_menu_item",
        }
    }
}

/// One parsed `<item>`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRecord {
    pub kind: RecordKind,
    pub id: u64,
    pub title: String,
    /// Raw HTML body (`content:encoded`).
    pub content: String,
    pub post_date: String,
    pub post_modified: String,
    pub status: String,
    /// `wp:post_name`, possibly empty.
    pub slug: String,
    pub link: String,
    pub guid: String,
    pub attachment_url: String,
    pub menu_order: i64,
    /// Flattened `wp:postmeta` pairs.
    pub meta: BTreeMap<String, String>,
}

impl ExportRecord {
    pub fn meta(&self, key: &str) -> &str {
        self.meta.get(key).map(String::as_str).unwrap_or_default()
    }

    /// Numeric meta value, 0 when absent or malformed.
    pub fn meta_id(&self, key: &str) -> u64 {
        self.meta(key).trim().parse().unwrap_or(0)
    }
}

/// All migratable records of one export, in document order per kind.
#[derive(Debug, Clone, Default)]
pub struct Export {
    pub pages: Vec<ExportRecord>,
    pub posts: Vec<ExportRecord>,
    pub attachments: Vec<ExportRecord>,
    pub nav_items: Vec<ExportRecord>,
    /// Pages and posts dropped for not being published.
    pub unpublished: usize,
}

/// Read and parse an export file.
pub fn read_export(path: &Path) -> Result<Export, ExportError> {
    if !path.is_file() {
        return Err(ExportError::NotFound(path.to_path_buf()));
    }
    let xml = fs::read_to_string(path)?;
    parse_export(&xml)
}

/// Parse export XML held in memory.
pub fn parse_export(xml: &str) -> Result<Export, ExportError> {
    let items = parse_items(xml)?;
    let mut export = Export::default();
    for item in items {
        let Some(kind) = RecordKind::from_post_type(item.field("wp:post_type")) else {
            continue;
        };
        let record = item.into_record(kind);
        match kind {
            RecordKind::Page | RecordKind::Post if record.status != "publish" => {
                export.unpublished += 1;
            }
            RecordKind::Page => export.pages.push(record),
            RecordKind::Post => export.posts.push(record),
            RecordKind::Attachment => export.attachments.push(record),
            RecordKind::NavMenuItem => export.nav_items.push(record),
        }
    }
    Ok(export)
}

/// Field values of one item before typing.
#[derive(Debug, Default)]
struct RawItem {
    fields: BTreeMap<String, String>,
    meta: BTreeMap<String, String>,
}

impl RawItem {
    fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or_default()
    }

    fn into_record(self, kind: RecordKind) -> ExportRecord {
        ExportRecord {
            kind,
            id: self.field("wp:post_id").trim().parse().unwrap_or(0),
            title: self.field("title").to_string(),
            content: self.field("content:encoded").to_string(),
            post_date: self.field("wp:post_date").to_string(),
            post_modified: self.field("wp:post_modified").to_string(),
            status: self.field("wp:status").to_string(),
            slug: self.field("wp:post_name").to_string(),
            link: self.field("link").to_string(),
            guid: self.field("guid").to_string(),
            attachment_url: self.field("wp:attachment_url").to_string(),
            menu_order: self.field("wp:menu_order").trim().parse().unwrap_or(0),
            meta: self.meta,
        }
    }
}

/// Text collected for the element currently being read.
#[derive(Debug, Default)]
struct Capture {
    text: String,
    cdata: Option<String>,
}

impl Capture {
    fn finish(self) -> String {
        self.cdata.unwrap_or(self.text)
    }
}

const POSTMETA: &str = "wp:postmeta";

fn parse_items(xml: &str) -> Result<Vec<RawItem>, ExportError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<String> = Vec::new();
    let mut items = Vec::new();
    let mut seen_channel = false;

    let mut item: Option<RawItem> = None;
    let mut item_depth = 0;
    let mut capture: Option<Capture> = None;
    let mut meta_key = String::new();
    let mut meta_value = String::new();

    loop {
        let event = reader.read_event().map_err(|source| ExportError::Xml {
            position: reader.buffer_position() as u64,
            source,
        })?;
        match event {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if name == "channel" && stack.last().is_some_and(|p| p == "rss") {
                    seen_channel = true;
                }
                if item.is_none() && name == "item" && stack.last().is_some_and(|p| p == "channel")
                {
                    item = Some(RawItem::default());
                    item_depth = stack.len() + 1;
                } else if item.is_some()
                    && capture.is_none()
                    && name != POSTMETA
                    && is_field(&stack, item_depth)
                {
                    capture = Some(Capture::default());
                }
                stack.push(name);
            }
            Event::Empty(e) => {
                if let Some(current) = item.as_mut()
                    && capture.is_none()
                    && stack.len() == item_depth
                {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    current.fields.entry(name).or_default();
                }
            }
            Event::Text(e) => {
                if let Some(cap) = capture.as_mut() {
                    match e.unescape() {
                        Ok(text) => cap.text.push_str(&text),
                        Err(_) => cap.text.push_str(&String::from_utf8_lossy(&e)),
                    }
                }
            }
            Event::CData(e) => {
                if let Some(cap) = capture.as_mut() {
                    cap.cdata
                        .get_or_insert_with(String::new)
                        .push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::End(_) => {
                let Some(name) = stack.pop() else { continue };
                let depth = stack.len();
                if item.is_some() && depth + 1 == item_depth {
                    // </item>
                    items.extend(item.take());
                    continue;
                }
                let Some(current) = item.as_mut() else { continue };

                if depth == item_depth + 1 && stack.last().is_some_and(|p| p == POSTMETA) {
                    let text = capture.take().map(Capture::finish).unwrap_or_default();
                    match name.as_str() {
                        "wp:meta_key" => meta_key = text,
                        "wp:meta_value" => meta_value = text,
                        _ => {}
                    }
                } else if depth == item_depth {
                    if name == POSTMETA {
                        let key = std::mem::take(&mut meta_key);
                        let value = std::mem::take(&mut meta_value);
                        if !key.is_empty() {
                            current.meta.insert(key, value);
                        }
                    } else {
                        let text = capture.take().map(Capture::finish).unwrap_or_default();
                        // First occurrence wins for repeated fields like <category>
                        current.fields.entry(name).or_insert(text);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_channel {
        return Err(ExportError::MissingChannel);
    }
    Ok(items)
}

/// Whether the element about to be opened is a text field of the item:
/// a direct child of `<item>` (other than `wp:postmeta`), or a direct
/// child of `wp:postmeta`.
fn is_field(stack: &[String], item_depth: usize) -> bool {
    match stack.len() {
        d if d == item_depth => true,
        d if d == item_depth + 1 => stack.last().is_some_and(|p| p == POSTMETA),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    #[test]
    fn classifies_items_by_post_type() {
        let xml = wxr(&[
            page_item(10, "about", "About", "publish", "<p>Hi</p>"),
            post_item(20, "first-post", "First", "publish", "<p>Post</p>"),
            attachment_item(30, "https://site.test/wp-content/uploads/2024/a.jpg"),
            nav_item(40, 0, 1, &[("_menu_item_type", "custom")]),
        ]);
        let export = parse_export(&xml).unwrap();
        assert_eq!(export.pages.len(), 1);
        assert_eq!(export.posts.len(), 1);
        assert_eq!(export.attachments.len(), 1);
        assert_eq!(export.nav_items.len(), 1);

        let page = &export.pages[0];
        assert_eq!(page.kind, RecordKind::Page);
        assert_eq!(page.id, 10);
        assert_eq!(page.slug, "about");
        assert_eq!(page.title, "About");
        assert_eq!(page.content, "<p>Hi</p>");
        assert_eq!(page.post_date, "2024-01-02 03:04:05");
    }

    #[test]
    fn drafts_and_trash_are_excluded() {
        let xml = wxr(&[
            page_item(1, "live", "Live", "publish", ""),
            page_item(2, "wip", "WIP", "draft", ""),
            post_item(3, "gone", "Gone", "trash", ""),
        ]);
        let export = parse_export(&xml).unwrap();
        let slugs: Vec<&str> = export.pages.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["live"]);
        assert!(export.posts.is_empty());
        assert_eq!(export.unpublished, 2);
    }

    #[test]
    fn unknown_post_types_are_ignored() {
        let xml = wxr(&[item_xml(&[
            ("wp:post_id", "5"),
            ("wp:post_type", "wp_global_styles"),
            ("wp:status", "publish"),
        ])]);
        let export = parse_export(&xml).unwrap();
        assert!(export.pages.is_empty() && export.posts.is_empty());
        assert_eq!(export.unpublished, 0);
    }

    #[test]
    fn postmeta_is_flattened() {
        let xml = wxr(&[nav_item(
            7,
            3,
            2,
            &[
                ("_menu_item_type", "post_type"),
                ("_menu_item_object", "page"),
                ("_menu_item_object_id", "10"),
                ("", "dropped"),
            ],
        )]);
        let export = parse_export(&xml).unwrap();
        let nav = &export.nav_items[0];
        assert_eq!(nav.meta("_menu_item_type"), "post_type");
        assert_eq!(nav.meta("_menu_item_object"), "page");
        assert_eq!(nav.meta_id("_menu_item_object_id"), 10);
        assert_eq!(nav.meta_id("_menu_item_menu_item_parent"), 3);
        assert_eq!(nav.menu_order, 2);
        assert!(!nav.meta.contains_key(""));
    }

    #[test]
    fn cdata_is_preferred_over_text() {
        let xml = wxr(&[
            "<item>\n  <title>  <![CDATA[Cdata Title]]>  </title>\n  \
             <wp:post_type>page</wp:post_type>\n  <wp:status><![CDATA[publish]]></wp:status>\n  \
             <wp:post_name>plain &amp; simple</wp:post_name>\n</item>"
                .to_string(),
        ]);
        let export = parse_export(&xml).unwrap();
        assert_eq!(export.pages[0].title, "Cdata Title");
        assert_eq!(export.pages[0].slug, "plain & simple");
    }

    #[test]
    fn missing_fields_are_empty() {
        let xml = wxr(&[item_xml(&[
            ("wp:post_type", "page"),
            ("wp:status", "publish"),
        ])]);
        let export = parse_export(&xml).unwrap();
        let page = &export.pages[0];
        assert_eq!(page.id, 0);
        assert_eq!(page.slug, "");
        assert_eq!(page.content, "");
    }

    #[test]
    fn self_closing_fields_are_empty() {
        let xml = wxr(&["<item><wp:post_type>page</wp:post_type>\
             <wp:status>publish</wp:status><wp:post_name/></item>"
            .to_string()]);
        let export = parse_export(&xml).unwrap();
        assert_eq!(export.pages[0].slug, "");
    }

    #[test]
    fn non_export_xml_is_error() {
        let result = parse_export("<html><body/></html>");
        assert!(matches!(result, Err(ExportError::MissingChannel)));
    }

    #[test]
    fn malformed_xml_is_error() {
        let result = parse_export("<rss><channel><item></channel></rss>");
        assert!(matches!(result, Err(ExportError::Xml { .. })));
    }

    #[test]
    fn missing_file_is_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let result = read_export(&tmp.path().join("export.xml"));
        assert!(matches!(result, Err(ExportError::NotFound(_))));
    }
}
