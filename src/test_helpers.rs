//! Shared test utilities for the wp2mdx test suite.
//!
//! Builds small WXR documents and image directories so each module can
//! exercise its stage without a real WordPress export.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let xml = wxr(&[
//!     page_item(10, "about", "About", "publish", "<p>Hi</p>"),
//!     attachment_item(30, "https://site.test/wp-content/uploads/2024/a.jpg"),
//! ]);
//! let images = image_dir(&["a.jpg"]);
//! ```

use std::collections::BTreeMap;
use std::fs;
use tempfile::TempDir;

use crate::export::{ExportRecord, RecordKind};
use crate::scan::LocalImageIndex;

// =========================================================================
// WXR builders
// =========================================================================

/// Wrap item snippets in an `rss/channel` envelope.
pub fn wxr(items: &[String]) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n\
         <rss version=\"2.0\"\n  \
         xmlns:content=\"http://purl.org/rss/1.0/modules/content/\"\n  \
         xmlns:wp=\"http://wordpress.org/export/1.2/\">\n\
         <channel>\n<title>Test Site</title>\n{}\n</channel>\n</rss>\n",
        items.join("\n")
    )
}

/// An `<item>` with the given fields; titles and bodies go in CDATA.
pub fn item_xml(fields: &[(&str, &str)]) -> String {
    let mut out = String::from("<item>\n");
    for (name, value) in fields {
        if matches!(*name, "title" | "content:encoded" | "wp:post_name" | "wp:status") {
            out.push_str(&format!("  <{name}><![CDATA[{value}]]></{name}>\n"));
        } else {
            out.push_str(&format!("  <{name}>{}</{name}>\n", xml_escape(value)));
        }
    }
    out.push_str("</item>");
    out
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn content_item(
    post_type: &str,
    id: u64,
    slug: &str,
    title: &str,
    status: &str,
    html: &str,
) -> String {
    let id = id.to_string();
    let link = format!("https://site.test/{slug}/");
    item_xml(&[
        ("title", title),
        ("link", &link),
        ("content:encoded", html),
        ("wp:post_id", &id),
        ("wp:post_date", "2024-01-02 03:04:05"),
        ("wp:post_modified", "2024-05-06 07:08:09"),
        ("wp:post_name", slug),
        ("wp:status", status),
        ("wp:post_type", post_type),
    ])
}

pub fn page_item(id: u64, slug: &str, title: &str, status: &str, html: &str) -> String {
    content_item("page", id, slug, title, status, html)
}

pub fn post_item(id: u64, slug: &str, title: &str, status: &str, html: &str) -> String {
    content_item("post", id, slug, title, status, html)
}

pub fn attachment_item(id: u64, url: &str) -> String {
    let id = id.to_string();
    item_xml(&[
        ("title", "attachment"),
        ("guid", url),
        ("wp:post_id", &id),
        ("wp:status", "inherit"),
        ("wp:post_type", "attachment"),
        ("wp:attachment_url", url),
    ])
}

/// A nav menu item; `parent` and `order` become the usual postmeta/menu_order.
pub fn nav_item(id: u64, parent: u64, order: i64, meta: &[(&str, &str)]) -> String {
    let id_s = id.to_string();
    let order_s = order.to_string();
    let parent_s = parent.to_string();
    let mut xml = item_xml(&[
        ("title", ""),
        ("wp:post_id", &id_s),
        ("wp:menu_order", &order_s),
        ("wp:status", "publish"),
        ("wp:post_type", "nav_menu_item"),
    ]);
    let mut metas = vec![("_menu_item_menu_item_parent", parent_s.as_str())];
    metas.extend_from_slice(meta);
    let mut block = String::new();
    for (key, value) in metas {
        block.push_str(&format!(
            "  <wp:postmeta>\n    <wp:meta_key><![CDATA[{key}]]></wp:meta_key>\n    \
             <wp:meta_value><![CDATA[{value}]]></wp:meta_value>\n  </wp:postmeta>\n"
        ));
    }
    xml.insert_str(xml.len() - "</item>".len(), &block);
    xml
}

// =========================================================================
// Record builders
// =========================================================================

/// A nav menu record built directly, bypassing XML.
pub fn nav_record(
    id: u64,
    parent: u64,
    order: i64,
    title: &str,
    meta: &[(&str, &str)],
) -> ExportRecord {
    let mut map: BTreeMap<String, String> = meta
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    map.insert(
        "_menu_item_menu_item_parent".to_string(),
        parent.to_string(),
    );
    ExportRecord {
        kind: RecordKind::NavMenuItem,
        id,
        title: title.to_string(),
        content: String::new(),
        post_date: String::new(),
        post_modified: String::new(),
        status: "publish".to_string(),
        slug: id.to_string(),
        link: String::new(),
        guid: String::new(),
        attachment_url: String::new(),
        menu_order: order,
        meta: map,
    }
}

/// A custom-link nav record.
pub fn custom_link(id: u64, parent: u64, order: i64, title: &str, url: &str) -> ExportRecord {
    nav_record(
        id,
        parent,
        order,
        title,
        &[("_menu_item_type", "custom"), ("_menu_item_url", url)],
    )
}

// =========================================================================
// Image fixtures
// =========================================================================

/// A temp directory holding placeholder files with the given names.
pub fn image_dir(names: &[&str]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for name in names {
        fs::write(tmp.path().join(name), "fake image").unwrap();
    }
    tmp
}

/// An in-memory index over the given names.
pub fn index(names: &[&str]) -> LocalImageIndex {
    LocalImageIndex::from_filenames(names.iter().copied())
}
