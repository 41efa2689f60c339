//! Navigation tree reconstruction.
//!
//! WordPress stores a menu as flat `nav_menu_item` records linked by
//! `_menu_item_menu_item_parent`. The tree is rebuilt by grouping on parent
//! id and sorting each sibling group by `(menu_order, id)`, so the result
//! never depends on the order records appear in the export.
//!
//! Records whose parent id does not exist are never reached from the root
//! and are dropped. A parent chain that loops back on itself is cut where
//! it revisits an ancestor.

use crate::config::SiteConfig;
use crate::export::ExportRecord;
use crate::types::MenuItem;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

static EXTERNAL_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:https?://|mailto:|tel:)").expect("valid regex"));

const ROOT: u64 = 0;

/// A migrated page or post a menu entry may point at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    pub slug: String,
    pub title: String,
}

/// Migrated pages and posts by WordPress id.
#[derive(Debug, Clone, Default)]
pub struct MenuTargets {
    pub pages: BTreeMap<u64, LinkTarget>,
    pub posts: BTreeMap<u64, LinkTarget>,
}

/// Whether a resolved menu URL leaves the site.
pub fn is_external_url(url: &str) -> bool {
    EXTERNAL_URL.is_match(url)
}

/// Build the ordered menu forest from flat nav records.
pub fn build_menu(
    nav_items: &[ExportRecord],
    targets: &MenuTargets,
    site: &SiteConfig,
) -> Vec<MenuItem> {
    let mut by_parent: BTreeMap<u64, Vec<&ExportRecord>> = BTreeMap::new();
    for record in nav_items {
        by_parent
            .entry(record.meta_id("_menu_item_menu_item_parent"))
            .or_default()
            .push(record);
    }
    for siblings in by_parent.values_mut() {
        siblings.sort_by_key(|r| (r.menu_order, r.id));
    }

    let builder = Builder {
        by_parent,
        targets,
        site,
    };
    builder.children(ROOT, &mut BTreeSet::new())
}

struct Builder<'a> {
    by_parent: BTreeMap<u64, Vec<&'a ExportRecord>>,
    targets: &'a MenuTargets,
    site: &'a SiteConfig,
}

impl Builder<'_> {
    fn children(&self, parent: u64, ancestors: &mut BTreeSet<u64>) -> Vec<MenuItem> {
        let Some(siblings) = self.by_parent.get(&parent) else {
            return Vec::new();
        };
        let mut items = Vec::with_capacity(siblings.len());
        for record in siblings {
            if !ancestors.insert(record.id) {
                continue;
            }
            let url = self.resolve_url(record);
            items.push(MenuItem {
                title: self.title(record),
                external: is_external_url(&url),
                url,
                children: self.children(record.id, ancestors),
            });
            ancestors.remove(&record.id);
        }
        items
    }

    fn target(&self, record: &ExportRecord) -> Option<(&LinkTarget, bool)> {
        if record.meta("_menu_item_type") != "post_type" {
            return None;
        }
        let object_id = record.meta_id("_menu_item_object_id");
        match record.meta("_menu_item_object") {
            "page" => self.targets.pages.get(&object_id).map(|t| (t, true)),
            "post" => self.targets.posts.get(&object_id).map(|t| (t, false)),
            _ => None,
        }
    }

    fn resolve_url(&self, record: &ExportRecord) -> String {
        match self.target(record) {
            Some((page, true)) if page.slug == self.site.home_slug => "/".to_string(),
            Some((page, true)) => format!("/{}", page.slug),
            Some((post, false)) => self.site.post_url(&post.slug),
            None => record.meta("_menu_item_url").to_string(),
        }
    }

    fn title(&self, record: &ExportRecord) -> String {
        let title = record.title.trim();
        if !title.is_empty() {
            return title.to_string();
        }
        if let Some((target, _)) = self.target(record)
            && !target.title.trim().is_empty()
        {
            return target.title.trim().to_string();
        }
        if !record.slug.trim().is_empty() {
            return record.slug.trim().to_string();
        }
        "Untitled".to_string()
    }
}
