//! HTML cleanup and media rewriting for one page or post body.
//!
//! WordPress bodies carry page-builder markup, inline styles, lazy-loading
//! attributes and absolute links into `/wp-content/uploads/`. Before
//! conversion to MDX each body goes through these passes, in order:
//!
//! 1. Drop non-content elements (`style`, `script`, `noscript`, form
//!    controls, `wbr`).
//! 2. Drop `style`, `class` and `id` attributes everywhere.
//! 3. Point `<img>` sources (and each `srcset` entry) at local media.
//! 4. Collect off-site links; point upload links at local media.
//! 5. Drop paragraphs with no text and no embedded media.
//! 6. Serialize and self-close void tags for MDX.
//!
//! Unresolvable upload references are left as they were and recorded in
//! the [`MigrationReport`]; a body never fails to rewrite.

use crate::config::SiteConfig;
use crate::dom;
use crate::export::RecordKind;
use crate::markdown;
use crate::report::MigrationReport;
use crate::scan::{LocalImageIndex, basename_from_url};
use markup5ever_rcdom::Handle;
use regex::Regex;
use std::sync::LazyLock;

const REMOVED_TAGS: &[&str] = &[
    "style", "script", "noscript", "form", "input", "textarea", "select", "button", "wbr",
];
const STRIPPED_ATTRS: &[&str] = &["style", "class", "id"];
const LAZY_SRC_ATTRS: &[&str] = &["data-src", "data-lazy-src", "data-original"];
const MEDIA_TAGS: &[&str] = &["img", "iframe", "video", "audio"];

static ABSOLUTE_HTTP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^https?://").expect("valid regex"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// Where a body comes from, for report locations.
#[derive(Debug, Clone, Copy)]
pub struct DocContext<'a> {
    pub kind: RecordKind,
    pub slug: &'a str,
}

impl DocContext<'_> {
    /// `kind:slug`, as listed in reports.
    pub fn location(&self) -> String {
        format!("{}:{}", self.kind.label(), self.slug)
    }
}

/// Everything a rewrite pass reads from and writes to.
pub struct Rewriter<'a> {
    pub images: &'a LocalImageIndex,
    pub site: &'a SiteConfig,
    pub report: &'a mut MigrationReport,
}

impl Rewriter<'_> {
    /// Rewrite a raw HTML body into an MDX body.
    pub fn rewrite_body(&mut self, html: &str, ctx: &DocContext) -> String {
        let sanitized = self.sanitize_html(html, ctx);
        markdown::html_to_markdown(&sanitized)
    }

    /// Passes 1-6: cleaned HTML with self-closed void tags.
    pub fn sanitize_html(&mut self, html: &str, ctx: &DocContext) -> String {
        let fragment = dom::Fragment::parse(html);
        let body = fragment.body();

        dom::retain_descendants(&body, &|node| {
            !dom::tag_name(node).is_some_and(|t| REMOVED_TAGS.contains(&t))
        });
        for element in dom::descendants_where(&body, &|_| true) {
            dom::remove_attrs(&element, STRIPPED_ATTRS);
        }

        let location = ctx.location();
        for img in dom::descendants_where(&body, &|t| t == "img") {
            self.rewrite_img(&img, &location);
        }
        for link in dom::descendants_where(&body, &|t| t == "a") {
            self.rewrite_link(&link, &location);
        }

        dom::retain_descendants(&body, &|node| {
            dom::tag_name(node) != Some("p") || has_content(node)
        });

        dom::self_close_void_tags(dom::inner_html(&body).trim())
    }

    fn rewrite_img(&mut self, img: &Handle, location: &str) {
        let src = dom::attr(img, "src").unwrap_or_default();
        let lazy = LAZY_SRC_ATTRS
            .iter()
            .filter_map(|name| dom::attr(img, name))
            .find(|v| !v.is_empty())
            .unwrap_or_default();

        let resolved = self
            .resolve_upload(&src, location)
            .or_else(|| self.resolve_upload(&lazy, location));
        if let Some(path) = resolved {
            dom::set_attr(img, "src", &path);
            dom::remove_attrs(img, LAZY_SRC_ATTRS);
        }

        if let Some(srcset) = dom::attr(img, "srcset") {
            let rewritten: Vec<String> = srcset
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| {
                    let mut pieces = part.split_whitespace();
                    let url = pieces.next().unwrap_or_default();
                    let next = self
                        .resolve_upload(url, location)
                        .unwrap_or_else(|| url.to_string());
                    match pieces.next() {
                        Some(descriptor) => format!("{next} {descriptor}"),
                        None => next,
                    }
                })
                .collect();
            dom::set_attr(img, "srcset", &rewritten.join(", "));
        }
    }

    fn rewrite_link(&mut self, link: &Handle, location: &str) {
        let Some(href) = dom::attr(link, "href") else {
            return;
        };
        if self.is_external(&href) {
            self.report.record_external_link(&href);
        }
        if let Some(path) = self.resolve_upload(&href, location) {
            dom::set_attr(link, "href", &path);
        }
    }

    /// Local media path for an upload URL.
    ///
    /// Returns `None` for empty or non-upload URLs, and for upload URLs
    /// with no local match, which are recorded as missing.
    fn resolve_upload(&mut self, raw: &str, location: &str) -> Option<String> {
        if raw.is_empty() || !self.is_upload(raw) {
            return None;
        }
        let basename = basename_from_url(raw);
        match self.images.resolve(&basename) {
            Some(found) => Some(self.site.media_path(&found.file)),
            None => {
                self.report.record_missing_image(&basename, location, raw);
                None
            }
        }
    }

    fn is_upload(&self, url: &str) -> bool {
        url.to_lowercase()
            .contains(&self.site.uploads_marker.to_lowercase())
    }

    fn is_external(&self, href: &str) -> bool {
        ABSOLUTE_HTTP.is_match(href)
            && !href
                .to_lowercase()
                .contains(&self.site.domain.to_lowercase())
    }
}

/// A paragraph is worth keeping if it has visible text or embedded media.
fn has_content(node: &Handle) -> bool {
    !dom::text_content(node).trim().is_empty()
        || !dom::descendants_where(node, &|t| MEDIA_TAGS.contains(&t)).is_empty()
}

/// Whether a converted body has no text once markup is stripped.
pub fn is_empty_body(body: &str) -> bool {
    TAG.replace_all(body, "").trim().is_empty()
}
