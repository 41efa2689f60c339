//! HTML to MDX-flavoured Markdown.
//!
//! Works on sanitized HTML (see [`crate::rewrite`]) in three stages:
//!
//! 1. **Verbatim extraction**: `<blockquote>`, `<iframe>`, `<video>` and
//!    `<audio>` are cut out as literal HTML with void tags self-closed, and
//!    tables are rendered as GFM pipe tables. Each is replaced by a marker.
//! 2. **htmd conversion** with custom element handlers: `<img>` becomes
//!    `![alt](src)` with the already rewritten source, `<figure>` becomes
//!    the image followed by an `_caption_` line, and `<del>`/`<s>` become
//!    `~~text~~`.
//! 3. **MDX pass**: outside code, `{`, `}` and `<` are escaped so prose never
//!    opens a JSX expression or tag. Markers are swapped back for their
//!    blocks and blank runs collapse to a single blank line.

use crate::dom;
use htmd::options::{BulletListMarker, CodeBlockStyle, HeadingStyle, Options};
use htmd::{Element, HtmlToMarkdown};
use markup5ever_rcdom::Handle;
use regex::Regex;
use std::sync::LazyLock;

const LITERAL_TAGS: &[&str] = &["blockquote", "iframe", "video", "audio"];
const SKIPPED_TAGS: &[&str] = &["head", "title", "meta", "link", "template"];
const VERBATIM_MARKER: &str = "MDXVERBATIM";

static VERBATIM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"[ \t]*{VERBATIM_MARKER}(\d+)X[ \t]*")).expect("valid regex")
});
static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n){2,}").expect("valid regex"));
static LIST_MARKER_GAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*(?:[-*+]|\d+\.)) {2,}").expect("valid regex"));

/// Convert sanitized HTML into a trimmed Markdown body.
pub fn html_to_markdown(html: &str) -> String {
    let fragment = dom::Fragment::parse(html);
    let body = fragment.body();
    clamp_list_starts(&body);
    let verbatim = extract_verbatim(&body);

    let converted = converter()
        .convert(&dom::inner_html(&body))
        .unwrap_or_else(|_| dom::text_content(&body));
    let escaped = escape_mdx(&converted);
    let restored = VERBATIM.replace_all(&escaped, |caps: &regex::Captures| {
        caps[1]
            .parse::<usize>()
            .ok()
            .and_then(|i| verbatim.get(i))
            .map(|block| format!("\n\n{block}\n\n"))
            .unwrap_or_else(|| caps[0].to_string())
    });
    BLANK_RUNS
        .replace_all(&restored, "\n\n")
        .trim()
        .to_string()
}

fn converter() -> HtmlToMarkdown {
    HtmlToMarkdown::builder()
        .options(Options {
            heading_style: HeadingStyle::Atx,
            bullet_list_marker: BulletListMarker::Dash,
            code_block_style: CodeBlockStyle::Fenced,
            ..Default::default()
        })
        .skip_tags(SKIPPED_TAGS.to_vec())
        .add_handler(vec!["img"], |element: Element| {
            let attr = |name: &str| {
                element
                    .attrs
                    .iter()
                    .find(|a| &*a.name.local == name)
                    .map(|a| a.value.to_string())
            };
            Some(image(attr("src"), attr("alt"), attr("title")))
        })
        .add_handler(vec!["figure"], |element: Element| {
            Some(block(element.content.trim()))
        })
        .add_handler(vec!["figcaption"], |element: Element| {
            let caption = single_line(element.content);
            Some(if caption.is_empty() {
                String::new()
            } else {
                block(&format!("_{caption}_"))
            })
        })
        .add_handler(vec!["del", "s", "strike"], |element: Element| {
            Some(wrap_trimmed(element.content, "~~"))
        })
        .build()
}

// =========================================================================
// Verbatim blocks
// =========================================================================

/// Swap literal elements and tables for markers; returns the blocks by index.
fn extract_verbatim(body: &Handle) -> Vec<String> {
    let mut verbatim = Vec::new();
    dom::replace_with_text(body, &mut |node| {
        let tag = dom::tag_name(node)?;
        let block = if LITERAL_TAGS.contains(&tag) {
            dom::self_close_void_tags(&dom::outer_html(node))
        } else if tag == "table" {
            table(node)
        } else {
            return None;
        };
        verbatim.push(block);
        Some(format!("{VERBATIM_MARKER}{}X", verbatim.len() - 1))
    });
    verbatim
}

/// Drop `start` values too large to count from.
fn clamp_list_starts(body: &Handle) {
    for list in dom::descendants_where(body, &|t| t == "ol") {
        if let Some(start) = dom::attr(&list, "start")
            && start.trim().parse::<u32>().is_err()
        {
            dom::remove_attrs(&list, &["start"]);
        }
    }
}

fn table(node: &Handle) -> String {
    let rows: Vec<Vec<String>> = dom::descendants_where(node, &|t| t == "tr")
        .iter()
        .map(|tr| {
            tr.children
                .borrow()
                .iter()
                .filter(|c| matches!(dom::tag_name(c), Some("td" | "th")))
                .map(|cell| escape_line(&single_line(&dom::text_content(cell))).replace('|', "\\|"))
                .collect::<Vec<_>>()
        })
        .filter(|row| !row.is_empty())
        .collect();
    let Some(width) = rows.iter().map(Vec::len).max() else {
        return String::new();
    };

    let format_row = |row: &[String]| {
        let mut cells: Vec<&str> = row.iter().map(String::as_str).collect();
        cells.resize(width, "");
        format!("| {} |", cells.join(" | "))
    };
    let mut lines = vec![format_row(rows[0].as_slice())];
    lines.push(format!("| {} |", vec!["---"; width].join(" | ")));
    lines.extend(rows[1..].iter().map(|row| format_row(row.as_slice())));
    lines.join("\n")
}

// =========================================================================
// Element handlers
// =========================================================================

fn image(src: Option<String>, alt: Option<String>, title: Option<String>) -> String {
    let Some(src) = src.filter(|s| !s.is_empty()) else {
        return String::new();
    };
    let alt = single_line(&alt.unwrap_or_default())
        .replace('\\', "\\\\")
        .replace('[', "\\[")
        .replace(']', "\\]");
    let title = match title {
        Some(t) if !t.trim().is_empty() => format!(" \"{}\"", single_line(&t).replace('"', "\\\"")),
        _ => String::new(),
    };
    format!("![{alt}]({}{title})", destination(&src))
}

/// Link or image destination, angle-bracketed when it would break the syntax.
fn destination(url: &str) -> String {
    if url.contains(|c: char| c.is_whitespace() || c == '(' || c == ')') {
        format!("<{url}>")
    } else {
        url.to_string()
    }
}

fn block(content: &str) -> String {
    format!("\n\n{content}\n\n")
}

fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Wrap the trimmed text in `delimiter`, keeping one surrounding space each side.
fn wrap_trimmed(inner: &str, delimiter: &str) -> String {
    let trimmed = inner.trim();
    if trimmed.is_empty() {
        return inner.to_string();
    }
    let lead = if inner.starts_with(char::is_whitespace) { " " } else { "" };
    let trail = if inner.ends_with(char::is_whitespace) { " " } else { "" };
    format!("{lead}{delimiter}{trimmed}{delimiter}{trail}")
}

// =========================================================================
// MDX escaping
// =========================================================================

/// Escape JSX-significant characters outside fenced and inline code.
fn escape_mdx(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());
    let mut fence: Option<&str> = None;
    for line in markdown.lines() {
        let trimmed = line.trim_start();
        match fence {
            Some(marker) => {
                if trimmed.starts_with(marker) {
                    fence = None;
                }
                out.push_str(line);
            }
            None if trimmed.starts_with("```") || trimmed.starts_with("~~~") => {
                fence = Some(&trimmed[..3]);
                out.push_str(line);
            }
            None => {
                let line = LIST_MARKER_GAP.replace(line, "$1 ");
                out.push_str(&escape_line(&line));
            }
        }
        out.push('\n');
    }
    out
}

fn escape_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_code = false;
    for c in line.chars() {
        match c {
            '`' => {
                in_code = !in_code;
                out.push(c);
            }
            '{' | '}' if !in_code => {
                out.push('\\');
                out.push(c);
            }
            // `](<dest>)` is a bracketed link destination
            '<' if !in_code && !out.ends_with("](") => out.push_str("&lt;"),
            _ => out.push(c),
        }
    }
    out
}
