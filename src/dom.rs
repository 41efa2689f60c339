//! Thin helpers over the html5ever reference DOM.
//!
//! Exported post bodies are HTML fragments. They are parsed as full
//! documents so html5ever's error recovery applies, and callers then work
//! on the `<body>` element. Every operation here tolerates malformed input:
//! a fragment that cannot be understood degrades to an empty body rather
//! than an error.
//!
//! Dropping an rcdom node empties every descendant, even ones still held
//! elsewhere. Handles obtained from a [`Fragment`] are only usable while
//! the fragment is alive.

use html5ever::serialize::{SerializeOpts, TraversalScope, serialize};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{Attribute, LocalName, Namespace, QualName, parse_document};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};
use regex::Regex;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::LazyLock;

/// Elements that never have children and must be self-closed in MDX.
pub const VOID_TAGS: &[&str] = &["img", "br", "hr", "input", "meta", "link", "source"];

static VOID_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)<(?:{})(?:\s[^>]*?)?>", VOID_TAGS.join("|"))).expect("valid regex")
});

/// A parsed HTML fragment. Owns the tree its handles point into.
pub struct Fragment {
    dom: RcDom,
}

impl Fragment {
    pub fn parse(html: &str) -> Self {
        Self {
            dom: parse_document(RcDom::default(), Default::default()).one(html),
        }
    }

    /// The `<body>` element, or the document node if there is none.
    pub fn body(&self) -> Handle {
        find_element(&self.dom.document, "body").unwrap_or_else(|| self.dom.document.clone())
    }
}

/// Local tag name of an element node.
pub fn tag_name(handle: &Handle) -> Option<&str> {
    match &handle.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// First element named `tag` in document order, including `handle` itself.
pub fn find_element(handle: &Handle, tag: &str) -> Option<Handle> {
    if tag_name(handle) == Some(tag) {
        return Some(handle.clone());
    }
    handle
        .children
        .borrow()
        .iter()
        .find_map(|child| find_element(child, tag))
}

/// All descendant elements matching `pred`, in document order.
pub fn descendants_where(handle: &Handle, pred: &dyn Fn(&str) -> bool) -> Vec<Handle> {
    let mut found = Vec::new();
    collect_where(handle, pred, &mut found);
    found
}

fn collect_where(handle: &Handle, pred: &dyn Fn(&str) -> bool, found: &mut Vec<Handle>) {
    for child in handle.children.borrow().iter() {
        if tag_name(child).is_some_and(pred) {
            found.push(child.clone());
        }
        collect_where(child, pred, found);
    }
}

/// Recursively drop every descendant for which `keep` returns false.
pub fn retain_descendants(handle: &Handle, keep: &dyn Fn(&Handle) -> bool) {
    handle.children.borrow_mut().retain(|child| keep(child));
    let children = handle.children.borrow().clone();
    for child in &children {
        retain_descendants(child, keep);
    }
}

/// Replace descendants with text nodes.
///
/// `replace` is asked about each node top-down; when it returns text the
/// node (and its subtree) is swapped for that text, otherwise its children
/// are visited.
pub fn replace_with_text(handle: &Handle, replace: &mut dyn FnMut(&Handle) -> Option<String>) {
    let children = handle.children.borrow().clone();
    for (i, child) in children.iter().enumerate() {
        match replace(child) {
            Some(text) => {
                let node = Node::new(NodeData::Text {
                    contents: RefCell::new(StrTendril::from_slice(&text)),
                });
                node.parent.set(Some(Rc::downgrade(handle)));
                handle.children.borrow_mut()[i] = node;
            }
            None => replace_with_text(child, replace),
        }
    }
}

pub fn attr(handle: &Handle, name: &str) -> Option<String> {
    match &handle.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| a.name.local.as_ref() == name)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

pub fn set_attr(handle: &Handle, name: &str, value: &str) {
    if let NodeData::Element { attrs, .. } = &handle.data {
        let mut attrs = attrs.borrow_mut();
        match attrs.iter_mut().find(|a| a.name.local.as_ref() == name) {
            Some(existing) => existing.value = value.into(),
            None => attrs.push(Attribute {
                name: QualName::new(None, Namespace::from(""), LocalName::from(name)),
                value: value.into(),
            }),
        }
    }
}

pub fn remove_attrs(handle: &Handle, names: &[&str]) {
    if let NodeData::Element { attrs, .. } = &handle.data {
        attrs
            .borrow_mut()
            .retain(|a| !names.contains(&a.name.local.as_ref()));
    }
}

/// Concatenated text of all descendant text nodes.
pub fn text_content(handle: &Handle) -> String {
    let mut text = String::new();
    push_text(handle, &mut text);
    text
}

fn push_text(handle: &Handle, out: &mut String) {
    if let NodeData::Text { contents } = &handle.data {
        out.push_str(&contents.borrow());
    }
    for child in handle.children.borrow().iter() {
        push_text(child, out);
    }
}

/// Serialize the children of `handle` (its inner HTML).
pub fn inner_html(handle: &Handle) -> String {
    serialize_scope(handle, TraversalScope::ChildrenOnly(None))
}

/// Serialize `handle` together with its children (its outer HTML).
pub fn outer_html(handle: &Handle) -> String {
    serialize_scope(handle, TraversalScope::IncludeNode)
}

fn serialize_scope(handle: &Handle, traversal_scope: TraversalScope) -> String {
    let node: SerializableHandle = handle.clone().into();
    let opts = SerializeOpts {
        traversal_scope,
        ..Default::default()
    };
    let mut bytes = Vec::new();
    match serialize(&mut bytes, &node, opts) {
        Ok(()) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => String::new(),
    }
}

/// Rewrite `<img ...>` and the other [`VOID_TAGS`] into `<img ... />`.
///
/// Tags that are already self-closed are left alone.
pub fn self_close_void_tags(html: &str) -> String {
    VOID_TAG
        .replace_all(html, |caps: &regex::Captures| {
            let tag = &caps[0];
            if tag.ends_with("/>") {
                tag.to_string()
            } else {
                format!("{} />", &tag[..tag.len() - 1])
            }
        })
        .into_owned()
}
