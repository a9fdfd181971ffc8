//! Heading-boundary segmentation of HTML pages.
//!
//! Splits a page into ordered [`Section`]s: every `<h1>`–`<h6>` element opens
//! a section titled by its text, and the section's content is the text of the
//! elements walked between that heading and the next one. A page without
//! headings segments to an empty list; that is a valid result, not an error.

use std::sync::LazyLock;

use ego_tree::{NodeId, NodeRef};
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;

use sitesage_shared::Section;

/// All heading levels are equal boundary markers.
static HEADING_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").expect("valid selector"));

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Tags whose subtree text never counts as page content.
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript"];

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Segment raw HTML into ordered title+content sections.
pub fn segment(html: &str) -> Vec<Section> {
    let doc = Html::parse_document(html);
    segment_document(&doc)
}

/// Segment an already-parsed document.
///
/// Headings are collected in document order; section `i` is bounded by
/// heading `i + 1`, and the final section by the element following the last
/// heading's parent. Boundary checks are sibling-level: a heading nested
/// deeper inside a later sibling does not end the walk early, so that
/// sibling's full text lands in the current section.
pub fn segment_document(doc: &Html) -> Vec<Section> {
    let headings: Vec<ElementRef<'_>> = doc.select(&HEADING_SELECTOR).collect();
    if headings.is_empty() {
        return Vec::new();
    }

    // The element after the last heading's parent bounds the final section.
    let tail_boundary = headings
        .last()
        .and_then(|h| h.parent())
        .and_then(next_element_sibling)
        .map(|node| node.id());

    let mut sections = Vec::with_capacity(headings.len());
    for (i, heading) in headings.iter().enumerate() {
        let boundary = headings.get(i + 1).map(|next| next.id()).or(tail_boundary);
        sections.push(Section {
            title: node_text(**heading),
            content: collect_between(**heading, boundary),
        });
    }

    debug!(sections = sections.len(), "segmented document");
    sections
}

// ---------------------------------------------------------------------------
// Tree walk
// ---------------------------------------------------------------------------

/// Gather the text of every element walked from `heading` up to `boundary`.
fn collect_between(heading: NodeRef<'_, Node>, boundary: Option<NodeId>) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut cursor = heading;

    while let Some(next) = advance(cursor) {
        if Some(next.id()) == boundary {
            break;
        }
        let text = node_text(next);
        if !text.is_empty() {
            parts.push(text);
        }
        cursor = next;
    }

    parts.join("\n")
}

/// Next element in the walk: the cursor's following sibling element, or the
/// nearest ancestor's following sibling element once this level is exhausted.
/// Returns `None` at the document root, which terminates the walk.
fn advance(cursor: NodeRef<'_, Node>) -> Option<NodeRef<'_, Node>> {
    let mut node = cursor;
    loop {
        if let Some(sibling) = next_element_sibling(node) {
            return Some(sibling);
        }
        node = node.parent()?;
    }
}

/// First following sibling that is an element (text and comment nodes are
/// not walk positions).
fn next_element_sibling(node: NodeRef<'_, Node>) -> Option<NodeRef<'_, Node>> {
    let mut sibling = node.next_sibling();
    while let Some(s) = sibling {
        if s.value().is_element() {
            return Some(s);
        }
        sibling = s.next_sibling();
    }
    None
}

// ---------------------------------------------------------------------------
// Text extraction
// ---------------------------------------------------------------------------

/// Visible text of a node's subtree with whitespace runs collapsed.
/// Script and style subtrees contribute nothing.
fn node_text(node: NodeRef<'_, Node>) -> String {
    let mut buf = String::new();
    push_text(node, &mut buf);
    WHITESPACE_RE.replace_all(buf.trim(), " ").into_owned()
}

fn push_text(node: NodeRef<'_, Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => out.push_str(text),
        Node::Element(element) => {
            if SKIPPED_TAGS.contains(&element.name()) {
                return;
            }
            for child in node.children() {
                push_text(child, out);
            }
        }
        _ => {
            for child in node.children() {
                push_text(child, out);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
