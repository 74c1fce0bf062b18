//! Thin query layer over `scraper`.
//!
//! html5ever always synthesizes `<html>` and `<head>`, so their presence in
//! the tree says nothing about the source. A document counts as having no
//! root when the decoded text is blank, and as having no head when the source
//! never opens one and nothing was hoisted into the synthesized head. Only
//! markup ahead of `<body>` counts, with comments and raw-text elements
//! removed, so a `<head>` written from a script does not qualify.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static HEAD_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<head[\s>/]").expect("invalid regex"));
static BODY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<body[\s>/]").expect("invalid regex"));
static OPAQUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<!--.*?-->|<script\b.*?</script\s*>|<style\b.*?</style\s*>").expect("invalid regex")
});

/// A parsed HTML document.
pub struct Document {
    html: Html,
    blank: bool,
    declares_head: bool,
}

impl Document {
    pub fn parse(text: &str) -> Self {
        Self {
            html: Html::parse_document(text),
            blank: text.trim().is_empty(),
            declares_head: declares_head(text),
        }
    }

    /// The `<html>` element, unless there was nothing to parse.
    pub fn root(&self) -> Option<ElementRef<'_>> {
        if self.blank { None } else { Some(self.html.root_element()) }
    }

    /// The `<head>` element, if the source had one.
    pub fn head(&self) -> Option<ElementRef<'_>> {
        let head = find_first(self.root()?, "head")?;
        if self.declares_head || head.children().any(|node| node.value().is_element()) { Some(head) } else { None }
    }
}

/// Whether the source opens `<head>` as markup before any `<body>`.
fn declares_head(text: &str) -> bool {
    let markup = OPAQUE.replace_all(text, "");
    let prologue = match BODY_TAG.find(&markup) {
        Some(body) => &markup[..body.start()],
        None => &markup[..],
    };
    HEAD_TAG.is_match(prologue)
}

fn selector(tag: &str) -> Option<Selector> {
    match Selector::parse(tag) {
        Ok(selector) => Some(selector),
        Err(e) => {
            tracing::debug!(tag, error = ?e, "invalid selector");
            None
        }
    }
}

/// First descendant of `element` with the given tag name.
pub fn find_first<'a>(element: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    element.select(&selector(tag)?).next()
}

/// Every descendant of `element` with the given tag name, in document order.
pub fn find_all<'a>(element: ElementRef<'a>, tag: &str) -> Vec<ElementRef<'a>> {
    match selector(tag) {
        Some(selector) => element.select(&selector).collect(),
        None => Vec::new(),
    }
}

pub fn attr<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element.value().attr(name)
}

/// Concatenated text content, trimmed.
pub fn text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
