//! Page metadata extraction from `<head>`.
//!
//! ### Sources
//! - OGP: `<meta property="og:*" content>` keyed without the `og:` prefix
//! - Generic metadata: `<meta name content>` keyed by lowercased name
//! - Rel links: `<link rel href>` keyed by lowercased rel
//!
//! Empty attributes are skipped and the last duplicate wins.
//!
//! ### Assembly
//! Each field takes the first usable source:
//! - `title`: OGP `title` → `<title>` text
//! - `canonical`: OGP `url` → rel `canonical` → final fetch URL
//! - `type`: OGP `type` → `website`
//! - `lang`: `<html lang>`
//! - `image`: OGP `image`, resolved against `canonical`
//! - `description`: OGP `description` → meta `description`
//! - `site_name`: OGP `site_name`
//! - `icon`: rel `icon` → rel `shortcut icon`, resolved against `canonical`
//!
//! A meta `robots` value containing `noindex` refuses the page.

pub mod document;

pub use document::Document;

use std::collections::HashMap;

use metafetch_core::PageMetadata;
use scraper::ElementRef;
use url::Url;

use crate::error::Rejection;
use document::{attr, find_all, find_first, text};

/// OGP `type` when the page declares none.
pub const DEFAULT_TYPE: &str = "website";

fn non_empty<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    attr(element, name).filter(|v| !v.is_empty())
}

/// `og:*` properties keyed without the prefix.
pub fn ogp_properties(metas: &[ElementRef<'_>]) -> HashMap<String, String> {
    let mut ogp = HashMap::new();
    for meta in metas {
        let Some(property) = non_empty(*meta, "property") else { continue };
        let Some(content) = non_empty(*meta, "content") else { continue };
        if let Some(key) = property.strip_prefix("og:") {
            ogp.insert(key.to_string(), content.to_string());
        }
    }
    ogp
}

/// `<meta name content>` pairs keyed by lowercased name.
pub fn named_metadata(metas: &[ElementRef<'_>]) -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    for meta in metas {
        if let (Some(name), Some(content)) = (non_empty(*meta, "name"), non_empty(*meta, "content")) {
            metadata.insert(name.to_ascii_lowercase(), content.to_string());
        }
    }
    metadata
}

/// `<link rel href>` pairs keyed by lowercased rel.
pub fn rel_links(links: &[ElementRef<'_>]) -> HashMap<String, String> {
    let mut rels = HashMap::new();
    for link in links {
        if let (Some(rel), Some(href)) = (non_empty(*link, "rel"), non_empty(*link, "href")) {
            rels.insert(rel.to_ascii_lowercase(), href.to_string());
        }
    }
    rels
}

/// Whether a meta robots value forbids indexing.
pub fn is_noindex(robots: &str) -> bool {
    robots.split(',').any(|token| token.trim().eq_ignore_ascii_case("noindex"))
}

fn resolve_http(base: &Url, reference: &str) -> Option<Url> {
    base.join(reference.trim()).ok().filter(|u| matches!(u.scheme(), "http" | "https"))
}

/// Assemble [`PageMetadata`] from a document's root and head elements.
///
/// # Errors
///
/// - [`Rejection::MissingTitle`] when neither `og:title` nor a non-empty `<title>` exists
/// - [`Rejection::NoIndex`] when meta robots contains `noindex`
pub fn extract_metadata(root: ElementRef<'_>, head: ElementRef<'_>, final_url: &Url) -> Result<PageMetadata, Rejection> {
    let metas = find_all(head, "meta");
    let ogp = ogp_properties(&metas);
    let meta = named_metadata(&metas);
    let rel = rel_links(&find_all(head, "link"));

    let title = match ogp.get("title") {
        Some(title) => title.clone(),
        None => find_first(head, "title").map(text).filter(|t| !t.is_empty()).ok_or(Rejection::MissingTitle)?,
    };

    if meta.get("robots").is_some_and(|r| is_noindex(r)) {
        return Err(Rejection::NoIndex);
    }

    let canonical = [ogp.get("url"), rel.get("canonical")]
        .into_iter()
        .flatten()
        .find_map(|candidate| resolve_http(final_url, candidate))
        .unwrap_or_else(|| final_url.clone());

    let image = ogp.get("image").and_then(|i| resolve_http(&canonical, i));
    let icon = rel.get("icon").or_else(|| rel.get("shortcut icon")).and_then(|i| resolve_http(&canonical, i));
    let lang = attr(root, "lang").map(str::trim).filter(|l| !l.is_empty()).map(String::from);

    Ok(PageMetadata {
        title,
        kind: ogp.get("type").cloned().unwrap_or_else(|| DEFAULT_TYPE.to_string()),
        lang,
        image,
        description: ogp.get("description").or_else(|| meta.get("description")).cloned(),
        site_name: ogp.get("site_name").cloned(),
        icon,
        canonical,
    })
}

/// Parse `html` and extract its metadata.
///
/// # Errors
///
/// [`Rejection::Unparsable`] for a blank document and [`Rejection::MissingHead`]
/// for one without a head, plus everything [`extract_metadata`] reports.
pub fn extract(html: &str, final_url: &Url) -> Result<PageMetadata, Rejection> {
    let doc = Document::parse(html);
    let root = doc.root().ok_or(Rejection::Unparsable)?;
    let head = doc.head().ok_or(Rejection::MissingHead)?;
    extract_metadata(root, head, final_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/articles/1").unwrap()
    }

    fn page(head: &str) -> String {
        format!(r#"<!DOCTYPE html><html lang="en"><head>{head}</head><body><p>body</p></body></html>"#)
    }

    #[test]
    fn test_og_title_preferred() {
        let meta = extract(&page(r#"<meta property="og:title" content="OG"><title>Doc</title>"#), &base()).unwrap();
        assert_eq!(meta.title, "OG");
    }

    #[test]
    fn test_document_title_fallback() {
        let meta = extract(&page("<title>Doc</title>"), &base()).unwrap();
        assert_eq!(meta.title, "Doc");
        assert_eq!(meta.kind, "website");
        assert_eq!(meta.canonical, base());
        assert_eq!(meta.lang.as_deref(), Some("en"));
        assert!(meta.image.is_none());
        assert!(meta.description.is_none());
        assert!(meta.site_name.is_none());
        assert!(meta.icon.is_none());
    }

    #[test]
    fn test_missing_title() {
        assert_eq!(extract(&page(r#"<meta name="description" content="d">"#), &base()), Err(Rejection::MissingTitle));
        assert_eq!(extract(&page("<title>   </title>"), &base()), Err(Rejection::MissingTitle));
        assert_eq!(extract(&page(r#"<meta property="og:title" content="">"#), &base()), Err(Rejection::MissingTitle));
    }

    #[test]
    fn test_noindex_refused() {
        let head = r#"<title>T</title><meta property="og:title" content="OG"><meta name="robots" content="noindex, nofollow">"#;
        assert_eq!(extract(&page(head), &base()), Err(Rejection::NoIndex));

        let head = r#"<title>T</title><meta name="ROBOTS" content="nofollow ,NOINDEX">"#;
        assert_eq!(extract(&page(head), &base()), Err(Rejection::NoIndex));

        let head = r#"<title>T</title><meta name="robots" content="index, follow">"#;
        assert!(extract(&page(head), &base()).is_ok());
    }

    #[test]
    fn test_missing_title_reported_before_noindex() {
        let head = r#"<meta name="robots" content="noindex">"#;
        assert_eq!(extract(&page(head), &base()), Err(Rejection::MissingTitle));
    }

    #[test]
    fn test_full_assembly() {
        let head = r#"
            <title>Doc</title>
            <meta property="og:title" content="Article">
            <meta property="og:type" content="article">
            <meta property="og:url" content="https://example.com/a">
            <meta property="og:image" content="/img/cover.png">
            <meta property="og:site_name" content="Example">
            <meta name="description" content="plain description">
            <link rel="canonical" href="https://example.com/ignored">
            <link rel="shortcut icon" href="/favicon.ico">
        "#;
        let meta = extract(&page(head), &base()).unwrap();

        assert_eq!(meta.title, "Article");
        assert_eq!(meta.kind, "article");
        assert_eq!(meta.canonical.as_str(), "https://example.com/a");
        assert_eq!(meta.image.unwrap().as_str(), "https://example.com/img/cover.png");
        assert_eq!(meta.site_name.as_deref(), Some("Example"));
        assert_eq!(meta.description.as_deref(), Some("plain description"));
        assert_eq!(meta.icon.unwrap().as_str(), "https://example.com/favicon.ico");
    }

    #[test]
    fn test_source_precedence() {
        let head = r#"
            <title>Doc</title>
            <meta property="og:description" content="og description">
            <meta name="description" content="plain description">
            <link rel="canonical" href="/canonical">
            <link rel="shortcut icon" href="/shortcut.ico">
            <link rel="icon" href="icon.png">
        "#;
        let meta = extract(&page(head), &base()).unwrap();

        assert_eq!(meta.description.as_deref(), Some("og description"));
        assert_eq!(meta.canonical.as_str(), "https://example.com/canonical");
        assert_eq!(meta.icon.unwrap().as_str(), "https://example.com/icon.png");
    }

    #[test]
    fn test_last_duplicate_wins() {
        let head = r#"<meta property="og:title" content="first"><meta property="og:title" content="second">"#;
        assert_eq!(extract(&page(head), &base()).unwrap().title, "second");
    }

    #[test]
    fn test_unusable_canonical_falls_through() {
        let head = r#"<title>T</title><meta property="og:url" content="javascript:void(0)"><link rel="canonical" href="/c">"#;
        assert_eq!(extract(&page(head), &base()).unwrap().canonical.as_str(), "https://example.com/c");
    }

    #[test]
    fn test_empty_lang_absent() {
        let html = r#"<html lang=""><head><title>T</title></head></html>"#;
        assert!(extract(html, &base()).unwrap().lang.is_none());
    }

    #[test]
    fn test_structural_rejections() {
        assert_eq!(extract("   ", &base()), Err(Rejection::Unparsable));
        assert_eq!(extract("<html><body><p>x</p></body></html>", &base()), Err(Rejection::MissingHead));
        let scripted = "<html><body><script>document.write('<head>')</script><p>x</p></body></html>";
        assert_eq!(extract(scripted, &base()), Err(Rejection::MissingHead));
    }

    #[test]
    fn test_title_in_body_is_ignored() {
        let html = "<html><head><meta charset=\"utf-8\"></head><body><title>late</title></body></html>";
        assert_eq!(extract(html, &base()), Err(Rejection::MissingTitle));
    }
}
