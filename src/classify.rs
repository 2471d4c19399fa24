//! Markup classification: full document, CSS-only body, or bare fragment.
//!
//! Everything here is pure text analysis. The helpers that pull CSS and body
//! markup out of a document are shared with the composer.

use std::sync::OnceLock;

use log::debug;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Serialize;

use crate::{Error, Result};

/// How a snippet is shaped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ClassificationResult {
    /// Contains document-level structure (doctype, html, head or body)
    pub is_full_document: bool,
    /// Carries CSS rules but no markup to render them with
    pub is_css_only: bool,
}

fn style_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<style[^>]*>([\s\S]*?)</style>").expect("valid regex"))
}

fn body_inner_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<body[^>]*>([\s\S]*?)</body>").expect("valid regex"))
}

fn css_text_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^[^{]*\{[\s\S]*\}[\s\S]*$").expect("valid regex"))
}

pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Parse(format!("invalid selector {css:?}: {e:?}")))
}

/// Whether the snippet has document-level structure.
pub fn is_full_document(code: &str) -> bool {
    let s = code.trim().to_lowercase();
    s.starts_with("<!doctype") || s.contains("<html") || s.contains("<head") || s.contains("<body")
}

/// Concatenated contents of every `<style>` block, newline separated.
pub fn extract_style_css(html: &str) -> String {
    style_block_re()
        .captures_iter(html)
        .map(|c| c.get(1).map_or("", |m| m.as_str()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Raw text between the first `<body …>` and `</body>`, or empty.
pub fn body_inner(html: &str) -> &str {
    body_inner_re()
        .captures(html)
        .and_then(|c| c.get(1))
        .map_or("", |m| m.as_str())
}

fn has_rule_block(css: &str) -> bool {
    let t = css.trim();
    !t.is_empty() && t.contains('{') && t.contains('}')
}

/// Bare CSS text: braces present, no tag brackets.
pub fn looks_css_only(text: &str) -> bool {
    let t = text.trim();
    if t.is_empty() || (t.contains('<') && t.contains('>')) {
        return false;
    }
    css_text_re().is_match(t)
}

fn parsed_body_html(html: &str) -> Result<String> {
    let doc = Html::parse_document(html);
    let body = doc
        .select(&selector("body")?)
        .next()
        .ok_or_else(|| Error::Parse("document has no body".into()))?;
    Ok(body.inner_html())
}

/// Whether the parsed body holds bare CSS text rather than markup.
///
/// Parse failures count as "not CSS-only".
pub fn body_looks_like_css_only(html: &str) -> bool {
    match parsed_body_html(html) {
        Ok(inner) => {
            let t = inner.trim();
            !t.is_empty() && t.contains('{') && t.contains('}') && !t.contains('<') && !t.contains('>')
        }
        Err(e) => {
            debug!("css-only detection failed: {}", e);
            false
        }
    }
}

fn body_is_blank(html: &str) -> bool {
    parsed_body_html(html)
        .map(|inner| inner.trim().is_empty())
        .unwrap_or(false)
}

/// A fragment with nothing but `<style>` blocks, or plain CSS text.
pub fn fragment_is_css_only(code: &str) -> bool {
    if looks_css_only(code) {
        return true;
    }
    let rest = style_block_re().replace_all(code, "");
    rest.trim().is_empty() && has_rule_block(&extract_style_css(code))
}

/// Classify a (decoded) snippet.
pub fn classify(code: &str) -> ClassificationResult {
    let result = if is_full_document(code) {
        let is_css_only = body_looks_like_css_only(code)
            || (body_is_blank(code) && has_rule_block(&extract_style_css(code)));
        ClassificationResult {
            is_full_document: true,
            is_css_only,
        }
    } else {
        ClassificationResult {
            is_full_document: false,
            is_css_only: fragment_is_css_only(code),
        }
    };
    debug!(
        "classified snippet ({} bytes): full={} css_only={}",
        code.len(),
        result.is_full_document,
        result.is_css_only
    );
    result
}
