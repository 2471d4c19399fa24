//! Document assembly and repair.
//!
//! Every path produces a self-contained document string. Repairs that fail
//! internally fall back to the input unchanged; nothing here returns an error
//! to the caller.

use std::borrow::Cow;
use std::sync::OnceLock;

use log::{debug, warn};
use regex::{Captures, Regex};
use scraper::{ElementRef, Html};

use crate::classify::{body_inner, extract_style_css, selector, ClassificationResult};
use crate::deps::{resolve_dependencies, PRESS_START_FONT_LINK};
use crate::synth::{
    retro_pixel_collapse_applies, synthesize, FeatureSignature, RETRO_PIXEL_MARKUP,
    RETRO_PIXEL_STYLE,
};
use crate::{ComposedDocument, Result};

/// Appended to documents whose body was synthesized.
pub const NORMALIZE_STYLE: &str =
    "html,body{margin:0;padding:16px}button{display:inline-block}svg{display:block}";

macro_rules! cached_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).expect("valid regex"))
        }
    };
}

cached_regex!(keyframe_typo_re, r"0%\.\s*to");
cached_regex!(style_block_re, r"(?i)<style[^>]*>[\s\S]*?</style>");
cached_regex!(body_open_re, r"(?i)<body");
cached_regex!(body_block_re, r"(?i)<body[^>]*>[\s\S]*?</body>");
cached_regex!(head_close_re, r"(?i)</head>");
cached_regex!(html_open_re, r"(?i)<html[^>]*>");
cached_regex!(press_font_link_re, r"(?i)Press\+Start\+2P");
cached_regex!(checkbox_re, r#"(?i)<input[^>]*type=["']checkbox["'][^>]*>"#);
cached_regex!(controls_re, r"(?i)<(button|input|svg)\b");
cached_regex!(svg_re, r"(?i)<svg\b");
cached_regex!(button_tag_re, r"(?i)<button\b");
cached_regex!(button_rule_re, r"button\s*\{|\.button\b");
cached_regex!(icon_series_re, r"\.icon-\d");
cached_regex!(whitespace_re, r"\s+");

/// `0%.` followed by `to` is a common keyframe typo for `0%, to`.
pub fn fix_css_typos(code: &str) -> Cow<'_, str> {
    keyframe_typo_re().replace_all(code, "0%, to")
}

/// Apply [`fix_css_typos`] inside every `<style>` block, leaving markup alone.
pub fn fix_style_blocks(html: &str) -> String {
    style_block_re()
        .replace_all(html, |caps: &Captures| fix_css_typos(&caps[0]).into_owned())
        .into_owned()
}

/// Replace the body (and its attributes) with `inner`.
///
/// Documents without a `<body` tag come back unchanged.
pub fn set_body_inner(html: &str, inner: &str) -> String {
    if !body_open_re().is_match(html) {
        return html.to_string();
    }
    body_block_re()
        .replacen(html, 1, |_: &Captures| format!("<body>{inner}</body>"))
        .into_owned()
}

/// Add a `<style>` block at the end of the head, creating the head if needed.
pub fn add_head_styles(html: &str, css: &str) -> String {
    let extra = format!("<style>{css}</style>");
    if head_close_re().is_match(html) {
        head_close_re()
            .replacen(html, 1, |_: &Captures| format!("{extra}</head>"))
            .into_owned()
    } else {
        html_open_re()
            .replacen(html, 1, |caps: &Captures| {
                format!("{}<head>{extra}</head>", &caps[0])
            })
            .into_owned()
    }
}

cached_regex!(class_attr_re, r#"(?i)class=["']([^"']*)["']"#);

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// `class` as a whole word inside any `class="…"` attribute of `inner`.
fn has_class(inner: &str, class: &str) -> bool {
    let class = class.to_ascii_lowercase();
    class_attr_re().captures_iter(inner).any(|caps| {
        let value = caps[1].to_ascii_lowercase();
        let bytes = value.as_bytes();
        value.match_indices(class.as_str()).any(|(i, _)| {
            let before = i.checked_sub(1).and_then(|j| bytes.get(j));
            let after = bytes.get(i + class.len());
            !before.is_some_and(|b| is_word_byte(*b)) && !after.is_some_and(|b| is_word_byte(*b))
        })
    })
}

fn serialize_attrs(element: &ElementRef<'_>) -> String {
    element
        .value()
        .attrs()
        .map(|(name, value)| format!(" {}=\"{}\"", name, value.replace('"', "&quot;")))
        .collect()
}

/// Rebuild a document whose body is CSS text (or empty) around synthesized
/// markup.
pub fn repair_css_only_body(html: &str) -> Result<String> {
    let doc = Html::parse_document(html);
    let root = doc.root_element();
    let head = doc.select(&selector("head")?).next();
    let body = doc.select(&selector("body")?).next();

    let body_css = body
        .map(|b| b.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    // A blank body means the rules already live in the style blocks.
    let (css, extra_style) = if body_css.is_empty() {
        (extract_style_css(html), None)
    } else {
        let fixed = fix_css_typos(&body_css).into_owned();
        (body_css, Some(fixed))
    };

    let markup = synthesize(&css);

    let mut out = String::from("<!doctype html>\n");
    out.push_str(&format!("<html{}>", serialize_attrs(&root)));
    out.push_str("<head>");
    if let Some(head) = head {
        out.push_str(&head.inner_html());
    }
    if let Some(style) = extra_style {
        out.push_str(&format!("<style>{style}</style>"));
    }
    out.push_str(&format!("<style>{NORMALIZE_STYLE}</style>"));
    out.push_str("</head>");
    let body_attrs = body.map(|b| serialize_attrs(&b)).unwrap_or_default();
    out.push_str(&format!("<body{body_attrs}>{markup}</body></html>"));

    Ok(fix_style_blocks(&out))
}

/// Whether the body markup under-represents what the stylesheet styles.
fn markup_is_insufficient(css: &str, inner: &str, f: &FeatureSignature) -> bool {
    let has_checkbox = checkbox_re().is_match(inner);
    let has_svg = svg_re().is_match(inner);
    let has_play_pause_dom = has_checkbox && has_class(inner, "play") && has_class(inner, "pause");

    let collapsed = whitespace_re().replace_all(inner, " ").to_lowercase();
    let looks_like_placeholder = collapsed.contains("preview") && !controls_re().is_match(inner);
    let container_only = has_class(inner, "container") && !has_checkbox && !has_svg;

    (f.play_pause_container && (!has_play_pause_dom || looks_like_placeholder || container_only))
        || (f.outer_cont && !has_class(inner, "outer-cont"))
        || (f.pat_container && !has_class(inner, "button-container"))
        || (button_rule_re().is_match(css) && !button_tag_re().is_match(inner))
        || (icon_series_re().is_match(css) && !has_svg)
}

fn apply_retro_pixel_collapse(html: &str) -> String {
    let html = set_body_inner(html, RETRO_PIXEL_MARKUP);
    let html = add_head_styles(&html, RETRO_PIXEL_STYLE);
    if press_font_link_re().is_match(&html) {
        html
    } else {
        head_close_re()
            .replacen(&html, 1, |_: &Captures| {
                format!("{PRESS_START_FONT_LINK}\n</head>")
            })
            .into_owned()
    }
}

/// Repair a full document whose markup does not match its CSS.
pub fn normalize_partial_document(html: &str) -> String {
    let css = fix_css_typos(&extract_style_css(html)).into_owned();
    if css.is_empty() {
        return html.to_string();
    }

    let inner = body_inner(html).trim();
    if retro_pixel_collapse_applies(&css, inner) {
        debug!("collapsing retro pixel button into a single element");
        return fix_style_blocks(&apply_retro_pixel_collapse(html));
    }

    let signature = FeatureSignature::extract(&css);
    if !markup_is_insufficient(&css, inner, &signature) {
        return fix_style_blocks(html);
    }

    debug!("body markup does not cover the stylesheet, synthesizing");
    let html = set_body_inner(html, &synthesize(&css));
    let html = add_head_styles(&html, NORMALIZE_STYLE);
    fix_style_blocks(&html)
}

fn head_injections(code: &str) -> String {
    resolve_dependencies(code)
        .iter()
        .map(|tag| format!("    {tag}\n"))
        .collect()
}

/// Minimal shell around a markup fragment.
pub fn wrap_fragment(code: &str) -> String {
    format!(
        r#"<!doctype html>
<html>
  <head>
    <meta charset="utf-8"/>
    <meta name="viewport" content="width=device-width, initial-scale=1"/>
{injections}    <style>
      html,body{{margin:0;padding:0}}
      ._preview-root{{max-width:100%;padding:12px}}
    </style>
  </head>
  <body>
    <div class="_preview-root">
      {body}
    </div>
  </body>
</html>"#,
        injections = head_injections(code),
        body = fix_css_typos(code),
    )
}

/// Full shell for a fragment that is only CSS, with synthesized markup.
pub fn wrap_css_only_fragment(code: &str) -> String {
    let css = {
        let from_blocks = extract_style_css(code);
        if from_blocks.trim().is_empty() {
            code.trim().to_string()
        } else {
            from_blocks
        }
    };
    let css = fix_css_typos(&css).into_owned();
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8" />
<meta name="viewport" content="width=device-width, initial-scale=1" />
{injections}<style>
{css}
</style>
<style>{NORMALIZE_STYLE}</style>
</head>
<body>
{markup}
</body>
</html>"#,
        injections = resolve_dependencies(code)
            .iter()
            .map(|tag| format!("{tag}\n"))
            .collect::<String>(),
        markup = synthesize(&css),
    )
}

/// Assemble the document for a classified snippet.
pub fn compose(classification: ClassificationResult, code: &str) -> ComposedDocument {
    let html = match (classification.is_full_document, classification.is_css_only) {
        (true, true) => match repair_css_only_body(code) {
            Ok(html) => html,
            Err(e) => {
                warn!("css-only repair failed, using input as-is: {}", e);
                code.to_string()
            }
        },
        (true, false) => normalize_partial_document(code),
        (false, true) => wrap_css_only_fragment(code),
        (false, false) => wrap_fragment(code),
    };
    ComposedDocument::new(html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;

    #[test]
    fn class_lookup_matches_whole_words_in_class_attributes() {
        let inner = r#"<div class="outer-cont Big"><input type="checkbox" data-x="pause"><i class='Play icon'></i></div>"#;
        assert!(has_class(inner, "outer-cont"));
        assert!(has_class(inner, "big"));
        assert!(has_class(inner, "play"));
        assert!(!has_class(inner, "pause"));
        assert!(!has_class(r#"<b class="display">"#, "play"));
        assert!(!has_class(r#"<b class="play_now">"#, "play"));
    }

    fn compose_str(code: &str) -> String {
        compose(classify(code), code).into_string()
    }

    #[test]
    fn typo_fix_is_idempotent() {
        let css = "@keyframes a { 0%.  to { opacity: 1 } }";
        let once = fix_css_typos(css).into_owned();
        assert_eq!(once, "@keyframes a { 0%, to { opacity: 1 } }");
        assert_eq!(fix_css_typos(&once), once);
    }

    #[test]
    fn typo_fix_only_touches_style_blocks() {
        let html = "<p>0%. to</p><style>x{} 0%. to{}</style>";
        assert_eq!(fix_style_blocks(html), "<p>0%. to</p><style>x{} 0%, to{}</style>");
    }

    #[test]
    fn body_replacement_and_head_styles() {
        let html = "<html><head></head><body class=\"x\"><p>a</p></body></html>";
        let replaced = set_body_inner(html, "<b>b</b>");
        assert_eq!(replaced, "<html><head></head><body><b>b</b></body></html>");
        assert_eq!(set_body_inner("<p>no body</p>", "x"), "<p>no body</p>");

        let styled = add_head_styles(html, "a{}");
        assert!(styled.contains("<style>a{}</style></head>"));
        let headless = add_head_styles("<html lang=\"en\"><body></body></html>", "a{}");
        assert!(headless.starts_with("<html lang=\"en\"><head><style>a{}</style></head>"));
    }

    #[test]
    fn css_only_body_is_rebuilt() {
        let doc = "<!DOCTYPE html><html lang=\"en\"><head><title>t</title></head><body>.button { color: red }</body></html>";
        let out = compose_str(doc);
        assert!(out.starts_with("<!doctype html>\n<html lang=\"en\">"));
        assert!(out.contains("<title>t</title>"));
        assert!(out.contains("<style>.button { color: red }</style>"));
        assert!(out.contains(NORMALIZE_STYLE));
        assert!(out.contains("<body><button type=\"button\">Button</button></body>"));
    }

    #[test]
    fn complete_document_keeps_its_markup() {
        let doc = "<html><head><style>.btn{color:red} @keyframes k{0%. to{top:0}}</style></head><body><button class=\"btn\">Go</button></body></html>";
        let out = compose_str(doc);
        assert!(out.contains("<button class=\"btn\">Go</button>"));
        assert!(out.contains("0%, to"));
        assert!(!out.contains(NORMALIZE_STYLE));
    }

    #[test]
    fn missing_button_markup_is_synthesized() {
        let doc = "<html><head><style>button{background:#333}</style></head><body><div>Preview</div></body></html>";
        let out = compose_str(doc);
        assert!(out.contains("<body><button type=\"button\">Button</button></body>"));
        assert!(out.contains(NORMALIZE_STYLE));
    }

    #[test]
    fn document_without_styles_is_untouched() {
        let doc = "<html><body><div>hi</div></body></html>";
        assert_eq!(compose_str(doc), doc);
    }

    #[test]
    fn retro_pixel_button_collapses() {
        let doc = "<html><head><style>.button-border{} .button-base{} .button{font-family:'Press Start 2P'}</style></head><body><button class=\"button-border\">Button</button></body></html>";
        let out = compose_str(doc);
        assert!(out.contains(RETRO_PIXEL_MARKUP));
        assert!(out.contains(".btn-press{"));
        assert_eq!(out.matches("Press+Start+2P").count(), 1);
    }

    #[test]
    fn fragment_shell() {
        let out = compose_str("<button class=\"bg-blue-500 rounded-lg\">Buy</button>");
        assert!(out.starts_with("<!doctype html>"));
        assert!(out.contains("cdn.tailwindcss.com"));
        assert!(out.contains("<div class=\"_preview-root\">"));
        assert!(out.contains("<button class=\"bg-blue-500 rounded-lg\">Buy</button>"));
    }

    #[test]
    fn css_only_fragment_gets_markup() {
        let out = compose_str("<style>.fancy-btn{border-radius:8px}</style>");
        assert!(out.contains("<button class=\"fancy-btn\">Button</button>"));
        assert!(out.contains(".fancy-btn{border-radius:8px}"));
    }
}
