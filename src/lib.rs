//! RFox Preview
//!
//! Turns arbitrary, partially-malformed HTML/CSS component snippets into
//! self-contained sandboxed documents and decides whether the rendered result
//! shows a visible, plausibly-styled button worth displaying in a catalog.
//!
//! # Pipeline
//!
//! ```text
//! raw code -> decode -> classify -> (synthesize | passthrough) -> compose -> quality gate
//! ```
//!
//! - [`classify`]: full document / CSS-only / fragment detection
//! - [`deps`]: icon, font and utility-CSS dependency injections
//! - [`synth`]: markup synthesis from CSS class signatures
//! - [`compose`]: document assembly and repair
//! - [`gate`]: static pre-filter plus rendered visibility/styling check
//! - [`rendering`]: rendering contexts the gate inspects
//!
//! # Example
//!
//! ```
//! use rfpreview::{PreviewConfig, Snippet, rendering::StaticEngine};
//!
//! let config = PreviewConfig::default();
//! let snippet = Snippet::new(
//!     r#"<button class="btn" style="background:#222;height:40px;width:120px">Buy</button>"#,
//! );
//! let mut ctx = StaticEngine::new(config.viewport);
//! let decision = rfpreview::preview(&mut ctx, &snippet, &config);
//! assert!(decision.accepted);
//! ```

use std::borrow::Cow;
use std::fmt;

use base64::Engine as Base64Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub mod error;
pub use error::{Error, Result};

pub mod catalog;
pub mod classify;
pub mod compose;
pub mod deps;
pub mod gate;
pub mod rendering;
pub mod sandbox;
pub mod synth;

// Async facade over a worker-owned rendering context
pub mod async_api;

// CDP backend: headless Chrome as the isolated rendering context
#[cfg(feature = "cdp")]
pub mod cdp;

pub use async_api::{PreviewHandle, Previewer};
pub use classify::{classify, ClassificationResult};
pub use compose::compose;
pub use deps::resolve_dependencies;
pub use gate::{has_button_signature, QualityGate};
pub use rendering::{ElementProbe, RenderContext};
pub use sandbox::SandboxPolicy;
pub use synth::{synthesize, FeatureSignature};

/// Configuration for composing and evaluating previews
///
/// Defaults mirror what the catalog UI uses: a 60x24 minimum button box, a
/// single styling signal, and auto-height clamped to 10000px.
///
/// # Examples
///
/// ```
/// let cfg = rfpreview::PreviewConfig::default();
/// assert_eq!(cfg.min_styled_signals, 1);
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Viewport of the rendering context
    pub viewport: Viewport,
    /// Height reported on accept when `auto_height` is off
    pub fixed_height: u32,
    /// Measure the rendered document instead of using `fixed_height`
    pub auto_height: bool,
    /// Floor applied to measured heights
    pub min_content_height: u32,
    /// Ceiling applied to measured heights
    pub max_height: u32,
    /// Minimum candidate width in CSS pixels
    pub min_width: f32,
    /// Minimum candidate height in CSS pixels
    pub min_height: f32,
    /// Styling signals a visible candidate needs to pass
    pub min_styled_signals: u32,
    /// Delay before the post-load height re-measurement
    pub settle_delay_ms: u64,
    /// Delay after fonts finish loading before re-measuring
    pub fonts_settle_ms: u64,
    /// Decode HTML entities before classification
    pub decode_entities: bool,
    /// Capabilities granted to the preview sandbox
    pub sandbox: SandboxPolicy,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            fixed_height: 420,
            auto_height: true,
            min_content_height: 360,
            max_height: 10_000,
            min_width: 60.0,
            min_height: 24.0,
            min_styled_signals: 1,
            settle_delay_ms: 250,
            fonts_settle_ms: 50,
            decode_entities: true,
            sandbox: SandboxPolicy::default(),
        }
    }
}

impl PreviewConfig {
    /// Check the configuration for values the gate cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_height == 0 {
            return Err(Error::ConfigError("max_height must be positive".into()));
        }
        if self.min_content_height > self.max_height {
            return Err(Error::ConfigError(format!(
                "min_content_height ({}) exceeds max_height ({})",
                self.min_content_height, self.max_height
            )));
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(Error::ConfigError("viewport must be non-empty".into()));
        }
        Ok(())
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// A raw catalog snippet. Immutable for the lifetime of one preview request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    raw_code: String,
}

impl Snippet {
    pub fn new(raw_code: impl Into<String>) -> Self {
        Self {
            raw_code: raw_code.into(),
        }
    }

    pub fn raw_code(&self) -> &str {
        &self.raw_code
    }

    /// The code with HTML entities decoded. Class and tag signatures only
    /// match after this step.
    pub fn decoded(&self) -> Cow<'_, str> {
        htmlize::unescape(self.raw_code.as_str())
    }
}

/// A self-contained document ready to be loaded into a sandboxed context
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComposedDocument(String);

impl ComposedDocument {
    pub fn new(html: impl Into<String>) -> Self {
        Self(html.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Hex SHA-256 of the document text.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.0.as_bytes()))
    }

    /// `data:` URL carrying the document, base64 encoded.
    pub fn data_url(&self) -> String {
        format!(
            "data:text/html;charset=utf-8;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(self.0.as_bytes())
        )
    }
}

impl fmt::Display for ComposedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderDecision {
    /// Whether the preview should be shown
    pub accepted: bool,
    /// Content height on accept; `None` on reject
    pub measured_height: Option<u32>,
}

impl RenderDecision {
    pub fn reject() -> Self {
        Self {
            accepted: false,
            measured_height: None,
        }
    }

    pub fn accept(height: u32) -> Self {
        Self {
            accepted: true,
            measured_height: Some(height),
        }
    }
}

/// Decode (when configured), classify and compose a snippet.
pub fn compose_snippet(snippet: &Snippet, config: &PreviewConfig) -> ComposedDocument {
    let code = if config.decode_entities {
        snippet.decoded()
    } else {
        Cow::Borrowed(snippet.raw_code())
    };
    let classification = classify(&code);
    compose(classification, &code)
}

/// Compose a snippet and run it through the quality gate on `ctx`.
///
/// Never fails: every error along the way ends in a rejection.
pub fn preview<C>(ctx: &mut C, snippet: &Snippet, config: &PreviewConfig) -> RenderDecision
where
    C: RenderContext + ?Sized,
{
    let document = compose_snippet(snippet, config);
    QualityGate::new(config.clone()).evaluate(ctx, &document)
}

/// Which rendering context to create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Pure-Rust cascade and layout, no scripts, no network
    #[default]
    Static,
    /// Headless Chrome over the DevTools protocol
    #[cfg(feature = "cdp")]
    Cdp,
}

/// Create a rendering context for the given backend.
pub fn new_context(backend: Backend, config: &PreviewConfig) -> Result<Box<dyn RenderContext>> {
    config.validate()?;
    match backend {
        Backend::Static => Ok(Box::new(rendering::StaticEngine::new(config.viewport))),
        #[cfg(feature = "cdp")]
        Backend::Cdp => Ok(Box::new(cdp::CdpRenderer::new(config)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PreviewConfig::default();
        assert_eq!(config.viewport.width, 1280);
        assert_eq!(config.max_height, 10_000);
        assert!(config.auto_height);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_inverted_heights() {
        let config = PreviewConfig {
            min_content_height: 500,
            max_height: 100,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_config_partial_json() {
        let cfg: PreviewConfig = serde_json::from_str(r#"{"min_styled_signals": 3}"#).unwrap();
        assert_eq!(cfg.min_styled_signals, 3);
        assert_eq!(cfg.fixed_height, 420);
    }

    #[test]
    fn test_snippet_decoding() {
        let s = Snippet::new("&lt;button class=&quot;btn&quot;&gt;Go&lt;/button&gt;");
        assert_eq!(s.decoded(), r#"<button class="btn">Go</button>"#);
    }

    #[test]
    fn test_document_digest_is_stable() {
        let a = ComposedDocument::new("<p>x</p>");
        let b = ComposedDocument::new("<p>x</p>");
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
        assert!(a.data_url().starts_with("data:text/html"));
    }
}
