//! Rendering contexts
//!
//! A [`RenderContext`] is an isolated environment that loads a composed
//! document and answers the questions the quality gate asks of it: which
//! elements match a selector, what their computed styles are, and where they
//! landed on the page.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ComposedDocument, Result};

pub mod css;
pub mod engine;
pub mod layout;
pub mod style;
pub mod utility;

pub use engine::StaticEngine;
pub use layout::Rect;

/// The subset of `getComputedStyle` the quality gate reads.
///
/// Values are kept as CSS strings, the way a browser reports them, so that
/// every backend feeds the gate the same shape of data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComputedStyle {
    pub display: String,
    pub visibility: String,
    pub opacity: String,
    pub border_top_left_radius: String,
    pub border_top_right_radius: String,
    pub border_bottom_left_radius: String,
    pub border_bottom_right_radius: String,
    pub box_shadow: String,
    pub background_image: String,
    pub background_color: String,
    pub border_top_width: String,
    pub border_right_width: String,
    pub border_bottom_width: String,
    pub border_left_width: String,
    pub transform: String,
    pub filter: String,
    pub backdrop_filter: String,
    pub transition_duration: String,
    pub animation_name: String,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: "inline".into(),
            visibility: "visible".into(),
            opacity: "1".into(),
            border_top_left_radius: "0px".into(),
            border_top_right_radius: "0px".into(),
            border_bottom_left_radius: "0px".into(),
            border_bottom_right_radius: "0px".into(),
            box_shadow: "none".into(),
            background_image: "none".into(),
            background_color: "rgba(0, 0, 0, 0)".into(),
            border_top_width: "0px".into(),
            border_right_width: "0px".into(),
            border_bottom_width: "0px".into(),
            border_left_width: "0px".into(),
            transform: "none".into(),
            filter: "none".into(),
            backdrop_filter: "none".into(),
            transition_duration: "0s".into(),
            animation_name: "none".into(),
        }
    }
}

/// Computed style and bounding rectangle of one candidate element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementProbe {
    pub style: ComputedStyle,
    pub rect: Rect,
}

/// An isolated rendering context.
///
/// Implementations need not be `Send`; the async previewer keeps each
/// context on the thread that created it.
pub trait RenderContext {
    /// Load a document, replacing whatever was loaded before. Returns once
    /// the load signal has fired.
    fn load(&mut self, document: &ComposedDocument) -> Result<()>;

    /// Append a stylesheet to the loaded document.
    fn inject_style(&mut self, css: &str) -> Result<()>;

    /// Computed style and bounding rect of every element matching `selector`,
    /// in document order.
    fn probe(&self, selector: &str) -> Result<Vec<ElementProbe>>;

    /// Scroll height of the loaded document in CSS pixels.
    fn scroll_height(&self) -> Result<u32>;

    /// Wait until web fonts are ready. `Ok(false)` when `timeout` elapsed first.
    fn wait_for_fonts(&mut self, timeout: Duration) -> Result<bool>;

    /// Whether layout can still change after the load signal (scripts, fonts).
    fn is_dynamic(&self) -> bool {
        false
    }

    /// Drop the loaded document.
    fn unload(&mut self) {}
}

impl<T: RenderContext + ?Sized> RenderContext for Box<T> {
    fn load(&mut self, document: &ComposedDocument) -> Result<()> {
        (**self).load(document)
    }

    fn inject_style(&mut self, css: &str) -> Result<()> {
        (**self).inject_style(css)
    }

    fn probe(&self, selector: &str) -> Result<Vec<ElementProbe>> {
        (**self).probe(selector)
    }

    fn scroll_height(&self) -> Result<u32> {
        (**self).scroll_height()
    }

    fn wait_for_fonts(&mut self, timeout: Duration) -> Result<bool> {
        (**self).wait_for_fonts(timeout)
    }

    fn is_dynamic(&self) -> bool {
        (**self).is_dynamic()
    }

    fn unload(&mut self) {
        (**self).unload()
    }
}
