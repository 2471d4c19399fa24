//! The static rendering context.
//!
//! Parses the document with `scraper`, runs the cascade and the box layout,
//! and answers probes from the resulting frame. Scripts never run and nothing
//! is fetched, so the frame is final as soon as `load` returns. A document
//! that loads the Tailwind runtime gets its utility classes resolved by the
//! cascade instead.

use std::time::Duration;

use log::debug;
use scraper::{ElementRef, Html};

use super::layout::{layout_document, Rect};
use super::style::{style_tree, Cascade};
use super::{ComputedStyle, ElementProbe, RenderContext};
use crate::classify::selector;
use crate::{ComposedDocument, Error, Result, Viewport};

/// Computed styles and border boxes by element pre-order index
#[derive(Debug, Clone, Default)]
struct Frame {
    styles: Vec<ComputedStyle>,
    boxes: Vec<Rect>,
    scroll_height: f32,
}

/// Pure-Rust rendering context: cascade and layout, no scripts, no network.
///
/// `scraper` documents are not `Send`, so the engine keeps the source text
/// and reparses it whenever it needs the tree.
#[derive(Debug, Clone)]
pub struct StaticEngine {
    viewport: Viewport,
    source: Option<String>,
    injected: Vec<String>,
    frame: Option<Frame>,
}

impl StaticEngine {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            source: None,
            injected: Vec::new(),
            frame: None,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn source(&self) -> Result<&str> {
        self.source
            .as_deref()
            .ok_or_else(|| Error::RenderError("no document loaded".into()))
    }

    fn frame(&self) -> Result<&Frame> {
        self.frame
            .as_ref()
            .ok_or_else(|| Error::RenderError("no document loaded".into()))
    }

    fn relayout(&mut self) -> Result<()> {
        let html = Html::parse_document(self.source()?);
        let cascade = Cascade::for_document(&html, &self.injected, self.viewport);
        let tree = style_tree(&html, &cascade, self.viewport);
        let layout = layout_document(&tree, self.viewport);

        let mut styles = Vec::with_capacity(layout.boxes.len());
        tree.walk(&mut |el| styles.push(el.values.computed_style(self.viewport)));
        let boxes = layout
            .boxes
            .iter()
            .map(|b| b.map(|b| b.rect).unwrap_or_default())
            .collect();

        debug!(
            "laid out {} elements, document height {:.1}px",
            styles.len(),
            layout.document_height
        );
        self.frame = Some(Frame {
            styles,
            boxes,
            scroll_height: layout.document_height,
        });
        Ok(())
    }
}

impl RenderContext for StaticEngine {
    fn load(&mut self, document: &ComposedDocument) -> Result<()> {
        self.source = Some(document.as_str().to_string());
        self.injected.clear();
        self.relayout()
            .map_err(|e| Error::LoadError(e.to_string()))
    }

    fn inject_style(&mut self, css: &str) -> Result<()> {
        self.source()?;
        self.injected.push(css.to_string());
        self.relayout()
    }

    fn probe(&self, selector_text: &str) -> Result<Vec<ElementProbe>> {
        let frame = self.frame()?;
        let sel = selector(selector_text)?;
        let html = Html::parse_document(self.source()?);

        let probes = html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .enumerate()
            .filter(|(_, el)| sel.matches(el))
            .map(|(i, _)| ElementProbe {
                style: frame.styles.get(i).cloned().unwrap_or_default(),
                rect: frame.boxes.get(i).copied().unwrap_or_default(),
            })
            .collect();
        Ok(probes)
    }

    fn scroll_height(&self) -> Result<u32> {
        let frame = self.frame()?;
        Ok(frame.scroll_height.max(0.0).ceil() as u32)
    }

    fn wait_for_fonts(&mut self, _timeout: Duration) -> Result<bool> {
        // no web fonts are fetched, so they are always ready
        self.frame()?;
        Ok(true)
    }

    fn unload(&mut self) {
        self.source = None;
        self.injected.clear();
        self.frame = None;
    }
}
