//! Box layout for the static engine.
//!
//! Block flow, inline lines with wrapping, single-line flex rows, and
//! replaced elements sized from attributes. Text is measured with a fixed
//! average glyph width, which is enough to tell a button box from a
//! collapsed one.

use serde::{Deserialize, Serialize};

use super::style::{StyledChild, StyledElement};
use crate::Viewport;

/// Average glyph advance as a fraction of the font size
const GLYPH_WIDTH: f32 = 0.55;

/// A border-box rectangle in CSS pixels, as `getBoundingClientRect` reports it
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// Per-side lengths
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Edges {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Edges {
    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoxModel {
    pub margin: Edges,
    pub border: Edges,
    pub padding: Edges,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutBox {
    /// Border box
    pub rect: Rect,
    pub box_model: BoxModel,
}

impl LayoutBox {
    pub fn content_width(&self) -> f32 {
        let bm = &self.box_model;
        (self.rect.width - bm.border.horizontal() - bm.padding.horizontal()).max(0.0)
    }
}

/// Boxes by element pre-order index; `None` for elements that generate no box
#[derive(Debug, Clone, Default)]
pub struct LayoutResult {
    pub boxes: Vec<Option<LayoutBox>>,
    /// Bottom edge of the lowest box
    pub document_height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Block,
    Inline,
}

fn level(display: &str) -> Option<Level> {
    match display {
        "none" => None,
        "block" | "flex" | "grid" | "list-item" | "table" | "flow-root" | "table-row"
        | "table-row-group" | "table-header-group" | "table-footer-group" | "table-caption" => {
            Some(Level::Block)
        }
        _ => Some(Level::Inline),
    }
}

const REPLACED: &[&str] = &[
    "img", "svg", "input", "select", "textarea", "canvas", "video", "iframe", "object", "embed",
];

fn is_replaced(el: &StyledElement<'_>) -> bool {
    REPLACED.contains(&el.tag().as_str())
}

fn is_out_of_flow(el: &StyledElement<'_>) -> bool {
    matches!(el.values.get("position"), Some("absolute") | Some("fixed"))
}

fn flex_direction(el: &StyledElement<'_>) -> Option<bool> {
    // Some(true) for a row container, Some(false) for a column container
    match el.values.display() {
        "flex" | "inline-flex" => Some(
            !el.values
                .get("flex-direction")
                .unwrap_or("row")
                .starts_with("column"),
        ),
        _ => None,
    }
}

struct Layouter {
    viewport: Viewport,
    boxes: Vec<Option<LayoutBox>>,
}

impl Layouter {
    fn box_model(&self, el: &StyledElement<'_>, containing_width: f32) -> BoxModel {
        let v = &el.values;
        let len = |name: &str| {
            v.length(name, Some(containing_width), self.viewport)
                .unwrap_or(0.0)
        };
        BoxModel {
            margin: Edges {
                top: len("margin-top"),
                right: len("margin-right"),
                bottom: len("margin-bottom"),
                left: len("margin-left"),
            },
            border: Edges {
                top: v.border_width("top", self.viewport),
                right: v.border_width("right", self.viewport),
                bottom: v.border_width("bottom", self.viewport),
                left: v.border_width("left", self.viewport),
            },
            padding: Edges {
                top: len("padding-top").max(0.0),
                right: len("padding-right").max(0.0),
                bottom: len("padding-bottom").max(0.0),
                left: len("padding-left").max(0.0),
            },
        }
    }

    fn text_size(&self, text: &str, parent: &StyledElement<'_>, avail: f32) -> (f32, f32) {
        let width = text.chars().count() as f32 * parent.values.font_size * GLYPH_WIDTH;
        let line = parent.values.line_height(self.viewport);
        let nowrap = parent.values.get("white-space") == Some("nowrap");
        if !nowrap && avail > 0.0 && width > avail {
            let lines = (width / avail).ceil();
            (avail, lines * line)
        } else {
            (width, line)
        }
    }

    fn attr_length(&self, el: &StyledElement<'_>, name: &str) -> Option<f32> {
        let raw = el.element.value().attr(name)?;
        let ctx = super::style::LengthContext {
            font_size: el.values.font_size,
            viewport: self.viewport,
            percent_base: None,
        };
        super::style::parse_length(raw, &ctx)
    }

    /// Content-box size of a replaced element without CSS sizing.
    fn intrinsic_size(&self, el: &StyledElement<'_>) -> (f32, f32) {
        let tag = el.tag();
        let (dw, dh) = match tag.as_str() {
            "img" => (0.0, 0.0),
            "input" => {
                let kind = el
                    .element
                    .value()
                    .attr("type")
                    .unwrap_or("text")
                    .to_ascii_lowercase();
                match kind.as_str() {
                    "checkbox" | "radio" => (13.0, 13.0),
                    "submit" | "button" | "reset" => {
                        let label = el.element.value().attr("value").unwrap_or("Submit");
                        self.text_size(label, el, 0.0)
                    }
                    _ => (150.0, el.values.line_height(self.viewport)),
                }
            }
            "select" => (60.0, el.values.line_height(self.viewport)),
            "textarea" => (180.0, 2.0 * el.values.line_height(self.viewport)),
            _ => (300.0, 150.0),
        };
        (
            self.attr_length(el, "width").unwrap_or(dw),
            self.attr_length(el, "height").unwrap_or(dh),
        )
    }

    /// Max-content width of the content box.
    fn preferred_content_width(&self, el: &StyledElement<'_>) -> f32 {
        if let Some(w) = el.values.length("width", None, self.viewport) {
            return w.max(0.0);
        }
        if is_replaced(el) {
            return self.intrinsic_size(el).0;
        }
        let row = flex_direction(el);
        let gap = el
            .values
            .length("column-gap", None, self.viewport)
            .unwrap_or(0.0);
        let mut line = 0.0f32;
        let mut widest = 0.0f32;
        let mut items = 0;
        for child in &el.children {
            let (w, block) = match child {
                StyledChild::Text(t) => (self.text_size(t, el, 0.0).0, false),
                StyledChild::Element(c) => {
                    let Some(lvl) = level(c.values.display()) else {
                        continue;
                    };
                    if is_out_of_flow(c) {
                        continue;
                    }
                    (self.preferred_outer_width(c), lvl == Level::Block)
                }
            };
            match row {
                Some(true) => {
                    line += w + if items > 0 { gap } else { 0.0 };
                    items += 1;
                }
                Some(false) => widest = widest.max(w),
                None if block => {
                    widest = widest.max(line).max(w);
                    line = 0.0;
                }
                None => line += w,
            }
        }
        widest.max(line)
    }

    fn preferred_outer_width(&self, el: &StyledElement<'_>) -> f32 {
        let bm = self.box_model(el, 0.0);
        let border_box = el.values.get("box-sizing") == Some("border-box")
            && el.values.length("width", None, self.viewport).is_some();
        let edges = if border_box {
            0.0
        } else {
            bm.border.horizontal() + bm.padding.horizontal()
        };
        self.preferred_content_width(el) + edges + bm.margin.horizontal()
    }

    fn clamp_axis(
        &self,
        el: &StyledElement<'_>,
        value: f32,
        min: &str,
        max: &str,
        basis: Option<f32>,
        edges: f32,
        border_box: bool,
    ) -> f32 {
        let adjust = |v: f32| if border_box { (v - edges).max(0.0) } else { v };
        let mut out = value;
        if let Some(mx) = el.values.length(max, basis, self.viewport) {
            out = out.min(adjust(mx));
        }
        if let Some(mn) = el.values.length(min, basis, self.viewport) {
            out = out.max(adjust(mn));
        }
        out.max(0.0)
    }

    /// Lay out `el` with its margin box at (`x`, `y`). Returns the margin box
    /// size.
    fn layout_element(
        &mut self,
        el: &StyledElement<'_>,
        x: f32,
        y: f32,
        avail: f32,
        containing_height: Option<f32>,
        shrink: bool,
    ) -> (f32, f32) {
        if level(el.values.display()).is_none() {
            return (0.0, 0.0);
        }
        let bm = self.box_model(el, avail);
        let edges_h = bm.border.horizontal() + bm.padding.horizontal();
        let edges_v = bm.border.vertical() + bm.padding.vertical();
        let border_box = el.values.get("box-sizing") == Some("border-box");
        let replaced = is_replaced(el);
        let inline_box = el.values.display() == "inline" && !replaced;

        let explicit_w = if inline_box {
            None
        } else {
            el.values
                .length("width", Some(avail), self.viewport)
                .map(|w| if border_box { (w - edges_h).max(0.0) } else { w })
        };
        let fill = (avail - bm.margin.horizontal() - edges_h).max(0.0);
        let content_w = match explicit_w {
            Some(w) => w,
            None if replaced => self.intrinsic_size(el).0,
            None if shrink || inline_box => self.preferred_content_width(el).min(fill),
            None => fill,
        };
        let content_w = self.clamp_axis(el, content_w, "min-width", "max-width", Some(avail), edges_h, border_box);

        let explicit_h = if inline_box {
            None
        } else {
            el.values
                .length("height", containing_height, self.viewport)
                .map(|h| if border_box { (h - edges_v).max(0.0) } else { h })
        };

        let cx = x + bm.margin.left + bm.border.left + bm.padding.left;
        let cy = y + bm.margin.top + bm.border.top + bm.padding.top;
        let content_h = if replaced {
            explicit_h.unwrap_or_else(|| self.intrinsic_size(el).1)
        } else {
            let children_h = self.layout_children(el, cx, cy, content_w, explicit_h);
            explicit_h.unwrap_or(children_h)
        };
        let content_h = self.clamp_axis(el, content_h, "min-height", "max-height", containing_height, edges_v, border_box);

        let rect = Rect {
            x: x + bm.margin.left,
            y: y + bm.margin.top,
            width: content_w + edges_h,
            height: content_h + edges_v,
        };
        if let Some(slot) = self.boxes.get_mut(el.index) {
            *slot = Some(LayoutBox { rect, box_model: bm });
        }
        (
            rect.width + bm.margin.horizontal(),
            rect.height + bm.margin.vertical(),
        )
    }

    /// Lay out the children of `el` inside its content box. Returns the
    /// content height they occupy.
    fn layout_children(
        &mut self,
        el: &StyledElement<'_>,
        cx: f32,
        cy: f32,
        width: f32,
        height: Option<f32>,
    ) -> f32 {
        let flex = flex_direction(el);
        let column_gap = el.values.length("column-gap", Some(width), self.viewport).unwrap_or(0.0);
        let row_gap = el.values.length("row-gap", height, self.viewport).unwrap_or(0.0);

        let mut cursor_y = cy;
        let mut line_x = 0.0f32;
        let mut line_h = 0.0f32;
        let mut placed = 0usize;

        for child in &el.children {
            match child {
                StyledChild::Text(text) => {
                    let (w, h) = self.text_size(text, el, (width - line_x).max(0.0));
                    if flex == Some(true) {
                        line_x += w + column_gap;
                        line_h = line_h.max(h);
                    } else if flex == Some(false) {
                        cursor_y += h + if placed > 0 { row_gap } else { 0.0 };
                    } else {
                        if line_x > 0.0 && line_x + w > width {
                            cursor_y += line_h;
                            line_x = 0.0;
                            line_h = 0.0;
                        }
                        line_x += w;
                        line_h = line_h.max(h);
                    }
                    placed += 1;
                }
                StyledChild::Element(c) => {
                    let Some(lvl) = level(c.values.display()) else {
                        continue;
                    };
                    if is_out_of_flow(c) {
                        let left = c.values.length("left", Some(width), self.viewport).unwrap_or(0.0);
                        let top = c.values.length("top", height, self.viewport).unwrap_or(0.0);
                        self.layout_element(c, cx + left, cy + top, width, height, true);
                        continue;
                    }
                    match flex {
                        Some(true) => {
                            let (w, h) = self.layout_element(c, cx + line_x, cursor_y, (width - line_x).max(0.0), height, true);
                            line_x += w + column_gap;
                            line_h = line_h.max(h);
                        }
                        Some(false) => {
                            if placed > 0 {
                                cursor_y += row_gap;
                            }
                            let (_, h) = self.layout_element(c, cx, cursor_y, width, height, false);
                            cursor_y += h;
                        }
                        None if lvl == Level::Block => {
                            cursor_y += line_h;
                            line_x = 0.0;
                            line_h = 0.0;
                            let (_, h) = self.layout_element(c, cx, cursor_y, width, height, false);
                            cursor_y += h;
                        }
                        None => {
                            let (mut w, mut h) = self.layout_element(c, cx + line_x, cursor_y, width, height, true);
                            if line_x > 0.0 && line_x + w > width {
                                cursor_y += line_h;
                                line_x = 0.0;
                                line_h = 0.0;
                                (w, h) = self.layout_element(c, cx, cursor_y, width, height, true);
                            }
                            line_x += w;
                            line_h = line_h.max(h);
                        }
                    }
                    placed += 1;
                }
            }
        }
        cursor_y + line_h - cy
    }
}

/// Lay out a styled document inside `viewport`.
pub fn layout_document(root: &StyledElement<'_>, viewport: Viewport) -> LayoutResult {
    let mut count = 0;
    root.walk(&mut |el| count = count.max(el.index + 1));

    let mut layouter = Layouter {
        viewport,
        boxes: vec![None; count],
    };
    let (_, root_h) = layouter.layout_element(
        root,
        0.0,
        0.0,
        viewport.width as f32,
        Some(viewport.height as f32),
        false,
    );
    let lowest = layouter
        .boxes
        .iter()
        .flatten()
        .map(|b| b.rect.bottom())
        .fold(0.0f32, f32::max);

    LayoutResult {
        boxes: layouter.boxes,
        document_height: root_h.max(lowest),
    }
}
