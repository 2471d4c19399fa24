//! Chrome DevTools Protocol rendering context
//!
//! Each composed document is shown the way the catalog shows it: inside a
//! sandboxed `<iframe srcdoc>` on a host page. Probes run in the host page
//! and reach into the frame's document, which requires the sandbox policy to
//! grant `allow-same-origin`.

use std::sync::Arc;
use std::time::Duration;

use headless_chrome::browser::tab::Tab;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, warn};
use serde_json::Value;

use crate::rendering::{ElementProbe, RenderContext};
use crate::sandbox::escape_srcdoc;
use crate::{ComposedDocument, Error, PreviewConfig, Result, SandboxPolicy, Viewport};

const FRAME_ID: &str = "__rfpreview_frame";

/// Preamble binding `doc` to the preview frame's document
const FRAME_DOC: &str = r#"
    const frame = document.getElementById('__rfpreview_frame');
    const doc = frame && frame.contentDocument;
    if (!doc) throw new Error('preview frame document is not reachable');
"#;

/// Headless Chrome as an isolated rendering context
pub struct CdpRenderer {
    // kept alive for as long as the tab is in use
    _browser: Browser,
    tab: Arc<Tab>,
    viewport: Viewport,
    sandbox: SandboxPolicy,
    loaded: bool,
}

impl CdpRenderer {
    /// Launch headless Chrome and open a tab sized to the configured viewport.
    pub fn new(config: &PreviewConfig) -> Result<Self> {
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((config.viewport.width, config.viewport.height)))
            .build()
            .map_err(|e| Error::InitializationError(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::InitializationError(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::InitializationError(format!("Failed to create tab: {}", e)))?;

        if !config.sandbox.same_origin {
            warn!("sandbox without allow-same-origin: probes cannot reach the preview frame");
        }

        Ok(Self {
            _browser: browser,
            tab,
            viewport: config.viewport,
            sandbox: config.sandbox,
            loaded: false,
        })
    }

    fn host_page(&self, document: &ComposedDocument) -> ComposedDocument {
        ComposedDocument::new(format!(
            r#"<!doctype html><html><head><style>html,body{{margin:0;padding:0}}</style></head><body><iframe id="{}" title="component-preview" sandbox="{}" style="display:block;border:0;width:{}px;height:{}px" srcdoc="{}"></iframe></body></html>"#,
            FRAME_ID,
            self.sandbox.attribute(),
            self.viewport.width,
            self.viewport.height,
            escape_srcdoc(document.as_str())
        ))
    }

    /// Evaluate `body` with `doc` bound to the frame document and await the
    /// result. `body` must `return` a value.
    fn eval_in_frame(&self, body: &str) -> Result<Value> {
        let script = format!("(async function() {{ {} {} }})()", FRAME_DOC, body);
        let result = self.tab.evaluate(&script, true)?;
        result
            .value
            .ok_or_else(|| Error::RenderError("No value returned from evaluation".into()))
    }

    fn ensure_loaded(&self) -> Result<()> {
        if self.loaded {
            Ok(())
        } else {
            Err(Error::RenderError("no document loaded".into()))
        }
    }
}

impl RenderContext for CdpRenderer {
    fn load(&mut self, document: &ComposedDocument) -> Result<()> {
        self.loaded = false;
        let host = self.host_page(document);

        self.tab
            .navigate_to(&host.data_url())
            .map_err(|e| Error::LoadError(format!("Navigation failed: {}", e)))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| Error::LoadError(format!("Wait for navigation failed: {}", e)))?;

        // the frame's load event is the single-fire load signal
        let script = format!(
            r#"(function() {{
                const frame = document.getElementById('{}');
                return new Promise(function(resolve) {{
                    const doc = frame.contentDocument;
                    if (doc && doc.readyState === 'complete') {{ resolve(true); return; }}
                    frame.addEventListener('load', function() {{ resolve(true); }}, {{ once: true }});
                }});
            }})()"#,
            FRAME_ID
        );
        self.tab
            .evaluate(&script, true)
            .map_err(|e| Error::LoadError(format!("Frame did not load: {}", e)))?;

        debug!("preview frame loaded ({} bytes)", document.as_str().len());
        self.loaded = true;
        Ok(())
    }

    fn inject_style(&mut self, css: &str) -> Result<()> {
        self.ensure_loaded()?;
        let css = serde_json::to_string(css)
            .map_err(|e| Error::RenderError(format!("Failed to encode stylesheet: {}", e)))?;
        self.eval_in_frame(
            &format!(
                "const s = doc.createElement('style'); s.textContent = {}; \
                 (doc.head || doc.documentElement).appendChild(s); return true;",
                css
            ),
        )?;
        Ok(())
    }

    fn probe(&self, selector: &str) -> Result<Vec<ElementProbe>> {
        self.ensure_loaded()?;
        let selector = serde_json::to_string(selector)
            .map_err(|e| Error::RenderError(format!("Failed to encode selector: {}", e)))?;
        let body = format!(
            r#"
            const view = doc.defaultView;
            const out = Array.from(doc.querySelectorAll({})).map(function(node) {{
                const cs = view.getComputedStyle(node);
                const r = node.getBoundingClientRect();
                return {{
                    style: {{
                        display: cs.display,
                        visibility: cs.visibility,
                        opacity: cs.opacity,
                        borderTopLeftRadius: cs.borderTopLeftRadius,
                        borderTopRightRadius: cs.borderTopRightRadius,
                        borderBottomLeftRadius: cs.borderBottomLeftRadius,
                        borderBottomRightRadius: cs.borderBottomRightRadius,
                        boxShadow: cs.boxShadow,
                        backgroundImage: cs.backgroundImage,
                        backgroundColor: cs.backgroundColor,
                        borderTopWidth: cs.borderTopWidth,
                        borderRightWidth: cs.borderRightWidth,
                        borderBottomWidth: cs.borderBottomWidth,
                        borderLeftWidth: cs.borderLeftWidth,
                        transform: cs.transform,
                        filter: cs.filter,
                        backdropFilter: cs.backdropFilter,
                        transitionDuration: cs.transitionDuration,
                        animationName: cs.animationName
                    }},
                    rect: {{ x: r.x, y: r.y, width: r.width, height: r.height }}
                }};
            }});
            return JSON.stringify(out);
            "#,
            selector
        );
        let value = self.eval_in_frame(&body)?;
        let json = value
            .as_str()
            .ok_or_else(|| Error::RenderError("probe did not return a string".into()))?;
        serde_json::from_str(json).map_err(|e| Error::RenderError(format!("Malformed probe result: {}", e)))
    }

    fn scroll_height(&self) -> Result<u32> {
        self.ensure_loaded()?;
        let value = self.eval_in_frame(
            "return Math.max(doc.documentElement ? doc.documentElement.scrollHeight : 0, \
             doc.body ? doc.body.scrollHeight : 0);",
        )?;
        value
            .as_f64()
            .map(|h| h.max(0.0).ceil() as u32)
            .ok_or_else(|| Error::RenderError(format!("scrollHeight is not a number: {}", value)))
    }

    fn wait_for_fonts(&mut self, timeout: Duration) -> Result<bool> {
        self.ensure_loaded()?;
        let body = format!(
            "if (!doc.fonts || !doc.fonts.ready) return true; \
             return await Promise.race([doc.fonts.ready.then(function() {{ return true; }}), \
             new Promise(function(r) {{ setTimeout(function() {{ r(false); }}, {}); }})]);",
            timeout.as_millis()
        );
        let value = self.eval_in_frame(&body)?;
        Ok(value.as_bool().unwrap_or(false))
    }

    fn is_dynamic(&self) -> bool {
        true
    }

    fn unload(&mut self) {
        self.loaded = false;
        if let Err(e) = self.tab.navigate_to("about:blank") {
            warn!("Failed to unload preview: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> Option<CdpRenderer> {
        // This test requires Chrome to be installed, so we skip it in CI
        if std::env::var("CI").is_ok() {
            return None;
        }
        match CdpRenderer::new(&PreviewConfig::default()) {
            Ok(r) => Some(r),
            Err(e) => {
                eprintln!("Skipping CDP test because Chrome is not available or failed to launch: {}", e);
                None
            }
        }
    }

    #[test]
    fn test_host_page_embeds_escaped_document() {
        let Some(r) = renderer() else { return };
        let host = r.host_page(&ComposedDocument::new(r#"<p class="x">a&b</p>"#));
        assert!(host.as_str().contains(r#"srcdoc="<p class=&quot;x&quot;>a&amp;b</p>""#));
        assert!(host.as_str().contains("allow-same-origin"));
    }

    #[test]
    fn test_cdp_probe_styled_button() {
        let Some(mut r) = renderer() else { return };
        let doc = ComposedDocument::new(
            r#"<!doctype html><html><body><button style="background:#222;border-radius:8px;width:120px;height:40px">Button</button></body></html>"#,
        );
        r.load(&doc).unwrap();
        let probes = r.probe("button").unwrap();
        assert_eq!(probes.len(), 1);
        assert_eq!(probes[0].style.background_color, "rgb(34, 34, 34)");
        assert_eq!(probes[0].rect.width, 120.0);
        assert!(r.scroll_height().unwrap() > 0);
    }
}
