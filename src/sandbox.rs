//! Sandbox policy and the rendered view handed back to callers

use serde::{Deserialize, Serialize};

use crate::ComposedDocument;

/// Capabilities granted to the isolated preview context.
///
/// Top-level navigation is never grantable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxPolicy {
    pub scripts: bool,
    pub forms: bool,
    pub pointer_lock: bool,
    pub popups: bool,
    pub modals: bool,
    pub same_origin: bool,
}

impl Default for SandboxPolicy {
    fn default() -> Self {
        Self {
            scripts: true,
            forms: true,
            pointer_lock: true,
            popups: true,
            modals: true,
            same_origin: true,
        }
    }
}

impl SandboxPolicy {
    /// Nothing granted.
    pub fn locked() -> Self {
        Self {
            scripts: false,
            forms: false,
            pointer_lock: false,
            popups: false,
            modals: false,
            same_origin: false,
        }
    }

    /// Value of the iframe `sandbox` attribute.
    pub fn attribute(&self) -> String {
        [
            (self.scripts, "allow-scripts"),
            (self.forms, "allow-forms"),
            (self.pointer_lock, "allow-pointer-lock"),
            (self.popups, "allow-popups"),
            (self.modals, "allow-modals"),
            (self.same_origin, "allow-same-origin"),
        ]
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, token)| *token)
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// Escape a document for use inside a double-quoted `srcdoc` attribute.
pub fn escape_srcdoc(html: &str) -> String {
    html.replace('&', "&amp;").replace('"', "&quot;")
}

/// Sandboxed `<iframe>` markup showing `document` at `height` pixels.
pub fn iframe_view(document: &ComposedDocument, policy: &SandboxPolicy, height: u32) -> String {
    format!(
        r#"<iframe title="component-preview" sandbox="{}" style="width:100%;border:1px solid rgba(0,0,0,.08);border-radius:12px;height:{}px;background:transparent" srcdoc="{}"></iframe>"#,
        policy.attribute(),
        height,
        escape_srcdoc(document.as_str())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_attribute() {
        assert_eq!(
            SandboxPolicy::default().attribute(),
            "allow-scripts allow-forms allow-pointer-lock allow-popups allow-modals allow-same-origin"
        );
        assert_eq!(SandboxPolicy::locked().attribute(), "");
    }

    #[test]
    fn iframe_escapes_document() {
        let doc = ComposedDocument::new(r#"<p class="a">A &amp; B</p>"#);
        let view = iframe_view(&doc, &SandboxPolicy::default(), 360);
        assert!(view.contains(r#"srcdoc="<p class=&quot;a&quot;>A &amp;amp; B</p>""#));
        assert!(view.contains("height:360px"));
        assert!(!view.contains("allow-top-navigation"));
    }
}
