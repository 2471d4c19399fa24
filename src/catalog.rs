//! Catalog-side helpers: the fast static cut applied before a preview is
//! requested, and a per-item decision cache.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, OnceLock};

use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::gate::has_button_signature;
use crate::RenderDecision;

fn button_text_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)>[^<]*Button[^<]*<").expect("valid regex"))
}

/// Whether some text between tags mentions "Button".
pub fn includes_button_text(html: &str) -> bool {
    button_text_re().is_match(html)
}

/// Fast static cut: the decoded code has a button signature and visible
/// "Button" text.
///
/// # Examples
///
/// ```
/// use rfpreview::catalog::admits;
///
/// assert!(admits("&lt;button class=&quot;btn&quot;&gt;Button&lt;/button&gt;"));
/// assert!(!admits("<button>Go</button>"));
/// ```
pub fn admits(code: &str) -> bool {
    let decoded = htmlize::unescape(code);
    has_button_signature(&decoded) && includes_button_text(&decoded)
}

/// One catalog record as served by the component API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogItem {
    pub id: Option<String>,
    #[serde(rename = "_id")]
    pub object_id: Option<String>,
    pub slug: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub code: String,
}

impl CatalogItem {
    /// Identity of the item: `id`, then `_id`, then `slug`, then its
    /// position in the listing.
    pub fn key(&self, index: usize) -> String {
        self.id
            .clone()
            .or_else(|| self.object_id.clone())
            .or_else(|| self.slug.clone())
            .unwrap_or_else(|| format!("row-{index}"))
    }
}

/// Thread-safe cache of decisions keyed by item identity
#[derive(Debug, Default)]
pub struct DecisionCache {
    decisions: Mutex<HashMap<String, RenderDecision>>,
}

impl DecisionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<RenderDecision> {
        self.lock().get(key).copied()
    }

    /// Record a decision. A later decision for the same key replaces the
    /// earlier one.
    pub fn record(&self, key: impl Into<String>, decision: RenderDecision) {
        let key = key.into();
        if !decision.accepted {
            debug!("hiding catalog item {}", key);
        }
        self.lock().insert(key, decision);
    }

    /// Whether the item was rejected and should stay hidden.
    pub fn is_hidden(&self, key: &str) -> bool {
        self.get(key).is_some_and(|d| !d.accepted)
    }

    pub fn hidden_ids(&self) -> HashSet<String> {
        self.lock()
            .iter()
            .filter(|(_, d)| !d.accepted)
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Cached decision for `key`, or evaluate and record it. The lock is not
    /// held while `evaluate` runs.
    pub fn get_or_evaluate(
        &self,
        key: &str,
        evaluate: impl FnOnce() -> RenderDecision,
    ) -> RenderDecision {
        if let Some(d) = self.get(key) {
            return d;
        }
        let decision = evaluate();
        self.record(key, decision);
        decision
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Forget everything, as when the catalog switches category.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, RenderDecision>> {
        self.decisions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
