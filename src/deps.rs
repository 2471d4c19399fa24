//! Dependency resolution for isolated previews.
//!
//! Snippets lean on icon fonts, web fonts and utility-CSS runtimes they never
//! load themselves. Each known ecosystem is one row of [`KNOWN_DEPENDENCIES`]:
//! a detector over the snippet text and the head markup to inject when it
//! fires. Nothing here touches the network; the rendering context fetches the
//! referenced resources.

use std::sync::OnceLock;

use log::debug;
use regex::Regex;

/// How a dependency is recognised in snippet text
#[derive(Debug, Clone, Copy)]
pub enum Detector {
    /// Regex over the whole snippet
    Pattern(&'static str),
    /// Regex over the joined values of every `class="…"` attribute
    ClassTokens(&'static str),
}

/// One known ecosystem and what it needs in the document head
#[derive(Debug, Clone, Copy)]
pub struct DependencySpec {
    pub name: &'static str,
    /// Any matching detector enables the dependency
    pub detectors: &'static [Detector],
    /// Head markup injected verbatim, in order
    pub injections: &'static [&'static str],
    /// Generated stylesheet appended after the injections
    pub shim: Option<fn() -> String>,
}

const TAILWIND_UTILITY: &str = r"(?i)\b(bg|text|border|shadow|rounded|p|px|py|m|mx|my|flex|grid|gap|justify|items|w|h|min-w|min-h|max-w|max-h|overflow|object|z|inset|top|left|right|bottom|translate|rotate|scale|skew)-[a-z0-9]";

const MATERIAL_SYMBOLS_OUTLINED: &str = r#"<link rel="stylesheet" href="https://fonts.googleapis.com/css2?family=Material+Symbols+Outlined:opsz,wght,FILL,GRAD@20..48,200..700,0..1,-50..200" />"#;
const MATERIAL_SYMBOLS_ROUNDED: &str = r#"<link rel="stylesheet" href="https://fonts.googleapis.com/css2?family=Material+Symbols+Rounded:opsz,wght,FILL,GRAD@20..48,200..700,0..1,-50..200" />"#;
const MATERIAL_SYMBOLS_SHARP: &str = r#"<link rel="stylesheet" href="https://fonts.googleapis.com/css2?family=Material+Symbols+Sharp:opsz,wght,FILL,GRAD@20..48,200..700,0..1,-50..200" />"#;

/// Link injected for the "Press Start 2P" pixel font.
pub const PRESS_START_FONT_LINK: &str =
    r#"<link href="https://fonts.googleapis.com/css2?family=Press+Start+2P&display=swap" rel="stylesheet">"#;

/// Every ecosystem the resolver knows, in injection order.
pub static KNOWN_DEPENDENCIES: &[DependencySpec] = &[
    DependencySpec {
        name: "tailwind",
        detectors: &[Detector::ClassTokens(TAILWIND_UTILITY)],
        injections: &[
            "<script>window.tailwind = { config: { corePlugins: { preflight: false } } };</script>",
            r#"<script src="https://cdn.tailwindcss.com"></script>"#,
        ],
        shim: Some(legacy_shim_css),
    },
    DependencySpec {
        name: "font-awesome",
        detectors: &[
            Detector::Pattern(r"\bfa[srlb]?-"),
            Detector::Pattern(r"(?i)font-awesome"),
        ],
        injections: &[
            r#"<link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.5.2/css/all.min.css" referrerpolicy="no-referrer" />"#,
        ],
        shim: None,
    },
    DependencySpec {
        name: "remixicon",
        detectors: &[Detector::Pattern(r"\bri-[\w-]+")],
        injections: &[
            r#"<link href="https://cdn.jsdelivr.net/npm/remixicon@4.3.0/fonts/remixicon.css" rel="stylesheet">"#,
        ],
        shim: None,
    },
    DependencySpec {
        name: "boxicons",
        detectors: &[Detector::Pattern(r"\bbx[sl]?-[\w-]+")],
        injections: &[
            r#"<link href="https://unpkg.com/boxicons@2.1.4/css/boxicons.min.css" rel="stylesheet">"#,
        ],
        shim: None,
    },
    DependencySpec {
        name: "material-symbols",
        detectors: &[Detector::Pattern(
            r"\bmaterial-symbols-(?:outlined|rounded|sharp)\b",
        )],
        injections: &[
            MATERIAL_SYMBOLS_OUTLINED,
            MATERIAL_SYMBOLS_ROUNDED,
            MATERIAL_SYMBOLS_SHARP,
        ],
        shim: None,
    },
    DependencySpec {
        name: "press-start-2p",
        detectors: &[Detector::Pattern(r"(?i)press\s*start\s*2p")],
        injections: &[PRESS_START_FONT_LINK],
        shim: None,
    },
];

/// Hosts whose `<link>` tags are carried over from the snippet.
const PULLED_LINK_HOSTS: &str = r"(?i)fonts\.googleapis\.com|gstatic|font-awesome|remixicon|boxicons|material";

fn class_attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?is)class\s*=\s*"(.*?)""#).expect("valid regex"))
}

fn link_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<link[^>]+>").expect("valid regex"))
}

fn pulled_host_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PULLED_LINK_HOSTS).expect("valid regex"))
}

/// Compiled detectors, one slot per [`KNOWN_DEPENDENCIES`] row.
fn compiled_detectors() -> &'static [Vec<(bool, Regex)>] {
    static COMPILED: OnceLock<Vec<Vec<(bool, Regex)>>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        KNOWN_DEPENDENCIES
            .iter()
            .map(|spec| {
                spec.detectors
                    .iter()
                    .map(|d| match d {
                        Detector::Pattern(p) => (false, Regex::new(p).expect("valid detector")),
                        Detector::ClassTokens(p) => (true, Regex::new(p).expect("valid detector")),
                    })
                    .collect()
            })
            .collect()
    })
}

fn joined_classes(code: &str) -> String {
    class_attr_re()
        .captures_iter(code)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Names of the known dependencies the code needs, in table order.
pub fn detect_dependencies(code: &str) -> Vec<&'static str> {
    let classes = joined_classes(code);
    KNOWN_DEPENDENCIES
        .iter()
        .zip(compiled_detectors())
        .filter(|(_, detectors)| {
            detectors.iter().any(|(on_classes, re)| {
                if *on_classes {
                    re.is_match(&classes)
                } else {
                    re.is_match(code)
                }
            })
        })
        .map(|(spec, _)| spec.name)
        .collect()
}

/// `<link>` tags in the snippet that point at known font/icon hosts.
pub fn extract_known_links(code: &str) -> Vec<String> {
    link_tag_re()
        .find_iter(code)
        .map(|m| m.as_str())
        .filter(|tag| pulled_host_re().is_match(tag))
        .map(str::to_string)
        .collect()
}

/// Ordered head injections for `code`: table output first, then any known
/// `<link>` tags already present in the snippet. Duplicates are allowed.
pub fn resolve_dependencies(code: &str) -> Vec<String> {
    let detected = detect_dependencies(code);
    let mut out = Vec::new();
    for spec in KNOWN_DEPENDENCIES.iter().filter(|s| detected.contains(&s.name)) {
        out.extend(spec.injections.iter().map(|s| s.to_string()));
        if let Some(shim) = spec.shim {
            out.push(shim());
        }
    }
    out.extend(extract_known_links(code));
    debug!("resolved dependencies {:?} ({} head entries)", detected, out.len());
    out
}

const SHIM_COLORS: &[&str] = &[
    "gray", "grey", "red", "orange", "amber", "yellow", "lime", "green", "emerald", "teal", "cyan",
    "sky", "blue", "indigo", "violet", "purple", "fuchsia", "pink", "rose",
];
const SHIM_SHADES: &[u32] = &[50, 100, 200, 300, 400, 500, 600, 700, 800, 900];
const SHIM_STATES: &[&str] = &["hover", "focus", "active"];
const SHIM_AXES: &[&str] = &["bg", "text", "border"];

/// Backward-compatibility aliases for legacy utility class names, as a
/// `text/tailwindcss` stylesheet. Output order is fixed.
pub fn legacy_shim_css() -> String {
    let mut lines = vec!["@layer utilities {".to_string()];

    for n in SHIM_SHADES {
        for axis in SHIM_AXES {
            lines.push(format!(".{axis}-grey-{n} {{ @apply {axis}-gray-{n}; }}"));
        }
        for state in SHIM_STATES {
            for axis in SHIM_AXES {
                lines.push(format!(
                    ".{state}\\:{axis}-grey-{n}:{state} {{ @apply {state}:{axis}-gray-{n}; }}"
                ));
            }
        }
    }

    for axis in SHIM_AXES {
        lines.push(format!(".{axis}-grey {{ @apply {axis}-gray-500; }}"));
    }
    for state in SHIM_STATES {
        for axis in SHIM_AXES {
            lines.push(format!(
                ".{state}\\:{axis}-grey:{state} {{ @apply {state}:{axis}-gray-500; }}"
            ));
        }
    }

    // (suffix, shade) pairs: base, light, dark
    let tones: [(&str, u32); 3] = [("", 500), ("-light", 400), ("-dark", 600)];
    for color in SHIM_COLORS {
        let base = if *color == "grey" { "gray" } else { color };
        for axis in SHIM_AXES {
            lines.push(format!(".{axis}-{color} {{ @apply {axis}-{base}-500; }}"));
        }
        for axis in SHIM_AXES {
            for (suffix, shade) in &tones[1..] {
                lines.push(format!(".{axis}-{color}{suffix} {{ @apply {axis}-{base}-{shade}; }}"));
            }
        }
        for state in SHIM_STATES {
            for axis in SHIM_AXES {
                let (suffix, shade) = tones[0];
                lines.push(format!(
                    ".{state}\\:{axis}-{color}{suffix}:{state} {{ @apply {state}:{axis}-{base}-{shade}; }}"
                ));
            }
            for axis in SHIM_AXES {
                for (suffix, shade) in &tones[1..] {
                    lines.push(format!(
                        ".{state}\\:{axis}-{color}{suffix}:{state} {{ @apply {state}:{axis}-{base}-{shade}; }}"
                    ));
                }
            }
        }
    }

    lines.push(".rounded-0 { @apply rounded-none; }".into());
    lines.push(".rounded-1 { @apply rounded-sm; }".into());
    lines.push(".rounded-2 { @apply rounded; }".into());
    lines.push(".rounded-3 { @apply rounded-lg; }".into());
    lines.push("}".into());

    format!("<style type=\"text/tailwindcss\">\n{}\n</style>", lines.join("\n"))
}
