//! Utility-class resolution for documents that load the Tailwind runtime.
//!
//! The runtime generates one rule per utility class it finds in the page. The
//! static engine cannot run it, so this module answers the same question
//! directly: which declarations does a class token stand for. Coverage is the
//! default theme for the families that decide a preview (color, spacing,
//! sizing, radius, shadow, borders, effects, transitions) plus arbitrary
//! `[value]` forms. Unknown tokens resolve to nothing.

use super::css::Declaration;
use crate::Viewport;

/// Default palette, shades 50 through 950
const PALETTE: &[(&str, [&str; 11])] = &[
    ("slate", ["#f8fafc", "#f1f5f9", "#e2e8f0", "#cbd5e1", "#94a3b8", "#64748b", "#475569", "#334155", "#1e293b", "#0f172a", "#020617"]),
    ("gray", ["#f9fafb", "#f3f4f6", "#e5e7eb", "#d1d5db", "#9ca3af", "#6b7280", "#4b5563", "#374151", "#1f2937", "#111827", "#030712"]),
    ("zinc", ["#fafafa", "#f4f4f5", "#e4e4e7", "#d4d4d8", "#a1a1aa", "#71717a", "#52525b", "#3f3f46", "#27272a", "#18181b", "#09090b"]),
    ("neutral", ["#fafafa", "#f5f5f5", "#e5e5e5", "#d4d4d4", "#a3a3a3", "#737373", "#525252", "#404040", "#262626", "#171717", "#0a0a0a"]),
    ("stone", ["#fafaf9", "#f5f5f4", "#e7e5e4", "#d6d3d1", "#a8a29e", "#78716c", "#57534e", "#44403c", "#292524", "#1c1917", "#0c0a09"]),
    ("red", ["#fef2f2", "#fee2e2", "#fecaca", "#fca5a5", "#f87171", "#ef4444", "#dc2626", "#b91c1c", "#991b1b", "#7f1d1d", "#450a0a"]),
    ("orange", ["#fff7ed", "#ffedd5", "#fed7aa", "#fdba74", "#fb923c", "#f97316", "#ea580c", "#c2410c", "#9a3412", "#7c2d12", "#431407"]),
    ("amber", ["#fffbeb", "#fef3c7", "#fde68a", "#fcd34d", "#fbbf24", "#f59e0b", "#d97706", "#b45309", "#92400e", "#78350f", "#451a03"]),
    ("yellow", ["#fefce8", "#fef9c3", "#fef08a", "#fde047", "#facc15", "#eab308", "#ca8a04", "#a16207", "#854d0e", "#713f12", "#422006"]),
    ("lime", ["#f7fee7", "#ecfccb", "#d9f99d", "#bef264", "#a3e635", "#84cc16", "#65a30d", "#4d7c0f", "#3f6212", "#365314", "#1a2e05"]),
    ("green", ["#f0fdf4", "#dcfce7", "#bbf7d0", "#86efac", "#4ade80", "#22c55e", "#16a34a", "#15803d", "#166534", "#14532d", "#052e16"]),
    ("emerald", ["#ecfdf5", "#d1fae5", "#a7f3d0", "#6ee7b7", "#34d399", "#10b981", "#059669", "#047857", "#065f46", "#064e3b", "#022c22"]),
    ("teal", ["#f0fdfa", "#ccfbf1", "#99f6e4", "#5eead4", "#2dd4bf", "#14b8a6", "#0d9488", "#0f766e", "#115e59", "#134e4a", "#042f2e"]),
    ("cyan", ["#ecfeff", "#cffafe", "#a5f3fc", "#67e8f9", "#22d3ee", "#06b6d4", "#0891b2", "#0e7490", "#155e75", "#164e63", "#083344"]),
    ("sky", ["#f0f9ff", "#e0f2fe", "#bae6fd", "#7dd3fc", "#38bdf8", "#0ea5e9", "#0284c7", "#0369a1", "#075985", "#0c4a6e", "#082f49"]),
    ("blue", ["#eff6ff", "#dbeafe", "#bfdbfe", "#93c5fd", "#60a5fa", "#3b82f6", "#2563eb", "#1d4ed8", "#1e40af", "#1e3a8a", "#172554"]),
    ("indigo", ["#eef2ff", "#e0e7ff", "#c7d2fe", "#a5b4fc", "#818cf8", "#6366f1", "#4f46e5", "#4338ca", "#3730a3", "#312e81", "#1e1b4b"]),
    ("violet", ["#f5f3ff", "#ede9fe", "#ddd6fe", "#c4b5fd", "#a78bfa", "#8b5cf6", "#7c3aed", "#6d28d9", "#5b21b6", "#4c1d95", "#2e1065"]),
    ("purple", ["#faf5ff", "#f3e8ff", "#e9d5ff", "#d8b4fe", "#c084fc", "#a855f7", "#9333ea", "#7e22ce", "#6b21a8", "#581c87", "#3b0764"]),
    ("fuchsia", ["#fdf4ff", "#fae8ff", "#f5d0fe", "#f0abfc", "#e879f9", "#d946ef", "#c026d3", "#a21caf", "#86198f", "#701a75", "#4a044e"]),
    ("pink", ["#fdf2f8", "#fce7f3", "#fbcfe8", "#f9a8d4", "#f472b6", "#ec4899", "#db2777", "#be185d", "#9d174d", "#831843", "#500724"]),
    ("rose", ["#fff1f2", "#ffe4e6", "#fecdd3", "#fda4af", "#fb7185", "#f43f5e", "#e11d48", "#be123c", "#9f1239", "#881337", "#4c0519"]),
];

const SHADES: [u32; 11] = [50, 100, 200, 300, 400, 500, 600, 700, 800, 900, 950];

/// Responsive variants and their minimum viewport width
const BREAKPOINTS: &[(&str, u32)] = &[("sm", 640), ("md", 768), ("lg", 1024), ("xl", 1280), ("2xl", 1536)];

const RADII: &[(&str, &str)] = &[
    ("none", "0px"),
    ("sm", "0.125rem"),
    ("", "0.25rem"),
    ("md", "0.375rem"),
    ("lg", "0.5rem"),
    ("xl", "0.75rem"),
    ("2xl", "1rem"),
    ("3xl", "1.5rem"),
    ("full", "9999px"),
];

const SHADOWS: &[(&str, &str)] = &[
    ("sm", "0 1px 2px 0 rgb(0 0 0 / 0.05)"),
    ("", "0 1px 3px 0 rgb(0 0 0 / 0.1), 0 1px 2px -1px rgb(0 0 0 / 0.1)"),
    ("md", "0 4px 6px -1px rgb(0 0 0 / 0.1), 0 2px 4px -2px rgb(0 0 0 / 0.1)"),
    ("lg", "0 10px 15px -3px rgb(0 0 0 / 0.1), 0 4px 6px -4px rgb(0 0 0 / 0.1)"),
    ("xl", "0 20px 25px -5px rgb(0 0 0 / 0.1), 0 8px 10px -6px rgb(0 0 0 / 0.1)"),
    ("2xl", "0 25px 50px -12px rgb(0 0 0 / 0.25)"),
    ("inner", "inset 0 2px 4px 0 rgb(0 0 0 / 0.05)"),
    ("none", "none"),
];

/// (name, font-size, line-height)
const FONT_SIZES: &[(&str, &str, &str)] = &[
    ("xs", "0.75rem", "1rem"),
    ("sm", "0.875rem", "1.25rem"),
    ("base", "1rem", "1.5rem"),
    ("lg", "1.125rem", "1.75rem"),
    ("xl", "1.25rem", "1.75rem"),
    ("2xl", "1.5rem", "2rem"),
    ("3xl", "1.875rem", "2.25rem"),
    ("4xl", "2.25rem", "2.5rem"),
    ("5xl", "3rem", "1"),
    ("6xl", "3.75rem", "1"),
    ("7xl", "4.5rem", "1"),
    ("8xl", "6rem", "1"),
    ("9xl", "8rem", "1"),
];

const BLURS: &[(&str, &str)] = &[
    ("none", "0"),
    ("sm", "4px"),
    ("", "8px"),
    ("md", "12px"),
    ("lg", "16px"),
    ("xl", "24px"),
    ("2xl", "40px"),
    ("3xl", "64px"),
];

const DISPLAYS: &[(&str, &str)] = &[
    ("block", "block"),
    ("inline-block", "inline-block"),
    ("inline", "inline"),
    ("flex", "flex"),
    ("inline-flex", "inline-flex"),
    ("grid", "grid"),
    ("inline-grid", "inline-grid"),
    ("table", "table"),
    ("contents", "contents"),
    ("hidden", "none"),
];

const GRADIENT_DIRECTIONS: &[(&str, &str)] = &[
    ("t", "to top"),
    ("tr", "to top right"),
    ("r", "to right"),
    ("br", "to bottom right"),
    ("b", "to bottom"),
    ("bl", "to bottom left"),
    ("l", "to left"),
    ("tl", "to top left"),
];

const GRADIENT_STOPS: &str = "var(--tw-gradient-from), var(--tw-gradient-via, var(--tw-gradient-to, transparent)), var(--tw-gradient-to, transparent)";

fn lookup<'a>(table: &'a [(&str, &str)], key: &str) -> Option<&'a str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// `[12px]` → `12px`, with `_` standing for a space.
fn arbitrary(value: &str) -> Option<String> {
    let inner = value.strip_prefix('[')?.strip_suffix(']')?;
    if inner.is_empty() {
        return None;
    }
    Some(inner.replace('_', " "))
}

fn is_color_literal(value: &str) -> bool {
    csscolorparser::parse(value).is_ok()
}

/// Theme color for `blue-500`, `white`, `black/50`, `[#123456]`.
fn color(value: &str) -> Option<String> {
    if let Some(v) = arbitrary(value) {
        return is_color_literal(&v).then_some(v);
    }
    let (name, alpha) = match value.split_once('/') {
        Some((name, a)) => (name, Some(a.parse::<f32>().ok()? / 100.0)),
        None => (value, None),
    };
    let base = match name {
        "transparent" => return Some("transparent".into()),
        "current" => return Some("currentcolor".into()),
        "inherit" => return Some("inherit".into()),
        "white" => "#ffffff",
        "black" => "#000000",
        _ => {
            let (family, shade) = name.rsplit_once('-')?;
            let shade: u32 = shade.parse().ok()?;
            let shades = PALETTE.iter().find(|(f, _)| *f == family)?.1;
            shades[SHADES.iter().position(|s| *s == shade)?]
        }
    };
    match alpha {
        None => Some(base.to_string()),
        Some(a) => {
            let c = csscolorparser::parse(base).ok()?;
            let channel = |v: f64| (v * 255.0).round().clamp(0.0, 255.0) as u8;
            Some(format!(
                "rgba({}, {}, {}, {})",
                channel(c.r),
                channel(c.g),
                channel(c.b),
                a.clamp(0.0, 1.0)
            ))
        }
    }
}

/// Spacing scale: `4` → `1rem`, `px` → `1px`, `1.5` → `0.375rem`.
fn spacing(value: &str) -> Option<String> {
    if let Some(v) = arbitrary(value) {
        return Some(v);
    }
    if value == "px" {
        return Some("1px".into());
    }
    if value == "0" {
        return Some("0px".into());
    }
    let n: f32 = value.parse().ok()?;
    if n < 0.0 || (n * 2.0).fract() != 0.0 {
        return None;
    }
    Some(format!("{}rem", n / 4.0))
}

/// Sizing for `w-*` and `h-*`: spacing, fractions and keywords.
fn size(value: &str, axis_screen: &str) -> Option<String> {
    match value {
        "auto" => Some("auto".into()),
        "full" => Some("100%".into()),
        "screen" => Some(axis_screen.into()),
        "fit" => Some("fit-content".into()),
        "min" => Some("min-content".into()),
        "max" => Some("max-content".into()),
        _ => {
            if let Some((a, b)) = value.split_once('/') {
                let a: f32 = a.parse().ok()?;
                let b: f32 = b.parse().ok()?;
                if b == 0.0 {
                    return None;
                }
                return Some(format!("{}%", a / b * 100.0));
            }
            spacing(value)
        }
    }
}

fn negate(value: String, negative: bool) -> String {
    if negative {
        format!("calc({value} * -1)")
    } else {
        value
    }
}

fn decl(name: &str, value: impl Into<String>) -> Declaration {
    Declaration::new(name, value)
}

fn sides(key: &str) -> Option<&'static [&'static str]> {
    const ALL: &[&str] = &["-top", "-right", "-bottom", "-left"];
    const X: &[&str] = &["-left", "-right"];
    const Y: &[&str] = &["-top", "-bottom"];
    const T: &[&str] = &["-top"];
    const R: &[&str] = &["-right"];
    const B: &[&str] = &["-bottom"];
    const L: &[&str] = &["-left"];
    Some(match key {
        "" => ALL,
        "x" => X,
        "y" => Y,
        "t" => T,
        "r" => R,
        "b" => B,
        "l" => L,
        _ => return None,
    })
}

/// Margin and padding: `p-4`, `px-2`, `mt-1`, `-mx-2`, `m-auto`.
fn box_spacing(utility: &str, negative: bool) -> Option<Vec<Declaration>> {
    let (head, value) = utility.split_once('-')?;
    let (property, key) = if let Some(key) = head.strip_prefix('p') {
        ("padding", key)
    } else if let Some(key) = head.strip_prefix('m') {
        ("margin", key)
    } else {
        return None;
    };
    let suffixes = sides(key)?;
    let value = if property == "margin" && value == "auto" {
        "auto".to_string()
    } else {
        let v = spacing(value)?;
        if property == "padding" && negative {
            return None;
        }
        negate(v, negative)
    };
    Some(
        suffixes
            .iter()
            .map(|s| decl(&format!("{property}{s}"), value.clone()))
            .collect(),
    )
}

fn radius(utility: &str) -> Option<Vec<Declaration>> {
    let rest = utility.strip_prefix("rounded")?;
    let rest = rest.strip_prefix('-').unwrap_or(rest);
    let corners: &[&str] = &["top-left", "top-right", "bottom-right", "bottom-left"];
    let (targets, size): (Vec<&str>, &str) = match rest.split_once('-') {
        Some((side @ ("t" | "r" | "b" | "l" | "tl" | "tr" | "br" | "bl" | "s" | "e"), size)) => {
            (corner_targets(side), size)
        }
        _ if matches!(rest, "t" | "r" | "b" | "l" | "tl" | "tr" | "br" | "bl") => (corner_targets(rest), ""),
        _ => (corners.to_vec(), rest),
    };
    let value = match arbitrary(size) {
        Some(v) => v,
        None => lookup(RADII, size)?.to_string(),
    };
    Some(
        targets
            .into_iter()
            .map(|c| decl(&format!("border-{c}-radius"), value.clone()))
            .collect(),
    )
}

fn corner_targets(side: &str) -> Vec<&'static str> {
    match side {
        "t" => vec!["top-left", "top-right"],
        "r" | "e" => vec!["top-right", "bottom-right"],
        "b" => vec!["bottom-right", "bottom-left"],
        "l" | "s" => vec!["top-left", "bottom-left"],
        "tl" => vec!["top-left"],
        "tr" => vec!["top-right"],
        "br" => vec!["bottom-right"],
        _ => vec!["bottom-left"],
    }
}

fn border(utility: &str) -> Option<Vec<Declaration>> {
    let rest = utility.strip_prefix("border")?;
    if rest.is_empty() {
        return Some(vec![decl("border-width", "1px")]);
    }
    let rest = rest.strip_prefix('-')?;
    if let Some(style) = ["solid", "dashed", "dotted", "double", "hidden", "none"]
        .iter()
        .find(|s| **s == rest)
    {
        return Some(vec![decl("border-style", *style)]);
    }
    let width = |v: &str| -> Option<String> {
        match v {
            "" => Some("1px".into()),
            "0" | "2" | "4" | "8" => Some(format!("{v}px")),
            _ => arbitrary(v).filter(|a| !is_color_literal(a)),
        }
    };
    let (side, value) = match rest.split_once('-') {
        Some((side @ ("t" | "r" | "b" | "l" | "x" | "y"), v)) => (side, v),
        _ if matches!(rest, "t" | "r" | "b" | "l" | "x" | "y") => (rest, ""),
        _ => ("", rest),
    };
    if let Some(w) = width(value) {
        let names: &[&str] = match side {
            "" => &["border-width"],
            "t" => &["border-top-width"],
            "r" => &["border-right-width"],
            "b" => &["border-bottom-width"],
            "l" => &["border-left-width"],
            "x" => &["border-left-width", "border-right-width"],
            _ => &["border-top-width", "border-bottom-width"],
        };
        return Some(names.iter().map(|n| decl(n, w.clone())).collect());
    }
    if side.is_empty() {
        return color(value).map(|c| vec![decl("border-color", c)]);
    }
    None
}

fn transform(utility: &str, negative: bool) -> Option<Vec<Declaration>> {
    let value = if let Some(v) = utility.strip_prefix("scale-") {
        let (axis, v) = match v.split_once('-') {
            Some((axis @ ("x" | "y"), v)) => (axis.to_ascii_uppercase(), v),
            _ => (String::new(), v),
        };
        let factor = match arbitrary(v) {
            Some(a) => a,
            None => format!("{}", v.parse::<f32>().ok()? / 100.0),
        };
        format!("scale{axis}({})", negate(factor, negative))
    } else if let Some(v) = utility.strip_prefix("rotate-") {
        let angle = arbitrary(v).unwrap_or_else(|| format!("{v}deg"));
        format!("rotate({})", negate(angle, negative))
    } else if let Some(v) = utility.strip_prefix("translate-") {
        let (axis, v) = v.split_once('-')?;
        let axis = match axis {
            "x" => "X",
            "y" => "Y",
            _ => return None,
        };
        format!("translate{axis}({})", negate(size(v, "100%")?, negative))
    } else if let Some(v) = utility.strip_prefix("skew-") {
        let (axis, v) = v.split_once('-')?;
        let axis = axis.to_ascii_uppercase();
        format!("skew{axis}({})", negate(format!("{v}deg"), negative))
    } else {
        return None;
    };
    Some(vec![decl("transform", value)])
}

fn filter(utility: &str) -> Option<Vec<Declaration>> {
    let (property, rest) = match utility.strip_prefix("backdrop-") {
        Some(rest) => ("backdrop-filter", rest),
        None => ("filter", utility),
    };
    let value = if let Some(size) = rest.strip_prefix("blur") {
        let size = size.strip_prefix('-').unwrap_or(size);
        let px = arbitrary(size).or_else(|| lookup(BLURS, size).map(str::to_string))?;
        format!("blur({px})")
    } else if rest.starts_with("drop-shadow") && property == "filter" {
        if rest == "drop-shadow-none" {
            "drop-shadow(0 0 #0000)".to_string()
        } else {
            "drop-shadow(0 4px 3px rgb(0 0 0 / 0.07)) drop-shadow(0 2px 2px rgb(0 0 0 / 0.06))".to_string()
        }
    } else {
        match rest {
            "grayscale" => "grayscale(100%)".into(),
            "invert" => "invert(100%)".into(),
            "sepia" => "sepia(100%)".into(),
            _ => {
                let (name, amount) = rest.split_once('-')?;
                if !matches!(name, "brightness" | "contrast" | "saturate") {
                    return None;
                }
                let n: f32 = amount.parse().ok()?;
                format!("{name}({})", n / 100.0)
            }
        }
    };
    Some(vec![decl(property, value)])
}

fn text(value: &str) -> Option<Vec<Declaration>> {
    if let Some((_, fs, lh)) = FONT_SIZES.iter().find(|(k, _, _)| *k == value) {
        return Some(vec![decl("font-size", *fs), decl("line-height", *lh)]);
    }
    if let Some(align) = ["left", "center", "right", "justify", "start", "end"]
        .iter()
        .find(|a| **a == value)
    {
        return Some(vec![decl("text-align", *align)]);
    }
    if let Some(v) = arbitrary(value) {
        if !is_color_literal(&v) {
            return Some(vec![decl("font-size", v)]);
        }
    }
    color(value).map(|c| vec![decl("color", c)])
}

fn background(value: &str) -> Option<Vec<Declaration>> {
    if let Some(dir) = value.strip_prefix("gradient-to-") {
        let dir = lookup(GRADIENT_DIRECTIONS, dir)?;
        return Some(vec![decl(
            "background-image",
            format!("linear-gradient({dir}, {GRADIENT_STOPS})"),
        )]);
    }
    if value == "none" {
        return Some(vec![decl("background-image", "none")]);
    }
    if let Some(v) = arbitrary(value) {
        let lower = v.to_ascii_lowercase();
        if lower.starts_with("url(") || lower.contains("gradient(") {
            return Some(vec![decl("background-image", v)]);
        }
    }
    color(value).map(|c| vec![decl("background-color", c)])
}

fn gradient_stop(utility: &str) -> Option<Vec<Declaration>> {
    let (stop, value) = utility.split_once('-')?;
    let name = match stop {
        "from" => "--tw-gradient-from",
        "via" => "--tw-gradient-via",
        "to" => "--tw-gradient-to",
        _ => return None,
    };
    color(value).map(|c| vec![decl(name, c)])
}

fn transition(utility: &str) -> Option<Vec<Declaration>> {
    if let Some(ms) = utility.strip_prefix("duration-") {
        let ms = arbitrary(ms).unwrap_or_else(|| format!("{ms}ms"));
        return Some(vec![decl("transition-duration", ms)]);
    }
    let rest = utility.strip_prefix("transition")?;
    let duration = match rest {
        "-none" => "0s",
        "" | "-all" | "-colors" | "-opacity" | "-shadow" | "-transform" => "150ms",
        _ => return None,
    };
    Some(vec![decl("transition-duration", duration)])
}

/// Declarations for one utility, variants already stripped.
fn resolve(utility: &str) -> Option<Vec<Declaration>> {
    let (negative, utility) = match utility.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, utility),
    };
    if let Some(display) = lookup(DISPLAYS, utility) {
        return Some(vec![decl("display", display)]);
    }
    match utility {
        "invisible" => return Some(vec![decl("visibility", "hidden")]),
        "visible" => return Some(vec![decl("visibility", "visible")]),
        "absolute" | "relative" | "fixed" | "static" | "sticky" => {
            return Some(vec![decl("position", utility)])
        }
        "flex-row" | "flex-row-reverse" | "flex-col" | "flex-col-reverse" => {
            let dir = utility["flex-".len()..].replace("col", "column");
            return Some(vec![decl("flex-direction", dir)]);
        }
        "whitespace-nowrap" => return Some(vec![decl("white-space", "nowrap")]),
        "shadow" => return Some(vec![decl("box-shadow", lookup(SHADOWS, "")?)]),
        "animate-none" => return Some(vec![decl("animation-name", "none")]),
        _ => {}
    }
    if let Some(name) = utility.strip_prefix("animate-") {
        if matches!(name, "spin" | "ping" | "pulse" | "bounce") {
            return Some(vec![decl("animation-name", name)]);
        }
        return None;
    }
    if let Some(size) = utility.strip_prefix("shadow-") {
        if let Some(v) = lookup(SHADOWS, size) {
            return Some(vec![decl("box-shadow", v)]);
        }
        if let Some(v) = arbitrary(size) {
            return Some(vec![decl("box-shadow", v)]);
        }
        // shadow colors only tint an existing shadow
        return None;
    }
    if utility.starts_with("rounded") {
        return radius(utility);
    }
    if utility.starts_with("border") {
        return border(utility);
    }
    if let Some(v) = utility.strip_prefix("opacity-") {
        let n = match arbitrary(v) {
            Some(a) => a,
            None => format!("{}", v.parse::<f32>().ok()? / 100.0),
        };
        return Some(vec![decl("opacity", n)]);
    }
    if let Some(v) = utility.strip_prefix("bg-") {
        return background(v);
    }
    if let Some(v) = utility.strip_prefix("text-") {
        return text(v);
    }
    if let Some(v) = utility.strip_prefix("w-") {
        return Some(vec![decl("width", size(v, "100vw")?)]);
    }
    if let Some(v) = utility.strip_prefix("h-") {
        return Some(vec![decl("height", size(v, "100vh")?)]);
    }
    if let Some(v) = utility.strip_prefix("min-w-") {
        return Some(vec![decl("min-width", size(v, "100vw")?)]);
    }
    if let Some(v) = utility.strip_prefix("min-h-") {
        return Some(vec![decl("min-height", size(v, "100vh")?)]);
    }
    if let Some(v) = utility.strip_prefix("size-") {
        let s = size(v, "100vw")?;
        return Some(vec![decl("width", s.clone()), decl("height", s)]);
    }
    if let Some(v) = utility.strip_prefix("gap-") {
        return Some(match v.split_once('-') {
            Some(("x", v)) => vec![decl("column-gap", spacing(v)?)],
            Some(("y", v)) => vec![decl("row-gap", spacing(v)?)],
            _ => vec![decl("gap", spacing(v)?)],
        });
    }
    if utility == "transform" || utility == "transform-gpu" {
        return Some(vec![decl("transform", "translate(0, 0)")]);
    }
    if let Some(found) = transform(utility, negative) {
        return Some(found);
    }
    if utility.starts_with("transition") || utility.starts_with("duration-") {
        return transition(utility);
    }
    if let Some(found) = gradient_stop(utility) {
        return Some(found);
    }
    if utility.starts_with("blur")
        || utility.starts_with("backdrop-")
        || utility.starts_with("drop-shadow")
        || matches!(utility.split('-').next(), Some("grayscale" | "invert" | "sepia" | "brightness" | "contrast" | "saturate"))
    {
        return filter(utility);
    }
    box_spacing(utility, negative)
}

/// Declarations a utility class stands for at the given viewport.
///
/// Responsive variants apply when the viewport is wide enough; state
/// variants (`hover:`, `focus:`, `dark:` and the like) never match a
/// document at rest, so they resolve to nothing. A leading `!` marks the
/// declarations important.
///
/// ```
/// use rfpreview::rendering::utility::utility_declarations;
/// use rfpreview::Viewport;
///
/// let decls = utility_declarations("bg-blue-500", Viewport::default()).unwrap();
/// assert_eq!(decls[0].name, "background-color");
/// assert_eq!(decls[0].value, "#3b82f6");
/// assert!(utility_declarations("hover:bg-blue-500", Viewport::default()).is_none());
/// ```
pub fn utility_declarations(class: &str, viewport: Viewport) -> Option<Vec<Declaration>> {
    let mut parts: Vec<&str> = class.split(':').collect();
    let utility = parts.pop()?;
    for variant in parts {
        let min = BREAKPOINTS.iter().find(|(v, _)| *v == variant)?.1;
        if viewport.width < min {
            return None;
        }
    }
    let (important, utility) = match utility.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, utility),
    };
    let mut decls = resolve(utility)?;
    for d in &mut decls {
        d.important = important;
    }
    Some(decls)
}
