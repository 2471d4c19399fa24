use rfpreview::classify::classify;
use rfpreview::compose::{compose, fix_css_typos};
use rfpreview::{compose_snippet, PreviewConfig, Snippet};

fn compose_code(code: &str) -> String {
    compose(classify(code), code).into_string()
}

#[test]
fn css_only_body_synthesizes_a_button() {
    let code = "<!doctype html><html><head><style>.button{color:red}</style></head><body>\n</body></html>";
    let c = classify(code);
    assert!(c.is_full_document);
    assert!(c.is_css_only);

    let out = compose_code(code);
    let body = &out[out.find("<body").expect("body present")..];
    assert!(body.contains("<button"), "no button in {}", body);
    assert!(out.contains(".button{color:red}"));
}

#[test]
fn container_border_spin_css_gets_nested_markup() {
    let css = ".button-container{display:flex}.button-border{padding:3px}.button{background:#111}.spin{animation:spin 2s linear infinite}";
    let code = format!("<html><head></head><body>{}</body></html>", css);
    let c = classify(&code);
    assert!(c.is_full_document && c.is_css_only);

    let out = compose_code(&code);
    assert!(out.contains("button-container"));
    assert!(out.contains("button-border"));
    assert!(out.contains("class=\"spin"));
    // the stray CSS moved into a style block
    assert!(out.contains("<style>"));
}

#[test]
fn fragments_are_wrapped_in_a_preview_root() {
    let out = compose_code(r#"<button class="btn">Buy</button>"#);
    assert!(out.starts_with("<!doctype html>"));
    assert!(out.contains(r#"<div class="_preview-root">"#));
    assert!(out.contains(r#"<button class="btn">Buy</button>"#));
}

#[test]
fn play_pause_toggle_has_one_checkbox_and_both_icons() {
    let css = ".container{display:inline-flex}.container input{display:none}\
               .container input:checked ~ .play{display:none}\
               .container input:checked ~ .pause{display:block}";
    let out = compose_code(css);
    assert_eq!(out.matches(r#"type="checkbox""#).count(), 1);
    assert!(out.contains(r#"class="play""#));
    assert!(out.contains(r#"class="pause""#));
}

#[test]
fn composition_is_deterministic() {
    let inputs = [
        r#"<button class="btn">Buy</button>"#,
        ".fancy-btn{border-radius:8px}",
        "<html><body><style>.x{}</style><div class=\"x\">A</div></body></html>",
        "<!doctype html><html><head><style>.button{color:red}</style></head><body></body></html>",
    ];
    for input in inputs {
        assert_eq!(compose_code(input), compose_code(input), "input {}", input);
    }
}

#[test]
fn keyframe_typo_fix_is_idempotent() {
    let css = "@keyframes k{0%. to{opacity:0}}";
    let once = fix_css_typos(css).into_owned();
    assert_eq!(once, "@keyframes k{0%, to{opacity:0}}");
    assert_eq!(fix_css_typos(&once), once);
}

#[test]
fn entities_are_decoded_before_classification() {
    let snippet = Snippet::new("&lt;button class=&quot;btn&quot;&gt;Buy&lt;/button&gt;");
    let doc = compose_snippet(&snippet, &PreviewConfig::default());
    assert!(doc.as_str().contains(r#"<button class="btn">Buy</button>"#));

    let raw = PreviewConfig {
        decode_entities: false,
        ..Default::default()
    };
    let doc = compose_snippet(&snippet, &raw);
    assert!(!doc.as_str().contains(r#"<button class="btn">"#));
}

#[test]
fn malformed_input_never_panics() {
    for input in ["", "<", "</body>", "<body>", "{{{", "<html><body>}{</body>", "<style>"] {
        let _ = compose_code(input);
    }
}
