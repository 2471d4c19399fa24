use std::fs;
use std::path::PathBuf;

use rfpreview::{compose_snippet, PreviewConfig, Snippet};

const FIXTURES: &[&str] = &[
    "fragment_button",
    "css_only_spin",
    "play_pause",
    "entity_encoded",
];

fn snippet_path(name: &str) -> PathBuf {
    let mut p = PathBuf::from("tests/goldens/snippets");
    p.push(format!("{name}.html"));
    p
}

fn golden_path(name: &str) -> PathBuf {
    let mut p = PathBuf::from("tests/goldens/expected");
    p.push(format!("{name}.sha256"));
    p
}

#[test]
fn composed_documents_match_golden_digests() {
    let config = PreviewConfig::default();
    for name in FIXTURES {
        let code = fs::read_to_string(snippet_path(name)).expect("read fixture");
        let snippet = Snippet::new(code);
        let digest = compose_snippet(&snippet, &config).digest();

        // Composition must not depend on anything but the input
        assert_eq!(digest, compose_snippet(&snippet, &config).digest(), "{name}");

        let expected_path = golden_path(name);
        if std::env::var("UPDATE_GOLDENS").is_ok() {
            fs::create_dir_all("tests/goldens/expected").ok();
            fs::write(&expected_path, &digest).expect("write golden");
            println!("Updated golden: {:?}", expected_path);
            continue;
        }

        let expected = fs::read_to_string(&expected_path).unwrap_or_else(|e| {
            panic!("no golden at {expected_path:?} ({e}); run with UPDATE_GOLDENS=1 to create it")
        });
        assert_eq!(digest, expected.trim(), "composed document for {name} changed");
    }
}

#[test]
fn fixtures_compose_to_previewable_documents() {
    let config = PreviewConfig::default();
    for name in FIXTURES {
        let code = fs::read_to_string(snippet_path(name)).expect("read fixture");
        let doc = compose_snippet(&Snippet::new(code), &config);
        assert!(
            rfpreview::has_button_signature(doc.as_str()),
            "{name} lost its button signature"
        );
        assert!(!doc.as_str().contains("0%. to"), "{name} kept the keyframe typo");
    }
}
