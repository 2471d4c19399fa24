use criterion::{black_box, criterion_group, criterion_main, Criterion};

use rfpreview::rendering::StaticEngine;
use rfpreview::{compose_snippet, preview, synthesize, PreviewConfig, Snippet};

const FRAGMENT: &str = r#"<style>.btn{padding:12px 24px;border-radius:12px;background:linear-gradient(90deg,#6366f1,#ec4899);color:#fff;box-shadow:0 6px 18px rgba(0,0,0,.2)}</style>
<button class="btn">Button</button>"#;

const CSS_ONLY_DOCUMENT: &str = r#"<html><head><title>x</title></head><body>
.button-container{position:relative}.button-border{padding:3px}.button{background:#000}.spin{animation:spin 2s linear infinite}
</body></html>"#;

fn bench_compose(c: &mut Criterion) {
    let config = PreviewConfig::default();
    let fragment = Snippet::new(FRAGMENT);
    let css_only = Snippet::new(CSS_ONLY_DOCUMENT);

    c.bench_function("compose_fragment", |b| {
        b.iter(|| compose_snippet(black_box(&fragment), &config))
    });
    c.bench_function("compose_css_only_document", |b| {
        b.iter(|| compose_snippet(black_box(&css_only), &config))
    });
    c.bench_function("synthesize_play_pause", |b| {
        b.iter(|| {
            synthesize(black_box(
                ".container input:checked ~ .play{display:none}.container input:checked ~ .pause{display:block}",
            ))
        })
    });
}

fn bench_static_gate(c: &mut Criterion) {
    let config = PreviewConfig::default();
    let snippet = Snippet::new(FRAGMENT);
    let mut ctx = StaticEngine::new(config.viewport);

    c.bench_function("static_preview", |b| {
        b.iter(|| preview(&mut ctx, black_box(&snippet), &config))
    });
}

criterion_group!(benches, bench_compose, bench_static_gate);
criterion_main!(benches);
