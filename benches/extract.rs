use a3s_relay::extract::{bracketed, extract_commands, markup};
use a3s_relay::types::CodeSegment;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const ENVELOPE: &str = r#"I'll update the page now.

{"tool_calls": [{"name": "edit", "arguments": {"filePath": "/srv/www/index.html", "oldString": "USE_OLD_CODE_ABOVE", "newString": "USE_NEW_CODE_ABOVE"}}, {"name": "bash", "arguments": {"command": "ls -la /srv/www"}}]}"#;

const LINE_FORM: &str = "Running the tests.\n\ntool_calls:\n  - name: bash\n    arguments:\n      command: cargo test --workspace\n      timeout: 120";

const LOOSE_FORM: &str = r#"Let me look first: {"name": "read", "arguments": {"filePath": "/src/main.rs"}} then {"name": "glob", "arguments": {"pattern": "**/*.toml"}}"#;

fn segments() -> Vec<CodeSegment> {
    vec![
        CodeSegment::new(Some("html"), "<h1>Old title</h1>\n"),
        CodeSegment::new(Some("html"), "<h1>New title</h1>\n"),
    ]
}

fn bench_extract_envelope(c: &mut Criterion) {
    let segments = segments();
    c.bench_function("extract_envelope_with_repair", |b| {
        b.iter(|| extract_commands(black_box(ENVELOPE), black_box(&segments)))
    });
}

fn bench_extract_fallbacks(c: &mut Criterion) {
    c.bench_function("extract_line_form", |b| {
        b.iter(|| extract_commands(black_box(LINE_FORM), &[]))
    });
    c.bench_function("extract_loose_form", |b| {
        b.iter(|| extract_commands(black_box(LOOSE_FORM), &[]))
    });
}

fn bench_array_scan(c: &mut Criterion) {
    let padded = format!("{}\n\n{}", "Some preamble text. ".repeat(200), ENVELOPE);
    c.bench_function("array_after_long_text", |b| {
        b.iter(|| bracketed::array_after(black_box(&padded), "tool_calls"))
    });
}

fn bench_markdown(c: &mut Criterion) {
    let html = "<h2>Plan</h2><p>First <strong>check</strong> the <a href=\"https://example.com\">docs</a>.</p>\
                <ul><li>one</li><li>two</li></ul>\
                <pre><code class=\"language-rust\">fn main() {\n    println!(\"hi\");\n}</code></pre>"
        .repeat(10);
    c.bench_function("markup_to_markdown", |b| {
        b.iter(|| markup::to_markdown(black_box(&html), ""))
    });
}

criterion_group!(
    benches,
    bench_extract_envelope,
    bench_extract_fallbacks,
    bench_array_scan,
    bench_markdown
);
criterion_main!(benches);
