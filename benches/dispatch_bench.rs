//! Criterion benchmarks for hot paths in the hintd daemon.
//!
//! Run with:
//!   cargo bench
//!
//! Covers:
//!   - JSON-RPC request parsing (serde_json)
//!   - Editor content payload decoding (the per-keystroke path)
//!   - Workspace display-name derivation

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hintd::suggestion::model::EditorContent;
use hintd::workspace::switcher::display_name;
use serde_json::Value;
use std::path::Path;

// ─── JSON-RPC parsing ────────────────────────────────────────────────────────

static SUGGESTION_GET_MSG: &str = r#"{
    "jsonrpc": "2.0",
    "id": 42,
    "method": "suggestion.get",
    "params": {
        "content": {
            "filePath": "/Users/dev/Project.xcworkspace/Sources/App/ContentView.swift",
            "content": "struct ContentView: View {\n    var body: some View {\n        Text(\"Hello\")\n    }\n}\n",
            "cursor": { "line": 2, "col": 21 },
            "selection": {
                "start": { "line": 2, "col": 13 },
                "end": { "line": 2, "col": 21 }
            }
        }
    }
}"#;

static DAEMON_STATUS: &str = r#"{
    "jsonrpc": "2.0",
    "id": 1,
    "method": "daemon.status",
    "params": {}
}"#;

fn bench_rpc_parse(c: &mut Criterion) {
    c.bench_function("rpc_parse_suggestion_get", |b| {
        b.iter(|| {
            let v: Value = serde_json::from_str(black_box(SUGGESTION_GET_MSG)).unwrap();
            black_box(v);
        });
    });

    c.bench_function("rpc_parse_daemon_status", |b| {
        b.iter(|| {
            let v: Value = serde_json::from_str(black_box(DAEMON_STATUS)).unwrap();
            black_box(v);
        });
    });

    c.bench_function("rpc_serialize_response", |b| {
        let resp = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 42,
            "result": {
                "content": {
                    "content": "struct ContentView: View { var body: some View { Text(\"Hello, world\") } }",
                    "newSelection": {
                        "start": { "line": 2, "col": 13 },
                        "end": { "line": 2, "col": 28 }
                    }
                }
            }
        });
        b.iter(|| {
            let s = serde_json::to_string(black_box(&resp)).unwrap();
            black_box(s);
        });
    });
}

// ─── Editor content decoding ─────────────────────────────────────────────────
//
// Every realtime keystroke decodes an EditorContent before the pipeline runs,
// so this path bounds how cheaply requests can be superseded.

fn bench_content_decode(c: &mut Criterion) {
    let small: Value = serde_json::json!({
        "filePath": "/w/App.xcodeproj/main.swift",
        "content": "print(\"hi\")\n",
        "cursor": { "line": 0, "col": 11 }
    });

    let large_body = "let x = 1\n".repeat(2000);
    let large: Value = serde_json::json!({
        "filePath": "/w/App.xcodeproj/Model.swift",
        "content": large_body,
        "cursor": { "line": 1999, "col": 0 },
        "metadata": { "language": "swift", "tabWidth": 4 }
    });

    c.bench_function("content_decode_small", |b| {
        b.iter(|| {
            let content: EditorContent =
                serde_json::from_value(black_box(small.clone())).unwrap();
            black_box(content);
        });
    });

    c.bench_function("content_decode_20k", |b| {
        b.iter(|| {
            let content: EditorContent =
                serde_json::from_value(black_box(large.clone())).unwrap();
            black_box(content);
        });
    });
}

// ─── Display names ───────────────────────────────────────────────────────────

fn bench_display_name(c: &mut Criterion) {
    let paths = [
        Path::new("/Users/dev/Project.xcworkspace"),
        Path::new("/Users/dev/Project.xcodeproj"),
        Path::new("/Users/dev/plain-directory"),
    ];

    c.bench_function("display_name_mixed", |b| {
        b.iter(|| {
            for path in &paths {
                black_box(display_name(black_box(path)));
            }
        });
    });
}

// ─── Entry point ─────────────────────────────────────────────────────────────

criterion_group!(
    benches,
    bench_rpc_parse,
    bench_content_decode,
    bench_display_name
);
criterion_main!(benches);
