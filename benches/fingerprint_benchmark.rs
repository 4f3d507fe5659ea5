//! Benchmarks for catalog fingerprinting and story parsing.
//!
//! **Benchmarks Included:**
//! - `fingerprint`: reducing a synthetic catalog at 100, 1000 and 10000 stories
//! - `parse_story_source`: extracting stories from one generated file
//!
//! **Run benchmarks:**
//! ```bash
//! cargo bench                      # Run all benchmarks
//! cargo bench -- fingerprint       # Fingerprint only
//! ```

use std::path::Path;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use storydev::catalog::{parse_story_source, Catalog, StoryEntry};
use storydev::fingerprint::Fingerprint;

/// Stories per synthetic file.
const STORIES_PER_FILE: usize = 20;

/// Build a catalog with `count` stories spread over files of 20 stories each.
fn synthetic_catalog(count: usize) -> Catalog {
    let mut catalog = Catalog::new();
    let files = count.div_ceil(STORIES_PER_FILE);

    for file in 0..files {
        let file_path = format!("src/components/widget_{file}.stories.tsx");
        let entries = (0..STORIES_PER_FILE.min(count - file * STORIES_PER_FILE))
            .map(|i| {
                let name = format!("Variant {i}");
                StoryEntry {
                    id: format!("widget-{file}--variant-{i}"),
                    name: name.clone(),
                    levels: vec![format!("Widget {file}")],
                    title: format!("Widget {file}"),
                    export_name: format!("Variant{i}"),
                    file_path: file_path.clone(),
                    loc_start: u32::try_from(i * 5 + 1).unwrap_or(u32::MAX),
                    loc_end: u32::try_from(i * 5 + 3).unwrap_or(u32::MAX),
                    meta: Some(serde_json::json!({ "width": 320 })),
                }
            })
            .collect();
        catalog.insert_file(file_path, entries);
    }

    catalog
}

/// Generate a story file with `count` exports.
fn synthetic_source(count: usize) -> String {
    let mut source = String::from("export default { title: \"Bench/Widget\", meta: { width: 320 } };\n\n");
    for i in 0..count {
        source.push_str(&format!(
            "export const Variant{i} = () => <Widget variant={{{i}}} />;\nVariant{i}.storyName = \"Variant number {i}\";\n\n"
        ));
    }
    source
}

fn bench_fingerprint(c: &mut Criterion) {
    let mut group = c.benchmark_group("fingerprint");
    group.sample_size(20);

    for count in &[100, 1000, 10000] {
        let catalog = synthetic_catalog(*count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &catalog, |b, catalog| {
            b.iter(|| Fingerprint::of(black_box(catalog)).expect("fingerprint"));
        });
    }

    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let source = synthetic_source(STORIES_PER_FILE);
    let path = Path::new("src/widget.stories.jsx");

    c.bench_function("parse_story_source", |b| {
        b.iter(|| {
            parse_story_source(path, "src/widget.stories.jsx", black_box(&source))
                .expect("parse")
        });
    });
}

criterion_group!(benches, bench_fingerprint, bench_parse);
criterion_main!(benches);
