use criterion::{black_box, criterion_group, criterion_main, Criterion};
use link_unfurl::{mf2, OpenGraphExtractor, StructuredDataAdapter};
use std::time::Duration;

const PAGE_URL: &str = "https://blog.example.com/2024/03/spring-hike";

const MOCK_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Spring Hike</title>
    <meta property="og:title" content="Spring Hike">
    <meta property="og:description" content="Notes from a long walk along the ridge.">
    <meta property="og:image" content="/media/ridge.jpg">
    <meta property="og:image:width" content="1200">
    <meta property="og:image:height" content="800">
    <meta property="article:published_time" content="2024-03-21T09:30:00+01:00">
    <link rel="author" href="/about">
</head>
<body>
  <div class="h-feed">
    <div class="p-author h-card">
      <img class="u-photo" src="/me.jpg" alt=""><a class="p-name u-url" href="/">Sam</a>
    </div>
    <article class="h-entry">
      <h1 class="p-name">Spring Hike</h1>
      <time class="dt-published" datetime="2024-03-21T09:30:00+01:00">March 21</time>
      <p class="p-summary">Notes from a long walk along the ridge.</p>
      <div class="e-content">
        <p>We started early and reached the top before noon.</p>
        <img class="u-photo" src="/media/ridge.jpg" alt="The ridge">
      </div>
      <a class="u-url" href="/2024/03/spring-hike">permalink</a>
    </article>
  </div>
</body>
</html>"#;

fn bench_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("extraction");

    group
        .sample_size(50)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1));

    group.bench_function("mf2_parse", |b| {
        b.iter(|| black_box(mf2::parse(black_box(MOCK_HTML), PAGE_URL)))
    });

    let structured = StructuredDataAdapter::new(Default::default());
    group.bench_function("structured_extract", |b| {
        b.iter(|| black_box(structured.extract(black_box(MOCK_HTML), PAGE_URL)))
    });

    let open_graph = OpenGraphExtractor::new();
    group.bench_function("open_graph_extract", |b| {
        b.iter(|| black_box(open_graph.extract(black_box(MOCK_HTML), PAGE_URL)))
    });

    group.finish();
}

criterion_group!(benches, bench_extraction);
criterion_main!(benches);
