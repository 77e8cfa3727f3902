use criterion::{Criterion, black_box, criterion_group, criterion_main};
use eventschema_ingest::{IngestConfig, JsonTokenizer, RecordBuilder, TokenStream, TypeInferencer};
use eventschema_store::InMemorySchemaStore;
use std::sync::Arc;

const EVENT: &str = r#"{
    "_user": "u-1842",
    "url": "https://example.com/pricing",
    "referrer": "https://search.example.org/?q=pricing",
    "duration": 1532,
    "score": 0.87,
    "returning": true,
    "tags": ["pricing", "plans", "annual"],
    "dims": {"width": 1440, "height": 900},
    "matrix": [[1, 2], [3, 4]]
}"#;

fn bench_tokenize(c: &mut Criterion) {
    c.bench_function("tokenize_event", |b| {
        b.iter(|| {
            let mut tokens = JsonTokenizer::new(black_box(EVENT));
            let mut count = 0usize;
            while tokens.next_token().is_ok() {
                count += 1;
            }
            count
        })
    });
}

fn bench_infer(c: &mut Criterion) {
    let inferencer = TypeInferencer::new("_user");
    c.bench_function("infer_nested_array", |b| {
        b.iter(|| {
            let mut tokens = JsonTokenizer::new(black_box("[[[1, 2], [3]], [[4]]]"));
            tokens.next_token().ok();
            inferencer.infer(&mut tokens).ok()
        })
    });
}

fn bench_build_record(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let builder = RecordBuilder::new(Arc::new(InMemorySchemaStore::new()), IngestConfig::default());

    // Warm the cache so the measured path never reaches the store.
    runtime.block_on(async {
        let mut tokens = JsonTokenizer::new(EVENT);
        builder.build_record("p", "c", &mut tokens).await.unwrap();
    });

    c.bench_function("build_record_known_schema", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let mut tokens = JsonTokenizer::new(black_box(EVENT));
                builder.build_record("p", "c", &mut tokens).await.unwrap()
            })
        })
    });
}

criterion_group!(benches, bench_tokenize, bench_infer, bench_build_record);
criterion_main!(benches);
