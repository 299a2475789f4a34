use criterion::{black_box, criterion_group, criterion_main, Criterion};
use text_search::{GlobalWeighting, InvertedFile, LocalWeighting, TextConfig, Tokenizer, VectorModel, Vocabulary};

const WORDS: [&str; 24] = [
    "river", "stone", "light", "north", "paper", "glass", "music", "field", "storm", "quiet", "engine", "garden",
    "silver", "market", "winter", "bridge", "candle", "forest", "letter", "harbor", "shadow", "signal", "thread",
    "valley",
];

/// Deterministic pseudo random corpus
fn synthetic_corpus(n_docs: usize, doc_len: usize) -> Vec<String> {
    let mut state: u64 = 0x9e37_79b9_7f4a_7c15;
    (0..n_docs)
        .map(|_| {
            (0..doc_len)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 7;
                    state ^= state << 17;
                    // skew towards the first words
                    let r = (state % 1000) as usize;
                    WORDS[(r * r / 1000) % WORDS.len()]
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

fn pipeline_benchmark(c: &mut Criterion) {
    let texts = synthetic_corpus(2_000, 60);
    let tokenizer = Tokenizer::new(TextConfig {
        nlist: vec![1, 2],
        ..TextConfig::default()
    });

    c.bench_function("tokenize_corpus", |b| {
        b.iter(|| tokenizer.tokenize_corpus(black_box(&texts)))
    });

    c.bench_function("build_vocabulary", |b| {
        b.iter(|| Vocabulary::from_texts(&tokenizer, black_box(&texts)).unwrap())
    });

    let voc = Vocabulary::from_texts(&tokenizer, &texts).unwrap();
    let model = VectorModel::fit(GlobalWeighting::idf(), LocalWeighting::Tf, voc).unwrap();

    c.bench_function("vectorize_corpus", |b| {
        b.iter(|| model.vectorize_corpus(&tokenizer, black_box(&texts)).unwrap())
    });

    let vectors = model.vectorize_corpus(&tokenizer, &texts).unwrap();
    c.bench_function("extend_index", |b| {
        b.iter(|| {
            let mut index = InvertedFile::new();
            index.extend(black_box(&vectors)).unwrap();
            index
        })
    });

    let mut index = InvertedFile::with_model(model.clone());
    index.extend(&vectors).unwrap();
    let mut query_tokenizer = tokenizer.clone();
    let queries: Vec<_> = texts
        .iter()
        .take(50)
        .map(|t| model.vectorize_text(&mut query_tokenizer, t).unwrap())
        .collect();

    c.bench_function("search_top10", |b| {
        b.iter(|| {
            for q in &queries {
                black_box(index.search(q, 10));
            }
        })
    });

    index.freeze();
    c.bench_function("search_top10_frozen", |b| {
        b.iter(|| {
            for q in &queries {
                black_box(index.search(q, 10));
            }
        })
    });
}

criterion_group!(benches, pipeline_benchmark);
criterion_main!(benches);
