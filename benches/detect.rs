use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nb_lang_detect::training::fit_model;
use nb_lang_detect::{normalize, BundledCorpus, CorpusSource, LanguageDetector, TrainConfig};

fn detect_benchmark(c: &mut Criterion) {
    let detector = LanguageDetector::in_memory();
    detector
        .train(&BundledCorpus, &TrainConfig::default())
        .expect("training on the bundled corpus");

    let texts = [
        "The quick brown fox jumps over the lazy dog",
        "Le petit chat dort sur le canapé",
        "Das Wetter ist heute sehr schön",
        "امروز هوا خیلی خوب است",
        "今日はとても良い天気です",
        "मुझे हिंदी बोलना पसंद है",
    ];

    c.bench_function("detect_single", |b| {
        b.iter(|| detector.detect(black_box(texts[0])).unwrap())
    });

    let batch: Vec<&str> = texts.iter().cycle().take(600).copied().collect();
    c.bench_function("detect_batch_600", |b| {
        b.iter(|| detector.detect_batch(black_box(&batch)).unwrap())
    });
}

fn fit_benchmark(c: &mut Criterion) {
    let corpus = BundledCorpus.load().expect("bundled corpus");
    let docs: Vec<String> = corpus.iter().map(|s| normalize(&s.text)).collect();
    let labels: Vec<&str> = corpus.iter().map(|s| s.label.as_str()).collect();
    let config = TrainConfig::default();

    c.bench_function("fit_model_bundled", |b| {
        b.iter(|| fit_model(black_box(&docs), &labels, &config).unwrap())
    });
}

criterion_group!(benches, detect_benchmark, fit_benchmark);
criterion_main!(benches);
