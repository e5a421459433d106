use criterion::{Criterion, black_box, criterion_group, criterion_main};

use pinydr::engine::normalize;
use pinydr::engine::{PinyinDictionary, PracticeEngine};

const TEXT: &str = "床前明月光，疑是地上霜。举头望明月，低头思故乡。";

fn make_inputs(count: usize) -> Vec<&'static str> {
    let inputs = ["nǐ", "Hao3", "lüè", "SHUĀNG", "zhong1", "xian", "a12", "nv3"];
    (0..count).map(|i| inputs[i % inputs.len()]).collect()
}

fn bench_normalize(c: &mut Criterion) {
    let inputs = make_inputs(1000);

    c.bench_function("normalize (1000 inputs)", |b| {
        b.iter(|| {
            for s in &inputs {
                black_box(normalize(black_box(s)));
            }
        })
    });
}

fn bench_load(c: &mut Criterion) {
    let mut engine = PracticeEngine::new(PinyinDictionary::new());

    c.bench_function("load poem (24 chars)", |b| {
        b.iter(|| engine.load(black_box(TEXT)))
    });
}

fn bench_confirm(c: &mut Criterion) {
    let mut engine = PracticeEngine::new(PinyinDictionary::new());
    let answers: Vec<String> = {
        engine.load(TEXT);
        engine
            .slots()
            .iter()
            .filter(|s| s.is_target)
            .map(|s| s.accepted().first().map(|p| p.normalized.clone()).unwrap_or_default())
            .collect()
    };

    c.bench_function("type and confirm poem", |b| {
        b.iter(|| {
            engine.load(TEXT);
            for answer in &answers {
                for ch in answer.chars() {
                    engine.append_key(ch);
                }
                black_box(engine.confirm());
            }
        })
    });
}

criterion_group!(benches, bench_normalize, bench_load, bench_confirm);
criterion_main!(benches);
