use criterion::{
    criterion_group, criterion_main, BenchmarkId, Criterion, SamplingMode, Throughput,
};
use stride_match::dir24::Dir24Index;
use stride_match::simd;
use stride_match::{Algorithm, Family, Index, Ipv4Addr};

const PREFIX_COUNT: u64 = 50_000;
const LOOKUP_COUNT: u64 = 200_000;

fn populate_dir24() -> Dir24Index {
    let mut idx = Dir24Index::new();
    for i in 0..PREFIX_COUNT {
        let a = ((i >> 16) & 0xFF) as u8;
        let b = ((i >> 8) & 0xFF) as u8;
        let c = (i & 0xFF) as u8;
        idx.insert(Ipv4Addr::new([10, a, b, c]), 24, i as u32)
            .unwrap();
    }
    idx
}

fn populate_trie8() -> Index {
    let mut idx = Index::create(Family::V4, Algorithm::Trie8).unwrap();
    for i in 0..PREFIX_COUNT {
        let a = ((i >> 16) & 0xFF) as u8;
        let b = ((i >> 8) & 0xFF) as u8;
        let c = (i & 0xFF) as u8;
        idx.insert(&[10, a, b, c], 32, i as u32).unwrap();
    }
    idx
}

fn lookup_words(count: u64) -> Vec<u32> {
    (0..count)
        .map(|i| {
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            Ipv4Addr::new([10, a, b, c]).as_u32()
        })
        .collect()
}

fn bench(c: &mut Criterion) {
    let words = lookup_words(LOOKUP_COUNT);

    let mut group = c.benchmark_group("dir24 batch lookup");
    let dir24 = populate_dir24();
    group.sampling_mode(SamplingMode::Auto);
    group.throughput(Throughput::Elements(LOOKUP_COUNT));
    group.bench_with_input(
        BenchmarkId::from_parameter("dispatched"),
        &words,
        |b, words| {
            let mut out = vec![0u32; words.len()];
            b.iter(|| simd::dispatch_batch_words(&dir24, words, &mut out));
        },
    );
    group.bench_with_input(BenchmarkId::from_parameter("scalar"), &words, |b, words| {
        let mut out = vec![0u32; words.len()];
        b.iter(|| dir24.lookup_batch_words(words, &mut out));
    });
    group.finish();

    let mut group = c.benchmark_group("trie8 single lookup");
    let trie8 = populate_trie8();
    group.sampling_mode(SamplingMode::Auto);
    group.throughput(Throughput::Elements(LOOKUP_COUNT));
    group.bench_function("lookup_single", |b| {
        b.iter(|| {
            for i in 0..1000u64 {
                let a = ((i >> 16) & 0xFF) as u8;
                let bb = ((i >> 8) & 0xFF) as u8;
                let cc = (i & 0xFF) as u8;
                std::hint::black_box(trie8.lookup_single(&[10, a, bb, cc]));
            }
        });
    });
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(20);
    targets = bench
}
criterion_main!(benches);
