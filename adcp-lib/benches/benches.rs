use rand::Rng;

use adcp::{convert, Convention, EnsembleDecoder, Format, FrameScanner};
use criterion::{criterion_group, criterion_main, Criterion, Throughput};

#[path = "../tests/common/mod.rs"]
mod common;

fn rtb_profile_frame(bins: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    let beams: Vec<Vec<f32>> = (0..4)
        .map(|_| (0..bins).map(|_| rng.gen_range(-2.0..2.0)).collect())
        .collect();
    let rows: Vec<&[f32]> = beams.iter().map(Vec::as_slice).collect();
    common::rtb_frame(
        1,
        &[
            common::rtb_floats("E000001", &rows),
            common::rtb_floats("E000003", &rows),
            common::rtb_ensemble_data(1, bins as i32, 4, 10),
            common::rtb_ancillary(10.0, 1000.0),
        ],
    )
}

fn bench_scan(c: &mut Criterion) {
    let frame = rtb_profile_frame(100);
    // frames separated by random noise
    let mut rng = rand::thread_rng();
    let mut data = Vec::new();
    for _ in 0..16 {
        data.extend((0..64).map(|_| rng.gen::<u8>() & 0x7f));
        data.extend_from_slice(&frame);
    }

    let mut group = c.benchmark_group("scan");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("rtb", |b| {
        b.iter(|| {
            let mut scanner = FrameScanner::new(Format::Rtb);
            let frames: Vec<_> = data
                .chunks(4096)
                .flat_map(|chunk| scanner.feed(chunk))
                .collect();
            assert_eq!(frames.len(), 16);
        });
    });
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let frame = rtb_profile_frame(100);
    let decoder = EnsembleDecoder::new(Format::Rtb);

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(frame.len() as u64));
    group.bench_function("rtb", |b| {
        b.iter(|| decoder.decode(&frame).unwrap());
    });
    group.bench_function("rtb_to_pd0", |b| {
        b.iter(|| {
            let decoded = decoder.decode(&frame).unwrap();
            convert(&decoded.ensemble, Convention::Pd0Compatible).unwrap()
        });
    });
    group.finish();
}

criterion_group!(benches, bench_scan, bench_decode);
criterion_main!(benches);
