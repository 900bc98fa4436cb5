//! Frame codec benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use wisp_proto::{Frame, FrameType};

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_encode");
    for size in [0usize, 64, 1024, 16 * 1024] {
        let frame = Frame::new(FrameType::Data, vec![0xA5; size])
            .with_sender([1u8; 32])
            .with_signature([2u8; 64]);
        group.bench_function(format!("{size}b"), |b| {
            b.iter(|| black_box(frame.encode()));
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_decode");
    for size in [0usize, 64, 1024, 16 * 1024] {
        let bytes = Frame::new(FrameType::Data, vec![0xA5; size])
            .with_sender([1u8; 32])
            .encode();
        group.bench_function(format!("{size}b"), |b| {
            b.iter(|| black_box(Frame::decode(black_box(&bytes)).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
