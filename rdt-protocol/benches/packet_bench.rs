use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rdt_protocol::ack::{AckSegment, SackBlock};
use rdt_protocol::buffer::ReceiveBuffer;
use rdt_protocol::packet::{DataSegment, Packet, MAX_PAYLOAD_SIZE};

fn bench_data_segment_serialize(c: &mut Criterion) {
    let payload = Bytes::from(vec![0u8; MAX_PAYLOAD_SIZE]);
    let segment = DataSegment::new(1_180_000, payload);

    let mut group = c.benchmark_group("data_segment");
    group.throughput(Throughput::Bytes(MAX_PAYLOAD_SIZE as u64));
    group.bench_function("serialize", |b| {
        b.iter(|| {
            let bytes = black_box(&segment).to_bytes();
            black_box(bytes);
        });
    });

    let bytes = segment.to_bytes();
    group.bench_function("deserialize", |b| {
        b.iter(|| {
            let packet = Packet::from_bytes(black_box(&bytes)).unwrap();
            black_box(packet);
        });
    });
    group.finish();
}

fn bench_ack_codec(c: &mut Criterion) {
    let ack = AckSegment::new(118_000, [SackBlock::new(119_180, 141_600)]);
    let bytes = ack.to_bytes();

    c.bench_function("ack_serialize", |b| {
        b.iter(|| {
            let bytes = black_box(&ack).to_bytes();
            black_box(bytes);
        });
    });

    c.bench_function("ack_deserialize", |b| {
        b.iter(|| {
            let ack = AckSegment::from_bytes(black_box(&bytes)).unwrap();
            black_box(ack);
        });
    });
}

fn bench_reassembly(c: &mut Criterion) {
    let payload = Bytes::from(vec![0u8; MAX_PAYLOAD_SIZE]);
    let mss = MAX_PAYLOAD_SIZE as u32;

    c.bench_function("reassemble_reversed_64", |b| {
        b.iter(|| {
            let mut buffer = ReceiveBuffer::new(0, 128);
            for i in (1..64u32).rev() {
                buffer.insert(i * mss, payload.clone());
            }
            black_box(buffer.ranges());
            buffer.advance(mss);
            while let Some(ready) = buffer.pop_ready() {
                black_box(ready);
            }
        });
    });
}

criterion_group!(
    benches,
    bench_data_segment_serialize,
    bench_ack_codec,
    bench_reassembly
);
criterion_main!(benches);
