use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rdout_protocol::packet::{checksum, Packet};
use rdout_protocol::sequence::SeqNumber;
use rdout_protocol::window::SendWindow;

fn bench_data_packet_serialize(c: &mut Criterion) {
    let payload = Bytes::from(vec![0u8; 1015]); // Largest payload in a 1 KiB datagram
    let packet = Packet::data(SeqNumber::new(1000), payload);

    c.bench_function("data_packet_serialize", |b| {
        b.iter(|| {
            let bytes = black_box(&packet).to_bytes();
            black_box(bytes);
        });
    });
}

fn bench_data_packet_deserialize(c: &mut Criterion) {
    let payload = Bytes::from(vec![0u8; 1015]);
    let bytes = Packet::data(SeqNumber::new(1000), payload).to_bytes();

    c.bench_function("data_packet_deserialize", |b| {
        b.iter(|| {
            let packet = Packet::from_bytes(black_box(&bytes)).unwrap();
            black_box(packet.is_valid());
        });
    });
}

fn bench_ack_roundtrip(c: &mut Criterion) {
    c.bench_function("ack_roundtrip", |b| {
        b.iter(|| {
            let bytes = Packet::ack(black_box(SeqNumber::new(42))).to_bytes();
            let packet = Packet::from_bytes(&bytes).unwrap();
            black_box(packet);
        });
    });
}

fn bench_checksum(c: &mut Criterion) {
    let mut group = c.benchmark_group("checksum");

    for size in [64usize, 512, 1015] {
        let data = vec![0xA5u8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("crc32_{}", size), |b| {
            b.iter(|| black_box(checksum(black_box(&data))));
        });
    }

    group.finish();
}

fn bench_window_cycle(c: &mut Criterion) {
    c.bench_function("window_admit_ack_cycle", |b| {
        b.iter(|| {
            let mut window = SendWindow::new(1024, 32);
            while !window.is_complete() {
                while let Some(admission) = window.admit() {
                    black_box(admission);
                }
                let last = window.next_seq().prev();
                black_box(window.on_ack(last));
            }
        });
    });
}

criterion_group!(
    benches,
    bench_data_packet_serialize,
    bench_data_packet_deserialize,
    bench_ack_roundtrip,
    bench_checksum,
    bench_window_cycle
);
criterion_main!(benches);
