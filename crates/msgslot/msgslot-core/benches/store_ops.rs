use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use msgslot_core::{MAX_MESSAGE_LEN, SlotId, SlotRegistry};

fn bench_write(c: &mut Criterion) {
    let registry = SlotRegistry::new();
    let mut handle = registry.open(SlotId::new(0).unwrap());
    handle.bind(1).unwrap();
    let payload = [b'x'; MAX_MESSAGE_LEN];

    let mut group = c.benchmark_group("channel");
    group.throughput(Throughput::Bytes(MAX_MESSAGE_LEN as u64));

    group.bench_function("write (127B)", |b| {
        b.iter(|| handle.write(black_box(&payload)).unwrap());
    });

    group.bench_function("read_into (127B)", |b| {
        let mut buf = [0u8; 128];
        b.iter(|| handle.read_into(black_box(&mut buf)).unwrap());
    });

    group.finish();
}

fn bench_bind(c: &mut Criterion) {
    let registry = SlotRegistry::new();
    let mut handle = registry.open(SlotId::new(0).unwrap());
    for id in 1..=1024 {
        handle.bind(id).unwrap();
    }

    let mut group = c.benchmark_group("store");
    group.throughput(Throughput::Elements(1));

    let mut next = 0u32;
    group.bench_function("bind (existing channel)", |b| {
        b.iter(|| {
            next = next % 1024 + 1;
            handle.bind(black_box(next)).unwrap()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_write, bench_bind);
criterion_main!(benches);
