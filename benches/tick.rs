//! Tick pipeline benchmarks: codec throughput and full room ticks at
//! varying entity counts.
//!
//! Run with: cargo bench --bench tick

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use uuid::Uuid;

use novastrike_server::game::archetype::{ArchetypeLibrary, SpawnEntry, SpawnSchedule};
use novastrike_server::game::input::{InputFrame, InputKeys};
use novastrike_server::net::protocol::{self, EntityRecord, Packet, Snapshot};
use novastrike_server::room::room::{Room, RoomConfig};
use novastrike_server::util::vec2::Vec2;

fn snapshot_with(count: usize) -> Snapshot {
    Snapshot {
        tick: 1000,
        entities: (0..count as u32)
            .map(|id| EntityRecord {
                id,
                pos: Vec2::new(id as f32 * 3.0, id as f32 * 1.5),
                sprite: (id % 8) as u16,
                frame: (id % 4) as u8,
                health: 100,
                kind: (id % 5) as u8,
            })
            .collect(),
    }
}

/// A room pre-populated with `darts` enemies plus one active player.
fn populated_room(darts: usize) -> Room {
    let entries = (0..darts)
        .map(|i| SpawnEntry {
            at: 0.0,
            archetype: "dart".to_string(),
            pos: Vec2::new(1200.0, 100.0 + (i % 50) as f32 * 10.0),
        })
        .collect();
    let mut room = Room::new(
        Uuid::new_v4(),
        RoomConfig::default(),
        ArchetypeLibrary::standard(),
        SpawnSchedule::new(entries),
    );
    room.join(0, "127.0.0.1:9000".parse().unwrap(), "bench".to_string())
        .unwrap();
    room.enqueue_input(InputFrame {
        slot: 0,
        keys: InputKeys::UP | InputKeys::FIRE,
        seq: 1,
    });
    // First tick drains the schedule and spawns the population.
    room.tick();
    room
}

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    for count in [0usize, 16, 128, 512] {
        let packet = Packet::Snapshot(snapshot_with(count));
        let encoded = protocol::encode(&packet);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("encode", count), &count, |b, _| {
            b.iter(|| black_box(protocol::encode(black_box(&packet))));
        });
        group.bench_with_input(BenchmarkId::new("decode", count), &count, |b, _| {
            b.iter(|| black_box(protocol::decode(black_box(&encoded)).unwrap()));
        });
    }
    group.finish();
}

fn bench_room_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("room_tick");
    group.sample_size(50);

    for darts in [10usize, 100, 300] {
        group.throughput(Throughput::Elements(darts as u64));
        group.bench_with_input(BenchmarkId::new("tick", darts), &darts, |b, &darts| {
            let mut room = populated_room(darts);
            b.iter(|| black_box(room.tick()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_codec, bench_room_tick);
criterion_main!(benches);
