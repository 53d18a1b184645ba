//! Benchmarks for the candidate search tiers.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use invenova::search;
use invenova::store::{InventoryItem, MemoryStore};

fn synthetic_store(items: usize) -> MemoryStore {
    let families = [
        "DC Motor", "Servo Motor", "Stepper Motor", "Motor Driver", "IR Sensor",
        "Ultrasonic Sensor", "Adaptor", "Battery", "Multimeter", "Oscilloscope",
    ];
    let rows = (0..items)
        .map(|i| InventoryItem {
            name: format!("{} {}V {}RPM", families[i % families.len()], i % 24 + 1, i * 10),
            quantity: (i % 7) as u32,
            location: format!("Shelf {}", i % 12),
            last_updated: String::new(),
        })
        .collect();
    MemoryStore::with_items(rows)
}

fn bench_exact_search(c: &mut Criterion) {
    let store = synthetic_store(500);
    c.bench_function("exact_search_500", |bench| {
        bench.iter(|| black_box(search::exact_search(&store, "servo motor 12")))
    });
}

fn bench_ranked_search(c: &mut Criterion) {
    let store = synthetic_store(500);
    c.bench_function("ranked_search_500", |bench| {
        bench.iter(|| black_box(search::ranked_search(&store, "green servo motor driver", 0.85)))
    });
}

criterion_group!(benches, bench_exact_search, bench_ranked_search);
criterion_main!(benches);
