use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::{Value, json};
use std::hint::black_box;

use raid_attendance::model::{AttendanceDataset, SortKey, ViewState};
use raid_attendance::normalize::normalize;
use raid_attendance::tooltip::detail;
use raid_attendance::view::project;

fn large_payload(players: usize, nights: usize) -> Value {
    let night_list: Vec<String> = (0..nights)
        .map(|i| {
            let month = 1 + (i / 28) % 12;
            let day = 1 + i % 28;
            format!("2025-{month:02}-{day:02}")
        })
        .collect();
    let rows: Vec<Value> = (0..players)
        .map(|i| {
            let attended = i % (nights + 1);
            json!({
                "name": format!("Raider{i:04}"),
                "attended": attended,
                "possible": nights,
                "lastSeen": night_list.get(attended.saturating_sub(1)),
            })
        })
        .collect();
    let per_player: serde_json::Map<String, Value> = (0..players)
        .map(|i| {
            let present: Vec<&String> = night_list.iter().step_by(1 + i % 3).collect();
            (format!("Raider{i:04}"), json!(present))
        })
        .collect();
    json!({ "nights": night_list, "rows": rows, "perPlayerDates": per_player })
}

fn sample_dataset() -> AttendanceDataset {
    normalize(&large_payload(400, 60)).unwrap()
}

fn bench_normalize(c: &mut Criterion) {
    let raw = large_payload(400, 60);
    c.bench_function("normalize_400x60", |b| {
        b.iter(|| {
            let dataset = normalize(black_box(&raw)).unwrap();
            black_box(dataset.records.len());
        })
    });
}

fn bench_project_sorts(c: &mut Criterion) {
    let dataset = sample_dataset();
    for key in [
        SortKey::Percentage,
        SortKey::Name,
        SortKey::Attended,
        SortKey::LastSeen,
    ] {
        let view = ViewState {
            sort_key: key,
            ..ViewState::default()
        };
        c.bench_function(&format!("project_{key:?}"), |b| {
            b.iter(|| {
                let rows = project(black_box(&dataset.records), &view);
                black_box(rows.len());
            })
        });
    }
}

fn bench_project_filtered(c: &mut Criterion) {
    let dataset = sample_dataset();
    let view = ViewState {
        search_query: "raider01".to_string(),
        sort_key: SortKey::Percentage,
        min_threshold: Some(75),
    };
    c.bench_function("project_search_threshold", |b| {
        b.iter(|| {
            let rows = project(black_box(&dataset.records), &view);
            black_box(rows.len());
        })
    });
}

fn bench_tooltip_detail(c: &mut Criterion) {
    let dataset = sample_dataset();
    c.bench_function("tooltip_detail", |b| {
        b.iter(|| {
            let info = detail(black_box("Raider0123"), &dataset);
            black_box(info.missing.len());
        })
    });
}

criterion_group!(
    perf,
    bench_normalize,
    bench_project_sorts,
    bench_project_filtered,
    bench_tooltip_detail
);
criterion_main!(perf);
