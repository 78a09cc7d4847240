//! Filter evaluation benchmarks
//!
//! The per-event filter check sits on the hot fan-out path, once per event
//! per subscription, so its cost bounds event throughput.

use aera::{
    is_event_passing_filters, CompiledFilter, Event, EventKind, EventTypeMask, ServerConfig,
    SubscriptionFilter,
};
use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::collections::{HashMap, HashSet};

fn make_event(severity: u16, source: &str, areas: &[&str]) -> Event {
    Event {
        kind: EventKind::Condition,
        category_id: 10,
        source_name: source.to_string(),
        source_areas: areas.iter().map(|a| a.to_string()).collect(),
        message: "tank level critically high".into(),
        severity,
        timestamp: Utc::now(),
        actor_id: None,
        condition: None,
        attributes: HashMap::new(),
    }
}

fn compile(spec: SubscriptionFilter) -> CompiledFilter {
    CompiledFilter::compile(spec, &ServerConfig::default()).unwrap()
}

fn bench_filter_evaluation(c: &mut Criterion) {
    let event = make_event(800, "Plant.TankFarm.Tank1", &["TankFarm", "NorthSite"]);

    let permissive = compile(SubscriptionFilter::default());
    c.bench_function("filter_permissive", |b| {
        b.iter(|| is_event_passing_filters(black_box(&event), black_box(&permissive)))
    });

    let severity_only = compile(SubscriptionFilter {
        low_severity: 500,
        high_severity: 1000,
        ..Default::default()
    });
    c.bench_function("filter_severity_range", |b| {
        b.iter(|| is_event_passing_filters(black_box(&event), black_box(&severity_only)))
    });

    let full = compile(SubscriptionFilter {
        event_types: EventTypeMask::CONDITION,
        category_ids: HashSet::from([10, 11, 12]),
        low_severity: 500,
        high_severity: 1000,
        areas: vec!["Tank*".into(), "Boiler?".into()],
        sources: vec!["Plant.*.Tank[0-9]".into()],
    });
    c.bench_function("filter_full_wildcards", |b| {
        b.iter(|| is_event_passing_filters(black_box(&event), black_box(&full)))
    });

    // Worst case: every clause is evaluated and the last one rejects
    let rejecting = compile(SubscriptionFilter {
        low_severity: 500,
        high_severity: 1000,
        areas: vec!["Tank*".into()],
        sources: vec!["Plant.Boiler*".into()],
        ..Default::default()
    });
    c.bench_function("filter_reject_on_source", |b| {
        b.iter(|| is_event_passing_filters(black_box(&event), black_box(&rejecting)))
    });
}

fn bench_filter_fanout(c: &mut Criterion) {
    // 64 subscriptions with mixed filters against one event, the shape of a
    // single fire_events fan-out step
    let event = make_event(800, "Plant.TankFarm.Tank1", &["TankFarm"]);
    let filters: Vec<CompiledFilter> = (0..64u16)
        .map(|i| {
            compile(SubscriptionFilter {
                low_severity: 1 + (i % 10) * 100,
                high_severity: 1000,
                areas: if i % 2 == 0 {
                    vec!["Tank*".into()]
                } else {
                    Vec::new()
                },
                ..Default::default()
            })
        })
        .collect();

    c.bench_function("filter_fanout_64_subscriptions", |b| {
        b.iter(|| {
            filters
                .iter()
                .filter(|f| is_event_passing_filters(black_box(&event), f))
                .count()
        })
    });
}

criterion_group!(benches, bench_filter_evaluation, bench_filter_fanout);
criterion_main!(benches);
