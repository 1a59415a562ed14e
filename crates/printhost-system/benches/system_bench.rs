// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the request-path reads on the system object:
// attribute getters, filter lookup, and version export.

use std::collections::HashSet;
use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use printhost_core::config::SystemConfig;
use printhost_core::types::{AttributeScope, Contact, FirmwareVersion};
use printhost_system::{FilterContext, PWG_RASTER, System, SystemResolver, noop_registrar};

// ---------------------------------------------------------------------------
// Helper
// ---------------------------------------------------------------------------

fn bench_system() -> System {
    let config = SystemConfig {
        name: "Bench System".into(),
        hostname: Some("bench.local".into()),
        spool_dir: Some(std::env::temp_dir()),
        ..SystemConfig::default()
    };
    let system = System::with_collaborators(config, Arc::new(SystemResolver), noop_registrar())
        .expect("system");
    system.set_contact(Contact::new("Ada", "ada@example.com", "+1 555 0100"));
    system.set_versions(vec![FirmwareVersion::new("Bench Driver", "", "1.4.2")]);
    system
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_getters(c: &mut Criterion) {
    let system = bench_system();

    c.bench_function("contact_copy", |b| {
        b.iter(|| black_box(system.contact()));
    });
    c.bench_function("hostname_copy", |b| {
        b.iter(|| black_box(system.hostname()));
    });
}

/// Lookup cost with a realistic number of registered filters.
fn bench_find_filter(c: &mut Criterion) {
    let system = bench_system();
    let sources: [&'static str; 6] = [
        "application/pdf",
        "application/postscript",
        "image/jpeg",
        "image/png",
        "image/urf",
        "text/plain",
    ];
    for src in sources {
        system.add_filter(src, PWG_RASTER, Arc::new(|_: &mut FilterContext<'_>| true));
    }

    c.bench_function("find_filter (6 registered)", |b| {
        b.iter(|| black_box(system.find_filter(black_box("image/png"), PWG_RASTER)));
    });
}

fn bench_export_versions(c: &mut Criterion) {
    let system = bench_system();
    let requested: HashSet<String> = ["system-firmware-version".to_owned()].into();

    let mut group = c.benchmark_group("export_versions");
    group.bench_function("all attributes", |b| {
        b.iter(|| black_box(system.export_versions(AttributeScope::System, None).encode()));
    });
    group.bench_function("one attribute", |b| {
        b.iter(|| {
            black_box(
                system
                    .export_versions(AttributeScope::System, Some(&requested))
                    .encode(),
            )
        });
    });
    group.finish();
}

criterion_group!(benches, bench_getters, bench_find_filter, bench_export_versions);
criterion_main!(benches);
