use capbem::assembly::{assemble_panel_matrix, AssemblyOptions};
use capbem::element::{ElementData, Panel};
use capbem::potential::PotentialEngine;
use capbem::shapes;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

pub fn assembly_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("assembly");
    group.sample_size(20);

    let engine = PotentialEngine::new();

    for cells in [4, 8] {
        let panels: Vec<Panel> = shapes::plate(cells, cells, 1.0)
            .into_iter()
            .map(|t| Panel::new(t, ElementData::conductor()).unwrap())
            .collect();
        let refs: Vec<&Panel> = panels.iter().collect();
        let options = AssemblyOptions::default();

        group.bench_function(
            format!("Assembly of {0}x{0} potential matrix", refs.len()),
            |b| b.iter(|| black_box(assemble_panel_matrix(&refs, &engine, &options).unwrap())),
        );
    }
    group.finish();
}

criterion_group!(benches, assembly_benchmark);
criterion_main!(benches);
