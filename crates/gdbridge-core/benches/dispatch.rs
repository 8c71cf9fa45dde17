use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use gdbridge_core::{Algorithm, BridgeConfig, Digraph, Dispatcher, ModuleRegistry};
use gdbridge_host::model::{GraphFixture, Model};
use gdbridge_host::{MemoryHost, RunArgs};
use serde_json::json;
use std::hint::black_box;
use std::rc::Rc;
use std::time::Duration;

fn ring_fixture(name: &str, vertex_count: usize, chords: usize) -> serde_json::Value {
    let names: Vec<String> = (0..vertex_count).map(|i| format!("{name}_v{i}")).collect();
    let vertices: Vec<_> = names.iter().map(|n| json!({ "name": n })).collect();
    let mut edges = Vec::new();
    for i in 0..vertex_count {
        edges.push(json!({ "tail": names[i], "head": names[(i + 1) % vertex_count] }));
        for k in 2..=(chords + 1) {
            let to = (i + k * 7) % vertex_count;
            if to != i {
                edges.push(json!({ "tail": names[i], "head": names[to], "direction": "--" }));
            }
        }
    }
    json!({ "options": { "radius": 100 }, "vertices": vertices, "edges": edges })
}

fn setup(fixture: &serde_json::Value) -> (MemoryHost, RunArgs) {
    let host = MemoryHost::new();
    let model = Model::install(&host).expect("model installs");
    let args = GraphFixture::from_json(fixture.clone())
        .and_then(|f| f.build(&host, &model))
        .expect("fixture builds");
    (host, args)
}

fn circle() -> Algorithm {
    Algorithm::function(|g| {
        let radius = g.options().number("radius")?.unwrap_or(10.0);
        let n = g.vertices().len() as f64;
        for (i, v) in g.vertices_mut().iter_mut().enumerate() {
            let alpha = i as f64 * std::f64::consts::TAU / n;
            v.pos = (alpha.cos() * radius, alpha.sin() * radius).into();
        }
        Ok(())
    })
}

fn ugraph_walk() -> Algorithm {
    Algorithm::function(|g| {
        let ugraph = Digraph::open(g, "ugraph")?;
        let mut degree_sum = 0usize;
        for v in 1..=ugraph.vertex_count()? {
            degree_sum += ugraph.outgoing(v)?.len();
        }
        black_box(degree_sum);
        Ok(())
    })
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    group.measurement_time(Duration::from_secs(10));

    let cases = [
        ("ring_50_c2", 50usize, 2usize),
        ("ring_200_c3", 200usize, 3usize),
        ("ring_800_c3", 800usize, 3usize),
    ];
    let config = Rc::new(BridgeConfig::default());
    let registry = Rc::new(ModuleRegistry::new());

    for (name, vertices, chords) in cases {
        let fixture = ring_fixture(name, vertices, chords);
        for (label, algorithm) in [("circle", circle()), ("ugraph_walk", ugraph_walk())] {
            let dispatcher = Dispatcher::new(
                label,
                algorithm,
                Rc::clone(&config),
                Rc::clone(&registry),
            );
            group.bench_with_input(BenchmarkId::new(label, name), &fixture, |b, fixture| {
                b.iter_batched(
                    || setup(fixture),
                    |(host, args)| {
                        dispatcher
                            .dispatch(black_box(&host), &args.as_values())
                            .expect("dispatch succeeds");
                        black_box(host.table_count());
                    },
                    BatchSize::LargeInput,
                )
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
