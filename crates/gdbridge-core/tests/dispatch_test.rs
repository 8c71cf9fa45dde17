use gdbridge_core::{Algorithm, BridgeConfig, Dispatcher, Error, Key, ModuleRegistry, Script};
use gdbridge_host::model::{GraphFixture, Model, PathEntry, path_entries};
use gdbridge_host::{Host, MemoryHost, RunArgs, TableRef, Value};
use serde_json::json;
use std::rc::Rc;

fn build(host: &MemoryHost, model: &Model, fixture: serde_json::Value) -> RunArgs {
    GraphFixture::from_json(fixture)
        .unwrap()
        .build(host, model)
        .unwrap()
}

fn two_vertices() -> serde_json::Value {
    json!({
        "vertices": [
            { "name": "a", "pos": [0, 0] },
            { "name": "b", "pos": [5, 5] }
        ],
        "edges": [ { "tail": "a", "head": "b" } ]
    })
}

fn dispatcher(algorithm: Algorithm) -> Dispatcher {
    Dispatcher::new(
        "test layout",
        algorithm,
        Rc::new(BridgeConfig::default()),
        Rc::new(ModuleRegistry::new()),
    )
}

fn element(host: &MemoryHost, array: TableRef, index: usize) -> TableRef {
    host.get_index(array, index).unwrap().as_table().unwrap()
}

fn position(host: &MemoryHost, args: &RunArgs, index: usize) -> (f64, f64) {
    let pos = host
        .get_table(element(host, args.vertices, index), "pos")
        .unwrap()
        .unwrap();
    (
        host.get_field(pos, "x").unwrap().as_number().unwrap(),
        host.get_field(pos, "y").unwrap().as_number().unwrap(),
    )
}

fn edge_path(host: &MemoryHost, args: &RunArgs, index: usize) -> Vec<PathEntry> {
    let path = host
        .get_table(element(host, args.edges, index), "path")
        .unwrap()
        .unwrap();
    path_entries(host, path).unwrap()
}

fn point(x: f64, y: f64) -> PathEntry {
    PathEntry::Point(x, y)
}

fn command(c: &str) -> PathEntry {
    PathEntry::Command(c.to_string())
}

#[test]
fn no_op_algorithm_writes_positions_back_unchanged() {
    let host = MemoryHost::new();
    let model = Model::install(&host).unwrap();
    let args = build(&host, &model, two_vertices());

    dispatcher(Algorithm::function(|_| Ok(())))
        .dispatch(&host, &args.as_values())
        .unwrap();

    assert_eq!(position(&host, &args, 1), (0.0, 0.0));
    assert_eq!(position(&host, &args, 2), (5.0, 5.0));
}

#[test]
fn unset_edge_paths_become_anchor_lines_from_final_positions() {
    let host = MemoryHost::new();
    let model = Model::install(&host).unwrap();
    let args = build(&host, &model, two_vertices());

    dispatcher(Algorithm::function(|g| {
        g.vertices_mut()[0].pos = (10.0, 0.0).into();
        g.vertices_mut()[1].pos = (10.0, 10.0).into();
        Ok(())
    }))
    .dispatch(&host, &args.as_values())
    .unwrap();

    assert_eq!(position(&host, &args, 1), (10.0, 0.0));
    assert_eq!(position(&host, &args, 2), (10.0, 10.0));
    assert_eq!(
        edge_path(&host, &args, 1),
        vec![
            command("moveto"),
            point(10.0, 0.0),
            command("lineto"),
            point(10.0, 10.0)
        ]
    );
}

#[test]
fn synchronized_paths_carry_the_path_class() {
    let host = MemoryHost::new();
    let model = Model::install(&host).unwrap();
    let args = build(&host, &model, two_vertices());

    dispatcher(Algorithm::function(|_| Ok(())))
        .dispatch(&host, &args.as_values())
        .unwrap();

    let path = host
        .get_table(element(&host, args.edges, 1), "path")
        .unwrap()
        .unwrap();
    assert_eq!(host.metatable(path).unwrap(), Some(model.path_class));
}

#[test]
fn explicit_paths_are_written_verbatim() {
    let host = MemoryHost::new();
    let model = Model::install(&host).unwrap();
    let args = build(&host, &model, two_vertices());

    dispatcher(Algorithm::function(|g| {
        let path = &mut g.edges_mut()[0].path;
        path.append_move(0.0, 0.0);
        path.append_curve(1.0, 2.0, 3.0, 4.0, 5.0, 5.0);
        path.append_raw("--cycle");
        Ok(())
    }))
    .dispatch(&host, &args.as_values())
    .unwrap();

    assert_eq!(
        edge_path(&host, &args, 1),
        vec![
            command("moveto"),
            point(0.0, 0.0),
            command("curveto"),
            point(1.0, 2.0),
            point(3.0, 4.0),
            point(5.0, 5.0),
            command("--cycle"),
        ]
    );
}

#[test]
fn a_lone_close_is_kept_as_the_whole_path() {
    let host = MemoryHost::new();
    let model = Model::install(&host).unwrap();
    let args = build(&host, &model, two_vertices());

    dispatcher(Algorithm::function(|g| {
        g.edges_mut()[0].path.append_close();
        Ok(())
    }))
    .dispatch(&host, &args.as_values())
    .unwrap();

    assert_eq!(edge_path(&host, &args, 1), vec![command("closepath")]);
}

#[test]
fn cleared_paths_stay_empty() {
    let host = MemoryHost::new();
    let model = Model::install(&host).unwrap();
    let args = build(&host, &model, two_vertices());

    dispatcher(Algorithm::function(|g| {
        g.edges_mut()[0].path.clear();
        Ok(())
    }))
    .dispatch(&host, &args.as_values())
    .unwrap();

    assert!(edge_path(&host, &args, 1).is_empty());
}

#[test]
fn anchors_named_by_vertex_options_offset_the_default_path() {
    let host = MemoryHost::new();
    let model = Model::install(&host).unwrap();
    let args = build(
        &host,
        &model,
        json!({
            "vertices": [
                { "name": "a", "pos": [0, 0], "anchors": { "south": [0, -2] },
                  "options": { "tail anchor": "south" } },
                { "name": "b", "pos": [0, 10], "anchors": { "north": [0, 2] },
                  "options": { "head anchor": "north" } }
            ],
            "edges": [ { "tail": "a", "head": "b" } ]
        }),
    );

    dispatcher(Algorithm::function(|_| Ok(())))
        .dispatch(&host, &args.as_values())
        .unwrap();

    assert_eq!(
        edge_path(&host, &args, 1),
        vec![
            command("moveto"),
            point(0.0, -2.0),
            command("lineto"),
            point(0.0, 12.0)
        ]
    );
}

#[test]
fn unknown_anchors_fall_back_to_the_vertex_position() {
    let host = MemoryHost::new();
    let model = Model::install(&host).unwrap();
    let args = build(
        &host,
        &model,
        json!({
            "vertices": [
                { "name": "a", "pos": [1, 1], "options": { "tail anchor": "nowhere" } },
                { "name": "b", "pos": [2, 2] }
            ],
            "edges": [ { "tail": "a", "head": "b" } ]
        }),
    );

    dispatcher(Algorithm::function(|_| Ok(())))
        .dispatch(&host, &args.as_values())
        .unwrap();

    assert_eq!(edge_path(&host, &args, 1)[1], point(1.0, 1.0));
}

#[test]
fn vertex_adjacency_follows_edge_order() {
    let host = MemoryHost::new();
    let model = Model::install(&host).unwrap();
    let args = build(
        &host,
        &model,
        json!({
            "vertices": [ { "name": "a" }, { "name": "b" }, { "name": "c" } ],
            "edges": [
                { "tail": "a", "head": "b" },
                { "tail": "c", "head": "b" },
                { "tail": "a", "head": "c" }
            ]
        }),
    );

    dispatcher(Algorithm::function(|g| {
        let out: Vec<usize> = g.vertices()[0].outgoing().iter().map(|e| e.index()).collect();
        let inc: Vec<usize> = g.vertices()[1].incoming().iter().map(|e| e.index()).collect();
        assert_eq!(out, vec![0, 2]);
        assert_eq!(inc, vec![0, 1]);
        assert_eq!(g.edges()[1].tail().index(), 2);
        assert_eq!(g.edges()[1].direction(), "->");
        Ok(())
    }))
    .dispatch(&host, &args.as_values())
    .unwrap();
}

#[test]
fn edges_to_foreign_vertices_fail_construction() {
    let host = MemoryHost::new();
    let model = Model::install(&host).unwrap();
    let args = build(&host, &model, two_vertices());

    let stranger = host.record([("name", Value::from("x"))]);
    let edge = element(&host, args.edges, 1);
    host.set_field(edge, "head", Value::Table(stranger)).unwrap();

    let err = dispatcher(Algorithm::function(|_| Ok(())))
        .dispatch(&host, &args.as_values())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::UnresolvedVertex {
            edge: 0,
            endpoint: "head"
        }
    ));
}

#[test]
fn malformed_vertex_paths_fail_construction() {
    let host = MemoryHost::new();
    let model = Model::install(&host).unwrap();
    let args = build(&host, &model, two_vertices());

    let stray = host
        .call_one(
            &host.get_field(model.coordinate_class, "new").unwrap(),
            &[Value::Number(1.0), Value::Number(1.0)],
        )
        .unwrap();
    let path = host.array([stray]);
    let vertex = element(&host, args.vertices, 1);
    host.set_field(vertex, "path", Value::Table(path)).unwrap();

    let err = dispatcher(Algorithm::function(|_| Ok(())))
        .dispatch(&host, &args.as_values())
        .unwrap_err();
    assert!(matches!(err, Error::MalformedPath { .. }));
}

#[test]
fn algorithm_errors_abort_the_host_call() {
    let host = MemoryHost::new();
    let model = Model::install(&host).unwrap();
    let args = build(&host, &model, two_vertices());

    let script = Script::new(&host);
    script
        .declare(
            Key::new("failing layout")
                .algorithm(Algorithm::function(|_| Err(Error::algorithm("no layout today")))),
        )
        .unwrap();

    let err = model
        .run_algorithm(&host, "failing layout", &args)
        .unwrap_err();
    assert_eq!(err.to_string(), "algorithm failed: no layout today");
    // Nothing was synchronized.
    assert!(
        host.get_table(element(&host, args.edges, 1), "path")
            .unwrap()
            .is_none()
    );
}

#[test]
fn missing_run_tables_are_rejected() {
    let host = MemoryHost::new();
    Model::install(&host).unwrap();
    let err = dispatcher(Algorithm::function(|_| Ok(())))
        .dispatch(&host, &[Value::Nil])
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "bad argument #1 to 'algorithm': table expected"
    );
}

#[test]
fn circle_layout_end_to_end() {
    let host = MemoryHost::new();
    let model = Model::install(&host).unwrap();
    let args = build(
        &host,
        &model,
        json!({
            "options": { "radius": 3 },
            "vertices": [ { "name": "a" }, { "name": "b" }, { "name": "c" }, { "name": "d" } ]
        }),
    );

    dispatcher(Algorithm::function(|g| {
        let r = g.options().as_number("radius")?;
        let n = g.vertices().len() as f64;
        for (i, v) in g.vertices_mut().iter_mut().enumerate() {
            let alpha = std::f64::consts::TAU * i as f64 / n;
            v.pos = (r * alpha.cos(), r * alpha.sin()).into();
        }
        Ok(())
    }))
    .dispatch(&host, &args.as_values())
    .unwrap();

    let expected = [(3.0, 0.0), (0.0, 3.0), (-3.0, 0.0), (0.0, -3.0)];
    for (i, (x, y)) in expected.into_iter().enumerate() {
        let (px, py) = position(&host, &args, i + 1);
        assert!((px - x).abs() < 1e-9 && (py - y).abs() < 1e-9, "vertex {i}: ({px}, {py})");
    }
}
