use gdbridge_core::{
    Algorithm, Bridged, BridgedGraph, BridgedLayout, Coordinate, Error, FnFactory, FunctionRunner,
    Key, RunParameters, Runner, Script,
};
use gdbridge_host::model::{GraphFixture, Model, PathEntry, path_entries};
use gdbridge_host::{Host, MemoryHost, RunArgs, TableRef, Value};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

trait Ranking {
    fn name(&self) -> &'static str;
}

struct LongestPath;

impl Ranking for LongestPath {
    fn name(&self) -> &'static str {
        "longest path"
    }
}

struct NetworkSimplex;

impl Ranking for NetworkSimplex {
    fn name(&self) -> &'static str {
        "network simplex"
    }
}

type RankingModule = Box<dyn Ranking>;

fn setup(host: &MemoryHost) -> (Model, RunArgs) {
    let model = Model::install(host).unwrap();
    let args = GraphFixture::from_json(json!({
        "options": { "spread": 20 },
        "vertices": [ { "name": "a" }, { "name": "b" }, { "name": "c" } ],
        "edges": [ { "tail": "a", "head": "b" }, { "tail": "b", "head": "c" } ]
    }))
    .unwrap()
    .build(host, &model)
    .unwrap();
    (model, args)
}

fn graph_options(host: &MemoryHost, args: &RunArgs) -> TableRef {
    host.get_table(args.graph, "options").unwrap().unwrap()
}

fn x_of(host: &MemoryHost, args: &RunArgs, index: usize) -> f64 {
    let v = host.get_index(args.vertices, index).unwrap().as_table().unwrap();
    let pos = host.get_table(v, "pos").unwrap().unwrap();
    host.get_field(pos, "x").unwrap().as_number().unwrap()
}

#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Vec<&'static str>>>);

impl Runner for Recorder {
    fn prepare(&mut self, _params: &RunParameters<'_, '_>) -> gdbridge_core::Result<()> {
        self.0.borrow_mut().push("prepare");
        Ok(())
    }

    fn bridge(&mut self, _params: &mut RunParameters<'_, '_>) -> gdbridge_core::Result<()> {
        self.0.borrow_mut().push("bridge");
        Ok(())
    }

    fn run(&mut self, _params: &mut RunParameters<'_, '_>) -> gdbridge_core::Result<()> {
        self.0.borrow_mut().push("run");
        Ok(())
    }

    fn unbridge(&mut self, _params: &mut RunParameters<'_, '_>) -> gdbridge_core::Result<()> {
        self.0.borrow_mut().push("unbridge");
        Ok(())
    }
}

#[test]
fn runner_steps_run_in_order_on_every_call() {
    let host = MemoryHost::new();
    let (model, args) = setup(&host);
    let script = Script::new(&host);
    let recorder = Recorder::default();
    script
        .declare(Key::new("recorded").algorithm(Algorithm::runner(recorder.clone())))
        .unwrap();

    model.run_algorithm(&host, "recorded", &args).unwrap();
    model.run_algorithm(&host, "recorded", &args).unwrap();

    assert_eq!(
        *recorder.0.borrow(),
        vec![
            "prepare", "bridge", "run", "unbridge", "prepare", "bridge", "run", "unbridge"
        ]
    );
}

#[test]
fn function_runners_read_graph_options() {
    let host = MemoryHost::new();
    let (model, args) = setup(&host);
    let script = Script::new(&host);
    script
        .declare(Key::new("spread out").algorithm(Algorithm::runner(FunctionRunner::new(
            |params: &mut RunParameters<'_, '_>| {
                let spread: f64 = params.option("spread")?.unwrap_or(1.0);
                let graph = params.graph_mut();
                for (i, v) in graph.vertices_mut().iter_mut().enumerate() {
                    v.pos = Coordinate::new(i as f64 * spread, 0.0);
                }
                Ok(())
            },
        ))))
        .unwrap();

    model.run_algorithm(&host, "spread out", &args).unwrap();

    assert_eq!(x_of(&host, &args, 3), 40.0);
}

#[test]
fn configure_option_only_calls_the_setter_for_set_options() {
    let host = MemoryHost::new();
    let (model, args) = setup(&host);
    let script = Script::new(&host);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    script
        .declare(Key::new("configured").algorithm(Algorithm::runner(FunctionRunner::new(
            move |params: &mut RunParameters<'_, '_>| {
                let mut spread = 0.0;
                let a = params.configure_option("spread", &mut spread, |s, v: f64| *s = v)?;
                let b = params.configure_option("missing", &mut spread, |s, v: f64| *s = v)?;
                sink.borrow_mut().push((a, b, spread));
                Ok(())
            },
        ))))
        .unwrap();

    model.run_algorithm(&host, "configured", &args).unwrap();

    assert_eq!(*seen.borrow(), vec![(true, false, 20.0)]);
}

#[test]
fn module_keys_instantiate_the_factory_found_in_the_option() {
    let host = MemoryHost::new();
    let (model, args) = setup(&host);
    let script = Script::new(&host);
    script
        .declare(Key::new("ranking").module(Rc::new(FnFactory::<RankingModule>::new(|_| {
            Ok(Box::new(NetworkSimplex))
        }))))
        .unwrap();

    let seen = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&seen);
    script
        .declare(Key::new("layered").algorithm(Algorithm::runner(FunctionRunner::new(
            move |params: &mut RunParameters<'_, '_>| {
                let ranking: Option<RankingModule> = params.make("ranking")?;
                *sink.borrow_mut() = ranking.map(|r| r.name());
                Ok(())
            },
        ))))
        .unwrap();

    // The host copies the key's initial value into the options of the graph being laid out.
    let decl = model.declaration(&host, "ranking").unwrap().unwrap();
    let initial = host.get_field(decl, "initial").unwrap();
    host.set_field(graph_options(&host, &args), "ranking", initial)
        .unwrap();

    model.run_algorithm(&host, "layered", &args).unwrap();
    assert_eq!(*seen.borrow(), Some("network simplex"));
}

#[test]
fn selected_modules_are_found_by_key_and_value() {
    let host = MemoryHost::new();
    let (model, args) = setup(&host);
    let script = Script::new(&host);
    script
        .register_module::<RankingModule>(
            "ranking method",
            "longest path",
            Rc::new(FnFactory::<RankingModule>::new(|_| Ok(Box::new(LongestPath)))),
        )
        .unwrap();
    script
        .register_module::<RankingModule>(
            "ranking method",
            "network simplex",
            Rc::new(FnFactory::<RankingModule>::new(|_| Ok(Box::new(NetworkSimplex)))),
        )
        .unwrap();
    assert!(matches!(
        script.register_module::<RankingModule>(
            "rank by",
            "longest path",
            Rc::new(FnFactory::<RankingModule>::new(|_| Ok(Box::new(LongestPath)))),
        ),
        Err(Error::ModuleKeyConflict { .. })
    ));

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    script
        .declare(Key::new("layered").algorithm(Algorithm::runner(FunctionRunner::new(
            move |params: &mut RunParameters<'_, '_>| {
                let ranking = params.select_module::<RankingModule>()?;
                sink.borrow_mut().push(ranking.map(|r| r.name()));
                Ok(())
            },
        ))))
        .unwrap();

    model.run_algorithm(&host, "layered", &args).unwrap();
    let options = graph_options(&host, &args);
    host.set_field(options, "ranking method", Value::from("longest path"))
        .unwrap();
    model.run_algorithm(&host, "layered", &args).unwrap();
    host.set_field(options, "ranking method", Value::from("tight tree"))
        .unwrap();
    let err = model.run_algorithm(&host, "layered", &args).unwrap_err();

    assert_eq!(*seen.borrow(), vec![None, Some("longest path")]);
    assert!(err.to_string().contains("tight tree"), "{err}");
}

#[test]
fn factories_producing_another_type_are_rejected() {
    let host = MemoryHost::new();
    let (model, args) = setup(&host);
    let script = Script::new(&host);
    script
        .declare(Key::new("ranking").module(Rc::new(FnFactory::<u32>::new(|_| Ok(7)))))
        .unwrap();
    script
        .declare(Key::new("layered").algorithm(Algorithm::runner(FunctionRunner::new(
            |params: &mut RunParameters<'_, '_>| {
                params.make::<RankingModule>("ranking")?;
                Ok(())
            },
        ))))
        .unwrap();

    let decl = model.declaration(&host, "ranking").unwrap().unwrap();
    let initial = host.get_field(decl, "initial").unwrap();
    host.set_field(graph_options(&host, &args), "ranking", initial)
        .unwrap();

    let err = model.run_algorithm(&host, "layered", &args).unwrap_err();
    assert!(err.to_string().starts_with("factory for 'ranking'"), "{err}");
}

/// Places nodes on a diagonal and routes the first edge through a corner.
#[derive(Default)]
struct Diagonal {
    step: f64,
}

impl BridgedLayout for Diagonal {
    fn configure(&mut self, params: &RunParameters<'_, '_>) -> gdbridge_core::Result<()> {
        self.step = params.option("spread")?.unwrap_or(1.0);
        Ok(())
    }

    fn call(&mut self, graph: &mut BridgedGraph) -> gdbridge_core::Result<()> {
        for (i, node) in graph.nodes.iter_mut().enumerate() {
            node.x = i as f64 * self.step;
            node.y = i as f64 * self.step;
        }
        if let Some(edge) = graph.edges.first_mut() {
            let target = graph.nodes[edge.target];
            let source = graph.nodes[edge.source];
            edge.bends = vec![
                Coordinate::new(target.x, source.y),
                Coordinate::new(target.x, source.y),
            ];
        }
        Ok(())
    }
}

#[test]
fn bridged_layouts_write_positions_and_bends_back() {
    let host = MemoryHost::new();
    let (model, args) = setup(&host);
    let script = Script::new(&host);
    script
        .declare(Key::new("diagonal").algorithm(Algorithm::runner(Bridged::new(Diagonal::default()))))
        .unwrap();

    model.run_algorithm(&host, "diagonal", &args).unwrap();

    assert_eq!(x_of(&host, &args, 2), 20.0);
    let path_of = |index: usize| {
        let e = host.get_index(args.edges, index).unwrap().as_table().unwrap();
        let path = host.get_table(e, "path").unwrap().unwrap();
        path_entries(&host, path).unwrap()
    };
    assert_eq!(
        path_of(1),
        vec![
            PathEntry::Command("moveto".to_string()),
            PathEntry::Point(0.0, 0.0),
            PathEntry::Command("lineto".to_string()),
            PathEntry::Point(20.0, 0.0),
            PathEntry::Command("lineto".to_string()),
            PathEntry::Point(20.0, 20.0),
        ]
    );
    // No bends: the default straight line.
    assert_eq!(path_of(2).len(), 4);
}
