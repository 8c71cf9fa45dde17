//! The native entry point the host calls to run an algorithm.

use crate::config::BridgeConfig;
use crate::digraph::SyntacticDigraph;
use crate::error::Result;
use crate::invocation::Invocation;
use crate::modules::ModuleRegistry;
use crate::runner::Algorithm;
use gdbridge_host::{Host, NativeFunction, RunArgs, Value};
use std::rc::Rc;
use std::time::Instant;

/// Runs one declared algorithm per host call: construct the syntactic digraph, run the
/// algorithm, synchronize, release.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    key: String,
    algorithm: Algorithm,
    config: Rc<BridgeConfig>,
    registry: Rc<ModuleRegistry>,
}

impl Dispatcher {
    pub fn new(
        key: impl Into<String>,
        algorithm: Algorithm,
        config: Rc<BridgeConfig>,
        registry: Rc<ModuleRegistry>,
    ) -> Self {
        Self {
            key: key.into(),
            algorithm,
            config,
            registry,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Runs the algorithm on the graph described by the host's four run tables (graph,
    /// vertices, edges, algorithm object).
    pub fn dispatch(&self, host: &dyn Host, args: &[Value]) -> Result<()> {
        let span = tracing::debug_span!("dispatch", key = %self.key);
        let _enter = span.enter();

        let timing_enabled = BridgeConfig::dispatch_timing_enabled();
        let total_start = timing_enabled.then(Instant::now);

        let run_args = RunArgs::from_values(args)?;
        let invocation = Invocation::new(host, &self.config, run_args)?;

        let construct_start = timing_enabled.then(Instant::now);
        let mut graph = SyntacticDigraph::construct(&invocation)?;
        let construct = construct_start.map(|s| s.elapsed());

        let run_start = timing_enabled.then(Instant::now);
        self.algorithm.execute(&mut graph, &self.registry)?;
        let run = run_start.map(|s| s.elapsed());

        let sync_start = timing_enabled.then(Instant::now);
        graph.synchronize()?;
        let sync = sync_start.map(|s| s.elapsed());

        if let (Some(total_start), Some(construct), Some(run), Some(sync)) =
            (total_start, construct, run, sync)
        {
            tracing::info!(
                key = %self.key,
                total_us = total_start.elapsed().as_micros() as u64,
                construct_us = construct.as_micros() as u64,
                run_us = run.as_micros() as u64,
                sync_us = sync.as_micros() as u64,
                back_indices = invocation.back_index_builds(),
                "dispatch timing"
            );
        }
        Ok(())
    }

    /// Wraps the dispatcher as a host-callable function. Errors abort the host call.
    pub fn into_native(self) -> NativeFunction {
        let this = Rc::new(self);
        Rc::new(move |host: &dyn Host, args: &[Value]| -> gdbridge_host::Result<Vec<Value>> {
            this.dispatch(host, args)
                .map_err(|e| gdbridge_host::Error::Native(Box::new(e)))?;
            Ok(Vec::new())
        })
    }
}
