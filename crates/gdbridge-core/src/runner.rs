//! What a native algorithm looks like to the dispatcher.
//!
//! The simplest algorithm is a function over the [`SyntacticDigraph`]. Object-style algorithms
//! implement [`Runner`], whose lifecycle is `prepare`, `bridge`, `run`, `unbridge`: `bridge`
//! may build a different graph representation for a layout library, `run` lays it out and
//! `unbridge` copies the results back before the dispatcher synchronizes.

use crate::digraph::SyntacticDigraph;
use crate::error::{Error, Result};
use crate::modules::ModuleRegistry;
use crate::options::{FromOption, OptionTable};
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

pub trait Runner {
    fn prepare(&mut self, _params: &RunParameters<'_, '_>) -> Result<()> {
        Ok(())
    }

    fn bridge(&mut self, _params: &mut RunParameters<'_, '_>) -> Result<()> {
        Ok(())
    }

    fn run(&mut self, params: &mut RunParameters<'_, '_>) -> Result<()>;

    fn unbridge(&mut self, _params: &mut RunParameters<'_, '_>) -> Result<()> {
        Ok(())
    }
}

/// Runs a plain function as the `run` step.
pub struct FunctionRunner<F>(F);

impl<F> FunctionRunner<F>
where
    F: FnMut(&mut RunParameters<'_, '_>) -> Result<()>,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Runner for FunctionRunner<F>
where
    F: FnMut(&mut RunParameters<'_, '_>) -> Result<()>,
{
    fn run(&mut self, params: &mut RunParameters<'_, '_>) -> Result<()> {
        (self.0)(params)
    }
}

pub type AlgorithmFn = dyn Fn(&mut SyntacticDigraph<'_>) -> Result<()>;

/// A native algorithm bound to a declaration.
#[derive(Clone)]
pub enum Algorithm {
    Function(Rc<AlgorithmFn>),
    Runner(Rc<RefCell<dyn Runner>>),
}

impl std::fmt::Debug for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Algorithm::Function(_) => f.write_str("Algorithm::Function"),
            Algorithm::Runner(_) => f.write_str("Algorithm::Runner"),
        }
    }
}

impl Algorithm {
    pub fn function(f: impl Fn(&mut SyntacticDigraph<'_>) -> Result<()> + 'static) -> Self {
        Algorithm::Function(Rc::new(f))
    }

    pub fn runner(runner: impl Runner + 'static) -> Self {
        Algorithm::Runner(Rc::new(RefCell::new(runner)))
    }

    pub(crate) fn execute(
        &self,
        graph: &mut SyntacticDigraph<'_>,
        registry: &ModuleRegistry,
    ) -> Result<()> {
        match self {
            Algorithm::Function(f) => f(graph),
            Algorithm::Runner(runner) => {
                let mut runner = runner
                    .try_borrow_mut()
                    .map_err(|_| Error::algorithm("runner is already running"))?;
                let mut params = RunParameters::new(graph, registry);
                runner.prepare(&params)?;
                runner.bridge(&mut params)?;
                runner.run(&mut params)?;
                runner.unbridge(&mut params)
            }
        }
    }
}

/// What a [`Runner`] gets to work with: the syntactic digraph and the module registry.
///
/// Option helpers read the graph-level options.
pub struct RunParameters<'a, 'i> {
    graph: &'a mut SyntacticDigraph<'i>,
    registry: &'a ModuleRegistry,
}

impl<'a, 'i> RunParameters<'a, 'i> {
    pub fn new(graph: &'a mut SyntacticDigraph<'i>, registry: &'a ModuleRegistry) -> Self {
        Self { graph, registry }
    }

    pub fn graph(&self) -> &SyntacticDigraph<'i> {
        &*self.graph
    }

    pub fn graph_mut(&mut self) -> &mut SyntacticDigraph<'i> {
        &mut *self.graph
    }

    pub fn registry(&self) -> &ModuleRegistry {
        self.registry
    }

    pub fn options(&self) -> OptionTable<'i> {
        self.graph.options()
    }

    /// `None` when the option is unset.
    pub fn option<T: FromOption>(&self, key: &str) -> Result<Option<T>> {
        self.options().value(key)
    }

    pub fn option_is_set<T: FromOption>(&self, key: &str) -> Result<bool> {
        self.options().is::<T>(key)
    }

    /// Calls `setter` with the option value when it is set. Returns whether it was.
    pub fn configure_option<T, L>(
        &self,
        key: &str,
        layout: &mut L,
        setter: impl FnOnce(&mut L, T),
    ) -> Result<bool>
    where
        T: FromOption,
    {
        match self.option::<T>(key)? {
            Some(value) => {
                setter(layout, value);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn downcast<M: 'static>(product: Box<dyn Any>, key: &str) -> Result<M> {
        product
            .downcast::<M>()
            .map(|m| *m)
            .map_err(|_| Error::FactoryType {
                key: key.to_string(),
                expected: std::any::type_name::<M>(),
            })
    }

    /// Instantiates the factory stored (as an opaque value) under `key`. `None` when unset.
    pub fn make<M: 'static>(&self, key: &str) -> Result<Option<M>> {
        let Some(handle) = self.options().opaque(key)? else {
            return Ok(None);
        };
        let factory = self
            .registry
            .factory(handle)
            .ok_or_else(|| Error::UnknownFactory {
                key: key.to_string(),
            })?;
        Self::downcast(factory.make(self)?, key).map(Some)
    }

    /// Calls `setter` with a module made from the factory under `key`, if one is set.
    pub fn configure_module<M, L>(
        &self,
        key: &str,
        layout: &mut L,
        setter: impl FnOnce(&mut L, M),
    ) -> Result<bool>
    where
        M: 'static,
    {
        match self.make::<M>(key)? {
            Some(module) => {
                setter(layout, module);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Instantiates the implementation of module type `M` the user selected through the key
    /// registered for `M`. `None` when no key is registered for `M` or the key is unset.
    pub fn select_module<M: 'static>(&self) -> Result<Option<M>> {
        let Some(key) = self.registry.key_of::<M>() else {
            return Ok(None);
        };
        let Some(value) = self.options().string(&key)? else {
            return Ok(None);
        };
        let factory = self
            .registry
            .module_factory::<M>(&key, &value)
            .ok_or_else(|| Error::UnknownModule {
                type_name: std::any::type_name::<M>(),
                key: key.clone(),
                value: value.clone(),
            })?;
        Self::downcast(factory.make(self)?, &key).map(Some)
    }
}
