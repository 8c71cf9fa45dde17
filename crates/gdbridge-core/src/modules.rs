//! Module factories.
//!
//! Algorithms built from exchangeable parts (a ranking step, a crossing minimizer, ...) let the
//! user pick each part with an option key. Declarations hand the host opaque handles that stand
//! for factories; at run time the handle found in an option is turned back into a factory and
//! invoked. The registry also keeps a `(module type, key, value)` table so that an algorithm can
//! ask "which implementation of this module type did the user select".

use crate::error::{Error, Result};
use crate::runner::RunParameters;
use gdbridge_host::OpaqueHandle;
use rustc_hash::FxHashMap;
use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::rc::Rc;

/// Creates module instances for a run.
pub trait Factory {
    fn make(&self, params: &RunParameters<'_, '_>) -> Result<Box<dyn Any>>;

    /// Name of the produced type, for diagnostics.
    fn product(&self) -> &'static str;
}

impl std::fmt::Debug for dyn Factory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Factory<{}>", self.product())
    }
}

/// Factory producing `M::default()`.
pub struct DefaultFactory<M>(PhantomData<fn() -> M>);

impl<M> DefaultFactory<M> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<M> Default for DefaultFactory<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Default + 'static> Factory for DefaultFactory<M> {
    fn make(&self, _params: &RunParameters<'_, '_>) -> Result<Box<dyn Any>> {
        Ok(Box::new(M::default()))
    }

    fn product(&self) -> &'static str {
        std::any::type_name::<M>()
    }
}

/// Factory backed by a closure that may read run options.
pub struct FnFactory<M> {
    make: Box<dyn Fn(&RunParameters<'_, '_>) -> Result<M>>,
}

impl<M: 'static> FnFactory<M> {
    pub fn new(make: impl Fn(&RunParameters<'_, '_>) -> Result<M> + 'static) -> Self {
        Self {
            make: Box::new(make),
        }
    }
}

impl<M: 'static> Factory for FnFactory<M> {
    fn make(&self, params: &RunParameters<'_, '_>) -> Result<Box<dyn Any>> {
        Ok(Box::new((self.make)(params)?))
    }

    fn product(&self) -> &'static str {
        std::any::type_name::<M>()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ModuleSlot {
    module: TypeId,
    key: String,
    value: String,
}

#[derive(Default)]
pub struct ModuleRegistry {
    next_handle: Cell<u64>,
    handles: RefCell<FxHashMap<OpaqueHandle, Rc<dyn Factory>>>,
    keys: RefCell<FxHashMap<TypeId, String>>,
    modules: RefCell<FxHashMap<ModuleSlot, Rc<dyn Factory>>>,
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("handles", &self.handles.borrow().len())
            .field("modules", &self.modules.borrow().len())
            .finish()
    }
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `factory` and returns the opaque handle that stands for it on the host side.
    pub fn insert_factory(&self, factory: Rc<dyn Factory>) -> OpaqueHandle {
        let id = self.next_handle.get() + 1;
        self.next_handle.set(id);
        let handle = OpaqueHandle(id);
        self.handles.borrow_mut().insert(handle, factory);
        handle
    }

    pub fn factory(&self, handle: OpaqueHandle) -> Option<Rc<dyn Factory>> {
        self.handles.borrow().get(&handle).cloned()
    }

    /// Registers `factory` as the implementation of module type `M` selected by `key = value`.
    /// `M` is the type the factory produces, typically a boxed trait object.
    ///
    /// Every module type is selected through exactly one key.
    pub fn register_module<M: ?Sized + 'static>(
        &self,
        key: &str,
        value: &str,
        factory: Rc<dyn Factory>,
    ) -> Result<()> {
        let module = TypeId::of::<M>();
        {
            let mut keys = self.keys.borrow_mut();
            match keys.get(&module) {
                Some(existing) if existing != key => {
                    return Err(Error::ModuleKeyConflict {
                        type_name: std::any::type_name::<M>(),
                        existing: existing.clone(),
                        requested: key.to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    keys.insert(module, key.to_string());
                }
            }
        }
        self.modules.borrow_mut().insert(
            ModuleSlot {
                module,
                key: key.to_string(),
                value: value.to_string(),
            },
            factory,
        );
        Ok(())
    }

    pub fn module_factory<M: ?Sized + 'static>(
        &self,
        key: &str,
        value: &str,
    ) -> Option<Rc<dyn Factory>> {
        let slot = ModuleSlot {
            module: TypeId::of::<M>(),
            key: key.to_string(),
            value: value.to_string(),
        };
        self.modules.borrow().get(&slot).cloned()
    }

    /// The option key that selects implementations of `M`.
    pub fn key_of<M: ?Sized + 'static>(&self) -> Option<String> {
        self.keys.borrow().get(&TypeId::of::<M>()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Ranking {}

    type RankingModule = Box<dyn Ranking>;

    #[test]
    fn handles_are_distinct() {
        let registry = ModuleRegistry::new();
        let a = registry.insert_factory(Rc::new(DefaultFactory::<u32>::new()));
        let b = registry.insert_factory(Rc::new(DefaultFactory::<u32>::new()));
        assert_ne!(a, b);
        assert_eq!(registry.factory(a).unwrap().product(), "u32");
        assert!(registry.factory(OpaqueHandle(99)).is_none());
    }

    #[test]
    fn one_key_per_module_type() {
        let registry = ModuleRegistry::new();
        let f: Rc<dyn Factory> = Rc::new(DefaultFactory::<u8>::new());
        registry
            .register_module::<RankingModule>("ranking", "longest path", f.clone())
            .unwrap();
        registry
            .register_module::<RankingModule>("ranking", "optimal", f.clone())
            .unwrap();
        let err = registry
            .register_module::<RankingModule>("ranker", "optimal", f)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ModuleKeyConflict { ref existing, ref requested, .. }
                if existing == "ranking" && requested == "ranker"
        ));

        assert_eq!(registry.key_of::<RankingModule>().as_deref(), Some("ranking"));
        assert!(registry.module_factory::<RankingModule>("ranking", "optimal").is_some());
        assert!(registry.module_factory::<RankingModule>("ranking", "fastest").is_none());
        assert!(registry.key_of::<u8>().is_none());
    }
}
