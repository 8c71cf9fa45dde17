//! Declaring option keys and algorithms to the host.
//!
//! A [`Key`] is assembled with a fluent builder and handed to [`Script::declare`], which turns it
//! into one host table and passes that to the interface module's `declare` function:
//!
//! ```
//! use gdbridge_core::{Algorithm, Key, KeyType, Script};
//! use gdbridge_host::model::Model;
//! use gdbridge_host::MemoryHost;
//!
//! let host = MemoryHost::new();
//! let model = Model::install(&host)?;
//! let script = Script::new(&host);
//! script.declare(
//!     Key::new("my layout")
//!         .summary("Puts every vertex at the origin.")
//!         .precondition("connected")
//!         .algorithm(Algorithm::function(|g| {
//!             for v in g.vertices_mut() {
//!                 v.pos = Default::default();
//!             }
//!             Ok(())
//!         })),
//! )?;
//! script.declare(Key::new("my distance").value_type(KeyType::Length).initial("1cm"))?;
//! assert!(model.declaration(&host, "my layout")?.is_some());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::config::BridgeConfig;
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::modules::{Factory, ModuleRegistry};
use crate::runner::Algorithm;
use gdbridge_host::{CollectorPause, Host, TableRef, Value};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyType {
    Number,
    String,
    Boolean,
    Length,
    /// Opaque native values, such as module factories.
    UserValue,
    Other(String),
}

impl KeyType {
    pub fn as_str(&self) -> &str {
        match self {
            KeyType::Number => "number",
            KeyType::String => "string",
            KeyType::Boolean => "boolean",
            KeyType::Length => "length",
            KeyType::UserValue => "user value",
            KeyType::Other(s) => s,
        }
    }
}

impl From<&str> for KeyType {
    fn from(s: &str) -> Self {
        match s {
            "number" => KeyType::Number,
            "string" => KeyType::String,
            "boolean" => KeyType::Boolean,
            "length" => KeyType::Length,
            "user value" => KeyType::UserValue,
            other => KeyType::Other(other.to_string()),
        }
    }
}

/// A literal host value or a native factory passed as an opaque handle.
#[derive(Debug, Clone)]
pub enum Setting {
    Literal(String),
    Factory(Rc<dyn Factory>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alias {
    /// Another key whose value is used.
    Key(String),
    /// Host-side code computing the value.
    Function(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Documentation {
    Inline(String),
    /// Name of a host module holding the documentation.
    In(String),
}

/// Metadata of one option key, optionally bound to an algorithm or a module factory.
#[derive(Debug, Clone)]
pub struct Key {
    name: String,
    summary: Option<String>,
    value_type: Option<KeyType>,
    initial: Option<Setting>,
    default_value: Option<String>,
    alias: Option<Alias>,
    documentation: Option<Documentation>,
    phase: Option<String>,
    uses: Vec<(String, Setting)>,
    examples: Vec<String>,
    preconditions: Vec<String>,
    postconditions: Vec<String>,
    algorithm: Option<Algorithm>,
    module: Option<Rc<dyn Factory>>,
}

impl Key {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            summary: None,
            value_type: None,
            initial: None,
            default_value: None,
            alias: None,
            documentation: None,
            phase: None,
            uses: Vec::new(),
            examples: Vec::new(),
            preconditions: Vec::new(),
            postconditions: Vec::new(),
            algorithm: None,
            module: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn summary(mut self, text: impl Into<String>) -> Self {
        self.summary = Some(text.into());
        self
    }

    pub fn value_type(mut self, value_type: impl Into<KeyType>) -> Self {
        self.value_type = Some(value_type.into());
        self
    }

    /// Shorthand for a `"user value"` key.
    pub fn module_type(self) -> Self {
        self.value_type(KeyType::UserValue)
    }

    pub fn initial(mut self, value: impl Into<String>) -> Self {
        self.initial = Some(Setting::Literal(value.into()));
        self
    }

    pub fn initial_factory(mut self, factory: Rc<dyn Factory>) -> Self {
        self.initial = Some(Setting::Factory(factory));
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn alias(mut self, key: impl Into<String>) -> Self {
        self.alias = Some(Alias::Key(key.into()));
        self
    }

    pub fn alias_function(mut self, code: impl Into<String>) -> Self {
        self.alias = Some(Alias::Function(code.into()));
        self
    }

    pub fn documentation(mut self, text: impl Into<String>) -> Self {
        self.documentation = Some(Documentation::Inline(text.into()));
        self
    }

    pub fn documentation_in(mut self, module: impl Into<String>) -> Self {
        self.documentation = Some(Documentation::In(module.into()));
        self
    }

    pub fn phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    /// Using this key also sets `key` to `value`.
    pub fn set_key(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.uses
            .push((key.into(), Setting::Literal(value.into())));
        self
    }

    /// Using this key also sets `key` to the given module factory.
    pub fn set_module(mut self, key: impl Into<String>, factory: Rc<dyn Factory>) -> Self {
        self.uses.push((key.into(), Setting::Factory(factory)));
        self
    }

    pub fn example(mut self, text: impl Into<String>) -> Self {
        self.examples.push(text.into());
        self
    }

    pub fn precondition(mut self, name: impl Into<String>) -> Self {
        self.preconditions.push(name.into());
        self
    }

    pub fn postcondition(mut self, name: impl Into<String>) -> Self {
        self.postconditions.push(name.into());
        self
    }

    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    /// Declares a module key: a `"user value"` key whose initial value is `factory`.
    pub fn module(mut self, factory: Rc<dyn Factory>) -> Self {
        self.module = Some(factory);
        self
    }

    fn conflict(&self, message: &str) -> Error {
        Error::ConflictingDeclaration {
            key: self.name.clone(),
            message: message.to_string(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(self.conflict("the key name is empty"));
        }
        if self.module.is_some() {
            if self.algorithm.is_some() {
                return Err(self.conflict("a key binds either an algorithm or a module"));
            }
            if matches!(self.initial, Some(Setting::Literal(_))) {
                return Err(self.conflict("a module key cannot have a literal initial value"));
            }
            if matches!(&self.value_type, Some(t) if *t != KeyType::UserValue) {
                return Err(self.conflict("a module key must be a user value"));
            }
        }
        Ok(())
    }
}

/// Lets one object declare a family of keys.
pub trait Declarations {
    fn declare(&self, script: &Script<'_>) -> Result<()>;
}

/// Declaration context bound to a host.
pub struct Script<'h> {
    host: &'h dyn Host,
    config: Rc<BridgeConfig>,
    registry: Rc<ModuleRegistry>,
}

impl<'h> Script<'h> {
    pub fn new(host: &'h dyn Host) -> Self {
        Self::with_config(host, BridgeConfig::default())
    }

    pub fn with_config(host: &'h dyn Host, config: BridgeConfig) -> Self {
        Self {
            host,
            config: Rc::new(config),
            registry: Rc::new(ModuleRegistry::new()),
        }
    }

    pub fn host(&self) -> &'h dyn Host {
        self.host
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn registry(&self) -> &Rc<ModuleRegistry> {
        &self.registry
    }

    /// Registers `factory` as the implementation of module type `M` selected by `key = value`.
    pub fn register_module<M: ?Sized + 'static>(
        &self,
        key: &str,
        value: &str,
        factory: Rc<dyn Factory>,
    ) -> Result<()> {
        self.registry.register_module::<M>(key, value, factory)
    }

    pub fn declare_all(&self, declarations: &dyn Declarations) -> Result<()> {
        declarations.declare(self)
    }

    /// Submits `key` to the host catalog.
    pub fn declare(&self, key: Key) -> Result<()> {
        key.validate()?;
        let host = self.host;

        let interface = crate::invocation::module_table(host, &self.config.modules.interface)?;
        let declare = host.get_field(interface, &self.config.declare_function)?;

        let _pause = self
            .config
            .suspend_collector_during_declare
            .then(|| CollectorPause::new(host));

        let table = self.record(&key)?;
        host.call(&declare, &[Value::Table(table)])?;

        tracing::debug!(
            key = %key.name,
            algorithm = key.algorithm.is_some(),
            module = key.module.is_some(),
            "declared key"
        );
        Ok(())
    }

    fn setting(&self, setting: &Setting) -> Value {
        match setting {
            Setting::Literal(s) => Value::from(s.as_str()),
            Setting::Factory(f) => self
                .host
                .wrap_opaque(self.registry.insert_factory(Rc::clone(f))),
        }
    }

    fn record(&self, key: &Key) -> Result<TableRef> {
        let host = self.host;
        let t = host.create_table()?;
        let set_str = |field: &str, value: &Option<String>| -> Result<()> {
            if let Some(v) = value {
                host.set_field(t, field, Value::from(v.as_str()))?;
            }
            Ok(())
        };

        host.set_field(t, "key", Value::from(key.name.as_str()))?;
        set_str("summary", &key.summary)?;
        set_str("default", &key.default_value)?;
        set_str("phase", &key.phase)?;
        match &key.alias {
            Some(Alias::Key(k)) => host.set_field(t, "alias", Value::from(k.as_str()))?,
            Some(Alias::Function(code)) => {
                host.set_field(t, "alias_function_string", Value::from(code.as_str()))?
            }
            None => {}
        }
        match &key.documentation {
            Some(Documentation::Inline(text)) => {
                host.set_field(t, "documentation", Value::from(text.as_str()))?
            }
            Some(Documentation::In(module)) => {
                host.set_field(t, "documentation_in", Value::from(module.as_str()))?
            }
            None => {}
        }

        if let Some(factory) = &key.module {
            host.set_field(t, "type", Value::from(KeyType::UserValue.as_str()))?;
            host.set_field(t, "initial", self.setting(&Setting::Factory(Rc::clone(factory))))?;
        } else {
            if let Some(value_type) = &key.value_type {
                host.set_field(t, "type", Value::from(value_type.as_str()))?;
            }
            if let Some(initial) = &key.initial {
                host.set_field(t, "initial", self.setting(initial))?;
            }
        }

        if !key.uses.is_empty() {
            let uses = host.create_table()?;
            for (i, (k, setting)) in key.uses.iter().enumerate() {
                let entry = host.create_table()?;
                host.set_field(entry, "key", Value::from(k.as_str()))?;
                host.set_field(entry, "value", self.setting(setting))?;
                host.set(uses, (i + 1).into(), Value::Table(entry))?;
            }
            host.set_field(t, "use", Value::Table(uses))?;
        }

        for (field, names) in [
            ("preconditions", &key.preconditions),
            ("postconditions", &key.postconditions),
        ] {
            if !names.is_empty() {
                let set = host.create_table()?;
                for name in names {
                    host.set_field(set, name, Value::Boolean(true))?;
                }
                host.set_field(t, field, Value::Table(set))?;
            }
        }

        if !key.examples.is_empty() {
            let examples = host.create_table()?;
            for (i, example) in key.examples.iter().enumerate() {
                host.set(examples, (i + 1).into(), Value::from(example.as_str()))?;
            }
            host.set_field(t, "examples", Value::Table(examples))?;
        }

        if let Some(algorithm) = &key.algorithm {
            let dispatcher = Dispatcher::new(
                key.name.clone(),
                algorithm.clone(),
                Rc::clone(&self.config),
                Rc::clone(&self.registry),
            );
            let function = host.create_function(dispatcher.into_native())?;
            host.set_field(t, &self.config.dispatcher_field, function)?;
        }

        Ok(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::DefaultFactory;

    #[test]
    fn key_types_round_trip_their_names() {
        for t in [
            KeyType::Number,
            KeyType::String,
            KeyType::Boolean,
            KeyType::Length,
            KeyType::UserValue,
            KeyType::Other("canvas coordinate".to_string()),
        ] {
            assert_eq!(KeyType::from(t.as_str()), t);
        }
    }

    #[test]
    fn module_keys_reject_literal_initials() {
        let key = Key::new("ranking")
            .module(Rc::new(DefaultFactory::<u8>::new()))
            .initial("longest path");
        let err = key.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "declaration of 'ranking' is inconsistent: a module key cannot have a literal initial value"
        );
    }

    #[test]
    fn module_keys_reject_algorithms() {
        let key = Key::new("ranking")
            .module(Rc::new(DefaultFactory::<u8>::new()))
            .algorithm(Algorithm::function(|_| Ok(())));
        assert!(matches!(
            key.validate(),
            Err(Error::ConflictingDeclaration { .. })
        ));
    }

    #[test]
    fn later_alias_replaces_earlier() {
        let key = Key::new("k").alias("a").alias_function("function () return 1 end");
        assert_eq!(
            key.alias,
            Some(Alias::Function("function () return 1 end".to_string()))
        );
    }
}
