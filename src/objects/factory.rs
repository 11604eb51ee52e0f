//! Type-name object factory
//!
//! Maps registered type names to constructor closures. The factory is built
//! once at startup and injected into the listener, which shares it across
//! sessions; it is never reached through global state.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::builtin::{Counter, Echo, RunningStats};
use super::{ObjectError, RemoteObject};

/// Constructor for one registered object type
pub type ConstructorFn = Arc<dyn Fn() -> Box<dyn RemoteObject> + Send + Sync>;

/// Registry of constructible object types
pub struct ObjectFactory {
    constructors: HashMap<String, ConstructorFn>,
}

impl ObjectFactory {
    /// Empty factory; callers register every type themselves
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Factory pre-loaded with the built-in types
    pub fn with_builtins() -> Self {
        let mut factory = Self::new();
        factory.register(Echo::TYPE_NAME, || Box::<Echo>::default());
        factory.register(Counter::TYPE_NAME, || Box::<Counter>::default());
        factory.register(RunningStats::TYPE_NAME, || Box::<RunningStats>::default());
        factory
    }

    /// Register a constructor under `type_name`, replacing any previous one
    pub fn register<F>(&mut self, type_name: impl Into<String>, constructor: F)
    where
        F: Fn() -> Box<dyn RemoteObject> + Send + Sync + 'static,
    {
        let type_name = type_name.into();
        if self
            .constructors
            .insert(type_name.clone(), Arc::new(constructor))
            .is_some()
        {
            warn!(type_name = %type_name, "Replacing existing object constructor");
        } else {
            debug!(type_name = %type_name, "Registered object constructor");
        }
    }

    /// Construct a fresh, un-built instance of `type_name`
    pub fn construct(&self, type_name: &str) -> Result<Box<dyn RemoteObject>, ObjectError> {
        match self.constructors.get(type_name) {
            Some(constructor) => Ok(constructor()),
            None => Err(ObjectError::UnknownType {
                type_name: type_name.to_string(),
            }),
        }
    }

    /// Registered type names, sorted for stable output
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl Default for ObjectFactory {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_registered() {
        let factory = ObjectFactory::with_builtins();
        assert_eq!(factory.type_names(), vec!["counter", "echo", "running_stats"]);
    }

    #[test]
    fn test_construct_known_type() {
        let factory = ObjectFactory::with_builtins();
        let object = factory.construct("echo").unwrap();
        assert_eq!(object.type_name(), "echo");
    }

    #[test]
    fn test_construct_unknown_type_fails() {
        let factory = ObjectFactory::with_builtins();
        let error = factory.construct("neural_net").err().unwrap();
        assert_eq!(
            error,
            ObjectError::UnknownType {
                type_name: "neural_net".to_string(),
            }
        );
    }

    #[test]
    fn test_custom_registration() {
        let mut factory = ObjectFactory::new();
        assert!(factory.is_empty());
        factory.register("echo", || Box::<crate::objects::builtin::Echo>::default());
        assert_eq!(factory.len(), 1);
        assert!(factory.construct("echo").is_ok());
    }
}
