//! Per-connection object registry
//!
//! Owns every object a session has constructed, keyed by monotonically
//! assigned ids. The registry is exclusively owned by its session; dropping
//! it drops all remaining objects. No object is shared across connections.

use serde_json::Value;
use tracing::{debug, info};

use super::{ObjectError, ObjectFactory, RemoteObject};
use crate::protocol::{ObjectId, ObjectSpec};
use std::collections::HashMap;

/// First id handed out by a fresh registry
pub const FIRST_OBJECT_ID: u64 = 1;

/// Table of live objects for one connection
pub struct ObjectRegistry {
    objects: HashMap<ObjectId, Box<dyn RemoteObject>>,
    next_id: u64,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
            next_id: FIRST_OBJECT_ID,
        }
    }

    /// Construct, configure, build and store a new object
    ///
    /// Runs the full lifecycle: factory construction by type name, option
    /// assignment from the spec, `build()`, then insertion under a fresh id.
    pub fn create(
        &mut self,
        factory: &ObjectFactory,
        spec: &ObjectSpec,
    ) -> Result<ObjectId, ObjectError> {
        let mut object = factory.construct(&spec.type_name)?;

        for (name, value) in &spec.options {
            object.set_option(name, value.clone())?;
        }
        object.build()?;

        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.objects.insert(id, object);

        debug!(object_id = %id, type_name = %spec.type_name, "Created object");
        Ok(id)
    }

    /// Look up an object for read-only access
    pub fn get(&self, id: ObjectId) -> Result<&dyn RemoteObject, ObjectError> {
        self.objects
            .get(&id)
            .map(|object| object.as_ref())
            .ok_or(ObjectError::UnknownObjectId { object_id: id })
    }

    /// Look up an object for invocation or reconfiguration
    pub fn get_mut(&mut self, id: ObjectId) -> Result<&mut (dyn RemoteObject + 'static), ObjectError> {
        self.objects
            .get_mut(&id)
            .map(|object| object.as_mut())
            .ok_or(ObjectError::UnknownObjectId { object_id: id })
    }

    /// Invoke a method on a registered object
    pub fn call_method(
        &mut self,
        id: ObjectId,
        method: &str,
        args: &[Value],
    ) -> Result<Option<Value>, ObjectError> {
        self.get_mut(id)?.invoke(method, args)
    }

    /// Remove and drop an object
    pub fn destroy(&mut self, id: ObjectId) -> Result<(), ObjectError> {
        match self.objects.remove(&id) {
            Some(object) => {
                debug!(object_id = %id, type_name = object.type_name(), "Destroyed object");
                Ok(())
            }
            None => Err(ObjectError::UnknownObjectId { object_id: id }),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Live ids, sorted
    pub fn ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self.objects.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ObjectRegistry {
    fn drop(&mut self) {
        if !self.objects.is_empty() {
            info!(
                remaining = self.objects.len(),
                "Dropping registry with live objects"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry_with_factory() -> (ObjectRegistry, ObjectFactory) {
        (ObjectRegistry::new(), ObjectFactory::with_builtins())
    }

    #[test]
    fn test_ids_are_monotonic_and_start_at_one() {
        let (mut registry, factory) = registry_with_factory();
        let spec = ObjectSpec::new("echo");

        let first = registry.create(&factory, &spec).unwrap();
        let second = registry.create(&factory, &spec).unwrap();
        let third = registry.create(&factory, &spec).unwrap();

        assert_eq!(first, ObjectId(FIRST_OBJECT_ID));
        assert!(first < second && second < third);
    }

    #[test]
    fn test_ids_are_not_reused_after_destroy() {
        let (mut registry, factory) = registry_with_factory();
        let spec = ObjectSpec::new("echo");

        let first = registry.create(&factory, &spec).unwrap();
        registry.destroy(first).unwrap();
        let second = registry.create(&factory, &spec).unwrap();

        assert!(second > first);
    }

    #[test]
    fn test_destroy_then_lookup_fails() {
        let (mut registry, factory) = registry_with_factory();
        let id = registry.create(&factory, &ObjectSpec::new("echo")).unwrap();

        registry.destroy(id).unwrap();

        assert_eq!(
            registry.get(id).err().unwrap(),
            ObjectError::UnknownObjectId { object_id: id }
        );
        assert_eq!(
            registry.destroy(id).unwrap_err(),
            ObjectError::UnknownObjectId { object_id: id }
        );
    }

    #[test]
    fn test_create_applies_options_before_build() {
        let (mut registry, factory) = registry_with_factory();
        let spec = ObjectSpec::new("counter").with_option("start", 42);

        let id = registry.create(&factory, &spec).unwrap();
        let value = registry.call_method(id, "value", &[]).unwrap();

        assert_eq!(value, Some(json!(42)));
    }

    #[test]
    fn test_create_unknown_type_fails() {
        let (mut registry, factory) = registry_with_factory();
        let error = registry
            .create(&factory, &ObjectSpec::new("learner"))
            .unwrap_err();
        assert!(matches!(error, ObjectError::UnknownType { .. }));
    }

    #[test]
    fn test_create_bad_option_fails() {
        let (mut registry, factory) = registry_with_factory();
        let spec = ObjectSpec::new("counter").with_option("speed", 3);
        assert!(matches!(
            registry.create(&factory, &spec).unwrap_err(),
            ObjectError::UnknownOption { .. }
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_call_method_on_missing_object_fails() {
        let (mut registry, _factory) = registry_with_factory();
        let error = registry
            .call_method(ObjectId(99), "value", &[])
            .unwrap_err();
        assert_eq!(
            error,
            ObjectError::UnknownObjectId {
                object_id: ObjectId(99)
            }
        );
    }
}
