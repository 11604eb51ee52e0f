//! Capability traits and method dispatch table for remote objects
//!
//! Method invocation by string name is a plain table lookup: each object type
//! builds a [`MethodTable`] once (name → function pointer) and `invoke`
//! resolves through it. This keeps the "call by method name" wire contract
//! without any runtime reflection.

use serde_json::Value;

use super::ObjectError;
use std::collections::HashMap;

/// Option assignment and build lifecycle of a remote object
///
/// Options are applied between construction and `build()`; `build()` must be
/// called exactly once before any method invocation.
pub trait Configurable {
    fn set_option(&mut self, name: &str, value: Value) -> Result<(), ObjectError>;

    fn get_option(&self, name: &str) -> Result<Value, ObjectError>;

    fn build(&mut self) -> Result<(), ObjectError>;
}

/// Method invocation by name
///
/// `invoke` returns `Ok(None)` for void methods and `Ok(Some(value))`
/// otherwise.
pub trait Invokable {
    /// Names of the callable methods, for the `help` command
    fn method_names(&self) -> Vec<&'static str>;

    fn invoke(&mut self, method: &str, args: &[Value]) -> Result<Option<Value>, ObjectError>;
}

/// A server-side object: configurable, invokable, and owned by one registry
pub trait RemoteObject: Configurable + Invokable + Send {
    fn type_name(&self) -> &'static str;
}

/// Signature of a registered method
pub type MethodFn<T> = fn(&mut T, &[Value]) -> Result<Option<Value>, ObjectError>;

/// Registration table mapping method names to functions for one object type
pub struct MethodTable<T> {
    methods: HashMap<&'static str, MethodFn<T>>,
}

impl<T> MethodTable<T> {
    pub fn new() -> Self {
        Self {
            methods: HashMap::new(),
        }
    }

    /// Register a method under its wire name
    pub fn register(mut self, name: &'static str, method: MethodFn<T>) -> Self {
        self.methods.insert(name, method);
        self
    }

    /// Resolve `method` and call it on `target`
    pub fn dispatch(
        &self,
        target: &mut T,
        type_name: &str,
        method: &str,
        args: &[Value],
    ) -> Result<Option<Value>, ObjectError> {
        match self.methods.get(method) {
            Some(function) => function(target, args),
            None => Err(ObjectError::UnknownMethod {
                type_name: type_name.to_string(),
                method: method.to_string(),
            }),
        }
    }

    /// Registered method names, sorted for stable output
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.methods.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl<T> Default for MethodTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Require exactly `expected` arguments
pub fn expect_args(args: &[Value], expected: usize) -> Result<(), ObjectError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ObjectError::invalid_argument(format!(
            "expected {expected} argument(s), got {}",
            args.len()
        )))
    }
}

/// Decode a numeric argument as f64
pub fn arg_f64(args: &[Value], index: usize) -> Result<f64, ObjectError> {
    args.get(index)
        .and_then(Value::as_f64)
        .ok_or_else(|| ObjectError::invalid_argument(format!("argument {index} must be a number")))
}

/// Decode a numeric argument as i64
pub fn arg_i64(args: &[Value], index: usize) -> Result<i64, ObjectError> {
    args.get(index)
        .and_then(Value::as_i64)
        .ok_or_else(|| ObjectError::invalid_argument(format!("argument {index} must be an integer")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Probe {
        hits: u32,
    }

    impl Probe {
        fn bump(&mut self, _args: &[Value]) -> Result<Option<Value>, ObjectError> {
            self.hits += 1;
            Ok(None)
        }

        fn hits(&mut self, _args: &[Value]) -> Result<Option<Value>, ObjectError> {
            Ok(Some(json!(self.hits)))
        }
    }

    #[test]
    fn test_dispatch_resolves_registered_methods() {
        let table = MethodTable::new()
            .register("bump", Probe::bump)
            .register("hits", Probe::hits);
        let mut probe = Probe { hits: 0 };

        assert_eq!(table.dispatch(&mut probe, "probe", "bump", &[]).unwrap(), None);
        assert_eq!(
            table.dispatch(&mut probe, "probe", "hits", &[]).unwrap(),
            Some(json!(1))
        );
    }

    #[test]
    fn test_dispatch_rejects_unknown_method() {
        let table: MethodTable<Probe> = MethodTable::new().register("bump", Probe::bump);
        let mut probe = Probe { hits: 0 };

        let error = table
            .dispatch(&mut probe, "probe", "missing", &[])
            .unwrap_err();
        assert_eq!(
            error,
            ObjectError::UnknownMethod {
                type_name: "probe".to_string(),
                method: "missing".to_string(),
            }
        );
    }

    #[test]
    fn test_names_are_sorted() {
        let table = MethodTable::new()
            .register("hits", Probe::hits)
            .register("bump", Probe::bump);
        assert_eq!(table.names(), vec!["bump", "hits"]);
    }

    #[test]
    fn test_argument_helpers() {
        let args = vec![json!(2.5), json!(3)];
        assert!(expect_args(&args, 2).is_ok());
        assert!(expect_args(&args, 1).is_err());
        assert_eq!(arg_f64(&args, 0).unwrap(), 2.5);
        assert_eq!(arg_i64(&args, 1).unwrap(), 3);
        assert!(arg_i64(&args, 0).is_err());
        assert!(arg_f64(&args, 5).is_err());
    }
}
