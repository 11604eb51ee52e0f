//! Built-in remote object types
//!
//! Small, dependency-free stand-ins for the heavyweight payload types a real
//! deployment registers on the factory. They exercise the full object
//! lifecycle (options, `build()`, method dispatch, void methods) and are what
//! the integration tests drive.

use serde_json::{json, Value};
use std::sync::OnceLock;

use super::object::{arg_f64, arg_i64, expect_args, MethodTable};
use super::{Configurable, Invokable, ObjectError, RemoteObject};

// ---------------------------------------------------------------------------
// Echo
// ---------------------------------------------------------------------------

/// Returns whatever it is sent; optionally tagged so multiple echoes can be
/// told apart in fan-out tests
#[derive(Debug, Default)]
pub struct Echo {
    tag: Option<String>,
    built: bool,
}

impl Echo {
    pub const TYPE_NAME: &'static str = "echo";

    fn table() -> &'static MethodTable<Echo> {
        static TABLE: OnceLock<MethodTable<Echo>> = OnceLock::new();
        TABLE.get_or_init(|| {
            MethodTable::new()
                .register("echo", Echo::m_echo)
                .register("tag", Echo::m_tag)
        })
    }

    fn m_echo(&mut self, args: &[Value]) -> Result<Option<Value>, ObjectError> {
        Ok(Some(Value::Array(args.to_vec())))
    }

    fn m_tag(&mut self, args: &[Value]) -> Result<Option<Value>, ObjectError> {
        expect_args(args, 0)?;
        Ok(Some(match &self.tag {
            Some(tag) => json!(tag),
            None => Value::Null,
        }))
    }

    fn ensure_built(&self) -> Result<(), ObjectError> {
        if self.built {
            Ok(())
        } else {
            Err(ObjectError::NotBuilt {
                type_name: Self::TYPE_NAME.to_string(),
            })
        }
    }
}

impl Configurable for Echo {
    fn set_option(&mut self, name: &str, value: Value) -> Result<(), ObjectError> {
        match name {
            "tag" => match value.as_str() {
                Some(tag) => {
                    self.tag = Some(tag.to_string());
                    Ok(())
                }
                None => Err(ObjectError::invalid_argument("option tag must be a string")),
            },
            other => Err(ObjectError::UnknownOption {
                type_name: Self::TYPE_NAME.to_string(),
                option: other.to_string(),
            }),
        }
    }

    fn get_option(&self, name: &str) -> Result<Value, ObjectError> {
        match name {
            "tag" => Ok(self.tag.as_deref().map_or(Value::Null, |t| json!(t))),
            other => Err(ObjectError::UnknownOption {
                type_name: Self::TYPE_NAME.to_string(),
                option: other.to_string(),
            }),
        }
    }

    fn build(&mut self) -> Result<(), ObjectError> {
        self.built = true;
        Ok(())
    }
}

impl Invokable for Echo {
    fn method_names(&self) -> Vec<&'static str> {
        Self::table().names()
    }

    fn invoke(&mut self, method: &str, args: &[Value]) -> Result<Option<Value>, ObjectError> {
        self.ensure_built()?;
        Self::table().dispatch(self, Self::TYPE_NAME, method, args)
    }
}

impl RemoteObject for Echo {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }
}

// ---------------------------------------------------------------------------
// Counter
// ---------------------------------------------------------------------------

/// Monotonic counter with a configurable starting value
#[derive(Debug, Default)]
pub struct Counter {
    start: i64,
    value: i64,
    built: bool,
}

impl Counter {
    pub const TYPE_NAME: &'static str = "counter";

    fn table() -> &'static MethodTable<Counter> {
        static TABLE: OnceLock<MethodTable<Counter>> = OnceLock::new();
        TABLE.get_or_init(|| {
            MethodTable::new()
                .register("increment", Counter::m_increment)
                .register("value", Counter::m_value)
                .register("reset", Counter::m_reset)
        })
    }

    fn m_increment(&mut self, args: &[Value]) -> Result<Option<Value>, ObjectError> {
        let step = if args.is_empty() { 1 } else { arg_i64(args, 0)? };
        self.value += step;
        Ok(Some(json!(self.value)))
    }

    fn m_value(&mut self, args: &[Value]) -> Result<Option<Value>, ObjectError> {
        expect_args(args, 0)?;
        Ok(Some(json!(self.value)))
    }

    // void: resets to the configured start
    fn m_reset(&mut self, args: &[Value]) -> Result<Option<Value>, ObjectError> {
        expect_args(args, 0)?;
        self.value = self.start;
        Ok(None)
    }

    fn ensure_built(&self) -> Result<(), ObjectError> {
        if self.built {
            Ok(())
        } else {
            Err(ObjectError::NotBuilt {
                type_name: Self::TYPE_NAME.to_string(),
            })
        }
    }
}

impl Configurable for Counter {
    fn set_option(&mut self, name: &str, value: Value) -> Result<(), ObjectError> {
        match name {
            "start" => match value.as_i64() {
                Some(start) => {
                    self.start = start;
                    Ok(())
                }
                None => Err(ObjectError::invalid_argument(
                    "option start must be an integer",
                )),
            },
            other => Err(ObjectError::UnknownOption {
                type_name: Self::TYPE_NAME.to_string(),
                option: other.to_string(),
            }),
        }
    }

    fn get_option(&self, name: &str) -> Result<Value, ObjectError> {
        match name {
            "start" => Ok(json!(self.start)),
            other => Err(ObjectError::UnknownOption {
                type_name: Self::TYPE_NAME.to_string(),
                option: other.to_string(),
            }),
        }
    }

    fn build(&mut self) -> Result<(), ObjectError> {
        self.value = self.start;
        self.built = true;
        Ok(())
    }
}

impl Invokable for Counter {
    fn method_names(&self) -> Vec<&'static str> {
        Self::table().names()
    }

    fn invoke(&mut self, method: &str, args: &[Value]) -> Result<Option<Value>, ObjectError> {
        self.ensure_built()?;
        Self::table().dispatch(self, Self::TYPE_NAME, method, args)
    }
}

impl RemoteObject for Counter {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }
}

// ---------------------------------------------------------------------------
// RunningStats
// ---------------------------------------------------------------------------

/// Streaming mean/variance accumulator (Welford's update)
#[derive(Debug, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    built: bool,
}

impl RunningStats {
    pub const TYPE_NAME: &'static str = "running_stats";

    fn table() -> &'static MethodTable<RunningStats> {
        static TABLE: OnceLock<MethodTable<RunningStats>> = OnceLock::new();
        TABLE.get_or_init(|| {
            MethodTable::new()
                .register("observe", RunningStats::m_observe)
                .register("count", RunningStats::m_count)
                .register("mean", RunningStats::m_mean)
                .register("variance", RunningStats::m_variance)
                .register("reset", RunningStats::m_reset)
        })
    }

    // void
    fn m_observe(&mut self, args: &[Value]) -> Result<Option<Value>, ObjectError> {
        expect_args(args, 1)?;
        let x = arg_f64(args, 0)?;
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
        Ok(None)
    }

    fn m_count(&mut self, args: &[Value]) -> Result<Option<Value>, ObjectError> {
        expect_args(args, 0)?;
        Ok(Some(json!(self.count)))
    }

    fn m_mean(&mut self, args: &[Value]) -> Result<Option<Value>, ObjectError> {
        expect_args(args, 0)?;
        if self.count == 0 {
            return Err(ObjectError::invalid_argument(
                "mean requires at least one observation",
            ));
        }
        Ok(Some(json!(self.mean)))
    }

    fn m_variance(&mut self, args: &[Value]) -> Result<Option<Value>, ObjectError> {
        expect_args(args, 0)?;
        if self.count < 2 {
            return Err(ObjectError::invalid_argument(
                "variance requires at least two observations",
            ));
        }
        Ok(Some(json!(self.m2 / (self.count - 1) as f64)))
    }

    // void
    fn m_reset(&mut self, args: &[Value]) -> Result<Option<Value>, ObjectError> {
        expect_args(args, 0)?;
        self.count = 0;
        self.mean = 0.0;
        self.m2 = 0.0;
        Ok(None)
    }

    fn ensure_built(&self) -> Result<(), ObjectError> {
        if self.built {
            Ok(())
        } else {
            Err(ObjectError::NotBuilt {
                type_name: Self::TYPE_NAME.to_string(),
            })
        }
    }
}

impl Configurable for RunningStats {
    fn set_option(&mut self, name: &str, _value: Value) -> Result<(), ObjectError> {
        Err(ObjectError::UnknownOption {
            type_name: Self::TYPE_NAME.to_string(),
            option: name.to_string(),
        })
    }

    fn get_option(&self, name: &str) -> Result<Value, ObjectError> {
        Err(ObjectError::UnknownOption {
            type_name: Self::TYPE_NAME.to_string(),
            option: name.to_string(),
        })
    }

    fn build(&mut self) -> Result<(), ObjectError> {
        self.built = true;
        Ok(())
    }
}

impl Invokable for RunningStats {
    fn method_names(&self) -> Vec<&'static str> {
        Self::table().names()
    }

    fn invoke(&mut self, method: &str, args: &[Value]) -> Result<Option<Value>, ObjectError> {
        self.ensure_built()?;
        Self::table().dispatch(self, Self::TYPE_NAME, method, args)
    }
}

impl RemoteObject for RunningStats {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }
}
