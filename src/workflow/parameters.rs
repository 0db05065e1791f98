//! Workflow parameter specification and per-task callable parameters.
//!
//! `Parameters`/`ParameterSpec` are grounded in `lightflow/models/arguments.py`
//! (`Option`, `Arguments`). `TaskParameters` is grounded in
//! `lightflow/models/task_parameters.py`, ported per the crate's Design Note
//! on callables-as-parameters: a parameter value is either a plain value or
//! a closure evaluated against the current data bundle and store handle.

use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

use crate::store::StoreHandle;
use crate::workflow::action::MultiTaskData;

#[derive(Debug, Error)]
pub enum ParameterError {
    #[error("missing required parameter '{0}'")]
    Missing(String),

    #[error("parameter '{name}' could not be coerced to {param_type:?}: {value}")]
    Coercion {
        name: String,
        param_type: ParamType,
        value: Value,
    },
}

/// The declared type tag a parameter can carry, mirroring `Option`'s
/// `type` argument in the original (`str`/`int`/`float`/`bool`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Str,
    Int,
    Float,
    Bool,
}

impl ParamType {
    /// Coerces `value` to this type, mirroring `Option.convert`.
    fn convert(self, name: &str, value: Value) -> Result<Value, ParameterError> {
        let fail = || ParameterError::Coercion {
            name: name.to_string(),
            param_type: self,
            value: value.clone(),
        };
        match self {
            ParamType::Str => Ok(Value::String(match &value {
                Value::String(s) => s.clone(),
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                Value::Null => "null".to_string(),
                other => other.to_string(),
            })),
            ParamType::Int => {
                let n = match &value {
                    Value::Number(n) if n.is_i64() => n.as_i64(),
                    Value::Number(n) => n.as_f64().map(|f| f as i64),
                    Value::String(s) => s.trim().parse::<i64>().ok(),
                    Value::Bool(b) => Some(if *b { 1 } else { 0 }),
                    _ => None,
                };
                n.map(Value::from).ok_or_else(fail)
            }
            ParamType::Float => {
                let n = match &value {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.trim().parse::<f64>().ok(),
                    Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
                    _ => None,
                };
                n.and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(fail)
            }
            ParamType::Bool => {
                let b = match &value {
                    Value::Bool(b) => Some(*b),
                    Value::Number(n) => Some(n.as_f64().map(|f| f != 0.0).unwrap_or(true)),
                    Value::String(s) => Some(!s.is_empty()),
                    Value::Null => Some(false),
                    Value::Array(a) => Some(!a.is_empty()),
                    Value::Object(o) => Some(!o.is_empty()),
                };
                b.map(Value::Bool).ok_or_else(fail)
            }
        }
    }
}

/// One named parameter a workflow module declares: a default (`None` means
/// required), help text, and a declared JSON-ish type tag used only for
/// coercion of string inputs (mirrors `Option.convert`).
#[derive(Debug, Clone)]
pub struct ParameterSpec {
    pub name: String,
    pub default: Option<Value>,
    pub help: Option<String>,
    pub param_type: Option<ParamType>,
}

impl ParameterSpec {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            help: None,
            param_type: None,
        }
    }

    pub fn with_default(name: impl Into<String>, default: Value) -> Self {
        Self {
            name: name.into(),
            default: Some(default),
            help: None,
            param_type: None,
        }
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn param_type(mut self, param_type: ParamType) -> Self {
        self.param_type = Some(param_type);
        self
    }
}

/// The declared parameter list of a workflow module.
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    specs: Vec<ParameterSpec>,
}

impl Parameters {
    pub fn new(specs: Vec<ParameterSpec>) -> Self {
        Self { specs }
    }

    pub fn specs(&self) -> &[ParameterSpec] {
        &self.specs
    }

    /// Names declared required (no default) that are absent from `supplied`.
    pub fn check_missing(&self, supplied: &HashMap<String, Value>) -> Vec<String> {
        self.specs
            .iter()
            .filter(|spec| spec.default.is_none() && !supplied.contains_key(&spec.name))
            .map(|spec| spec.name.clone())
            .collect()
    }

    /// Coerces every supplied value through its declared type tag, then
    /// fills in defaults for any declared parameter absent from `supplied`.
    pub fn consolidate(
        &self,
        supplied: &HashMap<String, Value>,
    ) -> Result<HashMap<String, Value>, ParameterError> {
        let mut result = supplied.clone();
        for spec in &self.specs {
            if let Some(value) = result.remove(&spec.name) {
                let coerced = match spec.param_type {
                    Some(param_type) => param_type.convert(&spec.name, value)?,
                    None => value,
                };
                result.insert(spec.name.clone(), coerced);
            } else if let Some(default) = &spec.default {
                result.insert(spec.name.clone(), default.clone());
            }
        }
        Ok(result)
    }
}

/// A single task parameter: a fixed value, or a closure evaluated against
/// the task's incoming data bundle and the data store at task start.
pub enum TaskParameter<T> {
    Value(T),
    Callable(Box<dyn Fn(&MultiTaskData, &StoreHandle) -> T + Send + Sync>),
}

impl<T: Clone> TaskParameter<T> {
    fn eval(&self, data: &MultiTaskData, store: &StoreHandle) -> T {
        match self {
            TaskParameter::Value(v) => v.clone(),
            TaskParameter::Callable(f) => f(data, store),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for TaskParameter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskParameter::Value(v) => f.debug_tuple("Value").field(v).finish(),
            TaskParameter::Callable(_) => f.write_str("Callable(..)"),
        }
    }
}

/// A named map of [`TaskParameter`] values, evaluated eagerly at task start.
#[derive(Default)]
pub struct TaskParameters<T> {
    entries: HashMap<String, TaskParameter<T>>,
}

impl<T: Clone> TaskParameters<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn set_value(&mut self, name: impl Into<String>, value: T) {
        self.entries.insert(name.into(), TaskParameter::Value(value));
    }

    pub fn set_callable(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&MultiTaskData, &StoreHandle) -> T + Send + Sync + 'static,
    ) {
        self.entries
            .insert(name.into(), TaskParameter::Callable(Box::new(f)));
    }

    /// Evaluates every parameter not named in `exclude`, returning fixed
    /// values as-is. Excluded entries are dropped from the result (the
    /// caller is expected to consult `eval_single` for those).
    pub fn eval(
        &self,
        data: &MultiTaskData,
        store: &StoreHandle,
        exclude: &[&str],
    ) -> HashMap<String, T> {
        self.entries
            .iter()
            .filter(|(name, _)| !exclude.contains(&name.as_str()))
            .map(|(name, param)| (name.clone(), param.eval(data, store)))
            .collect()
    }

    pub fn eval_single(
        &self,
        key: &str,
        data: &MultiTaskData,
        store: &StoreHandle,
    ) -> Option<T> {
        self.entries.get(key).map(|param| param.eval(data, store))
    }
}
