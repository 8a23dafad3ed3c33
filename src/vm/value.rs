pub mod closure;
pub mod function;

use crate::eval::Lambda;
use crate::vm::builtins::Builtin;
use closure::Closure;
use function::CompiledFunction;
use rustc_hash::FxHashMap;
use std::convert::TryFrom;
use std::fmt;
use std::rc::Rc;

/// The runtime value model shared by the VM and the tree-walking evaluator.
///
/// Aggregates are reference counted so that stack slots, globals and the
/// constant pool can share them cheaply. `Lambda` only ever occurs on the
/// evaluator path; the compiler lowers function literals to `Function`
/// constants instead.
#[derive(Debug, Clone)]
pub enum Value {
    Integer(i64),
    Bool(bool),
    Null,
    String(Rc<String>),
    Array(Rc<Vec<Value>>),
    Hash(Rc<FxHashMap<HashKey, Value>>),
    Function(Rc<CompiledFunction>),
    Closure(Closure),
    Builtin(&'static Builtin),
    Lambda(Rc<Lambda>),
    Error(String),
}

impl Value {
    pub fn string<S: Into<String>>(s: S) -> Self {
        Value::String(Rc::new(s.into()))
    }

    pub fn array(elements: Vec<Value>) -> Self {
        Value::Array(Rc::new(elements))
    }

    pub fn error<S: Into<String>>(message: S) -> Self {
        Value::Error(message.into())
    }

    /// Null and explicit false are falsy; everything else, including zero,
    /// is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Null | Value::Bool(false))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "INTEGER",
            Value::Bool(_) => "BOOLEAN",
            Value::Null => "NULL",
            Value::String(_) => "STRING",
            Value::Array(_) => "ARRAY",
            Value::Hash(_) => "HASH",
            Value::Function(_) => "COMPILED_FUNCTION",
            Value::Closure(_) => "CLOSURE",
            Value::Builtin(_) => "BUILTIN",
            Value::Lambda(_) => "FUNCTION",
            Value::Error(_) => "ERROR",
        }
    }
}

// Equality is structural, by kind and payload. Callable values carry
// identity, so closures and lambdas compare by the function they share,
// never by payload. `Function` constants compare by their code, which only
// matters for comparing compiler output; they never reach an operand stack.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(lhs), Value::Integer(rhs)) => lhs == rhs,
            (Value::Bool(lhs), Value::Bool(rhs)) => lhs == rhs,
            (Value::Null, Value::Null) => true,
            (Value::String(lhs), Value::String(rhs)) => lhs == rhs,
            (Value::Array(lhs), Value::Array(rhs)) => lhs == rhs,
            (Value::Hash(lhs), Value::Hash(rhs)) => lhs == rhs,
            (Value::Function(lhs), Value::Function(rhs)) => lhs == rhs,
            (Value::Closure(lhs), Value::Closure(rhs)) => Rc::ptr_eq(&lhs.proc, &rhs.proc),
            (Value::Builtin(lhs), Value::Builtin(rhs)) => std::ptr::eq(*lhs, *rhs),
            (Value::Lambda(lhs), Value::Lambda(rhs)) => Rc::ptr_eq(lhs, rhs),
            (Value::Error(lhs), Value::Error(rhs)) => lhs == rhs,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Null => write!(f, "null"),
            Value::String(v) => write!(f, "{}", v),
            Value::Array(elements) => {
                let rendered: Vec<String> = elements.iter().map(|e| e.to_string()).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
            Value::Hash(pairs) => {
                let rendered: Vec<String> =
                    pairs.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
                write!(f, "{{{}}}", rendered.join(", "))
            }
            Value::Function(proc) => write!(f, "CompiledFunction[{:p}]", Rc::as_ptr(proc)),
            Value::Closure(closure) => write!(f, "Closure[{:p}]", Rc::as_ptr(&closure.proc)),
            Value::Builtin(builtin) => write!(f, "builtin function {}", builtin.name),
            Value::Lambda(lambda) => write!(f, "fn({}) {{...}}", lambda.parameters.join(", ")),
            Value::Error(message) => write!(f, "ERROR: {}", message),
        }
    }
}

/// Key type for hash values. Only integers, booleans and strings hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    Integer(i64),
    Bool(bool),
    String(Rc<String>),
}

impl TryFrom<&Value> for HashKey {
    type Error = &'static str;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Integer(v) => Ok(HashKey::Integer(*v)),
            Value::Bool(v) => Ok(HashKey::Bool(*v)),
            Value::String(v) => Ok(HashKey::String(v.clone())),
            other => Err(other.type_name()),
        }
    }
}

impl fmt::Display for HashKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HashKey::Integer(v) => write!(f, "{}", v),
            HashKey::Bool(v) => write!(f, "{}", v),
            HashKey::String(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Integer(0).is_truthy());
        assert!(Value::string("").is_truthy());
    }

    #[test]
    fn test_string_equality_is_by_content() {
        assert_eq!(Value::string("monkey"), Value::string("monkey"));
        assert_ne!(Value::string("monkey"), Value::string("gibbon"));
    }

    #[test]
    fn test_equality_across_kinds_is_false() {
        assert_ne!(Value::Integer(0), Value::Bool(false));
        assert_ne!(Value::Null, Value::Bool(false));
    }

    #[test]
    fn test_hash_key_rejects_aggregates() {
        assert_matches!(HashKey::try_from(&Value::array(vec![])), Err("ARRAY"));
        assert_matches!(HashKey::try_from(&Value::Null), Err("NULL"));
        assert_matches!(
            HashKey::try_from(&Value::string("name")),
            Ok(HashKey::String(_))
        );
    }

    #[test]
    fn test_display() {
        let value = Value::array(vec![Value::Integer(1), Value::string("two"), Value::Null]);
        assert_eq!(value.to_string(), "[1, two, null]");
        assert_eq!(Value::error("boom").to_string(), "ERROR: boom");
    }
}
