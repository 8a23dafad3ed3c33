use super::value::Value;
use lazy_static::lazy_static;

/// A host-provided function. Builtins are pre-numbered by their position in
/// `BUILTINS`; the numbering is part of the compiled-code contract and must
/// not change between compilation and execution.
pub struct Builtin {
    pub name: &'static str,
    pub apply: fn(&[Value]) -> Value,
}

impl std::fmt::Debug for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Builtin").field("name", &self.name).finish()
    }
}

lazy_static! {
    pub static ref BUILTINS: Vec<Builtin> = vec![
        Builtin { name: "len", apply: len },
        Builtin { name: "first", apply: first },
        Builtin { name: "last", apply: last },
        Builtin { name: "push", apply: push },
        Builtin { name: "rest", apply: rest },
        Builtin { name: "put", apply: put },
    ];
}

/// Resolve a builtin by name. Used by the evaluator, which has no
/// pre-resolved indices to work with.
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name == name)
}

fn len(args: &[Value]) -> Value {
    if args.len() != 1 {
        return wrong_argument_count(args.len(), 1);
    }

    match &args[0] {
        Value::String(s) => Value::Integer(s.len() as i64),
        Value::Array(elements) => Value::Integer(elements.len() as i64),
        other => Value::error(format!(
            "argument to `len` not supported, got {}",
            other.type_name()
        )),
    }
}

fn first(args: &[Value]) -> Value {
    if args.len() != 1 {
        return wrong_argument_count(args.len(), 1);
    }

    match &args[0] {
        Value::Array(elements) => elements.first().cloned().unwrap_or(Value::Null),
        other => Value::error(format!(
            "argument to `first` must be ARRAY, got {}",
            other.type_name()
        )),
    }
}

fn last(args: &[Value]) -> Value {
    if args.len() != 1 {
        return wrong_argument_count(args.len(), 1);
    }

    match &args[0] {
        Value::Array(elements) => elements.last().cloned().unwrap_or(Value::Null),
        other => Value::error(format!(
            "argument to `last` must be ARRAY, got {}",
            other.type_name()
        )),
    }
}

fn push(args: &[Value]) -> Value {
    if args.len() != 2 {
        return wrong_argument_count(args.len(), 2);
    }

    match &args[0] {
        Value::Array(elements) => {
            let mut extended = elements.as_ref().clone();
            extended.push(args[1].clone());
            Value::array(extended)
        }
        other => Value::error(format!(
            "argument to `push` must be ARRAY, got {}",
            other.type_name()
        )),
    }
}

fn rest(args: &[Value]) -> Value {
    if args.len() != 1 {
        return wrong_argument_count(args.len(), 1);
    }

    match &args[0] {
        Value::Array(elements) if !elements.is_empty() => {
            Value::array(elements[1..].to_vec())
        }
        Value::Array(_) => Value::Null,
        other => Value::error(format!(
            "argument to `rest` must be ARRAY, got {}",
            other.type_name()
        )),
    }
}

fn put(args: &[Value]) -> Value {
    for arg in args {
        println!("{}", arg);
    }
    Value::Null
}

fn wrong_argument_count(got: usize, want: usize) -> Value {
    Value::error(format!(
        "wrong number of arguments. got={}, want={}",
        got, want
    ))
}
