use super::value::Value;
use super::GLOBALS_SIZE;

/// Flat storage for top-level bindings, indexed by the symbol table's global
/// indices. One instance is threaded through all compile/run cycles of a
/// session so that earlier definitions stay visible.
#[derive(Debug, Default)]
pub struct Globals {
    slots: Vec<Value>,
}

impl Globals {
    pub fn new() -> Self {
        Self { slots: vec![] }
    }

    pub fn set(&mut self, index: usize, value: Value) {
        debug_assert!(index < GLOBALS_SIZE);
        if index >= self.slots.len() {
            self.slots.resize(index + 1, Value::Null);
        }
        self.slots[index] = value;
    }

    pub fn get(&self, index: usize) -> Value {
        self.slots.get(index).cloned().unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_globals_set_get() {
        let mut globals = Globals::new();

        globals.set(0, Value::Integer(1));
        globals.set(5, Value::Bool(true));

        assert_eq!(globals.get(0), Value::Integer(1));
        assert_eq!(globals.get(5), Value::Bool(true));
        assert_eq!(globals.get(3), Value::Null);
        assert_eq!(globals.get(100), Value::Null);
    }
}
