use super::function::CompiledFunction;
use super::Value;
use std::rc::Rc;

/// A compiled function bundled with its captured free variables.
///
/// Free values are captured by value when the `Closure` instruction runs and
/// are never re-read from the defining frame afterwards.
#[derive(Debug, Clone)]
pub struct Closure {
    pub proc: Rc<CompiledFunction>,
    pub free: Vec<Value>,
}

impl Closure {
    pub fn new(proc: Rc<CompiledFunction>, free: Vec<Value>) -> Self {
        Self { proc, free }
    }

    pub fn get_free(&self, index: usize) -> &Value {
        &self.free[index]
    }
}

impl From<CompiledFunction> for Closure {
    fn from(proc: CompiledFunction) -> Self {
        Self {
            proc: Rc::new(proc),
            free: vec![],
        }
    }
}
