use super::value::closure::Closure;

/// One activation record: the closure being executed, the instruction
/// pointer into its code, and the stack address where its locals begin.
#[derive(Debug)]
pub struct CallFrame {
    pub closure: Closure,
    pub ip: usize,
    pub base_pointer: usize,
}

impl CallFrame {
    pub fn new(closure: Closure, base_pointer: usize) -> Self {
        Self {
            closure,
            ip: 0,
            base_pointer,
        }
    }
}
