use crate::vm::byte_code::Instructions;

/// A function body lowered to byte code. Created by the compiler and stored
/// in the constant pool of its enclosing scope; the VM never executes one
/// directly, only wrapped in a `Closure`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFunction {
    pub instructions: Instructions,
    /// Local slot count, parameters included.
    pub num_locals: usize,
    pub num_parameters: usize,
}

impl CompiledFunction {
    pub fn new(instructions: Instructions, num_locals: usize, num_parameters: usize) -> Self {
        Self {
            instructions,
            num_locals,
            num_parameters,
        }
    }
}
