pub mod builtins;
pub mod byte_code;
pub mod call_frame;
pub mod disassembler;
pub mod global;
pub mod stack;
pub mod value;

use builtins::BUILTINS;
use byte_code::{read_u16, read_u8, Op};
use call_frame::CallFrame;
use global::Globals;
use rustc_hash::FxHashMap;
use stack::Stack;
use std::convert::TryFrom;
use std::rc::Rc;
use thiserror::Error;
use value::closure::Closure;
use value::function::CompiledFunction;
use value::{HashKey, Value};

use crate::compiler::Bytecode;

pub const STACK_SIZE: usize = 2048;
pub const GLOBALS_SIZE: usize = 65536;
pub const MAX_FRAMES: usize = 1024;

/// Runtime errors. All of them are fatal to the current `run`; the machine
/// stops immediately and leaves the error to the caller.
#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("stack overflow")]
    StackOverflow,
    #[error("call stack overflow")]
    CallStackOverflow,
    #[error("undefined opcode {0}")]
    UndefinedOpcode(u8),
    #[error("type mismatch: {left} {op} {right}")]
    UnsupportedOperands {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },
    #[error("unknown operator: -{0}")]
    UnsupportedNegation(&'static str),
    #[error("division by zero")]
    DivisionByZero,
    #[error("calling non-function and non-builtin: {0}")]
    NotCallable(&'static str),
    #[error("wrong number of arguments: want={want}, got={got}")]
    WrongArity { want: usize, got: usize },
    #[error("unusable as hash key: {0}")]
    UnusableHashKey(&'static str),
    #[error("index operator not supported: {0}")]
    NotIndexable(&'static str),
    #[error("CompilerBug: {0}")]
    CompilerBug(String),
}

type Result<T> = std::result::Result<T, Error>;

/// The stack machine. Executes one compiled program to completion (or to the
/// first runtime error) and then reports the value of the last top-level
/// expression statement.
pub struct VM {
    constants: Vec<Value>,
    stack: Stack<Value>,
    globals: Globals,
    frames: Stack<CallFrame>,
    last_popped: Value,
}

impl VM {
    pub fn new(bytecode: Bytecode) -> Self {
        Self::with_globals(bytecode, Globals::new())
    }

    /// Construct a machine that reuses the globals of an earlier run. This is
    /// how a REPL session keeps top-level bindings alive across inputs.
    pub fn with_globals(bytecode: Bytecode, globals: Globals) -> Self {
        let main = CompiledFunction::new(bytecode.instructions, 0, 0);
        let main_closure = Closure::from(main);

        let mut stack = Stack::new(STACK_SIZE);
        let mut frames = Stack::new(MAX_FRAMES);

        // Slot 0 holds the program itself; its frame starts right above it.
        stack
            .try_push(Value::Closure(main_closure.clone()))
            .expect("stack capacity is at least one");
        frames
            .try_push(CallFrame::new(main_closure, 1))
            .expect("frame capacity is at least one");

        Self {
            constants: bytecode.constants,
            stack,
            globals,
            frames,
            last_popped: Value::Null,
        }
    }

    pub fn into_globals(self) -> Globals {
        self.globals
    }

    /// The value most recently discarded by `Pop`; observable after `run` as
    /// the program's result.
    pub fn last_popped(&self) -> &Value {
        &self.last_popped
    }

    pub fn run(&mut self) -> Result<Value> {
        while !self.frames.is_empty() {
            let frame = self.frames.peek(0);
            let ip = frame.ip;
            let base_pointer = frame.base_pointer;
            let proc = frame.closure.proc.clone();
            let code = &proc.instructions.bytes;

            if ip >= code.len() {
                // Only the outermost frame may run off the end of its stream;
                // every compiled function body ends in a return.
                break;
            }

            #[cfg(feature = "debug_vm")]
            self.debug_cycle(&proc.instructions, ip);

            let op = Op::from_byte(code[ip]).ok_or(Error::UndefinedOpcode(code[ip]))?;
            let operands = &code[ip + 1..];
            let width: usize = op.definition().operand_widths.iter().sum();
            self.set_ip(ip + 1 + width);

            match op {
                Op::Constant => {
                    let constant = self.constant(read_u16(operands) as usize)?;
                    self.push(constant)?;
                }
                Op::Add | Op::Sub | Op::Mul | Op::Div => self.execute_binary_operation(op)?,
                Op::True => self.push(Value::Bool(true))?,
                Op::False => self.push(Value::Bool(false))?,
                Op::Equal | Op::NotEqual | Op::GreaterThan | Op::LessThan => {
                    self.execute_comparison(op)?
                }
                Op::Minus => self.execute_minus()?,
                Op::Bang => {
                    let operand = self.pop();
                    self.push(Value::Bool(!operand.is_truthy()))?;
                }
                Op::Pop => {
                    self.last_popped = self.pop();
                }
                Op::JumpNotTruthy => {
                    let target = read_u16(operands) as usize;
                    let condition = self.pop();
                    if !condition.is_truthy() {
                        self.set_ip(target);
                    }
                }
                Op::Jump => self.set_ip(read_u16(operands) as usize),
                Op::Null => self.push(Value::Null)?,
                Op::SetGlobal => {
                    let index = read_u16(operands) as usize;
                    let value = self.pop();
                    self.globals.set(index, value);
                }
                Op::GetGlobal => {
                    let value = self.globals.get(read_u16(operands) as usize);
                    self.push(value)?;
                }
                Op::SetLocal => {
                    let slot = base_pointer + read_u8(operands) as usize;
                    let value = self.pop();
                    self.stack.set(slot, value);
                }
                Op::GetLocal => {
                    let slot = base_pointer + read_u8(operands) as usize;
                    self.push(self.stack.at(slot).clone())?;
                }
                Op::GetFree => {
                    let index = read_u8(operands) as usize;
                    let value = self.frames.peek(0).closure.get_free(index).clone();
                    self.push(value)?;
                }
                Op::GetBuiltin => {
                    let index = read_u8(operands) as usize;
                    let builtin = BUILTINS
                        .get(index)
                        .ok_or_else(|| Error::CompilerBug(format!("no builtin {}", index)))?;
                    self.push(Value::Builtin(builtin))?;
                }
                Op::CurrentClosure => {
                    let closure = self.frames.peek(0).closure.clone();
                    self.push(Value::Closure(closure))?;
                }
                Op::Array => {
                    let count = read_u16(operands) as usize;
                    self.build_array(count)?;
                }
                Op::Hash => {
                    let count = read_u16(operands) as usize;
                    self.build_hash(count)?;
                }
                Op::Index => {
                    let index = self.pop();
                    let left = self.pop();
                    self.execute_index_operation(left, index)?;
                }
                Op::Call => {
                    let argc = read_u8(operands) as usize;
                    self.execute_call(argc)?;
                }
                Op::ReturnValue => {
                    let value = self.pop();
                    self.return_from_frame(value)?;
                }
                Op::Return => self.return_from_frame(Value::Null)?,
                Op::Closure => {
                    let const_index = read_u16(operands) as usize;
                    let free_count = read_u8(&operands[2..]) as usize;
                    self.push_closure(const_index, free_count)?;
                }
            }
        }

        Ok(self.last_popped.clone())
    }

    #[inline]
    fn set_ip(&mut self, ip: usize) {
        self.frames.top_mut().ip = ip;
    }

    #[inline]
    fn push(&mut self, value: Value) -> Result<()> {
        self.stack.try_push(value).map_err(|_| Error::StackOverflow)
    }

    #[inline]
    fn pop(&mut self) -> Value {
        self.stack.pop()
    }

    fn constant(&self, index: usize) -> Result<Value> {
        self.constants
            .get(index)
            .cloned()
            .ok_or_else(|| Error::CompilerBug(format!("no constant at {}", index)))
    }

    fn execute_binary_operation(&mut self, op: Op) -> Result<()> {
        let right = self.pop();
        let left = self.pop();

        match (&left, &right) {
            (Value::Integer(l), Value::Integer(r)) => {
                let result = Self::execute_integer_operation(op, *l, *r)?;
                self.push(result)
            }
            (Value::String(l), Value::String(r)) if op == Op::Add => {
                self.push(Value::string(format!("{}{}", l, r)))
            }
            _ => Err(Error::UnsupportedOperands {
                op: op_symbol(op),
                left: left.type_name(),
                right: right.type_name(),
            }),
        }
    }

    fn execute_integer_operation(op: Op, left: i64, right: i64) -> Result<Value> {
        let result = match op {
            Op::Add => left.wrapping_add(right),
            Op::Sub => left.wrapping_sub(right),
            Op::Mul => left.wrapping_mul(right),
            Op::Div => {
                if right == 0 {
                    return Err(Error::DivisionByZero);
                }
                // Truncates towards zero; wrapping covers i64::MIN / -1.
                left.wrapping_div(right)
            }
            _ => return Err(Error::CompilerBug(format!("not an integer op: {:?}", op))),
        };
        Ok(Value::Integer(result))
    }

    fn execute_comparison(&mut self, op: Op) -> Result<()> {
        let right = self.pop();
        let left = self.pop();

        let result = match (&left, &right) {
            (Value::Integer(l), Value::Integer(r)) => match op {
                Op::Equal => l == r,
                Op::NotEqual => l != r,
                Op::GreaterThan => l > r,
                Op::LessThan => l < r,
                _ => return Err(Error::CompilerBug(format!("not a comparison: {:?}", op))),
            },
            _ => match op {
                Op::Equal => left == right,
                Op::NotEqual => left != right,
                _ => {
                    return Err(Error::UnsupportedOperands {
                        op: op_symbol(op),
                        left: left.type_name(),
                        right: right.type_name(),
                    })
                }
            },
        };

        self.push(Value::Bool(result))
    }

    fn execute_minus(&mut self) -> Result<()> {
        match self.pop() {
            Value::Integer(value) => self.push(Value::Integer(value.wrapping_neg())),
            other => Err(Error::UnsupportedNegation(other.type_name())),
        }
    }

    fn build_array(&mut self, count: usize) -> Result<()> {
        let start = self.stack.len() - count;
        let elements = self.stack.slice_from(start).to_vec();
        self.stack.truncate(start);
        self.push(Value::array(elements))
    }

    fn build_hash(&mut self, count: usize) -> Result<()> {
        let start = self.stack.len() - count;
        let mut pairs = FxHashMap::default();

        let mut index = start;
        while index < start + count {
            let key = HashKey::try_from(self.stack.at(index)).map_err(Error::UnusableHashKey)?;
            pairs.insert(key, self.stack.at(index + 1).clone());
            index += 2;
        }

        self.stack.truncate(start);
        self.push(Value::Hash(Rc::new(pairs)))
    }

    fn execute_index_operation(&mut self, left: Value, index: Value) -> Result<()> {
        match (&left, &index) {
            (Value::Array(elements), Value::Integer(i)) => {
                let element = if *i < 0 || *i as usize >= elements.len() {
                    Value::Null
                } else {
                    elements[*i as usize].clone()
                };
                self.push(element)
            }
            (Value::Hash(pairs), key) => {
                let key = HashKey::try_from(key).map_err(Error::UnusableHashKey)?;
                self.push(pairs.get(&key).cloned().unwrap_or(Value::Null))
            }
            _ => Err(Error::NotIndexable(left.type_name())),
        }
    }

    fn execute_call(&mut self, argc: usize) -> Result<()> {
        // The callee sits right below its arguments.
        let callee = self.stack.peek(argc).clone();

        match callee {
            Value::Closure(closure) => self.call_closure(closure, argc),
            Value::Builtin(builtin) => self.call_builtin(builtin, argc),
            other => Err(Error::NotCallable(other.type_name())),
        }
    }

    fn call_closure(&mut self, closure: Closure, argc: usize) -> Result<()> {
        if closure.proc.num_parameters != argc {
            return Err(Error::WrongArity {
                want: closure.proc.num_parameters,
                got: argc,
            });
        }

        let base_pointer = self.stack.len() - argc;
        let num_locals = closure.proc.num_locals;

        self.frames
            .try_push(CallFrame::new(closure, base_pointer))
            .map_err(|_| Error::CallStackOverflow)?;

        // Arguments occupy the first `argc` local slots; reserve the rest.
        self.stack
            .grow(base_pointer + num_locals, Value::Null)
            .map_err(|_| Error::StackOverflow)
    }

    fn call_builtin(&mut self, builtin: &'static builtins::Builtin, argc: usize) -> Result<()> {
        let start = self.stack.len() - argc;
        let args = self.stack.slice_from(start).to_vec();
        self.stack.truncate(start - 1); // drop the arguments and the callee

        let result = (builtin.apply)(&args);
        self.push(result)
    }

    fn return_from_frame(&mut self, value: Value) -> Result<()> {
        let frame = self.frames.pop();
        // Unwind locals, parameters and the callee in one go.
        self.stack.truncate(frame.base_pointer - 1);

        if self.frames.is_empty() {
            // A top-level `return` halts the program with this value.
            self.last_popped = value.clone();
        }

        self.push(value)
    }

    fn push_closure(&mut self, const_index: usize, free_count: usize) -> Result<()> {
        match self.constant(const_index)? {
            Value::Function(proc) => {
                let start = self.stack.len() - free_count;
                let free = self.stack.slice_from(start).to_vec();
                self.stack.truncate(start);
                self.push(Value::Closure(Closure::new(proc, free)))
            }
            other => Err(Error::CompilerBug(format!(
                "not a function: {}",
                other.type_name()
            ))),
        }
    }

    #[cfg(feature = "debug_vm")]
    fn debug_cycle(&self, instructions: &byte_code::Instructions, ip: usize) {
        let rendered: Vec<String> = (0..self.stack.len())
            .map(|i| self.stack.at(i).to_string())
            .collect();
        println!("stack: [{}]", rendered.join(", "));

        if let Some(def) = byte_code::lookup(instructions.bytes[ip]) {
            let (operands, _) = byte_code::read_operands(def, &instructions.bytes[ip + 1..]);
            println!("{:04} {} {:?}", ip, def.name, operands);
        }
    }
}

fn op_symbol(op: Op) -> &'static str {
    match op {
        Op::Add => "+",
        Op::Sub => "-",
        Op::Mul => "*",
        Op::Div => "/",
        Op::Equal => "==",
        Op::NotEqual => "!=",
        Op::GreaterThan => ">",
        Op::LessThan => "<",
        _ => "?",
    }
}
