pub mod symbol_table;

use crate::frontend::ast::{
    BlockStatement, Expression, InfixOp, PrefixOp, Program, Statement,
};
use crate::vm::byte_code::{make, Instructions, Op};
use crate::vm::value::function::CompiledFunction;
use crate::vm::value::Value;
use crate::vm::GLOBALS_SIZE;
use std::rc::Rc;
use symbol_table::{Symbol, SymbolScope, SymbolTable};
use thiserror::Error;

const MAX_CONSTANTS: usize = u16::MAX as usize + 1;
const MAX_LOCALS: usize = u8::MAX as usize + 1;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("undefined variable {0}")]
    UndefinedVariable(String),
    #[error("too many constants")]
    TooManyConstants,
    #[error("too many locals in one function")]
    TooManyLocals,
    #[error("too many globals")]
    TooManyGlobals,
    #[error("compiled code exceeds the addressable range")]
    CodeTooLarge,
}

type Result<T> = std::result::Result<T, Error>;

/// The compiler's output: one instruction stream for the program body plus
/// the constant pool it refers to. Function bodies live inside the pool as
/// `Value::Function` constants with streams of their own.
#[derive(Debug, Clone, PartialEq)]
pub struct Bytecode {
    pub instructions: Instructions,
    pub constants: Vec<Value>,
}

#[derive(Debug, Copy, Clone)]
struct EmittedInstruction {
    op: Op,
    position: usize,
}

/// One instruction stream under construction, with just enough history for
/// the peephole decisions around `Pop`.
#[derive(Debug, Default)]
struct CompilationScope {
    instructions: Instructions,
    last: Option<EmittedInstruction>,
    previous: Option<EmittedInstruction>,
}

/// Single-pass code generator. Walks the AST once and emits instructions as
/// it goes; jumps are emitted with a placeholder operand and patched once the
/// target address is known.
///
/// The symbol table and constant pool survive across `compile` calls so a
/// REPL can feed it one input at a time.
pub struct Compiler {
    constants: Vec<Value>,
    symbol_table: SymbolTable,
    scopes: Vec<CompilationScope>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        let mut symbol_table = SymbolTable::new();
        for (index, builtin) in crate::vm::builtins::BUILTINS.iter().enumerate() {
            symbol_table.define_builtin(index, builtin.name);
        }
        Self::with_state(symbol_table, vec![])
    }

    /// Resume with the symbol table and constant pool of an earlier
    /// compilation, so references to previously defined globals keep their
    /// indices.
    pub fn with_state(symbol_table: SymbolTable, constants: Vec<Value>) -> Self {
        Self {
            constants,
            symbol_table,
            scopes: vec![],
        }
    }

    pub fn into_state(self) -> (SymbolTable, Vec<Value>) {
        (self.symbol_table, self.constants)
    }

    pub fn compile(&mut self, program: &Program) -> Result<Bytecode> {
        self.scopes = vec![CompilationScope::default()];

        for statement in &program.statements {
            self.compile_statement(statement)?;
        }

        let scope = self.scopes.pop().expect("the program scope is still open");

        #[cfg(feature = "debug_code")]
        log::debug!("compiled program:\n{}", scope.instructions.disassemble());

        Ok(Bytecode {
            instructions: scope.instructions,
            constants: self.constants.clone(),
        })
    }

    fn compile_statement(&mut self, statement: &Statement) -> Result<()> {
        match statement {
            Statement::Let { name, value } => {
                // Defined before the value is compiled, so the value may
                // refer to the name it is being bound to.
                let symbol = self.symbol_table.define(name);
                match symbol.scope {
                    SymbolScope::Global if symbol.index >= GLOBALS_SIZE => {
                        return Err(Error::TooManyGlobals)
                    }
                    SymbolScope::Local if symbol.index >= MAX_LOCALS => {
                        return Err(Error::TooManyLocals)
                    }
                    _ => (),
                }

                self.compile_expression(value)?;

                match symbol.scope {
                    SymbolScope::Global => self.emit(Op::SetGlobal, &[symbol.index]),
                    _ => self.emit(Op::SetLocal, &[symbol.index]),
                };
                Ok(())
            }
            Statement::Return(value) => {
                self.compile_expression(value)?;
                self.emit(Op::ReturnValue, &[]);
                Ok(())
            }
            Statement::Expression(value) => {
                self.compile_expression(value)?;
                self.emit(Op::Pop, &[]);
                Ok(())
            }
        }
    }

    fn compile_block(&mut self, block: &BlockStatement) -> Result<()> {
        for statement in &block.statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    fn compile_expression(&mut self, expression: &Expression) -> Result<()> {
        match expression {
            Expression::Identifier(name) => {
                let symbol = self
                    .symbol_table
                    .resolve(name)
                    .ok_or_else(|| Error::UndefinedVariable(name.clone()))?;
                self.load_symbol(&symbol);
                Ok(())
            }
            Expression::IntegerLiteral(value) => {
                let index = self.add_constant(Value::Integer(*value))?;
                self.emit(Op::Constant, &[index]);
                Ok(())
            }
            Expression::StringLiteral(value) => {
                let index = self.add_constant(Value::string(value.clone()))?;
                self.emit(Op::Constant, &[index]);
                Ok(())
            }
            Expression::BooleanLiteral(true) => {
                self.emit(Op::True, &[]);
                Ok(())
            }
            Expression::BooleanLiteral(false) => {
                self.emit(Op::False, &[]);
                Ok(())
            }
            Expression::Prefix { op, right } => {
                self.compile_expression(right)?;
                match op {
                    PrefixOp::Bang => self.emit(Op::Bang, &[]),
                    PrefixOp::Minus => self.emit(Op::Minus, &[]),
                };
                Ok(())
            }
            Expression::Infix { op, left, right } => {
                self.compile_expression(left)?;
                self.compile_expression(right)?;
                let op = match op {
                    InfixOp::Add => Op::Add,
                    InfixOp::Sub => Op::Sub,
                    InfixOp::Mul => Op::Mul,
                    InfixOp::Div => Op::Div,
                    InfixOp::Gt => Op::GreaterThan,
                    InfixOp::Lt => Op::LessThan,
                    InfixOp::Eq => Op::Equal,
                    InfixOp::NotEq => Op::NotEqual,
                };
                self.emit(op, &[]);
                Ok(())
            }
            Expression::If {
                condition,
                consequence,
                alternative,
            } => self.compile_if(condition, consequence, alternative.as_ref()),
            Expression::FunctionLiteral {
                name,
                parameters,
                body,
            } => self.compile_function_literal(name.as_deref(), parameters, body),
            Expression::Call {
                function,
                arguments,
            } => {
                self.compile_expression(function)?;
                for argument in arguments {
                    self.compile_expression(argument)?;
                }
                self.emit(Op::Call, &[arguments.len()]);
                Ok(())
            }
            Expression::ArrayLiteral(elements) => {
                for element in elements {
                    self.compile_expression(element)?;
                }
                self.emit(Op::Array, &[elements.len()]);
                Ok(())
            }
            Expression::HashLiteral(pairs) => {
                for (key, value) in pairs {
                    self.compile_expression(key)?;
                    self.compile_expression(value)?;
                }
                self.emit(Op::Hash, &[pairs.len() * 2]);
                Ok(())
            }
            Expression::Index { left, index } => {
                self.compile_expression(left)?;
                self.compile_expression(index)?;
                self.emit(Op::Index, &[]);
                Ok(())
            }
        }
    }

    fn compile_if(
        &mut self,
        condition: &Expression,
        consequence: &BlockStatement,
        alternative: Option<&BlockStatement>,
    ) -> Result<()> {
        self.compile_expression(condition)?;

        // Placeholder operand; patched once the jump target is known.
        let jump_not_truthy = self.emit(Op::JumpNotTruthy, &[9999]);

        self.compile_branch(consequence)?;

        let jump = self.emit(Op::Jump, &[9999]);

        let after_consequence = self.current_address();
        self.change_operand(Op::JumpNotTruthy, jump_not_truthy, after_consequence)?;

        match alternative {
            None => {
                self.emit(Op::Null, &[]);
            }
            Some(alternative) => self.compile_branch(alternative)?,
        }

        let after_alternative = self.current_address();
        self.change_operand(Op::Jump, jump, after_alternative)
    }

    /// Compile one branch of an `if`. Every branch that falls through must
    /// leave exactly one value on the stack: a trailing expression statement
    /// keeps its value instead of popping it, and a branch that produces
    /// nothing, empty or ending in a binding, yields Null. A branch ending
    /// in an explicit return never falls through and needs no value.
    fn compile_branch(&mut self, block: &BlockStatement) -> Result<()> {
        self.compile_block(block)?;

        if self.last_instruction_is(Op::Pop) {
            self.remove_last_pop();
        } else if !self.last_instruction_is(Op::ReturnValue) {
            self.emit(Op::Null, &[]);
        }
        Ok(())
    }

    fn compile_function_literal(
        &mut self,
        name: Option<&str>,
        parameters: &[String],
        body: &BlockStatement,
    ) -> Result<()> {
        self.enter_scope();

        if let Some(name) = name {
            self.symbol_table.define_function_name(name);
        }
        if parameters.len() >= MAX_LOCALS {
            return Err(Error::TooManyLocals);
        }
        for parameter in parameters {
            self.symbol_table.define(parameter);
        }

        self.compile_block(body)?;

        // An expression statement in tail position becomes the return value;
        // a body that produces nothing returns Null explicitly.
        if self.last_instruction_is(Op::Pop) {
            self.replace_last_pop_with_return();
        }
        if !self.last_instruction_is(Op::ReturnValue) {
            self.emit(Op::Null, &[]);
            self.emit(Op::ReturnValue, &[]);
        }

        let (instructions, num_locals, free_symbols) = self.leave_scope();
        if num_locals >= MAX_LOCALS {
            return Err(Error::TooManyLocals);
        }

        // Free values are pushed left to right and packaged into the closure.
        for symbol in &free_symbols {
            self.load_symbol(symbol);
        }

        let function = CompiledFunction::new(instructions, num_locals, parameters.len());
        let index = self.add_constant(Value::Function(Rc::new(function)))?;
        self.emit(Op::Closure, &[index, free_symbols.len()]);
        Ok(())
    }

    fn load_symbol(&mut self, symbol: &Symbol) {
        match symbol.scope {
            SymbolScope::Global => self.emit(Op::GetGlobal, &[symbol.index]),
            SymbolScope::Local => self.emit(Op::GetLocal, &[symbol.index]),
            SymbolScope::Free => self.emit(Op::GetFree, &[symbol.index]),
            SymbolScope::Builtin => self.emit(Op::GetBuiltin, &[symbol.index]),
            SymbolScope::Function => self.emit(Op::CurrentClosure, &[]),
        };
    }

    fn enter_scope(&mut self) {
        self.scopes.push(CompilationScope::default());
        self.symbol_table.enter_scope();
    }

    fn leave_scope(&mut self) -> (Instructions, usize, Vec<Symbol>) {
        let scope = self.scopes.pop().expect("a function scope is open");
        let (num_locals, free_symbols) = self.symbol_table.leave_scope();
        (scope.instructions, num_locals, free_symbols)
    }

    fn scope(&mut self) -> &mut CompilationScope {
        self.scopes.last_mut().expect("a scope is open")
    }

    fn current_address(&mut self) -> usize {
        self.scope().instructions.len()
    }

    fn emit(&mut self, op: Op, operands: &[usize]) -> usize {
        let instruction = make(op, operands);
        let scope = self.scope();
        let position = scope.instructions.append(&instruction);
        scope.previous = scope.last;
        scope.last = Some(EmittedInstruction { op, position });
        position
    }

    fn add_constant(&mut self, value: Value) -> Result<usize> {
        if self.constants.len() >= MAX_CONSTANTS {
            return Err(Error::TooManyConstants);
        }
        self.constants.push(value);
        Ok(self.constants.len() - 1)
    }

    fn last_instruction_is(&mut self, op: Op) -> bool {
        matches!(self.scope().last, Some(last) if last.op == op)
    }

    fn remove_last_pop(&mut self) {
        let scope = self.scope();
        let last = scope.last.expect("a Pop was just emitted");
        scope.instructions.truncate(last.position);
        scope.last = scope.previous;
        scope.previous = None;
    }

    fn replace_last_pop_with_return(&mut self) {
        let scope = self.scope();
        let last = scope.last.as_mut().expect("a Pop was just emitted");
        let position = last.position;
        last.op = Op::ReturnValue;
        scope
            .instructions
            .patch(position, &make(Op::ReturnValue, &[]));
    }

    fn change_operand(&mut self, op: Op, position: usize, operand: usize) -> Result<()> {
        if operand > u16::MAX as usize {
            return Err(Error::CodeTooLarge);
        }
        self.scope()
            .instructions
            .patch(position, &make(op, &[operand]));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser;

    fn compile(input: &str) -> Bytecode {
        let program = parser::parse(input).expect("parse error");
        Compiler::new().compile(&program).expect("compile error")
    }

    fn compile_error(input: &str) -> Error {
        let program = parser::parse(input).expect("parse error");
        Compiler::new().compile(&program).expect_err("compiled unexpectedly")
    }

    fn concat(parts: &[Vec<u8>]) -> Instructions {
        let mut instructions = Instructions::new();
        for part in parts {
            instructions.append(part);
        }
        instructions
    }

    fn assert_instructions(actual: &Instructions, expected: &[Vec<u8>]) {
        // Compare disassemblies for readable failures.
        assert_eq!(actual.disassemble(), concat(expected).disassemble());
    }

    fn function_instructions(bytecode: &Bytecode, index: usize) -> &Instructions {
        match &bytecode.constants[index] {
            Value::Function(function) => &function.instructions,
            other => panic!("constant {} is not a function: {:?}", index, other),
        }
    }

    #[test]
    fn test_integer_arithmetic() {
        let bytecode = compile("1 + 2");
        assert_eq!(bytecode.constants, vec![Value::Integer(1), Value::Integer(2)]);
        assert_instructions(
            &bytecode.instructions,
            &[
                make(Op::Constant, &[0]),
                make(Op::Constant, &[1]),
                make(Op::Add, &[]),
                make(Op::Pop, &[]),
            ],
        );

        let bytecode = compile("1; 2");
        assert_instructions(
            &bytecode.instructions,
            &[
                make(Op::Constant, &[0]),
                make(Op::Pop, &[]),
                make(Op::Constant, &[1]),
                make(Op::Pop, &[]),
            ],
        );

        let bytecode = compile("-1");
        assert_instructions(
            &bytecode.instructions,
            &[
                make(Op::Constant, &[0]),
                make(Op::Minus, &[]),
                make(Op::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_boolean_expressions() {
        let bytecode = compile("true");
        assert_instructions(
            &bytecode.instructions,
            &[make(Op::True, &[]), make(Op::Pop, &[])],
        );

        let bytecode = compile("!true");
        assert_instructions(
            &bytecode.instructions,
            &[make(Op::True, &[]), make(Op::Bang, &[]), make(Op::Pop, &[])],
        );
    }

    #[test]
    fn test_comparison_operators() {
        let bytecode = compile("1 > 2");
        assert_eq!(bytecode.constants, vec![Value::Integer(1), Value::Integer(2)]);
        assert_instructions(
            &bytecode.instructions,
            &[
                make(Op::Constant, &[0]),
                make(Op::Constant, &[1]),
                make(Op::GreaterThan, &[]),
                make(Op::Pop, &[]),
            ],
        );

        // `<` has its own opcode; operands keep their source order.
        let bytecode = compile("1 < 2");
        assert_eq!(bytecode.constants, vec![Value::Integer(1), Value::Integer(2)]);
        assert_instructions(
            &bytecode.instructions,
            &[
                make(Op::Constant, &[0]),
                make(Op::Constant, &[1]),
                make(Op::LessThan, &[]),
                make(Op::Pop, &[]),
            ],
        );

        let bytecode = compile("true != false");
        assert_instructions(
            &bytecode.instructions,
            &[
                make(Op::True, &[]),
                make(Op::False, &[]),
                make(Op::NotEqual, &[]),
                make(Op::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_conditionals() {
        let bytecode = compile("if (true) { 10 }; 3333;");
        assert_instructions(
            &bytecode.instructions,
            &[
                make(Op::True, &[]),              // 0000
                make(Op::JumpNotTruthy, &[10]),   // 0001
                make(Op::Constant, &[0]),         // 0004
                make(Op::Jump, &[11]),            // 0007
                make(Op::Null, &[]),              // 0010
                make(Op::Pop, &[]),               // 0011
                make(Op::Constant, &[1]),         // 0012
                make(Op::Pop, &[]),               // 0015
            ],
        );

        let bytecode = compile("if (true) { 10 } else { 20 }; 3333;");
        assert_instructions(
            &bytecode.instructions,
            &[
                make(Op::True, &[]),              // 0000
                make(Op::JumpNotTruthy, &[10]),   // 0001
                make(Op::Constant, &[0]),         // 0004
                make(Op::Jump, &[13]),            // 0007
                make(Op::Constant, &[1]),         // 0010
                make(Op::Pop, &[]),               // 0013
                make(Op::Constant, &[2]),         // 0014
                make(Op::Pop, &[]),               // 0017
            ],
        );
    }

    #[test]
    fn test_conditionals_with_branches_that_produce_no_value() {
        // An empty branch still leaves a value behind.
        let bytecode = compile("if (true) {}");
        assert_instructions(
            &bytecode.instructions,
            &[
                make(Op::True, &[]),             // 0000
                make(Op::JumpNotTruthy, &[8]),   // 0001
                make(Op::Null, &[]),             // 0004
                make(Op::Jump, &[9]),            // 0005
                make(Op::Null, &[]),             // 0008
                make(Op::Pop, &[]),              // 0009
            ],
        );

        // So does a branch ending in a binding.
        let bytecode = compile("if (true) { let a = 1; } else { 2 }");
        assert_instructions(
            &bytecode.instructions,
            &[
                make(Op::True, &[]),             // 0000
                make(Op::JumpNotTruthy, &[14]),  // 0001
                make(Op::Constant, &[0]),        // 0004
                make(Op::SetGlobal, &[0]),       // 0007
                make(Op::Null, &[]),             // 0010
                make(Op::Jump, &[17]),           // 0011
                make(Op::Constant, &[1]),        // 0014
                make(Op::Pop, &[]),              // 0017
            ],
        );
    }

    #[test]
    fn test_global_let_statements() {
        let bytecode = compile("let one = 1; let two = 2;");
        assert_instructions(
            &bytecode.instructions,
            &[
                make(Op::Constant, &[0]),
                make(Op::SetGlobal, &[0]),
                make(Op::Constant, &[1]),
                make(Op::SetGlobal, &[1]),
            ],
        );

        let bytecode = compile("let one = 1; one;");
        assert_instructions(
            &bytecode.instructions,
            &[
                make(Op::Constant, &[0]),
                make(Op::SetGlobal, &[0]),
                make(Op::GetGlobal, &[0]),
                make(Op::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_undefined_variable() {
        assert_eq!(
            compile_error("undefined"),
            Error::UndefinedVariable("undefined".to_string())
        );
        assert_eq!(
            compile_error("fn() { undefined }"),
            Error::UndefinedVariable("undefined".to_string())
        );
    }

    #[test]
    fn test_string_expressions() {
        let bytecode = compile("\"mon\" + \"key\"");
        assert_eq!(
            bytecode.constants,
            vec![Value::string("mon"), Value::string("key")]
        );
        assert_instructions(
            &bytecode.instructions,
            &[
                make(Op::Constant, &[0]),
                make(Op::Constant, &[1]),
                make(Op::Add, &[]),
                make(Op::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_array_literals() {
        let bytecode = compile("[]");
        assert_instructions(
            &bytecode.instructions,
            &[make(Op::Array, &[0]), make(Op::Pop, &[])],
        );

        let bytecode = compile("[1, 2, 3]");
        assert_instructions(
            &bytecode.instructions,
            &[
                make(Op::Constant, &[0]),
                make(Op::Constant, &[1]),
                make(Op::Constant, &[2]),
                make(Op::Array, &[3]),
                make(Op::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_hash_literals() {
        let bytecode = compile("{1: 2, 3: 4, 5: 6}");
        // Pairs are compiled in source order.
        assert_eq!(
            bytecode.constants,
            vec![
                Value::Integer(1),
                Value::Integer(2),
                Value::Integer(3),
                Value::Integer(4),
                Value::Integer(5),
                Value::Integer(6),
            ]
        );
        assert_instructions(
            &bytecode.instructions,
            &[
                make(Op::Constant, &[0]),
                make(Op::Constant, &[1]),
                make(Op::Constant, &[2]),
                make(Op::Constant, &[3]),
                make(Op::Constant, &[4]),
                make(Op::Constant, &[5]),
                make(Op::Hash, &[6]),
                make(Op::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_index_expressions() {
        let bytecode = compile("[1, 2][1]");
        assert_instructions(
            &bytecode.instructions,
            &[
                make(Op::Constant, &[0]),
                make(Op::Constant, &[1]),
                make(Op::Array, &[2]),
                make(Op::Constant, &[2]),
                make(Op::Index, &[]),
                make(Op::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_functions() {
        let bytecode = compile("fn() { return 5 + 10 }");
        assert_instructions(
            function_instructions(&bytecode, 2),
            &[
                make(Op::Constant, &[0]),
                make(Op::Constant, &[1]),
                make(Op::Add, &[]),
                make(Op::ReturnValue, &[]),
            ],
        );
        assert_instructions(
            &bytecode.instructions,
            &[make(Op::Closure, &[2, 0]), make(Op::Pop, &[])],
        );

        // The implicit return compiles identically.
        let implicit = compile("fn() { 5 + 10 }");
        assert_eq!(bytecode, implicit);

        let bytecode = compile("fn() { 1; 2 }");
        assert_instructions(
            function_instructions(&bytecode, 2),
            &[
                make(Op::Constant, &[0]),
                make(Op::Pop, &[]),
                make(Op::Constant, &[1]),
                make(Op::ReturnValue, &[]),
            ],
        );
    }

    #[test]
    fn test_functions_without_return_value() {
        let bytecode = compile("fn() { }");
        assert_instructions(
            function_instructions(&bytecode, 0),
            &[make(Op::Null, &[]), make(Op::ReturnValue, &[])],
        );

        let bytecode = compile("fn() { let a = 1; }");
        assert_instructions(
            function_instructions(&bytecode, 1),
            &[
                make(Op::Constant, &[0]),
                make(Op::SetLocal, &[0]),
                make(Op::Null, &[]),
                make(Op::ReturnValue, &[]),
            ],
        );
    }

    #[test]
    fn test_function_calls() {
        let bytecode = compile("fn() { 24 }();");
        assert_instructions(
            &bytecode.instructions,
            &[
                make(Op::Closure, &[1, 0]),
                make(Op::Call, &[0]),
                make(Op::Pop, &[]),
            ],
        );

        let bytecode = compile("let oneArg = fn(a) { a }; oneArg(24);");
        assert_instructions(
            function_instructions(&bytecode, 0),
            &[make(Op::GetLocal, &[0]), make(Op::ReturnValue, &[])],
        );
        assert_instructions(
            &bytecode.instructions,
            &[
                make(Op::Closure, &[0, 0]),
                make(Op::SetGlobal, &[0]),
                make(Op::GetGlobal, &[0]),
                make(Op::Constant, &[1]),
                make(Op::Call, &[1]),
                make(Op::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_let_statement_scopes() {
        let bytecode = compile("let num = 55; fn() { num }");
        assert_instructions(
            function_instructions(&bytecode, 1),
            &[make(Op::GetGlobal, &[0]), make(Op::ReturnValue, &[])],
        );

        let bytecode = compile("fn() { let num = 55; num }");
        assert_instructions(
            function_instructions(&bytecode, 1),
            &[
                make(Op::Constant, &[0]),
                make(Op::SetLocal, &[0]),
                make(Op::GetLocal, &[0]),
                make(Op::ReturnValue, &[]),
            ],
        );
    }

    #[test]
    fn test_builtins() {
        let bytecode = compile("len([]); push([], 1);");
        assert_instructions(
            &bytecode.instructions,
            &[
                make(Op::GetBuiltin, &[0]),
                make(Op::Array, &[0]),
                make(Op::Call, &[1]),
                make(Op::Pop, &[]),
                make(Op::GetBuiltin, &[3]),
                make(Op::Array, &[0]),
                make(Op::Constant, &[0]),
                make(Op::Call, &[2]),
                make(Op::Pop, &[]),
            ],
        );

        let bytecode = compile("fn() { len([]) }");
        assert_instructions(
            function_instructions(&bytecode, 0),
            &[
                make(Op::GetBuiltin, &[0]),
                make(Op::Array, &[0]),
                make(Op::Call, &[1]),
                make(Op::ReturnValue, &[]),
            ],
        );
    }

    #[test]
    fn test_closures() {
        let bytecode = compile("fn(a) { fn(b) { a + b } }");
        assert_instructions(
            function_instructions(&bytecode, 0),
            &[
                make(Op::GetFree, &[0]),
                make(Op::GetLocal, &[0]),
                make(Op::Add, &[]),
                make(Op::ReturnValue, &[]),
            ],
        );
        assert_instructions(
            function_instructions(&bytecode, 1),
            &[
                make(Op::GetLocal, &[0]),
                make(Op::Closure, &[0, 1]),
                make(Op::ReturnValue, &[]),
            ],
        );
        assert_instructions(
            &bytecode.instructions,
            &[make(Op::Closure, &[1, 0]), make(Op::Pop, &[])],
        );
    }

    #[test]
    fn test_nested_closures_capture_through_every_level() {
        let bytecode = compile("fn(a) { fn(b) { fn(c) { a + b + c } } }");
        assert_instructions(
            function_instructions(&bytecode, 0),
            &[
                make(Op::GetFree, &[0]),
                make(Op::GetFree, &[1]),
                make(Op::Add, &[]),
                make(Op::GetLocal, &[0]),
                make(Op::Add, &[]),
                make(Op::ReturnValue, &[]),
            ],
        );
        assert_instructions(
            function_instructions(&bytecode, 1),
            &[
                make(Op::GetFree, &[0]),
                make(Op::GetLocal, &[0]),
                make(Op::Closure, &[0, 2]),
                make(Op::ReturnValue, &[]),
            ],
        );
        assert_instructions(
            function_instructions(&bytecode, 2),
            &[
                make(Op::GetLocal, &[0]),
                make(Op::Closure, &[1, 1]),
                make(Op::ReturnValue, &[]),
            ],
        );
    }

    #[test]
    fn test_recursive_functions() {
        let bytecode = compile("let countDown = fn(x) { countDown(x - 1); }; countDown(1);");
        assert_instructions(
            function_instructions(&bytecode, 1),
            &[
                make(Op::CurrentClosure, &[]),
                make(Op::GetLocal, &[0]),
                make(Op::Constant, &[0]),
                make(Op::Sub, &[]),
                make(Op::Call, &[1]),
                make(Op::ReturnValue, &[]),
            ],
        );
        assert_instructions(
            &bytecode.instructions,
            &[
                make(Op::Closure, &[1, 0]),
                make(Op::SetGlobal, &[0]),
                make(Op::GetGlobal, &[0]),
                make(Op::Constant, &[2]),
                make(Op::Call, &[1]),
                make(Op::Pop, &[]),
            ],
        );
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let input = "let f = fn(a) { if (a > 0) { a } else { 0 - a } }; f(3) + f(0 - 3);";
        assert_eq!(compile(input), compile(input));
    }

    #[test]
    fn test_state_carries_over_between_compilations() {
        let program = parser::parse("let a = 1;").unwrap();
        let mut compiler = Compiler::new();
        compiler.compile(&program).unwrap();

        let (symbols, constants) = compiler.into_state();
        let mut compiler = Compiler::with_state(symbols, constants);
        let program = parser::parse("a + 2").unwrap();
        let bytecode = compiler.compile(&program).unwrap();

        assert_eq!(bytecode.constants, vec![Value::Integer(1), Value::Integer(2)]);
        assert_instructions(
            &bytecode.instructions,
            &[
                make(Op::GetGlobal, &[0]),
                make(Op::Constant, &[1]),
                make(Op::Add, &[]),
                make(Op::Pop, &[]),
            ],
        );
    }
}
