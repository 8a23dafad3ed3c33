//! The tree-walking reference engine. Slower than the VM but useful to
//! cross-check its behavior, selectable with `--engine eval`.

pub mod environment;

use crate::frontend::ast::{
    BlockStatement, Expression, InfixOp, PrefixOp, Program, Statement,
};
use crate::vm::builtins;
use crate::vm::value::{HashKey, Value};
use environment::{Env, Environment};
use rustc_hash::FxHashMap;
use std::convert::TryFrom;
use std::rc::Rc;

/// A function value on the evaluator path. Captures its defining environment
/// by reference, unlike compiled closures, which copy their free values.
#[derive(Debug)]
pub struct Lambda {
    pub parameters: Vec<String>,
    pub body: BlockStatement,
    pub env: Env,
}

/// Non-local exits of the walk. `Return` unwinds to the enclosing function
/// call, `Error` unwinds the whole program.
enum Signal {
    Return(Value),
    Error(Value),
}

type Outcome = Result<Value, Signal>;

fn error<S: Into<String>>(message: S) -> Signal {
    Signal::Error(Value::error(message))
}

/// Evaluate a program. Errors surface as the resulting `Value::Error`, the
/// same shape they have on the REPL path.
pub fn eval_program(program: &Program, env: &Env) -> Value {
    let mut result = Value::Null;

    for statement in &program.statements {
        match eval_statement(statement, env) {
            Ok(value) => result = value,
            Err(Signal::Return(value)) => return value,
            Err(Signal::Error(value)) => return value,
        }
    }

    result
}

fn eval_statement(statement: &Statement, env: &Env) -> Outcome {
    match statement {
        Statement::Let { name, value } => {
            let value = eval_expression(value, env)?;
            env.borrow_mut().set(name, value);
            Ok(Value::Null)
        }
        Statement::Return(value) => {
            let value = eval_expression(value, env)?;
            Err(Signal::Return(value))
        }
        Statement::Expression(value) => eval_expression(value, env),
    }
}

fn eval_block(block: &BlockStatement, env: &Env) -> Outcome {
    let mut result = Value::Null;
    for statement in &block.statements {
        result = eval_statement(statement, env)?;
    }
    Ok(result)
}

fn eval_expression(expression: &Expression, env: &Env) -> Outcome {
    match expression {
        Expression::Identifier(name) => match env.borrow().get(name) {
            Some(value) => Ok(value),
            None => match builtins::lookup(name) {
                Some(builtin) => Ok(Value::Builtin(builtin)),
                None => Err(error(format!("identifier not found: {}", name))),
            },
        },
        Expression::IntegerLiteral(value) => Ok(Value::Integer(*value)),
        Expression::StringLiteral(value) => Ok(Value::string(value.clone())),
        Expression::BooleanLiteral(value) => Ok(Value::Bool(*value)),
        Expression::Prefix { op, right } => {
            let right = eval_expression(right, env)?;
            eval_prefix(*op, right)
        }
        Expression::Infix { op, left, right } => {
            let left = eval_expression(left, env)?;
            let right = eval_expression(right, env)?;
            eval_infix(*op, left, right)
        }
        Expression::If {
            condition,
            consequence,
            alternative,
        } => {
            let condition = eval_expression(condition, env)?;
            if condition.is_truthy() {
                eval_block(consequence, env)
            } else {
                match alternative {
                    Some(alternative) => eval_block(alternative, env),
                    None => Ok(Value::Null),
                }
            }
        }
        Expression::FunctionLiteral {
            parameters, body, ..
        } => Ok(Value::Lambda(Rc::new(Lambda {
            parameters: parameters.clone(),
            body: body.clone(),
            env: env.clone(),
        }))),
        Expression::Call {
            function,
            arguments,
        } => {
            let function = eval_expression(function, env)?;
            let mut args = Vec::with_capacity(arguments.len());
            for argument in arguments {
                args.push(eval_expression(argument, env)?);
            }
            apply(function, args)
        }
        Expression::ArrayLiteral(elements) => {
            let mut values = Vec::with_capacity(elements.len());
            for element in elements {
                values.push(eval_expression(element, env)?);
            }
            Ok(Value::array(values))
        }
        Expression::HashLiteral(pairs) => {
            let mut hash = FxHashMap::default();
            for (key, value) in pairs {
                let key = eval_expression(key, env)?;
                let key = HashKey::try_from(&key)
                    .map_err(|kind| error(format!("unusable as hash key: {}", kind)))?;
                let value = eval_expression(value, env)?;
                hash.insert(key, value);
            }
            Ok(Value::Hash(Rc::new(hash)))
        }
        Expression::Index { left, index } => {
            let left = eval_expression(left, env)?;
            let index = eval_expression(index, env)?;
            eval_index(left, index)
        }
    }
}

fn eval_prefix(op: PrefixOp, right: Value) -> Outcome {
    match op {
        PrefixOp::Bang => Ok(Value::Bool(!right.is_truthy())),
        PrefixOp::Minus => match right {
            Value::Integer(value) => Ok(Value::Integer(value.wrapping_neg())),
            other => Err(error(format!("unknown operator: -{}", other.type_name()))),
        },
    }
}

fn eval_infix(op: InfixOp, left: Value, right: Value) -> Outcome {
    match (&left, &right) {
        (Value::Integer(l), Value::Integer(r)) => eval_integer_infix(op, *l, *r),
        (Value::String(l), Value::String(r)) => match op {
            InfixOp::Add => Ok(Value::string(format!("{}{}", l, r))),
            InfixOp::Eq => Ok(Value::Bool(l == r)),
            InfixOp::NotEq => Ok(Value::Bool(l != r)),
            _ => Err(unknown_operator(op, &left, &right)),
        },
        _ => match op {
            InfixOp::Eq => Ok(Value::Bool(left == right)),
            InfixOp::NotEq => Ok(Value::Bool(left != right)),
            _ if left.type_name() != right.type_name() => Err(error(format!(
                "type mismatch: {} {} {}",
                left.type_name(),
                op,
                right.type_name()
            ))),
            _ => Err(unknown_operator(op, &left, &right)),
        },
    }
}

fn unknown_operator(op: InfixOp, left: &Value, right: &Value) -> Signal {
    error(format!(
        "unknown operator: {} {} {}",
        left.type_name(),
        op,
        right.type_name()
    ))
}

fn eval_integer_infix(op: InfixOp, left: i64, right: i64) -> Outcome {
    let value = match op {
        InfixOp::Add => Value::Integer(left.wrapping_add(right)),
        InfixOp::Sub => Value::Integer(left.wrapping_sub(right)),
        InfixOp::Mul => Value::Integer(left.wrapping_mul(right)),
        InfixOp::Div => {
            if right == 0 {
                return Err(error("division by zero"));
            }
            Value::Integer(left.wrapping_div(right))
        }
        InfixOp::Lt => Value::Bool(left < right),
        InfixOp::Gt => Value::Bool(left > right),
        InfixOp::Eq => Value::Bool(left == right),
        InfixOp::NotEq => Value::Bool(left != right),
    };
    Ok(value)
}

fn eval_index(left: Value, index: Value) -> Outcome {
    match (&left, &index) {
        (Value::Array(elements), Value::Integer(i)) => {
            if *i < 0 || *i as usize >= elements.len() {
                Ok(Value::Null)
            } else {
                Ok(elements[*i as usize].clone())
            }
        }
        (Value::Hash(pairs), key) => {
            let key = HashKey::try_from(key)
                .map_err(|kind| error(format!("unusable as hash key: {}", kind)))?;
            Ok(pairs.get(&key).cloned().unwrap_or(Value::Null))
        }
        _ => Err(error(format!(
            "index operator not supported: {}",
            left.type_name()
        ))),
    }
}

fn apply(function: Value, args: Vec<Value>) -> Outcome {
    match function {
        Value::Lambda(lambda) => {
            if lambda.parameters.len() != args.len() {
                return Err(error(format!(
                    "wrong number of arguments: want={}, got={}",
                    lambda.parameters.len(),
                    args.len()
                )));
            }

            let call_env = Environment::enclosed(lambda.env.clone());
            for (parameter, arg) in lambda.parameters.iter().zip(args) {
                call_env.borrow_mut().set(parameter, arg);
            }

            match eval_block(&lambda.body, &call_env) {
                Err(Signal::Return(value)) => Ok(value),
                other => other,
            }
        }
        Value::Builtin(builtin) => {
            let result = (builtin.apply)(&args);
            if result.is_error() {
                Err(Signal::Error(result))
            } else {
                Ok(result)
            }
        }
        other => Err(error(format!("not a function: {}", other.type_name()))),
    }
}
