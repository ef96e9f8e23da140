use crate::identifier::Identifier;
use crate::interpreter::Program;
use crate::scope::{Scope, ScopeLink};
use crate::statement::{exec_block, Flow};
use crate::value::{Func, Val, ValueKind};
use std::rc::Rc;
use thiserror::Error;

pub type ExprRef = Box<Expr>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negative,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    And,
    Or,
    LessThan,
    GreaterThan,
    LessThanEquals,
    GreaterThanEquals,
    Equals,
    NotEqual,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    NumberLit(f64),
    StringLit(Rc<str>),
    BooleanLit(bool),
    NullLit,
    Variable(Identifier),
    Unary(UnaryOp, ExprRef),
    Binary(BinOp, ExprRef, ExprRef),
    Call(ExprRef, Vec<Expr>),
    /// Fields in source order. Duplicate names are kept; the last one wins at runtime.
    Object(Vec<(Identifier, Expr)>),
    Get(ExprRef, Identifier),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("'{identifier}' is not in scope")]
    NotInScope { identifier: Identifier },
    #[error("Expected a function, got {actual_type}")]
    NotFunction { actual_type: ValueKind },
    #[error("Type mismatch: expected {}, got {actual_type}", kinds(.expected_types))]
    TypeMismatch {
        expected_types: Vec<ValueKind>,
        actual_type: ValueKind,
    },
    #[error("Expected {expected_num_args} arguments, got {actual_num_args}")]
    ArityMismatch {
        expected_num_args: usize,
        actual_num_args: usize,
    },
    #[error("'{identifier}' was used before being assigned a value")]
    UnassignedVariable { identifier: Identifier },
    #[error("Expected an object, got {actual_type}")]
    NotObject { actual_type: ValueKind },
    #[error("No module named '{module_name}'")]
    NoSuchModule { module_name: Identifier },
    #[error("Nothing named '{export_name}' is exported")]
    NoSuchExport { export_name: Identifier },
    #[error("No module named Main")]
    NoMain,
    #[error("More than one module named Main")]
    MultipleMains,
}

fn kinds(expected: &[ValueKind]) -> String {
    expected
        .iter()
        .map(ValueKind::to_string)
        .collect::<Vec<_>>()
        .join(" or ")
}

fn type_mismatch(expected: ValueKind, actual: &Val) -> RuntimeError {
    RuntimeError::TypeMismatch {
        expected_types: vec![expected],
        actual_type: actual.kind(),
    }
}

impl Expr {
    pub fn eval(&self, scope: &ScopeLink, program: &Program) -> Result<Val, RuntimeError> {
        match self {
            Self::NumberLit(x) => Ok(Val::Num(*x)),
            Self::StringLit(s) => Ok(Val::String(s.clone())),
            Self::BooleanLit(b) => Ok(Val::Bool(*b)),
            Self::NullLit => Ok(Val::Null),
            Self::Variable(id) => {
                let cell = (**scope)
                    .borrow()
                    .lookup(id)
                    .ok_or_else(|| RuntimeError::NotInScope { identifier: id.clone() })?;
                let val = cell.borrow().clone();
                val.ok_or_else(|| RuntimeError::UnassignedVariable { identifier: id.clone() })
            }
            Self::Unary(op, x) => {
                let l = x.eval(scope, program)?;
                match (op, l) {
                    (UnaryOp::Negative, Val::Num(a)) => Ok(Val::Num(-a)),
                    (UnaryOp::Not, Val::Bool(a)) => Ok(Val::Bool(!a)),
                    (UnaryOp::Negative, other) => Err(type_mismatch(ValueKind::Number, &other)),
                    (UnaryOp::Not, other) => Err(type_mismatch(ValueKind::Boolean, &other)),
                }
            }
            Self::Binary(op, x, y) => {
                let l = x.eval(scope, program)?;
                let r = y.eval(scope, program)?;
                binary(*op, l, r)
            }
            Self::Call(callee, args) => {
                let fun = callee.eval(scope, program)?;
                if !fun.is_callable() {
                    return Err(RuntimeError::NotFunction { actual_type: fun.kind() });
                }

                let mut evaluated = Vec::with_capacity(args.len());
                for arg in args {
                    evaluated.push(arg.eval(scope, program)?);
                }

                match fun {
                    Val::Closure(func) => call_closure(&func, evaluated, program),
                    Val::NativeFunc(nc) => nc.call(&evaluated),
                    other => Err(RuntimeError::NotFunction { actual_type: other.kind() }),
                }
            }
            Self::Object(fields) => {
                let mut evaluated = Vec::with_capacity(fields.len());
                for (name, expr) in fields {
                    evaluated.push((name.clone(), expr.eval(scope, program)?));
                }
                Ok(Val::object(evaluated))
            }
            Self::Get(target, field) => match target.eval(scope, program)? {
                Val::Object(fields) => Ok(fields.borrow().get(field).cloned().unwrap_or(Val::Null)),
                other => Err(RuntimeError::NotObject { actual_type: other.kind() }),
            },
        }
    }
}

fn binary(op: BinOp, l: Val, r: Val) -> Result<Val, RuntimeError> {
    match op {
        BinOp::Add => numbers(&l, &r).map(|(a, b)| Val::Num(a + b)),
        BinOp::Subtract => numbers(&l, &r).map(|(a, b)| Val::Num(a - b)),
        BinOp::Multiply => numbers(&l, &r).map(|(a, b)| Val::Num(a * b)),
        BinOp::Divide => numbers(&l, &r).map(|(a, b)| Val::Num(a / b)),
        BinOp::LessThan => numbers(&l, &r).map(|(a, b)| Val::Bool(a < b)),
        BinOp::GreaterThan => numbers(&l, &r).map(|(a, b)| Val::Bool(a > b)),
        BinOp::LessThanEquals => numbers(&l, &r).map(|(a, b)| Val::Bool(a <= b)),
        BinOp::GreaterThanEquals => numbers(&l, &r).map(|(a, b)| Val::Bool(a >= b)),
        BinOp::And => booleans(&l, &r).map(|(a, b)| Val::Bool(a && b)),
        BinOp::Or => booleans(&l, &r).map(|(a, b)| Val::Bool(a || b)),
        BinOp::Equals => l.language_eq(&r).map(Val::Bool),
        BinOp::NotEqual => l.language_eq(&r).map(|eq| Val::Bool(!eq)),
    }
}

// Both operands are checked, left first, so the error names the left one when both are wrong.
fn numbers(l: &Val, r: &Val) -> Result<(f64, f64), RuntimeError> {
    match (l, r) {
        (Val::Num(a), Val::Num(b)) => Ok((*a, *b)),
        (Val::Num(_), other) | (other, _) => Err(type_mismatch(ValueKind::Number, other)),
    }
}

fn booleans(l: &Val, r: &Val) -> Result<(bool, bool), RuntimeError> {
    match (l, r) {
        (Val::Bool(a), Val::Bool(b)) => Ok((*a, *b)),
        (Val::Bool(_), other) | (other, _) => Err(type_mismatch(ValueKind::Boolean, other)),
    }
}

/// Runs `func`'s body in a new frame whose parent is the scope the function
/// was declared in, not the caller's.
pub fn call_closure(func: &Func, args: Vec<Val>, program: &Program) -> Result<Val, RuntimeError> {
    if args.len() != func.arity() {
        return Err(RuntimeError::ArityMismatch {
            expected_num_args: func.arity(),
            actual_num_args: args.len(),
        });
    }

    let child = Scope::new_child(&func.scope);
    {
        let mut frame = (*child).borrow_mut();
        for (name, val) in func.arg_names.iter().zip(args) {
            frame.define(name.clone(), val);
        }
    }

    match exec_block(&func.body, &child, program)? {
        Flow::Return(val) => Ok(val),
        Flow::Normal => Ok(Val::Null),
    }
}
