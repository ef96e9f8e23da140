use crate::expr::{ExprRef, RuntimeError};
use crate::identifier::Identifier;
use crate::interpreter::Program;
use crate::scope::{Scope, ScopeLink};
use crate::value::{Func, Val, ValueKind};
use std::rc::Rc;
use tracing::debug;

pub type Block = Vec<Stmt>;

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `let x;` Declares `x` without a value. `let x = e;` parses as this
    /// followed by an `Assignment`.
    VarDecl(Identifier),
    Assignment(Identifier, ExprRef),
    Return(Option<ExprRef>),
    Expr(ExprRef),
    FuncDecl(Identifier, Rc<[Identifier]>, Rc<Block>),
    ClassDecl(ClassDecl),
    If(ExprRef, Block, Block),
    While(ExprRef, Block),
    /// `object.field = value;`
    Set(ExprRef, Identifier, ExprRef),
    /// `import a, b from Module;`
    Import(Identifier, Vec<Identifier>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Method {
    pub arg_names: Vec<Identifier>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: Identifier,
    /// An empty constructor when the class doesn't write one.
    pub constructor: Method,
    pub methods: Vec<(Identifier, Method)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub name: Identifier,
    pub body: Block,
    pub exports: Vec<Identifier>,
}

/// How a statement finished. `Return` unwinds every enclosing block up to the
/// function call (or module body) that is running it.
#[derive(Debug)]
pub enum Flow {
    Normal,
    Return(Val),
}

pub fn exec_block(stmts: &[Stmt], scope: &ScopeLink, program: &Program) -> Result<Flow, RuntimeError> {
    for stmt in stmts {
        if let Flow::Return(val) = stmt.exec(scope, program)? {
            return Ok(Flow::Return(val));
        }
    }
    Ok(Flow::Normal)
}

fn condition(cond: &ExprRef, scope: &ScopeLink, program: &Program) -> Result<bool, RuntimeError> {
    match cond.eval(scope, program)? {
        Val::Bool(b) => Ok(b),
        other => Err(RuntimeError::TypeMismatch {
            expected_types: vec![ValueKind::Boolean],
            actual_type: other.kind(),
        }),
    }
}

impl Stmt {
    pub fn exec(&self, scope: &ScopeLink, program: &Program) -> Result<Flow, RuntimeError> {
        match self {
            Self::Expr(expr) => {
                expr.eval(scope, program)?;
            }
            Self::VarDecl(id) => (**scope).borrow_mut().declare(id.clone()),
            Self::Assignment(id, val) => {
                let val = val.eval(scope, program)?;
                let cell = (**scope)
                    .borrow()
                    .lookup(id)
                    .ok_or_else(|| RuntimeError::NotInScope { identifier: id.clone() })?;
                *cell.borrow_mut() = Some(val);
            }
            Self::Return(Some(expr)) => return Ok(Flow::Return(expr.eval(scope, program)?)),
            Self::Return(None) => return Ok(Flow::Return(Val::Null)),
            Self::FuncDecl(id, args, body) => {
                let func = Func {
                    arg_names: args.clone(),
                    body: body.clone(),
                    scope: scope.clone(),
                };
                (**scope)
                    .borrow_mut()
                    .define(id.clone(), Val::Closure(Rc::new(func)));
            }
            Self::ClassDecl(class) => {
                debug!(class = %class.name, "class declarations have no runtime effect; skipping");
            }
            Self::If(cond, true_body, false_body) => {
                let body = if condition(cond, scope, program)? {
                    true_body
                } else {
                    false_body
                };
                return exec_block(body, &Scope::new_child(scope), program);
            }
            Self::While(cond, body) => {
                while condition(cond, scope, program)? {
                    if let Flow::Return(val) = exec_block(body, &Scope::new_child(scope), program)? {
                        return Ok(Flow::Return(val));
                    }
                }
            }
            Self::Set(target, field, val) => {
                let fields = match target.eval(scope, program)? {
                    Val::Object(fields) => fields,
                    other => return Err(RuntimeError::NotObject { actual_type: other.kind() }),
                };
                let val = val.eval(scope, program)?;
                fields.borrow_mut().insert(field.clone(), val);
            }
            Self::Import(module, names) => program.import(module, names, scope)?,
        }
        Ok(Flow::Normal)
    }
}
