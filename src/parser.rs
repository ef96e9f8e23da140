use crate::expr::*;
use crate::identifier::Identifier;
use crate::statement::{Block, ClassDecl, Method, Module, Stmt};
use crate::token::*;

use std::fmt;
use thiserror::Error;
use tracing::debug;

type ExprResult = Result<ExprRef, ParseError>;

/// The first thing the parser could not make sense of. Parsing stops there.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    fn expected(what: impl fmt::Display, found: Option<&Token>) -> Self {
        let message = match found {
            Some(tok) => format!("Expected {what}, found {tok}"),
            None => format!("Expected {what}, found end of input"),
        };
        ParseError { message }
    }
}

/// Tokens that can begin an expression.
fn starts_expression(tok: &Token) -> bool {
    matches!(
        tok,
        Token::Number(_)
            | Token::String(_)
            | Token::Boolean(_)
            | Token::Null
            | Token::Identifier(_)
            | Token::This
            | Token::LeftParen
            | Token::LeftBrace
            | Token::Minus
            | Token::ExclamationPoint
    )
}

fn is_identifier(tok: &Token) -> bool {
    matches!(tok, Token::Identifier(_))
}

pub struct Parser<'a> {
    tokens: &'a [Token],
    index: usize,
}

impl<'a> Parser<'a> {
    fn has_next(&self) -> bool {
        self.index < self.tokens.len()
    }

    fn match_next_lits<const N: usize>(&mut self, ttypes: [Token; N]) -> Option<Token> {
        let tok = self.tokens.get(self.index)?;
        let res = ttypes.iter().any(|x| x == tok);
        if res {
            self.index += 1;
            return Some(tok.clone());
        }
        None
    }

    fn match_next(&mut self, tok: &Token) -> bool {
        if self.check(tok) {
            self.index += 1;
            return true;
        }
        false
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.index)
    }

    fn peek_second(&self) -> Option<&'a Token> {
        self.tokens.get(self.index + 1)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.index);
        if tok.is_some() {
            self.index += 1;
        }
        tok
    }

    fn check(&self, tok: &Token) -> bool {
        self.peek() == Some(tok)
    }

    fn error(&self, what: impl fmt::Display) -> ParseError {
        ParseError::expected(what, self.peek())
    }

    fn consume(&mut self, tok: &Token) -> Result<(), ParseError> {
        if !self.match_next(tok) {
            return Err(self.error(tok));
        }
        Ok(())
    }

    fn consume_identifier(&mut self) -> Result<Identifier, ParseError> {
        match self.peek() {
            Some(Token::Identifier(id)) => {
                self.index += 1;
                Ok(id.clone())
            }
            _ => Err(self.error("identifier")),
        }
    }

    /// `item (, item)*` up to and including `closing`. A trailing comma is
    /// allowed; an empty list is just `closing`.
    fn separated<T>(
        &mut self,
        closing: &Token,
        starts_item: fn(&Token) -> bool,
        mut item: impl FnMut(&mut Self) -> Result<T, ParseError>,
    ) -> Result<Vec<T>, ParseError> {
        let mut items = vec![];
        while self.peek().is_some_and(starts_item) {
            items.push(item(self)?);
            if !self.match_next(&Token::Comma) {
                if self.check(closing) {
                    break;
                }
                return Err(self.error(format!(", or {closing}")));
            }
        }
        self.consume(closing)?;
        Ok(items)
    }

    fn identifier_list(&mut self, closing: &Token) -> Result<Vec<Identifier>, ParseError> {
        self.separated(closing, is_identifier, Self::consume_identifier)
    }

    pub fn new(tokens: &'a [Token]) -> Self {
        Parser { index: 0, tokens }
    }

    // Parsing the actual grammar.
    pub fn parse(&mut self) -> Result<Module, ParseError> {
        self.consume(&Token::Module)?;
        let name = self.consume_identifier()?;
        let body = self.block()?;

        let exports = if self.match_next(&Token::Export) {
            self.identifier_list(&Token::Semicolon)?
        } else {
            vec![]
        };

        if self.has_next() {
            return Err(self.error("end of input"));
        }

        debug!(module = %name, statements = body.len(), exports = exports.len(), "parsed module");
        Ok(Module { name, body, exports })
    }

    fn block(&mut self) -> Result<Block, ParseError> {
        self.consume(&Token::LeftBrace)?;
        let mut res = vec![];
        loop {
            match self.peek() {
                Some(Token::RightBrace) => break,
                Some(_) => self.statement(&mut res)?,
                None => return Err(self.error("start of statement or }")),
            }
        }
        self.consume(&Token::RightBrace)?;
        Ok(res)
    }

    /// Parses one statement into `out`. `let x = e;` produces two.
    fn statement(&mut self, out: &mut Block) -> Result<(), ParseError> {
        let stmt = if self.match_next(&Token::Let) {
            let id = self.consume_identifier()?;
            out.push(Stmt::VarDecl(id.clone()));
            if !self.match_next(&Token::SingleEquals) {
                self.consume(&Token::Semicolon)?;
                return Ok(());
            }
            let value = self.expression()?;
            self.consume(&Token::Semicolon)?;
            Stmt::Assignment(id, value)
        } else if self.match_next(&Token::Return) {
            self.return_statement()?
        } else if self.match_next(&Token::If) {
            self.if_statement()?
        } else if self.match_next(&Token::While) {
            self.while_statement()?
        } else if self.match_next(&Token::Function) {
            self.function()?
        } else if self.match_next(&Token::Class) {
            self.class()?
        } else if self.match_next(&Token::Import) {
            self.import_statement()?
        } else {
            if self.check(&Token::This) && self.peek_second() != Some(&Token::Period) {
                self.advance();
                return Err(self.error(Token::Period));
            }
            self.expression_statement()?
        };
        out.push(stmt);
        Ok(())
    }

    fn return_statement(&mut self) -> Result<Stmt, ParseError> {
        let val = if !self.check(&Token::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(&Token::Semicolon)?;

        Ok(Stmt::Return(val))
    }

    fn parenthesized(&mut self) -> ExprResult {
        self.consume(&Token::LeftParen)?;
        let cond = self.expression()?;
        self.consume(&Token::RightParen)?;
        Ok(cond)
    }

    fn if_statement(&mut self) -> Result<Stmt, ParseError> {
        let cond = self.parenthesized()?;
        let true_body = self.block()?;
        self.consume(&Token::Else)?;
        let false_body = if self.match_next(&Token::If) {
            vec![self.if_statement()?]
        } else {
            self.block()?
        };
        Ok(Stmt::If(cond, true_body, false_body))
    }

    fn while_statement(&mut self) -> Result<Stmt, ParseError> {
        let cond = self.parenthesized()?;
        let body = self.block()?;
        Ok(Stmt::While(cond, body))
    }

    /// `( a, b )` followed by a block.
    fn params_and_body(&mut self) -> Result<Method, ParseError> {
        self.consume(&Token::LeftParen)?;
        let arg_names = self.identifier_list(&Token::RightParen)?;
        let body = self.block()?;
        Ok(Method { arg_names, body })
    }

    fn function(&mut self) -> Result<Stmt, ParseError> {
        let id = self.consume_identifier()?;
        let Method { arg_names, body } = self.params_and_body()?;
        Ok(Stmt::FuncDecl(id, arg_names.into(), body.into()))
    }

    fn class(&mut self) -> Result<Stmt, ParseError> {
        let name = self.consume_identifier()?;
        self.consume(&Token::LeftBrace)?;

        let mut constructor = None;
        let mut methods = vec![];
        loop {
            match self.peek() {
                Some(Token::RightBrace) => break,
                Some(Token::Constructor) => {
                    if constructor.is_some() {
                        return Err(self.error("at most one constructor"));
                    }
                    self.advance();
                    constructor = Some(self.params_and_body()?);
                }
                Some(Token::Identifier(_)) => {
                    let method_name = self.consume_identifier()?;
                    methods.push((method_name, self.params_and_body()?));
                }
                _ => return Err(self.error("} or class member")),
            }
        }
        self.consume(&Token::RightBrace)?;

        Ok(Stmt::ClassDecl(ClassDecl {
            name,
            constructor: constructor.unwrap_or_default(),
            methods,
        }))
    }

    fn import_statement(&mut self) -> Result<Stmt, ParseError> {
        let names = self.identifier_list(&Token::From)?;
        let module = self.consume_identifier()?;
        self.consume(&Token::Semicolon)?;
        Ok(Stmt::Import(module, names))
    }

    /// Expression statements, assignments (`x = e;`) and setters (`a.b.c = e;`)
    /// all start with an expression; a following `=` decides which it is.
    /// Only a statement that starts with a name can be assigned to, so `(x) = e;`
    /// is rejected.
    fn expression_statement(&mut self) -> Result<Stmt, ParseError> {
        let starts_with_name = matches!(self.peek(), Some(Token::Identifier(_) | Token::This));
        let target = self.expression()?;
        let assignable = starts_with_name && matches!(*target, Expr::Variable(_) | Expr::Get(..));

        if assignable && self.match_next(&Token::SingleEquals) {
            let stmt = match *target {
                Expr::Variable(id) => Stmt::Assignment(id, self.expression()?),
                Expr::Get(object, field) => Stmt::Set(object, field, self.expression()?),
                _ => return Err(self.error(Token::Semicolon)),
            };
            self.consume(&Token::Semicolon)?;
            return Ok(stmt);
        }

        if !self.match_next(&Token::Semicolon) {
            return Err(if assignable {
                self.error("= or ;")
            } else {
                self.error(Token::Semicolon)
            });
        }
        Ok(Stmt::Expr(target))
    }

    fn expression(&mut self) -> ExprResult {
        self.logic_or()
    }

    fn logic_or(&mut self) -> ExprResult {
        let mut expr = self.logic_and()?;

        while self.match_next(&Token::VerticalBar) {
            let right = self.logic_and()?;
            expr = Box::new(Expr::Binary(BinOp::Or, expr, right));
        }

        Ok(expr)
    }

    fn logic_and(&mut self) -> ExprResult {
        let mut expr = self.equality()?;

        while self.match_next(&Token::Ampersand) {
            let right = self.equality()?;
            expr = Box::new(Expr::Binary(BinOp::And, expr, right));
        }

        Ok(expr)
    }

    fn equality(&mut self) -> ExprResult {
        let mut expr = self.comparison()?;

        while let Some(op) = self.match_next_lits([Token::DoubleEquals, Token::NotEqual]) {
            let op = if op == Token::DoubleEquals {
                BinOp::Equals
            } else {
                BinOp::NotEqual
            };
            let right = self.comparison()?;
            expr = Box::new(Expr::Binary(op, expr, right));
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> ExprResult {
        let mut expr = self.term()?;
        while let Some(op) = self.match_next_lits([
            Token::GreaterThan,
            Token::GreaterThanEquals,
            Token::LessThan,
            Token::LessThanEquals,
        ]) {
            let op = match op {
                Token::GreaterThan => BinOp::GreaterThan,
                Token::GreaterThanEquals => BinOp::GreaterThanEquals,
                Token::LessThan => BinOp::LessThan,
                _ => BinOp::LessThanEquals,
            };
            let right = self.term()?;
            expr = Box::new(Expr::Binary(op, expr, right));
        }

        Ok(expr)
    }

    fn term(&mut self) -> ExprResult {
        let mut expr = self.factor()?;

        while let Some(op) = self.match_next_lits([Token::Plus, Token::Minus]) {
            let op = if op == Token::Plus {
                BinOp::Add
            } else {
                BinOp::Subtract
            };
            let right = self.factor()?;
            expr = Box::new(Expr::Binary(op, expr, right));
        }

        Ok(expr)
    }

    fn factor(&mut self) -> ExprResult {
        let mut expr = self.unary()?;

        while let Some(op) = self.match_next_lits([Token::Asterisk, Token::ForwardSlash]) {
            let op = if op == Token::Asterisk {
                BinOp::Multiply
            } else {
                BinOp::Divide
            };
            let right = self.unary()?;
            expr = Box::new(Expr::Binary(op, expr, right));
        }

        Ok(expr)
    }

    fn unary(&mut self) -> ExprResult {
        if self.match_next(&Token::ExclamationPoint) {
            Ok(Box::new(Expr::Unary(UnaryOp::Not, self.unary()?)))
        } else if self.match_next(&Token::Minus) {
            Ok(Box::new(Expr::Unary(UnaryOp::Negative, self.unary()?)))
        } else {
            self.call()
        }
    }

    fn call(&mut self) -> ExprResult {
        let mut expr = self.primary()?;
        loop {
            if self.match_next(&Token::LeftParen) {
                let args = self.separated(&Token::RightParen, starts_expression, |p| {
                    p.expression().map(|arg| *arg)
                })?;
                expr = Box::new(Expr::Call(expr, args));
            } else if self.match_next(&Token::Period) {
                let field = self.consume_identifier()?;
                expr = Box::new(Expr::Get(expr, field));
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn object_field(&mut self) -> Result<(Identifier, Expr), ParseError> {
        let name = self.consume_identifier()?;
        self.consume(&Token::Colon)?;
        Ok((name, *self.expression()?))
    }

    fn primary(&mut self) -> ExprResult {
        let res = match self.peek() {
            Some(Token::Number(x)) => Expr::NumberLit(*x),
            Some(Token::String(x)) => Expr::StringLit(x.clone()),
            Some(Token::Boolean(x)) => Expr::BooleanLit(*x),
            Some(Token::Null) => Expr::NullLit,
            Some(Token::Identifier(x)) => Expr::Variable(x.clone()),
            // `this` is an ordinary variable as far as the parser is concerned.
            Some(Token::This) => Expr::Variable(Identifier::from("this")),
            Some(Token::LeftParen) => return self.parenthesized(),
            Some(Token::LeftBrace) => {
                self.advance();
                let fields = self.separated(&Token::RightBrace, is_identifier, Self::object_field)?;
                return Ok(Box::new(Expr::Object(fields)));
            }
            _ => return Err(self.error("identifier or literal")),
        };
        self.advance();

        Ok(Box::new(res))
    }
}

/// Parses the tokens of one module source. All tokens must be consumed.
pub fn parse_module(tokens: &[Token]) -> Result<Module, ParseError> {
    Parser::new(tokens).parse()
}
