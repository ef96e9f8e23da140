use pretty_assertions::assert_eq;
use quill::expr::{BinOp, Expr, ExprRef, UnaryOp};
use quill::parser::parse_module;
use quill::scanner::scan;
use quill::statement::{ClassDecl, Method, Module, Stmt};
use quill::token::Token;
use quill::Identifier;

fn id(name: &str) -> Identifier {
    Identifier::from(name)
}

fn var(name: &str) -> ExprRef {
    Box::new(Expr::Variable(id(name)))
}

fn num(x: f64) -> ExprRef {
    Box::new(Expr::NumberLit(x))
}

fn bin(op: BinOp, l: ExprRef, r: ExprRef) -> ExprRef {
    Box::new(Expr::Binary(op, l, r))
}

fn parse(source: &str) -> Module {
    let tokens = scan(source).unwrap();
    parse_module(&tokens).unwrap()
}

fn parse_err(source: &str) -> String {
    let tokens = scan(source).unwrap();
    parse_module(&tokens).unwrap_err().message
}

/// Parses `source` as the body of a module named `Test`.
fn body(source: &str) -> Vec<Stmt> {
    parse(&format!("module Test {{ {source} }}")).body
}

fn body_err(source: &str) -> String {
    parse_err(&format!("module Test {{ {source} }}"))
}

#[test]
fn empty_module() {
    assert_eq!(
        parse("module Main {}"),
        Module {
            name: id("Main"),
            body: vec![],
            exports: vec![],
        }
    );
}

#[test]
fn module_from_raw_tokens() {
    let tokens = [
        Token::Module,
        Token::Identifier(id("Main")),
        Token::LeftBrace,
        Token::Return,
        Token::Number(1.0),
        Token::Semicolon,
        Token::RightBrace,
    ];
    assert_eq!(
        parse_module(&tokens).unwrap().body,
        vec![Stmt::Return(Some(num(1.0)))]
    );
}

#[test]
fn exports_allow_trailing_comma() {
    let module = parse("module Lib { let a = 1; let b = 2; } export a, b,;");
    assert_eq!(module.exports, vec![id("a"), id("b")]);

    let module = parse("module Lib { let a = 1; } export a;");
    assert_eq!(module.exports, vec![id("a")]);
}

#[test]
fn let_with_and_without_value() {
    assert_eq!(body("let x;"), vec![Stmt::VarDecl(id("x"))]);
    assert_eq!(
        body("let x = 5;"),
        vec![Stmt::VarDecl(id("x")), Stmt::Assignment(id("x"), num(5.0))]
    );
}

#[test]
fn precedence_climbs_from_or_to_unary() {
    // a | b & c == 1 + 2 * -d
    let expected = bin(
        BinOp::Or,
        var("a"),
        bin(
            BinOp::And,
            var("b"),
            bin(
                BinOp::Equals,
                var("c"),
                bin(
                    BinOp::Add,
                    num(1.0),
                    bin(
                        BinOp::Multiply,
                        num(2.0),
                        Box::new(Expr::Unary(UnaryOp::Negative, var("d"))),
                    ),
                ),
            ),
        ),
    );
    assert_eq!(body("a | b & c == 1 + 2 * -d;"), vec![Stmt::Expr(expected)]);
}

#[test]
fn binary_operators_are_left_associative() {
    assert_eq!(
        body("1 - 2 - 3;"),
        vec![Stmt::Expr(bin(
            BinOp::Subtract,
            bin(BinOp::Subtract, num(1.0), num(2.0)),
            num(3.0)
        ))]
    );
    assert_eq!(
        body("a / b /= c;"),
        vec![Stmt::Expr(bin(
            BinOp::NotEqual,
            bin(BinOp::Divide, var("a"), var("b")),
            var("c")
        ))]
    );
}

#[test]
fn relational_binds_tighter_than_equality() {
    assert_eq!(
        body("a < b == c >= d;"),
        vec![Stmt::Expr(bin(
            BinOp::Equals,
            bin(BinOp::LessThan, var("a"), var("b")),
            bin(BinOp::GreaterThanEquals, var("c"), var("d"))
        ))]
    );
}

#[test]
fn parens_override_precedence() {
    assert_eq!(
        body("(1 + 2) * 3;"),
        vec![Stmt::Expr(bin(
            BinOp::Multiply,
            bin(BinOp::Add, num(1.0), num(2.0)),
            num(3.0)
        ))]
    );
}

#[test]
fn unary_nests() {
    assert_eq!(
        body("!!x;"),
        vec![Stmt::Expr(Box::new(Expr::Unary(
            UnaryOp::Not,
            Box::new(Expr::Unary(UnaryOp::Not, var("x")))
        )))]
    );
}

#[test]
fn calls_and_gets_chain() {
    // f(1, 2,).g()
    let call = Box::new(Expr::Call(var("f"), vec![Expr::NumberLit(1.0), Expr::NumberLit(2.0)]));
    let get = Box::new(Expr::Get(call, id("g")));
    assert_eq!(
        body("f(1, 2,).g();"),
        vec![Stmt::Expr(Box::new(Expr::Call(get, vec![])))]
    );
}

#[test]
fn object_literal_keeps_field_order() {
    assert_eq!(
        body("let o = { b: 1, a: \"x\", };"),
        vec![
            Stmt::VarDecl(id("o")),
            Stmt::Assignment(
                id("o"),
                Box::new(Expr::Object(vec![
                    (id("b"), Expr::NumberLit(1.0)),
                    (id("a"), Expr::StringLit("x".into())),
                ]))
            ),
        ]
    );
    assert_eq!(
        body("o = {};"),
        vec![Stmt::Assignment(id("o"), Box::new(Expr::Object(vec![])))]
    );
}

#[test]
fn literals() {
    assert_eq!(
        body("return null;"),
        vec![Stmt::Return(Some(Box::new(Expr::NullLit)))]
    );
    assert_eq!(
        body("return true;"),
        vec![Stmt::Return(Some(Box::new(Expr::BooleanLit(true))))]
    );
    assert_eq!(body("return;"), vec![Stmt::Return(None)]);
}

#[test]
fn setter_and_this() {
    assert_eq!(
        body("this.x = 1;"),
        vec![Stmt::Set(var("this"), id("x"), num(1.0))]
    );
    assert_eq!(
        body("a.b.c = d;"),
        vec![Stmt::Set(Box::new(Expr::Get(var("a"), id("b"))), id("c"), var("d"))]
    );
}

#[test]
fn else_if_nests_in_false_branch() {
    let inner = Stmt::If(var("b"), vec![Stmt::Return(Some(num(2.0)))], vec![]);
    assert_eq!(
        body("if (a) { return 1; } else if (b) { return 2; } else {}"),
        vec![Stmt::If(var("a"), vec![Stmt::Return(Some(num(1.0)))], vec![inner])]
    );
}

#[test]
fn while_and_function() {
    let stmts = body("function f(a, b) { while (a) { a = b; } }");
    assert_eq!(
        stmts,
        vec![Stmt::FuncDecl(
            id("f"),
            vec![id("a"), id("b")].into(),
            vec![Stmt::While(var("a"), vec![Stmt::Assignment(id("a"), var("b"))])].into()
        )]
    );
}

#[test]
fn import_statement() {
    assert_eq!(
        body("import print, clock from Native;"),
        vec![Stmt::Import(id("Native"), vec![id("print"), id("clock")])]
    );
}

#[test]
fn class_defaults_to_empty_constructor() {
    assert_eq!(
        body("class Point { norm() { return 1; } }"),
        vec![Stmt::ClassDecl(ClassDecl {
            name: id("Point"),
            constructor: Method::default(),
            methods: vec![(
                id("norm"),
                Method {
                    arg_names: vec![],
                    body: vec![Stmt::Return(Some(num(1.0)))],
                }
            )],
        })]
    );
}

#[test]
fn class_constructor_between_methods() {
    let stmts = body("class P { a() {} constructor(x) { this.x = x; } b(y) {} }");
    let [Stmt::ClassDecl(class)] = stmts.as_slice() else {
        panic!("expected a class declaration");
    };
    assert_eq!(class.constructor.arg_names, vec![id("x")]);
    assert_eq!(
        class.methods.iter().map(|(name, _)| name.clone()).collect::<Vec<_>>(),
        vec![id("a"), id("b")]
    );
}

#[test]
fn module_errors() {
    assert!(parse_err("Main {}").contains("Expected \"module\""));
    assert!(parse_err("module {}").contains("Expected identifier"));
    assert!(parse_err("module Main return").contains("Expected {"));
    assert!(parse_err("module Main {} export a").contains("Expected , or ;"));
    assert!(parse_err("module Main {} }").contains("Expected end of input"));
    assert_eq!(
        parse_err("module Main { let x = 1;"),
        "Expected start of statement or }, found end of input"
    );
}

#[test]
fn statement_errors() {
    assert!(body_err("let = 1;").contains("Expected identifier"));
    assert!(body_err("let x = 1").contains("Expected ;"));
    assert!(body_err("return 1 }").contains("Expected ;"));
    assert!(body_err("if (a) {}").contains("Expected \"else\""));
    assert!(body_err("if a {} else {}").contains("Expected ("));
    assert!(body_err("while (a {}").contains("Expected )"));
    assert!(body_err("function f(a b) {}").contains("Expected , or )"));
    assert!(body_err("function f(a, {}").contains("Expected )"));
    assert!(body_err("import a b from M;").contains("Expected , or \"from\""));
    assert!(body_err("import a from;").contains("Expected identifier"));
    assert!(body_err("this = 1;").contains("Expected ."));
}

#[test]
fn expression_statement_errors() {
    assert_eq!(body_err("x 1;"), "Expected = or ;, found number 1");
    assert!(body_err("a.b }").contains("Expected = or ;"));
    assert!(body_err("f() }").starts_with("Expected ;"));
    assert!(body_err("1 + 2 = 3;").contains("Expected ;, found ="));
    assert!(body_err("f() = 3;").contains("Expected ;"));
}

#[test]
fn expression_errors() {
    assert!(body_err("x = ;").contains("Expected identifier or literal"));
    assert!(body_err("x = (1;").contains("Expected )"));
    assert!(body_err("x = a.;").contains("Expected identifier"));
    assert!(body_err("x = { a 1 };").contains("Expected :"));
    assert!(body_err("x = { a: 1 b: 2 };").contains("Expected , or }"));
    assert!(body_err("f(1 2);").contains("Expected , or )"));
}

#[test]
fn class_errors() {
    assert!(body_err("class {}").contains("Expected identifier"));
    assert!(body_err("class A constructor").contains("Expected {"));
    assert!(body_err("class A { constructor {} }").contains("Expected ("));
    assert!(body_err("class A { m {} }").contains("Expected ("));
    assert!(body_err("class A { constructor() {} constructor() {} }")
        .contains("Expected at most one constructor"));
    assert!(body_err("class A { let }").contains("Expected }"));
}

#[test]
fn only_names_can_be_assigned_to() {
    assert_eq!(body_err("(x) = 1;"), "Expected ;, found =");
    assert_eq!(body_err("(a.b) = 1;"), "Expected ;, found =");
    assert_eq!(body_err("(x) 1;"), "Expected ;, found number 1");
    assert_eq!(body("(x);"), vec![Stmt::Expr(var("x"))]);
}

fn binop_token(op: BinOp) -> Token {
    match op {
        BinOp::Add => Token::Plus,
        BinOp::Subtract => Token::Minus,
        BinOp::Multiply => Token::Asterisk,
        BinOp::Divide => Token::ForwardSlash,
        BinOp::And => Token::Ampersand,
        BinOp::Or => Token::VerticalBar,
        BinOp::LessThan => Token::LessThan,
        BinOp::GreaterThan => Token::GreaterThan,
        BinOp::LessThanEquals => Token::LessThanEquals,
        BinOp::GreaterThanEquals => Token::GreaterThanEquals,
        BinOp::Equals => Token::DoubleEquals,
        BinOp::NotEqual => Token::NotEqual,
    }
}

fn name_token(name: &Identifier) -> Token {
    if name.as_str() == "this" {
        Token::This
    } else {
        Token::Identifier(name.clone())
    }
}

fn list_tokens<T>(items: &[T], out: &mut Vec<Token>, mut item: impl FnMut(&T, &mut Vec<Token>)) {
    for (i, x) in items.iter().enumerate() {
        if i > 0 {
            out.push(Token::Comma);
        }
        item(x, out);
    }
}

fn names_tokens(names: &[Identifier], out: &mut Vec<Token>) {
    list_tokens(names, out, |name, out| out.push(Token::Identifier(name.clone())));
}

/// Writes `expr` back out as tokens. Operators are fully parenthesized, which
/// the parser drops again.
fn expr_tokens(expr: &Expr, out: &mut Vec<Token>) {
    match expr {
        Expr::NumberLit(x) => out.push(Token::Number(*x)),
        Expr::StringLit(s) => out.push(Token::String(s.clone())),
        Expr::BooleanLit(b) => out.push(Token::Boolean(*b)),
        Expr::NullLit => out.push(Token::Null),
        Expr::Variable(name) => out.push(name_token(name)),
        Expr::Unary(op, operand) => {
            out.push(Token::LeftParen);
            out.push(match op {
                UnaryOp::Negative => Token::Minus,
                UnaryOp::Not => Token::ExclamationPoint,
            });
            expr_tokens(operand, out);
            out.push(Token::RightParen);
        }
        Expr::Binary(op, l, r) => {
            out.push(Token::LeftParen);
            expr_tokens(l, out);
            out.push(binop_token(*op));
            expr_tokens(r, out);
            out.push(Token::RightParen);
        }
        Expr::Call(callee, args) => {
            expr_tokens(callee, out);
            out.push(Token::LeftParen);
            list_tokens(args, out, expr_tokens);
            out.push(Token::RightParen);
        }
        Expr::Object(fields) => {
            out.push(Token::LeftBrace);
            list_tokens(fields, out, |(name, value), out| {
                out.push(Token::Identifier(name.clone()));
                out.push(Token::Colon);
                expr_tokens(value, out);
            });
            out.push(Token::RightBrace);
        }
        Expr::Get(target, field) => {
            expr_tokens(target, out);
            out.push(Token::Period);
            out.push(Token::Identifier(field.clone()));
        }
    }
}

fn block_tokens(block: &[Stmt], out: &mut Vec<Token>) {
    out.push(Token::LeftBrace);
    for stmt in block {
        stmt_tokens(stmt, out);
    }
    out.push(Token::RightBrace);
}

fn method_tokens(method: &Method, out: &mut Vec<Token>) {
    out.push(Token::LeftParen);
    names_tokens(&method.arg_names, out);
    out.push(Token::RightParen);
    block_tokens(&method.body, out);
}

fn stmt_tokens(stmt: &Stmt, out: &mut Vec<Token>) {
    match stmt {
        Stmt::VarDecl(name) => {
            out.extend([Token::Let, Token::Identifier(name.clone()), Token::Semicolon]);
        }
        Stmt::Assignment(name, value) => {
            out.extend([Token::Identifier(name.clone()), Token::SingleEquals]);
            expr_tokens(value, out);
            out.push(Token::Semicolon);
        }
        Stmt::Return(value) => {
            out.push(Token::Return);
            if let Some(value) = value {
                expr_tokens(value, out);
            }
            out.push(Token::Semicolon);
        }
        Stmt::Expr(expr) => {
            expr_tokens(expr, out);
            out.push(Token::Semicolon);
        }
        Stmt::FuncDecl(name, args, body) => {
            out.extend([Token::Function, Token::Identifier(name.clone()), Token::LeftParen]);
            names_tokens(args, out);
            out.push(Token::RightParen);
            block_tokens(body, out);
        }
        Stmt::ClassDecl(class) => {
            out.extend([Token::Class, Token::Identifier(class.name.clone()), Token::LeftBrace]);
            out.push(Token::Constructor);
            method_tokens(&class.constructor, out);
            for (name, method) in &class.methods {
                out.push(Token::Identifier(name.clone()));
                method_tokens(method, out);
            }
            out.push(Token::RightBrace);
        }
        Stmt::If(cond, true_body, false_body) => {
            out.extend([Token::If, Token::LeftParen]);
            expr_tokens(cond, out);
            out.push(Token::RightParen);
            block_tokens(true_body, out);
            out.push(Token::Else);
            block_tokens(false_body, out);
        }
        Stmt::While(cond, body) => {
            out.extend([Token::While, Token::LeftParen]);
            expr_tokens(cond, out);
            out.push(Token::RightParen);
            block_tokens(body, out);
        }
        Stmt::Set(target, field, value) => {
            expr_tokens(target, out);
            out.extend([Token::Period, Token::Identifier(field.clone()), Token::SingleEquals]);
            expr_tokens(value, out);
            out.push(Token::Semicolon);
        }
        Stmt::Import(module, names) => {
            out.push(Token::Import);
            names_tokens(names, out);
            out.extend([Token::From, Token::Identifier(module.clone()), Token::Semicolon]);
        }
    }
}

fn module_tokens(module: &Module) -> Vec<Token> {
    let mut out = vec![Token::Module, Token::Identifier(module.name.clone())];
    block_tokens(&module.body, &mut out);
    if !module.exports.is_empty() {
        out.push(Token::Export);
        names_tokens(&module.exports, &mut out);
        out.push(Token::Semicolon);
    }
    out
}

#[test]
fn parsed_modules_survive_a_trip_through_tokens() {
    let sources = [
        "module Main { return a | b & c == 1 + 2 * -d; }",
        "module Main { return (1 - 2 - 3) / 4 /= !x <= y; }",
        "module Main { f(1, \"two\", null)(true).g.h(); }",
        "module Main { let o = { a: { b: 1 }, c: this.x, }; o.a.b = -o.c; }",
        "module Main {
            import print, clock from Native;
            let x;
            x = 3;
            function f(a, b) {
                while (a < b) { a = a + 1; }
                return;
            }
            if (x > 1) { return f(x, 10); }
            else if (x == 0) { this.x = 1; }
            else {}
        }",
        "module Lib {
            class Point {
                norm() { return this.x * this.x; }
                constructor(x) { this.x = x; }
                scale(k) { this.x = this.x * k; }
            }
            class Empty {}
        } export Point, Empty;",
    ];
    for source in sources {
        let module = parse(source);
        let tokens = module_tokens(&module);
        assert_eq!(parse_module(&tokens).unwrap(), module, "{source}");
    }
}
