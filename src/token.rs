use crate::identifier::Identifier;
use std::{fmt, rc::Rc};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LeftBrace,
    RightBrace,
    LeftParen,
    RightParen,
    SingleEquals,
    DoubleEquals,
    NotEqual,
    Plus,
    Minus,
    Asterisk,
    ForwardSlash,
    Ampersand,
    VerticalBar,
    ExclamationPoint,
    LessThan,
    GreaterThan,
    LessThanEquals,
    GreaterThanEquals,
    Comma,
    Semicolon,
    Colon,
    Period,

    Module,
    Let,
    Function,
    Return,
    If,
    Else,
    While,
    Import,
    From,
    Export,
    Class,
    Constructor,
    This,
    Null,

    Number(f64),
    String(Rc<str>),
    Boolean(bool),
    Identifier(Identifier),
}

impl Token {
    /// Keyword spelling, if this token is a keyword.
    pub fn keyword(&self) -> Option<&'static str> {
        Some(match self {
            Self::Module => "module",
            Self::Let => "let",
            Self::Function => "function",
            Self::Return => "return",
            Self::If => "if",
            Self::Else => "else",
            Self::While => "while",
            Self::Import => "import",
            Self::From => "from",
            Self::Export => "export",
            Self::Class => "class",
            Self::Constructor => "constructor",
            Self::This => "this",
            Self::Null => "null",
            _ => return None,
        })
    }

    pub fn from_keyword(word: &str) -> Option<Token> {
        Some(match word {
            "module" => Self::Module,
            "let" => Self::Let,
            "function" => Self::Function,
            "return" => Self::Return,
            "if" => Self::If,
            "else" => Self::Else,
            "while" => Self::While,
            "import" => Self::Import,
            "from" => Self::From,
            "export" => Self::Export,
            "class" => Self::Class,
            "constructor" => Self::Constructor,
            "this" => Self::This,
            "null" => Self::Null,
            "true" => Self::Boolean(true),
            "false" => Self::Boolean(false),
            _ => return None,
        })
    }
}

// Parse errors quote tokens through this, e.g. `Expected "else"` or `Expected ;`.
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LeftBrace => write!(f, "{{"),
            Self::RightBrace => write!(f, "}}"),
            Self::LeftParen => write!(f, "("),
            Self::RightParen => write!(f, ")"),
            Self::SingleEquals => write!(f, "="),
            Self::DoubleEquals => write!(f, "=="),
            Self::NotEqual => write!(f, "/="),
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
            Self::Asterisk => write!(f, "*"),
            Self::ForwardSlash => write!(f, "/"),
            Self::Ampersand => write!(f, "&"),
            Self::VerticalBar => write!(f, "|"),
            Self::ExclamationPoint => write!(f, "!"),
            Self::LessThan => write!(f, "<"),
            Self::GreaterThan => write!(f, ">"),
            Self::LessThanEquals => write!(f, "<="),
            Self::GreaterThanEquals => write!(f, ">="),
            Self::Comma => write!(f, ","),
            Self::Semicolon => write!(f, ";"),
            Self::Colon => write!(f, ":"),
            Self::Period => write!(f, "."),
            Self::Number(x) => write!(f, "number {x}"),
            Self::String(x) => write!(f, "string \"{x}\""),
            Self::Boolean(x) => write!(f, "{x}"),
            Self::Identifier(id) => write!(f, "identifier {id}"),
            keyword => write!(f, "\"{}\"", keyword.keyword().unwrap_or_default()),
        }
    }
}
