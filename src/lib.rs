pub mod expr;
pub mod identifier;
pub mod interpreter;
pub mod native;
pub mod parser;
pub mod scanner;
pub mod scope;
pub mod statement;
pub mod token;
pub mod value;

pub use expr::RuntimeError;
pub use identifier::Identifier;
pub use interpreter::{evaluate_program, InterpretErr, Interpreter};
pub use native::NativeFunctions;
pub use parser::{parse_module, ParseError};
pub use value::{Val, ValueKind};
