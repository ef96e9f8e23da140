use crate::identifier::Identifier;
use crate::token::Token;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScanError {
    #[error("[line {line}] Invalid lexeme '{lexeme}'")]
    InvalidLexeme { line: usize, lexeme: String },
    #[error("[line {line}] Unterminated string")]
    UnterminatedString { line: usize },
}

struct Scanner<'a> {
    str: &'a [char],
    index: usize,
}

impl<'a> Scanner<'a> {
    fn advance(&mut self) -> Option<char> {
        self.index += 1;
        self.str.get(self.index - 1).copied()
    }

    // "match" is a keyword in the metalanguage already.
    fn match_next(&mut self, c: char) -> bool {
        let res = self.str.get(self.index).is_some_and(|d| c == *d);
        if res {
            self.index += 1;
        }
        res
    }

    fn peek(&self) -> Option<char> {
        self.str.get(self.index).copied()
    }

    fn peek_second(&self) -> Option<char> {
        self.str.get(self.index + 1).copied()
    }

    fn advance_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.index += 1;
        }
    }

    fn new(str: &'a [char]) -> Self {
        Self { index: 0, str }
    }

    fn index(&self) -> usize {
        self.index
    }
}

/// Turns module source text into tokens.
///
/// Scanning does not stop at the first bad lexeme: every invalid lexeme in the
/// source is reported.
pub fn scan(code: &str) -> Result<Vec<Token>, Vec<ScanError>> {
    let chars = code.chars().collect::<Vec<_>>();
    let mut scanner = Scanner::new(&chars);
    let mut result = vec![];
    let mut errors = vec![];
    let mut line: usize = 1;

    while let Some(c) = scanner.advance() {
        let tok = match c {
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            '{' => Token::LeftBrace,
            '}' => Token::RightBrace,
            ',' => Token::Comma,
            '.' => Token::Period,
            ':' => Token::Colon,
            ';' => Token::Semicolon,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Asterisk,
            '&' => Token::Ampersand,
            '|' => Token::VerticalBar,
            '!' => Token::ExclamationPoint,
            '/' => {
                if scanner.match_next('/') {
                    scanner.advance_while(|c| c != '\n');
                    continue;
                }
                if scanner.match_next('=') {
                    Token::NotEqual
                } else {
                    Token::ForwardSlash
                }
            }
            '=' => {
                if scanner.match_next('=') {
                    Token::DoubleEquals
                } else {
                    Token::SingleEquals
                }
            }
            '<' => {
                if scanner.match_next('=') {
                    Token::LessThanEquals
                } else {
                    Token::LessThan
                }
            }
            '>' => {
                if scanner.match_next('=') {
                    Token::GreaterThanEquals
                } else {
                    Token::GreaterThan
                }
            }
            '\n' => {
                line += 1;
                continue;
            }
            c if c.is_whitespace() => continue,
            '"' => {
                let start = scanner.index();
                scanner.advance_while(|c| c != '"');

                if scanner.peek().is_none() {
                    errors.push(ScanError::UnterminatedString { line });
                    continue;
                }

                let string = chars[start..scanner.index()].iter().collect::<String>();
                line += string.matches('\n').count();
                // Consume closing " after getting index
                scanner.advance();
                Token::String(string.into())
            }
            '0'..='9' => {
                let start = scanner.index() - 1;
                scanner.advance_while(|c| c.is_ascii_digit());
                // A period only belongs to the number if digits follow it: `1.field` is a get.
                if scanner.peek() == Some('.') && scanner.peek_second().is_some_and(|c| c.is_ascii_digit()) {
                    scanner.advance();
                    scanner.advance_while(|c| c.is_ascii_digit());
                }

                let lexeme = chars[start..scanner.index()].iter().collect::<String>();
                match lexeme.parse() {
                    Ok(num) => Token::Number(num),
                    Err(_) => {
                        errors.push(ScanError::InvalidLexeme { line, lexeme });
                        continue;
                    }
                }
            }
            c if c.is_ascii_alphabetic() => {
                let start = scanner.index() - 1;
                scanner.advance_while(|c| c.is_ascii_alphanumeric() || c == '_');

                let word = chars[start..scanner.index()].iter().collect::<String>();
                Token::from_keyword(&word).unwrap_or_else(|| Token::Identifier(Identifier::from(word)))
            }
            _ => {
                let start = scanner.index() - 1;
                scanner.advance_while(|c| !c.is_whitespace());
                let lexeme = chars[start..scanner.index()].iter().collect::<String>();
                errors.push(ScanError::InvalidLexeme { line, lexeme });
                continue;
            }
        };

        result.push(tok);
    }

    trace!(tokens = result.len(), errors = errors.len(), "scanned source");

    if errors.is_empty() {
        Ok(result)
    } else {
        Err(errors)
    }
}
