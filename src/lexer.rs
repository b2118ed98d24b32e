//! Lexical analysis for ICSS source code

use crate::error::{CompilerError, Result};
use regex::Regex;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    // Keywords
    If,
    Else,

    // Operators and punctuation
    LeftBrace,    // {
    RightBrace,   // }
    LeftBracket,  // [
    RightBracket, // ]
    Colon,        // :
    Assign,       // :=
    Semicolon,    // ;
    Comma,        // ,
    Plus,         // +
    Minus,        // -
    Star,         // *

    // Literals
    Pixel(i64),
    Percentage(i64),
    Scalar(i64),
    Color(String), // #rrggbb
    Boolean(bool),

    // Names
    Identifier(String),
    ClassSelector(String), // .name
    IdSelector(String),    // #name

    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub line: usize,
    pub column: usize,
    pub filename: String,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::If => write!(f, "if"),
            TokenType::Else => write!(f, "else"),
            TokenType::LeftBrace => write!(f, "{{"),
            TokenType::RightBrace => write!(f, "}}"),
            TokenType::LeftBracket => write!(f, "["),
            TokenType::RightBracket => write!(f, "]"),
            TokenType::Colon => write!(f, ":"),
            TokenType::Assign => write!(f, ":="),
            TokenType::Semicolon => write!(f, ";"),
            TokenType::Comma => write!(f, ","),
            TokenType::Plus => write!(f, "+"),
            TokenType::Minus => write!(f, "-"),
            TokenType::Star => write!(f, "*"),
            TokenType::Pixel(n) => write!(f, "pixel({}px)", n),
            TokenType::Percentage(n) => write!(f, "percentage({}%)", n),
            TokenType::Scalar(n) => write!(f, "scalar({})", n),
            TokenType::Color(c) => write!(f, "color({})", c),
            TokenType::Boolean(b) => write!(f, "boolean({})", if *b { "TRUE" } else { "FALSE" }),
            TokenType::Identifier(id) => write!(f, "identifier({})", id),
            TokenType::ClassSelector(name) => write!(f, "class(.{})", name),
            TokenType::IdSelector(name) => write!(f, "id(#{})", name),
            TokenType::Eof => write!(f, "EOF"),
        }
    }
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    filename: String,

    color_regex: Regex,
}

impl Lexer {
    pub fn new(input: &str, filename: impl Into<String>) -> Result<Self> {
        let filename = filename.into();
        let color_regex = Regex::new(r"^#[0-9A-Fa-f]{6}$")
            .map_err(|e| CompilerError::parse(filename.clone(), 0, format!("Regex error: {}", e)))?;

        Ok(Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            filename,
            color_regex,
        })
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            self.skip_trivia()?;
            if self.is_at_end() {
                break;
            }
            tokens.push(self.next_token()?);
        }

        tokens.push(Token {
            token_type: TokenType::Eof,
            line: self.line,
            column: self.column,
            filename: self.filename.clone(),
        });

        log::trace!("{}: {} tokens", self.filename, tokens.len());
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token> {
        let start_line = self.line;
        let start_column = self.column;
        let ch = self.advance();

        let token_type = match ch {
            '{' => TokenType::LeftBrace,
            '}' => TokenType::RightBrace,
            '[' => TokenType::LeftBracket,
            ']' => TokenType::RightBracket,
            ';' => TokenType::Semicolon,
            ',' => TokenType::Comma,
            '+' => TokenType::Plus,
            '-' => TokenType::Minus,
            '*' => TokenType::Star,
            ':' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenType::Assign
                } else {
                    TokenType::Colon
                }
            }
            '.' => {
                if !self.peek().map_or(false, is_name_start) {
                    return Err(self.error("Expected class name after '.'"));
                }
                TokenType::ClassSelector(self.read_name(String::new(), true))
            }
            '#' => {
                let text = self.read_name(String::from("#"), true);
                if self.color_regex.is_match(&text) {
                    TokenType::Color(text)
                } else if text.len() > 1 {
                    TokenType::IdSelector(text[1..].to_string())
                } else {
                    return Err(self.error("Expected color or id after '#'"));
                }
            }
            ch if ch.is_ascii_digit() => self.read_number(ch)?,
            ch if is_name_start(ch) => {
                let identifier = self.read_name(ch.to_string(), false);
                match identifier.as_str() {
                    "if" => TokenType::If,
                    "else" => TokenType::Else,
                    "TRUE" => TokenType::Boolean(true),
                    "FALSE" => TokenType::Boolean(false),
                    _ => TokenType::Identifier(identifier),
                }
            }
            _ => {
                return Err(self.error(format!("Unexpected character: '{}'", ch)));
            }
        };

        Ok(Token {
            token_type,
            line: start_line,
            column: start_column,
            filename: self.filename.clone(),
        })
    }

    /// Whitespace, `// line` comments and `/* block */` comments
    fn skip_trivia(&mut self) -> Result<()> {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '/' && self.peek_next() == Some('/') {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else if ch == '/' && self.peek_next() == Some('*') {
                let start_line = self.line;
                self.advance();
                self.advance();
                loop {
                    match self.peek() {
                        None => {
                            return Err(CompilerError::parse(
                                self.filename.clone(),
                                start_line,
                                "Unterminated block comment",
                            ))
                        }
                        Some('*') if self.peek_next() == Some('/') => {
                            self.advance();
                            self.advance();
                            break;
                        }
                        Some(_) => {
                            self.advance();
                        }
                    }
                }
            } else {
                break;
            }
        }
        Ok(())
    }

    /// Selector names take every `-`. Inside an identifier a `-` must be
    /// followed by a letter, so `Gap-2px` lexes as a subtraction.
    fn read_name(&mut self, mut name: String, selector: bool) -> String {
        while let Some(ch) = self.peek() {
            let dash = ch == '-' && (selector || self.peek_next().map_or(false, |c| c.is_ascii_alphabetic()));
            if ch.is_ascii_alphanumeric() || ch == '_' || dash {
                name.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        name
    }

    fn read_number(&mut self, first: char) -> Result<TokenType> {
        let mut digits = String::from(first);
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let value: i64 = digits
            .parse()
            .map_err(|_| self.error(format!("Invalid number: {}", digits)))?;

        if self.peek() == Some('p') && self.peek_next() == Some('x') {
            self.advance();
            self.advance();
            Ok(TokenType::Pixel(value))
        } else if self.peek() == Some('%') {
            self.advance();
            Ok(TokenType::Percentage(value))
        } else {
            Ok(TokenType::Scalar(value))
        }
    }

    fn advance(&mut self) -> char {
        if self.position < self.input.len() {
            let ch = self.input[self.position];
            self.position += 1;
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            ch
        } else {
            '\0'
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn error(&self, message: impl Into<String>) -> CompilerError {
        CompilerError::parse(self.filename.clone(), self.line, message)
    }
}

fn is_name_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

/// Whether `name` lexes as exactly one identifier token
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !is_name_start(first) || matches!(name, "if" | "else" | "TRUE" | "FALSE") {
        return false;
    }
    let mut chars = chars.peekable();
    while let Some(c) = chars.next() {
        let dash = c == '-' && chars.peek().map_or(false, |next| next.is_ascii_alphabetic());
        if !(c.is_ascii_alphanumeric() || c == '_' || dash) {
            return false;
        }
    }
    true
}
