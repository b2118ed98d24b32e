//! Recursive descent parser for the ICSS language
//!
//! Builds the AST straight from the token stream and hands every node a fresh
//! [`NodeId`]. The parser stops at the first syntax error; semantic problems
//! are left to the checker.

use crate::ast::*;
use crate::diagnostics::{NodeId, Span};
use crate::error::{CompilerError, Result};
use crate::lexer::{Lexer, Token, TokenType};

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    next_id: u32,
}

impl Parser {
    /// The stream is closed with `Eof` if the caller did not supply one
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last(), Some(token) if token.token_type == TokenType::Eof) {
            let eof = match tokens.last() {
                Some(last) => Token {
                    token_type: TokenType::Eof,
                    line: last.line,
                    column: last.column,
                    filename: last.filename.clone(),
                },
                None => Token {
                    token_type: TokenType::Eof,
                    line: 1,
                    column: 1,
                    filename: String::from("<input>"),
                },
            };
            tokens.push(eof);
        }

        Self {
            tokens,
            current: 0,
            next_id: 0,
        }
    }

    pub fn parse(&mut self) -> Result<Stylesheet> {
        let mut items = Vec::new();

        while !self.is_at_end() {
            if self.is_assignment_start() {
                items.push(Node::Assignment(self.parse_assignment()?));
            } else if self.is_selector_start() {
                items.push(Node::Rule(self.parse_rule()?));
            } else {
                return Err(self.error(format!(
                    "Expected style rule or variable assignment, got {}",
                    self.peek().token_type
                )));
            }
        }

        Ok(Stylesheet::new(items))
    }

    fn parse_rule(&mut self) -> Result<StyleRule> {
        let span = self.span();
        let mut selectors = vec![self.parse_selector()?];
        while self.match_token(&TokenType::Comma) {
            selectors.push(self.parse_selector()?);
        }

        self.consume(TokenType::LeftBrace, "Expected '{' after selector")?;
        let body = self.parse_body()?;
        self.consume(TokenType::RightBrace, "Expected '}' to close style rule")?;

        Ok(StyleRule {
            id: self.fresh_id(),
            span,
            selectors,
            body,
        })
    }

    fn parse_selector(&mut self) -> Result<Selector> {
        let selector = match &self.peek().token_type {
            TokenType::Identifier(tag) => Selector::Tag(tag.clone()),
            TokenType::ClassSelector(class) => Selector::Class(class.clone()),
            TokenType::IdSelector(id) => Selector::Id(id.clone()),
            // `#abcdef` lexes as a color but is a valid id in selector position
            TokenType::Color(code) => Selector::Id(code.trim_start_matches('#').to_string()),
            other => return Err(self.error(format!("Expected selector, got {}", other))),
        };
        self.advance();
        Ok(selector)
    }

    /// Statements up to (not including) the closing `}`
    fn parse_body(&mut self) -> Result<Vec<Node>> {
        let mut body = Vec::new();

        while !self.check(&TokenType::RightBrace) && !self.is_at_end() {
            let node = match self.peek().token_type.clone() {
                TokenType::If => Node::If(self.parse_if()?),
                TokenType::Identifier(_) if self.check_next(&TokenType::Assign) => {
                    Node::Assignment(self.parse_assignment()?)
                }
                TokenType::Identifier(_) => Node::Declaration(self.parse_declaration()?),
                other => {
                    return Err(self.error(format!(
                        "Expected declaration, assignment or if-clause, got {}",
                        other
                    )))
                }
            };
            body.push(node);
        }

        Ok(body)
    }

    fn parse_declaration(&mut self) -> Result<Declaration> {
        let span = self.span();
        let property = self.consume_identifier("Expected property name")?;
        self.consume(TokenType::Colon, "Expected ':' after property name")?;
        let expression = self.parse_expression()?;
        self.consume(TokenType::Semicolon, "Expected ';' after declaration")?;

        Ok(Declaration {
            id: self.fresh_id(),
            span,
            property,
            expression,
        })
    }

    fn parse_assignment(&mut self) -> Result<VariableAssignment> {
        let span = self.span();
        let name = self.consume_identifier("Expected variable name")?;
        self.consume(TokenType::Assign, "Expected ':=' after variable name")?;
        let expression = self.parse_expression()?;
        self.consume(TokenType::Semicolon, "Expected ';' after variable assignment")?;

        Ok(VariableAssignment {
            id: self.fresh_id(),
            span,
            name,
            expression,
        })
    }

    fn parse_if(&mut self) -> Result<IfClause> {
        let span = self.span();
        self.consume(TokenType::If, "Expected 'if'")?;
        self.consume(TokenType::LeftBracket, "Expected '[' after 'if'")?;
        let condition = self.parse_expression()?;
        self.consume(TokenType::RightBracket, "Expected ']' after if-condition")?;

        self.consume(TokenType::LeftBrace, "Expected '{' to open if-body")?;
        let body = self.parse_body()?;
        self.consume(TokenType::RightBrace, "Expected '}' to close if-body")?;

        let else_body = if self.match_token(&TokenType::Else) {
            self.consume(TokenType::LeftBrace, "Expected '{' after 'else'")?;
            let else_body = self.parse_body()?;
            self.consume(TokenType::RightBrace, "Expected '}' to close else-body")?;
            Some(else_body)
        } else {
            None
        };

        Ok(IfClause {
            id: self.fresh_id(),
            span,
            condition,
            body,
            else_body,
        })
    }

    /// expression := term (('+' | '-') term)*
    fn parse_expression(&mut self) -> Result<Expression> {
        let mut lhs = self.parse_term()?;

        loop {
            let op = match self.peek().token_type {
                TokenType::Plus => Operator::Add,
                TokenType::Minus => Operator::Subtract,
                _ => break,
            };
            let span = self.span();
            self.advance();
            let rhs = self.parse_term()?;
            lhs = self.operation(span, op, lhs, rhs);
        }

        Ok(lhs)
    }

    /// term := factor ('*' factor)*
    fn parse_term(&mut self) -> Result<Expression> {
        let mut lhs = self.parse_factor()?;

        while self.check(&TokenType::Star) {
            let span = self.span();
            self.advance();
            let rhs = self.parse_factor()?;
            lhs = self.operation(span, Operator::Multiply, lhs, rhs);
        }

        Ok(lhs)
    }

    fn parse_factor(&mut self) -> Result<Expression> {
        let span = self.span();
        let token_type = self.peek().token_type.clone();
        let expression = match token_type {
            TokenType::Identifier(name) => Expression::Reference {
                id: self.fresh_id(),
                span,
                name,
            },
            other => match literal_from_token(&other) {
                Some(value) => Expression::Literal {
                    id: self.fresh_id(),
                    span,
                    value,
                },
                None => return Err(self.error(format!("Expected expression, got {}", other))),
            },
        };
        self.advance();
        Ok(expression)
    }

    fn operation(&mut self, span: Span, op: Operator, lhs: Expression, rhs: Expression) -> Expression {
        Expression::Operation {
            id: self.fresh_id(),
            span,
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    fn fresh_id(&mut self) -> NodeId {
        self.next_id += 1;
        NodeId::new(self.next_id)
    }

    fn span(&self) -> Span {
        let token = self.peek();
        Span::new(token.line, token.column)
    }

    fn is_assignment_start(&self) -> bool {
        matches!(self.peek().token_type, TokenType::Identifier(_)) && self.check_next(&TokenType::Assign)
    }

    fn is_selector_start(&self) -> bool {
        matches!(
            self.peek().token_type,
            TokenType::Identifier(_)
                | TokenType::ClassSelector(_)
                | TokenType::IdSelector(_)
                | TokenType::Color(_)
        )
    }

    fn consume_identifier(&mut self, message: &str) -> Result<String> {
        match &self.peek().token_type {
            TokenType::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            other => Err(self.error(format!("{}, got {}", message, other))),
        }
    }

    fn match_token(&mut self, token_type: &TokenType) -> bool {
        if self.check(token_type) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, token_type: &TokenType) -> bool {
        if self.is_at_end() {
            false
        } else {
            std::mem::discriminant(&self.peek().token_type) == std::mem::discriminant(token_type)
        }
    }

    fn check_next(&self, token_type: &TokenType) -> bool {
        self.tokens
            .get(self.current + 1)
            .map_or(false, |token| {
                std::mem::discriminant(&token.token_type) == std::mem::discriminant(token_type)
            })
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::Eof)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn consume(&mut self, token_type: TokenType, message: &str) -> Result<&Token> {
        if self.check(&token_type) {
            Ok(self.advance())
        } else {
            Err(self.error(format!("{}, got {}", message, self.peek().token_type)))
        }
    }

    fn error(&self, message: impl Into<String>) -> CompilerError {
        let token = self.peek();
        CompilerError::parse(token.filename.clone(), token.line, message)
    }
}

fn literal_from_token(token: &TokenType) -> Option<Literal> {
    match token {
        TokenType::Pixel(value) => Some(Literal::Pixel(*value)),
        TokenType::Percentage(value) => Some(Literal::Percentage(*value)),
        TokenType::Scalar(value) => Some(Literal::Scalar(*value)),
        TokenType::Color(code) => Some(Literal::Color(code.to_ascii_lowercase())),
        TokenType::Boolean(value) => Some(Literal::Bool(*value)),
        _ => None,
    }
}

/// Parse a stand-alone literal such as `10px`, `#00ff00` or `TRUE`
pub fn parse_literal(text: &str, filename: &str) -> Result<Literal> {
    let mut lexer = Lexer::new(text, filename)?;
    let tokens = lexer.tokenize()?;

    match tokens.as_slice() {
        [token, eof] if eof.token_type == TokenType::Eof => literal_from_token(&token.token_type)
            .ok_or_else(|| {
                CompilerError::parse(filename, token.line, format!("Expected literal, got {}", token.token_type))
            }),
        _ => Err(CompilerError::parse(
            filename,
            1,
            format!("Expected a single literal, got '{}'", text),
        )),
    }
}

/// Tokenize and parse a complete ICSS source
pub fn parse_source(source: &str, filename: &str) -> Result<Stylesheet> {
    let mut lexer = Lexer::new(source, filename)?;
    let tokens = lexer.tokenize()?;
    Parser::new(tokens).parse()
}
