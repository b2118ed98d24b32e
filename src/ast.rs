//! Abstract Syntax Tree types for the ICSS compiler

use crate::diagnostics::{NodeId, Span};
use crate::types::ExpressionType;
use serde::Serialize;
use std::fmt;

/// Root of a parsed ICSS file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stylesheet {
    pub items: Vec<Node>,
}

impl Stylesheet {
    pub fn new(items: Vec<Node>) -> Self {
        Self { items }
    }

    /// Style rules at the top level, in source order
    pub fn rules(&self) -> impl Iterator<Item = &StyleRule> + '_ {
        self.items.iter().filter_map(|node| match node {
            Node::Rule(rule) => Some(rule),
            _ => None,
        })
    }
}

/// Any element of a body list (stylesheet top level, rule body, if/else branch)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Node {
    Rule(StyleRule),
    Declaration(Declaration),
    Assignment(VariableAssignment),
    If(IfClause),
}

impl Node {
    pub fn id(&self) -> NodeId {
        match self {
            Node::Rule(rule) => rule.id,
            Node::Declaration(declaration) => declaration.id,
            Node::Assignment(assignment) => assignment.id,
            Node::If(clause) => clause.id,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Node::Rule(rule) => rule.span,
            Node::Declaration(declaration) => declaration.span,
            Node::Assignment(assignment) => assignment.span,
            Node::If(clause) => clause.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyleRule {
    pub id: NodeId,
    pub span: Span,
    pub selectors: Vec<Selector>,
    pub body: Vec<Node>,
}

impl StyleRule {
    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> + '_ {
        self.body.iter().filter_map(|node| match node {
            Node::Declaration(declaration) => Some(declaration),
            _ => None,
        })
    }
}

/// Selectors match literally; there are no combinators
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Selector {
    Tag(String),
    Class(String),
    Id(String),
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Tag(tag) => write!(f, "{}", tag),
            Selector::Class(class) => write!(f, ".{}", class),
            Selector::Id(id) => write!(f, "#{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Declaration {
    pub id: NodeId,
    pub span: Span,
    /// Raw property text as written in the source
    pub property: String,
    pub expression: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableAssignment {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
    pub expression: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IfClause {
    pub id: NodeId,
    pub span: Span,
    pub condition: Expression,
    pub body: Vec<Node>,
    pub else_body: Option<Vec<Node>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expression {
    Literal {
        id: NodeId,
        span: Span,
        value: Literal,
    },
    Reference {
        id: NodeId,
        span: Span,
        name: String,
    },
    Operation {
        id: NodeId,
        span: Span,
        op: Operator,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
}

impl Expression {
    pub fn id(&self) -> NodeId {
        match self {
            Expression::Literal { id, .. }
            | Expression::Reference { id, .. }
            | Expression::Operation { id, .. } => *id,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Expression::Literal { span, .. }
            | Expression::Reference { span, .. }
            | Expression::Operation { span, .. } => *span,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Expression::Literal { value, .. } => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
}

impl Operator {
    pub fn name(self) -> &'static str {
        match self {
            Operator::Add => "add",
            Operator::Subtract => "subtract",
            Operator::Multiply => "multiply",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Add => write!(f, "+"),
            Operator::Subtract => write!(f, "-"),
            Operator::Multiply => write!(f, "*"),
        }
    }
}

/// A folded value. Numeric kinds carry an integer magnitude.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Literal {
    Pixel(i64),
    Percentage(i64),
    Scalar(i64),
    Color(String),
    Bool(bool),
}

impl Literal {
    pub fn expression_type(&self) -> ExpressionType {
        match self {
            Literal::Pixel(_) => ExpressionType::Pixel,
            Literal::Percentage(_) => ExpressionType::Percentage,
            Literal::Scalar(_) => ExpressionType::Scalar,
            Literal::Color(_) => ExpressionType::Color,
            Literal::Bool(_) => ExpressionType::Bool,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Pixel(value) => write!(f, "{}px", value),
            Literal::Percentage(value) => write!(f, "{}%", value),
            Literal::Scalar(value) => write!(f, "{}", value),
            Literal::Color(code) => write!(f, "{}", code),
            Literal::Bool(value) => write!(f, "{}", value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_display() {
        assert_eq!(Literal::Pixel(10).to_string(), "10px");
        assert_eq!(Literal::Percentage(-5).to_string(), "-5%");
        assert_eq!(Literal::Scalar(3).to_string(), "3");
        assert_eq!(Literal::Color("#00ff00".to_string()).to_string(), "#00ff00");
        assert_eq!(Literal::Bool(false).to_string(), "false");
    }

    #[test]
    fn test_selector_display() {
        assert_eq!(Selector::Tag("p".to_string()).to_string(), "p");
        assert_eq!(Selector::Class("menu".to_string()).to_string(), ".menu");
        assert_eq!(Selector::Id("main".to_string()).to_string(), "#main");
    }

    #[test]
    fn test_node_identity() {
        let declaration = Declaration {
            id: NodeId::new(4),
            span: Span::new(2, 5),
            property: "width".to_string(),
            expression: Expression::Literal {
                id: NodeId::new(3),
                span: Span::new(2, 12),
                value: Literal::Pixel(1),
            },
        };
        let node = Node::Declaration(declaration);
        assert_eq!(node.id(), NodeId::new(4));
        assert_eq!(node.span(), Span::new(2, 5));
    }
}
