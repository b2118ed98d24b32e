//! CSS text generation

use crate::ast::*;
use crate::error::{CompilerError, Result};

pub const DEFAULT_INDENT: usize = 2;

pub struct CodeGenerator {
    output: String,
    indent_width: usize,
}

impl CodeGenerator {
    pub fn new() -> Self {
        Self {
            output: String::new(),
            indent_width: DEFAULT_INDENT,
        }
    }

    pub fn with_indent(mut self, indent_width: usize) -> Self {
        self.indent_width = indent_width;
        self
    }

    /// Render an evaluated stylesheet. Every declaration must already hold a
    /// literal and no assignment or if-clause may remain.
    pub fn generate(&mut self, stylesheet: &Stylesheet) -> Result<String> {
        self.output.clear();

        for node in &stylesheet.items {
            match node {
                Node::Rule(rule) => self.write_rule(rule)?,
                other => return Err(unexpected_node(other)),
            }
        }

        Ok(std::mem::take(&mut self.output))
    }

    fn write_rule(&mut self, rule: &StyleRule) -> Result<()> {
        let selectors = rule
            .selectors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        self.output.push_str(&selectors);
        self.output.push_str(" {\n");

        for node in &rule.body {
            match node {
                Node::Declaration(declaration) => self.write_declaration(declaration)?,
                other => return Err(unexpected_node(other)),
            }
        }

        self.output.push_str("}\n\n");
        Ok(())
    }

    fn write_declaration(&mut self, declaration: &Declaration) -> Result<()> {
        let value = declaration.expression.as_literal().ok_or_else(|| {
            CompilerError::codegen(format!(
                "declaration '{}' at {} is not a literal; run the evaluator first",
                declaration.property, declaration.span
            ))
        })?;

        for _ in 0..self.indent_width {
            self.output.push(' ');
        }
        self.output.push_str(&declaration.property);
        self.output.push_str(": ");
        self.output.push_str(&value.to_string());
        self.output.push_str(";\n");
        Ok(())
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn unexpected_node(node: &Node) -> CompilerError {
    let kind = match node {
        Node::Rule(_) => "nested style rule",
        Node::Declaration(_) => "top-level declaration",
        Node::Assignment(_) => "variable assignment",
        Node::If(_) => "if-clause",
    };
    CompilerError::codegen(format!(
        "unexpected {} at {} in evaluated stylesheet",
        kind,
        node.span()
    ))
}
