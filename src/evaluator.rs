//! Constant folding and block flattening
//!
//! [`Evaluator::evaluate`] consumes a stylesheet and builds a new one that
//! holds only style rules whose bodies are declarations with literal values.
//! Variable assignments are folded into the scope stack and dropped, and each
//! if-clause is replaced in place by the flattened body of its live branch.
//!
//! Evaluation never fails. Anything that cannot be folded becomes
//! `Scalar(0)` and leaves a defect on the node that caused it.

use crate::ast::*;
use crate::diagnostics::{Diagnostics, NodeId, Span};
use crate::scope::{Scope, ScopeStack};
use crate::types::FALLBACK_SCALAR;
use std::collections::HashMap;

pub struct Evaluator {
    scopes: ScopeStack<Literal>,
    globals: Scope<Literal>,
    defects: Diagnostics,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::with_globals(HashMap::new())
    }

    /// Evaluator whose global scope starts out with the given values
    pub fn with_globals(globals: HashMap<String, Literal>) -> Self {
        Self {
            scopes: ScopeStack::new(),
            globals,
            defects: Diagnostics::new(),
        }
    }

    pub fn evaluate(&mut self, stylesheet: Stylesheet) -> Stylesheet {
        self.defects.clear();
        self.scopes.clear();
        self.scopes.push(self.globals.clone());

        let items = self.transform_block(stylesheet.items);

        self.scopes.clear();
        log::debug!(
            "Evaluation produced {} top-level item(s), {} defect(s)",
            items.len(),
            self.defects.len()
        );
        Stylesheet::new(items)
    }

    /// Defects of the last run, keyed by node
    pub fn defects(&self) -> &Diagnostics {
        &self.defects
    }

    fn transform_block(&mut self, nodes: Vec<Node>) -> Vec<Node> {
        let mut out = Vec::with_capacity(nodes.len());

        for node in nodes {
            match node {
                Node::Assignment(assignment) => {
                    let value = self.fold(&assignment.expression);
                    log::trace!("{} := {}", assignment.name, value);
                    self.scopes.bind(assignment.name, value);
                }
                Node::If(clause) => {
                    let live = if self.condition_holds(&clause) {
                        Some(clause.body)
                    } else {
                        clause.else_body
                    };
                    if let Some(body) = live {
                        self.scopes.push_copy();
                        out.extend(self.transform_block(body));
                        self.scopes.pop();
                    }
                }
                Node::Declaration(declaration) => {
                    out.push(Node::Declaration(self.transform_declaration(declaration)));
                }
                Node::Rule(rule) => {
                    self.scopes.push_copy();
                    let body = self.transform_block(rule.body);
                    self.scopes.pop();
                    out.push(Node::Rule(StyleRule { body, ..rule }));
                }
            }
        }

        out
    }

    fn transform_declaration(&mut self, declaration: Declaration) -> Declaration {
        let value = self.fold(&declaration.expression);
        let expression = Expression::Literal {
            id: declaration.expression.id(),
            span: declaration.expression.span(),
            value,
        };
        Declaration {
            expression,
            ..declaration
        }
    }

    /// A condition that does not fold to a bool counts as false
    fn condition_holds(&mut self, clause: &IfClause) -> bool {
        match self.fold(&clause.condition) {
            Literal::Bool(value) => value,
            other => {
                self.defect(
                    clause.id,
                    clause.span,
                    format!("if-condition must be bool, got {}", other.expression_type()),
                );
                false
            }
        }
    }

    /// Reduce an expression to a literal, operands left before right
    pub fn fold(&mut self, expression: &Expression) -> Literal {
        match expression {
            Expression::Literal { value, .. } => value.clone(),
            Expression::Reference { id, span, name } => match self.scopes.lookup(name) {
                Some(value) => value.clone(),
                None => {
                    self.defect(*id, *span, format!("unknown variable: {}", name));
                    Literal::Scalar(FALLBACK_SCALAR)
                }
            },
            Expression::Operation { id, span, op, lhs, rhs } => {
                let left = self.fold(lhs);
                let right = self.fold(rhs);
                let result = match op {
                    Operator::Multiply => multiply(&left, &right),
                    Operator::Add => combine(&left, &right, i64::wrapping_add),
                    Operator::Subtract => combine(&left, &right, i64::wrapping_sub),
                };
                match result {
                    Some(value) => value,
                    None => {
                        let message = match (op, &left, &right) {
                            (Operator::Multiply, Literal::Color(_), _)
                            | (Operator::Multiply, _, Literal::Color(_)) => {
                                "multiplication with color disallowed".to_string()
                            }
                            _ => format!(
                                "invalid {}: {} {} {}",
                                op.name(),
                                left.expression_type(),
                                op,
                                right.expression_type()
                            ),
                        };
                        self.defect(*id, *span, message);
                        Literal::Scalar(FALLBACK_SCALAR)
                    }
                }
            }
        }
    }

    fn defect(&mut self, node: NodeId, span: Span, message: impl Into<String>) {
        let message = message.into();
        log::warn!("evaluation defect at {}: {}", span, message);
        self.defects.record(node, span, message);
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

fn multiply(left: &Literal, right: &Literal) -> Option<Literal> {
    match (left, right) {
        (Literal::Pixel(a), Literal::Scalar(b)) | (Literal::Scalar(a), Literal::Pixel(b)) => {
            Some(Literal::Pixel(a.wrapping_mul(*b)))
        }
        (Literal::Percentage(a), Literal::Scalar(b)) | (Literal::Scalar(a), Literal::Percentage(b)) => {
            Some(Literal::Percentage(a.wrapping_mul(*b)))
        }
        (Literal::Scalar(a), Literal::Scalar(b)) => Some(Literal::Scalar(a.wrapping_mul(*b))),
        _ => None,
    }
}

/// Add or subtract two literals of the same numeric kind
fn combine(left: &Literal, right: &Literal, apply: fn(i64, i64) -> i64) -> Option<Literal> {
    match (left, right) {
        (Literal::Pixel(a), Literal::Pixel(b)) => Some(Literal::Pixel(apply(*a, *b))),
        (Literal::Percentage(a), Literal::Percentage(b)) => Some(Literal::Percentage(apply(*a, *b))),
        (Literal::Scalar(a), Literal::Scalar(b)) => Some(Literal::Scalar(apply(*a, *b))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::TypeChecker;
    use crate::parser::parse_source;

    fn evaluate(source: &str) -> (Stylesheet, Evaluator) {
        let sheet = parse_source(source, "test.icss").unwrap();
        let mut evaluator = Evaluator::new();
        let result = evaluator.evaluate(sheet);
        (result, evaluator)
    }

    /// `(property, value)` pairs of every rule, in output order
    fn flattened(sheet: &Stylesheet) -> Vec<Vec<(String, Literal)>> {
        sheet
            .rules()
            .map(|rule| {
                rule.declarations()
                    .map(|d| (d.property.clone(), d.expression.as_literal().cloned().unwrap()))
                    .collect()
            })
            .collect()
    }

    fn literal(id: u32, value: Literal) -> Expression {
        Expression::Literal {
            id: NodeId::new(id),
            span: Span::dummy(),
            value,
        }
    }

    fn operation(id: u32, op: Operator, lhs: Expression, rhs: Expression) -> Expression {
        Expression::Operation {
            id: NodeId::new(id),
            span: Span::dummy(),
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    #[test]
    fn test_multiply_is_commutative_on_mixed_kinds() {
        let mut evaluator = Evaluator::new();
        let scalar_first = operation(3, Operator::Multiply, literal(1, Literal::Scalar(2)), literal(2, Literal::Pixel(5)));
        let pixel_first = operation(6, Operator::Multiply, literal(4, Literal::Pixel(5)), literal(5, Literal::Scalar(2)));

        assert_eq!(evaluator.fold(&scalar_first), Literal::Pixel(10));
        assert_eq!(evaluator.fold(&pixel_first), Literal::Pixel(10));
        assert!(evaluator.defects().is_empty());
    }

    #[test]
    fn test_mismatched_add_falls_back_with_defect() {
        let mut evaluator = Evaluator::new();
        let sum = operation(3, Operator::Add, literal(1, Literal::Pixel(5)), literal(2, Literal::Percentage(10)));

        assert_eq!(evaluator.fold(&sum), Literal::Scalar(0));
        let defects: Vec<_> = evaluator.defects().for_node(NodeId::new(3)).collect();
        assert_eq!(defects.len(), 1);
        assert_eq!(defects[0].message, "invalid add: pixel + percentage");
    }

    #[test]
    fn test_color_multiply_defect() {
        let mut evaluator = Evaluator::new();
        let product = operation(
            3,
            Operator::Multiply,
            literal(1, Literal::Scalar(2)),
            literal(2, Literal::Color("#ff0000".to_string())),
        );

        assert_eq!(evaluator.fold(&product), Literal::Scalar(0));
        assert_eq!(
            evaluator.defects().iter().next().map(|d| d.message.as_str()),
            Some("multiplication with color disallowed")
        );
    }

    #[test]
    fn test_arithmetic_wraps_instead_of_panicking() {
        let mut evaluator = Evaluator::new();
        let product = operation(3, Operator::Multiply, literal(1, Literal::Scalar(i64::MAX)), literal(2, Literal::Scalar(2)));
        assert_eq!(evaluator.fold(&product), Literal::Scalar(-2));
    }

    #[test]
    fn test_single_rule_passes_through() {
        let (sheet, evaluator) = evaluate("a { color: #ff0000; }");
        assert_eq!(
            flattened(&sheet),
            vec![vec![("color".to_string(), Literal::Color("#ff0000".to_string()))]]
        );
        assert!(evaluator.defects().is_empty());
    }

    #[test]
    fn test_variable_times_scalar() {
        let (sheet, evaluator) = evaluate("X := 5px; b { width: X * 2; }");
        assert_eq!(sheet.items.len(), 1);
        assert_eq!(
            flattened(&sheet),
            vec![vec![("width".to_string(), Literal::Pixel(10))]]
        );
        assert!(evaluator.defects().is_empty());
    }

    #[test]
    fn test_else_branch_selected() {
        let (sheet, _) = evaluate("a { if [FALSE] { width: 10px; } else { width: 20px; } }");
        assert_eq!(
            flattened(&sheet),
            vec![vec![("width".to_string(), Literal::Pixel(20))]]
        );
        let rule = sheet.rules().next().unwrap();
        assert_eq!(rule.body.len(), 1);
        assert!(!rule.body.iter().any(|node| matches!(node, Node::If(_) | Node::Assignment(_))));
    }

    #[test]
    fn test_false_without_else_emits_nothing() {
        let (sheet, _) = evaluate("a { height: 1px; if [FALSE] { width: 10px; } color: #000000; }");
        assert_eq!(
            flattened(&sheet),
            vec![vec![
                ("height".to_string(), Literal::Pixel(1)),
                ("color".to_string(), Literal::Color("#000000".to_string())),
            ]]
        );
    }

    #[test]
    fn test_nested_branches_splice_in_order() {
        let source = r#"
            Big := TRUE;
            a {
                width: 1px;
                if [Big] {
                    Step := 10px;
                    width: Step;
                    if [FALSE] { height: 1%; } else { height: 2%; Step := 20px; width: Step; }
                    width: Step;
                }
                width: 4px;
            }
        "#;
        let (sheet, evaluator) = evaluate(source);
        let widths: Vec<_> = flattened(&sheet)[0].iter().map(|(_, v)| v.to_string()).collect();
        assert_eq!(widths, vec!["1px", "10px", "2%", "20px", "10px", "4px"]);
        assert!(evaluator.defects().is_empty());
    }

    #[test]
    fn test_scope_isolation_between_rules() {
        let source = r#"
            Size := 10px;
            a { Size := 20px; width: Size; }
            b { width: Size; }
        "#;
        let (sheet, _) = evaluate(source);
        assert_eq!(
            flattened(&sheet),
            vec![
                vec![("width".to_string(), Literal::Pixel(20))],
                vec![("width".to_string(), Literal::Pixel(10))],
            ]
        );
    }

    #[test]
    fn test_unknown_variable_defect() {
        let (sheet, evaluator) = evaluate("c { height: y; }");
        let declaration = sheet.rules().next().unwrap().declarations().next().unwrap();
        assert_eq!(declaration.expression.as_literal(), Some(&Literal::Scalar(0)));
        assert_eq!(evaluator.defects().len(), 1);
        assert_eq!(evaluator.defects().iter().next().unwrap().message, "unknown variable: y");
    }

    #[test]
    fn test_non_bool_condition_is_false() {
        let source = "a { if [3] { width: 1px; } else { width: 2px; } }";
        let (sheet, evaluator) = evaluate(source);
        assert_eq!(flattened(&sheet), vec![vec![("width".to_string(), Literal::Pixel(2))]]);
        assert_eq!(
            evaluator.defects().iter().next().unwrap().message,
            "if-condition must be bool, got scalar"
        );
    }

    #[test]
    fn test_accepted_programs_evaluate_without_defects() {
        let programs = [
            "a { color: #ff0000; }",
            "W := 10%; a { width: W * 3 - 5%; if [TRUE] { W := 1%; height: W; } height: W; }",
            "A := 2; B := A * A; p, .c { width: B * 3px + 1px; if [FALSE] {} else { color: #abcdef; } }",
            "F := FALSE; x { if [F] { T := 1px; } else { T := 2px; width: T; } }",
        ];
        for program in programs {
            let sheet = parse_source(program, "test.icss").unwrap();
            assert!(TypeChecker::new().check(&sheet).is_empty(), "{}", program);

            let mut evaluator = Evaluator::new();
            let result = evaluator.evaluate(sheet);
            assert!(evaluator.defects().is_empty(), "{}", program);
            for rule in result.rules() {
                assert!(rule.body.iter().all(|node| matches!(
                    node,
                    Node::Declaration(Declaration { expression: Expression::Literal { .. }, .. })
                )));
            }
        }
    }

    #[test]
    fn test_globals_seed_the_outer_scope() {
        let mut globals = HashMap::new();
        globals.insert("Gutter".to_string(), Literal::Pixel(8));
        let mut evaluator = Evaluator::with_globals(globals);

        let sheet = parse_source("a { width: Gutter * 2; }", "test.icss").unwrap();
        let result = evaluator.evaluate(sheet);
        assert_eq!(flattened(&result), vec![vec![("width".to_string(), Literal::Pixel(16))]]);
    }
}
