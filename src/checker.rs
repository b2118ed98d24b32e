//! Static type checking for ICSS stylesheets
//!
//! [`TypeChecker::check`] walks the whole tree and never stops early: every
//! violated rule is recorded against the offending node and the walk carries
//! on, so one run reports every problem in the file.

use crate::ast::*;
use crate::diagnostics::{Diagnostic, Diagnostics, NodeId, Span};
use crate::scope::{Scope, ScopeStack};
use crate::types::{describe_type, expected_types, ExpressionType};
use std::collections::HashMap;

pub struct TypeChecker {
    scopes: ScopeStack<ExpressionType>,
    globals: Scope<ExpressionType>,
    diagnostics: Diagnostics,
}

impl TypeChecker {
    pub fn new() -> Self {
        Self::with_globals(HashMap::new())
    }

    /// Checker whose global scope starts out with the given bindings
    pub fn with_globals(globals: HashMap<String, ExpressionType>) -> Self {
        Self {
            scopes: ScopeStack::new(),
            globals,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn check(&mut self, stylesheet: &Stylesheet) -> Vec<Diagnostic> {
        self.diagnostics.clear();
        self.scopes.clear();
        self.scopes.push(self.globals.clone());

        self.check_block(&stylesheet.items);

        self.scopes.clear();
        log::debug!("Type check finished with {} diagnostic(s)", self.diagnostics.len());
        self.diagnostics.to_vec()
    }

    /// Diagnostics of the last run, keyed by node
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    fn check_block(&mut self, nodes: &[Node]) {
        for node in nodes {
            self.check_node(node);
        }
    }

    fn check_node(&mut self, node: &Node) {
        match node {
            Node::Rule(rule) => self.check_rule(rule),
            Node::Declaration(declaration) => self.check_declaration(declaration),
            Node::Assignment(assignment) => self.check_assignment(assignment),
            Node::If(clause) => self.check_if(clause),
        }
    }

    fn check_rule(&mut self, rule: &StyleRule) {
        self.check_scoped("rule", rule.span, &rule.body);
    }

    /// Check `body` in a copy of the current scope, discarded afterwards
    fn check_scoped(&mut self, kind: &str, span: Span, body: &[Node]) {
        self.scopes.push_copy();
        log::trace!("enter {} scope at {} (depth {})", kind, span, self.scopes.len());
        self.check_block(body);
        self.scopes.pop();
        log::trace!("leave {} scope at {} (depth {})", kind, span, self.scopes.len());
    }

    fn check_assignment(&mut self, assignment: &VariableAssignment) {
        match self.infer_type(&assignment.expression) {
            Some(ty) => {
                log::trace!("bind {}: {}", assignment.name, ty);
                self.scopes.bind(assignment.name.clone(), ty);
            }
            None => {
                let mut message = format!(
                    "cannot determine type of expression for variable '{}'",
                    assignment.name
                );
                if let Some(unknown) = self.unknown_variables(&assignment.expression) {
                    message.push_str(&format!(" ({})", unknown));
                }
                self.report(assignment.id, assignment.span, message);
            }
        }
    }

    fn check_declaration(&mut self, declaration: &Declaration) {
        let ty = self.infer_type(&declaration.expression);

        let Some(expected) = expected_types(&declaration.property) else {
            self.report(
                declaration.id,
                declaration.span,
                format!("property '{}' is not allowed", declaration.property),
            );
            return;
        };

        if ty.is_none() {
            if let Some(unknown) = self.unknown_variables(&declaration.expression) {
                self.report(declaration.id, declaration.span, unknown);
                return;
            }
        }

        if !ty.map_or(false, |ty| expected.contains(&ty)) {
            let expected = expected
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" or ");
            self.report(
                declaration.id,
                declaration.span,
                format!(
                    "property '{}' expects {}, got {}",
                    declaration.property,
                    expected,
                    describe_type(ty)
                ),
            );
        }
    }

    fn check_if(&mut self, clause: &IfClause) {
        let ty = self.infer_type(&clause.condition);
        if ty != Some(ExpressionType::Bool) {
            let message = match (ty, self.unknown_variables(&clause.condition)) {
                (None, Some(unknown)) => unknown,
                _ => format!("if-condition must be bool, got {}", describe_type(ty)),
            };
            self.report(clause.id, clause.span, message);
        }

        self.check_scoped("if", clause.span, &clause.body);

        if let Some(else_body) = &clause.else_body {
            self.check_scoped("else", clause.span, else_body);
        }
    }

    /// `None` means the expression has no type; the cause is already recorded
    /// unless it is an unbound variable, which the enclosing node reports.
    fn infer_type(&mut self, expression: &Expression) -> Option<ExpressionType> {
        match expression {
            Expression::Literal { value, .. } => Some(value.expression_type()),
            Expression::Reference { name, .. } => self.scopes.lookup(name).copied(),
            Expression::Operation { id, span, op, lhs, rhs } => {
                let left = self.infer_type(lhs);
                let right = self.infer_type(rhs);

                let (Some(left), Some(right)) = (left, right) else {
                    self.report(*id, *span, format!("invalid operand(s) for {}", op.name()));
                    return None;
                };

                let result = match op {
                    Operator::Multiply => infer_multiply(left, right),
                    Operator::Add | Operator::Subtract => infer_additive(*op, left, right),
                };
                match result {
                    Ok(ty) => Some(ty),
                    Err(message) => {
                        self.report(*id, *span, message);
                        None
                    }
                }
            }
        }
    }

    /// `unknown variable: A, B` for every unbound name in the expression
    fn unknown_variables(&self, expression: &Expression) -> Option<String> {
        let mut names = Vec::new();
        self.collect_unbound(expression, &mut names);
        if names.is_empty() {
            None
        } else {
            Some(format!("unknown variable: {}", names.join(", ")))
        }
    }

    fn collect_unbound<'a>(&self, expression: &'a Expression, names: &mut Vec<&'a str>) {
        match expression {
            Expression::Literal { .. } => {}
            Expression::Reference { name, .. } => {
                if self.scopes.lookup(name).is_none() && !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            Expression::Operation { lhs, rhs, .. } => {
                self.collect_unbound(lhs, names);
                self.collect_unbound(rhs, names);
            }
        }
    }

    fn report(&mut self, node: NodeId, span: Span, message: impl Into<String>) {
        self.diagnostics.record(node, span, message);
    }
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new()
    }
}

fn infer_multiply(left: ExpressionType, right: ExpressionType) -> Result<ExpressionType, String> {
    use ExpressionType::*;

    match (left, right) {
        (Scalar, Pixel | Percentage) => Ok(right),
        (Pixel | Percentage, Scalar) => Ok(left),
        (Scalar, Scalar) => Ok(Scalar),
        (Color, _) | (_, Color) => Err("multiplication with color disallowed".to_string()),
        _ => Err(format!("invalid multiplication: {} * {}", left, right)),
    }
}

fn infer_additive(op: Operator, left: ExpressionType, right: ExpressionType) -> Result<ExpressionType, String> {
    if left == ExpressionType::Color || right == ExpressionType::Color {
        return Err(format!("color not allowed in {}", op.name()));
    }
    if left == right && left.is_numeric() {
        return Ok(left);
    }
    Err(format!(
        "incompatible operands for {}: {} and {}",
        op.name(),
        left,
        right
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    fn check(source: &str) -> Vec<Diagnostic> {
        let sheet = parse_source(source, "test.icss").unwrap();
        TypeChecker::new().check(&sheet)
    }

    fn messages(source: &str) -> Vec<String> {
        check(source).into_iter().map(|d| d.message).collect()
    }

    #[test]
    fn test_valid_program_has_no_diagnostics() {
        let source = r#"
            LinkColor := #ff0000;
            ParWidth := 500px;
            AdjustColor := TRUE;
            p {
                background-color: #ffffff;
                width: ParWidth;
                if [AdjustColor] {
                    color: #124532;
                    if [FALSE] { height: 50%; }
                } else {
                    color: LinkColor;
                }
            }
            a, .menu, #main {
                color: LinkColor;
                width: ParWidth - 20px * 2 + 3 * 10px;
                height: 2 * 10% + 5%;
            }
        "#;
        assert!(check(source).is_empty());
    }

    #[test]
    fn test_pixel_plus_percentage_is_rejected() {
        assert_eq!(
            messages("a { width: 5px + 10%; }"),
            vec![
                "incompatible operands for add: pixel and percentage".to_string(),
                "property 'width' expects pixel or percentage, got unknown".to_string(),
            ]
        );
    }

    #[test]
    fn test_multiplication_rules() {
        assert!(check("a { width: 2 * 5px; height: 5% * 2; }").is_empty());
        assert_eq!(
            messages("X := #ff0000 * 2;")[0],
            "multiplication with color disallowed"
        );
        assert_eq!(
            messages("a { width: 5px * 5px; }")[0],
            "invalid multiplication: pixel * pixel"
        );
        assert_eq!(
            messages("X := TRUE * 2;")[0],
            "invalid multiplication: bool * scalar"
        );
    }

    #[test]
    fn test_color_in_additive_operation() {
        assert_eq!(
            messages("a { color: #ff0000 - #000001; }")[0],
            "color not allowed in subtract"
        );
    }

    #[test]
    fn test_property_allow_list() {
        assert_eq!(
            messages("a { margin: 10px; }"),
            vec!["property 'margin' is not allowed".to_string()]
        );
        assert_eq!(
            messages("a { margin: #ff0000; }"),
            vec!["property 'margin' is not allowed".to_string()]
        );
        assert!(check("a { WIDTH: 10px; Background-Color: #000000; }").is_empty());
    }

    #[test]
    fn test_property_type_mismatch() {
        assert_eq!(
            messages("a { color: 10px; }"),
            vec!["property 'color' expects color, got pixel".to_string()]
        );
        assert_eq!(
            messages("a { height: 3; }"),
            vec!["property 'height' expects pixel or percentage, got scalar".to_string()]
        );
    }

    #[test]
    fn test_unknown_variable_yields_exactly_one_diagnostic() {
        let sheet = parse_source("c { height: y; }", "test.icss").unwrap();
        let mut checker = TypeChecker::new();
        let diagnostics = checker.check(&sheet);

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "unknown variable: y");

        let declaration = sheet.rules().next().unwrap().declarations().next().unwrap();
        assert_eq!(diagnostics[0].node, declaration.id);
        assert_eq!(checker.diagnostics().for_node(declaration.id).count(), 1);
    }

    #[test]
    fn test_unknown_variable_inside_operation() {
        let diagnostics = messages("a { width: Missing * 2; }");
        assert_eq!(
            diagnostics,
            vec![
                "invalid operand(s) for multiply".to_string(),
                "unknown variable: Missing".to_string(),
            ]
        );
    }

    #[test]
    fn test_failed_assignment_does_not_bind() {
        assert_eq!(
            messages("X := 1px + 1%; a { width: X; }"),
            vec![
                "incompatible operands for add: pixel and percentage".to_string(),
                "cannot determine type of expression for variable 'X'".to_string(),
                "unknown variable: X".to_string(),
            ]
        );
        assert_eq!(
            messages("X := Y;"),
            vec!["cannot determine type of expression for variable 'X' (unknown variable: Y)".to_string()]
        );
    }

    #[test]
    fn test_if_condition_must_be_bool() {
        assert_eq!(
            messages("a { if [10px] { width: 1px; } }"),
            vec!["if-condition must be bool, got pixel".to_string()]
        );
        assert_eq!(
            messages("a { if [Flag] { width: 1px; } }"),
            vec!["unknown variable: Flag".to_string()]
        );
    }

    #[test]
    fn test_rule_scope_is_isolated_from_siblings() {
        let source = r#"
            a { Local := 10px; width: Local; }
            b { width: Local; }
        "#;
        assert_eq!(messages(source), vec!["unknown variable: Local".to_string()]);
    }

    #[test]
    fn test_branch_scope_is_discarded() {
        let source = r#"
            a {
                if [TRUE] { Inner := 5px; width: Inner; } else { Other := 1px; }
                height: Inner;
                width: Other;
            }
        "#;
        assert_eq!(
            messages(source),
            vec![
                "unknown variable: Inner".to_string(),
                "unknown variable: Other".to_string(),
            ]
        );
    }

    #[test]
    fn test_parent_binding_visible_in_child_and_shadowing_restores() {
        let source = r#"
            Size := 10px;
            a {
                width: Size;
                Size := #ff0000;
                color: Size;
                if [TRUE] { Size := 5%; height: Size; }
                color: Size;
            }
            b { width: Size; }
        "#;
        assert!(check(source).is_empty());
    }

    #[test]
    fn test_assignment_only_affects_later_siblings() {
        let source = r#"
            a { width: Later; }
            Later := 1px;
            b { width: Later; }
        "#;
        assert_eq!(messages(source), vec!["unknown variable: Later".to_string()]);
    }

    #[test]
    fn test_walk_continues_after_errors() {
        let source = r#"
            a { margin: 1px; color: 1px; }
            b { if [1] { height: #000000; } else { width: TRUE; } }
        "#;
        assert_eq!(check(source).len(), 5);
    }

    #[test]
    fn test_globals_and_reuse() {
        let mut globals = HashMap::new();
        globals.insert("Brand".to_string(), ExpressionType::Color);
        let mut checker = TypeChecker::with_globals(globals);

        let sheet = parse_source("a { color: Brand; }", "test.icss").unwrap();
        assert!(checker.check(&sheet).is_empty());

        let bad = parse_source("a { color: 1px; }", "test.icss").unwrap();
        assert_eq!(checker.check(&bad).len(), 1);
        assert!(checker.check(&sheet).is_empty());
        assert!(checker.diagnostics().is_empty());
    }

    struct CaptureLogger(std::sync::Mutex<Vec<String>>);

    impl log::Log for CaptureLogger {
        fn enabled(&self, _: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            if let Ok(mut lines) = self.0.lock() {
                lines.push(record.args().to_string());
            }
        }

        fn flush(&self) {}
    }

    static CAPTURE: CaptureLogger = CaptureLogger(std::sync::Mutex::new(Vec::new()));

    #[test]
    fn test_scope_entry_and_exit_are_traced() {
        let _ = log::set_logger(&CAPTURE);
        log::set_max_level(log::LevelFilter::Trace);

        let sheet = parse_source("a { if [TRUE] { width: 1px; } else { width: 2px; } }", "trace.icss").unwrap();
        TypeChecker::new().check(&sheet);

        let lines = CAPTURE.0.lock().unwrap().clone();
        for expected in [
            "enter rule scope at 1:1 (depth 2)",
            "enter if scope at 1:5 (depth 3)",
            "leave if scope at 1:5 (depth 2)",
            "enter else scope at 1:5 (depth 3)",
            "leave rule scope at 1:1 (depth 1)",
        ] {
            assert!(lines.iter().any(|line| line == expected), "missing '{}'", expected);
        }
    }
}
