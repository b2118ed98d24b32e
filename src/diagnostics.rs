//! Node-bound diagnostics
//!
//! The checker and the evaluator never write messages into the AST. Each pass
//! owns a [`Diagnostics`] collection that keys its messages by the [`NodeId`]
//! of the offending node, so several passes can inspect the same tree.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Stable identity of an AST node, assigned once by the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Source position of a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    pub const fn dummy() -> Self {
        Self { line: 0, column: 0 }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 && self.column == 0 {
            write!(f, "<unknown>")
        } else {
            write!(f, "{}:{}", self.line, self.column)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub node: NodeId,
    pub span: Span,
    pub message: String,
}

impl Diagnostic {
    pub fn new(node: NodeId, span: Span, message: impl Into<String>) -> Self {
        Self {
            node,
            span,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.span, self.message)
    }
}

/// Ordered diagnostics plus a side map from node to its diagnostics
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    by_node: HashMap<NodeId, Vec<usize>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, node: NodeId, span: Span, message: impl Into<String>) {
        let diagnostic = Diagnostic::new(node, span, message);
        log::debug!("{} {}: {}", node, span, diagnostic.message);
        self.by_node.entry(node).or_default().push(self.entries.len());
        self.entries.push(diagnostic);
    }

    /// Diagnostics attached to one node, in recording order
    pub fn for_node(&self, node: NodeId) -> impl Iterator<Item = &Diagnostic> + '_ {
        self.by_node
            .get(&node)
            .into_iter()
            .flatten()
            .map(move |&index| &self.entries[index])
    }

    pub fn has(&self, node: NodeId) -> bool {
        self.by_node.contains_key(&node)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> + '_ {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_node.clear();
    }

    pub fn to_vec(&self) -> Vec<Diagnostic> {
        self.entries.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_map_keeps_per_node_order() {
        let mut diagnostics = Diagnostics::new();
        let rule = NodeId::new(3);
        let decl = NodeId::new(7);

        diagnostics.record(decl, Span::new(2, 3), "first");
        diagnostics.record(rule, Span::new(1, 1), "other node");
        diagnostics.record(decl, Span::new(2, 3), "second");

        let messages: Vec<_> = diagnostics.for_node(decl).map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
        assert!(diagnostics.has(rule));
        assert!(!diagnostics.has(NodeId::new(99)));
        assert_eq!(diagnostics.for_node(NodeId::new(99)).count(), 0);
        assert_eq!(diagnostics.len(), 3);
    }

    #[test]
    fn test_clear_resets_both_views() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.record(NodeId::new(1), Span::dummy(), "oops");
        diagnostics.clear();

        assert!(diagnostics.is_empty());
        assert!(!diagnostics.has(NodeId::new(1)));
    }

    #[test]
    fn test_display_uses_span() {
        let diagnostic = Diagnostic::new(NodeId::new(1), Span::new(4, 9), "unknown variable: X");
        assert_eq!(diagnostic.to_string(), "4:9: unknown variable: X");
        assert_eq!(Span::dummy().to_string(), "<unknown>");
    }
}
