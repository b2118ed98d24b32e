//! Lexical scope stack shared by the checker and the evaluator
//!
//! The checker binds names to [`ExpressionType`](crate::types::ExpressionType)s,
//! the evaluator binds them to [`Literal`](crate::ast::Literal)s. Both enter a
//! style rule or an if/else branch with [`ScopeStack::push_copy`], so the block
//! sees every binding visible at its entry, and leave it with
//! [`ScopeStack::pop`], discarding whatever the block bound or shadowed.

use std::collections::HashMap;

pub type Scope<T> = HashMap<String, T>;

/// Ordered scopes, innermost last
#[derive(Debug, Clone)]
pub struct ScopeStack<T> {
    scopes: Vec<Scope<T>>,
}

impl<T: Clone> ScopeStack<T> {
    pub fn new() -> Self {
        Self { scopes: Vec::new() }
    }

    pub fn push(&mut self, scope: Scope<T>) {
        self.scopes.push(scope);
    }

    /// Push a snapshot of the innermost scope (an empty one if there is none)
    pub fn push_copy(&mut self) {
        let snapshot = self.peek().cloned().unwrap_or_default();
        self.scopes.push(snapshot);
    }

    pub fn pop(&mut self) -> Option<Scope<T>> {
        self.scopes.pop()
    }

    pub fn peek(&self) -> Option<&Scope<T>> {
        self.scopes.last()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn clear(&mut self) {
        self.scopes.clear();
    }

    /// Bind or overwrite `name` in the innermost scope only
    pub fn bind(&mut self, name: impl Into<String>, value: T) {
        if self.scopes.is_empty() {
            self.scopes.push(Scope::new());
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.into(), value);
        }
    }

    /// Resolve a name from the innermost scope outwards
    pub fn lookup(&self, name: &str) -> Option<&T> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }
}

impl<T: Clone> Default for ScopeStack<T> {
    fn default() -> Self {
        Self::new()
    }
}
