//! ICSS Compiler
//!
//! A compiler for ICSS, a small stylesheet language that adds typed variables,
//! integer arithmetic and `if`/`else` blocks to plain style rules, and compiles
//! them down to static CSS.
//!
//! # Basic Usage
//!
//! ```rust
//! use icssc::{compile_source, Result};
//!
//! fn main() -> Result<()> {
//!     let css = compile_source("Gutter := 8px; a { width: Gutter * 2; }", "inline.icss")?;
//!     assert_eq!(css, "a {\n  width: 16px;\n}\n\n");
//!     Ok(())
//! }
//! ```
//!
//! # Compilation Pipeline
//!
//! 1. **Phase 1**: Lexer & Parser - Tokenize and build the AST
//! 2. **Phase 2**: Type Checker - Record a diagnostic on every ill-typed node
//! 3. **Phase 3**: Evaluator - Fold expressions, consume variables and if-clauses
//! 4. **Phase 4**: Code Generator - Render the flat tree as CSS text
//!
//! In strict mode (the default) any diagnostic from phase 2 aborts the run with
//! [`CompilerError::Semantic`] before evaluation starts.

pub mod ast;
pub mod checker;
pub mod cli;
pub mod codegen;
pub mod diagnostics;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod scope;
pub mod types;

use serde::Serialize;
use std::collections::HashMap;

// Re-export commonly used types and functions
pub use ast::{Declaration, Expression, IfClause, Literal, Node, Operator, Selector, StyleRule, Stylesheet, VariableAssignment};
pub use checker::TypeChecker;
pub use cli::EnhancedCli;
pub use codegen::CodeGenerator;
pub use diagnostics::{Diagnostic, Diagnostics, NodeId, Span};
pub use error::{CompilerError, Result};
pub use evaluator::Evaluator;
pub use lexer::{Lexer, Token, TokenType};
pub use parser::{parse_literal, parse_source, Parser};
pub use scope::{Scope, ScopeStack};
pub use types::ExpressionType;

/// Compiler version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Compiler build information
pub const BUILD_INFO: CompilerInfo = CompilerInfo {
    version: VERSION,
    name: NAME,
    description: DESCRIPTION,
    supported_features: &[
        "variables",
        "arithmetic",
        "conditionals",
        "type-checking",
        "custom-variables",
    ],
};

/// Compiler information structure
#[derive(Debug, Clone)]
pub struct CompilerInfo {
    pub version: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub supported_features: &'static [&'static str],
}

pub fn build_info() -> &'static CompilerInfo {
    &BUILD_INFO
}

pub fn supports_feature(feature: &str) -> bool {
    BUILD_INFO.supported_features.contains(&feature)
}

/// Compilation options and settings
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Enable debug mode with extra logging
    pub debug_mode: bool,

    /// Abort before evaluation when the checker reports anything
    pub strict: bool,

    /// Spaces before each generated declaration
    pub indent_width: usize,

    /// Variables injected into the global scope, values written as ICSS literals
    pub custom_variables: HashMap<String, String>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            debug_mode: false,
            strict: true,
            indent_width: codegen::DEFAULT_INDENT,
            custom_variables: HashMap::new(),
        }
    }
}

/// Compilation statistics and metrics
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompilationStats {
    /// Source size in bytes
    pub source_size: u64,

    /// Generated CSS size in bytes
    pub output_size: u64,

    /// Style rules in the generated output
    pub rule_count: usize,

    /// Declarations in the generated output
    pub declaration_count: usize,

    /// Variable assignments consumed by the evaluator
    pub assignment_count: usize,

    /// If-clauses consumed by the evaluator
    pub conditional_count: usize,

    /// Injected custom variables
    pub variable_count: usize,

    /// Checker diagnostics
    pub diagnostic_count: usize,

    /// Evaluator defects
    pub defect_count: usize,

    /// Compilation time in milliseconds
    pub compile_time_ms: u64,
}

/// Everything one run produced, for tooling that wants more than the CSS
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub css: String,
    pub stylesheet: Stylesheet,
    pub diagnostics: Vec<Diagnostic>,
    pub defects: Vec<Diagnostic>,
    pub stats: CompilationStats,
}

/// Main compiler entry point with default options
pub fn compile_file(input_path: &str, output_path: &str) -> Result<CompilationStats> {
    compile_file_with_options(input_path, output_path, CompilerOptions::default())
}

/// Compile with custom options
pub fn compile_file_with_options(
    input_path: &str,
    output_path: &str,
    options: CompilerOptions,
) -> Result<CompilationStats> {
    use std::fs;
    use std::time::Instant;

    let start_time = Instant::now();

    if options.debug_mode {
        log::info!("{} v{}", NAME, VERSION);
        log::info!("Compiling '{}' to '{}'...", input_path, output_path);
        log::debug!("Compiler options: {:?}", options);
    }

    let source = read_source(input_path)?;
    let (css, mut stats) = compile_source_with_options(&source, input_path, options.clone())?;

    fs::write(output_path, &css)?;
    stats.compile_time_ms = start_time.elapsed().as_millis() as u64;

    if options.debug_mode {
        log::info!("Compilation successful!");
        log::info!("Source size: {} bytes", stats.source_size);
        log::info!("Output size: {} bytes", stats.output_size);
        log::info!("Compile time: {}ms", stats.compile_time_ms);
        log::debug!("Full stats: {:?}", stats);
    }

    Ok(stats)
}

/// Compile ICSS source code to CSS text with default options
pub fn compile_source(source: &str, filename: &str) -> Result<String> {
    let (css, _stats) = compile_source_with_options(source, filename, CompilerOptions::default())?;
    Ok(css)
}

/// Compile ICSS source code to CSS text with custom options
pub fn compile_source_with_options(
    source: &str,
    filename: &str,
    options: CompilerOptions,
) -> Result<(String, CompilationStats)> {
    let analysis = analyze_source(source, filename, &options)?;
    Ok((analysis.css, analysis.stats))
}

/// Parse and type-check only, returning every diagnostic
pub fn check_source(source: &str, filename: &str, options: &CompilerOptions) -> Result<Vec<Diagnostic>> {
    let globals = resolve_custom_variables(&options.custom_variables, filename)?;
    let stylesheet = parse_source(source, filename)?;

    let mut checker = TypeChecker::with_globals(global_types(&globals));
    Ok(checker.check(&stylesheet))
}

pub fn check_file(input_path: &str, options: &CompilerOptions) -> Result<Vec<Diagnostic>> {
    let source = read_source(input_path)?;
    check_source(&source, input_path, options)
}

/// Run the whole pipeline and keep every intermediate result
pub fn analyze_source(source: &str, filename: &str, options: &CompilerOptions) -> Result<Analysis> {
    let globals = resolve_custom_variables(&options.custom_variables, filename)?;
    let mut stats = CompilationStats {
        source_size: source.len() as u64,
        variable_count: globals.len(),
        ..Default::default()
    };

    // Phase 1: Lexical analysis and parsing
    if options.debug_mode {
        log::debug!("Phase 1: Parsing {} ({} bytes)...", filename, source.len());
    }
    let stylesheet = parse_source(source, filename)?;
    count_consumed_nodes(&stylesheet.items, &mut stats);

    // Phase 2: Type checking
    if options.debug_mode {
        log::debug!("Phase 2: Type checking...");
    }
    let mut checker = TypeChecker::with_globals(global_types(&globals));
    let diagnostics = checker.check(&stylesheet);
    stats.diagnostic_count = diagnostics.len();

    if !diagnostics.is_empty() {
        if options.strict {
            return Err(CompilerError::semantic(filename, diagnostics));
        }
        for diagnostic in &diagnostics {
            log::warn!("{}:{}", filename, diagnostic);
        }
    }

    // Phase 3: Evaluation
    if options.debug_mode {
        log::debug!("Phase 3: Evaluating...");
    }
    let mut evaluator = Evaluator::with_globals(globals);
    let evaluated = evaluator.evaluate(stylesheet);
    let defects = evaluator.defects().to_vec();
    stats.defect_count = defects.len();

    // Phase 4: CSS generation
    if options.debug_mode {
        log::debug!("Phase 4: Generating CSS...");
    }
    let css = CodeGenerator::new()
        .with_indent(options.indent_width)
        .generate(&evaluated)?;

    stats.output_size = css.len() as u64;
    stats.rule_count = evaluated.rules().count();
    stats.declaration_count = evaluated.rules().map(|rule| rule.declarations().count()).sum();

    if options.debug_mode {
        log::debug!(
            "Pipeline complete. Rules: {}, Declarations: {}",
            stats.rule_count,
            stats.declaration_count
        );
    }

    Ok(Analysis {
        css,
        stylesheet: evaluated,
        diagnostics,
        defects,
        stats,
    })
}

fn read_source(input_path: &str) -> Result<String> {
    std::fs::read_to_string(input_path).map_err(|e| CompilerError::FileNotFound {
        path: format!("{}: {}", input_path, e),
    })
}

/// Parse `NAME=VALUE` injections into literals for the global scope
fn resolve_custom_variables(
    custom_variables: &HashMap<String, String>,
    filename: &str,
) -> Result<HashMap<String, Literal>> {
    let mut globals = HashMap::new();

    for (name, value) in custom_variables {
        if !lexer::is_identifier(name) {
            return Err(CompilerError::variable(
                filename,
                0,
                format!("Invalid custom variable name '{}'", name),
            ));
        }
        let literal = parse_literal(value.trim(), "<define>").map_err(|e| {
            CompilerError::variable(filename, 0, format!("Invalid value for '{}': {}", name, e))
        })?;
        globals.insert(name.clone(), literal);
    }

    Ok(globals)
}

fn global_types(globals: &HashMap<String, Literal>) -> HashMap<String, ExpressionType> {
    globals
        .iter()
        .map(|(name, value)| (name.clone(), value.expression_type()))
        .collect()
}

fn count_consumed_nodes(nodes: &[Node], stats: &mut CompilationStats) {
    for node in nodes {
        match node {
            Node::Rule(rule) => count_consumed_nodes(&rule.body, stats),
            Node::Declaration(_) => {}
            Node::Assignment(_) => stats.assignment_count += 1,
            Node::If(clause) => {
                stats.conditional_count += 1;
                count_consumed_nodes(&clause.body, stats);
                if let Some(else_body) = &clause.else_body {
                    count_consumed_nodes(else_body, stats);
                }
            }
        }
    }
}
