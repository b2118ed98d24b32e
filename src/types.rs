//! Core types and constants for the ICSS compiler

use serde::Serialize;
use std::fmt;

const DIMENSIONS: &[ExpressionType] = &[ExpressionType::Pixel, ExpressionType::Percentage];
const COLORS: &[ExpressionType] = &[ExpressionType::Color];

/// The only properties a declaration may name, with the types each accepts
pub const PROPERTY_TYPES: [(&str, &[ExpressionType]); 4] = [
    ("color", COLORS),
    ("background-color", COLORS),
    ("width", DIMENSIONS),
    ("height", DIMENSIONS),
];

/// Fallback produced by the evaluator whenever an expression cannot be folded
pub const FALLBACK_SCALAR: i64 = 0;

/// Static type of an ICSS expression. No implicit coercion exists between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExpressionType {
    Color,
    Pixel,
    Percentage,
    Scalar,
    Bool,
}

impl ExpressionType {
    /// Types that take part in `+`, `-` and scalar multiplication
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Pixel | Self::Percentage | Self::Scalar)
    }
}

impl fmt::Display for ExpressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionType::Color => write!(f, "color"),
            ExpressionType::Pixel => write!(f, "pixel"),
            ExpressionType::Percentage => write!(f, "percentage"),
            ExpressionType::Scalar => write!(f, "scalar"),
            ExpressionType::Bool => write!(f, "bool"),
        }
    }
}

/// Renders an inferred type for messages, `unknown` when inference failed
pub fn describe_type(ty: Option<ExpressionType>) -> String {
    match ty {
        Some(ty) => ty.to_string(),
        None => "unknown".to_string(),
    }
}

/// Types a property accepts, `None` when the property is not allowed at all.
/// Property names match case-insensitively.
pub fn expected_types(property: &str) -> Option<&'static [ExpressionType]> {
    PROPERTY_TYPES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(property))
        .map(|(_, types)| *types)
}
