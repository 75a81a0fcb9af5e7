//! Syntax tree of grammar files.

/// A whole grammar file.
#[derive(Debug, Default)]
#[non_exhaustive]
pub struct Document {
    /// The production-line count written on the first line, if any.
    pub count: Option<usize>,
    pub rules: Vec<RuleLine>,
}

/// A line of the form `A -> X Y | Z | e`.
#[derive(Debug)]
#[non_exhaustive]
pub struct RuleLine {
    /// 1-based line number.
    pub line: u32,
    pub left: String,
    /// The alternatives in written order; the epsilon alternative is empty.
    pub alternatives: Vec<Vec<String>>,
}
