//! Abstract syntax tree for SCSS source.
//!
//! A closed tagged union: every node kind the parser can produce has a
//! variant here, so the processor and code generator match exhaustively
//! with no fallthrough paths. `StyleSheet` is always the tree root, and
//! every child list preserves source order.

/// A node in the SCSS syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// The root of a parsed document
    StyleSheet { children: Vec<Node> },
    /// `selector { ... }`; selector text is kept verbatim (with `&`,
    /// commas, and interpolation intact) until semantic processing
    RuleSet {
        selector: String,
        children: Vec<Node>,
        line: usize,
        column: usize,
    },
    /// `property: value;`
    Declaration {
        property: String,
        value: String,
        line: usize,
        column: usize,
    },
    /// `$name: value;`
    Variable {
        name: String,
        value: String,
        line: usize,
        column: usize,
    },
    /// `@name params;` or `@name params { ... }`. Mixin definitions and
    /// `@include` travel through this variant, distinguished by `name`.
    AtRule {
        name: String,
        params: String,
        children: Option<Vec<Node>>,
        line: usize,
        column: usize,
    },
    /// `/* ... */`, delimiters included
    Comment { text: String },
    /// A bare `#{...}` block at statement position, forwarded as-is
    Interpolation {
        expr: String,
        line: usize,
        column: usize,
    },
}

impl Node {
    /// The children of this node, if it is a container.
    pub fn children(&self) -> Option<&[Node]> {
        match self {
            Node::StyleSheet { children } => Some(children),
            Node::RuleSet { children, .. } => Some(children),
            Node::AtRule { children, .. } => children.as_deref(),
            _ => None,
        }
    }
}
