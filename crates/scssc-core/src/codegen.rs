//! CSS serialization of processed nodes.
//!
//! Deterministic and order-preserving. Pretty mode indents with two
//! spaces, one declaration per line, a blank line between top-level
//! nodes; minified mode emits no whitespace at all. Rules that carry no
//! declarations are skipped. Comments survive pretty output and are
//! dropped when minifying.

use crate::processor::{ProcessedAtRule, ProcessedNode, ProcessedRule};

/// Serializer for processed nodes.
pub struct CodeGenerator {
    minify: bool,
}

impl CodeGenerator {
    pub fn new(minify: bool) -> Self {
        Self { minify }
    }

    /// Serialize an ordered processed-node sequence into CSS text.
    pub fn generate(&self, nodes: &[ProcessedNode]) -> String {
        let mut blocks = Vec::new();
        for node in nodes {
            if let Some(block) = self.render_node(node, 0) {
                blocks.push(block);
            }
        }
        if self.minify {
            blocks.join("")
        } else if blocks.is_empty() {
            String::new()
        } else {
            let mut out = blocks.join("\n\n");
            out.push('\n');
            out
        }
    }

    fn render_node(&self, node: &ProcessedNode, depth: usize) -> Option<String> {
        match node {
            ProcessedNode::Rule(rule) => self.render_rule(rule, depth),
            ProcessedNode::AtRule(at_rule) => self.render_at_rule(at_rule, depth),
            ProcessedNode::Comment(text) => {
                if self.minify {
                    None
                } else {
                    Some(format!("{}{}", indent(depth), text))
                }
            }
        }
    }

    fn render_rule(&self, rule: &ProcessedRule, depth: usize) -> Option<String> {
        if rule.declarations.is_empty() {
            return None;
        }
        let mut out = String::new();
        if self.minify {
            out.push_str(&rule.selector);
            out.push('{');
            for decl in &rule.declarations {
                out.push_str(&decl.property);
                out.push(':');
                out.push_str(&decl.value);
                out.push(';');
            }
            out.push('}');
        } else {
            out.push_str(&indent(depth));
            out.push_str(&rule.selector);
            out.push_str(" {\n");
            for decl in &rule.declarations {
                out.push_str(&indent(depth + 1));
                out.push_str(&decl.property);
                out.push_str(": ");
                out.push_str(&decl.value);
                out.push_str(";\n");
            }
            out.push_str(&indent(depth));
            out.push('}');
        }
        Some(out)
    }

    fn render_at_rule(&self, at_rule: &ProcessedAtRule, depth: usize) -> Option<String> {
        let head = if at_rule.params.is_empty() {
            format!("@{}", at_rule.name)
        } else {
            format!("@{} {}", at_rule.name, at_rule.params)
        };
        let Some(children) = &at_rule.children else {
            // Leaf at-rule: a single terminated statement
            return Some(if self.minify {
                format!("{};", head)
            } else {
                format!("{}{};", indent(depth), head)
            });
        };

        let mut inner_blocks = Vec::new();
        if !at_rule.declarations.is_empty() {
            // Directly-owned declarations, as in @font-face
            let owned = ProcessedRule {
                selector: String::new(),
                declarations: at_rule.declarations.clone(),
            };
            inner_blocks.push(self.render_declarations_only(&owned, depth + 1));
        }
        for child in children {
            if let Some(block) = self.render_node(child, depth + 1) {
                inner_blocks.push(block);
            }
        }

        Some(if self.minify {
            format!("{}{{{}}}", head, inner_blocks.join(""))
        } else if inner_blocks.is_empty() {
            format!("{}{} {{}}", indent(depth), head)
        } else {
            format!(
                "{}{} {{\n{}\n{}}}",
                indent(depth),
                head,
                inner_blocks.join("\n\n"),
                indent(depth)
            )
        })
    }

    fn render_declarations_only(&self, rule: &ProcessedRule, depth: usize) -> String {
        let mut out = String::new();
        if self.minify {
            for decl in &rule.declarations {
                out.push_str(&decl.property);
                out.push(':');
                out.push_str(&decl.value);
                out.push(';');
            }
        } else {
            for (i, decl) in rule.declarations.iter().enumerate() {
                if i > 0 {
                    out.push('\n');
                }
                out.push_str(&indent(depth));
                out.push_str(&decl.property);
                out.push_str(": ");
                out.push_str(&decl.value);
                out.push(';');
            }
        }
        out
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}
