//! Import resolution.
//!
//! The compiler core owns no filesystem: an [`ImportResolver`] is a
//! collaborator that maps a logical path (e.g. `"variables"`) to source
//! text. Before semantic processing the engine expands every top-level
//! `@import "path";` by resolving, parsing, and splicing the imported
//! nodes in place, recursively. An in-progress path stack detects
//! cycles. Without a resolver configured, `@import` passes through to
//! the output as plain CSS.

use tracing::debug;

use crate::ast::Node;
use crate::error::{CompilerError, ErrorKind, Result};
use crate::lexer::Lexer;
use crate::parser::Parser;

/// Supplies source text for logical import paths.
pub trait ImportResolver {
    /// Source text for `path`, or `None` when the path is unknown.
    fn resolve(&self, path: &str) -> Option<String>;
}

/// A resolver over an in-memory path -> source map. Useful for tests and
/// for callers that manage sources themselves.
#[derive(Debug, Default)]
pub struct MemoryImportResolver {
    sources: std::collections::HashMap<String, String>,
}

impl MemoryImportResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, source: impl Into<String>) {
        self.sources.insert(path.into(), source.into());
    }
}

impl ImportResolver for MemoryImportResolver {
    fn resolve(&self, path: &str) -> Option<String> {
        self.sources.get(path).cloned()
    }
}

/// Expand top-level `@import` nodes in place.
pub fn expand_imports(
    children: Vec<Node>,
    resolver: &dyn ImportResolver,
    import_paths: &[String],
) -> Result<Vec<Node>> {
    let mut stack = Vec::new();
    expand(children, resolver, import_paths, &mut stack)
}

fn expand(
    children: Vec<Node>,
    resolver: &dyn ImportResolver,
    import_paths: &[String],
    stack: &mut Vec<String>,
) -> Result<Vec<Node>> {
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        match child {
            Node::AtRule {
                ref name,
                ref params,
                children: None,
                line,
                column,
            } if name == "import" => {
                let path = unquote(params);
                let (hit, source) = lookup(resolver, import_paths, &path).ok_or_else(|| {
                    CompilerError::new(
                        ErrorKind::ImportResolutionFailed,
                        format!("cannot resolve `@import \"{}\"`", path),
                    )
                    .at(line, column)
                    .with_suggestion("check the path and the configured importPaths")
                })?;
                if stack.contains(&hit) {
                    return Err(CompilerError::new(
                        ErrorKind::CircularDependency,
                        format!(
                            "circular import of `{}` (chain: {} -> {})",
                            hit,
                            stack.join(" -> "),
                            hit
                        ),
                    )
                    .at(line, column));
                }
                debug!(path = %hit, depth = stack.len(), "expanding import");
                let tokens = Lexer::new(&source).tokenize()?;
                let Node::StyleSheet { children: imported } = Parser::new(tokens).parse()? else {
                    unreachable!("parser always returns a StyleSheet");
                };
                stack.push(hit);
                let expanded = expand(imported, resolver, import_paths, stack)?;
                stack.pop();
                out.extend(expanded);
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

/// Try the path as given, then under each configured import prefix.
/// Returns the key that hit, for cycle bookkeeping.
fn lookup(
    resolver: &dyn ImportResolver,
    import_paths: &[String],
    path: &str,
) -> Option<(String, String)> {
    if let Some(source) = resolver.resolve(path) {
        return Some((path.to_string(), source));
    }
    for prefix in import_paths {
        let candidate = format!("{}/{}", prefix.trim_end_matches('/'), path);
        if let Some(source) = resolver.resolve(&candidate) {
            return Some((candidate, source));
        }
    }
    None
}

fn unquote(params: &str) -> String {
    params
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Vec<Node> {
        let Node::StyleSheet { children } =
            Parser::new(Lexer::new(src).tokenize().unwrap()).parse().unwrap()
        else {
            unreachable!()
        };
        children
    }

    #[test]
    fn imports_are_spliced_in_place() {
        let mut resolver = MemoryImportResolver::new();
        resolver.insert("variables", "$x: 1px;");
        let nodes = parse("@import \"variables\"; .a { width: $x; }");
        let expanded = expand_imports(nodes, &resolver, &[]).unwrap();
        assert!(matches!(&expanded[0], Node::Variable { name, .. } if name == "x"));
        assert!(matches!(&expanded[1], Node::RuleSet { .. }));
    }

    #[test]
    fn import_paths_are_tried_as_prefixes() {
        let mut resolver = MemoryImportResolver::new();
        resolver.insert("lib/mixins", "@mixin m { color: red; }");
        let nodes = parse("@import \"mixins\";");
        let expanded =
            expand_imports(nodes, &resolver, &["lib/".to_string()]).unwrap();
        assert!(matches!(&expanded[0], Node::AtRule { name, .. } if name == "mixin"));
    }

    #[test]
    fn unresolved_import_fails() {
        let resolver = MemoryImportResolver::new();
        let err = expand_imports(parse("@import \"nope\";"), &resolver, &[]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ImportResolutionFailed);
        assert_eq!(err.line, Some(1));
    }

    #[test]
    fn circular_imports_are_detected() {
        let mut resolver = MemoryImportResolver::new();
        resolver.insert("a", "@import \"b\";");
        resolver.insert("b", "@import \"a\";");
        let err = expand_imports(parse("@import \"a\";"), &resolver, &[]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::CircularDependency);
        assert!(err.message.contains("a -> b"));
    }

    #[test]
    fn nested_imports_expand_transitively() {
        let mut resolver = MemoryImportResolver::new();
        resolver.insert("a", "@import \"b\"; .a { x: y; }");
        resolver.insert("b", "$deep: 1;");
        let expanded = expand_imports(parse("@import \"a\";"), &resolver, &[]).unwrap();
        assert!(matches!(&expanded[0], Node::Variable { name, .. } if name == "deep"));
        assert!(matches!(&expanded[1], Node::RuleSet { .. }));
    }
}
