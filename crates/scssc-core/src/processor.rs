//! Semantic processing: scoping, mixin expansion, selector flattening.
//!
//! The processor walks the AST with three pieces of per-invocation state:
//! a scope chain for `$variables`, a mixin registry, and a parent-selector
//! stack (pushed on rule entry, popped on exit). It produces a flat
//! sequence of processed rule/at-rule nodes for the code generator. All
//! state lives inside the processor value, is built fresh per compile
//! call, and is discarded at its end.
//!
//! Mixin inclusion is a true tree rewrite: the body of an `@include` is
//! inlined into the including rule before flattening, so its declarations
//! land in that rule's declaration list and nested rule sets are
//! processed under the current parent path.
//!
//! Failure semantics are fail-fast: the first error aborts processing for
//! the whole compile call.

use std::collections::HashMap;

use tracing::debug;

use crate::ast::Node;
use crate::error::{CompilerError, ErrorKind, Result};
use crate::scope::ScopeChain;
use crate::value;

/// A resolved `property: value` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedDeclaration {
    pub property: String,
    pub value: String,
}

/// A flattened rule with a fully-resolved selector.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedRule {
    pub selector: String,
    pub declarations: Vec<ProcessedDeclaration>,
}

/// A processed at-rule. Directly-owned declarations (`@font-face`) and
/// nested rules (`@media`) are kept separately.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedAtRule {
    pub name: String,
    pub params: String,
    pub declarations: Vec<ProcessedDeclaration>,
    pub children: Option<Vec<ProcessedNode>>,
}

/// Output nodes consumed only by the code generator.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessedNode {
    Rule(ProcessedRule),
    AtRule(ProcessedAtRule),
    Comment(String),
}

/// A registered `@mixin`: positional parameter names plus the body AST.
/// Lives for one compile invocation only.
#[derive(Debug, Clone)]
pub struct MixinDefinition {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Node>,
}

/// Processing result: output nodes plus non-fatal warnings.
#[derive(Debug)]
pub struct ProcessOutput {
    pub nodes: Vec<ProcessedNode>,
    pub warnings: Vec<String>,
}

/// AST transformer. Construct one per compile call.
pub struct SemanticProcessor {
    strict: bool,
    scopes: ScopeChain,
    mixins: HashMap<String, MixinDefinition>,
    parents: Vec<String>,
    warnings: Vec<String>,
}

fn locate(mut e: CompilerError, line: usize, column: usize) -> CompilerError {
    if e.line.is_none() {
        e.line = Some(line);
        e.column = Some(column);
    }
    e
}

impl SemanticProcessor {
    pub fn new(strict: bool, global_defines: &HashMap<String, String>) -> Self {
        Self {
            strict,
            scopes: ScopeChain::new(global_defines.clone()),
            mixins: HashMap::new(),
            parents: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Process a parsed stylesheet into flattened output nodes.
    pub fn process(mut self, root: &Node) -> Result<ProcessOutput> {
        let Node::StyleSheet { children } = root else {
            return Err(CompilerError::new(
                ErrorKind::Unknown,
                "processor input must be a StyleSheet node",
            ));
        };
        let mut nodes = Vec::new();
        self.process_statements(children, &mut nodes)?;
        Ok(ProcessOutput {
            nodes,
            warnings: self.warnings,
        })
    }

    /// Statement position: top level, or the body of an at-rule after the
    /// parent stack has been reset.
    fn process_statements(&mut self, items: &[Node], out: &mut Vec<ProcessedNode>) -> Result<()> {
        for item in items {
            match item {
                Node::Variable {
                    name,
                    value,
                    line,
                    column,
                } => {
                    let resolved = self
                        .eval_value(value)
                        .map_err(|e| locate(e, *line, *column))?;
                    self.scopes.define(name.clone(), resolved);
                }
                Node::Comment { text } => out.push(ProcessedNode::Comment(text.clone())),
                Node::RuleSet {
                    selector,
                    children,
                    line,
                    column,
                } => self.process_rule_set(selector, children, *line, *column, out)?,
                Node::AtRule {
                    name,
                    params,
                    children,
                    line,
                    column,
                } => self.process_at_rule(name, params, children.as_deref(), *line, *column, None, out)?,
                Node::Declaration { property, line, .. } => {
                    self.warnings.push(format!(
                        "declaration `{}` outside of a rule was ignored (line {})",
                        property, line
                    ));
                }
                Node::Interpolation { line, .. } => {
                    self.warnings.push(format!(
                        "interpolation at statement position has no effect (line {})",
                        line
                    ));
                }
                Node::StyleSheet { .. } => {
                    return Err(CompilerError::new(
                        ErrorKind::Unknown,
                        "nested StyleSheet node",
                    ));
                }
            }
        }
        Ok(())
    }

    fn process_rule_set(
        &mut self,
        selector: &str,
        children: &[Node],
        line: usize,
        column: usize,
        out: &mut Vec<ProcessedNode>,
    ) -> Result<()> {
        let resolved = self
            .resolve_selector(selector)
            .map_err(|e| locate(e, line, column))?;
        self.parents.push(resolved.clone());
        self.scopes.push();

        let mut rule = ProcessedRule {
            selector: resolved,
            declarations: Vec::new(),
        };
        // Nested rules and at-rules are emitted after the owning rule
        let mut trailing = Vec::new();
        let result: Result<()> = children
            .iter()
            .try_for_each(|child| self.process_rule_child(child, &mut rule, &mut trailing));

        self.scopes.pop();
        self.parents.pop();
        result?;

        if !rule.declarations.is_empty() {
            debug!(selector = %rule.selector, declarations = rule.declarations.len(), "flattened rule");
            out.push(ProcessedNode::Rule(rule));
        }
        out.extend(trailing);
        Ok(())
    }

    fn process_rule_child(
        &mut self,
        child: &Node,
        rule: &mut ProcessedRule,
        trailing: &mut Vec<ProcessedNode>,
    ) -> Result<()> {
        match child {
            Node::Declaration {
                property,
                value,
                line,
                column,
            } => {
                let property = self
                    .substitute(property)
                    .map_err(|e| locate(e, *line, *column))?;
                let value = self
                    .eval_value(value)
                    .map_err(|e| locate(e, *line, *column))?;
                rule.declarations.push(ProcessedDeclaration { property, value });
                Ok(())
            }
            Node::Variable {
                name,
                value,
                line,
                column,
            } => {
                let resolved = self
                    .eval_value(value)
                    .map_err(|e| locate(e, *line, *column))?;
                self.scopes.define(name.clone(), resolved);
                Ok(())
            }
            Node::RuleSet {
                selector,
                children,
                line,
                column,
            } => self.process_rule_set(selector, children, *line, *column, trailing),
            Node::Comment { text } => {
                trailing.push(ProcessedNode::Comment(text.clone()));
                Ok(())
            }
            Node::AtRule {
                name,
                params,
                children,
                line,
                column,
            } => self.process_at_rule(
                name,
                params,
                children.as_deref(),
                *line,
                *column,
                Some(rule),
                trailing,
            ),
            Node::Interpolation { line, .. } => {
                self.warnings.push(format!(
                    "interpolation at statement position has no effect (line {})",
                    line
                ));
                Ok(())
            }
            Node::StyleSheet { .. } => Err(CompilerError::new(
                ErrorKind::Unknown,
                "nested StyleSheet node",
            )),
        }
    }

    /// Dispatch an at-rule. `rule` is the enclosing rule when the at-rule
    /// appears inside a rule body, used to inline `@include` output.
    fn process_at_rule(
        &mut self,
        name: &str,
        params: &str,
        children: Option<&[Node]>,
        line: usize,
        column: usize,
        rule: Option<&mut ProcessedRule>,
        out: &mut Vec<ProcessedNode>,
    ) -> Result<()> {
        match name {
            "mixin" => self.define_mixin(params, children, line, column),
            "include" => self.expand_include(params, line, column, rule, out),
            "use" => Err(CompilerError::new(
                ErrorKind::AtRuleNotSupported,
                "`@use` modules are not supported",
            )
            .at(line, column)
            .with_suggestion("use `@import` instead")),
            _ => self.process_generic_at_rule(name, params, children, line, column, out),
        }
    }

    fn define_mixin(
        &mut self,
        params: &str,
        children: Option<&[Node]>,
        line: usize,
        column: usize,
    ) -> Result<()> {
        let (name, param_names) =
            parse_mixin_head(params).map_err(|e| locate(e, line, column))?;
        debug!(mixin = %name, params = param_names.len(), "registered mixin");
        self.mixins.insert(
            name.clone(),
            MixinDefinition {
                name,
                params: param_names,
                body: children.map(<[Node]>::to_vec).unwrap_or_default(),
            },
        );
        Ok(())
    }

    fn expand_include(
        &mut self,
        params: &str,
        line: usize,
        column: usize,
        rule: Option<&mut ProcessedRule>,
        out: &mut Vec<ProcessedNode>,
    ) -> Result<()> {
        let (name, args_text) =
            parse_include_head(params).map_err(|e| locate(e, line, column))?;
        let Some(def) = self.mixins.get(&name).cloned() else {
            return Err(CompilerError::new(
                ErrorKind::MixinNotFound,
                format!("no mixin named `{}`", name),
            )
            .at(line, column)
            .with_suggestion(format!("define it with `@mixin {} {{ ... }}` before including", name)));
        };
        // Arguments are evaluated in the calling scope, then bound
        // positionally into a private scope for the body
        let mut args = Vec::new();
        for arg in split_top_level_commas(&args_text) {
            args.push(self.eval_value(arg.trim()).map_err(|e| locate(e, line, column))?);
        }
        if args.len() > def.params.len() {
            return Err(CompilerError::new(
                ErrorKind::Unknown,
                format!(
                    "mixin `{}` takes {} argument(s), got {}",
                    name,
                    def.params.len(),
                    args.len()
                ),
            )
            .at(line, column));
        }
        self.scopes.push();
        for (param, arg) in def.params.iter().zip(args) {
            self.scopes.define(param.clone(), arg);
        }
        let result = match rule {
            Some(rule) => def
                .body
                .iter()
                .try_for_each(|child| self.process_rule_child(child, rule, out)),
            None => self.process_statements(&def.body, out),
        };
        self.scopes.pop();
        result
    }

    /// `@media`, `@keyframes`, `@supports`, `@font-face`, ... Parameters
    /// get variable substitution; a body establishes a fresh nesting
    /// context, so the parent-selector stack is reset while the children
    /// are processed.
    fn process_generic_at_rule(
        &mut self,
        name: &str,
        params: &str,
        children: Option<&[Node]>,
        line: usize,
        column: usize,
        out: &mut Vec<ProcessedNode>,
    ) -> Result<()> {
        let params = self
            .substitute(params)
            .map_err(|e| locate(e, line, column))?;
        let Some(children) = children else {
            out.push(ProcessedNode::AtRule(ProcessedAtRule {
                name: name.to_string(),
                params,
                declarations: Vec::new(),
                children: None,
            }));
            return Ok(());
        };

        let saved_parents = std::mem::take(&mut self.parents);
        self.scopes.push();
        let body = self.process_at_rule_body(children);
        self.scopes.pop();
        self.parents = saved_parents;
        let (declarations, nodes) = body?;

        out.push(ProcessedNode::AtRule(ProcessedAtRule {
            name: name.to_string(),
            params,
            declarations,
            children: Some(nodes),
        }));
        Ok(())
    }

    /// An at-rule body may directly own declarations (`@font-face`) as
    /// well as nested rules (`@media`, `@keyframes`).
    fn process_at_rule_body(
        &mut self,
        children: &[Node],
    ) -> Result<(Vec<ProcessedDeclaration>, Vec<ProcessedNode>)> {
        let mut declarations = Vec::new();
        let mut nodes = Vec::new();
        for child in children {
            match child {
                Node::Declaration {
                    property,
                    value,
                    line,
                    column,
                } => {
                    let property = self
                        .substitute(property)
                        .map_err(|e| locate(e, *line, *column))?;
                    let value = self
                        .eval_value(value)
                        .map_err(|e| locate(e, *line, *column))?;
                    declarations.push(ProcessedDeclaration { property, value });
                }
                other => self.process_statements(std::slice::from_ref(other), &mut nodes)?,
            }
        }
        Ok((declarations, nodes))
    }

    /// Combine a selector with the top of the parent stack. `&` is
    /// replaced by the full parent path; otherwise the join is a space
    /// join (which also covers selectors beginning with a combinator).
    /// Comma-separated lists are resolved branch by branch against every
    /// parent branch, then rejoined.
    fn resolve_selector(&mut self, selector: &str) -> Result<String> {
        let selector = self.substitute(selector)?;
        let parent_branches: Vec<String> = match self.parents.last() {
            Some(parent) => parent.split(',').map(|p| p.trim().to_string()).collect(),
            None => Vec::new(),
        };
        let mut resolved = Vec::new();
        for branch in selector.split(',') {
            let branch = branch.trim();
            if branch.is_empty() {
                return Err(CompilerError::new(
                    ErrorKind::SelectorParsingError,
                    format!("empty branch in selector list `{}`", selector),
                ));
            }
            if parent_branches.is_empty() {
                if branch.contains('&') {
                    return Err(CompilerError::new(
                        ErrorKind::SelectorParsingError,
                        "`&` used outside of a nested rule",
                    ));
                }
                resolved.push(branch.to_string());
            } else {
                for parent in &parent_branches {
                    if branch.contains('&') {
                        resolved.push(branch.replace('&', parent));
                    } else {
                        resolved.push(format!("{} {}", parent, branch));
                    }
                }
            }
        }
        Ok(resolved.join(", "))
    }

    /// Variable substitution plus interpolation splicing, no arithmetic.
    /// Used for selectors, property names, and at-rule parameters.
    fn substitute(&mut self, text: &str) -> Result<String> {
        let text = self.interpolate(text)?;
        self.substitute_vars(&text)
    }

    /// Full value evaluation: interpolation, variable substitution, then
    /// a single typed-expression pass.
    fn eval_value(&mut self, text: &str) -> Result<String> {
        let text = self.interpolate(text)?;
        let text = self.substitute_vars(&text)?;
        value::evaluate(&text, self.strict)
    }

    /// Evaluate every `#{...}` block and splice the result in place.
    fn interpolate(&mut self, text: &str) -> Result<String> {
        if !text.contains("#{") {
            return Ok(text.to_string());
        }
        let mut out = String::new();
        let mut rest = text;
        while let Some(start) = rest.find("#{") {
            out.push_str(&rest[..start]);
            let inner_start = start + 2;
            let mut depth = 1usize;
            let mut close = None;
            for (i, c) in rest[inner_start..].char_indices() {
                match c {
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            close = Some(inner_start + i);
                            break;
                        }
                    }
                    _ => {}
                }
            }
            let Some(close) = close else {
                return Err(CompilerError::new(
                    ErrorKind::SyntaxError,
                    "unterminated interpolation block",
                ));
            };
            let evaluated = self.eval_value(&rest[inner_start..close])?;
            out.push_str(&evaluated);
            rest = &rest[close + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }

    /// Replace `$name` references by identifier-boundary scanning, so a
    /// binding for `$x` never corrupts `$xs`. Unresolved names pass
    /// through literally, or fail in strict mode.
    fn substitute_vars(&mut self, text: &str) -> Result<String> {
        if !text.contains('$') {
            return Ok(text.to_string());
        }
        let mut out = String::new();
        let mut chars = text.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c != '$' {
                out.push(c);
                continue;
            }
            let name_start = i + 1;
            let mut name_end = name_start;
            while let Some((j, nc)) = chars.peek().copied() {
                if nc.is_alphanumeric() || nc == '-' || nc == '_' {
                    chars.next();
                    name_end = j + nc.len_utf8();
                } else {
                    break;
                }
            }
            if name_end == name_start {
                out.push('$');
                continue;
            }
            let name = &text[name_start..name_end];
            match self.scopes.lookup(name) {
                Some(value) => out.push_str(value),
                None if self.strict => {
                    return Err(CompilerError::new(
                        ErrorKind::VariableNotDefined,
                        format!("variable `${}` is not defined", name),
                    )
                    .with_suggestion(format!("declare `${}: ...;` before this point", name)));
                }
                None => {
                    out.push('$');
                    out.push_str(name);
                }
            }
        }
        Ok(out)
    }
}

/// `name($a, $b)` -> ("name", ["a", "b"]); a bare `name` has no params.
fn parse_mixin_head(params: &str) -> Result<(String, Vec<String>)> {
    let (name, args) = match params.find('(') {
        Some(open) => {
            let close = params.rfind(')').filter(|close| *close > open).ok_or_else(|| {
                CompilerError::new(
                    ErrorKind::SyntaxError,
                    format!("malformed mixin head `{}`: expected `(params)`", params),
                )
            })?;
            (params[..open].trim(), params[open + 1..close].trim())
        }
        None => (params.trim(), ""),
    };
    if name.is_empty() {
        return Err(CompilerError::new(
            ErrorKind::SyntaxError,
            "mixin definition is missing a name",
        ));
    }
    let mut names = Vec::new();
    for param in split_top_level_commas(args) {
        let param = param.trim();
        if param.is_empty() {
            continue;
        }
        let Some(name) = param.strip_prefix('$') else {
            return Err(CompilerError::new(
                ErrorKind::SyntaxError,
                format!("mixin parameter `{}` must be a `$variable`", param),
            ));
        };
        names.push(name.to_string());
    }
    Ok((name.to_string(), names))
}

/// `name(values)` -> ("name", "values"); a bare `name` has no arguments.
fn parse_include_head(params: &str) -> Result<(String, String)> {
    match params.find('(') {
        Some(open) => {
            let close = params.rfind(')').filter(|close| *close > open).ok_or_else(|| {
                CompilerError::new(
                    ErrorKind::SyntaxError,
                    format!("malformed include `{}`: expected `(args)`", params),
                )
            })?;
            Ok((
                params[..open].trim().to_string(),
                params[open + 1..close].to_string(),
            ))
        }
        None => {
            let name = params.trim();
            if name.is_empty() {
                return Err(CompilerError::new(
                    ErrorKind::SyntaxError,
                    "`@include` is missing a mixin name",
                ));
            }
            Ok((name.to_string(), String::new()))
        }
    }
}

/// Split on commas that are not nested inside parentheses.
fn split_top_level_commas(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < text.len() {
        parts.push(&text[start..]);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn process(src: &str) -> Vec<ProcessedNode> {
        process_with(src, false).unwrap().nodes
    }

    fn process_with(src: &str, strict: bool) -> Result<ProcessOutput> {
        let ast = Parser::new(Lexer::new(src).tokenize().unwrap())
            .parse()
            .unwrap();
        SemanticProcessor::new(strict, &HashMap::new()).process(&ast)
    }

    fn rules(nodes: &[ProcessedNode]) -> Vec<&ProcessedRule> {
        nodes
            .iter()
            .filter_map(|n| match n {
                ProcessedNode::Rule(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn nesting_flattens_to_descendant_selectors() {
        let nodes = process(".a { .b { color: red; } }");
        let rules = rules(&nodes);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].selector, ".a .b");
        assert_eq!(
            rules[0].declarations,
            vec![ProcessedDeclaration {
                property: "color".into(),
                value: "red".into()
            }]
        );
    }

    #[test]
    fn parent_reference_splices_the_full_path() {
        let nodes = process(".a { &:hover { color: red; } }");
        assert_eq!(rules(&nodes)[0].selector, ".a:hover");
    }

    #[test]
    fn comma_lists_resolve_branch_by_branch() {
        let nodes = process(".a, .b { .c { color: red; } }");
        assert_eq!(rules(&nodes)[0].selector, ".a .c, .b .c");
    }

    #[test]
    fn combinator_selectors_space_join() {
        let nodes = process(".a { > .b { color: red; } }");
        assert_eq!(rules(&nodes)[0].selector, ".a > .b");
    }

    #[test]
    fn parent_rule_is_emitted_before_nested_rules() {
        let nodes = process(".a { color: red; .b { color: blue; } }");
        let rules = rules(&nodes);
        assert_eq!(rules[0].selector, ".a");
        assert_eq!(rules[1].selector, ".a .b");
    }

    #[test]
    fn variables_resolve_with_lexical_shadowing() {
        let nodes = process("$x: 10px; .a { width: $x; .b { $x: 20px; width: $x; } }");
        let rules = rules(&nodes);
        assert_eq!(rules[0].declarations[0].value, "10px");
        assert_eq!(rules[1].declarations[0].value, "20px");
    }

    #[test]
    fn variable_names_do_not_collide_on_prefixes() {
        let nodes = process("$x: 1px; $xs: 2px; .a { margin: $xs $x; }");
        assert_eq!(rules(&nodes)[0].declarations[0].value, "2px 1px");
    }

    #[test]
    fn arithmetic_is_evaluated_in_values() {
        let nodes = process(".a { width: 2px * 3; }");
        assert_eq!(rules(&nodes)[0].declarations[0].value, "6px");
    }

    #[test]
    fn mixin_body_is_inlined_into_the_including_rule() {
        let nodes = process("@mixin m($v) { color: $v; } .a { @include m(blue); }");
        let rules = rules(&nodes);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].selector, ".a");
        assert_eq!(rules[0].declarations[0].value, "blue");
    }

    #[test]
    fn mixin_nested_rules_use_the_including_parent() {
        let nodes =
            process("@mixin m { .icon { fill: red; } } .btn { color: blue; @include m; }");
        let rules = rules(&nodes);
        assert_eq!(rules[0].selector, ".btn");
        assert_eq!(rules[1].selector, ".btn .icon");
    }

    #[test]
    fn missing_mixin_is_an_error() {
        let err = process_with(".a { @include nope; }", false).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MixinNotFound);
        assert_eq!(err.line, Some(1));
    }

    #[test]
    fn media_blocks_reset_the_parent_stack() {
        let nodes = process(".a { @media screen { .b { color: red; } } }");
        let ProcessedNode::AtRule(media) = &nodes[0] else {
            panic!("expected @media, got {:?}", nodes[0]);
        };
        assert_eq!(media.name, "media");
        let inner = media.children.as_ref().unwrap();
        assert!(
            matches!(&inner[0], ProcessedNode::Rule(r) if r.selector == ".b"),
            "media children start a fresh nesting context"
        );
    }

    #[test]
    fn at_rule_params_get_variable_substitution() {
        let nodes = process("$bp: 600px; @media (min-width: $bp) { .a { x: y; } }");
        let ProcessedNode::AtRule(media) = &nodes[0] else {
            panic!();
        };
        assert_eq!(media.params, "(min-width: 600px)");
    }

    #[test]
    fn font_face_keeps_direct_declarations() {
        let nodes = process("@font-face { font-family: Inter; src: url(\"a.woff2\"); }");
        let ProcessedNode::AtRule(ff) = &nodes[0] else {
            panic!();
        };
        assert_eq!(ff.declarations.len(), 2);
    }

    #[test]
    fn interpolation_is_evaluated_in_properties_and_selectors() {
        let nodes = process("$side: left; $n: 2; .a { margin-#{$side}: 4px; }\n.col-#{$n} { width: 50%; }");
        let rules = rules(&nodes);
        assert_eq!(rules[0].declarations[0].property, "margin-left");
        assert_eq!(rules[1].selector, ".col-2");
    }

    #[test]
    fn unresolved_variable_passes_through_by_default() {
        let nodes = process(".a { width: $missing; }");
        assert_eq!(rules(&nodes)[0].declarations[0].value, "$missing");
    }

    #[test]
    fn unresolved_variable_fails_in_strict_mode() {
        let err = process_with(".a { width: $missing; }", true).unwrap_err();
        assert_eq!(err.kind, ErrorKind::VariableNotDefined);
        assert!(err.suggestion.is_some());
    }

    #[test]
    fn malformed_mixin_and_include_heads_are_syntax_errors() {
        // `)` before `(` in the head text must not slice out of order
        let err = process_with("@mixin m)x( { color: red; }", false).unwrap_err();
        assert_eq!(err.kind, ErrorKind::SyntaxError);
        let err = process_with(".a { @include m)x(; }", false).unwrap_err();
        assert_eq!(err.kind, ErrorKind::SyntaxError);
        assert_eq!(err.line, Some(1));
    }

    #[test]
    fn use_is_rejected() {
        let err = process_with("@use \"sass:math\";", false).unwrap_err();
        assert_eq!(err.kind, ErrorKind::AtRuleNotSupported);
    }

    #[test]
    fn ampersand_at_top_level_is_an_error() {
        let err = process_with("& { color: red; }", false).unwrap_err();
        assert_eq!(err.kind, ErrorKind::SelectorParsingError);
    }

    #[test]
    fn empty_rules_are_dropped_from_output() {
        let nodes = process(".a { .b { color: red; } }");
        assert_eq!(nodes.len(), 1, "the declaration-less `.a` rule is not emitted");
    }

    #[test]
    fn global_defines_seed_the_global_scope() {
        let ast = Parser::new(Lexer::new(".a { color: $brand; }").tokenize().unwrap())
            .parse()
            .unwrap();
        let defines = HashMap::from([("brand".to_string(), "#336699".to_string())]);
        let out = SemanticProcessor::new(false, &defines).process(&ast).unwrap();
        assert_eq!(rules(&out.nodes)[0].declarations[0].value, "#336699");
    }
}
