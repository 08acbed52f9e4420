//! Compilation orchestration.
//!
//! A [`Compiler`] value is constructed per `compile()` call and owns all
//! mutable state for that call, so concurrent compilations share nothing
//! but the immutable builtin registry. Stages run strictly in sequence
//! (`Idle -> Lexing -> Parsing -> Processing -> Generating -> Done`);
//! any stage failure transitions to `Failed`. The engine is the single
//! catch point: the public contract never returns an error to the
//! caller. A failed compile yields a result whose `css` is a fallback
//! comment and whose `errors` list is populated; stages after the
//! failing one do not run, so one primary error is reported.

use std::collections::HashMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ast::Node;
use crate::codegen::CodeGenerator;
use crate::error::{CompilerError, Result};
use crate::imports::{ImportResolver, expand_imports};
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::processor::SemanticProcessor;

/// Options for one compile call. Field names serialize in camelCase so
/// UI-layer collaborators can pass their options records verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompilerOptions {
    /// Emit minified CSS (no whitespace)
    pub minify: bool,
    /// Request a source map. Not implemented; requesting one produces a
    /// warning and `sourceMap: None`.
    pub source_map: bool,
    /// Raise tracing verbosity. Never affects the output bytes.
    pub debug_mode: bool,
    /// Fail on unresolved variables and unknown functions instead of
    /// passing them through literally
    pub strict_mode: bool,
    /// Run the lint pass and report findings as warnings
    pub lint_on_compile: bool,
    /// Accepted for interface compatibility; vendor prefixing is a
    /// consumer concern and the field is ignored
    pub browser_target: Vec<String>,
    /// Prefixes tried when resolving `@import` paths
    pub import_paths: Vec<String>,
    /// Seed values for the global variable scope
    pub global_defines: HashMap<String, String>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            minify: false,
            source_map: false,
            debug_mode: false,
            strict_mode: false,
            lint_on_compile: false,
            browser_target: Vec::new(),
            import_paths: Vec::new(),
            global_defines: HashMap::new(),
        }
    }
}

/// The engine's stage state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompileState {
    Idle,
    Lexing,
    Parsing,
    Processing,
    Generating,
    Done,
    Failed,
}

/// Wall-clock timings for the stages that actually ran, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub total_ms: f64,
    pub lex_ms: f64,
    pub parse_ms: f64,
    pub process_ms: f64,
    pub codegen_ms: f64,
}

/// What one compile call hands back. `state` is the terminal stage the
/// engine reached; `errors` is empty exactly when it is `Done`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilationResult {
    pub state: CompileState,
    pub css: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_map: Option<String>,
    pub errors: Vec<CompilerError>,
    pub warnings: Vec<String>,
    pub performance_metrics: PerformanceMetrics,
}

impl CompilationResult {
    pub fn succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}

/// One-shot compiler. Owns every registry and stack the pipeline needs,
/// all constructed fresh per call and discarded at its end.
pub struct Compiler<'a> {
    options: CompilerOptions,
    resolver: Option<&'a dyn ImportResolver>,
    state: CompileState,
}

/// Compile one source string with the given options. Never panics or
/// returns an error: failures are reported inside the result.
pub fn compile(source: &str, options: &CompilerOptions) -> CompilationResult {
    Compiler::new(options.clone()).compile(source)
}

impl<'a> Compiler<'a> {
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            options,
            resolver: None,
            state: CompileState::Idle,
        }
    }

    /// Attach an import-resolution collaborator for `@import` expansion.
    pub fn with_resolver(mut self, resolver: &'a dyn ImportResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Run the pipeline. The returned result always reflects a terminal
    /// state: `Done` with empty errors, or `Failed` with at least one.
    pub fn compile(mut self, source: &str) -> CompilationResult {
        let total = Instant::now();
        let mut metrics = PerformanceMetrics::default();
        let mut warnings = Vec::new();

        if self.options.source_map {
            warnings.push("source maps are not supported; `sourceMap` was ignored".to_string());
        }

        let outcome = self.run(source, &mut metrics, &mut warnings);
        metrics.total_ms = elapsed_ms(total);

        match outcome {
            Ok(css) => {
                self.state = CompileState::Done;
                debug!(total_ms = metrics.total_ms, "compilation finished");
                CompilationResult {
                    state: self.state,
                    css,
                    source_map: None,
                    errors: Vec::new(),
                    warnings,
                    performance_metrics: metrics,
                }
            }
            Err(error) => {
                self.state = CompileState::Failed;
                debug!(%error, "compilation failed");
                CompilationResult {
                    state: self.state,
                    css: format!("/* compilation failed: {} */", error),
                    source_map: None,
                    errors: vec![error],
                    warnings,
                    performance_metrics: metrics,
                }
            }
        }
    }

    fn run(
        &mut self,
        source: &str,
        metrics: &mut PerformanceMetrics,
        warnings: &mut Vec<String>,
    ) -> Result<String> {
        self.state = CompileState::Lexing;
        let stage = Instant::now();
        let tokens = Lexer::new(source).tokenize()?;
        metrics.lex_ms = elapsed_ms(stage);
        if self.options.debug_mode {
            debug!(tokens = tokens.len(), ms = metrics.lex_ms, "lexing done");
        }

        self.state = CompileState::Parsing;
        let stage = Instant::now();
        let ast = Parser::new(tokens).parse()?;
        metrics.parse_ms = elapsed_ms(stage);

        let Node::StyleSheet { children } = ast else {
            unreachable!("parser always returns a StyleSheet");
        };
        let children = match self.resolver {
            Some(resolver) => expand_imports(children, resolver, &self.options.import_paths)?,
            None => children,
        };
        let ast = Node::StyleSheet { children };

        if self.options.lint_on_compile {
            lint(&ast, warnings);
        }

        self.state = CompileState::Processing;
        let stage = Instant::now();
        let processor =
            SemanticProcessor::new(self.options.strict_mode, &self.options.global_defines);
        let output = processor.process(&ast)?;
        metrics.process_ms = elapsed_ms(stage);
        warnings.extend(output.warnings);

        self.state = CompileState::Generating;
        let stage = Instant::now();
        let css = CodeGenerator::new(self.options.minify).generate(&output.nodes);
        metrics.codegen_ms = elapsed_ms(stage);

        Ok(css)
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Lint pass over the parsed tree: empty rule sets and duplicate
/// properties within one rule body. Findings are warnings, never errors.
fn lint(node: &Node, warnings: &mut Vec<String>) {
    if let Node::RuleSet {
        selector,
        children,
        line,
        ..
    } = node
    {
        if children.is_empty() {
            warnings.push(format!("empty rule `{}` (line {})", selector, line));
        }
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for child in children {
            if let Node::Declaration { property, line, .. } = child {
                if let Some(first) = seen.insert(property.as_str(), *line) {
                    warnings.push(format!(
                        "duplicate property `{}` in `{}` (lines {} and {})",
                        property, selector, first, line
                    ));
                }
            }
        }
    }
    if let Some(children) = node.children() {
        for child in children {
            lint(child, warnings);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_deserialize_from_camel_case_json() {
        let options: CompilerOptions = serde_json::from_str(
            r##"{
                "minify": true,
                "strictMode": true,
                "lintOnCompile": true,
                "browserTarget": ["chrome"],
                "importPaths": ["lib"],
                "globalDefines": {"brand": "#336699"}
            }"##,
        )
        .unwrap();
        assert!(options.minify);
        assert!(options.strict_mode);
        assert_eq!(options.import_paths, vec!["lib"]);
        assert_eq!(options.global_defines["brand"], "#336699");
        // Unspecified fields take defaults
        assert!(!options.source_map);
    }

    #[test]
    fn result_serializes_metrics_in_camel_case() {
        let result = compile(".a { color: red; }", &CompilerOptions::default());
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["performanceMetrics"]["lexMs"].is_number());
        assert!(json.get("sourceMap").is_none());
    }

    #[test]
    fn results_carry_the_terminal_state() {
        let result = compile(".a { color: red; }", &CompilerOptions::default());
        assert_eq!(result.state, CompileState::Done);
        let result = compile(".a { color: red", &CompilerOptions::default());
        assert_eq!(result.state, CompileState::Failed);
        assert!(!result.succeeded());
    }

    #[test]
    fn lint_reports_empty_rules_and_duplicates() {
        let options = CompilerOptions {
            lint_on_compile: true,
            ..Default::default()
        };
        let result = compile(".a {}\n.b { color: red; color: blue; }", &options);
        assert!(result.succeeded());
        assert!(result.warnings.iter().any(|w| w.contains("empty rule `.a`")));
        assert!(
            result
                .warnings
                .iter()
                .any(|w| w.contains("duplicate property `color`"))
        );
    }

    #[test]
    fn source_map_request_warns() {
        let options = CompilerOptions {
            source_map: true,
            ..Default::default()
        };
        let result = compile(".a { color: red; }", &options);
        assert!(result.source_map.is_none());
        assert!(result.warnings[0].contains("source maps"));
    }
}
