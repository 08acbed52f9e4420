//! scssc CLI - compile one SCSS file to CSS.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use scssc_core::{Compiler, CompilerOptions, ImportResolver};

#[derive(Parser)]
#[command(name = "scssc")]
#[command(version)]
#[command(about = "Compile SCSS to CSS", long_about = None)]
struct Cli {
    /// Input .scss file
    input: PathBuf,

    /// Write output to FILE instead of stdout
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Emit minified CSS
    #[arg(long)]
    minify: bool,

    /// Fail on unresolved variables and unknown functions
    #[arg(long)]
    strict: bool,

    /// Report lint findings as warnings
    #[arg(long)]
    lint: bool,

    /// Additional directory to search for @import (repeatable)
    #[arg(short = 'I', long = "import-path")]
    import_paths: Vec<PathBuf>,

    /// Predefine a global variable (KEY=VALUE, repeatable)
    #[arg(short = 'D', long = "define")]
    defines: Vec<String>,

    /// Increase log verbosity (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Resolves `@import` paths against the input file's directory and any
/// `-I` directories, probing `name`, `name.scss`, and `_name.scss` (the
/// SASS partial convention) in that order.
struct FsImportResolver {
    roots: Vec<PathBuf>,
}

impl ImportResolver for FsImportResolver {
    fn resolve(&self, path: &str) -> Option<String> {
        for root in &self.roots {
            let logical = root.join(path);
            for candidate in candidates(&logical) {
                if let Ok(source) = std::fs::read_to_string(&candidate) {
                    tracing::debug!(path, file = %candidate.display(), "resolved import");
                    return Some(source);
                }
            }
        }
        None
    }
}

fn candidates(logical: &Path) -> Vec<PathBuf> {
    let mut out = vec![logical.to_path_buf()];
    if logical.extension().is_none() {
        out.push(logical.with_extension("scss"));
        if let Some(name) = logical.file_name().and_then(|n| n.to_str()) {
            let partial = logical.with_file_name(format!("_{}.scss", name));
            out.push(partial);
        }
    }
    out
}

fn parse_defines(defines: &[String]) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();
    for define in defines {
        let Some((key, value)) = define.split_once('=') else {
            bail!("--define expects KEY=VALUE, got `{}`", define);
        };
        map.insert(
            key.trim_start_matches('$').to_string(),
            value.to_string(),
        );
    }
    Ok(map)
}

fn run(cli: Cli) -> Result<bool> {
    let source = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;

    let mut roots = Vec::new();
    if let Some(dir) = cli.input.parent() {
        roots.push(dir.to_path_buf());
    }
    roots.extend(cli.import_paths.iter().cloned());
    let resolver = FsImportResolver { roots };

    let options = CompilerOptions {
        minify: cli.minify,
        strict_mode: cli.strict,
        lint_on_compile: cli.lint,
        debug_mode: cli.verbose > 0,
        global_defines: parse_defines(&cli.defines)?,
        ..Default::default()
    };

    let result = Compiler::new(options)
        .with_resolver(&resolver)
        .compile(&source);

    for warning in &result.warnings {
        eprintln!("warning: {}", warning);
    }
    for error in &result.errors {
        eprintln!("error: {}: {}", cli.input.display(), error);
        if let Some(suggestion) = &error.suggestion {
            eprintln!("  hint: {}", suggestion);
        }
    }

    if result.succeeded() {
        match &cli.output {
            Some(path) => std::fs::write(path, &result.css)
                .with_context(|| format!("failed to write {}", path.display()))?,
            None => print!("{}", result.css),
        }
    }
    Ok(result.succeeded())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defines_parse_with_or_without_dollar() {
        let map = parse_defines(&["$brand=#336699".to_string(), "gap=4px".to_string()]).unwrap();
        assert_eq!(map["brand"], "#336699");
        assert_eq!(map["gap"], "4px");
        assert!(parse_defines(&["broken".to_string()]).is_err());
    }

    #[test]
    fn import_candidates_follow_the_partial_convention() {
        let paths = candidates(Path::new("lib/variables"));
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["lib/variables", "lib/variables.scss", "lib/_variables.scss"]);
    }

    #[test]
    fn explicit_extensions_are_not_rewritten() {
        let paths = candidates(Path::new("theme.scss"));
        assert_eq!(paths.len(), 1);
    }
}
