use anyhow::{Context, Result};
use ariadne::{Color, Label, Report, ReportKind, Source};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use spx_ast::{FileId, Range};
use spx_driver::{CompileCache, Diagnostic, DiskFs, EngineConfig, RefKind, Severity};
use spx_lexer::{Lexer, TokenKind};

#[derive(Parser)]
#[command(
    name = "spxls",
    version = "0.1.0",
    about = "Semantic checks for spx game projects",
    long_about = "Parses and type checks an spx project, then validates its\nreferences to sounds, sprites, backdrops and widgets."
)]
struct Cli {
    /// Engine configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a project directory and report diagnostics
    Check {
        /// Project directory
        dir: PathBuf,
    },

    /// List resource references found in a project
    Refs {
        /// Project directory
        dir: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Lex an spx file and show tokens (debug)
    Lex {
        /// Input spx file
        input: PathBuf,

        /// Show token positions
        #[arg(short, long)]
        positions: bool,
    },

    /// Parse an spx file and show the AST (debug)
    Parse {
        /// Input spx file
        input: PathBuf,

        /// Pretty print the AST
        #[arg(short, long)]
        pretty: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Check { dir } => check_command(&dir, cli.config.as_deref()),
        Commands::Refs { dir, json } => refs_command(&dir, cli.config.as_deref(), json),
        Commands::Lex { input, positions } => lex_command(&input, positions),
        Commands::Parse { input, pretty } => parse_command(&input, pretty),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_file(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn check_command(dir: &Path, config: Option<&Path>) -> Result<ExitCode> {
    let cache = CompileCache::new(load_config(config)?);
    let program = cache
        .get(&DiskFs::new(dir))
        .with_context(|| format!("compiling {}", dir.display()))?;

    let mut count = 0;
    for (path, diagnostics) in program.diagnostics() {
        let Some(file) = program.file(path) else {
            continue;
        };
        for diagnostic in diagnostics {
            report_diagnostic(path, &file.text, diagnostic);
            count += 1;
        }
    }

    if program.has_errors() {
        eprintln!("{} diagnostic(s), check failed", count);
        return Ok(ExitCode::FAILURE);
    }
    println!("Check passed ({} warning(s))", count);
    Ok(ExitCode::SUCCESS)
}

#[derive(Serialize)]
struct RefRecord<'a> {
    uri: String,
    path: &'a str,
    range: Range,
    kind: RefKind,
}

fn refs_command(dir: &Path, config: Option<&Path>, json: bool) -> Result<ExitCode> {
    let cache = CompileCache::new(load_config(config)?);
    let program = cache
        .get(&DiskFs::new(dir))
        .with_context(|| format!("compiling {}", dir.display()))?;

    let mut records = Vec::new();
    for reference in program.resource_references() {
        let Some(file) = program.file_by_id(reference.span.file_id) else {
            continue;
        };
        records.push(RefRecord {
            uri: reference.id.uri(),
            path: &file.path,
            range: file.range_of(reference.span),
            kind: reference.kind,
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        println!("resource root: {}", program.resource_root());
        for r in &records {
            println!(
                "{}:{}:{}  {:<22} {}",
                r.path,
                r.range.start.line + 1,
                r.range.start.character + 1,
                r.kind,
                r.uri
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn lex_command(input: &Path, positions: bool) -> Result<ExitCode> {
    let source = read_source_file(input)?;
    let filename = input.to_string_lossy().to_string();
    let tokens = Lexer::new(&source).tokenize();

    println!("Tokens for {}:\n", filename);
    println!("{}", "=".repeat(80));
    for (i, token) in tokens.iter().enumerate() {
        if token.kind == TokenKind::Eof {
            println!("\n{:4} | {:?}", i, token.kind);
            break;
        }
        if positions {
            println!(
                "{:4} | {:20?} | {:?} | {}..{}",
                i, token.kind, token.value, token.span.start, token.span.end
            );
        } else {
            println!("{:4} | {:20?} | {:?}", i, token.kind, token.value);
        }
    }
    println!("{}", "=".repeat(80));
    println!("\nTotal tokens: {}", tokens.len());

    let errors: Vec<_> = tokens.iter().filter(|t| t.kind == TokenKind::Error).collect();
    if errors.is_empty() {
        return Ok(ExitCode::SUCCESS);
    }
    println!("\nLexer errors found: {}", errors.len());
    for token in errors {
        report_error("Lexical error", &token.value, token.span.start, token.span.end, &filename, &source);
    }
    Ok(ExitCode::FAILURE)
}

fn parse_command(input: &Path, pretty: bool) -> Result<ExitCode> {
    let source = read_source_file(input)?;
    let filename = input.to_string_lossy().to_string();
    let (file, errors) = spx_parser::parse_file(FileId(0), &filename, &source);

    if pretty {
        println!("{:#?}", file);
    } else {
        println!("{:?}", file);
    }
    if errors.is_empty() {
        return Ok(ExitCode::SUCCESS);
    }
    for err in &errors {
        report_error("Parse error", &err.message, err.span.start, err.span.end, &filename, &source);
    }
    Ok(ExitCode::FAILURE)
}

fn read_source_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn report_diagnostic(filename: &str, source: &str, diagnostic: &Diagnostic) {
    let (kind, color) = match diagnostic.severity {
        Severity::Error => (ReportKind::Error, Color::Red),
        Severity::Warning => (ReportKind::Warning, Color::Yellow),
    };
    let span = (filename, diagnostic.span.start..diagnostic.span.end.max(diagnostic.span.start));
    let _ = Report::build(kind, span.clone())
        .with_message(&diagnostic.message)
        .with_label(Label::new(span).with_message(&diagnostic.message).with_color(color))
        .finish()
        .eprint((filename, Source::from(source)));
}

fn report_error(title: &str, message: &str, start: usize, end: usize, filename: &str, source: &str) {
    let span = (filename, start..end);
    let _ = Report::build(ReportKind::Error, span.clone())
        .with_message(title)
        .with_label(Label::new(span).with_message(message).with_color(Color::Red))
        .finish()
        .eprint((filename, Source::from(source)));
}
