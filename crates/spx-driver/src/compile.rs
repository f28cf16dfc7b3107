//! Building a [`Program`] from a workspace

use spx_ast::{File, FileId, LineIndex, Range};
use spx_parser::parse_file;
use spx_typeck::{check_package, CheckError, Importer, TypeError};
use std::collections::BTreeMap;
use std::io;
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, info, info_span};

use crate::config::EngineConfig;
use crate::diagnostic::{Diagnostic, DiagnosticSet};
use crate::inspector::Inspector;
use crate::program::{NodeTable, Program, SourceFile};
use crate::workspace::Workspace;

const SOURCE_EXT: &str = ".spx";

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("failed to list workspace files: {0}")]
    ListFiles(#[source] io::Error),
    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("no spx source files found")]
    NoSourceFiles,
    #[error(transparent)]
    Check(#[from] CheckError),
}

/// Source paths with their modification times, the cache key of a compile
pub type Snapshot = BTreeMap<String, SystemTime>;

/// Top-level `.spx` files of the workspace, sorted by path
pub fn source_paths(workspace: &dyn Workspace) -> Result<Vec<String>, CompileError> {
    let entries = workspace.read_dir(".").map_err(CompileError::ListFiles)?;
    let mut paths: Vec<String> = entries
        .into_iter()
        .filter(|e| !e.is_dir && e.name.ends_with(SOURCE_EXT))
        .map(|e| e.name)
        .collect();
    paths.sort();
    Ok(paths)
}

pub fn snapshot(workspace: &dyn Workspace) -> Result<Snapshot, CompileError> {
    source_paths(workspace)?
        .into_iter()
        .map(|path| match workspace.modified(&path) {
            Ok(mtime) => Ok((path, mtime)),
            Err(source) => Err(CompileError::ReadFile { path, source }),
        })
        .collect()
}

/// Parses, checks and inspects every source file of `workspace`.
///
/// Only a workspace without source files, an unreadable file or a missing
/// runtime package fail; everything else is reported as diagnostics.
pub fn compile(
    workspace: &dyn Workspace,
    importer: &dyn Importer,
    config: &EngineConfig,
) -> Result<Program, CompileError> {
    let span = info_span!("compile");
    let _enter = span.enter();

    let paths = source_paths(workspace)?;
    if paths.is_empty() {
        return Err(CompileError::NoSourceFiles);
    }

    let mut diagnostics = DiagnosticSet::new();
    let mut files = Vec::with_capacity(paths.len());
    for (index, path) in paths.into_iter().enumerate() {
        let file = load_source(workspace, FileId(index as u32), path, config, &mut diagnostics)?;
        files.push(file);
    }

    let entry = files
        .iter()
        .find(|f| f.included && base_name(&f.path) == config.entry_file)
        .map(|f| f.id);

    let mut program = Program {
        files,
        entry,
        first_var_block: None,
        nodes: NodeTable::default(),
        package: None,
        resource_root: config.resource_root_default.clone(),
        references: Vec::new(),
        sound_bindings: Default::default(),
        sprite_bindings: Default::default(),
        diagnostics,
    };
    let Some(entry) = entry else {
        debug!(entry = %config.entry_file, "no entry file; skipping type check");
        return Ok(program);
    };
    program.first_var_block = program.files[entry.0 as usize].ast.first_var_block().map(|d| d.id);

    let included: Vec<&File> = program.included_files().map(|f| &f.ast).collect();
    let mut type_errors: Vec<TypeError> = Vec::new();
    let package = check_package(&included, entry, importer, &mut |err: TypeError| type_errors.push(err))?;
    debug!(files = included.len(), errors = type_errors.len(), "type checked");

    for err in type_errors {
        let Some(file) = program.file_by_id(err.span.file_id) else {
            continue;
        };
        let diagnostic = Diagnostic::error(file.point_range(err.span), err.span, err.message);
        let path = file.path.clone();
        program.diagnostics.add(&path, diagnostic);
    }

    program.nodes = NodeTable::build(&program.files);
    let inspection = Inspector::new(
        &package,
        &program.files,
        &program.nodes,
        entry,
        workspace,
        &config.resource_root_default,
        &mut program.diagnostics,
    )
    .run();

    program.resource_root = inspection.resource_root;
    program.references = inspection.references;
    program.sound_bindings = inspection.sound_bindings;
    program.sprite_bindings = inspection.sprite_bindings;
    program.package = Some(package);

    info!(
        files = program.files.len(),
        references = program.references.len(),
        diagnostics = program.diagnostics.len(),
        "compiled"
    );
    Ok(program)
}

fn load_source(
    workspace: &dyn Workspace,
    id: FileId,
    path: String,
    config: &EngineConfig,
    diagnostics: &mut DiagnosticSet,
) -> Result<SourceFile, CompileError> {
    let bytes = match workspace.read_file(&path) {
        Ok(bytes) => bytes,
        Err(source) => return Err(CompileError::ReadFile { path, source }),
    };
    let text = String::from_utf8_lossy(&bytes).into_owned();
    let (ast, errors) = parse_file(id, &path, &text);
    let lines = LineIndex::new(&text);

    diagnostics.register(&path);
    for err in &errors {
        let pos = lines.position_of(err.span.start);
        let range = Range::new(pos, pos);
        diagnostics.add(&path, Diagnostic::error(range, err.span, err.message.clone()));
    }

    let included = errors.is_empty() && ast.package_name() == config.main_package;
    if !included {
        debug!(path = %path, syntax_errors = errors.len(), package = ast.package_name(), "excluded from check");
    }

    Ok(SourceFile {
        id,
        path,
        text,
        ast,
        lines,
        included,
    })
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::MapFs;
    use spx_typeck::PkgDataImporter;

    fn build(files: &[(&str, &str)]) -> Program {
        let fs = MapFs::with_files(files.iter().copied());
        compile(&fs, &PkgDataImporter::new(), &EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_source_paths_are_top_level_spx_only() {
        let fs = MapFs::with_files([
            ("b.spx", ""),
            ("a.spx", ""),
            ("notes.txt", ""),
            ("assets/index.json", "{}"),
            ("lib/c.spx", ""),
        ]);
        assert_eq!(source_paths(&fs).unwrap(), vec!["a.spx".to_string(), "b.spx".to_string()]);
    }

    #[test]
    fn test_no_source_files_is_an_error() {
        let fs = MapFs::with_files([("assets/index.json", "{}")]);
        let err = compile(&fs, &PkgDataImporter::new(), &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, CompileError::NoSourceFiles));
    }

    #[test]
    fn test_syntax_errors_exclude_file_from_check() {
        let program = build(&[("main.spx", "var score int\n"), ("Broken.spx", "func (\n")]);
        let broken = program.file("Broken.spx").unwrap();
        assert!(!broken.included);
        let diags = program.diagnostics_for("Broken.spx");
        assert!(!diags.is_empty());
        assert!(diags.iter().all(|d| d.range.start == d.range.end));
        assert!(program.package().is_some());
    }

    #[test]
    fn test_other_package_is_excluded() {
        let program = build(&[("main.spx", "var score int\n"), ("util.spx", "package util\n")]);
        assert!(!program.file("util.spx").unwrap().included);
        assert!(program.diagnostics_for("util.spx").is_empty());
    }

    #[test]
    fn test_missing_entry_returns_diagnostics_only() {
        let program = build(&[("Hero.spx", "onStart => {\n}\n")]);
        assert!(program.package().is_none());
        assert!(program.entry_file().is_none());
        assert!(program.file("Hero.spx").is_some());
    }

    #[test]
    fn test_type_errors_are_point_ranges() {
        let program = build(&[("main.spx", "var score int\nscore = \"high\"\n")]);
        let diags = program.diagnostics_for("main.spx");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].range.start, diags[0].range.end);
        assert_eq!(diags[0].range.start.line, 1);
        assert!(program.has_errors());
    }
}
