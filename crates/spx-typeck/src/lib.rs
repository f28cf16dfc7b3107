//! # spx Type Checker
//!
//! Whole-package type checker for spx class files. Every source file is a
//! class: the entry file embeds the runtime's game type, every other file a
//! sprite. Checking never stops at the first error; errors go to a callback
//! and the symbol tables in [`TypeInfo`] stay usable for partial programs.

mod types;
mod objects;
mod scope;
mod info;
mod error;
mod importer;
mod checker;
mod decl_checker;
mod lookup;
mod expr_checker;
mod call_checker;
mod stmt_checker;

// Re-export public API
pub use types::{BasicKind, Signature, Type, TypeId, TypeTable};
pub use objects::{BuiltinKind, ConstValue, Object, ObjectId, ObjectKind, ObjectTable, PkgRef};
pub use scope::{Scope, ScopeId, ScopeKind, ScopeTable};
pub use info::{Mode, Selection, SelectionKind, TypeAndValue, TypeInfo};
pub use error::{CheckError, ImportError, TypeError};
pub use importer::{
    decode_package, Classfile, ExportPackage, Importer, PkgDataImporter, BUILTIN_PKG_PATH, SPX_PKG_PATH,
};
pub use checker::{CheckedPackage, ClassInfo, TypeChecker};
pub use lookup::{identical, lookup_member, Member};

use spx_ast::{File, FileId};

// =============================================================================
// Public API
// =============================================================================

/// Type checks the package formed by `files`. `entry` is the game class file.
/// Only a missing runtime package is fatal.
pub fn check_package(
    files: &[&File],
    entry: FileId,
    importer: &dyn Importer,
    on_error: &mut dyn FnMut(TypeError),
) -> Result<CheckedPackage, CheckError> {
    let checker = TypeChecker::new(importer, on_error)?;
    Ok(checker.check(files, entry))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use spx_ast::{Decl, Expr, NodeId, Stmt};
    use spx_parser::parse_file;

    struct Checked {
        pkg: CheckedPackage,
        files: Vec<File>,
        sources: Vec<String>,
        errors: Vec<TypeError>,
    }

    impl Checked {
        fn messages(&self) -> Vec<&str> {
            self.errors.iter().map(|e| e.message.as_str()).collect()
        }

        fn local(&self, name: &str) -> &Object {
            self.pkg
                .objects
                .iter()
                .map(|(_, obj)| obj)
                .find(|obj| obj.name == name && obj.is_var())
                .unwrap_or_else(|| panic!("no variable {}", name))
        }

        fn offset(&self, file: usize, needle: &str) -> usize {
            self.sources[file].find(needle).unwrap()
        }
    }

    fn check(sources: &[(&str, &str)]) -> Checked {
        let files: Vec<File> = sources
            .iter()
            .enumerate()
            .map(|(i, (path, source))| {
                let (file, errors) = parse_file(FileId(i as u32), path, source);
                assert!(errors.is_empty(), "parse errors in {}: {:?}", path, errors);
                file
            })
            .collect();
        let refs: Vec<&File> = files.iter().collect();
        let importer = PkgDataImporter::new();
        let mut errors = Vec::new();
        let mut on_error = |err: TypeError| errors.push(err);
        let pkg = check_package(&refs, FileId(0), &importer, &mut on_error).unwrap();
        Checked {
            pkg,
            files,
            sources: sources.iter().map(|(_, s)| s.to_string()).collect(),
            errors,
        }
    }

    /// First argument of the call in top-level statement `index`
    fn first_arg(file: &File, index: usize) -> NodeId {
        let Decl::Stmt(stmt) = &file.decls[index].value else {
            panic!("expected statement");
        };
        let Stmt::Expr(expr) = &stmt.value else {
            panic!("expected expression statement");
        };
        let Expr::Call { args, .. } = &expr.value else {
            panic!("expected call");
        };
        args[0].id
    }

    const MAIN: &str = "var (\n\tMySound Sound\n\tBullet Bullet\n\tscore int\n)\n\nrun \"assets\", {Title: \"Demo\"}\n";

    #[test]
    fn test_clean_program() {
        let checked = check(&[
            (
                "main.spx",
                "var (\n\tMySound Sound\n\tBullet Bullet\n)\n\nonStart => {\n\tplay MySound\n\tplay \"biu\"\n\tBullet.clone\n}\n\nrun \"assets\", {Title: \"Demo\"}\n",
            ),
            ("Bullet.spx", "onStart => {\n\tx := xpos\n\tsetXYpos x, 10\n\tturn -90\n}\n"),
        ]);
        assert!(checked.errors.is_empty(), "unexpected errors: {:?}", checked.messages());
    }

    #[test]
    fn test_undefined_sound_in_sprite() {
        let checked = check(&[
            ("main.spx", "var (\n\tMySound Sound\n)\n"),
            ("Bullet.spx", "onStart => {\n\tplay Sound1\n}\n"),
        ]);
        assert_eq!(checked.messages(), vec!["undefined: Sound1"]);
        assert_eq!(checked.errors[0].span.file_id, FileId(1));
    }

    #[test]
    fn test_string_literal_takes_resource_name_type() {
        let checked = check(&[("main.spx", "play \"biu\"\n")]);
        assert!(checked.errors.is_empty(), "{:?}", checked.messages());
        let pkg = &checked.pkg;

        let literal = first_arg(&checked.files[0], 0);
        let tv = &pkg.info.types[&literal];
        assert_eq!(pkg.type_string(tv.ty), "spx.SoundName");
        assert_eq!(tv.const_value(), Some(&ConstValue::String("biu".into())));

        // The callee resolves to the SoundName overload, not the set
        let play = pkg
            .info
            .uses
            .values()
            .map(|obj| pkg.objects.get(*obj))
            .find(|obj| obj.name == "play")
            .unwrap();
        assert!(play.is_func());
        let sig = pkg.types.signature(play.ty).unwrap();
        assert_eq!(sig.params.len(), 1);
        assert_eq!(pkg.type_string(sig.params[0]), "spx.SoundName");
    }

    #[test]
    fn test_auto_property() {
        let checked = check(&[
            ("main.spx", ""),
            ("Bullet.spx", "onStart => {\n\tx := xpos\n\tsetXYpos x, 0\n}\n"),
        ]);
        assert!(checked.errors.is_empty(), "{:?}", checked.messages());
        assert_eq!(checked.local("x").ty, TypeTable::basic(BasicKind::Float64));
    }

    #[test]
    fn test_argument_count_errors() {
        let checked = check(&[
            ("main.spx", ""),
            ("Bullet.spx", "onStart => {\n\tsetXYpos 1\n\tturn 1, 2\n}\n"),
        ]);
        assert_eq!(
            checked.messages(),
            vec!["not enough arguments in call to setXYpos", "too many arguments in call to turn"]
        );
    }

    #[test]
    fn test_value_not_used() {
        let checked = check(&[("main.spx", ""), ("Bullet.spx", "onStart => {\n\tn := 1\n\tn\n}\n")]);
        assert_eq!(checked.messages(), vec!["n is not used"]);
    }

    #[test]
    fn test_field_redeclared() {
        let checked = check(&[("main.spx", "var (\n\ta int\n\ta string\n)\n")]);
        assert_eq!(checked.messages(), vec!["a redeclared in this block"]);
    }

    #[test]
    fn test_cannot_use_message() {
        let checked = check(&[("main.spx", ""), ("Bullet.spx", "onStart => {\n\tvar n int = \"x\"\n}\n")]);
        assert_eq!(
            checked.messages(),
            vec!["cannot use \"x\" (untyped string constant) as int value in variable declaration"]
        );
    }

    #[test]
    fn test_missing_member_message() {
        let checked = check(&[("main.spx", "var (\n\tMySound Sound\n)\n\nMySound.foo\n")]);
        assert_eq!(
            checked.messages(),
            vec!["MySound.foo undefined (type spx.Sound has no field or method foo)"]
        );
    }

    #[test]
    fn test_lowercase_package_member() {
        let checked = check(&[("main.spx", "import \"fmt\"\n\nfmt.println \"hi\"\n")]);
        assert!(checked.errors.is_empty(), "{:?}", checked.messages());
        let println = checked
            .pkg
            .info
            .uses
            .values()
            .map(|obj| checked.pkg.objects.get(*obj))
            .find(|obj| obj.name == "Println");
        assert!(println.is_some());
    }

    #[test]
    fn test_sprite_sees_game_fields() {
        let checked = check(&[("main.spx", MAIN), ("Bullet.spx", "onStart => {\n\tscore = 1\n}\n")]);
        assert!(checked.errors.is_empty(), "{:?}", checked.messages());
        let game = checked.pkg.class_of_file(FileId(0)).unwrap().ty;
        let (_, class) = checked
            .pkg
            .info
            .class_members
            .iter()
            .find(|(id, _)| {
                id.file == FileId(1) && checked.pkg.objects.get(checked.pkg.info.uses[*id]).name == "score"
            })
            .unwrap();
        assert_eq!(*class, game);
    }

    #[test]
    fn test_classes_embed_runtime_types() {
        let checked = check(&[("main.spx", MAIN), ("Bullet.spx", "")]);
        let pkg = &checked.pkg;
        let main = pkg.class_of_file(FileId(0)).unwrap();
        let bullet = pkg.class_of_file(FileId(1)).unwrap();
        assert!(main.is_game);
        assert_eq!(main.name, "main");
        assert_eq!(bullet.name, "Bullet");
        assert!(lookup_member(&pkg.types, &pkg.objects, main.ty, "play").is_some());
        assert!(lookup_member(&pkg.types, &pkg.objects, bullet.ty, "setCostume").is_some());
        assert!(lookup_member(&pkg.types, &pkg.objects, bullet.ty, "play").is_none());
        assert_eq!(pkg.type_string(main.ty), "main");
    }

    #[test]
    fn test_innermost_scope_in_lambda() {
        let checked = check(&[("main.spx", ""), ("Bullet.spx", "onStart => {\n\tx := 1.0\n\tturn x\n}\n")]);
        assert!(checked.errors.is_empty(), "{:?}", checked.messages());
        let offset = checked.offset(1, "x :=");
        let scope = checked.pkg.scopes.innermost_at(FileId(1), offset).unwrap();
        let scope = checked.pkg.scopes.get(scope);
        assert_eq!(scope.kind, ScopeKind::Function);
        assert!(scope.lookup("x").is_some());
    }

    #[test]
    fn test_missing_runtime_is_fatal() {
        let importer = PkgDataImporter::new().without_package(SPX_PKG_PATH);
        let mut on_error = |_: TypeError| {};
        let result = check_package(&[], FileId(0), &importer, &mut on_error);
        assert!(matches!(result, Err(CheckError::Import(ImportError::NotFound(_)))));
    }
}
