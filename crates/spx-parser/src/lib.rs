//! # spx Parser
//!
//! Recursive descent parser for spx source files. Parsing always produces a
//! [`File`]; syntax errors are collected alongside it so that one broken line
//! does not hide the rest of the program from later stages.

use spx_ast::*;
use spx_lexer::{Lexer, Token, TokenKind};

// Module declarations
mod error;
mod parser;
mod expr;
mod stmt;
mod types;
mod decl;
mod helpers;

// Re-export public types
pub use error::{ParseError, ParseResult};
pub use parser::Parser;

// =============================================================================
// Public API
// =============================================================================

/// Lexes and parses one file in recovery mode
pub fn parse_file(file_id: FileId, path: &str, source: &str) -> (File, Vec<ParseError>) {
    let tokens = Lexer::with_file_id(source, file_id).tokenize();

    let mut errors = Vec::new();
    let mut clean = Vec::with_capacity(tokens.len());
    for token in tokens {
        if token.kind == TokenKind::Error {
            errors.push(ParseError::new(token.value, token.span));
        } else {
            clean.push(token);
        }
    }

    let mut parser = Parser::new(clean, file_id);
    let file = parser.parse_file(path);
    errors.extend(parser.into_errors());
    errors.sort_by_key(|e| e.span.start);
    (file, errors)
}

/// Parses a type expression such as `func(name SoundName, wait ...bool)`
pub fn parse_type_str(source: &str) -> ParseResult<Node<TypeExpr>> {
    let tokens = Lexer::with_file_id(source, FileId::EXTERNAL).tokenize();
    if let Some(bad) = tokens.iter().find(|t| t.kind == TokenKind::Error) {
        return Err(ParseError::new(bad.value.clone(), bad.span));
    }
    let mut parser = Parser::new(tokens, FileId::EXTERNAL);
    parser.parse_type_only()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> (File, Vec<ParseError>) {
        parse_file(FileId(0), "main.spx", source)
    }

    fn parse_ok(source: &str) -> File {
        let (file, errors) = parse(source);
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        file
    }

    fn top_stmt(file: &File, index: usize) -> &Stmt {
        match &file.decls[index].value {
            Decl::Stmt(stmt) => &stmt.value,
            other => panic!("expected statement, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_var_block() {
        let file = parse_ok("var (\n\tMySound Sound\n\tMySprite, Other Sprite\n)\n");
        assert_eq!(file.decls.len(), 1);
        match &file.decls[0].value {
            Decl::Var(gen) => {
                assert!(gen.grouped);
                assert_eq!(gen.specs.len(), 2);
                assert_eq!(gen.specs[1].value.names.len(), 2);
            }
            other => panic!("expected var block, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_package_and_imports() {
        let file = parse_ok("package main\n\nimport (\n\t\"fmt\"\n\tm \"math\"\n)\n");
        assert_eq!(file.package_name(), "main");
        assert_eq!(file.imports.len(), 2);
        assert_eq!(file.imports[1].value.path, "math");
        assert_eq!(file.imports[1].value.name.as_ref().map(|n| n.value.name.as_str()), Some("m"));
    }

    #[test]
    fn test_parse_command_call_with_string() {
        let file = parse_ok("play \"biu\"\n");
        match top_stmt(&file, 0) {
            Stmt::Expr(expr) => match &expr.value {
                Expr::Call { callee, args, command } => {
                    assert!(*command);
                    assert_eq!(callee.value.as_ident().map(|i| i.name.as_str()), Some("play"));
                    assert_eq!(args.len(), 1);
                }
                other => panic!("expected call, got {:?}", other),
            },
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_command_call_with_lambda() {
        let file = parse_ok("onStart => {\n\tsay \"hi\", 2\n\tsetXYpos 10, -20\n}\n");
        match top_stmt(&file, 0) {
            Stmt::Expr(expr) => match &expr.value {
                Expr::Call { args, command, .. } => {
                    assert!(*command);
                    match &args[0].value {
                        Expr::Lambda { params, body: LambdaBody::Block(block) } => {
                            assert!(params.is_empty());
                            assert_eq!(block.value.stmts.len(), 2);
                        }
                        other => panic!("expected lambda, got {:?}", other),
                    }
                }
                other => panic!("expected call, got {:?}", other),
            },
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_selector_command_and_bare_selector() {
        let file = parse_ok("MySprite.setCostume \"a\"\nBullet.clone\n");
        match top_stmt(&file, 0) {
            Stmt::Expr(expr) => assert!(matches!(expr.value, Expr::Call { command: true, .. })),
            other => panic!("unexpected {:?}", other),
        }
        match top_stmt(&file, 1) {
            Stmt::Expr(expr) => assert!(matches!(expr.value, Expr::Selector { .. })),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_negative_argument_command() {
        let file = parse_ok("turn -90\nx := a - 1\n");
        match top_stmt(&file, 0) {
            Stmt::Expr(expr) => assert!(matches!(expr.value, Expr::Call { command: true, .. })),
            other => panic!("unexpected {:?}", other),
        }
        match top_stmt(&file, 1) {
            Stmt::ShortVarDecl { values, .. } => {
                assert!(matches!(values[0].value, Expr::Binary { op: BinaryOp::Sub, .. }))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_run_with_untyped_composite() {
        let file = parse_ok("run \"assets\", {Title: \"My Game\"}\n");
        match top_stmt(&file, 0) {
            Stmt::Expr(expr) => match &expr.value {
                Expr::Call { args, .. } => {
                    assert_eq!(args.len(), 2);
                    match &args[1].value {
                        Expr::Composite { ty: None, elements } => {
                            assert_eq!(elements.len(), 1);
                            assert!(elements[0].value.key.is_some());
                        }
                        other => panic!("expected composite, got {:?}", other),
                    }
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_func_decl_with_grouped_params() {
        let file = parse_ok("func move(dx, dy int, name string) (bool, error) {\n\treturn true, nil\n}\n");
        match &file.decls[0].value {
            Decl::Func(func) => {
                assert_eq!(func.name.value.name, "move");
                assert_eq!(func.sig.value.params.len(), 2);
                assert_eq!(func.sig.value.params[0].value.names.len(), 2);
                assert_eq!(func.sig.value.param_count(), 3);
                assert_eq!(func.sig.value.results.len(), 2);
            }
            other => panic!("expected func, got {:?}", other),
        }
    }

    #[test]
    fn test_if_condition_does_not_start_composite() {
        let file = parse_ok("if visible {\n\thide\n} else if x > 1 {\n\tshow\n}\n");
        match top_stmt(&file, 0) {
            Stmt::If { condition, else_stmt, .. } => {
                assert!(matches!(condition.value, Expr::Ident(_)));
                assert!(else_stmt.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_for_forms() {
        let file = parse_ok("for {\n\tbreak\n}\nfor i := 0; i < 3; i++ {\n}\nfor n < 10 {\n\tn++\n}\n");
        assert!(matches!(top_stmt(&file, 0), Stmt::For { condition: None, .. }));
        assert!(matches!(
            top_stmt(&file, 1),
            Stmt::For {
                init: Some(_),
                condition: Some(_),
                post: Some(_),
                ..
            }
        ));
        assert!(matches!(top_stmt(&file, 2), Stmt::For { init: None, condition: Some(_), .. }));
    }

    #[test]
    fn test_missing_paren_reports_both_errors_at_eof() {
        let source = "\n// Invalid syntax, missing closing parenthesis\nvar (\n\tMyAircraft MyAircraft\n";
        let (file, errors) = parse(source);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].message, "expected ')', found 'EOF'");
        assert_eq!(errors[1].message, "expected ';', found 'EOF'");
        assert_eq!(errors[0].span.start, source.len());
        assert_eq!(errors[1].span.start, source.len());
        // The partial block is still available
        assert_eq!(file.decls.len(), 1);
    }

    #[test]
    fn test_recovery_continues_after_bad_statement() {
        let (file, errors) = parse("onStart => {\n\tx := )\n\tsay \"ok\"\n}\nwait 1\n");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.starts_with("expected operand"));
        assert_eq!(file.decls.len(), 2);
    }

    #[test]
    fn test_lexer_errors_become_parse_errors() {
        let (file, errors) = parse("say \"oops\nwait 1\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "string literal not terminated");
        assert_eq!(file.decls.len(), 2);
    }

    #[test]
    fn test_node_ids_are_unique() {
        struct Collect(Vec<NodeId>);
        impl<'ast> Visitor<'ast> for Collect {
            fn visit_expr(&mut self, expr: &'ast Node<Expr>) -> bool {
                self.0.push(expr.id);
                true
            }
            fn visit_ident(&mut self, ident: &'ast Node<Ident>) {
                self.0.push(ident.id);
            }
        }
        let file = parse_ok("var (\n\ta, b int\n)\nonStart => {\n\ta = b + 1\n\tplay \"x\"\n}\n");
        let mut collect = Collect(Vec::new());
        walk_file(&mut collect, &file);
        let count = collect.0.len();
        collect.0.sort();
        collect.0.dedup();
        assert_eq!(collect.0.len(), count);
    }

    #[test]
    fn test_parse_type_str() {
        let ty = parse_type_str("func(name SoundName, wait ...bool) *Sprite").unwrap();
        match ty.value {
            TypeExpr::Func(sig) => {
                assert_eq!(sig.params.len(), 2);
                assert!(sig.params[1].value.variadic);
                assert!(matches!(sig.results[0].value.ty.value, TypeExpr::Pointer(_)));
            }
            other => panic!("expected func type, got {:?}", other),
        }
        let ty = parse_type_str("interface{ animate(name SpriteAnimationName); clone() }").unwrap();
        assert!(matches!(ty.value, TypeExpr::Interface(ref methods) if methods.len() == 2));
        assert!(parse_type_str("func(").is_err());
    }

    #[test]
    fn test_lambda_forms_in_arguments() {
        let file = parse_ok("onKey KeyA, => {\n}\nf((a, b) => a + b, x => x)\n");
        match top_stmt(&file, 1) {
            Stmt::Expr(expr) => match &expr.value {
                Expr::Call { args, command: false, .. } => {
                    assert!(matches!(&args[0].value, Expr::Lambda { params, .. } if params.len() == 2));
                    assert!(matches!(&args[1].value, Expr::Lambda { params, .. } if params.len() == 1));
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_struct_type_decl() {
        let file = parse_ok("type Point struct {\n\tX, Y int\n\tspx.Sprite\n}\n");
        match &file.decls[0].value {
            Decl::Type(specs) => match &specs[0].value.ty.value {
                TypeExpr::Struct(fields) => {
                    assert_eq!(fields.len(), 2);
                    assert!(fields[1].value.is_embedded());
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }
}
