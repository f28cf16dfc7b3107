use std::fs;
use std::sync::Arc;

use spx_ast::Position;
use spx_driver::{
    CompileCache, CompileError, DiskFs, EngineConfig, MapFs, Program, RefKind, ResourceId, Severity,
};
use spx_typeck::{PkgDataImporter, SPX_PKG_PATH};

const ASSETS: &[(&str, &str)] = &[
    (
        "assets/index.json",
        r#"{"backdrops": [{"name": "night", "path": "night.png"}], "zorder": [{"name": "scoreboard", "type": "monitor"}]}"#,
    ),
    ("assets/sounds/MySound/index.json", r#"{"path": "my.wav"}"#),
    (
        "assets/sprites/Bullet/index.json",
        r#"{"costumes": [{"name": "bullet-1", "path": "1.png"}], "fAnimations": {"fly": {}}}"#,
    ),
];

const GAME: &str = "var (\n\tMySound Sound\n\tBullet Bullet\n)\n\nonStart => {\n\tplay MySound\n\tplay \"biu\"\n\tBullet.clone\n}\n\nrun \"assets\", {Title: \"Demo\"}\n";

const BULLET: &str = "onStart => {\n\tx := xpos\n\tsetXYpos x, 10\n\tturn -90\n}\n";

fn workspace(sources: &[(&str, &str)]) -> MapFs {
    MapFs::with_files(ASSETS.iter().chain(sources.iter()).copied())
}

fn build(sources: &[(&str, &str)]) -> Arc<Program> {
    let fs = workspace(sources);
    CompileCache::new(EngineConfig::default()).get(&fs).unwrap()
}

fn messages(program: &Program, path: &str) -> Vec<(Severity, String)> {
    program
        .diagnostics_for(path)
        .iter()
        .map(|d| (d.severity, d.message.clone()))
        .collect()
}

fn error(message: &str) -> (Severity, String) {
    (Severity::Error, message.to_string())
}

fn warning(message: &str) -> (Severity, String) {
    (Severity::Warning, message.to_string())
}

#[test]
fn test_game_references_in_source_order() {
    let program = build(&[("main.spx", GAME), ("Bullet.spx", BULLET)]);

    let refs: Vec<(ResourceId, RefKind)> = program
        .resource_references()
        .iter()
        .map(|r| (r.id.clone(), r.kind))
        .collect();
    assert_eq!(
        refs,
        vec![
            (ResourceId::Sound("MySound".into()), RefKind::AutoBinding),
            (ResourceId::Sprite("Bullet".into()), RefKind::AutoBinding),
            (ResourceId::Sound("MySound".into()), RefKind::AutoBindingReference),
            (ResourceId::Sound("biu".into()), RefKind::StringLiteral),
            (ResourceId::Sprite("Bullet".into()), RefKind::AutoBindingReference),
        ]
    );
    assert_eq!(program.resource_root(), "assets");
    assert_eq!(program.sound_bindings().count(), 1);
    assert_eq!(program.sprite_bindings().count(), 1);

    assert_eq!(messages(&program, "main.spx"), vec![error("sound resource \"biu\" not found")]);
    assert!(messages(&program, "Bullet.spx").is_empty());
}

#[test]
fn test_undefined_sound_in_sprite_is_a_type_error_only() {
    let program = build(&[
        ("main.spx", "var (\n\tMySound Sound\n)\n"),
        ("Bullet.spx", "onStart => {\n\tplay Sound1\n}\n"),
    ]);
    assert!(messages(&program, "main.spx").is_empty());

    let diags = program.diagnostics_for("Bullet.spx");
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].message, "undefined: Sound1");
    assert_eq!(diags[0].range.start, Position::new(1, 6));
    assert_eq!(diags[0].range.start, diags[0].range.end);
}

#[test]
fn test_binding_outside_first_var_block_warns() {
    let program = build(&[("main.spx", "var (\n\tMySound Sound\n)\n\nvar (\n\tOther Sound\n)\n")]);

    let diags = program.diagnostics_for("main.spx");
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].severity, Severity::Warning);
    assert_eq!(
        diags[0].message,
        "resources must be defined in the first var block for auto-binding"
    );
    assert_eq!(diags[0].range.start, Position::new(5, 1));
    assert_eq!(diags[0].range.end, Position::new(5, 6));
    assert!(!program.has_errors());
    assert_eq!(program.sound_bindings().count(), 1);
}

#[test]
fn test_binding_outside_entry_file_warns() {
    let program = build(&[("main.spx", ""), ("Bullet.spx", "var (\n\tBoom Sound\n)\n")]);
    assert_eq!(
        messages(&program, "Bullet.spx"),
        vec![warning("auto-binding of resources can only happen in main.spx")]
    );
    assert_eq!(program.sound_bindings().count(), 0);
    assert!(program.resource_references().is_empty());
}

#[test]
fn test_sprite_binding_must_match_class_name() {
    let program = build(&[("main.spx", "var (\n\tHero Bullet\n)\n"), ("Bullet.spx", "")]);
    assert_eq!(
        messages(&program, "main.spx"),
        vec![error(
            "sprite resource name must match type name for explicit auto-binding to work"
        )]
    );
    assert_eq!(program.sprite_bindings().count(), 0);
}

#[test]
fn test_empty_name_is_an_error_without_reference() {
    let program = build(&[("main.spx", "play \"\"\n")]);
    let diags = program.diagnostics_for("main.spx");
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].message, "sound resource name cannot be empty");
    assert_eq!(diags[0].range.start, Position::new(0, 5));
    assert_eq!(diags[0].range.end, Position::new(0, 7));
    assert!(program.resource_references().is_empty());
}

#[test]
fn test_missing_sound_reported_per_occurrence() {
    let program = build(&[("main.spx", "play \"biu\"\nplay \"biu\"\n")]);
    assert_eq!(
        messages(&program, "main.spx"),
        vec![
            error("sound resource \"biu\" not found"),
            error("sound resource \"biu\" not found"),
        ]
    );
    let refs = program.references_to_resource(&ResourceId::Sound("biu".into()));
    assert_eq!(refs.len(), 2);
    assert!(refs.iter().all(|r| r.kind == RefKind::StringLiteral));
}

#[test]
fn test_constant_names_a_sound() {
    let program = build(&[("main.spx", "const boom = \"MySound\"\n\nplay boom\n")]);
    assert!(messages(&program, "main.spx").is_empty());
    let refs = program.references_to_resource(&ResourceId::Sound("MySound".into()));
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].kind, RefKind::ConstantReference);
}

#[test]
fn test_backdrop_names() {
    let program = build(&[("main.spx", "startBackdrop \"night\"\nstartBackdrop \"day\"\n")]);
    assert_eq!(
        messages(&program, "main.spx"),
        vec![error("backdrop resource \"day\" not found")]
    );
    assert_eq!(
        program
            .references_to_resource(&ResourceId::Backdrop("night".into()))
            .len(),
        1
    );
}

#[test]
fn test_costumes_are_scoped_to_their_sprite() {
    let main = "var (\n\tBullet Bullet\n)\n\nonStart => {\n\tBullet.setCostume \"bullet-1\"\n\tBullet.setCostume \"walk-9\"\n}\n";
    let program = build(&[("main.spx", main), ("Bullet.spx", "")]);

    assert_eq!(
        messages(&program, "main.spx"),
        vec![error("costume resource \"walk-9\" not found in sprite \"Bullet\"")]
    );
    let found = ResourceId::Costume {
        sprite: "Bullet".into(),
        costume: "bullet-1".into(),
    };
    assert_eq!(program.references_to_resource(&found).len(), 1);

    let at = program
        .resource_reference_at("main.spx", Position::new(5, 20))
        .unwrap();
    assert_eq!(at.id, found);
    assert_eq!(at.kind, RefKind::StringLiteral);
}

#[test]
fn test_unqualified_sprite_calls_need_the_file_sprite() {
    let program = build(&[("main.spx", ""), ("Hero.spx", "onStart => {\n\tturn 90\n}\n")]);
    let diags = program.diagnostics_for("Hero.spx");
    assert!(!diags.is_empty());
    assert!(diags
        .iter()
        .all(|d| d.message == "sprite resource \"Hero\" not found"));
}

#[test]
fn test_resource_root_from_run() {
    let fs = MapFs::with_files([
        ("main.spx", "play \"boom\"\n\nrun \"res\", {Title: \"Demo\"}\n"),
        ("res/sounds/boom/index.json", "{}"),
    ]);
    let program = CompileCache::new(EngineConfig::default()).get(&fs).unwrap();
    assert_eq!(program.resource_root(), "res");
    assert!(!program.has_errors(), "{:?}", program.diagnostics());
}

#[test]
fn test_cache_is_keyed_on_sources_only() {
    let fs = workspace(&[("main.spx", "play \"biu\"\n")]);
    let cache = CompileCache::new(EngineConfig::default());
    let first = cache.get(&fs).unwrap();
    assert!(first.has_errors());

    fs.write("assets/sounds/biu/index.json", "{}");
    let second = cache.get(&fs).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    fs.touch("main.spx").unwrap();
    let third = cache.get(&fs).unwrap();
    assert!(!third.has_errors());
    assert_eq!(cache.build_count(), 2);
}

#[test]
fn test_missing_runtime_fails_compile() {
    let fs = workspace(&[("main.spx", "")]);
    let importer = Arc::new(PkgDataImporter::new().without_package(SPX_PKG_PATH));
    let cache = CompileCache::with_importer(importer, EngineConfig::default());
    assert!(matches!(cache.get(&fs), Err(CompileError::Check(_))));
}

#[test]
fn test_custom_entry_file() {
    let config = EngineConfig::from_toml_str("entry_file = \"game.spx\"\nresource_root_default = \"media\"\n").unwrap();
    let fs = MapFs::with_files([
        ("game.spx", "var (\n\tBoom Sound\n)\n"),
        ("media/sounds/Boom/index.json", "{}"),
    ]);
    let program = CompileCache::new(config).get(&fs).unwrap();
    assert_eq!(program.entry_file().map(|f| f.path.as_str()), Some("game.spx"));
    assert_eq!(program.resource_root(), "media");
    assert!(!program.has_errors(), "{:?}", program.diagnostics());
    assert_eq!(program.sound_bindings().count(), 1);
}

#[test]
fn test_disk_workspace() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("main.spx"), GAME).unwrap();
    fs::write(dir.path().join("Bullet.spx"), BULLET).unwrap();
    for (path, content) in ASSETS {
        let full = dir.path().join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }

    let cache = CompileCache::new(EngineConfig::default());
    let workspace = DiskFs::new(dir.path());
    let program = cache.get(&workspace).unwrap();
    assert_eq!(program.files().len(), 2);
    assert_eq!(program.resource_references().len(), 5);
    assert_eq!(messages(&program, "main.spx"), vec![error("sound resource \"biu\" not found")]);

    let again = cache.get(&workspace).unwrap();
    assert!(Arc::ptr_eq(&program, &again));
}

#[test]
fn test_undefined_sprite_suppresses_costume_checks() {
    let program = build(&[("main.spx", "onStart => {\n\tFoo.setCostume \"x\"\n\tFoo.animate \"y\"\n}\n")]);
    assert_eq!(
        messages(&program, "main.spx"),
        vec![error("undefined: Foo"), error("undefined: Foo")]
    );
    assert!(program.resource_references().is_empty());
}

#[test]
fn test_missing_sprite_suppresses_costume_and_animation_checks() {
    let main = "var (\n\tGhost Ghost\n)\n\nonStart => {\n\tGhost.setCostume \"a\"\n\tGhost.animate \"b\"\n}\n";
    let program = build(&[("main.spx", main), ("Ghost.spx", "")]);

    let found = messages(&program, "main.spx");
    assert!(!found.is_empty());
    assert!(found
        .iter()
        .all(|m| *m == error("sprite resource \"Ghost\" not found")));
    assert!(program
        .resource_references()
        .iter()
        .all(|r| r.id == ResourceId::Sprite("Ghost".into())));
}

#[test]
fn test_animations_are_scoped_to_their_sprite() {
    let main = "var (\n\tBullet Bullet\n)\n\nonStart => {\n\tBullet.animate \"fly\"\n\tBullet.animate \"run\"\n}\n";
    let program = build(&[("main.spx", main), ("Bullet.spx", "")]);

    assert_eq!(
        messages(&program, "main.spx"),
        vec![error("animation resource \"run\" not found in sprite \"Bullet\"")]
    );
    let fly = ResourceId::Animation {
        sprite: "Bullet".into(),
        animation: "fly".into(),
    };
    let refs = program.references_to_resource(&fly);
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].kind, RefKind::StringLiteral);
}

#[test]
fn test_widget_names() {
    let main = "onStart => {\n\tgetWidget(Monitor, \"scoreboard\")\n\tgetWidget(Monitor, \"nope\")\n}\n";
    let program = build(&[("main.spx", main)]);
    assert_eq!(
        messages(&program, "main.spx"),
        vec![error("widget resource \"nope\" not found")]
    );
    assert_eq!(
        program
            .references_to_resource(&ResourceId::Widget("scoreboard".into()))
            .len(),
        1
    );
}

#[test]
fn test_sprite_call_on_expression_receiver_warns() {
    let main = "var (\n\tBullet Bullet\n)\n\nonStart => {\n\t(Bullet).setCostume(\"walk-9\")\n}\n";
    let program = build(&[("main.spx", main), ("Bullet.spx", "")]);
    assert_eq!(
        messages(&program, "main.spx"),
        vec![warning("cannot determine sprite name")]
    );
    assert!(program
        .resource_references()
        .iter()
        .all(|r| r.id == ResourceId::Sprite("Bullet".into())));
}

#[test]
fn test_locals_and_parameters_are_not_auto_bound() {
    let main = "var (\n\tMySound Sound\n)\n\nfunc mix(s Sound) {\n\tplay s\n}\n\nonStart => {\n\tvar local Sound\n\tplay local\n}\n";
    let program = build(&[("main.spx", main), ("Bullet.spx", "func fire(s Sound) {\n\tplay s\n}\n")]);

    let first_block = "resources must be defined in the first var block for auto-binding";
    assert_eq!(
        messages(&program, "main.spx"),
        vec![warning(first_block), warning(first_block)]
    );
    assert_eq!(
        messages(&program, "Bullet.spx"),
        vec![warning("auto-binding of resources can only happen in main.spx")]
    );
    assert_eq!(program.sound_bindings().count(), 1);
    assert_eq!(
        program
            .references_to_resource(&ResourceId::Sound("MySound".into()))
            .len(),
        1
    );
}
