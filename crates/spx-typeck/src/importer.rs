//! Package importer backed by embedded export data
//!
//! Export data is JSON describing a package's types, methods, constants and
//! functions, with every type spelled in spx type syntax. Decoded packages are
//! memoized per path, failures included, so a path is loaded at most once.

use rustc_hash::FxHashMap;
use serde::Deserialize;
use spx_ast::{FuncSig, Node, TypeExpr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use crate::error::ImportError;
use crate::objects::ConstValue;

/// Import path of the spx runtime framework
pub const SPX_PKG_PATH: &str = "github.com/goplus/spx/v2";
pub const BUILTIN_PKG_PATH: &str = "builtin";

const BUILTIN_DATA: &str = include_str!("pkgdata/builtin.json");
const SPX_DATA: &str = include_str!("pkgdata/spx.json");
const FMT_DATA: &str = include_str!("pkgdata/fmt.json");
const MATH_DATA: &str = include_str!("pkgdata/math.json");

/// How a package turns source files into classes
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Classfile {
    /// Base type embedded by the entry file's class
    pub game: String,
    /// Base type embedded by every other file's class
    pub sprite: String,
    /// Base name of the entry file
    pub entry: String,
    /// Source file extension
    pub ext: String,
}

#[derive(Debug, Clone)]
pub struct ExportType {
    pub name: String,
    pub alias: bool,
    pub ty: Node<TypeExpr>,
    pub methods: Vec<ExportFunc>,
}

#[derive(Debug, Clone)]
pub struct ExportFunc {
    pub name: String,
    pub sig: FuncSig,
}

#[derive(Debug, Clone)]
pub struct ExportConst {
    pub name: String,
    pub ty: Option<Node<TypeExpr>>,
    pub value: ConstValue,
}

#[derive(Debug, Clone)]
pub struct ExportVar {
    pub name: String,
    pub ty: Node<TypeExpr>,
}

/// Decoded export data of one package
#[derive(Debug, Clone)]
pub struct ExportPackage {
    pub path: String,
    pub name: String,
    pub classfile: Option<Classfile>,
    pub types: Vec<ExportType>,
    pub consts: Vec<ExportConst>,
    pub vars: Vec<ExportVar>,
    /// Repeated names are overloads, in preference order
    pub funcs: Vec<ExportFunc>,
}

/// Resolves import paths to package export data
pub trait Importer: Send + Sync {
    fn import(&self, path: &str) -> Result<Arc<ExportPackage>, ImportError>;
}

// =============================================================================
// Raw JSON shape
// =============================================================================

#[derive(Deserialize)]
struct RawPackage {
    path: String,
    name: String,
    #[serde(default)]
    classfile: Option<Classfile>,
    #[serde(default)]
    types: Vec<RawType>,
    #[serde(default)]
    consts: Vec<RawConst>,
    #[serde(default)]
    vars: Vec<RawVar>,
    #[serde(default)]
    funcs: Vec<RawFunc>,
}

#[derive(Deserialize)]
struct RawType {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    alias: bool,
    #[serde(default)]
    methods: Vec<RawFunc>,
}

#[derive(Deserialize)]
struct RawFunc {
    name: String,
    #[serde(rename = "type")]
    ty: String,
}

#[derive(Deserialize)]
struct RawConst {
    name: String,
    #[serde(rename = "type", default)]
    ty: Option<String>,
    value: serde_json::Value,
}

#[derive(Deserialize)]
struct RawVar {
    name: String,
    #[serde(rename = "type")]
    ty: String,
}

// =============================================================================
// Decoding
// =============================================================================

/// Decodes export data for `path`
pub fn decode_package(path: &str, data: &str) -> Result<ExportPackage, ImportError> {
    let raw: RawPackage = serde_json::from_str(data).map_err(|e| ImportError::Corrupt {
        path: path.to_string(),
        message: e.to_string(),
    })?;
    if raw.path != path {
        return Err(ImportError::Corrupt {
            path: path.to_string(),
            message: format!("export data describes {:?}", raw.path),
        });
    }

    let parse_type = |text: &str| {
        spx_parser::parse_type_str(text).map_err(|e| ImportError::BadType {
            path: path.to_string(),
            text: text.to_string(),
            message: e.message,
        })
    };
    let parse_func = |func: &RawFunc| -> Result<ExportFunc, ImportError> {
        match parse_type(&func.ty)?.value {
            TypeExpr::Func(sig) => Ok(ExportFunc {
                name: func.name.clone(),
                sig,
            }),
            _ => Err(ImportError::BadType {
                path: path.to_string(),
                text: func.ty.clone(),
                message: "not a function type".to_string(),
            }),
        }
    };

    let mut types = Vec::with_capacity(raw.types.len());
    for ty in &raw.types {
        types.push(ExportType {
            name: ty.name.clone(),
            alias: ty.alias,
            ty: parse_type(&ty.ty)?,
            methods: ty.methods.iter().map(&parse_func).collect::<Result<_, _>>()?,
        });
    }

    let mut consts = Vec::with_capacity(raw.consts.len());
    for c in &raw.consts {
        let value = match &c.value {
            serde_json::Value::Bool(b) => ConstValue::Bool(*b),
            serde_json::Value::String(s) => ConstValue::String(s.clone()),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => ConstValue::Int(i),
                None => ConstValue::Float(n.as_f64().unwrap_or_default()),
            },
            other => {
                return Err(ImportError::Corrupt {
                    path: path.to_string(),
                    message: format!("unsupported value {} for constant {}", other, c.name),
                })
            }
        };
        let ty = c.ty.as_deref().map(&parse_type).transpose()?;
        consts.push(ExportConst {
            name: c.name.clone(),
            ty,
            value,
        });
    }

    let vars = raw
        .vars
        .iter()
        .map(|v| {
            Ok(ExportVar {
                name: v.name.clone(),
                ty: parse_type(&v.ty)?,
            })
        })
        .collect::<Result<_, ImportError>>()?;
    let funcs = raw.funcs.iter().map(&parse_func).collect::<Result<_, _>>()?;

    Ok(ExportPackage {
        path: raw.path,
        name: raw.name,
        classfile: raw.classfile,
        types,
        consts,
        vars,
        funcs,
    })
}

// =============================================================================
// Memoizing importer
// =============================================================================

type Memo = FxHashMap<String, Result<Arc<ExportPackage>, ImportError>>;

/// Importer over a fixed set of export data blobs
pub struct PkgDataImporter {
    sources: FxHashMap<String, String>,
    memo: Mutex<Memo>,
    loads: AtomicUsize,
}

impl PkgDataImporter {
    /// Importer with the embedded runtime, `fmt` and `math` export data
    pub fn new() -> Self {
        let mut sources = FxHashMap::default();
        sources.insert(SPX_PKG_PATH.to_string(), SPX_DATA.to_string());
        sources.insert("fmt".to_string(), FMT_DATA.to_string());
        sources.insert("math".to_string(), MATH_DATA.to_string());

        let mut memo = Memo::default();
        memo.insert(
            BUILTIN_PKG_PATH.to_string(),
            decode_package(BUILTIN_PKG_PATH, BUILTIN_DATA).map(Arc::new),
        );

        Self {
            sources,
            memo: Mutex::new(memo),
            loads: AtomicUsize::new(0),
        }
    }

    /// Adds or replaces export data for `path`
    pub fn with_package_data(mut self, path: impl Into<String>, data: impl Into<String>) -> Self {
        self.sources.insert(path.into(), data.into());
        self
    }

    /// Removes export data for `path`, so importing it fails
    pub fn without_package(mut self, path: &str) -> Self {
        self.sources.remove(path);
        self
    }

    /// Number of export data blobs decoded so far
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    fn load(&self, path: &str) -> Result<ExportPackage, ImportError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let data = self
            .sources
            .get(path)
            .ok_or_else(|| ImportError::NotFound(path.to_string()))?;
        decode_package(path, data)
    }
}

impl Default for PkgDataImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Importer for PkgDataImporter {
    fn import(&self, path: &str) -> Result<Arc<ExportPackage>, ImportError> {
        // Held across the load: concurrent imports of one path decode it once
        let mut memo = self.memo.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(result) = memo.get(path) {
            return result.clone();
        }
        let result = self.load(path).map(Arc::new);
        match &result {
            Ok(pkg) => debug!(path, types = pkg.types.len(), funcs = pkg.funcs.len(), "imported package"),
            Err(err) => debug!(path, %err, "import failed"),
        }
        memo.insert(path.to_string(), result.clone());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_runtime_decodes() {
        let importer = PkgDataImporter::new();
        let spx = importer.import(SPX_PKG_PATH).unwrap();
        assert_eq!(spx.name, "spx");
        let classfile = spx.classfile.as_ref().unwrap();
        assert_eq!(classfile.entry, "main.spx");
        assert_eq!(classfile.sprite, "SpriteImpl");

        let game = spx.types.iter().find(|t| t.name == "Game").unwrap();
        let plays = game.methods.iter().filter(|m| m.name == "play").count();
        assert_eq!(plays, 4);
        let run = game.methods.iter().find(|m| m.name == "run").unwrap();
        assert!(run.sig.params[1].value.variadic);
    }

    #[test]
    fn test_builtin_is_preseeded() {
        let importer = PkgDataImporter::new();
        let builtin = importer.import(BUILTIN_PKG_PATH).unwrap();
        assert!(builtin.types.iter().any(|t| t.name == "any" && t.alias));
        assert_eq!(importer.load_count(), 0);
    }

    #[test]
    fn test_import_is_memoized() {
        let importer = PkgDataImporter::new();
        let first = importer.import("fmt").unwrap();
        let second = importer.import("fmt").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(importer.load_count(), 1);
    }

    #[test]
    fn test_failures_are_memoized() {
        let importer = PkgDataImporter::new();
        assert_eq!(importer.import("os").unwrap_err(), ImportError::NotFound("os".to_string()));
        assert!(importer.import("os").is_err());
        assert_eq!(importer.load_count(), 1);
    }

    #[test]
    fn test_corrupt_data() {
        let importer = PkgDataImporter::new()
            .with_package_data("broken", "{ not json")
            .with_package_data("badtype", r#"{"path": "badtype", "name": "badtype", "funcs": [{"name": "f", "type": "func("}]}"#)
            .with_package_data("moved", r#"{"path": "elsewhere", "name": "moved"}"#);

        assert!(matches!(importer.import("broken"), Err(ImportError::Corrupt { .. })));
        assert!(matches!(importer.import("badtype"), Err(ImportError::BadType { .. })));
        assert!(matches!(importer.import("moved"), Err(ImportError::Corrupt { .. })));
    }

    #[test]
    fn test_const_values() {
        let importer = PkgDataImporter::new();
        let math = importer.import("math").unwrap();
        let pi = math.consts.iter().find(|c| c.name == "Pi").unwrap();
        assert!(matches!(pi.value, ConstValue::Float(v) if (v - std::f64::consts::PI).abs() < 1e-12));
        let max = math.consts.iter().find(|c| c.name == "MaxInt").unwrap();
        assert_eq!(max.value, ConstValue::Int(i64::MAX));
    }
}
