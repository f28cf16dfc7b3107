//! Resource identities, URIs and catalog records

use serde::{Deserialize, Serialize};
use spx_ast::{NodeId, Span};
use std::fmt;
use thiserror::Error;

const URI_PREFIX: &str = "spx://resources/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Backdrop,
    Sound,
    Sprite,
    Costume,
    Animation,
    Widget,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Backdrop => "backdrop",
            ResourceKind::Sound => "sound",
            ResourceKind::Sprite => "sprite",
            ResourceKind::Costume => "sprite costume",
            ResourceKind::Animation => "sprite animation",
            ResourceKind::Widget => "widget",
        };
        write!(f, "{}", s)
    }
}

/// Identity of one catalog resource. Costumes and animations are scoped to
/// their sprite.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceId {
    Backdrop(String),
    Sound(String),
    Sprite(String),
    Costume { sprite: String, costume: String },
    Animation { sprite: String, animation: String },
    Widget(String),
}

impl ResourceId {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceId::Backdrop(_) => ResourceKind::Backdrop,
            ResourceId::Sound(_) => ResourceKind::Sound,
            ResourceId::Sprite(_) => ResourceKind::Sprite,
            ResourceId::Costume { .. } => ResourceKind::Costume,
            ResourceId::Animation { .. } => ResourceKind::Animation,
            ResourceId::Widget(_) => ResourceKind::Widget,
        }
    }

    /// The resource's own name (the costume or animation name for nested kinds)
    pub fn name(&self) -> &str {
        match self {
            ResourceId::Backdrop(name)
            | ResourceId::Sound(name)
            | ResourceId::Sprite(name)
            | ResourceId::Widget(name) => name,
            ResourceId::Costume { costume, .. } => costume,
            ResourceId::Animation { animation, .. } => animation,
        }
    }

    pub fn uri(&self) -> String {
        match self {
            ResourceId::Backdrop(name) => format!("{}backdrops/{}", URI_PREFIX, name),
            ResourceId::Sound(name) => format!("{}sounds/{}", URI_PREFIX, name),
            ResourceId::Sprite(name) => format!("{}sprites/{}", URI_PREFIX, name),
            ResourceId::Costume { sprite, costume } => {
                format!("{}sprites/{}/costumes/{}", URI_PREFIX, sprite, costume)
            }
            ResourceId::Animation { sprite, animation } => {
                format!("{}sprites/{}/animations/{}", URI_PREFIX, sprite, animation)
            }
            ResourceId::Widget(name) => format!("{}widgets/{}", URI_PREFIX, name),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceUriError {
    #[error("invalid spx resource URI: {0}")]
    Invalid(String),
    #[error("unsupported or malformed spx resource type in URI: {0}")]
    Unsupported(String),
}

/// Parses a URI produced by [`ResourceId::uri`]
pub fn parse_resource_uri(uri: &str) -> Result<ResourceId, ResourceUriError> {
    let invalid = || ResourceUriError::Invalid(uri.to_string());
    let path = uri.strip_prefix(URI_PREFIX).ok_or_else(invalid)?;
    let parts: Vec<&str> = path.split('/').collect();
    if parts.len() < 2 || parts.iter().any(|p| p.is_empty() || *p == "." || *p == "..") {
        return Err(invalid());
    }

    let name = parts[1].to_string();
    let id = match (parts[0], parts.len()) {
        ("backdrops", 2) => ResourceId::Backdrop(name),
        ("sounds", 2) => ResourceId::Sound(name),
        ("widgets", 2) => ResourceId::Widget(name),
        ("sprites", 2) => ResourceId::Sprite(name),
        ("sprites", 4) if parts[2] == "costumes" => ResourceId::Costume {
            sprite: name,
            costume: parts[3].to_string(),
        },
        ("sprites", 4) if parts[2] == "animations" => ResourceId::Animation {
            sprite: name,
            animation: parts[3].to_string(),
        },
        _ => return Err(ResourceUriError::Unsupported(uri.to_string())),
    };
    Ok(id)
}

// =============================================================================
// References
// =============================================================================

/// How a source location refers to a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RefKind {
    /// The declaration that binds an identifier to a resource
    AutoBinding,
    /// A later use of an auto-bound identifier
    AutoBindingReference,
    StringLiteral,
    ConstantReference,
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RefKind::AutoBinding => "autoBinding",
            RefKind::AutoBindingReference => "autoBindingReference",
            RefKind::StringLiteral => "stringLiteral",
            RefKind::ConstantReference => "constantReference",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceReference {
    pub id: ResourceId,
    pub node: NodeId,
    pub span: Span,
    pub kind: RefKind,
}

// =============================================================================
// Catalog records
// =============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BackdropResource {
    pub name: String,
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SoundResource {
    /// Taken from the directory name
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub rate: Option<u32>,
    #[serde(default, rename = "sampleCount")]
    pub sample_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CostumeResource {
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationResource {
    pub name: String,
    pub frame_from: Option<String>,
    pub frame_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpriteResource {
    pub name: String,
    /// In listed order
    pub costumes: Vec<CostumeResource>,
    pub costume_index: usize,
    /// Sorted by name
    pub animations: Vec<AnimationResource>,
    pub default_animation: Option<String>,
}

impl SpriteResource {
    pub fn costume(&self, name: &str) -> Option<&CostumeResource> {
        self.costumes.iter().find(|c| c.name == name)
    }

    pub fn animation(&self, name: &str) -> Option<&AnimationResource> {
        self.animations.iter().find(|a| a.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WidgetResource {
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub visible: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uris() {
        assert_eq!(ResourceId::Sound("Boom".into()).uri(), "spx://resources/sounds/Boom");
        assert_eq!(
            ResourceId::Costume {
                sprite: "Hero".into(),
                costume: "walk-1".into()
            }
            .uri(),
            "spx://resources/sprites/Hero/costumes/walk-1"
        );
        assert_eq!(ResourceId::Widget("score".into()).to_string(), "spx://resources/widgets/score");
    }

    #[test]
    fn test_parse_nested_uris() {
        assert_eq!(
            parse_resource_uri("spx://resources/sprites/Hero/animations/run").unwrap(),
            ResourceId::Animation {
                sprite: "Hero".into(),
                animation: "run".into()
            }
        );
        assert_eq!(
            parse_resource_uri("spx://resources/backdrops/night").unwrap(),
            ResourceId::Backdrop("night".into())
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            parse_resource_uri("file:///sounds/Boom"),
            Err(ResourceUriError::Invalid(_))
        ));
        assert!(matches!(
            parse_resource_uri("spx://resources/sounds"),
            Err(ResourceUriError::Invalid(_))
        ));
        assert!(matches!(
            parse_resource_uri("spx://resources/sounds/../Boom"),
            Err(ResourceUriError::Invalid(_))
        ));
        assert!(matches!(
            parse_resource_uri("spx://resources/sprites/Hero/hats/red"),
            Err(ResourceUriError::Unsupported(_))
        ));
        assert!(matches!(
            parse_resource_uri("spx://resources/fonts/mono"),
            Err(ResourceUriError::Unsupported(_))
        ));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ResourceKind::Costume.to_string(), "sprite costume");
        assert_eq!(ResourceId::Sprite("Hero".into()).kind(), ResourceKind::Sprite);
        assert_eq!(
            ResourceId::Costume {
                sprite: "Hero".into(),
                costume: "a".into()
            }
            .name(),
            "a"
        );
    }
}
