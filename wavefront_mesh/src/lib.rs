//! Parses the Wavefront OBJ format and its MTL material libraries into
//! triangulated, renderer-neutral mesh units.

mod assembler;
mod importer;
mod mtl;
mod obj;
mod tokenizer;

pub use assembler::{assemble, AssembledModel, FaceVertex, MeshGroup, MeshUnit};
pub use importer::{Importer, ObjImporter, SceneBuilder, MODEL_SCALE};
pub use mtl::{parse_mtl, Material, MaterialMap};
pub use obj::{Group, ObjState, Parser, Subgroup};

use std::io::Error as IoSourceError;

use thiserror::Error;

/// Represents what was wrong with a malformed OBJ/MTL line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// Not enough values in `v`, `vt`, `vn`, `Kd`, etc.
    #[error("not enough data (found {found}, expected {expected})")]
    NotEnoughData { found: usize, expected: usize },

    /// A token that should be a number is not.
    #[error("invalid number `{0}`")]
    InvalidNumber(String),

    /// Invalid `f` vertex token (wrong slash layout, empty vertex slot).
    #[error("invalid face vertex definition `{0}`")]
    InvalidFaceVertex(String),

    /// Zero or negative (relative) index in `f`.
    #[error("invalid index `{0}`")]
    InvalidIndex(String),

    /// `f` with fewer than three vertices.
    #[error("face has {0} vertices, at least 3 are required")]
    DegenerateFace(usize),

    /// `f` referencing an element which is not declared (yet).
    #[error("{kind} index {index} is out of range ({count} declared)")]
    DanglingIndex {
        kind: &'static str,
        index: usize,
        count: usize,
    },

    /// Material property set before any `newmtl`.
    #[error("`{0}` appears before any `newmtl`")]
    NoCurrentMaterial(String),
}

/// Malformed OBJ/MTL content, with the offending line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{location}:{line}: {kind} (in `{content}`)")]
pub struct ParseError {
    pub location: String,
    pub line: usize,
    pub content: String,
    pub kind: ParseErrorKind,
}

/// `usemtl` referencing a material that no `mtllib` defined.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{location}:{line}: material `{name}` not found")]
pub struct ReferenceError {
    pub location: String,
    pub line: usize,
    pub name: String,
}

/// An OBJ or MTL stream could not be opened or read.
#[derive(Debug, Error)]
#[error("failed to read `{location}`")]
pub struct IoError {
    pub location: String,
    #[source]
    pub source: IoSourceError,
}

/// Internal error kinds, attached to `ImportError` as its cause.
#[derive(Debug, Error)]
pub enum ErrorCause {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    Io(#[from] IoError),
}

/// The only error returned from `Importer::load`.
#[derive(Debug, Error)]
#[error("load failed for `{location}`: {cause}")]
pub struct ImportError {
    pub location: String,
    #[source]
    pub cause: ErrorCause,
}

impl ImportError {
    pub(crate) fn new(location: &str, cause: impl Into<ErrorCause>) -> ImportError {
        ImportError {
            location: location.to_owned(),
            cause: cause.into(),
        }
    }
}

/// Result type used inside the parsing pipeline.
pub type Result<T, E = ErrorCause> = std::result::Result<T, E>;
