use thiserror::Error;

/// A container field the annotation tree must carry is missing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("annotation is missing required field `{field}` at {path}")]
pub struct StructureError {
    pub path: String,
    pub field: &'static str,
}

impl StructureError {
    pub fn new(path: impl Into<String>, field: &'static str) -> Self {
        Self {
            path: path.into(),
            field,
        }
    }
}

/// A symbol carries a break code the line reconstructor has no rule for.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("break type {break_type} is not handled (symbol {symbol:?} at {path})")]
pub struct RecognitionSchemaError {
    pub break_type: String,
    pub symbol: String,
    pub path: String,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GeometryError {
    #[error("cannot build a shape from an empty point set")]
    Empty,

    #[error("point set is degenerate ({distinct} distinct points, collinear: {collinear})")]
    Degenerate { distinct: usize, collinear: bool },

    #[error("alpha {alpha} does not produce a single polygon enclosing every point")]
    AlphaTooLarge { alpha: f64 },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("crop rectangle {0:?} has zero area")]
    EmptyRegion([i32; 4]),

    #[error("mask polygon needs at least 3 vertices, got {0}")]
    PolygonTooSmall(usize),
}

/// Everything that can abort reconstruction of a paragraph.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LineError {
    #[error(transparent)]
    Structure(#[from] StructureError),

    #[error(transparent)]
    RecognitionSchema(#[from] RecognitionSchemaError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}
