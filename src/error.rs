use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Error type for the TMX import and bake pipeline.
///
/// Every variant is fatal for the asset being built: a bad map must fail the
/// bake instead of producing a corrupt runtime map.
#[derive(Debug, Error)]
pub enum MapError {
    /// File I/O error
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File being read or written
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },
    /// Baked asset JSON could not be read or written
    #[error("JSON error in {path}: {source}")]
    Json {
        /// Asset path
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },
    /// The XML itself is broken (bad nesting, bad escapes, truncated input)
    #[error("malformed XML: {context}")]
    MalformedXml {
        /// Where it went wrong
        context: String,
    },
    /// Tile data uses an encoding or compression we refuse to guess at
    #[error("layer '{layer}': unsupported tile data encoding={encoding:?} compression={compression:?}")]
    UnsupportedEncoding {
        /// Layer name
        layer: String,
        /// `encoding` attribute, if any
        encoding: Option<String>,
        /// `compression` attribute, if any
        compression: Option<String>,
    },
    /// A map feature outside the supported TMX subset
    #[error("unsupported map format: {0}")]
    UnsupportedFormat(String),
    /// A required attribute is absent
    #[error("<{element}> is missing required attribute '{attribute}'")]
    MissingAttribute {
        /// Element name
        element: String,
        /// Attribute name
        attribute: String,
    },
    /// An attribute is present but does not parse
    #[error("<{element}> attribute '{attribute}' has invalid value '{value}'")]
    InvalidAttribute {
        /// Element name
        element: String,
        /// Attribute name
        attribute: String,
        /// Raw value
        value: String,
    },
    /// Decoded tile stream length does not match layer width * height
    #[error("layer '{layer}': expected {expected} tiles, found {actual}")]
    LayerSize {
        /// Layer name
        layer: String,
        /// width * height
        expected: usize,
        /// Cells actually decoded
        actual: usize,
    },
    /// A cell references a tile past the end of the tile catalog
    #[error("layer '{layer}' cell {cell}: tile index {index} outside catalog of {catalog_len} tiles")]
    TileIndexOutOfRange {
        /// Layer name
        layer: String,
        /// Row-major cell index
        cell: usize,
        /// 1-based tile index
        index: u32,
        /// Catalog length
        catalog_len: usize,
    },
    /// The map has no layer usable for the requested purpose
    #[error("map has no {0} layer")]
    MissingLayer(String),
    /// No object group with this name
    #[error("object group '{0}' not found")]
    MissingObjectGroup(String),
    /// No object of the required kind inside a group
    #[error("object group '{group}' has no '{kind}' object")]
    MissingObject {
        /// Group name
        group: String,
        /// Expected name/type
        kind: String,
    },
    /// More than one object where exactly one is allowed
    #[error("object group '{group}' has more than one '{kind}' object")]
    DuplicateObject {
        /// Group name
        group: String,
        /// Name/type
        kind: String,
    },
    /// An object lacks a property the bake needs
    #[error("object '{object}' is missing property '{property}'")]
    MissingProperty {
        /// Object name (or type)
        object: String,
        /// Property name
        property: String,
    },
    /// An object property does not parse
    #[error("object '{object}' property '{property}' has invalid value '{value}'")]
    InvalidProperty {
        /// Object name (or type)
        object: String,
        /// Property name
        property: String,
        /// Raw value
        value: String,
    },
    /// Medal thresholds must satisfy gold < silver < bronze
    #[error("medal thresholds out of order: gold={gold}s silver={silver}s bronze={bronze}s")]
    InvalidMedalThresholds {
        /// Gold time in seconds
        gold: f64,
        /// Silver time in seconds
        silver: f64,
        /// Bronze time in seconds
        bronze: f64,
    },
    /// Image could not be read or decoded
    #[error("image {path}: {message}")]
    Image {
        /// Image path as referenced by the map
        path: PathBuf,
        /// Decoder message
        message: String,
    },
}

/// Coarse classification of parse failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// XML syntax or structure problem
    MalformedXml,
    /// Tile data encoding/compression not supported
    UnsupportedEncoding,
    /// Required attribute missing
    MissingRequiredAttribute,
}

impl MapError {
    /// The parse-failure kind, for errors raised while reading TMX.
    pub fn parse_kind(&self) -> Option<ParseErrorKind> {
        match self {
            MapError::MalformedXml { .. } | MapError::InvalidAttribute { .. } => {
                Some(ParseErrorKind::MalformedXml)
            }
            MapError::UnsupportedEncoding { .. } => Some(ParseErrorKind::UnsupportedEncoding),
            MapError::MissingAttribute { .. } => Some(ParseErrorKind::MissingRequiredAttribute),
            _ => None,
        }
    }
}

impl From<quick_xml::Error> for MapError {
    fn from(err: quick_xml::Error) -> Self {
        MapError::MalformedXml {
            context: err.to_string(),
        }
    }
}

/// Error type for per-level lap record files.
#[derive(Debug, Error)]
pub enum RecordError {
    /// File I/O error
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Save file path
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },
    /// Save file contents do not follow the record format
    #[error("malformed save file line {line}: {message}")]
    Malformed {
        /// 1-based line number
        line: usize,
        /// What was wrong
        message: String,
    },
}

/// Error type for TOML configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Config path
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },
    /// TOML syntax or type mismatch
    #[error("invalid config {path}: {source}")]
    Toml {
        /// Config path
        path: PathBuf,
        /// Underlying error
        source: toml::de::Error,
    },
}

/// Error type for a running level.
#[derive(Debug, Error)]
pub enum LevelError {
    /// Asset or image problem (track mask build, sprite decode)
    #[error(transparent)]
    Map(#[from] MapError),
    /// The level's save file could not be read
    #[error(transparent)]
    Record(#[from] RecordError),
}
