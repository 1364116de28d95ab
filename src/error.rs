use thiserror::Error;

/// Errors raised while loading inputs, joining them, or rendering the map.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A required column is absent from the observation table
    #[error("Missing required column '{column}' in {source_name}")]
    MissingColumn { column: String, source_name: String },

    /// Failed to read or parse CSV
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    /// Failed to read an input file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse GeoJSON
    #[error("Failed to parse GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),

    /// Failed to parse the style file
    #[error("Failed to parse style file: {0}")]
    Style(#[from] serde_json::Error),

    /// Date could not be parsed
    #[error("Failed to parse date '{value}' on line {line}")]
    DateParse { value: String, line: u64 },

    /// Watershed id could not be parsed
    #[error("Invalid watershed id '{value}' on line {line}")]
    InvalidWatershedId { value: String, line: u64 },

    /// Watershed feature carries no usable id property
    #[error("Watershed feature {index} has no '{property}' property")]
    MissingWatershedId { index: usize, property: String },

    /// Geometry of an unexpected kind for the layer
    #[error("Unexpected geometry in {layer}: expected {expected}")]
    UnexpectedGeometry { layer: String, expected: &'static str },

    /// Precipitation label not in the ordinal scale
    #[error("Unknown precipitation category '{0}'")]
    UnknownPrecipitation(String),

    /// Topic seen in the data without a palette or order entry
    #[error("Topic '{0}' has no entry in the style's topic order and palette")]
    UnmappedTopic(String),

    /// Precipitation level seen in the data without a marker size
    #[error("Precipitation category '{0}' has no marker size")]
    UnmappedPrecipitation(String),

    /// Period argument could not be parsed
    #[error("Invalid period '{0}', expected LABEL=YYYY-MM-DD..YYYY-MM-DD")]
    InvalidPeriod(String),

    /// Two periods share a label
    #[error("Period label '{0}' is used more than once")]
    DuplicatePeriod(String),

    /// Colour literal could not be parsed
    #[error("Invalid colour '{0}', expected #RRGGBB")]
    InvalidColor(String),

    /// Figure path has an extension we cannot render to
    #[error("Unsupported output format for '{0}', use .png or .svg")]
    UnsupportedOutput(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
