// ⚠️ Error taxonomy for the mapping pipeline
//
// Per-row problems (missing coordinates, unmapped codes) are never errors: they
// are counted and logged by the stage that sees them. Everything in here aborts
// the run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapperError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("footprint '{name}' is invalid: {reason}")]
    InvalidFootprint { name: String, reason: String },

    #[error("footprint name '{0}' appears more than once")]
    DuplicateFootprint(String),

    #[error("footprints use EPSG:{found}, registry coordinates are EPSG:{expected}")]
    CrsMismatch { expected: u32, found: u32 },

    /// Every registry row carries an unmapped building class, so the
    /// most-frequent-type fallback has nothing to count.
    #[error("no registry record carries a mapped building class")]
    NoDominantBuildingType,

    #[error("no registry record falls inside the study area")]
    EmptyStudyArea,

    #[error("cannot compute population reference: {0}")]
    NoPopulationReference(String),

    #[error("construction year {year} is not covered by any era range")]
    EraRangeUncovered { year: i32 },

    #[error("construction year {year} matches several era ranges: {labels:?}")]
    EraRangeAmbiguous { year: i32, labels: Vec<String> },

    #[error("era ranges '{first}' and '{second}' overlap")]
    EraTableOverlap { first: String, second: String },

    #[error("era table has a gap between '{after}' and '{before}'")]
    EraTableGap { after: String, before: String },

    #[error("era table is empty")]
    EmptyEraTable,
}

pub type MapperResult<T> = Result<T, MapperError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MapperError::EraRangeAmbiguous {
            year: 1975,
            labels: vec!["STANDARD2".to_string(), "STANDARD3".to_string()],
        };
        let text = err.to_string();
        assert!(text.contains("1975"));
        assert!(text.contains("STANDARD3"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.tsv");
        let err: MapperError = io_err.into();
        assert!(matches!(err, MapperError::Io(_)));
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> MapperResult<()> {
            Err(MapperError::EmptyStudyArea)
        }

        fn outer() -> MapperResult<u32> {
            inner()?;
            Ok(1)
        }

        assert!(matches!(outer(), Err(MapperError::EmptyStudyArea)));
    }
}
