use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record 0x{id:02x}: payload too short (needs {needed} bytes, got {got})")]
    ShortPayload { id: u8, needed: usize, got: usize },

    #[error("record 0x{id:02x}: invalid satellite id {sv}")]
    InvalidSatellite { id: u8, sv: u8 },

    #[error("no position/time reference: log has no fix and no lat/lon + UTC records, provide both --date and --xyz (or --llh)")]
    MissingReference,

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("no observable selected")]
    NoObservables,

    #[error("invalid configuration: {0}")]
    Configuration(String),
}
