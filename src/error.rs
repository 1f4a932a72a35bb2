use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScoreError {
    #[error("instrument not found: {0}")]
    InstrumentNotFound(String),

    #[error("invalid instrument: {0}")]
    InvalidInstrument(String),

    #[error("invalid answer: {0}")]
    InvalidAnswer(String),

    #[error("incomplete answers: {answered} of {total} questions answered")]
    IncompleteAnswers { answered: usize, total: usize },

    #[error("unknown norm set: {0}")]
    UnknownNormSet(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, ScoreError>;
