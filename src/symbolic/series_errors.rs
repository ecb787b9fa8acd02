// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
//! Error types shared by the symbolic engine, the series expander and the input boundary.
use std::num::{ParseFloatError, ParseIntError};
use thiserror::Error;

pub type SeriesResult<T> = std::result::Result<T, SeriesError>;

/// Root cause of a failed parse at the input boundary
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseFailure {
    #[error("cannot parse expression '{input}': {reason}")]
    Expression { input: String, reason: String },
    #[error("empty variable name in '{0}'")]
    EmptyVariable(String),
    #[error("'{0}' is not a variable=point assignment")]
    MissingAssignment(String),
    #[error("invalid point value '{token}': {source}")]
    InvalidPoint {
        token: String,
        #[source]
        source: ParseFloatError,
    },
    #[error("'{0}' is not a finite number")]
    NonFinite(String),
    #[error("invalid order '{token}': {source}")]
    InvalidOrder {
        token: String,
        #[source]
        source: ParseIntError,
    },
    #[error("unknown combination mode '{0}'")]
    UnknownMode(String),
    #[error("task document: {0}")]
    Document(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("failed to parse {field}: {cause}")]
    InputParsing {
        field: &'static str,
        #[source]
        cause: ParseFailure,
    },
    #[error("variable mismatch: {0}")]
    VariableMismatch(String),
    #[error("invalid order {order}: must be between 0 and {max}")]
    InvalidOrder { order: i64, max: usize },
    #[error("cannot differentiate: {0}")]
    Differentiation(String),
    #[error("{functions} functions but {points} expansion points")]
    LengthMismatch { functions: usize, points: usize },
    #[error("cannot evaluate: {0}")]
    Evaluation(String),
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl SeriesError {
    pub fn parsing(field: &'static str, cause: ParseFailure) -> Self {
        SeriesError::InputParsing { field, cause }
    }
}
