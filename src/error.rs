//! Error types for pinch
//!
//! Each concern gets its own enum. The tour session never lets any of these
//! cross a page transition; they are logged and surfaced as notifications.

use thiserror::Error;

/// Errors from the key/value store and the profile blob kept in it
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("corrupt profile blob: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised while loading or validating a tour catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid catalog: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("catalog has no pages")]
    Empty,

    #[error("page {route} has no steps")]
    EmptyPage { route: String },

    #[error("duplicate route {0}")]
    DuplicateRoute(String),

    #[error("page {route}: duplicate step {step}")]
    DuplicateStep { route: String, step: String },

    #[error("page {route}: skip rule on step {from} targets unknown step {to}")]
    UnknownSkipTarget {
        route: String,
        from: String,
        to: String,
    },

    #[error("page {route}: skip rule on step {from} must jump forward, not to {to}")]
    BackwardSkip {
        route: String,
        from: String,
        to: String,
    },

    #[error("page {route}: step {step} anchor {kind} needs a key")]
    MissingAnchorKey {
        route: String,
        step: String,
        kind: String,
    },
}

/// Errors parsing a step id such as `7b`
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StepIdError {
    #[error("invalid step id '{0}': expected a number optionally followed by one lowercase letter")]
    Invalid(String),
}

/// Errors decoding a tour deep link
#[derive(Debug, Error)]
pub enum DeepLinkError {
    #[error("malformed deep link: {0}")]
    Malformed(#[from] serde_urlencoded::de::Error),

    #[error("deep link step: {0}")]
    Step(#[from] StepIdError),

    #[error("unknown tour page '{0}'")]
    UnknownPage(String),

    #[error("step {step} is not part of page {page}")]
    UnknownStep { page: String, step: String },
}
