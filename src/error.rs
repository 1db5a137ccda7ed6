//! Error taxonomy for feed decoding and board queries.

use thiserror::Error;

/// A feed could not be turned into a [`crate::model::FeedMessage`].
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed protobuf: {0}")]
    Protobuf(#[from] prost::DecodeError),
    #[error("feed header has no gtfs_realtime_version")]
    MissingVersion,
    #[error("unsupported gtfs_realtime_version {0:?}")]
    UnsupportedVersion(String),
    #[error("entity #{0} has no id")]
    MissingEntityId(usize),
}

/// Errors surfaced by the board query API.
///
/// None of these are fatal: callers report them and carry on with the next
/// query or refresh cycle.
#[derive(Error, Debug)]
pub enum BoardError {
    #[error("unknown stop key: {0}")]
    UnknownStop(String),
    #[error("unknown location: {0}")]
    UnknownLocation(String),
}

/// A service-hours entry that is not a `H:MM`/`HH:MM` time of day.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("invalid clock time {0:?}, expected HH:MM between 00:00 and 24:00")]
pub struct InvalidClockTime(pub String);
