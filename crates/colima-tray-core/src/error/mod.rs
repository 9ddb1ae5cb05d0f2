use crate::Action;

use error_location::ErrorLocation;
use thiserror::Error;

/// Supervision errors with source location tracking.
///
/// None of these reach the UI thread as failures: controllers log them and
/// degrade to the last known (or `Unknown`) status.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A status query exited unsuccessfully or could not be spawned.
    #[error("Status query for '{entity}' failed: {output} {location}")]
    ObservationFailure {
        /// Entity whose status could not be observed.
        entity: String,
        /// Whatever combined output was captured.
        output: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A mutating command (start/stop/restart/delete) failed.
    #[error("{action} of '{entity}' failed: {output} {location}")]
    ActionFailure {
        /// Entity the action targeted.
        entity: String,
        /// The action that failed.
        action: Action,
        /// Whatever combined output was captured.
        output: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The container listing command failed.
    #[error("Container enumeration failed: {output} {location}")]
    EnumerationFailure {
        /// Whatever combined output was captured.
        output: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// An action request could not be queued for its entity.
    #[error("{action} request for '{entity}' rejected: {reason} {location}")]
    ActionRejected {
        /// Entity the action targeted.
        entity: String,
        /// The rejected action.
        action: Action,
        /// Why the request was rejected.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// No live controller is registered under the given id.
    #[error("Unknown entity: {id} {location}")]
    UnknownEntity {
        /// The id that was looked up.
        id: u64,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// No project with the given name is currently known.
    #[error("Unknown project: {name} {location}")]
    UnknownProject {
        /// The project name that was looked up.
        name: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;
