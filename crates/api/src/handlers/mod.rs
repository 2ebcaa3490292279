pub mod executions;
pub mod values;

use axum::http::StatusCode;
use engine::EngineError;

/// Map an engine error onto the REST status code a caller should see.
pub(crate) fn status_for(err: &EngineError) -> StatusCode {
    match err {
        EngineError::NotAnInputNode(_)
        | EngineError::CannotRetryInputNode(_)
        | EngineError::NonStringMapKey(_)
        | EngineError::InvalidWait
        | EngineError::InvalidTimeout => StatusCode::BAD_REQUEST,

        EngineError::NotSet(_) => StatusCode::NOT_FOUND,
        EngineError::ComputationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,

        EngineError::GraphNotRegistered(_, _) => StatusCode::CONFLICT,
        EngineError::ExecutionNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::NodeNotFound(_, _, _) => StatusCode::NOT_FOUND,

        EngineError::NodeExecutionFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::Database(db::DbError::NotFound) => StatusCode::NOT_FOUND,
        EngineError::Database(_) | EngineError::Queue(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
