//! Mapping of backend errors into engine errors.

use crate::domain::{ObjectIoError, SystemError};

/// Wrap an error from a metadata or probe call.
///
/// A missing object becomes [`ObjectIoError::ObjectNotFound`]; everything
/// else is passed through as [`ObjectIoError::System`].
pub(crate) fn from_system(err: SystemError) -> ObjectIoError {
    match err {
        SystemError::NotFound(path) => ObjectIoError::ObjectNotFound(path),
        other => ObjectIoError::System(other),
    }
}
