//! Backend error classification.

use core::fmt;

/// Errors reported by an [`ObjectSystem`](crate::ObjectSystem) or one of its
/// transfer handles.
///
/// Backends classify their native failures into these kinds so the engine can
/// tell a missing object from a server failure without knowing the client.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SystemError {
    /// The object (or its container) does not exist.
    NotFound(String),
    /// The caller is not allowed to access the object.
    PermissionDenied(String),
    /// The requested range starts at or past the end of the object.
    OutOfRange {
        /// Requested start offset.
        offset: u64,
        /// Object size at the time of the request.
        size: u64,
    },
    /// The backend does not implement this operation for this object kind.
    Unsupported(&'static str),
    /// Any other backend failure.
    Backend(String),
}

impl SystemError {
    /// Classify an HTTP-like status code returned by a backend client.
    ///
    /// 404 maps to [`NotFound`](Self::NotFound), 403 to
    /// [`PermissionDenied`](Self::PermissionDenied) and 416 to
    /// [`OutOfRange`](Self::OutOfRange); everything else is a
    /// [`Backend`](Self::Backend) failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use objio_system::SystemError;
    ///
    /// assert!(SystemError::from_status(404, "blob").is_not_found());
    /// assert!(matches!(SystemError::from_status(500, "boom"), SystemError::Backend(_)));
    /// ```
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => Self::NotFound(message),
            403 => Self::PermissionDenied(message),
            416 => Self::OutOfRange { offset: 0, size: 0 },
            _ => Self::Backend(format!("status {}: {}", status, message)),
        }
    }

    /// Returns true for [`NotFound`](Self::NotFound).
    #[inline]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true for [`OutOfRange`](Self::OutOfRange).
    #[inline]
    pub const fn is_out_of_range(&self) -> bool {
        matches!(self, Self::OutOfRange { .. })
    }
}

impl fmt::Display for SystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(what) => write!(f, "Object not found: {}", what),
            Self::PermissionDenied(what) => write!(f, "Permission denied: {}", what),
            Self::OutOfRange { offset, size } => {
                write!(f, "Range starting at {} is outside object of size {}", offset, size)
            }
            Self::Unsupported(op) => write!(f, "Operation not supported by backend: {}", op),
            Self::Backend(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl core::error::Error for SystemError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classification() {
        assert!(SystemError::from_status(404, "missing").is_not_found());
        assert!(matches!(
            SystemError::from_status(403, "denied"),
            SystemError::PermissionDenied(_)
        ));
        assert!(SystemError::from_status(416, "eof").is_out_of_range());
        assert_eq!(
            SystemError::from_status(500, "boom"),
            SystemError::Backend("status 500: boom".into())
        );
    }

    #[test]
    fn test_display() {
        let err = SystemError::OutOfRange { offset: 10, size: 4 };
        assert_eq!(
            format!("{}", err),
            "Range starting at 10 is outside object of size 4"
        );
        assert!(format!("{}", SystemError::NotFound("a/b".into())).contains("a/b"));
    }
}
