//! Open mode value object.

use crate::domain::error::ObjectIoError;
use bitflags::bitflags;
use core::fmt;
use core::str::FromStr;

bitflags! {
    /// The mode a stream was opened with.
    ///
    /// Exactly one of [`READ`](Self::READ), [`WRITE`](Self::WRITE),
    /// [`APPEND`](Self::APPEND) or [`CREATE_NEW`](Self::CREATE_NEW) is set on
    /// a parsed mode; [`BINARY`](Self::BINARY) is accepted and carried along
    /// for display only, since every stream is a byte stream.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenMode: u8 {
        /// `r`: read an existing object.
        const READ = 0b0_0001;
        /// `w`: create or truncate, then write.
        const WRITE = 0b0_0010;
        /// `a`: write after the existing content.
        const APPEND = 0b0_0100;
        /// `x`: create, failing if the object exists.
        const CREATE_NEW = 0b0_1000;
        /// `b`: binary marker.
        const BINARY = 0b1_0000;
    }
}

impl OpenMode {
    const WRITABLE: Self = Self::WRITE.union(Self::APPEND).union(Self::CREATE_NEW);

    /// Parse a mode token such as `"r"`, `"wb"` or `"a"`.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectIoError::InvalidMode`] unless the token holds exactly
    /// one of `r`, `w`, `a`, `x`, optionally with `b`. Read-write tokens
    /// (`+`) are rejected.
    ///
    /// # Examples
    ///
    /// ```
    /// use objio::domain::OpenMode;
    ///
    /// let mode = OpenMode::parse("rb").unwrap();
    /// assert!(mode.is_readable());
    /// assert!(OpenMode::parse("r+").is_err());
    /// ```
    pub fn parse(token: &str) -> Result<Self, ObjectIoError> {
        let invalid = || ObjectIoError::InvalidMode(token.to_owned());
        let mut mode = Self::empty();
        for c in token.chars() {
            let flag = match c {
                'r' => Self::READ,
                'w' => Self::WRITE,
                'a' => Self::APPEND,
                'x' => Self::CREATE_NEW,
                'b' => Self::BINARY,
                _ => return Err(invalid()),
            };
            if mode.contains(flag) {
                return Err(invalid());
            }
            mode |= flag;
        }
        if mode.difference(Self::BINARY).bits().count_ones() != 1 {
            return Err(invalid());
        }
        Ok(mode)
    }

    /// Returns true for `r`.
    #[inline]
    pub const fn is_readable(self) -> bool {
        self.contains(Self::READ)
    }

    /// Returns true for `w`, `a` and `x`.
    #[inline]
    pub const fn is_writable(self) -> bool {
        self.intersects(Self::WRITABLE)
    }

    /// Returns true for `a`.
    #[inline]
    pub const fn is_append(self) -> bool {
        self.contains(Self::APPEND)
    }

    /// Returns true for `x`.
    #[inline]
    pub const fn is_create_new(self) -> bool {
        self.contains(Self::CREATE_NEW)
    }

    /// Canonical token for this mode.
    pub const fn as_str(self) -> &'static str {
        let binary = self.contains(Self::BINARY);
        if self.contains(Self::READ) {
            if binary { "rb" } else { "r" }
        } else if self.contains(Self::APPEND) {
            if binary { "ab" } else { "a" }
        } else if self.contains(Self::CREATE_NEW) {
            if binary { "xb" } else { "x" }
        } else if binary {
            "wb"
        } else {
            "w"
        }
    }
}

impl FromStr for OpenMode {
    type Err = ObjectIoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
