use std::{error::Error, fmt, io};

pub type PingResult<T> = std::result::Result<T, PingError>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PingErrorKind {
    /// Missing or malformed configuration, detected before any network activity.
    Config,
    /// The raw socket could not be opened for lack of privileges.
    Privilege,
    /// The address does not parse for the selected IP version.
    InvalidAddress,
    Io,
}

#[derive(Debug)]
pub struct PingError {
    pub kind: PingErrorKind,
    pub message: String,
    // no chained error
}

impl PingError {
    pub(crate) fn new(kind: PingErrorKind, message: impl Into<String>) -> Self {
        PingError { kind, message: message.into() }
    }

    pub(crate) fn from_socket_error(error: &io::Error) -> Self {
        let kind = match error.kind() {
            io::ErrorKind::PermissionDenied => PingErrorKind::Privilege,
            _ => PingErrorKind::Io,
        };
        PingError::new(kind, format!("socket: {error}"))
    }

    /// A malformed destination only ends the session for that destination; everything
    /// else that escapes a session is a failure of the whole run.
    pub fn is_fatal(&self) -> bool {
        self.kind != PingErrorKind::InvalidAddress
    }

    /// Operator advice printed below the message, if any.
    pub fn hint(&self) -> Option<&'static str> {
        match self.kind {
            PingErrorKind::Privilege => Some("You need to run the program with sudo."),
            _ => None,
        }
    }
}

impl fmt::Display for PingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "PingError")?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

impl Error for PingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

impl From<io::Error> for PingError {
    fn from(error: io::Error) -> PingError {
        PingError::new(PingErrorKind::Io, error.to_string())
    }
}
