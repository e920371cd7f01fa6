use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    InvalidInput(String),
    CapacityExceeded { capacity: usize },
    UsageError(&'static str),
    NoNodeFound,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(reason) => write!(f, "invalid input: {reason}"),
            Self::CapacityExceeded { capacity } => {
                write!(f, "pixel list capacity of {capacity} exceeded")
            }
            Self::UsageError(reason) => write!(f, "usage error: {reason}"),
            Self::NoNodeFound => write!(f, "no root boundary node found"),
        }
    }
}

impl std::error::Error for Error {}
