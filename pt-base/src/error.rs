// Error taxonomy from the swap core's error handling design: we want
// 1. a way to create a new error with a backtrace
// 2. a way to centralize logging any error fairly soon after it's created
// 3. callers to be able to match on *why*, not just catch a string

use std::borrow::Cow;
use backtrace_error::DynBacktraceError;
use tracing::error;

#[cfg(test)]
use test_log::test;

/// Which of the swap core's documented failure conditions produced this error.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ErrorKind {
    /// A `keys`/`destinations` set handed to a collective was not a
    /// permutation of `1..N`.
    PermutationViolation,
    /// `partner_chain(partner_chain(c)) != c` for some chain `c`.
    InvolutionViolation,
    /// Two sides of `_swap!` computed different accept/reject booleans.
    DecisionDisagreement,
    /// The underlying transport failed to deliver or receive a message.
    CommunicationFailure,
    /// No specific taxonomy entry; wraps an arbitrary external error.
    Other,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    inner: DynBacktraceError,
}

pub type Result<T> = std::result::Result<T, Error>;

struct SimpleErr(Cow<'static, str>);
impl std::fmt::Debug for SimpleErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::fmt::Display for SimpleErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for SimpleErr {
    fn description(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.inner)
    }
}
impl std::error::Error for Error {}

// Any external error (io::Error, a serde error, ...) arrives with kind
// Other; code that wants to surface a specific taxonomy entry builds one
// explicitly with `Error::new` or `err`.
impl<E: std::error::Error + Send + Sync + 'static> From<E> for Error {
    fn from(e: E) -> Error {
        Error::new(ErrorKind::Other, e)
    }
}

impl Error {
    pub fn new<E: std::error::Error + Send + Sync + 'static>(kind: ErrorKind, e: E) -> Error {
        error!(target: "pt", ?kind, "{:?}", e);
        Error {
            kind,
            inner: DynBacktraceError::from(e),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub fn err(kind: ErrorKind, msg: impl Into<Cow<'static, str>>) -> Error {
    Error::new(kind, SimpleErr(msg.into()))
}

#[test]
fn test_error_kind_round_trips() {
    let e = err(ErrorKind::PermutationViolation, "not a permutation");
    assert_eq!(e.kind(), ErrorKind::PermutationViolation);
}
