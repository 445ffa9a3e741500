mod error;
mod recorder;
mod seed;

pub use error::{err, Error, ErrorKind, Result};
pub use recorder::{NullRecorder, Recorder};
pub use seed::derive_replica_seed;
