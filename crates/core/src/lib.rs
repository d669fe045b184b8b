pub mod error;
pub mod storage;

pub use error::{ErrorKind, Result, StorageError};
pub use storage::{Location, ObjectInfo, Storage};
