//! Lazily buffered, re-readable access to sequential byte sources,
//! plus a helper for stopping interdependent units in a safe order.

mod buffer;
pub mod errors;
mod shutdown;
mod source;

pub use buffer::LazyBuffer;
pub use errors::{Result, StreamError};
pub use shutdown::{
    stop_in_dependency_order, DependencyOrderer, NodeOrder, StopUnit,
};
pub use source::{ByteSource, ReaderSource};
