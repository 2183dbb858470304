//! Job and allocation model: the data structures describing a unit of work
//! and its placement on a node.

pub mod allocation;
pub mod allocator;
pub mod job;

pub use allocation::Allocation;
pub use allocator::{Allocator, AllocatorHandle};
pub use job::{ExecutionRequest, Job, TaskGroup};
