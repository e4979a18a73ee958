//! Download engine
//!
//! The probe/segment/fetch/merge pipeline:
//! - Probe the URL for size and range support
//! - Plan contiguous byte-range segments
//! - Fetch segments in parallel with bounded retry
//! - Merge temp files into the final output

mod merge;
mod probe;
mod segment_worker;
mod segments;
mod task;

pub use merge::*;
pub use probe::*;
pub use segment_worker::*;
pub use segments::*;
pub use task::*;
