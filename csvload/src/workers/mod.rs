//! Insert workers and the policies they apply to failed attempts.

pub mod backoff;
pub mod executor;
pub mod insert;
pub mod policy;
pub mod pool;
