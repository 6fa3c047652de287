//! Concurrency primitives coordinating the producer and the insert workers.
//!
//! - [`handoff`] is the zero-capacity job queue providing backpressure between the scan and
//!   the workers.
//! - [`signal`] publishes the insert statement once the header is known.
//! - [`completion`] counts outstanding jobs so the driver knows when everything was
//!   acknowledged.
//! - [`shutdown`] lets an operator stop the scan early while in-flight jobs finish.

pub mod completion;
pub mod handoff;
pub mod shutdown;
pub mod signal;
