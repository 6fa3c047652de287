//! Core data types flowing through a load.

mod dead_letter;
mod header;
mod job;
mod statement;
mod summary;

pub use dead_letter::DeadLetter;
pub use header::Header;
pub use job::{Job, Row, SourcePosition};
pub use statement::InsertStatement;
pub use summary::LoadSummary;
