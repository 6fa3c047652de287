mod base;
pub mod memory;
pub mod mysql;

pub use base::RowInserter;
