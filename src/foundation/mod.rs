pub mod batch;
pub mod error;
