pub mod common;
pub mod queue;
pub mod sync;
pub mod threads;
