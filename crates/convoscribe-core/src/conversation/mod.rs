//! Turn assembly from parsed context messages.

pub mod assembler;

pub use assembler::{assemble_snapshot, assemble_turns};
