//! Execution graph assembled from an analyzed program

mod assembler;
mod module;

pub use assembler::{Assembler, BytecodeGenerator, NoBytecode};
pub use module::*;
