//! Memory accounting and pressure-responsive buffer pools.

pub mod accountant;
pub mod pool;

pub use accountant::{MemoryAccountant, PressureLevel};
pub use pool::BufferPool;
