//! Workspace root crate.
//!
//! Re-exports [`core_playback`] so a host application can depend on this
//! workspace by path without wiring each member crate individually.

pub use core_playback;
