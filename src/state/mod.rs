//! Persistence of which boot medium was selected, across resets.

#[cfg(feature = "simple_state")]
pub mod simple;
