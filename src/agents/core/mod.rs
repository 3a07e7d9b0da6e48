//! Building blocks shared by the agents.

pub mod interactive;
pub mod memory;
pub mod prompt;
pub mod react;
