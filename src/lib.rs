/// Dense tables for transition and reward models
pub mod ds;

/// Environment
pub mod env;

/// Episode experiences
pub mod memory;

/// Tabular Markov decision process
pub mod mdp;

/// Probabilistic sampling
pub mod prob;

/// Rendering interface
pub mod render;

/// Testing environments
#[cfg(feature = "gym")]
pub mod gym;

/// Terminal visualization of grid worlds
#[cfg(feature = "viz")]
pub mod viz;

mod util;

pub use env::ActionSpace;
pub use mdp::{Mdp, MdpConfig, StepInfo};
