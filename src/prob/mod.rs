mod discrete;

pub use discrete::{sample, Discrete};
