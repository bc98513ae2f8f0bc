mod table;

pub use table::{Matrix, Tensor3};
