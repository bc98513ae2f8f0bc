pub mod maze;

pub use maze::{Cell, Dir, Maze, MazeConfig};
