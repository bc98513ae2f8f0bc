use std::collections::{HashMap, HashSet};

use log::info;
use strum::{EnumIter, FromRepr, IntoEnumIterator, VariantArray};

use crate::{
    assert_interval,
    ds::{Matrix, Tensor3},
    env::ActionSpace,
    mdp::{Mdp, MdpConfig},
    render::Renderer,
};

/// Cell coordinates `(x, y)`, with `y` growing downwards
pub type Cell = (usize, usize);

#[derive(EnumIter, VariantArray, FromRepr, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dir {
    North = 0,
    South = 1,
    East = 2,
    West = 3,
}

impl Dir {
    fn delta(self) -> (isize, isize) {
        match self {
            Dir::North => (0, -1),
            Dir::South => (0, 1),
            Dir::East => (1, 0),
            Dir::West => (-1, 0),
        }
    }
}

/// Configuration for a [`Maze`]
#[derive(Debug, Clone, PartialEq)]
pub struct MazeConfig {
    /// Probability of moving in one of the three unintended directions instead, split evenly between them
    ///
    /// **Default**: `0.0`
    pub slip: f64,
    /// Reward for every action outside a goal cell
    ///
    /// **Default**: `0.0`
    pub step_reward: f64,
    /// Reward for any action taken in a goal cell
    ///
    /// **Default**: `1.0`
    pub goal_reward: f64,
}

impl Default for MazeConfig {
    fn default() -> Self {
        Self {
            slip: 0.0,
            step_reward: 0.0,
            goal_reward: 1.0,
        }
    }
}

/// A grid maze with walls and goal cells, which can be turned into an [`Mdp`]
///
/// Every free cell is a state, numbered in row-major order. One extra absorbing "well" state is appended as the
/// last state: acting in a goal cell moves the agent into the well, where it stays with no further reward. Since
/// the well is the last index, [`Mdp::reset`] with `uniform` set starts the agent in any free cell.
#[derive(Debug, Clone)]
pub struct Maze {
    width: usize,
    height: usize,
    walls: HashSet<Cell>,
    cells: Vec<Cell>,
    index: HashMap<Cell, usize>,
    goals: Vec<Cell>,
    starts: Vec<Cell>,
    config: MazeConfig,
}

impl Maze {
    /// Initialize a maze of the given size
    ///
    /// The agent starts in the first free cell.
    ///
    /// **Panics** if `config.slip` is not in the interval `[0,1]`
    pub fn new(
        width: usize,
        height: usize,
        walls: &[Cell],
        goals: &[Cell],
        config: MazeConfig,
    ) -> Result<Self, String> {
        Self::build(width, height, walls.iter().copied().collect(), goals.to_vec(), Vec::new(), config)
    }

    /// Parse a maze from a text layout, one line per row
    ///
    /// `#` is a wall, `.` a free cell, `G` a goal and `S` a start cell. Leading and trailing blank lines and
    /// surrounding whitespace on each line are ignored.
    pub fn parse(layout: &str, config: MazeConfig) -> Result<Self, String> {
        let rows = layout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>();
        let height = rows.len();
        let width = rows.first().map_or(0, |row| row.chars().count());

        let mut walls = HashSet::new();
        let mut goals = Vec::new();
        let mut starts = Vec::new();
        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() != width {
                return Err(format!("Row {} has length {}, expected {}", y, row.chars().count(), width));
            }

            for (x, c) in row.chars().enumerate() {
                match c {
                    '#' => {
                        walls.insert((x, y));
                    }
                    'G' => goals.push((x, y)),
                    'S' => starts.push((x, y)),
                    '.' => {}
                    _ => return Err(format!("Unknown symbol `{}` at ({}, {})", c, x, y)),
                }
            }
        }

        Self::build(width, height, walls, goals, starts, config)
    }

    fn build(
        width: usize,
        height: usize,
        walls: HashSet<Cell>,
        goals: Vec<Cell>,
        mut starts: Vec<Cell>,
        config: MazeConfig,
    ) -> Result<Self, String> {
        assert_interval!(config.slip, 0.0, 1.0);

        let cells = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .filter(|cell| !walls.contains(cell))
            .collect::<Vec<_>>();
        if cells.is_empty() {
            return Err(String::from("Maze has no free cells"));
        }

        let index = cells
            .iter()
            .enumerate()
            .map(|(i, &cell)| (cell, i))
            .collect::<HashMap<_, _>>();
        for &cell in goals.iter().chain(&starts) {
            if !index.contains_key(&cell) {
                return Err(format!("Cell {:?} is a wall or outside the maze", cell));
            }
        }

        if starts.is_empty() {
            starts.push(cells[0]);
        }

        Ok(Self {
            width,
            height,
            walls,
            cells,
            index,
            goals,
            starts,
            config,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_wall(&self, cell: Cell) -> bool {
        self.walls.contains(&cell)
    }

    /// Free cells in state order
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Number of states, including the well
    pub fn nb_states(&self) -> usize {
        self.cells.len() + 1
    }

    /// The absorbing state entered after a goal
    pub fn well(&self) -> usize {
        self.cells.len()
    }

    pub fn state_of(&self, cell: Cell) -> Option<usize> {
        self.index.get(&cell).copied()
    }

    /// The cell of a state, or `None` for the well
    pub fn cell_of(&self, state: usize) -> Option<Cell> {
        self.cells.get(state).copied()
    }

    /// Goal states followed by the well
    pub fn terminal_states(&self) -> Vec<usize> {
        self.goals
            .iter()
            .filter_map(|&cell| self.state_of(cell))
            .chain([self.well()])
            .collect()
    }

    /// Uniform over the start cells
    pub fn start_distribution(&self) -> Vec<f64> {
        let mut p0 = vec![0.0; self.nb_states()];
        let p = 1.0 / self.starts.len() as f64;
        for cell in &self.starts {
            p0[self.index[cell]] += p;
        }

        p0
    }

    /// Where moving from `cell` in `dir` lands, staying put when blocked by a wall or the border
    fn destination(&self, cell: Cell, dir: Dir) -> Cell {
        let (dx, dy) = dir.delta();
        let x = cell.0 as isize + dx;
        let y = cell.1 as isize + dy;
        if x < 0 || y < 0 || x >= self.width as isize || y >= self.height as isize {
            return cell;
        }

        let next = (x as usize, y as usize);
        if self.walls.contains(&next) {
            cell
        } else {
            next
        }
    }

    /// Transition tensor of shape `[states, 4, states]`, actions ordered as [`Dir`]
    pub fn transitions(&self) -> Tensor3 {
        let n = self.nb_states();
        let well = self.well();
        let goals = self.goals.iter().collect::<HashSet<_>>();
        let mut transitions = Tensor3::zeros([n, Dir::VARIANTS.len(), n]);

        for (s, &cell) in self.cells.iter().enumerate() {
            for action in Dir::iter() {
                let row = transitions.row_mut(s, action as usize);
                if goals.contains(&cell) {
                    row[well] = 1.0;
                    continue;
                }

                for dir in Dir::iter() {
                    let p = if dir == action {
                        1.0 - self.config.slip
                    } else {
                        self.config.slip / 3.0
                    };
                    if p > 0.0 {
                        row[self.index[&self.destination(cell, dir)]] += p;
                    }
                }
            }
        }

        for action in Dir::iter() {
            transitions[(well, action as usize, well)] = 1.0;
        }

        transitions
    }

    /// Reward table of shape `[states, 4]`
    pub fn rewards(&self) -> Matrix {
        let mut rewards = Matrix::zeros(self.nb_states(), Dir::VARIANTS.len());
        for (s, cell) in self.cells.iter().enumerate() {
            let reward = if self.goals.contains(cell) {
                self.config.goal_reward
            } else {
                self.config.step_reward
            };
            for action in Dir::iter() {
                rewards[(s, action as usize)] = reward;
            }
        }

        rewards
    }

    /// Build the [`Mdp`] for this maze
    ///
    /// `config.terminal_states` is replaced by the goals and the well.
    pub fn build_mdp<P: Renderer>(&self, renderer: P, config: MdpConfig) -> Mdp<P, Dir> {
        info!(
            "Building maze MDP: {}x{} grid, {} states, {} goals",
            self.width,
            self.height,
            self.nb_states(),
            self.goals.len()
        );

        Mdp::new(
            self.nb_states(),
            ActionSpace::new(Dir::VARIANTS.to_vec()),
            self.start_distribution(),
            self.transitions(),
            self.rewards(),
            renderer,
            MdpConfig {
                terminal_states: self.terminal_states(),
                ..config
            },
        )
    }
}
