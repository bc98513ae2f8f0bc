use std::{
    collections::HashSet,
    fs, io,
    path::{Path, PathBuf},
};

use ratatui::{prelude::*, widgets::*};

use crate::render::{RenderMode, RenderRequest, Renderer};

/// Grid coordinates `(x, y)`
type Pos = (usize, usize);

/// Width of a grid cell in terminal columns
const CELL_WIDTH: usize = 2;

#[derive(Clone, Copy, PartialEq, Default, Debug)]
pub struct Hsl(pub f64, pub f64, pub f64);

impl From<Hsl> for Color {
    fn from(value: Hsl) -> Self {
        let Hsl(h, s, l) = value;
        Color::from_hsl(h, s, l)
    }
}

fn linear_gradient(gradient: (Hsl, Hsl), percent: f64) -> Color {
    let (Hsl(h1, s1, l1), Hsl(h2, s2, l2)) = gradient;
    Hsl(
        interpolate(h1, h2, percent),
        interpolate(s1, s2, percent),
        interpolate(l1, l2, percent),
    )
    .into()
}

fn interpolate(a: f64, b: f64, p: f64) -> f64 {
    a + (p * (b - a))
}

/// The geometry of a grid world: its size, walls and the cell of each state
#[derive(Debug, Clone, PartialEq)]
struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Pos>,
    walls: HashSet<Pos>,
}

/// Draws one frame of a grid world inside a titled border
struct GridView<'a> {
    grid: &'a Grid,
    arrows: &'a [&'static str],
    gradient: (Hsl, Hsl),
    request: RenderRequest<'a>,
}

impl GridView<'_> {
    /// Background color of each state, scaled between the lowest and highest value
    fn heat(&self) -> Vec<Option<Color>> {
        let Some(v) = self.request.v.filter(|v| !v.is_empty()) else {
            return vec![None; self.grid.cells.len()];
        };

        let lo = v.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (0..self.grid.cells.len())
            .map(|s| {
                v.get(s).map(|&x| {
                    let percent = if hi > lo { (x - lo) / (hi - lo) } else { 0.5 };
                    linear_gradient(self.gradient, percent)
                })
            })
            .collect()
    }
}

impl Widget for GridView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .title(self.request.title);
        let inner = block.inner(area);
        block.render(area, buf);

        let put = |buf: &mut Buffer, pos: Pos, symbol: &str, style: Style| {
            let x = inner.x as usize + pos.0 * CELL_WIDTH;
            let y = inner.y as usize + pos.1;
            if x + CELL_WIDTH <= inner.right() as usize && y < inner.bottom() as usize {
                buf.set_string(x as u16, y as u16, format!("{:<1$}", symbol, CELL_WIDTH), style);
            }
        };

        for &wall in &self.grid.walls {
            put(buf, wall, "██", Style::default().dark_gray());
        }

        let heat = self.heat();
        for (s, &pos) in self.grid.cells.iter().enumerate() {
            let style = heat[s].map_or(Style::default(), |c| Style::default().bg(c));
            let symbol = if self.request.agent_state == Some(s) {
                "@"
            } else {
                self.request
                    .policy
                    .and_then(|policy| policy.get(s))
                    .and_then(|&a| self.arrows.get(a).copied())
                    .unwrap_or("·")
            };
            put(buf, pos, symbol, style);
        }
    }
}

/// A [`Renderer`] that draws grid worlds as text
///
/// Each figure is drawn into an in-memory terminal buffer. Walls are shown as blocks, the value function as a
/// background heatmap, the policy as arrows and the agent as `@`. In [`RenderMode::Human`] every frame is also
/// printed to stdout. Saved figures are plain text files.
pub struct GridPlotter {
    grid: Grid,
    arrows: Vec<&'static str>,
    gradient: (Hsl, Hsl),
    out_dir: PathBuf,
    figure: Buffer,
    figures: usize,
}

impl GridPlotter {
    /// Initialize a plotter for a `width` by `height` grid
    ///
    /// ### Parameters
    /// - `cells` - The cell of each state, indexed by state. States beyond the list (such as a well) are not drawn.
    /// - `walls` - Cells drawn as walls
    pub fn new(width: usize, height: usize, cells: Vec<Pos>, walls: impl IntoIterator<Item = Pos>) -> Self {
        let grid = Grid {
            width,
            height,
            cells,
            walls: walls.into_iter().collect(),
        };
        Self {
            figure: Buffer::empty(figure_area(&grid)),
            grid,
            arrows: vec!["↑", "↓", "→", "←"],
            gradient: (Hsl(240.0, 70.0, 25.0), Hsl(0.0, 80.0, 45.0)),
            out_dir: PathBuf::from("."),
            figures: 0,
        }
    }

    /// Initialize a plotter for a [`Maze`](crate::gym::Maze)
    #[cfg(feature = "gym")]
    pub fn for_maze(maze: &crate::gym::Maze) -> Self {
        let walls = (0..maze.height())
            .flat_map(|y| (0..maze.width()).map(move |x| (x, y)))
            .filter(|&cell| maze.is_wall(cell))
            .collect::<Vec<_>>();
        Self::new(maze.width(), maze.height(), maze.cells().to_vec(), walls)
    }

    /// Set the symbols used for each action index of a policy
    ///
    /// **Default**: `↑ ↓ → ←`, matching the order of [`Dir`](crate::gym::Dir)
    pub fn with_arrows(mut self, arrows: Vec<&'static str>) -> Self {
        self.arrows = arrows;
        self
    }

    /// Set the directory figures are saved to
    ///
    /// **Default**: the working directory
    pub fn with_out_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.out_dir = dir.as_ref().to_path_buf();
        self
    }

    /// The current figure as text, one line per row
    pub fn figure_text(&self) -> String {
        let area = self.figure.area;
        (area.top()..area.bottom())
            .map(|y| {
                let line = (area.left()..area.right())
                    .map(|x| self.figure.get(x, y).symbol())
                    .collect::<String>();
                line.trim_end().to_string()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn draw(&mut self, request: RenderRequest<'_>) {
        let area = self.figure.area;
        self.figure.reset();
        GridView {
            grid: &self.grid,
            arrows: &self.arrows,
            gradient: self.gradient,
            request,
        }
        .render(area, &mut self.figure);

        if request.mode == RenderMode::Human {
            println!("{}", self.figure_text());
        }
    }
}

fn figure_area(grid: &Grid) -> Rect {
    Rect::new(0, 0, (grid.width * CELL_WIDTH + 2) as u16, (grid.height + 2) as u16)
}

impl Renderer for GridPlotter {
    /// Index of the figure drawn into
    type Handle = usize;

    fn new_render(&mut self, title: &str, mode: RenderMode) -> usize {
        self.figures += 1;
        self.draw(RenderRequest {
            title,
            mode,
            ..Default::default()
        });
        self.figures - 1
    }

    fn render(&mut self, request: RenderRequest<'_>) -> usize {
        if self.figures == 0 {
            self.figures = 1;
        }
        self.draw(request);
        self.figures - 1
    }

    fn save_fig(&mut self, title: &str) -> io::Result<()> {
        fs::create_dir_all(&self.out_dir)?;
        fs::write(self.out_dir.join(format!("{}.txt", title)), self.figure_text() + "\n")
    }
}
