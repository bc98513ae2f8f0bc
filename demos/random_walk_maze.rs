use std::error::Error;

use mazemdp::{
    gym::{Maze, MazeConfig},
    render::RenderMode,
    viz::GridPlotter,
    MdpConfig,
};

const LAYOUT: &str = "
    S....#....
    .###.#.##.
    .#...#..#.
    .#.###.##.
    ...#......
    .#...##.#G
";

fn main() -> Result<(), Box<dyn Error>> {
    let maze = Maze::parse(
        LAYOUT,
        MazeConfig {
            slip: 0.1,
            step_reward: -0.01,
            goal_reward: 1.0,
        },
    )?;

    let plotter = GridPlotter::for_maze(&maze).with_out_dir("demos/out");
    let mut mdp = maze.build_mdp(
        plotter,
        MdpConfig {
            timeout: 200,
            seed: Some(42),
            ..Default::default()
        },
    );

    mdp.new_render("random walk", RenderMode::Human);
    mdp.reset(true);

    let mut total = 0.0;
    while !mdp.done() {
        let action = mdp.sample_action(None) as usize;
        let (_, reward, _, _) = mdp.step(action, 0.0);
        total += reward;
    }

    mdp.render(None, None, None, "final position", RenderMode::Human);
    mdp.save_fig("random_walk")?;
    println!("Episode finished after {} steps with return {:.2}", mdp.timestep(), total);

    Ok(())
}
