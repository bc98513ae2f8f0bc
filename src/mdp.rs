use std::collections::HashSet;

use log::{debug, trace};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::{
    assert_interval,
    ds::{Matrix, Tensor3},
    env::{ActionSpace, DiscreteActionSpace, DiscreteStateSpace, Environment},
    prob,
    render::{RenderMode, RenderRequest, Renderer},
};

/// Configuration for an [`Mdp`]
#[derive(Debug, Clone, PartialEq)]
pub struct MdpConfig {
    /// Discount factor, in `(0, 1]`
    ///
    /// **Default**: `0.9`
    pub gamma: f64,
    /// States that end the episode when reached
    ///
    /// **Default**: none
    pub terminal_states: Vec<usize>,
    /// Maximum length of an episode, must be greater than 10
    ///
    /// **Default**: `50`
    pub timeout: u32,
    /// Whether the environment has a discrete current state to show when rendering
    ///
    /// **Default**: `true`
    pub has_state: bool,
    /// Seed for the random number generator, or `None` to seed from entropy
    ///
    /// **Default**: `None`
    pub seed: Option<u64>,
}

impl Default for MdpConfig {
    fn default() -> Self {
        Self {
            gamma: 0.9,
            terminal_states: Vec::new(),
            timeout: 50,
            has_state: true,
            seed: None,
        }
    }
}

/// Diagnostics for a single transition
#[derive(Debug, Clone, PartialEq)]
pub struct StepInfo {
    /// The distribution `P[s, a, :]` the next state was drawn from
    pub transition_probs: Vec<f64>,
    /// The noise added to the expected reward
    pub noise: f64,
}

/// A tabular Markov decision process
///
/// Owns the transition tensor `P[s, a, s']`, the expected reward table `r[s, a]`, the start distribution and the
/// state of the current episode. Episodes start with [`reset`](Mdp::reset), advance with [`step`](Mdp::step) and end
/// when [`done`](Mdp::done) reports a terminal state or the timeout.
///
/// ### Type parameters
/// - `P`: The [`Renderer`] that draws the environment
/// - `A`: Action identifiers of the [`ActionSpace`]
pub struct Mdp<P: Renderer, A = usize> {
    nb_states: usize,
    action_space: ActionSpace<A>,
    start_distribution: Vec<f64>,
    transitions: Tensor3,
    rewards: Matrix,
    renderer: P,
    gamma: f64,
    terminal_states: HashSet<usize>,
    timeout: u32,
    has_state: bool,
    rng: StdRng,

    current_state: Option<usize>,
    timestep: u32,
    last_action_achieved: bool,
}

impl<P: Renderer, A> Mdp<P, A> {
    /// Initialize a new `Mdp`
    ///
    /// ### Parameters
    /// - `nb_states` - Number of states `S`
    /// - `action_space` - The `A` actions, in the order of the action dimension of the tables
    /// - `start_distribution` - Distribution over states used by [`reset`](Mdp::reset)
    /// - `transitions` - Transition probabilities of shape `[S, A, S]`
    /// - `rewards` - Expected rewards of shape `[S, A]`
    /// - `renderer` - Draws the environment
    ///
    /// **Panics** if `timeout` is not greater than 10, if `gamma` is not in `(0, 1]`, or if the table shapes,
    /// start distribution, action space and terminal states are inconsistent with `nb_states`
    pub fn new(
        nb_states: usize,
        action_space: ActionSpace<A>,
        start_distribution: Vec<f64>,
        transitions: Tensor3,
        rewards: Matrix,
        renderer: P,
        config: MdpConfig,
    ) -> Self {
        assert!(config.timeout > 10, "timeout too short: {}", config.timeout);
        assert_interval!(config.gamma, 0.0, 1.0);
        assert!(config.gamma > 0.0, "Invalid value for `gamma`. Must be positive.");
        assert!(nb_states > 0, "An MDP needs at least one state.");

        let nb_actions = action_space.size();
        assert_eq!(
            transitions.shape(),
            [nb_states, nb_actions, nb_states],
            "Transition tensor must have shape [states, actions, states]."
        );
        assert_eq!(
            rewards.shape(),
            [nb_states, nb_actions],
            "Reward table must have shape [states, actions]."
        );
        assert_eq!(
            start_distribution.len(),
            nb_states,
            "Start distribution must cover every state."
        );
        if let Some(s) = config.terminal_states.iter().find(|&&s| s >= nb_states) {
            panic!("Terminal state {} out of range for {} states.", s, nb_states);
        }

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            nb_states,
            action_space,
            start_distribution,
            transitions,
            rewards,
            renderer,
            gamma: config.gamma,
            terminal_states: config.terminal_states.into_iter().collect(),
            timeout: config.timeout,
            has_state: config.has_state,
            rng,
            current_state: None,
            timestep: 0,
            last_action_achieved: false,
        }
    }

    /// Start a new episode
    ///
    /// If `uniform` is false the first state is drawn from the start distribution. Otherwise it is drawn uniformly
    /// from the first `S - 1` states, leaving out the last state index (in mazes this is the absorbing well).
    ///
    /// **Returns** the initial state
    pub fn reset(&mut self, uniform: bool) -> usize {
        let state = if uniform {
            let n = self.nb_states - 1;
            let prob = vec![1.0 / n as f64; n];
            prob::sample(&prob, &mut self.rng)
        } else {
            prob::sample(&self.start_distribution, &mut self.rng)
        };

        self.current_state = Some(state);
        self.timestep = 0;
        self.last_action_achieved = false;
        debug!("Episode reset to state {} (uniform: {})", state, uniform);
        state
    }

    /// Whether the episode is over, either in a terminal state or at the timeout
    pub fn done(&self) -> bool {
        if let Some(s) = self.current_state {
            if self.terminal_states.contains(&s) {
                return true;
            }
        }

        self.timestep == self.timeout
    }

    /// Take `action` (an index into the action space) from the current state
    ///
    /// The reward is `r[s, action]` plus `deviation` times a standard normal draw, so a `deviation` of 0 gives the
    /// expected reward exactly. The next state is drawn from `P[s, action, :]`. Being in a terminal state does not
    /// prevent a step.
    ///
    /// **Returns** `(next_state, reward, done, info)`
    ///
    /// **Panics** if called before [`reset`](Mdp::reset) or if `action` is out of range
    pub fn step(&mut self, action: usize, deviation: f64) -> (usize, f64, bool, StepInfo) {
        let Some(state) = self.current_state else {
            panic!("`step` called before `reset`.");
        };

        let noise = deviation * self.rng.sample::<f64, _>(StandardNormal);
        let reward = self.rewards[(state, action)] + noise;

        let probs = self.transitions.row(state, action);
        let next_state = prob::sample(probs, &mut self.rng);
        let info = StepInfo {
            transition_probs: probs.to_vec(),
            noise,
        };

        self.timestep += 1;
        self.current_state = Some(next_state);
        let done = self.done();

        trace!(
            "t={} s={} a={} -> s'={} r={:.4}",
            self.timestep,
            state,
            action,
            next_state,
            reward
        );
        if done {
            debug!(
                "Episode done at t={} in state {}",
                self.timestep, next_state
            );
        }

        (next_state, reward, done, info)
    }

    /// Start a new figure in the renderer
    pub fn new_render(&mut self, title: &str, mode: RenderMode) -> P::Handle {
        self.renderer.new_render(title, mode)
    }

    /// Draw the environment with an optional value function and policy
    ///
    /// The agent is drawn at `agent_pos` if given, otherwise at the current state. Environments without a
    /// discrete state never draw the agent, and the policy is only drawn along with the current state.
    pub fn render(
        &mut self,
        v: Option<&[f64]>,
        policy: Option<&[usize]>,
        agent_pos: Option<usize>,
        title: &str,
        mode: RenderMode,
    ) -> P::Handle {
        let (agent_state, policy) = if !self.has_state {
            (None, None)
        } else if agent_pos.is_some() {
            (agent_pos, None)
        } else if self.current_state.is_some() {
            (self.current_state, policy)
        } else {
            (None, None)
        };

        self.renderer.render(RenderRequest {
            v,
            agent_state,
            policy,
            title,
            mode,
        })
    }

    /// Save the renderer's current figure
    pub fn save_fig(&mut self, title: &str) -> std::io::Result<()> {
        self.renderer.save_fig(title)
    }

    /// Reseed the random number generator used for every draw
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Draw an action from the action space with the environment's random number generator
    ///
    /// See [`ActionSpace::sample`].
    pub fn sample_action(&mut self, prob_list: Option<&[f64]>) -> A
    where
        A: Clone,
    {
        self.action_space.sample(&mut self.rng, prob_list)
    }

    pub fn nb_states(&self) -> usize {
        self.nb_states
    }

    pub fn nb_actions(&self) -> usize {
        self.action_space.size()
    }

    pub fn action_space(&self) -> &ActionSpace<A> {
        &self.action_space
    }

    pub fn start_distribution(&self) -> &[f64] {
        &self.start_distribution
    }

    pub fn transitions(&self) -> &Tensor3 {
        &self.transitions
    }

    pub fn rewards(&self) -> &Matrix {
        &self.rewards
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn terminal_states(&self) -> &HashSet<usize> {
        &self.terminal_states
    }

    pub fn timeout(&self) -> u32 {
        self.timeout
    }

    pub fn has_state(&self) -> bool {
        self.has_state
    }

    /// The current state, or `None` before the first reset
    pub fn current_state(&self) -> Option<usize> {
        self.current_state
    }

    /// Number of steps taken in the current episode
    pub fn timestep(&self) -> u32 {
        self.timestep
    }

    pub fn last_action_achieved(&self) -> bool {
        self.last_action_achieved
    }

    pub fn renderer(&self) -> &P {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut P {
        &mut self.renderer
    }
}

/// Adapts the episode API to the crate's [`Environment`] trait, with noise-free rewards
///
/// **Panics** in `step` if the action is not a member of the action space
impl<P, A> Environment for Mdp<P, A>
where
    P: Renderer,
    A: Clone + PartialEq,
{
    type State = usize;
    type Action = A;

    fn is_active(&self) -> bool {
        self.current_state.is_some() && !self.done()
    }

    fn step(&mut self, action: Self::Action) -> (Option<Self::State>, f64) {
        let Some(ix) = self.action_space.index_of(&action) else {
            panic!("Action is not a member of the action space.");
        };
        let (next_state, reward, done, _) = Mdp::step(self, ix, 0.0);
        ((!done).then_some(next_state), reward)
    }

    fn reset(&mut self) -> Self::State {
        Mdp::reset(self, false)
    }

    fn random_action(&mut self) -> Self::Action {
        self.sample_action(None)
    }
}

impl<P, A> DiscreteActionSpace for Mdp<P, A>
where
    P: Renderer,
    A: Clone + PartialEq,
{
    fn actions(&self) -> Vec<Self::Action> {
        self.action_space.actions().to_vec()
    }
}

impl<P, A> DiscreteStateSpace for Mdp<P, A>
where
    P: Renderer,
    A: Clone + PartialEq,
{
    fn states(&self) -> Vec<Self::State> {
        (0..self.nb_states).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use statrs::statistics::Statistics;

    use super::*;
    use crate::{
        env::rollout,
        render::{tests::RecordingRenderer, NullRenderer},
    };

    /// A ring of `n` states with two actions: 0 stays, 1 moves to the next state with probability 0.8
    fn ring(n: usize) -> (Tensor3, Matrix) {
        let mut transitions = Tensor3::zeros([n, 2, n]);
        let mut rewards = Matrix::zeros(n, 2);
        for s in 0..n {
            transitions[(s, 0, s)] = 1.0;
            transitions[(s, 1, (s + 1) % n)] = 0.8;
            transitions[(s, 1, s)] = 0.2;
            rewards[(s, 0)] = -(s as f64);
            rewards[(s, 1)] = 0.5 * s as f64 + 1.0;
        }

        (transitions, rewards)
    }

    fn start_at(n: usize, s: usize) -> Vec<f64> {
        let mut p0 = vec![0.0; n];
        p0[s] = 1.0;
        p0
    }

    fn ring_mdp<R: Renderer>(n: usize, start: usize, renderer: R, config: MdpConfig) -> Mdp<R> {
        let (transitions, rewards) = ring(n);
        Mdp::new(
            n,
            ActionSpace::with_count(2),
            start_at(n, start),
            transitions,
            rewards,
            renderer,
            config,
        )
    }

    fn seeded(seed: u64) -> MdpConfig {
        MdpConfig {
            seed: Some(seed),
            ..Default::default()
        }
    }

    #[test]
    fn reset_functional() {
        let mut mdp = ring_mdp(5, 3, NullRenderer, seeded(0));
        assert_eq!(mdp.current_state(), None, "No state before the first reset");

        assert_eq!(mdp.reset(false), 3, "Start distribution is respected");
        assert_eq!(mdp.current_state(), Some(3));
        assert_eq!(mdp.timestep(), 0, "Episodes start at t=0");
        assert!(!mdp.last_action_achieved());
        assert!(!mdp.done(), "Fresh episode in a non-terminal state is not done");
    }

    #[test]
    fn uniform_reset_excludes_last_state() {
        let n = 6;
        let mut mdp = ring_mdp(n, 0, NullRenderer, seeded(1));
        let mut seen = vec![false; n];
        for _ in 0..2000 {
            seen[mdp.reset(true)] = true;
        }

        assert!(seen[..n - 1].iter().all(|&x| x), "Every state but the last is drawn");
        assert!(!seen[n - 1], "The last state is never drawn");
    }

    #[test]
    fn timeout_boundary() {
        let config = MdpConfig {
            timeout: 11,
            ..seeded(2)
        };
        let mut mdp = ring_mdp(4, 0, NullRenderer, config);
        mdp.reset(false);

        for t in 1..=10 {
            let (_, _, done, _) = mdp.step(1, 0.0);
            assert!(!done, "Not done at t={}", t);
            assert!(!mdp.done());
        }

        let (_, _, done, _) = mdp.step(1, 0.0);
        assert!(done, "Done on the step that reaches the timeout");
        assert!(mdp.done());
        assert_eq!(mdp.timestep(), 11);
    }

    #[test]
    fn noise_free_rewards_are_exact() {
        let n = 4;
        let (_, rewards) = ring(n);
        for s in 0..n {
            for a in 0..2 {
                let mut mdp = ring_mdp(n, s, NullRenderer, seeded(s as u64));
                mdp.reset(false);
                let (_, reward, _, info) = mdp.step(a, 0.0);
                assert_eq!(reward, rewards[(s, a)], "Reward for ({}, {}) is exact", s, a);
                assert_eq!(info.noise, 0.0, "No noise injected");
            }
        }
    }

    #[test]
    fn step_reports_transition_row() {
        let mut mdp = ring_mdp(3, 1, NullRenderer, seeded(3));
        mdp.reset(false);
        let (next_state, reward, _, info) = mdp.step(1, 2.0);

        assert_eq!(info.transition_probs, vec![0.0, 0.2, 0.8], "Row P[1, 1, :] reported");
        assert!(next_state == 1 || next_state == 2, "Next state has positive probability");
        assert_eq!(reward, 1.5 + info.noise, "Noise is added to the expected reward");
        assert_eq!(mdp.current_state(), Some(next_state), "Current state updated");
    }

    #[test]
    fn terminal_state_does_not_block_step() {
        let config = MdpConfig {
            terminal_states: vec![2],
            ..seeded(4)
        };
        let mut mdp = ring_mdp(4, 2, NullRenderer, config);
        mdp.reset(false);
        assert!(mdp.done(), "Starting in a terminal state is done");

        let (next_state, reward, done, _) = mdp.step(0, 0.0);
        assert_eq!(next_state, 2, "Stay action still transitions");
        assert_eq!(reward, -2.0, "Reward still looked up");
        assert!(done);
        assert_eq!(mdp.timestep(), 1, "Time still advances");
    }

    #[test]
    fn terminal_state_ends_episode() {
        let config = MdpConfig {
            terminal_states: vec![1],
            ..seeded(5)
        };
        let (mut transitions, rewards) = ring(3);
        transitions.row_mut(0, 1).copy_from_slice(&[0.0, 1.0, 0.0]);
        let mut mdp = Mdp::new(
            3,
            ActionSpace::with_count(2),
            start_at(3, 0),
            transitions,
            rewards,
            NullRenderer,
            config,
        );

        mdp.reset(false);
        let (next_state, _, done, _) = mdp.step(1, 0.0);
        assert_eq!(next_state, 1);
        assert!(done, "Reaching a terminal state ends the episode");
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let run = |seed| {
            let mut mdp = ring_mdp(5, 0, NullRenderer, seeded(seed));
            let mut trajectory = vec![mdp.reset(true)];
            for _ in 0..20 {
                let (s, r, _, _) = mdp.step(1, 1.0);
                trajectory.push(s);
                trajectory.push(r.to_bits() as usize);
            }
            trajectory
        };

        assert_eq!(run(9), run(9), "Same seed, same trajectory");
        assert_ne!(run(9), run(10), "Different seeds diverge");

        let mut mdp = ring_mdp(5, 0, NullRenderer, seeded(9));
        let first = (mdp.reset(true), mdp.step(1, 1.0).1);
        mdp.reseed(9);
        let second = (mdp.reset(true), mdp.step(1, 1.0).1);
        assert_eq!(first, second, "Reseeding restarts the random stream");
    }

    #[test]
    fn reward_noise_statistics() {
        let config = MdpConfig {
            timeout: 100_000,
            ..seeded(6)
        };
        let mut mdp = ring_mdp(3, 0, NullRenderer, config);
        mdp.reset(false);

        let deviation = 0.5;
        let noise = (0..20_000)
            .map(|_| mdp.step(0, deviation).3.noise)
            .collect::<Vec<_>>();

        let mean = noise.iter().mean();
        let std_dev = noise.iter().std_dev();
        assert!(mean.abs() < 0.02, "Noise is centered, got mean {}", mean);
        assert!((std_dev - deviation).abs() < 0.02, "Noise is scaled by deviation, got {}", std_dev);
    }

    #[test]
    fn render_branch_priority() {
        let recorder = Rc::new(RefCell::new(RecordingRenderer::default()));
        let mut mdp = ring_mdp(4, 2, Rc::clone(&recorder), seeded(7));
        let v = [1.0, 2.0, 3.0, 4.0];
        let policy = [1, 1, 0, 0];

        mdp.render(Some(&v[..]), Some(&policy[..]), None, "before reset", RenderMode::Legacy);
        mdp.reset(false);
        mdp.render(Some(&v[..]), Some(&policy[..]), None, "after reset", RenderMode::Human);
        mdp.render(None, Some(&policy[..]), Some(0), "override", RenderMode::Legacy);
        mdp.render(None, None, None, "no arrays", RenderMode::Legacy);

        let recorder = recorder.borrow();
        let renders = &recorder.renders;
        assert_eq!(renders[0].agent_state, None, "No agent before reset");
        assert_eq!(renders[0].policy, None, "No policy before reset");
        assert_eq!(renders[0].v, Some(v.to_vec()), "Values still drawn before reset");

        assert_eq!(renders[1].agent_state, Some(2), "Current state drawn after reset");
        assert_eq!(renders[1].policy, Some(policy.to_vec()), "Policy drawn with current state");
        assert_eq!(renders[1].mode, RenderMode::Human);

        assert_eq!(renders[2].agent_state, Some(0), "Explicit position overrides current state");
        assert_eq!(renders[2].policy, None, "Policy dropped with explicit position");
        assert_eq!(renders[2].v, None);

        assert_eq!(renders[3].agent_state, Some(2));
        assert_eq!(renders[3].policy, None, "Missing policy stays missing");
    }

    #[test]
    fn render_without_state() {
        let recorder = Rc::new(RefCell::new(RecordingRenderer::default()));
        let config = MdpConfig {
            has_state: false,
            ..seeded(8)
        };
        let mut mdp = ring_mdp(4, 1, Rc::clone(&recorder), config);
        mdp.reset(false);

        assert_eq!(mdp.new_render("figure", RenderMode::Human), 0, "Renderer handle returned");
        mdp.render(None, Some(&[0, 0, 0, 0][..]), Some(3), "stateless", RenderMode::Legacy);
        mdp.save_fig("stateless").unwrap();

        let recorder = recorder.borrow();
        assert_eq!(recorder.renders[0].agent_state, None, "Stateless environments never draw the agent");
        assert_eq!(recorder.renders[0].policy, None);
        assert_eq!(recorder.figures[0].0, "figure");
        assert_eq!(recorder.saved, vec!["stateless".to_string()]);
    }

    #[test]
    #[should_panic(expected = "timeout too short")]
    fn short_timeout_is_fatal() {
        let config = MdpConfig {
            timeout: 10,
            ..Default::default()
        };
        ring_mdp(3, 0, NullRenderer, config);
    }

    #[test]
    #[should_panic(expected = "shape")]
    fn mismatched_tables_are_fatal() {
        let (transitions, rewards) = ring(3);
        Mdp::new(
            3,
            ActionSpace::with_count(3),
            start_at(3, 0),
            transitions,
            rewards,
            NullRenderer,
            MdpConfig::default(),
        );
    }

    #[test]
    #[should_panic(expected = "before `reset`")]
    fn step_before_reset_panics() {
        let mut mdp = ring_mdp(3, 0, NullRenderer, MdpConfig::default());
        mdp.step(0, 0.0);
    }

    #[test]
    fn environment_adapter() {
        let config = MdpConfig {
            terminal_states: vec![3],
            ..seeded(11)
        };
        let (transitions, rewards) = ring(4);
        let mut mdp = Mdp::new(
            4,
            ActionSpace::new(vec!["stay", "go"]),
            start_at(4, 0),
            transitions,
            rewards,
            NullRenderer,
            config,
        );

        assert_eq!(mdp.actions(), vec!["stay", "go"]);
        assert_eq!(mdp.states(), vec![0, 1, 2, 3]);

        let episode = rollout(&mut mdp, |_, _| "go", 1000);
        let last = episode.last().unwrap();
        assert_eq!(last.next_state, None, "Episode ends with no next state");
        assert!(episode.len() <= 50, "Episode bounded by the timeout");
        assert!(!mdp.is_active(), "Environment inactive after the episode");
        assert!(
            episode.iter().all(|e| e.action == "go"),
            "Policy actions recorded"
        );
    }
}
