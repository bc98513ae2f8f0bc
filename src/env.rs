mod action_space;

pub use action_space::ActionSpace;

use crate::memory::Exp;

/// Represents a Markov decision process, defining the dynamics of an environment
/// in which an agent can operate.
///
/// This base trait represents the common case of a discrete-time MDP with one agent.
pub trait Environment {
    /// A representation of the state of the environment to be passed to an agent
    type State;

    /// A representation of an action that an agent can take to affect the environment
    type Action;

    /// Determine if the episode is still running
    fn is_active(&self) -> bool;

    /// Update the environment in response to an action taken by an agent, producing a new state and associated reward
    ///
    /// **Returns** `(next_state, reward)`, where `next_state` is `None` if the episode ended on this step
    fn step(&mut self, action: Self::Action) -> (Option<Self::State>, f64);

    /// Reset the environment to an initial state
    ///
    /// **Returns** the state
    fn reset(&mut self) -> Self::State;

    /// Choose an action uniformly at random
    fn random_action(&mut self) -> Self::Action;
}

/// An environment with a finite action space
pub trait DiscreteActionSpace: Environment {
    /// Get the available actions
    ///
    /// The returned vec should never be empty.
    fn actions(&self) -> Vec<Self::Action>;
}

/// An environment with a finite state space
pub trait DiscreteStateSpace: Environment {
    fn states(&self) -> Vec<Self::State>;
}

/// Play a single episode from a fresh reset, choosing each action with `policy`
///
/// **Returns** the experiences in the order they occurred. The last one has `next_state: None`
/// unless the episode was cut short by `max_steps`.
pub fn rollout<E, F>(env: &mut E, mut policy: F, max_steps: usize) -> Vec<Exp<E>>
where
    E: Environment,
    E::State: Clone,
    E::Action: Clone,
    F: FnMut(&mut E, &E::State) -> E::Action,
{
    let mut experiences = Vec::new();
    let mut next_state = Some(env.reset());
    while let Some(state) = next_state {
        if experiences.len() == max_steps {
            break;
        }

        let action = policy(env, &state);
        let (next, reward) = env.step(action.clone());
        next_state = next;
        experiences.push(Exp {
            state,
            action,
            next_state: next_state.clone(),
            reward,
        });
    }

    experiences
}
