use crate::env::Environment;

/// Represents a single experience or transition in the environment
pub struct Exp<E: Environment> {
    /// The state of the environment before taking the action
    pub state: E::State,
    /// The action taken in the given state
    pub action: E::Action,
    /// The state of the environment after the action is taken, or if terminal, `None`
    pub next_state: Option<E::State>,
    /// The reward received after taking the action
    pub reward: f64,
}

impl<E> Clone for Exp<E>
where
    E: Environment,
    E::State: Clone,
    E::Action: Clone,
{
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            action: self.action.clone(),
            next_state: self.next_state.clone(),
            reward: self.reward,
        }
    }
}

/// Discounted sum of the rewards of an episode, `Σ γ^t r_t`
pub fn discounted_return<E: Environment>(episode: &[Exp<E>], gamma: f64) -> f64 {
    episode
        .iter()
        .rev()
        .fold(0.0, |acc, exp| exp.reward + gamma * acc)
}
