use rand::Rng;

use crate::prob;

/// A finite, ordered set of actions
///
/// Actions are arbitrary identifiers, not necessarily contiguous integers. Sampling always returns a member of
/// the set, drawn either uniformly or from a caller-supplied distribution over the action indices.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSpace<A> {
    actions: Vec<A>,
}

impl<A> Default for ActionSpace<A> {
    fn default() -> Self {
        Self { actions: Vec::new() }
    }
}

impl ActionSpace<usize> {
    /// Initialize an action space of the integers `0..nactions`
    pub fn with_count(nactions: usize) -> Self {
        Self {
            actions: (0..nactions).collect(),
        }
    }
}

impl<A: From<usize>> ActionSpace<A> {
    /// Use `action_list` if it is present and non-empty, otherwise the integers `0..nactions`
    ///
    /// With neither, the resulting space is empty and must not be sampled.
    pub fn from_list_or_count(action_list: Option<Vec<A>>, nactions: usize) -> Self {
        match action_list {
            Some(actions) if !actions.is_empty() => Self { actions },
            _ => Self {
                actions: (0..nactions).map(A::from).collect(),
            },
        }
    }
}

impl<A> ActionSpace<A> {
    /// Initialize an action space from an explicit ordered list of actions
    pub fn new(actions: Vec<A>) -> Self {
        Self { actions }
    }

    /// Number of actions
    pub fn size(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn actions(&self) -> &[A] {
        &self.actions
    }

    pub fn get(&self, ix: usize) -> Option<&A> {
        self.actions.get(ix)
    }

    /// Position of `action` in the ordered set, if it is a member
    pub fn index_of(&self, action: &A) -> Option<usize>
    where
        A: PartialEq,
    {
        self.actions.iter().position(|a| a == action)
    }

    /// Draw an action according to `prob_list`, or uniformly if it is `None`
    ///
    /// `prob_list` is indexed like [`actions`](Self::actions) and should sum to 1.
    ///
    /// **Panics** if the action space is empty
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, prob_list: Option<&[f64]>) -> A
    where
        A: Clone,
    {
        assert!(!self.is_empty(), "Cannot sample from an empty action space.");
        let ix = match prob_list {
            Some(weights) => prob::sample(weights, rng),
            None => {
                let uniform = vec![1.0 / self.size() as f64; self.size()];
                prob::sample(&uniform, rng)
            }
        };

        self.actions[ix].clone()
    }
}
