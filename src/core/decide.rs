use crate::models::{Action, Candidate};

/// Maps a candidate to a swipe decision.
///
/// Implementations must be pure: the same candidate always yields the same action.
pub trait Decider: Send + Sync {
    fn decide(&self, candidate: &Candidate) -> Action;
}

impl<F> Decider for F
where
    F: Fn(&Candidate) -> Action + Send + Sync,
{
    fn decide(&self, candidate: &Candidate) -> Action {
        self(candidate)
    }
}

/// Default rule set: like outdoor climbers, then a preferred age band.
#[derive(Debug, Clone)]
pub struct RuleDecider {
    pub liked_interests: Vec<String>,
    pub min_age: u32,
    pub max_age: u32,
}

impl Default for RuleDecider {
    fn default() -> Self {
        Self {
            liked_interests: vec![
                "climbing".to_string(),
                "bouldering".to_string(),
                "hiking".to_string(),
            ],
            min_age: 24,
            max_age: 35,
        }
    }
}

impl Decider for RuleDecider {
    fn decide(&self, candidate: &Candidate) -> Action {
        let shared_interest = candidate
            .interests
            .iter()
            .any(|i| self.liked_interests.iter().any(|l| l == i));

        if shared_interest || (self.min_age..=self.max_age).contains(&candidate.age) {
            Action::Like
        } else {
            Action::Pass
        }
    }
}

/// Apply the default rule set.
pub fn decide(candidate: &Candidate) -> Action {
    RuleDecider::default().decide(candidate)
}
