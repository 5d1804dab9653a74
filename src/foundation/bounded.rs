//! Repeat-until-satisfied loops with a hard iteration budget.
//!
//! Every iterative correction in the layout engine (width fit, gap repair, anti-dwarf growth)
//! runs through [`iterate_bounded`], so the iteration cap and the "keep the best state reached"
//! rule are the same everywhere.

use serde::{Deserialize, Serialize};

/// How a bounded loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoopStatus {
    /// The predicate held (possibly before the first step).
    Satisfied,
    /// The step function declined to produce a new state.
    Blocked,
    /// The budget ran out with the predicate still false.
    Exhausted,
}

#[derive(Clone, Debug)]
pub struct Bounded<S> {
    pub state: S,
    pub steps: u32,
    pub status: LoopStatus,
}

impl<S> Bounded<S> {
    pub fn is_satisfied(&self) -> bool {
        self.status == LoopStatus::Satisfied
    }
}

/// Step `state` until `satisfied` holds, `step` returns `None`, or `budget` steps were taken.
///
/// The returned state is always the last one the step function produced; a declined step keeps
/// the previous state.
pub fn iterate_bounded<S>(
    init: S,
    budget: u32,
    mut satisfied: impl FnMut(&S) -> bool,
    mut step: impl FnMut(&S) -> Option<S>,
) -> Bounded<S> {
    let mut state = init;
    let mut steps = 0u32;
    loop {
        if satisfied(&state) {
            return Bounded {
                state,
                steps,
                status: LoopStatus::Satisfied,
            };
        }
        if steps >= budget {
            return Bounded {
                state,
                steps,
                status: LoopStatus::Exhausted,
            };
        }
        match step(&state) {
            Some(next) => {
                state = next;
                steps += 1;
            }
            None => {
                return Bounded {
                    state,
                    steps,
                    status: LoopStatus::Blocked,
                };
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/bounded.rs"]
mod tests;
