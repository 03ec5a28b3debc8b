//! Guest to member promotion state machine.
//!
//! A visitor is `Guest(count)` until its `count`-th contact reaches the configured
//! threshold, at which point it becomes a `Member` in the same step. The
//! transition is pure; the caller applies the returned [`Effect`] to storage.

/// Contacts needed before a guest is promoted, unless configured otherwise.
pub const DEFAULT_PROMOTION_THRESHOLD: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitorState {
    /// Tracked only by interaction count. An absent record is `Guest { count: 0 }`.
    Guest { count: u32 },
    /// Terminal state.
    Member,
}

/// Storage instruction produced by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Write the pending record with the new count
    PersistPending { interaction_count: u32 },
    /// Replace the pending record with a member
    Promote,
    /// Nothing to persist
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: VisitorState,
    pub effect: Effect,
}

impl Transition {
    pub fn promoted(&self) -> bool {
        self.effect == Effect::Promote
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromotionPolicy {
    threshold: u32,
}

impl Default for PromotionPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_PROMOTION_THRESHOLD,
        }
    }
}

impl PromotionPolicy {
    /// Create a policy promoting on the `threshold`-th contact. Zero is treated as one.
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Advance the state for one incoming guest message.
    pub fn on_contact(&self, current: VisitorState) -> Transition {
        match current {
            VisitorState::Member => Transition {
                next: VisitorState::Member,
                effect: Effect::None,
            },
            VisitorState::Guest { count } => {
                let count = count.saturating_add(1);
                if count >= self.threshold {
                    Transition {
                        next: VisitorState::Member,
                        effect: Effect::Promote,
                    }
                } else {
                    Transition {
                        next: VisitorState::Guest { count },
                        effect: Effect::PersistPending {
                            interaction_count: count,
                        },
                    }
                }
            }
        }
    }
}
