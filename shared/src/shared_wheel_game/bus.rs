use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use super::effect::{EffectArena, EffectId};
use super::effects::Companion;
use super::host::{HostBridge, MessageEvent, ScoreChangeEvent, TimedOccurrenceEvent, UserRef};

/// Outcome of intercepting a pending score change. `house_delta` is what the
/// ledger gains (or pays, when negative) for the rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interception {
    pub change_in_score: i64,
    pub house_delta: i64,
}

impl Interception {
    pub fn untouched(change_in_score: i64) -> Self {
        Self {
            change_in_score,
            house_delta: 0,
        }
    }
}

/// Rewrites a pending score change of the winner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreTransform {
    Cap { cap: i64 },
    Fee { fee: i64 },
    TimedBonusMultiplier { multiplier: i64 },
}

impl ScoreTransform {
    /// The house takes whatever the winner does not get, so
    /// `change_in_score + house_delta == proposed` short of saturation.
    pub fn apply(&self, event: &ScoreChangeEvent, proposed: i64) -> Interception {
        let change_in_score = match self {
            Self::Cap { cap } if proposed > *cap => *cap,
            Self::Cap { .. } => return Interception::untouched(proposed),
            Self::Fee { fee } => proposed.saturating_sub(*fee),
            Self::TimedBonusMultiplier { multiplier } if event.is_timed_bonus() => {
                proposed.saturating_mul(*multiplier)
            }
            Self::TimedBonusMultiplier { .. } => return Interception::untouched(proposed),
        };
        Interception {
            change_in_score,
            house_delta: proposed.saturating_sub(change_in_score),
        }
    }
}

/// Reacts to messages of the winner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageInterceptor {
    /// At most `messages` messages per `window_secs`, the rest is removed.
    RateLimit {
        messages: usize,
        window_secs: i64,
        recent: VecDeque<i64>,
    },
    /// Every message costs `cost`.
    Toll { cost: i64 },
    /// Every command of the companion costs `cost`.
    CommandToll { companion: Companion, cost: i64 },
    /// A companion command pays `bonus` once the cooldown since the previous
    /// command elapsed. Every command restarts the cooldown.
    CommandBonus {
        companion: Companion,
        bonus: i64,
        cooldown_secs: i64,
        last_command: i64,
    },
}

impl MessageInterceptor {
    pub fn rate_limit(messages: usize, window_secs: i64) -> Self {
        Self::RateLimit {
            messages,
            window_secs,
            recent: VecDeque::with_capacity(messages + 1),
        }
    }

    fn intercept(&mut self, event: &MessageEvent, text: &str) -> Option<Reaction> {
        let user = UserRef::from(&event.user);
        match self {
            Self::RateLimit {
                messages,
                window_secs,
                recent,
            } => {
                let window_full = recent.len() >= *messages;
                let within_window = recent
                    .front()
                    .map_or(false, |oldest| oldest + *window_secs > event.date);
                if window_full && within_window {
                    return Some(Reaction::RemoveMessage {
                        message_id: event.message_id,
                    });
                }
                recent.push_back(event.date);
                while recent.len() > *messages {
                    recent.pop_front();
                }
                None
            }
            Self::Toll { cost } => Some(Reaction::Charge {
                user,
                amount: *cost,
            }),
            Self::CommandToll { companion, cost } if companion.matches_command(text) => {
                Some(Reaction::Charge {
                    user,
                    amount: *cost,
                })
            }
            Self::CommandToll { .. } => None,
            Self::CommandBonus {
                companion,
                bonus,
                cooldown_secs,
                last_command,
            } => {
                if !companion.matches_command(text) {
                    return None;
                }
                let cooled_down = *last_command + *cooldown_secs < event.date;
                *last_command = event.date;
                cooled_down.then(|| Reaction::Reward {
                    user,
                    amount: *bonus,
                })
            }
        }
    }
}

/// Reacts to timed bonus occurrences. Sees every occurrence, winner or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimedInterceptor {
    MentionOnRandom,
}

/// Host side effect requested by an interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    Charge { user: UserRef, amount: i64 },
    Reward { user: UserRef, amount: i64 },
    RemoveMessage { message_id: i64 },
    Mention { user: UserRef },
}

impl Reaction {
    pub fn apply(self, bridge: &mut HostBridge<'_>) {
        match self {
            Self::Charge { user, amount } => bridge.reduce_points(amount, &user),
            Self::Reward { user, amount } => bridge.reward_points(amount, &user),
            Self::RemoveMessage { message_id } => bridge.remove_message(message_id),
            Self::Mention { user } => bridge.send_message(format!("@{}", user.name), 0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Subscription<T> {
    pub owner: EffectId,
    pub interceptor: T,
}

/// Routes host events to the interceptors of active effects.
#[derive(Debug, Default)]
pub struct SubscriptionBus {
    score_changes: Vec<Subscription<ScoreTransform>>,
    message_posts: Vec<Subscription<MessageInterceptor>>,
    timed_events: Vec<Subscription<TimedInterceptor>>,
}

impl SubscriptionBus {
    pub fn subscribe_score_change(&mut self, owner: EffectId, interceptor: ScoreTransform) {
        self.score_changes.push(Subscription { owner, interceptor });
    }

    pub fn subscribe_message_post(&mut self, owner: EffectId, interceptor: MessageInterceptor) {
        self.message_posts.push(Subscription { owner, interceptor });
    }

    pub fn subscribe_timed_event(&mut self, owner: EffectId, interceptor: TimedInterceptor) {
        self.timed_events.push(Subscription { owner, interceptor });
    }

    /// Runs the pending change through the transforms of every effect the
    /// user won, in subscription order. Immutable changes pass untouched.
    pub fn dispatch_score_change(
        &self,
        arena: &EffectArena,
        event: &ScoreChangeEvent,
    ) -> Interception {
        let mut outcome = Interception::untouched(event.change_in_score);
        if event.immutable {
            return outcome;
        }
        for subscription in &self.score_changes {
            if !owned_by(arena, subscription.owner, event.user.id) {
                continue;
            }
            let step = subscription
                .interceptor
                .apply(event, outcome.change_in_score);
            outcome.change_in_score = step.change_in_score;
            outcome.house_delta = outcome.house_delta.saturating_add(step.house_delta);
        }
        outcome
    }

    /// Messages without text are ignored.
    pub fn dispatch_message_post(
        &mut self,
        arena: &EffectArena,
        event: &MessageEvent,
    ) -> Vec<Reaction> {
        let Some(text) = event.text.as_deref() else {
            return Vec::new();
        };
        self.message_posts
            .iter_mut()
            .filter(|s| owned_by(arena, s.owner, event.user.id))
            .filter_map(|s| s.interceptor.intercept(event, text))
            .collect()
    }

    pub fn dispatch_timed_event(
        &self,
        arena: &EffectArena,
        event: &TimedOccurrenceEvent,
    ) -> Vec<Reaction> {
        self.timed_events
            .iter()
            .filter_map(|s| {
                let winner = arena.get(s.owner)?.winner()?;
                match s.interceptor {
                    TimedInterceptor::MentionOnRandom if event.is_random => Some(Reaction::Mention {
                        user: winner.clone(),
                    }),
                    TimedInterceptor::MentionOnRandom => None,
                }
            })
            .collect()
    }

    /// Drops the subscriptions of expired or vanished effects and returns how
    /// many were removed.
    pub fn prune_expired(&mut self, arena: &EffectArena, now: DateTime<Utc>) -> usize {
        let before = self.len();
        let alive = |owner: EffectId| arena.get(owner).map_or(false, |e| !e.is_expired(now));
        self.score_changes.retain(|s| alive(s.owner));
        self.message_posts.retain(|s| alive(s.owner));
        self.timed_events.retain(|s| alive(s.owner));
        before - self.len()
    }

    pub fn owns(&self, owner: EffectId) -> bool {
        self.score_changes.iter().any(|s| s.owner == owner)
            || self.message_posts.iter().any(|s| s.owner == owner)
            || self.timed_events.iter().any(|s| s.owner == owner)
    }

    pub fn len(&self) -> usize {
        self.score_changes.len() + self.message_posts.len() + self.timed_events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn owned_by(arena: &EffectArena, owner: EffectId, user_id: i64) -> bool {
    arena.get(owner).map_or(false, |e| e.is_won_by(user_id))
}
