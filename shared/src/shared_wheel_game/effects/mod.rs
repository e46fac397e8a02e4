mod companion;
pub mod factories;

pub use companion::Companion;

use chrono::{DateTime, Utc};

use super::bus::{MessageInterceptor, ScoreTransform, SubscriptionBus, TimedInterceptor};
use super::effect::EffectId;
use super::host::{HostBridge, User};

/// Delay of the follow-up messages a win handler sends.
pub const MESSAGE_DELAY_MS: u64 = 500;

const SECONDS_PER_MINUTE: i64 = 60;

/// Every kind of effect the wheel can carry.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectKind {
    CappedGains {
        cap: i64,
    },
    ExtraCosts {
        fee: i64,
    },
    TimedBonusMultiplier {
        multiplier: i64,
        average_gain: f64,
    },
    Equalizer {
        target: User,
    },
    Jackpot {
        prize: i64,
    },
    Mute {
        messages: usize,
        minutes: i64,
    },
    Nothing {
        repeats: u8,
    },
    PayForMessages {
        cost: i64,
    },
    TagAtRandom {
        random_points: i64,
        random_frequency: u32,
    },
    CompanionCosts {
        companion: Companion,
        cost: i64,
    },
    CompanionBonus {
        companion: Companion,
        cooldown_minutes: i64,
    },
}

fn multiplier_word(multiplier: i64) -> String {
    match multiplier {
        2 => "Double".to_string(),
        3 => "Triple".to_string(),
        4 => "Quadruple".to_string(),
        n => format!("{}x", n),
    }
}

impl EffectKind {
    pub fn name(&self) -> String {
        match self {
            Self::CappedGains { cap } => format!("Capped to {}", cap),
            Self::ExtraCosts { fee } => format!("Extra costs {}", fee),
            Self::TimedBonusMultiplier { multiplier, .. } => {
                format!("{} danktime", multiplier_word(*multiplier))
            }
            Self::Equalizer { target } => format!("Equalizer {}", target.name),
            Self::Jackpot { prize } => format!("Jackpot {}", prize),
            Self::Mute { messages, minutes } => format!("Mute to {} per {}", messages, minutes),
            Self::Nothing { repeats: 2 } => "Double Nothing".to_string(),
            Self::Nothing { repeats: 3 } => "Triple Nothing".to_string(),
            Self::Nothing { .. } => "Nothing".to_string(),
            Self::PayForMessages { cost } => format!("Pay for everything {}", cost),
            Self::TagAtRandom { .. } => "Tag at random DankTime".to_string(),
            Self::CompanionCosts { companion, cost } => {
                format!("{} costs {}", companion.plugin_name(), cost)
            }
            Self::CompanionBonus { companion, .. } => {
                format!("{} bonus {}", companion.plugin_name(), self.bonus())
            }
        }
    }

    pub fn description(&self) -> String {
        match self {
            Self::CappedGains { cap } => format!(
                "Everytime you win/gain points greater than {} points, you only receive {} points.",
                cap, cap
            ),
            Self::ExtraCosts { fee } => format!(
                "Anytime you win or loose any points, you pay {} points as a service fee.",
                fee
            ),
            Self::TimedBonusMultiplier { multiplier, .. } => format!(
                "{} the points gained by any danktime.",
                multiplier_word(*multiplier)
            ),
            Self::Equalizer { target } => format!(
                "Gives you enough points to be almost equal to {}'s points.",
                target.name
            ),
            Self::Jackpot { prize } => format!("You win {} points!", prize),
            Self::Mute { messages, minutes } => format!(
                "Limits you to only send {} message(s) per {} minute(s)",
                messages, minutes
            ),
            Self::Nothing { repeats: 2 } => {
                "Double nothing is still nothing. You win nothing".to_string()
            }
            Self::Nothing { repeats: 3 } => {
                "Triple nothing is still nothing. You win nothing".to_string()
            }
            Self::Nothing { .. } => "You win nothing".to_string(),
            Self::PayForMessages { cost } => format!(
                "When you send a message in the chat, it will cost you {} points.",
                cost
            ),
            Self::TagAtRandom { .. } => "Tags you at the next random dank time".to_string(),
            Self::CompanionCosts { companion, cost } => format!(
                "Using the {} plugin will cost {} points.",
                companion.plugin_name(),
                cost
            ),
            Self::CompanionBonus {
                companion,
                cooldown_minutes,
            } => format!(
                "Using the {} plugin will give you {} points every {} minutes.",
                companion.plugin_name(),
                self.bonus(),
                cooldown_minutes
            ),
        }
    }

    /// Effects sharing a category never appear on the same wheel.
    pub fn category(&self) -> String {
        match self {
            Self::CappedGains { cap } => format!("capped{}", cap),
            Self::ExtraCosts { fee } => format!("extracost{}", fee),
            Self::TimedBonusMultiplier { .. } => "danktime".to_string(),
            Self::Equalizer { .. } => "equalizer".to_string(),
            Self::Jackpot { .. } => "jackpot".to_string(),
            Self::Mute { .. } => "mute".to_string(),
            Self::Nothing { repeats } if *repeats > 1 => format!("nothing{}", repeats),
            Self::Nothing { .. } => "nothing".to_string(),
            Self::PayForMessages { .. } => "payformessages".to_string(),
            Self::TagAtRandom { .. } => "tagrandom".to_string(),
            Self::CompanionCosts { companion, .. } | Self::CompanionBonus { companion, .. } => {
                companion.category().to_string()
            }
        }
    }

    /// Contribution to the wheel's fitness. Positive is good for the winner.
    pub fn price_quality(&self) -> f64 {
        match self {
            Self::CappedGains { .. } | Self::ExtraCosts { .. } => -1.0,
            Self::TimedBonusMultiplier { .. } => 1.0,
            Self::Equalizer { .. } | Self::Jackpot { .. } => 2.0,
            Self::Mute { .. } => -3.0,
            Self::Nothing { .. } => 0.0,
            Self::PayForMessages { cost } => -3.0 - *cost as f64 * 0.5,
            Self::TagAtRandom { .. } => 0.5,
            Self::CompanionCosts { companion, .. } => companion.cost_quality(),
            Self::CompanionBonus { .. } => 1.0,
        }
    }

    /// Minimum house balance before the effect may go on the wheel.
    pub fn point_requirement(&self) -> i64 {
        match self {
            Self::Equalizer { target } => target.score,
            Self::Jackpot { prize } => *prize,
            _ => 0,
        }
    }

    /// Rough value of winning the effect for `user`, negative for losses.
    pub fn estimated_price(&self, user: &User, duration_hours: u32) -> f64 {
        match self {
            Self::CappedGains { cap } => (*cap * 50) as f64,
            Self::ExtraCosts { fee } => (-*fee * 10) as f64,
            Self::TimedBonusMultiplier {
                multiplier,
                average_gain,
            } => average_gain * *multiplier as f64 * 5.0,
            Self::Equalizer { target } => (target.score - user.score).max(0) as f64,
            Self::Jackpot { prize } => *prize as f64,
            Self::Mute { .. } | Self::Nothing { .. } => 0.0,
            Self::PayForMessages { cost } => (-*cost * 200) as f64,
            Self::TagAtRandom {
                random_points,
                random_frequency,
            } => {
                if *random_frequency == 0 || duration_hours == 0 {
                    return 0.0;
                }
                *random_points as f64 * (24.0 / *random_frequency as f64) / duration_hours as f64
            }
            Self::CompanionCosts { companion, cost } => companion.cost_price(*cost),
            Self::CompanionBonus { .. } => (self.bonus() * 50) as f64,
        }
    }

    /// An equalizer won by its own target stays on the wheel.
    pub fn needs_replacing(&self, user: &User) -> bool {
        match self {
            Self::Equalizer { target } => user.id != target.id,
            _ => true,
        }
    }

    /// Durations this kind overrides the default choices with.
    pub fn duration_choices(&self) -> Option<&'static [u32]> {
        match self {
            Self::CompanionCosts { companion, .. } => companion.cost_duration_choices(),
            _ => None,
        }
    }

    fn bonus(&self) -> i64 {
        match self {
            Self::CompanionBonus {
                cooldown_minutes, ..
            } => 5 * cooldown_minutes,
            _ => 0,
        }
    }

    pub(crate) fn handle_winnings(
        &self,
        id: EffectId,
        user: &User,
        now: DateTime<Utc>,
        bus: &mut SubscriptionBus,
        bridge: &mut HostBridge<'_>,
    ) {
        match self {
            Self::CappedGains { cap } => {
                bus.subscribe_score_change(id, ScoreTransform::Cap { cap: *cap });
            }
            Self::ExtraCosts { fee } => {
                bus.subscribe_score_change(id, ScoreTransform::Fee { fee: *fee });
            }
            Self::TimedBonusMultiplier { multiplier, .. } => {
                bus.subscribe_score_change(
                    id,
                    ScoreTransform::TimedBonusMultiplier {
                        multiplier: *multiplier,
                    },
                );
            }
            Self::Equalizer { target } => {
                if target.id == user.id {
                    bridge.send_message("You already have these points.\nYou win NOTHING.", MESSAGE_DELAY_MS);
                } else if target.score < user.score {
                    bridge.send_message(
                        format!(
                            "You already have more points than {}.\nYou win NOTHING",
                            target.name
                        ),
                        MESSAGE_DELAY_MS,
                    );
                } else {
                    let winnings = (target.score - user.score - 1).max(0);
                    bridge.reward_points(winnings, &user.into());
                    bridge.send_message(format!("You win {} points.", winnings), MESSAGE_DELAY_MS);
                }
            }
            Self::Jackpot { prize } => bridge.reward_points(*prize, &user.into()),
            Self::Mute { messages, minutes } => {
                bus.subscribe_message_post(
                    id,
                    MessageInterceptor::rate_limit(*messages, minutes * SECONDS_PER_MINUTE),
                );
            }
            Self::Nothing { .. } => {}
            Self::PayForMessages { cost } => {
                bus.subscribe_message_post(id, MessageInterceptor::Toll { cost: *cost });
            }
            Self::TagAtRandom { .. } => {
                bus.subscribe_timed_event(id, TimedInterceptor::MentionOnRandom);
            }
            Self::CompanionCosts { companion, cost } => {
                bus.subscribe_message_post(
                    id,
                    MessageInterceptor::CommandToll {
                        companion: *companion,
                        cost: *cost,
                    },
                );
            }
            Self::CompanionBonus {
                companion,
                cooldown_minutes,
            } => {
                bus.subscribe_message_post(
                    id,
                    MessageInterceptor::CommandBonus {
                        companion: *companion,
                        bonus: self.bonus(),
                        cooldown_secs: cooldown_minutes * SECONDS_PER_MINUTE,
                        last_command: now.timestamp(),
                    },
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared_wheel_game::host::HostAction;
    use crate::shared_wheel_game::ledger::Ledger;

    fn user(id: i64, name: &str, score: i64) -> User {
        User { id, name: name.to_string(), score }
    }

    fn win(kind: &EffectKind, winner: &User) -> (Vec<HostAction>, Ledger, SubscriptionBus) {
        let mut ledger = Ledger::new(1);
        let mut actions = Vec::new();
        let mut bus = SubscriptionBus::default();
        {
            let mut bridge = HostBridge::new(&mut ledger, &mut actions);
            kind.handle_winnings(EffectId(0), winner, Utc::now(), &mut bus, &mut bridge);
        }
        (actions, ledger, bus)
    }

    #[test]
    fn test_identity() {
        let bonus = EffectKind::CompanionBonus { companion: Companion::SpongeMock, cooldown_minutes: 2 };
        assert_eq!(bonus.name(), "sPoNgEmOcK bonus 10");
        assert_eq!(bonus.category(), "spongemock");
        assert_eq!(bonus.estimated_price(&user(1, "a", 0), 4), 500.0);

        let pay = EffectKind::PayForMessages { cost: 2 };
        assert_eq!(pay.price_quality(), -4.0);
        assert_eq!(EffectKind::Nothing { repeats: 3 }.category(), "nothing3");
        assert_eq!(EffectKind::TimedBonusMultiplier { multiplier: 3, average_gain: 10.0 }.name(), "Triple danktime");
    }

    #[test]
    fn test_jackpot_mirrors_once() {
        let (actions, ledger, bus) = win(&EffectKind::Jackpot { prize: 70 }, &user(1, "alice", 5));
        assert_eq!(ledger.balance(), -70);
        assert_eq!(actions.len(), 1);
        assert!(bus.is_empty());
    }

    #[test]
    fn test_equalizer_rewards_gap() {
        let target = user(2, "bob", 100);
        let kind = EffectKind::Equalizer { target: target.clone() };

        let (actions, ledger, _) = win(&kind, &user(1, "alice", 40));
        assert_eq!(ledger.balance(), -59);
        assert!(actions.contains(&HostAction::SendMessage {
            text: "You win 59 points.".to_string(),
            delay_ms: MESSAGE_DELAY_MS,
        }));

        let (_, ledger, _) = win(&kind, &user(3, "carol", 300));
        assert_eq!(ledger.balance(), 0);

        let (_, ledger, _) = win(&kind, &target);
        assert_eq!(ledger.balance(), 0);
        assert!(!kind.needs_replacing(&target));
        assert!(kind.needs_replacing(&user(1, "alice", 40)));
    }

    #[test]
    fn test_interceptors_subscribe() {
        let (_, _, bus) = win(&EffectKind::CappedGains { cap: 10 }, &user(1, "alice", 5));
        assert_eq!(bus.len(), 1);
        assert!(bus.owns(EffectId(0)));

        let (_, _, bus) = win(&EffectKind::Mute { messages: 10, minutes: 1 }, &user(1, "alice", 5));
        assert_eq!(bus.len(), 1);
    }
}
