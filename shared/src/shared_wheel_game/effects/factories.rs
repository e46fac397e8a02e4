use rand::Rng;

use super::{Companion, EffectKind};
use crate::shared_wheel_game::host::{ChatSnapshot, TimedBonusConfig, User};

const JACKPOT_DRAWS: usize = 10;

pub fn capped_gains() -> Vec<EffectKind> {
    [1, 5, 10]
        .into_iter()
        .map(|cap| EffectKind::CappedGains { cap })
        .collect()
}

pub fn extra_costs() -> Vec<EffectKind> {
    [5, 10, 15]
        .into_iter()
        .map(|fee| EffectKind::ExtraCosts { fee })
        .collect()
}

pub fn timed_bonus_multipliers(timed_bonuses: &TimedBonusConfig) -> Vec<EffectKind> {
    let average_gain = timed_bonuses.average_gain();
    [2, 3, 4]
        .into_iter()
        .map(|multiplier| EffectKind::TimedBonusMultiplier {
            multiplier,
            average_gain,
        })
        .collect()
}

/// One equalizer per user that has points.
pub fn equalizers(users: &[User]) -> Vec<EffectKind> {
    users
        .iter()
        .filter(|user| user.score > 0)
        .map(|user| EffectKind::Equalizer {
            target: user.clone(),
        })
        .collect()
}

/// Up to ten distinct prizes scaled from the median score.
pub fn jackpots(median_score: i64, rng: &mut impl Rng) -> Vec<EffectKind> {
    let multiplier = if median_score < 100 { 10 } else { 100 };
    let mut prizes: Vec<i64> = Vec::with_capacity(JACKPOT_DRAWS);
    for _ in 0..JACKPOT_DRAWS {
        let draw: f64 = rng.gen();
        let prize = (draw * median_score as f64 / 4.0 / 100.0).ceil() as i64 * multiplier;
        if prize > 0 && !prizes.contains(&prize) {
            prizes.push(prize);
        }
    }
    prizes
        .into_iter()
        .map(|prize| EffectKind::Jackpot { prize })
        .collect()
}

pub fn mutes() -> Vec<EffectKind> {
    const MESSAGES_PER_MINUTE: usize = 5;
    [1usize, 2, 3]
        .into_iter()
        .map(|minutes| EffectKind::Mute {
            messages: (minutes * MESSAGES_PER_MINUTE).max(10),
            minutes: minutes as i64,
        })
        .collect()
}

pub fn nothing() -> Vec<EffectKind> {
    (1..=3)
        .map(|repeats| EffectKind::Nothing { repeats })
        .collect()
}

pub fn pay_for_messages() -> Vec<EffectKind> {
    [1, 2]
        .into_iter()
        .map(|cost| EffectKind::PayForMessages { cost })
        .collect()
}

/// Only offered when the chat has random timed bonuses.
pub fn tag_at_random(timed_bonuses: &TimedBonusConfig) -> Vec<EffectKind> {
    if timed_bonuses.random_frequency == 0 {
        return Vec::new();
    }
    vec![EffectKind::TagAtRandom {
        random_points: timed_bonuses.random_points,
        random_frequency: timed_bonuses.random_frequency,
    }]
}

/// Costs and bonuses of the companions installed in the chat.
pub fn companion_effects(snapshot: &ChatSnapshot) -> Vec<EffectKind> {
    let mut kinds = Vec::new();
    for companion in Companion::ALL {
        if !snapshot.has_companion(companion.plugin_name()) {
            continue;
        }
        kinds.extend(
            companion
                .cost_choices()
                .iter()
                .map(|&cost| EffectKind::CompanionCosts { companion, cost }),
        );
        kinds.extend(companion.bonus_cooldowns().iter().map(|&cooldown_minutes| {
            EffectKind::CompanionBonus {
                companion,
                cooldown_minutes,
            }
        }));
    }
    kinds
}
