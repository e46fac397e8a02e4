use rand::seq::SliceRandom;
use rand::Rng;

use super::effect::{Effect, EffectArena, EffectId, DURATION_CHOICES_HOURS};
use super::effects::{factories, EffectKind};
use super::host::{ChatSnapshot, User, WheelSettings};

/// Fitness every wheel aims for, whatever its length.
pub const TARGET_FITNESS: f64 = -1.0;
pub const BASE_TOLERANCE: f64 = 0.5;
/// Tolerance gained per iteration past the grace period and per stalled pick.
pub const TOLERANCE_STEP: f64 = 0.05;
/// Below this fitness non-negative effects are preferred.
pub const FITNESS_FLOOR: f64 = -5.0;

const GRACE_ITERATIONS_PER_SLOT: usize = 10;
const MAX_ITERATIONS_PER_SLOT: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub wheel: Vec<EffectId>,
    pub fitness: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Median of the sorted positive scores, 0 when nobody has points.
pub fn median_score(users: &[User]) -> i64 {
    let mut scores: Vec<i64> = users
        .iter()
        .map(|u| u.score)
        .filter(|score| *score > 0)
        .collect();
    scores.sort_unstable();
    scores.get(scores.len() / 2).copied().unwrap_or(0)
}

/// Picks an award duration. Kinds with their own choices ignore the chat's
/// bounds; otherwise the default choices are clamped to them.
pub fn draw_duration(
    choices: Option<&[u32]>,
    settings: &WheelSettings,
    rng: &mut impl Rng,
) -> u32 {
    if let Some(&hours) = choices.and_then(|c| c.choose(rng)) {
        return hours;
    }
    let allowed: Vec<u32> = DURATION_CHOICES_HOURS
        .iter()
        .copied()
        .filter(|h| (settings.min_award_hours..=settings.max_award_hours).contains(h))
        .collect();
    allowed
        .choose(rng)
        .copied()
        .unwrap_or(settings.max_award_hours)
}

/// Every effect kind the chat can currently be offered.
pub fn pool_kinds(snapshot: &ChatSnapshot, rng: &mut impl Rng) -> Vec<EffectKind> {
    let median = median_score(&snapshot.users);
    let mut kinds = Vec::new();
    kinds.extend(factories::capped_gains());
    kinds.extend(factories::timed_bonus_multipliers(&snapshot.timed_bonuses));
    kinds.extend(factories::equalizers(&snapshot.users));
    kinds.extend(factories::extra_costs());
    kinds.extend(factories::jackpots(median, rng));
    kinds.extend(factories::mutes());
    kinds.extend(factories::nothing());
    kinds.extend(factories::pay_for_messages());
    kinds.extend(factories::tag_at_random(&snapshot.timed_bonuses));
    kinds.extend(factories::companion_effects(snapshot));
    kinds
}

/// Builds a fresh, shuffled pool inside `arena`.
pub fn rebuild_pool(
    snapshot: &ChatSnapshot,
    settings: &WheelSettings,
    arena: &mut EffectArena,
    rng: &mut impl Rng,
) -> Vec<EffectId> {
    let kinds = pool_kinds(snapshot, rng);
    let mut pool: Vec<EffectId> = kinds
        .into_iter()
        .map(|kind| {
            let duration = draw_duration(kind.duration_choices(), settings, rng);
            arena.insert(Effect::new(kind, duration))
        })
        .collect();
    pool.shuffle(rng);
    log::debug!("Rebuilt pool of {} effects for chat {}", pool.len(), snapshot.chat_id);
    pool
}

pub fn wheel_fitness(arena: &EffectArena, wheel: &[EffectId]) -> f64 {
    wheel
        .iter()
        .filter_map(|id| arena.get(*id))
        .map(|e| e.price_quality)
        .sum()
}

/// Uniformly picks an unclaimed pool entry whose category is not on the wheel
/// yet and which the house can afford. Below the fitness floor only
/// non-negative entries qualify, unless there are none.
pub fn pick_candidate(
    arena: &EffectArena,
    pool: &[EffectId],
    wheel: &[EffectId],
    balance: i64,
    rng: &mut impl Rng,
) -> Option<EffectId> {
    let fitness = wheel_fitness(arena, wheel);
    let taken: Vec<&str> = wheel
        .iter()
        .filter_map(|id| arena.get(*id))
        .map(|e| e.category.as_str())
        .collect();
    let affordable = balance.max(0);

    let eligible: Vec<(EffectId, f64)> = pool
        .iter()
        .filter_map(|id| arena.get(*id).map(|e| (*id, e)))
        .filter(|(_, e)| {
            e.winner().is_none()
                && !taken.contains(&e.category.as_str())
                && e.point_requirement <= affordable
        })
        .map(|(id, e)| (id, e.price_quality))
        .collect();

    if fitness < FITNESS_FLOOR {
        let lifting: Vec<EffectId> = eligible
            .iter()
            .filter(|(_, quality)| *quality >= 0.0)
            .map(|(id, _)| *id)
            .collect();
        // With every non-negative category already on the wheel, any pick
        // still lets eviction move the wheel along.
        if !lifting.is_empty() {
            return lifting.choose(rng).copied();
        }
    }
    eligible.choose(rng).map(|(id, _)| *id)
}

/// Assembles a category-unique wheel of `target_len` effects whose fitness
/// lies within the widening tolerance of the target. Gives up after
/// `target_len * 100` iterations and keeps what it has.
pub fn compose_wheel(
    arena: &EffectArena,
    pool: &[EffectId],
    balance: i64,
    target_len: usize,
    rng: &mut impl Rng,
) -> Composition {
    let grace = target_len * GRACE_ITERATIONS_PER_SLOT;
    let max_iterations = target_len * MAX_ITERATIONS_PER_SLOT;

    let mut wheel: Vec<EffectId> = Vec::with_capacity(target_len + 1);
    let mut iterations: usize = 0;
    let mut stalled: usize = 0;
    let converged = loop {
        let fitness = wheel_fitness(arena, &wheel);
        let widened = iterations.saturating_sub(grace) + stalled;
        let tolerance = BASE_TOLERANCE + TOLERANCE_STEP * widened as f64;
        if wheel.len() == target_len && (fitness - TARGET_FITNESS).abs() <= tolerance {
            break true;
        }
        if iterations >= max_iterations {
            break false;
        }
        iterations += 1;

        match pick_candidate(arena, pool, &wheel, balance, rng) {
            Some(id) => {
                wheel.push(id);
                if wheel.len() > target_len {
                    wheel.remove(0);
                }
            }
            None => stalled += 1,
        }
    };

    wheel.shuffle(rng);
    let fitness = wheel_fitness(arena, &wheel);
    if converged {
        log::debug!(
            "Composed wheel of {} after {} iterations, fitness {}",
            wheel.len(),
            iterations,
            fitness
        );
    } else {
        log::warn!(
            "Wheel composition hit the iteration cap: {} of {} slots, fitness {}",
            wheel.len(),
            target_len,
            fitness
        );
    }

    Composition {
        wheel,
        fitness,
        iterations,
        converged,
    }
}

/// Fills one free slot. Returns `None` when the wheel is full or nothing is
/// eligible; a later tick tries again.
pub fn refill_slot(
    arena: &EffectArena,
    pool: &[EffectId],
    wheel: &mut Vec<EffectId>,
    balance: i64,
    target_len: usize,
    rng: &mut impl Rng,
) -> Option<EffectId> {
    if wheel.len() >= target_len {
        return None;
    }
    let id = pick_candidate(arena, pool, wheel, balance, rng)?;
    wheel.push(id);
    Some(id)
}
