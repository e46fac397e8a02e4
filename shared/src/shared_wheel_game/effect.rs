use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::bus::SubscriptionBus;
use super::effects::EffectKind;
use super::host::{HostBridge, User, UserRef};

const MS_PER_HOUR: i64 = 60 * 60 * 1000;
const MS_PER_MINUTE: i64 = 60 * 1000;

/// Durations an effect can be awarded for, in hours.
pub const DURATION_CHOICES_HOURS: [u32; 8] = [1, 2, 3, 4, 6, 8, 12, 16];

/// Stable handle of an effect inside its chat's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EffectId(pub u32);

/// One slot of the wheel.
#[derive(Debug)]
pub struct Effect {
    pub name: String,
    pub description: String,
    pub category: String,
    pub price_quality: f64,
    pub point_requirement: i64,
    pub duration_hours: u32,
    pub kind: EffectKind,
    winner: Option<UserRef>,
    win_time: Option<DateTime<Utc>>,
    expire_time: Option<DateTime<Utc>>,
}

impl Effect {
    pub fn new(kind: EffectKind, duration_hours: u32) -> Self {
        Self {
            name: kind.name(),
            description: kind.description(),
            category: kind.category(),
            price_quality: kind.price_quality(),
            point_requirement: kind.point_requirement(),
            duration_hours,
            kind,
            winner: None,
            win_time: None,
            expire_time: None,
        }
    }

    pub fn winner(&self) -> Option<&UserRef> {
        self.winner.as_ref()
    }

    pub fn win_time(&self) -> Option<DateTime<Utc>> {
        self.win_time
    }

    pub fn expire_time(&self) -> Option<DateTime<Utc>> {
        self.expire_time
    }

    pub fn is_won_by(&self, user_id: i64) -> bool {
        self.winner.as_ref().map_or(false, |w| w.id == user_id)
    }

    /// Claims the effect for `user` and runs the kind's win handler.
    pub fn award_winnings(
        &mut self,
        id: EffectId,
        user: &User,
        now: DateTime<Utc>,
        bus: &mut SubscriptionBus,
        bridge: &mut HostBridge<'_>,
    ) {
        self.winner = Some(user.into());
        self.win_time = Some(now);
        self.expire_time = Some(now + Duration::hours(i64::from(self.duration_hours)));

        log::info!("{} won '{}' for {} hour(s)", user.name, self.name, self.duration_hours);
        self.kind.handle_winnings(id, user, now, bus, bridge);
    }

    pub fn estimated_price(&self, user: &User) -> f64 {
        self.kind.estimated_price(user, self.duration_hours)
    }

    pub fn needs_replacing(&self, user: &User) -> bool {
        self.kind.needs_replacing(user)
    }

    /// Unclaimed effects never expire.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expire_time.map_or(false, |expire| now >= expire)
    }

    pub fn leftover_time(&self, now: DateTime<Utc>) -> String {
        let leftover_ms = self
            .expire_time
            .map_or(0, |expire| (expire - now).num_milliseconds().max(0));
        let hours = leftover_ms / MS_PER_HOUR;
        if hours > 0 {
            format!("{} hour(s)", hours)
        } else {
            let minutes = (leftover_ms + MS_PER_MINUTE - 1) / MS_PER_MINUTE;
            format!("{} minute(s)", minutes)
        }
    }

    /// Banner light matching how good the effect is for the winner.
    pub fn light(&self) -> &'static str {
        if self.price_quality > 0.0 {
            "🟢"
        } else if self.price_quality == 0.0 {
            "🔵"
        } else {
            "🔴"
        }
    }
}

/// Owns every effect of one chat; the pool, the wheel, the claimed history
/// and the bus refer to them by id.
#[derive(Debug, Default)]
pub struct EffectArena {
    effects: BTreeMap<EffectId, Effect>,
    next_id: u32,
}

impl EffectArena {
    pub fn insert(&mut self, effect: Effect) -> EffectId {
        let id = EffectId(self.next_id);
        self.next_id += 1;
        self.effects.insert(id, effect);
        id
    }

    pub fn get(&self, id: EffectId) -> Option<&Effect> {
        self.effects.get(&id)
    }

    pub fn get_mut(&mut self, id: EffectId) -> Option<&mut Effect> {
        self.effects.get_mut(&id)
    }

    pub fn contains(&self, id: EffectId) -> bool {
        self.effects.contains_key(&id)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(EffectId, &Effect) -> bool) {
        self.effects.retain(|id, effect| keep(*id, effect));
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared_wheel_game::ledger::Ledger;
    use chrono::TimeZone;

    fn alice() -> User {
        User { id: 1, name: "alice".to_string(), score: 100 }
    }

    fn claim(effect: &mut Effect, at: DateTime<Utc>) {
        let mut bus = SubscriptionBus::default();
        let mut ledger = Ledger::new(1);
        let mut actions = Vec::new();
        let mut bridge = HostBridge::new(&mut ledger, &mut actions);
        effect.award_winnings(EffectId(0), &alice(), at, &mut bus, &mut bridge);
    }

    #[test]
    fn test_expiration_window() {
        let won_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut effect = Effect::new(EffectKind::Nothing { repeats: 1 }, 3);
        assert!(!effect.is_expired(won_at));

        claim(&mut effect, won_at);
        assert!(!effect.is_expired(won_at));
        assert!(!effect.is_expired(won_at + Duration::hours(3) - Duration::milliseconds(1)));
        assert!(effect.is_expired(won_at + Duration::hours(3) + Duration::milliseconds(1)));
        assert_eq!(effect.winner().map(|w| w.id), Some(1));
    }

    #[test]
    fn test_leftover_time() {
        let won_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut effect = Effect::new(EffectKind::Jackpot { prize: 10 }, 2);
        claim(&mut effect, won_at);

        assert_eq!(effect.leftover_time(won_at + Duration::minutes(30)), "1 hour(s)");
        assert_eq!(effect.leftover_time(won_at + Duration::minutes(90) + Duration::seconds(10)), "30 minute(s)");
    }

    #[test]
    fn test_arena_handles_are_stable() {
        let mut arena = EffectArena::default();
        let first = arena.insert(Effect::new(EffectKind::Nothing { repeats: 1 }, 1));
        let second = arena.insert(Effect::new(EffectKind::Nothing { repeats: 2 }, 1));
        arena.retain(|id, _| id != first);

        assert!(!arena.contains(first));
        assert_eq!(arena.get(second).map(|e| e.name.as_str()), Some("Double Nothing"));
        let third = arena.insert(Effect::new(EffectKind::Nothing { repeats: 3 }, 1));
        assert_ne!(third, first);
    }
}
