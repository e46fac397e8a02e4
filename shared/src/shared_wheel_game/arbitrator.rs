use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::bus::{Interception, SubscriptionBus};
use super::composer::{self, Composition};
use super::effect::{EffectArena, EffectId};
use super::host::{
    ChatSnapshot, HostAction, HostBridge, MessageEvent, ScoreChangeEvent, TimedOccurrenceEvent,
    User, WheelSettings,
};
use super::ledger::Ledger;

pub const SPIN_STARTED_MESSAGE: &str = "You give the wheel a mighty spin";
pub const SLOWING_DOWN_MESSAGE: &str = "The wheel is slowing down...";
pub const COMING_TO_STOP_MESSAGE: &str = "The wheel is coming to a stop...";
pub const SLOWING_DOWN_AFTER_MS: u64 = 5_000;
pub const COMING_TO_STOP_AFTER_MS: u64 = 9_000;
pub const RESOLVE_AFTER_MS: u64 = 11_000;

pub const MIN_REPEAT_SPIN_COST: i64 = 50;
const BANNER_LIGHTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpinState {
    Idle,
    Resolving { user: User, slot: EffectId },
}

impl SpinState {
    pub fn is_resolving(&self) -> bool {
        matches!(self, Self::Resolving { .. })
    }
}

/// A spin that has started. The suspense messages are in `actions`; the
/// caller must call [`ChatManager::resolve_spin`] after `resolve_after_ms`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpinTicket {
    pub message: String,
    pub actions: Vec<HostAction>,
    pub resolve_after_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpinReply {
    Rejected(String),
    ConfirmationRequired { cost: i64, question: String },
    Started(SpinTicket),
}

/// A repeat spin offered during the cooldown. It lapses with the cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RepeatOffer {
    cost: i64,
    cooldown_ends: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpinResolution {
    pub winner: User,
    pub effect_name: String,
    pub description: String,
    pub actions: Vec<HostAction>,
}

/// The wheel of one chat.
#[derive(Debug)]
pub struct ChatManager {
    chat_id: i64,
    settings: WheelSettings,
    ledger: Ledger,
    arena: EffectArena,
    pool: Vec<EffectId>,
    wheel: Vec<EffectId>,
    claimed: Vec<EffectId>,
    bus: SubscriptionBus,
    pending_offers: HashMap<i64, RepeatOffer>,
    state: SpinState,
    rng: StdRng,
}

impl ChatManager {
    pub fn new(chat_id: i64, settings: WheelSettings, ledger: Ledger) -> Self {
        Self::with_rng(chat_id, settings, ledger, StdRng::from_entropy())
    }

    pub fn with_rng(chat_id: i64, settings: WheelSettings, ledger: Ledger, rng: StdRng) -> Self {
        Self {
            chat_id,
            settings,
            ledger,
            arena: EffectArena::default(),
            pool: Vec::new(),
            wheel: Vec::new(),
            claimed: Vec::new(),
            bus: SubscriptionBus::default(),
            pending_offers: HashMap::new(),
            state: SpinState::Idle,
            rng,
        }
    }

    pub fn chat_id(&self) -> i64 {
        self.chat_id
    }

    pub fn settings(&self) -> &WheelSettings {
        &self.settings
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn state(&self) -> &SpinState {
        &self.state
    }

    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    pub fn wheel_names(&self) -> Vec<String> {
        self.wheel
            .iter()
            .filter_map(|id| self.arena.get(*id))
            .map(|e| e.name.clone())
            .collect()
    }

    /// Rebuilds the pool from `snapshot` and composes a fresh wheel.
    pub fn clear_and_generate_wheel(&mut self, snapshot: &ChatSnapshot) -> Composition {
        self.pool = composer::rebuild_pool(snapshot, &self.settings, &mut self.arena, &mut self.rng);
        let composition = composer::compose_wheel(
            &self.arena,
            &self.pool,
            self.ledger.balance(),
            self.settings.items_on_wheel,
            &mut self.rng,
        );
        self.wheel = composition.wheel.clone();
        self.collect_garbage();
        log::info!(
            "Chat {} has a new wheel: {}",
            self.chat_id,
            self.wheel_names().join(", ")
        );
        composition
    }

    /// Drops expired claims and their subscriptions. Returns the number of
    /// claims dropped.
    pub fn clear_old_wheel_actions(&mut self, now: DateTime<Utc>) -> usize {
        let arena = &self.arena;
        let before = self.claimed.len();
        self.claimed
            .retain(|id| arena.get(*id).map_or(false, |e| !e.is_expired(now)));
        let dropped = before - self.claimed.len();
        let unsubscribed = self.bus.prune_expired(&self.arena, now);
        self.pending_offers.retain(|_, offer| now < offer.cooldown_ends);
        if dropped > 0 || unsubscribed > 0 {
            log::debug!(
                "Chat {}: {} claim(s) expired, {} subscription(s) removed",
                self.chat_id,
                dropped,
                unsubscribed
            );
            self.collect_garbage();
        }
        dropped
    }

    /// Periodic maintenance: prunes and refills empty slots. Returns how many
    /// slots were filled.
    pub fn tick(&mut self, now: DateTime<Utc>) -> usize {
        self.clear_old_wheel_actions(now);
        let mut filled = 0;
        while composer::refill_slot(
            &self.arena,
            &self.pool,
            &mut self.wheel,
            self.ledger.balance(),
            self.settings.items_on_wheel,
            &mut self.rng,
        )
        .is_some()
        {
            filled += 1;
        }
        if filled > 0 {
            log::debug!("Chat {}: refilled {} slot(s)", self.chat_id, filled);
        }
        filled
    }

    pub fn request_spin(&mut self, user: &User, now: DateTime<Utc>) -> SpinReply {
        self.clear_old_wheel_actions(now);

        if self.state.is_resolving() {
            return SpinReply::Rejected(
                "The wheel is still spinning. Wait until it comes to a stop.".to_string(),
            );
        }
        if self.wheel.is_empty() {
            return SpinReply::Rejected(
                "The Wheel of Fortune is empty right now. Try again later.".to_string(),
            );
        }

        if let Some(last_win) = self.last_win_time(user.id) {
            let next_spin = last_win + Duration::minutes(self.settings.spin_interval_minutes);
            if now < next_spin {
                let cost = self.repeat_spin_cost(user);
                if user.score < cost {
                    return SpinReply::Rejected(format!(
                        "You have already spun the wheel today.\nAn additional spin costs {} points, but you only have {}.",
                        cost, user.score
                    ));
                }
                self.pending_offers.insert(
                    user.id,
                    RepeatOffer {
                        cost,
                        cooldown_ends: next_spin,
                    },
                );
                return SpinReply::ConfirmationRequired {
                    cost,
                    question: format!(
                        "You have already spun the wheel today.\nAn additional spin would cost you {} points.\nAre you sure? Type 'yes' to confirm.",
                        cost
                    ),
                };
            }
        }

        SpinReply::Started(self.start_spin(user, Vec::new()))
    }

    /// Charges the offered repeat-spin cost and starts the spin. An offer
    /// whose cooldown has run out is dropped and the spin is requested anew,
    /// free of charge.
    pub fn confirm_repeat_spin(&mut self, user: &User, now: DateTime<Utc>) -> SpinReply {
        let Some(offer) = self.pending_offers.remove(&user.id) else {
            return SpinReply::Rejected("There is no spin waiting for your confirmation.".to_string());
        };
        if now >= offer.cooldown_ends {
            log::debug!("Chat {}: repeat-spin offer for {} lapsed", self.chat_id, user.name);
            return self.request_spin(user, now);
        }
        let cost = offer.cost;
        self.clear_old_wheel_actions(now);

        if self.state.is_resolving() {
            return SpinReply::Rejected(
                "The wheel is still spinning. Wait until it comes to a stop.".to_string(),
            );
        }
        if self.wheel.is_empty() {
            return SpinReply::Rejected(
                "The Wheel of Fortune is empty right now. Try again later.".to_string(),
            );
        }
        if user.score < cost {
            return SpinReply::Rejected(format!(
                "An additional spin costs {} points, but you only have {}.",
                cost, user.score
            ));
        }

        let mut actions = Vec::new();
        HostBridge::new(&mut self.ledger, &mut actions).charge_additional_spin(cost, &user.into());
        SpinReply::Started(self.start_spin(user, actions))
    }

    /// Forgets the offer. Nothing is charged.
    pub fn decline_repeat_spin(&mut self, user: &User) -> String {
        match self.pending_offers.remove(&user.id) {
            Some(_) => "The wheel keeps still. Maybe next time.".to_string(),
            None => "There is no spin waiting for your confirmation.".to_string(),
        }
    }

    fn start_spin(&mut self, user: &User, mut actions: Vec<HostAction>) -> SpinTicket {
        // Callers have checked the wheel is not empty.
        let slot = self.wheel.choose(&mut self.rng).copied().unwrap_or(EffectId(0));
        self.state = SpinState::Resolving {
            user: user.clone(),
            slot,
        };

        actions.push(HostAction::SendMessage {
            text: SLOWING_DOWN_MESSAGE.to_string(),
            delay_ms: SLOWING_DOWN_AFTER_MS,
        });
        actions.push(HostAction::SendMessage {
            text: COMING_TO_STOP_MESSAGE.to_string(),
            delay_ms: COMING_TO_STOP_AFTER_MS,
        });
        log::debug!("Chat {}: {} spins the wheel", self.chat_id, user.name);

        SpinTicket {
            message: SPIN_STARTED_MESSAGE.to_string(),
            actions,
            resolve_after_ms: RESOLVE_AFTER_MS,
        }
    }

    /// Awards the slot the wheel stopped on. Returns `None` when no spin is
    /// in progress.
    pub fn resolve_spin(&mut self, now: DateTime<Utc>) -> Option<SpinResolution> {
        let SpinState::Resolving { user, slot } =
            std::mem::replace(&mut self.state, SpinState::Idle)
        else {
            return None;
        };

        let mut handler_actions = Vec::new();
        let (name, description, light, replace) = {
            let effect = self.arena.get_mut(slot)?;
            let mut bridge = HostBridge::new(&mut self.ledger, &mut handler_actions);
            effect.award_winnings(slot, &user, now, &mut self.bus, &mut bridge);
            (
                effect.name.clone(),
                effect.description.clone(),
                effect.light(),
                effect.needs_replacing(&user),
            )
        };

        if replace {
            self.wheel.retain(|id| *id != slot);
            let refilled = composer::refill_slot(
                &self.arena,
                &self.pool,
                &mut self.wheel,
                self.ledger.balance(),
                self.settings.items_on_wheel,
                &mut self.rng,
            );
            if refilled.is_none() {
                log::debug!("Chat {}: no candidate to refill the wheel", self.chat_id);
            }
        }
        if !self.claimed.contains(&slot) {
            self.claimed.push(slot);
        }
        self.ledger.spin_made();

        let banner = light.repeat(BANNER_LIGHTS);
        let description = format!(
            "{}\n\n{}\n\n{}\n\n{}",
            banner,
            name.to_uppercase(),
            description,
            banner
        );
        let mut actions = vec![HostAction::SendMessage {
            text: description.clone(),
            delay_ms: 0,
        }];
        actions.extend(handler_actions);

        Some(SpinResolution {
            winner: user,
            effect_name: name,
            description,
            actions,
        })
    }

    /// Lets the winner's effects rewrite a pending score change. The house
    /// side of the rewrite is booked in the ledger.
    pub fn handle_score_change(&mut self, event: &ScoreChangeEvent, now: DateTime<Utc>) -> Interception {
        self.clear_old_wheel_actions(now);
        let outcome = self.bus.dispatch_score_change(&self.arena, event);
        self.ledger.alter_balance(outcome.house_delta);
        outcome
    }

    pub fn handle_chat_message(&mut self, event: &MessageEvent, now: DateTime<Utc>) -> Vec<HostAction> {
        self.clear_old_wheel_actions(now);
        let reactions = self.bus.dispatch_message_post(&self.arena, event);
        let mut actions = Vec::new();
        let mut bridge = HostBridge::new(&mut self.ledger, &mut actions);
        for reaction in reactions {
            reaction.apply(&mut bridge);
        }
        actions
    }

    pub fn handle_timed_event(&mut self, event: &TimedOccurrenceEvent, now: DateTime<Utc>) -> Vec<HostAction> {
        self.clear_old_wheel_actions(now);
        let reactions = self.bus.dispatch_timed_event(&self.arena, event);
        let mut actions = Vec::new();
        let mut bridge = HostBridge::new(&mut self.ledger, &mut actions);
        for reaction in reactions {
            reaction.apply(&mut bridge);
        }
        actions
    }

    pub fn explain_wheel(&self) -> String {
        let items: Vec<String> = self
            .wheel
            .iter()
            .filter_map(|id| self.arena.get(*id))
            .map(|e| format!("<b>{}</b>\n{}", e.name, e.description))
            .collect();
        format!(
            "The wheel of fortune has the following items today:\n\n{}",
            items.join("\n\n")
        )
    }

    pub fn print_user_awards(&mut self, user_id: i64, user_name: &str, now: DateTime<Utc>) -> String {
        self.clear_old_wheel_actions(now);
        let mut message = format!("Current winnings and punishments for {}:\n", user_name);
        let mut any = false;
        for effect in self
            .claimed
            .iter()
            .filter_map(|id| self.arena.get(*id))
            .filter(|e| e.is_won_by(user_id))
        {
            message.push_str(&format!("- {} -- {} left\n", effect.name, effect.leftover_time(now)));
            any = true;
        }
        if !any {
            message.push_str("None");
        }
        message
    }

    /// Average estimated price of the wheel's slots for `user`.
    pub fn estimated_winnings(&self, user: &User) -> f64 {
        let prices: Vec<f64> = self
            .wheel
            .iter()
            .filter_map(|id| self.arena.get(*id))
            .map(|e| e.estimated_price(user))
            .collect();
        if prices.is_empty() {
            return 0.0;
        }
        prices.iter().sum::<f64>() / prices.len() as f64
    }

    pub fn repeat_spin_cost(&self, user: &User) -> i64 {
        ((self.estimated_winnings(user) * 2.0).round() as i64).max(MIN_REPEAT_SPIN_COST)
    }

    /// Settings must be validated by the caller. A shorter wheel is cut,
    /// a longer one is topped up by the next tick.
    pub fn update_settings(&mut self, settings: WheelSettings) {
        if self.wheel.len() > settings.items_on_wheel {
            self.wheel.truncate(settings.items_on_wheel);
        }
        self.settings = settings;
    }

    /// Announces the statistics and resets the ledger.
    pub fn reset_statistics(&mut self) -> String {
        let message = format!("Statistics before the reset:\n{}", self.ledger.print());
        self.ledger.reset();
        message
    }

    fn last_win_time(&self, user_id: i64) -> Option<DateTime<Utc>> {
        self.claimed
            .iter()
            .filter_map(|id| self.arena.get(*id))
            .filter(|e| e.is_won_by(user_id))
            .filter_map(|e| e.win_time())
            .max()
    }

    /// Frees effects nothing refers to anymore.
    fn collect_garbage(&mut self) {
        let Self {
            arena,
            pool,
            wheel,
            claimed,
            bus,
            state,
            ..
        } = self;
        let resolving = match state {
            SpinState::Resolving { slot, .. } => Some(*slot),
            SpinState::Idle => None,
        };
        arena.retain(|id, _| {
            resolving == Some(id)
                || wheel.contains(&id)
                || claimed.contains(&id)
                || pool.contains(&id)
                || bus.owns(id)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared_wheel_game::effect::Effect;
    use crate::shared_wheel_game::effects::EffectKind;

    fn user(id: i64, score: i64) -> User {
        User { id, name: format!("user{}", id), score }
    }

    fn manager_with(kinds: Vec<EffectKind>, wheel_len: usize, balance: i64) -> ChatManager {
        let mut ledger = Ledger::new(1);
        ledger.alter_balance(balance);
        let settings = WheelSettings { items_on_wheel: wheel_len, ..WheelSettings::default() };
        let mut manager = ChatManager::with_rng(1, settings, ledger, StdRng::seed_from_u64(9));
        for kind in kinds {
            let id = manager.arena.insert(Effect::new(kind, 4));
            manager.pool.push(id);
        }
        manager.wheel = manager.pool.iter().take(wheel_len).copied().collect();
        manager
    }

    fn score_total(actions: &[HostAction]) -> i64 {
        actions
            .iter()
            .map(|a| match a {
                HostAction::AlterScore { amount, .. } => *amount,
                _ => 0,
            })
            .sum()
    }

    #[test]
    fn test_repeat_spin_confirmation() {
        let now = Utc::now();
        let kinds = vec![
            EffectKind::Jackpot { prize: 70 },
            EffectKind::Nothing { repeats: 1 },
            EffectKind::CappedGains { cap: 1 },
        ];
        let mut manager = manager_with(kinds, 3, 0);
        let alice = user(1, 500);

        let previous = manager.arena.insert(Effect::new(EffectKind::Nothing { repeats: 2 }, 4));
        {
            let mut actions = Vec::new();
            let mut bridge = HostBridge::new(&mut manager.ledger, &mut actions);
            if let Some(effect) = manager.arena.get_mut(previous) {
                effect.award_winnings(previous, &alice, now - Duration::minutes(2), &mut manager.bus, &mut bridge);
            }
        }
        manager.claimed.push(previous);

        assert_eq!(manager.estimated_winnings(&alice), 40.0);
        match manager.request_spin(&alice, now) {
            SpinReply::ConfirmationRequired { cost, .. } => assert_eq!(cost, 80),
            other => panic!("unexpected reply: {:?}", other),
        }

        manager.decline_repeat_spin(&alice);
        assert_eq!(manager.ledger.balance(), 0);
        assert!(!manager.state.is_resolving());
        assert!(matches!(manager.confirm_repeat_spin(&alice, now), SpinReply::Rejected(_)));

        manager.request_spin(&alice, now);
        match manager.confirm_repeat_spin(&alice, now) {
            SpinReply::Started(ticket) => {
                assert_eq!(score_total(&ticket.actions), -80);
                assert_eq!(ticket.resolve_after_ms, RESOLVE_AFTER_MS);
            }
            other => panic!("unexpected reply: {:?}", other),
        }
        assert_eq!(manager.ledger.balance(), 80);
    }

    fn claim_for(manager: &mut ChatManager, winner: &User, at: DateTime<Utc>) -> EffectId {
        claim_kind(manager, EffectKind::Nothing { repeats: 2 }, 4, winner, at)
    }

    fn claim_kind(
        manager: &mut ChatManager,
        kind: EffectKind,
        hours: u32,
        winner: &User,
        at: DateTime<Utc>,
    ) -> EffectId {
        let id = manager.arena.insert(Effect::new(kind, hours));
        {
            let mut actions = Vec::new();
            let mut bridge = HostBridge::new(&mut manager.ledger, &mut actions);
            if let Some(effect) = manager.arena.get_mut(id) {
                effect.award_winnings(id, winner, at, &mut manager.bus, &mut bridge);
            }
        }
        manager.claimed.push(id);
        id
    }

    #[test]
    fn test_lapsed_repeat_offer_is_free() {
        let won_at = Utc::now();
        let mut manager = manager_with(vec![EffectKind::Nothing { repeats: 1 }], 1, 0);
        let alice = user(1, 500);
        claim_for(&mut manager, &alice, won_at);

        let offered_at = won_at + Duration::minutes(1);
        assert!(matches!(
            manager.request_spin(&alice, offered_at),
            SpinReply::ConfirmationRequired { .. }
        ));

        match manager.confirm_repeat_spin(&alice, won_at + Duration::hours(3)) {
            SpinReply::Started(ticket) => assert_eq!(score_total(&ticket.actions), 0),
            other => panic!("unexpected reply: {:?}", other),
        }
        assert_eq!(manager.ledger.balance(), 0);
        assert!(manager.pending_offers.is_empty());
    }

    #[test]
    fn test_unanswered_offers_are_pruned() {
        let won_at = Utc::now();
        let mut manager = manager_with(vec![EffectKind::Nothing { repeats: 1 }], 1, 0);
        let alice = user(1, 500);
        claim_for(&mut manager, &alice, won_at);

        manager.request_spin(&alice, won_at + Duration::minutes(1));
        assert_eq!(manager.pending_offers.len(), 1);
        manager.clear_old_wheel_actions(won_at + Duration::minutes(2));
        assert_eq!(manager.pending_offers.len(), 1);
        manager.clear_old_wheel_actions(won_at + Duration::hours(1));
        assert!(manager.pending_offers.is_empty());
        assert!(matches!(
            manager.confirm_repeat_spin(&alice, won_at + Duration::hours(1)),
            SpinReply::Rejected(_)
        ));
    }

    #[test]
    fn test_clearing_old_actions_twice_changes_nothing() {
        let won_at = Utc::now();
        let mut manager = manager_with(vec![EffectKind::Nothing { repeats: 1 }], 1, 0);
        let alice = user(1, 0);
        let short = claim_kind(&mut manager, EffectKind::CappedGains { cap: 5 }, 2, &alice, won_at);
        let long = claim_kind(&mut manager, EffectKind::ExtraCosts { fee: 10 }, 4, &alice, won_at);
        assert_eq!(manager.bus.len(), 2);

        let later = won_at + Duration::hours(3);
        assert_eq!(manager.clear_old_wheel_actions(later), 1);
        assert_eq!(manager.claimed, vec![long]);
        assert!(!manager.arena.contains(short));
        let bus_len = manager.bus.len();
        let arena_len = manager.arena.len();
        assert_eq!(bus_len, 1);

        assert_eq!(manager.clear_old_wheel_actions(later), 0);
        assert_eq!(manager.claimed, vec![long]);
        assert_eq!(manager.bus.len(), bus_len);
        assert_eq!(manager.arena.len(), arena_len);
    }

    #[test]
    fn test_random_timed_event_mentions_winner() {
        let won_at = Utc::now();
        let mut manager = manager_with(vec![EffectKind::Nothing { repeats: 1 }], 1, 0);
        let alice = user(1, 0);
        let tag = EffectKind::TagAtRandom { random_points: 10, random_frequency: 4 };
        claim_kind(&mut manager, tag, 2, &alice, won_at);

        let scheduled = manager.handle_timed_event(&TimedOccurrenceEvent { is_random: false }, won_at);
        assert!(scheduled.is_empty());

        let random = manager.handle_timed_event(&TimedOccurrenceEvent { is_random: true }, won_at);
        assert_eq!(random, vec![HostAction::SendMessage { text: "@user1".to_string(), delay_ms: 0 }]);
        assert_eq!(manager.ledger.balance(), 0);

        let expired = manager.handle_timed_event(&TimedOccurrenceEvent { is_random: true }, won_at + Duration::hours(3));
        assert!(expired.is_empty());
        assert!(manager.bus.is_empty());
    }

    #[test]
    fn test_repeat_spin_needs_points() {
        let now = Utc::now();
        let mut manager = manager_with(vec![EffectKind::Nothing { repeats: 1 }], 1, 0);
        let broke = user(2, 10);

        let previous = manager.arena.insert(Effect::new(EffectKind::Nothing { repeats: 3 }, 4));
        {
            let mut actions = Vec::new();
            let mut bridge = HostBridge::new(&mut manager.ledger, &mut actions);
            if let Some(effect) = manager.arena.get_mut(previous) {
                effect.award_winnings(previous, &broke, now, &mut manager.bus, &mut bridge);
            }
        }
        manager.claimed.push(previous);

        assert!(matches!(manager.request_spin(&broke, now), SpinReply::Rejected(_)));
        assert!(matches!(
            manager.request_spin(&broke, now + Duration::minutes(6)),
            SpinReply::Started(_)
        ));
    }

    #[test]
    fn test_spin_is_exclusive_until_resolved() {
        let now = Utc::now();
        let kinds = vec![
            EffectKind::Jackpot { prize: 30 },
            EffectKind::Jackpot { prize: 40 },
            EffectKind::Jackpot { prize: 50 },
        ];
        let mut manager = manager_with(kinds, 1, 1000);

        let ticket = match manager.request_spin(&user(1, 0), now) {
            SpinReply::Started(ticket) => ticket,
            other => panic!("unexpected reply: {:?}", other),
        };
        assert_eq!(ticket.message, SPIN_STARTED_MESSAGE);
        assert_eq!(ticket.actions.len(), 2);
        assert!(matches!(manager.request_spin(&user(2, 0), now), SpinReply::Rejected(_)));

        let resolution = match manager.resolve_spin(now) {
            Some(resolution) => resolution,
            None => panic!("spin was not resolved"),
        };
        assert!(resolution.description.starts_with("🟢🟢🟢🟢🟢🟢🟢🟢🟢🟢"));
        assert_eq!(resolution.actions[0], HostAction::SendMessage { text: resolution.description.clone(), delay_ms: 0 });
        assert_eq!(manager.resolve_spin(now), None);

        let paid = score_total(&resolution.actions);
        assert!(paid > 0);
        assert_eq!(manager.ledger.balance(), 1000 - paid);
        assert_eq!(manager.ledger.spins(), 1);
        assert_eq!(manager.claimed.len(), 1);
        assert_eq!(manager.wheel.len(), 1);
        assert!(!manager.wheel.contains(&manager.claimed[0]));
    }

    #[test]
    fn test_capped_gains_interception() {
        let now = Utc::now();
        let mut manager = manager_with(vec![EffectKind::CappedGains { cap: 10 }], 1, 0);
        let alice = user(1, 0);

        assert!(matches!(manager.request_spin(&alice, now), SpinReply::Started(_)));
        manager.resolve_spin(now);

        let event = ScoreChangeEvent {
            user: alice.clone(),
            change_in_score: 37,
            reason: "chat.message".to_string(),
            immutable: false,
        };
        let outcome = manager.handle_score_change(&event, now + Duration::minutes(1));
        assert_eq!(outcome.change_in_score, 10);
        assert_eq!(manager.ledger.balance(), 27);

        let after = manager.handle_score_change(&event, now + Duration::hours(5));
        assert_eq!(after.change_in_score, 37);
        assert_eq!(manager.ledger.balance(), 27);
        assert!(manager.print_user_awards(alice.id, &alice.name, now + Duration::hours(5)).ends_with("None"));
    }

    #[test]
    fn test_zero_sum_messages() {
        let now = Utc::now();
        let mut manager = manager_with(vec![EffectKind::PayForMessages { cost: 2 }], 1, 0);
        let alice = user(1, 100);
        manager.request_spin(&alice, now);
        manager.resolve_spin(now);

        let mut paid = 0;
        for message_id in 0..3 {
            let event = MessageEvent { message_id, text: Some("hello".to_string()), date: now.timestamp(), user: alice.clone() };
            paid += score_total(&manager.handle_chat_message(&event, now));
        }
        assert_eq!(paid, -6);
        assert_eq!(manager.ledger.balance() + paid, 0);
    }

    #[test]
    fn test_settings_shrink_and_tick_refill() {
        let kinds = vec![
            EffectKind::Nothing { repeats: 1 },
            EffectKind::Nothing { repeats: 2 },
            EffectKind::Nothing { repeats: 3 },
        ];
        let mut manager = manager_with(kinds, 3, 0);
        manager.update_settings(WheelSettings { items_on_wheel: 2, ..WheelSettings::default() });
        assert_eq!(manager.wheel.len(), 2);

        manager.update_settings(WheelSettings { items_on_wheel: 3, ..WheelSettings::default() });
        assert_eq!(manager.tick(Utc::now()), 1);
        assert_eq!(manager.wheel.len(), 3);
        assert!(manager.explain_wheel().contains("<b>Double Nothing</b>"));
    }

    #[test]
    fn test_reset_statistics() {
        let mut manager = manager_with(Vec::new(), 3, 12);
        let message = manager.reset_statistics();
        assert!(message.ends_with("Balance: 12\nSpins: 0"));
        assert_eq!(manager.ledger.balance(), 0);
        assert!(matches!(manager.request_spin(&user(1, 0), Utc::now()), SpinReply::Rejected(_)));
    }
}
