use std::collections::hash_map::Entry;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use shared::shared_wheel_game::{
    ChatManager, ChatSnapshot, HostAction, Ledger, LedgerBook, WheelSettings,
};
use validator::Validate;

use crate::error::Error;

/// All chats the wheel is played in. Chats are set up on first use.
#[derive(Debug, Default)]
pub struct WheelPlugin {
    chats: HashMap<i64, ChatManager>,
    snapshots: HashMap<i64, ChatSnapshot>,
    statistics: LedgerBook,
    outboxes: HashMap<i64, Vec<HostAction>>,
}

impl WheelPlugin {
    pub fn new(statistics: LedgerBook) -> Self {
        Self {
            statistics,
            ..Self::default()
        }
    }

    /// The chat's manager, created with a fresh wheel when the chat is new.
    pub fn chat_manager(&mut self, chat_id: i64) -> &mut ChatManager {
        match self.chats.entry(chat_id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let ledger = self.statistics.take(chat_id);
                let mut manager = ChatManager::new(chat_id, WheelSettings::default(), ledger);
                let snapshot = self
                    .snapshots
                    .get(&chat_id)
                    .cloned()
                    .unwrap_or_else(|| ChatSnapshot::new(chat_id));
                manager.clear_and_generate_wheel(&snapshot);
                tracing::info!(chat_id, "Set up the wheel");
                entry.insert(manager)
            }
        }
    }

    /// Stores the snapshot. A chat that is already set up and idle gets a
    /// new wheel when the snapshot changes which effects it can be offered.
    /// Returns whether the wheel was rebuilt.
    pub fn update_snapshot(&mut self, snapshot: ChatSnapshot) -> bool {
        let chat_id = snapshot.chat_id;
        let changes_pool = self
            .snapshots
            .get(&chat_id)
            .map_or(true, |previous| previous.changes_pool(&snapshot));
        let rebuilt = match self.chats.get_mut(&chat_id) {
            Some(manager) if changes_pool && !manager.state().is_resolving() => {
                manager.clear_and_generate_wheel(&snapshot);
                tracing::info!(
                    chat_id,
                    "Rebuilt the wheel from a new snapshot, {} effects in the pool",
                    manager.pool_size()
                );
                true
            }
            _ => false,
        };
        self.snapshots.insert(chat_id, snapshot);
        rebuilt
    }

    pub fn settings(&mut self, chat_id: i64) -> WheelSettings {
        self.chat_manager(chat_id).settings().clone()
    }

    pub fn update_settings(&mut self, chat_id: i64, settings: WheelSettings) -> Result<(), Error> {
        settings.validate()?;
        self.chat_manager(chat_id).update_settings(settings);
        Ok(())
    }

    pub fn stats(&self, chat_id: i64) -> String {
        match self.chats.get(&chat_id) {
            Some(manager) => manager.ledger().print(),
            None => self
                .statistics
                .peek(chat_id)
                .cloned()
                .unwrap_or_else(|| Ledger::new(chat_id))
                .print(),
        }
    }

    /// Announces the statistics of the chat and resets them.
    pub fn reset_chat(&mut self, chat_id: i64) -> Vec<HostAction> {
        let message = self.chat_manager(chat_id).reset_statistics();
        vec![HostAction::SendMessage {
            text: message,
            delay_ms: 0,
        }]
    }

    /// Rebuilds the pool and wheel of every known chat.
    pub fn nightly_update(&mut self) {
        for (chat_id, manager) in self.chats.iter_mut() {
            let snapshot = self
                .snapshots
                .get(chat_id)
                .cloned()
                .unwrap_or_else(|| ChatSnapshot::new(*chat_id));
            let composition = manager.clear_and_generate_wheel(&snapshot);
            if !composition.converged {
                tracing::warn!(
                    chat_id = *chat_id,
                    "Wheel did not settle, fitness {}",
                    composition.fitness
                );
            }
        }
    }

    pub fn hourly_tick(&mut self, now: DateTime<Utc>) {
        for manager in self.chats.values_mut() {
            manager.tick(now);
        }
    }

    pub fn queue(&mut self, chat_id: i64, actions: Vec<HostAction>) {
        if actions.is_empty() {
            return;
        }
        self.outboxes.entry(chat_id).or_default().extend(actions);
    }

    pub fn drain_outbox(&mut self, chat_id: i64) -> Vec<HostAction> {
        self.outboxes.remove(&chat_id).unwrap_or_default()
    }

    /// Every ledger, active chats included, ordered by chat id.
    pub fn ledger_records(&self) -> Vec<Ledger> {
        let mut records = self.statistics.records();
        records.extend(self.chats.values().map(|m| m.ledger().clone()));
        records.sort_by_key(|ledger| ledger.chat_id);
        records
    }
}
