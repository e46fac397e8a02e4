use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The house side of every point transfer made by the wheel in one chat.
///
/// A positive balance means the wheel took more points from the players than
/// it paid out.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Ledger {
    pub chat_id: i64,
    balance: i64,
    spins: u64,
}

impl Ledger {
    pub fn new(chat_id: i64) -> Self {
        Self {
            chat_id,
            balance: 0,
            spins: 0,
        }
    }

    pub fn reset(&mut self) {
        self.balance = 0;
        self.spins = 0;
    }

    pub fn alter_balance(&mut self, amount: i64) {
        self.balance += amount;
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn spin_made(&mut self) {
        self.spins += 1;
    }

    pub fn spins(&self) -> u64 {
        self.spins
    }

    pub fn print(&self) -> String {
        format!(
            "Wheel of Fortune --- Statistics\n\nBalance: {}\nSpins: {}",
            self.balance, self.spins
        )
    }
}

/// Ledgers of every chat, created lazily.
#[derive(Debug, Default)]
pub struct LedgerBook {
    chats: HashMap<i64, Ledger>,
}

impl LedgerBook {
    /// Replaces the book with the given records. Later duplicates win.
    pub fn load(records: Vec<Ledger>) -> Self {
        let chats = records
            .into_iter()
            .map(|ledger| (ledger.chat_id, ledger))
            .collect();
        Self { chats }
    }

    pub fn get_chat(&mut self, chat_id: i64) -> &mut Ledger {
        self.chats
            .entry(chat_id)
            .or_insert_with(|| Ledger::new(chat_id))
    }

    pub fn peek(&self, chat_id: i64) -> Option<&Ledger> {
        self.chats.get(&chat_id)
    }

    /// Removes the chat's ledger from the book, handing out a fresh one when
    /// none was recorded.
    pub fn take(&mut self, chat_id: i64) -> Ledger {
        self.chats
            .remove(&chat_id)
            .unwrap_or_else(|| Ledger::new(chat_id))
    }

    /// Flat list of all ledgers ordered by chat id.
    pub fn records(&self) -> Vec<Ledger> {
        let mut records: Vec<Ledger> = self.chats.values().cloned().collect();
        records.sort_by_key(|ledger| ledger.chat_id);
        records
    }

    pub fn len(&self) -> usize {
        self.chats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }
}
