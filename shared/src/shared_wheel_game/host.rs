use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::ledger::Ledger;

pub const PLUGIN_NAME: &str = "wheeloffortune";

/// Reason tags the host attaches to scheduled and random timed bonuses.
pub const REASON_NORMAL_TIMED: &str = "normal.danktime";
pub const REASON_RANDOM_TIMED: &str = "random.danktime";

/// A chat member as reported by the host, including their current score.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub score: i64,
}

/// A reference to a user that does not track their score.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub id: i64,
    pub name: String,
}

impl From<&User> for UserRef {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
        }
    }
}

/// A pending score change. The host waits for the plugin's answer before
/// committing `change_in_score`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScoreChangeEvent {
    pub user: User,
    pub change_in_score: i64,
    pub reason: String,
    #[serde(default)]
    pub immutable: bool,
}

impl ScoreChangeEvent {
    pub fn is_timed_bonus(&self) -> bool {
        self.reason == REASON_NORMAL_TIMED || self.reason == REASON_RANDOM_TIMED
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MessageEvent {
    pub message_id: i64,
    pub text: Option<String>,
    /// Unix timestamp in seconds.
    pub date: i64,
    pub user: User,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct TimedOccurrenceEvent {
    pub is_random: bool,
}

/// Points handed out by the host's timed bonuses.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct TimedBonusConfig {
    #[serde(default)]
    pub scheduled_points: Vec<i64>,
    #[serde(default)]
    pub random_points: i64,
    /// Random occurrences per day.
    #[serde(default)]
    pub random_frequency: u32,
}

impl TimedBonusConfig {
    /// Average gain of a single timed bonus, random ones included.
    pub fn average_gain(&self) -> f64 {
        let occurrences = self.scheduled_points.len() as f64 + self.random_frequency as f64;
        if occurrences == 0.0 {
            return 0.0;
        }
        let scheduled: i64 = self.scheduled_points.iter().sum();
        let random = self.random_points * self.random_frequency as i64;
        (scheduled + random) as f64 / occurrences
    }
}

/// What the host knows about a chat at pool rebuild time.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ChatSnapshot {
    pub chat_id: i64,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub timed_bonuses: TimedBonusConfig,
    /// Names of the companion plugins installed in the chat.
    #[serde(default)]
    pub companions: Vec<String>,
}

impl ChatSnapshot {
    pub fn new(chat_id: i64) -> Self {
        Self {
            chat_id,
            ..Self::default()
        }
    }

    pub fn has_companion(&self, name: &str) -> bool {
        self.companions.iter().any(|c| c == name)
    }

    /// Whether a pool built from `other` would hold different effect kinds.
    /// Score changes alone only move prices and requirements.
    pub fn changes_pool(&self, other: &ChatSnapshot) -> bool {
        fn scorers(snapshot: &ChatSnapshot) -> Vec<i64> {
            let mut ids: Vec<i64> = snapshot
                .users
                .iter()
                .filter(|u| u.score > 0)
                .map(|u| u.id)
                .collect();
            ids.sort_unstable();
            ids
        }
        fn companions(snapshot: &ChatSnapshot) -> Vec<&str> {
            let mut names: Vec<&str> = snapshot.companions.iter().map(String::as_str).collect();
            names.sort_unstable();
            names
        }
        self.timed_bonuses != other.timed_bonuses
            || companions(self) != companions(other)
            || scorers(self) != scorers(other)
    }
}

/// Something the host has to carry out on behalf of the plugin.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostAction {
    AlterScore {
        user_id: i64,
        amount: i64,
        reason: String,
    },
    SendMessage {
        text: String,
        delay_ms: u64,
    },
    RemoveMessage {
        message_id: i64,
    },
}

impl HostAction {
    pub fn delay_ms(&self) -> u64 {
        match self {
            Self::SendMessage { delay_ms, .. } => *delay_ms,
            _ => 0,
        }
    }
}

/// Per-chat settings of the wheel.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Validate)]
#[validate(schema(function = "validate_award_bounds"))]
pub struct WheelSettings {
    #[validate(range(min = 3, max = 10))]
    pub items_on_wheel: usize,
    #[validate(range(min = 0, max = 600))]
    pub spin_interval_minutes: i64,
    #[validate(range(min = 1, max = 48))]
    pub min_award_hours: u32,
    #[validate(range(min = 1, max = 48))]
    pub max_award_hours: u32,
}

impl Default for WheelSettings {
    fn default() -> Self {
        Self {
            items_on_wheel: 7,
            spin_interval_minutes: 5,
            min_award_hours: 1,
            max_award_hours: 16,
        }
    }
}

fn validate_award_bounds(settings: &WheelSettings) -> Result<(), ValidationError> {
    if settings.min_award_hours > settings.max_award_hours {
        return Err(ValidationError::new("award_bounds_inverted"));
    }
    Ok(())
}

/// Moves points between users and the house. Every transfer is mirrored in
/// the ledger with the opposite sign.
pub struct HostBridge<'a> {
    ledger: &'a mut Ledger,
    actions: &'a mut Vec<HostAction>,
}

impl<'a> HostBridge<'a> {
    pub fn new(ledger: &'a mut Ledger, actions: &'a mut Vec<HostAction>) -> Self {
        Self { ledger, actions }
    }

    pub fn reward_points(&mut self, amount: i64, user: &UserRef) {
        self.alter_score(user, amount, "price");
        self.ledger.alter_balance(-amount);
    }

    pub fn reduce_points(&mut self, amount: i64, user: &UserRef) {
        self.alter_score(user, -amount, "costs");
        self.ledger.alter_balance(amount);
    }

    pub fn charge_additional_spin(&mut self, amount: i64, user: &UserRef) {
        self.alter_score(user, -amount, "additionalspin");
        self.ledger.alter_balance(amount);
    }

    pub fn send_message(&mut self, text: impl Into<String>, delay_ms: u64) {
        self.actions.push(HostAction::SendMessage {
            text: text.into(),
            delay_ms,
        });
    }

    pub fn remove_message(&mut self, message_id: i64) {
        self.actions.push(HostAction::RemoveMessage { message_id });
    }

    fn alter_score(&mut self, user: &UserRef, amount: i64, reason: &str) {
        self.actions.push(HostAction::AlterScore {
            user_id: user.id,
            amount,
            reason: format!("{}.{}", PLUGIN_NAME, reason),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_bounds() {
        assert!(WheelSettings::default().validate().is_ok());

        let too_many = WheelSettings { items_on_wheel: 11, ..WheelSettings::default() };
        assert!(too_many.validate().is_err());

        let inverted = WheelSettings { min_award_hours: 12, max_award_hours: 4, ..WheelSettings::default() };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn test_pool_relevant_snapshot_changes() {
        let mut before = ChatSnapshot::new(1);
        before.users = vec![User { id: 1, name: "alice".to_string(), score: 10 }];

        let mut richer = before.clone();
        richer.users[0].score = 500;
        assert!(!before.changes_pool(&richer));

        let mut newcomer = before.clone();
        newcomer.users.push(User { id: 2, name: "bob".to_string(), score: 3 });
        assert!(before.changes_pool(&newcomer));

        let mut installed = before.clone();
        installed.companions = vec!["Life".to_string()];
        assert!(before.changes_pool(&installed));
    }

    #[test]
    fn test_bridge_mirrors_ledger() {
        let mut ledger = Ledger::new(1);
        let mut actions = Vec::new();
        let user = UserRef { id: 7, name: "alice".to_string() };
        {
            let mut bridge = HostBridge::new(&mut ledger, &mut actions);
            bridge.reward_points(30, &user);
            bridge.reduce_points(12, &user);
        }
        let gains: i64 = actions
            .iter()
            .map(|a| match a {
                HostAction::AlterScore { amount, .. } => *amount,
                _ => 0,
            })
            .sum();
        assert_eq!(gains, 18);
        assert_eq!(ledger.balance() + gains, 0);
    }

    #[test]
    fn test_average_timed_gain() {
        let config = TimedBonusConfig {
            scheduled_points: vec![10, 20],
            random_points: 30,
            random_frequency: 2,
        };
        assert_eq!(config.average_gain(), 22.5);
        assert_eq!(TimedBonusConfig::default().average_gain(), 0.0);
    }
}
