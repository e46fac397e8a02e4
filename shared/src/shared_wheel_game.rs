//! The Wheel of Fortune: a prize wheel layered on top of a chat's point
//! economy. Winning a slot activates an effect that intercepts the winner's
//! score changes or messages for a few hours.

mod arbitrator;
pub mod bus;
pub mod composer;
mod effect;
pub mod effects;
mod host;
mod ledger;

use serde::{Deserialize, Serialize};

pub use arbitrator::{
    ChatManager, SpinReply, SpinResolution, SpinState, SpinTicket, COMING_TO_STOP_AFTER_MS,
    COMING_TO_STOP_MESSAGE, MIN_REPEAT_SPIN_COST, RESOLVE_AFTER_MS, SLOWING_DOWN_AFTER_MS,
    SLOWING_DOWN_MESSAGE, SPIN_STARTED_MESSAGE,
};
pub use bus::Interception;
pub use effect::{Effect, EffectArena, EffectId, DURATION_CHOICES_HOURS};
pub use effects::{Companion, EffectKind};
pub use host::{
    ChatSnapshot, HostAction, HostBridge, MessageEvent, ScoreChangeEvent, TimedBonusConfig,
    TimedOccurrenceEvent, User, UserRef, WheelSettings, PLUGIN_NAME, REASON_NORMAL_TIMED,
    REASON_RANDOM_TIMED,
};
pub use ledger::{Ledger, LedgerBook};

// === Commands ===

pub const SPIN_CMD: [&str; 2] = ["wof", "wofspin"];
pub const EXPLAIN_CMD: [&str; 2] = ["wofexplain", "wofex"];
pub const INFO_CMD: [&str; 2] = ["wheeloffortune", "wofinfo"];
pub const STATS_CMD: [&str; 3] = ["wofstatistics", "wofstat", "wofstats"];
pub const CURRENT_CMD: [&str; 2] = ["wofcurrent", "wofcur"];

pub fn info_text() -> String {
    format!(
        "Welcome to The Wheel of Fortune\n\n\
         /{} to spin the wheel\n\
         /{} to show the items that are currently on the wheel\n\
         /{} to show the balance and statistics of the wheel\n\
         /{} to show your winnings and punishments",
        SPIN_CMD[0], EXPLAIN_CMD[0], STATS_CMD[0], CURRENT_CMD[0]
    )
}

// === API Types ===

/// Body of every command issued by a chat member.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WheelSpinRequest {
    pub user: User,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct WheelSpinResponse {
    pub success: bool,
    pub message: String,
    pub confirmation_required: bool,
    pub cost: Option<i64>,
    /// Actions the host has to carry out now, honoring their delays.
    pub actions: Vec<HostAction>,
}

impl WheelSpinResponse {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            confirmation_required: false,
            cost: None,
            actions: Vec::new(),
        }
    }
}

impl From<SpinReply> for WheelSpinResponse {
    fn from(reply: SpinReply) -> Self {
        match reply {
            SpinReply::Rejected(message) => Self::rejected(message),
            SpinReply::ConfirmationRequired { cost, question } => Self {
                success: true,
                message: question,
                confirmation_required: true,
                cost: Some(cost),
                actions: Vec::new(),
            },
            SpinReply::Started(ticket) => Self {
                success: true,
                message: ticket.message,
                confirmation_required: false,
                cost: None,
                actions: ticket.actions,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TextResponse {
    pub message: String,
}

/// Answer to a pending score change. The host commits `change_in_score`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ScoreChangeResponse {
    pub change_in_score: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct EventResponse {
    pub actions: Vec<HostAction>,
}
