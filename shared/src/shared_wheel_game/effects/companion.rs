/// Optional plugins a chat may have installed next to the wheel. Effects tied
/// to a companion only show up in chats where it is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Companion {
    Life,
    SpongeMock,
}

const LIFE_COMMANDS: [&str; 14] = [
    "life", "status", "work", "hustle", "huts", "hutsle", "breakout", "office", "prison", "bribe",
    "hospital", "bounties", "placebounty", "kill",
];

const SPONGEMOCK_COMMANDS: [&str; 13] = [
    "spongemock", "sm", "🧽", "spons", "miakomock", "mm", "🙏", "sneakyspongemock", "ssm", "💨🧽",
    "sneakymiakomock", "smm", "💨🙏",
];

impl Companion {
    pub const ALL: [Companion; 2] = [Companion::Life, Companion::SpongeMock];

    pub fn plugin_name(&self) -> &'static str {
        match self {
            Self::Life => "Life",
            Self::SpongeMock => "sPoNgEmOcK",
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::Life => "life",
            Self::SpongeMock => "spongemock",
        }
    }

    pub fn commands(&self) -> &'static [&'static str] {
        match self {
            Self::Life => &LIFE_COMMANDS,
            Self::SpongeMock => &SPONGEMOCK_COMMANDS,
        }
    }

    /// Whether `text` invokes one of the companion's commands.
    pub fn matches_command(&self, text: &str) -> bool {
        let text = text.trim();
        self.commands()
            .iter()
            .any(|command| text.strip_prefix('/').map_or(false, |rest| rest.starts_with(command)))
    }

    pub fn cost_choices(&self) -> &'static [i64] {
        match self {
            Self::Life => &[5, 10, 15],
            Self::SpongeMock => &[5, 10, 15, 20, 25],
        }
    }

    pub fn cost_quality(&self) -> f64 {
        match self {
            Self::Life => -1.0,
            Self::SpongeMock => -0.5,
        }
    }

    /// Estimated loss for the winner of a command toll.
    pub fn cost_price(&self, cost: i64) -> f64 {
        match self {
            Self::Life => -(cost as f64) * 100.0,
            Self::SpongeMock => -(cost as f64) * 5.0,
        }
    }

    /// Durations a command toll can be awarded for, `None` for the defaults.
    pub fn cost_duration_choices(&self) -> Option<&'static [u32]> {
        match self {
            Self::Life => None,
            Self::SpongeMock => Some(&[8, 12, 16]),
        }
    }

    /// Cooldowns in minutes of the command bonuses the companion supports.
    pub fn bonus_cooldowns(&self) -> &'static [i64] {
        match self {
            Self::Life => &[],
            Self::SpongeMock => &[1, 2, 3],
        }
    }
}
