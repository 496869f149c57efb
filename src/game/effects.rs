use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::state::Side;

/// 四种战斗行动。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Attack,
    Defend,
    Steal,
    Special,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::Attack,
        ActionKind::Defend,
        ActionKind::Steal,
        ActionKind::Special,
    ];

    /// 技能检定的尝试次数。
    pub fn attempt_budget(self) -> u8 {
        match self {
            ActionKind::Special => 5,
            ActionKind::Attack | ActionKind::Defend | ActionKind::Steal => 3,
        }
    }

    /// Defend 与 Steal 不能被对手连续使用。
    pub fn is_non_repeatable(self) -> bool {
        matches!(self, ActionKind::Defend | ActionKind::Steal)
    }
}

impl FromStr for ActionKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "attack" | "smash" => Ok(ActionKind::Attack),
            "defend" | "defense" | "shield" => Ok(ActionKind::Defend),
            "steal" => Ok(ActionKind::Steal),
            "special" => Ok(ActionKind::Special),
            _ => Err(()),
        }
    }
}

/// 一次行动结算后的效果，`self_*` 指发起方，`opponent_damage` 指对手。
///
/// 能量归属于完成技能检定的一方：玩家自己的行动记给玩家，
/// 对手发起的行动由防守的玩家获得。
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Outcome {
    pub opponent_damage: u8,
    pub self_damage: u8,
    pub self_heal: u8,
    pub shield_gain: u8,
    pub energy: u8,
}

impl Outcome {
    pub const fn new(
        opponent_damage: u8,
        self_damage: u8,
        self_heal: u8,
        shield_gain: u8,
        energy: u8,
    ) -> Self {
        Self {
            opponent_damage,
            self_damage,
            self_heal,
            shield_gain,
            energy,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Outcome::default()
    }
}

// 各表以成功次数为下标。
const PLAYER_ATTACK: [Outcome; 4] = [
    Outcome::new(0, 2, 0, 0, 0),
    Outcome::new(0, 0, 0, 0, 15),
    Outcome::new(1, 0, 0, 0, 25),
    Outcome::new(2, 0, 0, 0, 35),
];

const PLAYER_SPECIAL: [Outcome; 6] = [
    Outcome::new(0, 3, 0, 0, 0),
    Outcome::new(0, 2, 0, 0, 15),
    Outcome::new(1, 2, 0, 0, 20),
    Outcome::new(1, 1, 0, 0, 25),
    Outcome::new(2, 0, 0, 0, 30),
    Outcome::new(4, 0, 0, 0, 35),
];

const PLAYER_DEFEND: [Outcome; 4] = [
    Outcome::new(0, 2, 0, 0, 0),
    Outcome::new(0, 1, 0, 0, 15),
    Outcome::new(0, 0, 0, 1, 25),
    Outcome::new(0, 0, 0, 2, 35),
];

const PLAYER_STEAL: [Outcome; 4] = [
    Outcome::new(0, 3, 0, 0, 0),
    Outcome::new(0, 1, 0, 0, 15),
    Outcome::new(2, 2, 0, 0, 30),
    Outcome::new(2, 0, 2, 0, 40),
];

// 对手发起的行动按防守方（玩家）的成功次数结算，成功越多受伤越少。
const RIVAL_STEAL: [Outcome; 4] = [
    Outcome::new(3, 0, 3, 0, 0),
    Outcome::new(2, 0, 2, 0, 0),
    Outcome::new(2, 0, 1, 0, 0),
    Outcome::new(1, 0, 0, 0, 0),
];

const RIVAL_ATTACK: [Outcome; 4] = [
    Outcome::new(3, 0, 0, 0, 0),
    Outcome::new(2, 0, 0, 0, 15),
    Outcome::new(1, 0, 0, 0, 25),
    Outcome::new(1, 1, 0, 0, 35),
];

const RIVAL_SPECIAL: [Outcome; 6] = [
    Outcome::new(5, 0, 0, 0, 0),
    Outcome::new(4, 0, 0, 0, 15),
    Outcome::new(3, 0, 0, 0, 20),
    Outcome::new(2, 0, 0, 0, 25),
    Outcome::new(2, 1, 0, 0, 30),
    Outcome::new(1, 2, 0, 0, 35),
];

/// 对手防御不需要检定，固定获得的护盾段数。
pub const RIVAL_DEFEND_SHIELD: u8 = 2;
pub const RIVAL_DEFEND: Outcome = Outcome::new(0, 0, 0, RIVAL_DEFEND_SHIELD, 0);

/// 一次行动如何结算：交给外部技能检定，或直接使用固定效果。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Resolution {
    SkillCheck { attempts: u8 },
    Fixed { outcome: Outcome },
}

pub fn outcome_table(kind: ActionKind, initiator: Side) -> Option<&'static [Outcome]> {
    match (initiator, kind) {
        (Side::Player, ActionKind::Attack) => Some(&PLAYER_ATTACK),
        (Side::Player, ActionKind::Special) => Some(&PLAYER_SPECIAL),
        (Side::Player, ActionKind::Defend) => Some(&PLAYER_DEFEND),
        (Side::Player, ActionKind::Steal) => Some(&PLAYER_STEAL),
        (Side::Rival, ActionKind::Attack) => Some(&RIVAL_ATTACK),
        (Side::Rival, ActionKind::Special) => Some(&RIVAL_SPECIAL),
        (Side::Rival, ActionKind::Steal) => Some(&RIVAL_STEAL),
        (Side::Rival, ActionKind::Defend) => None,
    }
}

pub fn resolution_for(kind: ActionKind, initiator: Side) -> Resolution {
    match outcome_table(kind, initiator) {
        Some(_) => Resolution::SkillCheck {
            attempts: kind.attempt_budget(),
        },
        None => Resolution::Fixed {
            outcome: RIVAL_DEFEND,
        },
    }
}

/// 超出尝试次数的成功数视为满分。
pub fn lookup(kind: ActionKind, initiator: Side, successes: u8) -> Option<Outcome> {
    let table = outcome_table(kind, initiator)?;
    let index = usize::from(successes.min(kind.attempt_budget()));
    table.get(index).copied()
}
