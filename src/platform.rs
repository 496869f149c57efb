//! 平台存档：教程提示标记的尽力读取与保存，失败时回退到默认值。

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::game::{ActionKind, Side};

/// 等待平台 SDK 返回存档的上限。
pub const SAVE_STATE_TIMEOUT_MS: u32 = 3_000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Tutorial {
    Smash,
    Shield,
    Steal,
    Special,
    RivalAttack,
}

impl Tutorial {
    /// 第一次遇到某种技能检定时应展示的教程；对手防御无需检定。
    pub fn for_action(kind: ActionKind, initiator: Side) -> Option<Self> {
        match (initiator, kind) {
            (Side::Player, ActionKind::Attack) => Some(Tutorial::Smash),
            (Side::Player, ActionKind::Defend) => Some(Tutorial::Shield),
            (Side::Player, ActionKind::Steal) => Some(Tutorial::Steal),
            (Side::Player, ActionKind::Special) => Some(Tutorial::Special),
            (Side::Rival, ActionKind::Defend) => None,
            (Side::Rival, _) => Some(Tutorial::RivalAttack),
        }
    }
}

impl FromStr for Tutorial {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "smash" | "attack" => Ok(Tutorial::Smash),
            "shield" | "defend" => Ok(Tutorial::Shield),
            "steal" => Ok(Tutorial::Steal),
            "special" => Ok(Tutorial::Special),
            "rivalattack" | "rival_attack" | "rival-attack" => Ok(Tutorial::RivalAttack),
            _ => Err(()),
        }
    }
}

/// 平台保存的非规则状态，字段名与 SDK 存档保持一致。
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct TutorialFlags {
    pub has_seen_smash_tutorial: bool,
    pub has_seen_shield_tutorial: bool,
    pub has_seen_steal_tutorial: bool,
    pub has_seen_special_tutorial: bool,
    pub has_seen_rival_attack_tutorial: bool,
}

impl TutorialFlags {
    fn flag_mut(&mut self, tutorial: Tutorial) -> &mut bool {
        match tutorial {
            Tutorial::Smash => &mut self.has_seen_smash_tutorial,
            Tutorial::Shield => &mut self.has_seen_shield_tutorial,
            Tutorial::Steal => &mut self.has_seen_steal_tutorial,
            Tutorial::Special => &mut self.has_seen_special_tutorial,
            Tutorial::RivalAttack => &mut self.has_seen_rival_attack_tutorial,
        }
    }

    pub fn has_seen(&self, tutorial: Tutorial) -> bool {
        match tutorial {
            Tutorial::Smash => self.has_seen_smash_tutorial,
            Tutorial::Shield => self.has_seen_shield_tutorial,
            Tutorial::Steal => self.has_seen_steal_tutorial,
            Tutorial::Special => self.has_seen_special_tutorial,
            Tutorial::RivalAttack => self.has_seen_rival_attack_tutorial,
        }
    }

    /// 返回是否为第一次标记。
    pub fn mark_seen(&mut self, tutorial: Tutorial) -> bool {
        let flag = self.flag_mut(tutorial);
        let first_time = !*flag;
        *flag = true;
        first_time
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveStateError {
    #[error("save-state fetch timed out after {0} ms")]
    Timeout(u32),
    #[error("save-state unavailable: {0}")]
    Unavailable(String),
    #[error("malformed save-state: {0}")]
    Malformed(String),
}

/// SDK `gameInfo` 中与存档相关的部分。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SdkGameInfo {
    pub initial_game_state: Option<SdkInitialGameState>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SdkInitialGameState {
    pub game_state: Option<TutorialFlags>,
}

impl SdkGameInfo {
    pub fn from_json(json: &str) -> Result<Self, SaveStateError> {
        serde_json::from_str(json).map_err(|error| SaveStateError::Malformed(error.to_string()))
    }

    pub fn into_flags(self) -> Result<TutorialFlags, SaveStateError> {
        self.initial_game_state
            .and_then(|initial| initial.game_state)
            .ok_or_else(|| SaveStateError::Unavailable("gameInfo has no saved game state".into()))
    }
}

pub trait SaveStore {
    fn load(&self) -> Result<TutorialFlags, SaveStateError>;
    fn save(&mut self, flags: &TutorialFlags) -> Result<(), SaveStateError>;
}

/// 以 JSON 文本保存的内存存档。
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    saved: Option<String>,
}

impl MemoryStore {
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            saved: Some(raw.into()),
        }
    }
}

impl SaveStore for MemoryStore {
    fn load(&self) -> Result<TutorialFlags, SaveStateError> {
        let raw = self
            .saved
            .as_deref()
            .ok_or_else(|| SaveStateError::Unavailable("nothing saved yet".into()))?;
        serde_json::from_str(raw).map_err(|error| SaveStateError::Malformed(error.to_string()))
    }

    fn save(&mut self, flags: &TutorialFlags) -> Result<(), SaveStateError> {
        let raw = serde_json::to_string(flags)
            .map_err(|error| SaveStateError::Malformed(error.to_string()))?;
        self.saved = Some(raw);
        Ok(())
    }
}

pub fn flags_or_default(loaded: Result<TutorialFlags, SaveStateError>) -> TutorialFlags {
    loaded.unwrap_or_else(|error| {
        warn!(%error, "save-state fallback to default tutorial flags");
        TutorialFlags::default()
    })
}

pub fn load_or_default(store: &dyn SaveStore) -> TutorialFlags {
    flags_or_default(store.load())
}
