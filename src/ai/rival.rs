use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::game::{ActionKind, Combatant, RandomSource};

/// 对手第几个回合被强制进化。
pub const RIVAL_FORCED_EVOLUTION_TURN: u32 = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RivalDecision {
    Evolve,
    Act { kind: ActionKind },
}

/// 对手的选招策略：过滤候选池后均匀随机。
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RivalAgent {
    dark_boss: bool,
}

impl RivalAgent {
    pub fn new(dark_boss: bool) -> Self {
        Self { dark_boss }
    }

    pub fn is_dark_boss(&self) -> bool {
        self.dark_boss
    }

    /// Dark Boss 从不防御，改为偷取；上一招是防御或偷取时两者都不可选。
    pub fn candidate_pool(&self, rival: &Combatant) -> Vec<ActionKind> {
        let mut pool = if self.dark_boss {
            vec![ActionKind::Attack, ActionKind::Steal]
        } else {
            vec![ActionKind::Attack, ActionKind::Defend]
        };
        if rival.is_evolved {
            pool.push(ActionKind::Special);
        }
        if rival.last_action.is_some_and(ActionKind::is_non_repeatable) {
            pool.retain(|kind| !kind.is_non_repeatable());
        }
        pool
    }

    /// `turn_counter` 为本回合在内的对手回合数。
    pub fn decide(
        &self,
        rival: &Combatant,
        turn_counter: u32,
        rng: &mut dyn RandomSource,
    ) -> RivalDecision {
        if turn_counter == RIVAL_FORCED_EVOLUTION_TURN && !rival.is_evolved {
            return RivalDecision::Evolve;
        }
        let pool = self.candidate_pool(rival);
        let index = rng.pick_index(pool.len());
        let kind = pool.get(index).copied().unwrap_or(ActionKind::Attack);
        debug!(?pool, ?kind, turn_counter, "rival picked action");
        RivalDecision::Act { kind }
    }
}
