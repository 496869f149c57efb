use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    rng::RandomSource,
    rules::{BattleResult, BattleSetup},
    teams::{team_by_id, Team, DARK_CHAMPION_ID, TEAMS},
};

/// 下一场对战的对手。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Matchup {
    pub rival_team_id: String,
    #[serde(default)]
    pub is_dark_boss: bool,
}

/// 连续挑战中在战斗之间传递的状态。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressionState {
    pub selected_team_id: String,
    #[serde(default)]
    pub defeated_rival_ids: Vec<String>,
    #[serde(default)]
    pub cumulative_score: u32,
    #[serde(default)]
    pub is_dark_boss: bool,
}

impl ProgressionState {
    pub fn new(selected_team_id: impl Into<String>) -> Self {
        Self {
            selected_team_id: selected_team_id.into(),
            defeated_rival_ids: Vec::new(),
            cumulative_score: 0,
            is_dark_boss: false,
        }
    }

    pub fn selected_team(&self) -> Option<&'static Team> {
        team_by_id(&self.selected_team_id)
    }

    pub fn has_defeated(&self, team_id: &str) -> bool {
        self.defeated_rival_ids.iter().any(|id| id == team_id)
    }

    /// 尚未击败的普通对手，按名册顺序。
    pub fn available_rivals(&self) -> Vec<&'static Team> {
        TEAMS
            .iter()
            .filter(|team| !team.is_dark_champion())
            .filter(|team| team.id != self.selected_team_id)
            .filter(|team| !self.has_defeated(team.id))
            .collect()
    }

    fn dark_boss_reachable(&self) -> bool {
        self.selected_team_id != DARK_CHAMPION_ID
    }

    pub fn is_final_battle_next(&self) -> bool {
        self.available_rivals().is_empty() && self.dark_boss_reachable() && !self.is_complete()
    }

    pub fn is_complete(&self) -> bool {
        if self.dark_boss_reachable() {
            self.has_defeated(DARK_CHAMPION_ID)
        } else {
            self.available_rivals().is_empty()
        }
    }

    /// 在剩余对手中均匀抽取；普通对手打完后迎战 Dark Boss，全部完成后返回 `None`。
    pub fn next_matchup(&self, rng: &mut dyn RandomSource) -> Option<Matchup> {
        if self.is_complete() {
            return None;
        }
        let rivals = self.available_rivals();
        if rivals.is_empty() {
            return Some(Matchup {
                rival_team_id: DARK_CHAMPION_ID.to_string(),
                is_dark_boss: true,
            });
        }
        let team = rivals.get(rng.pick_index(rivals.len()))?;
        Some(Matchup {
            rival_team_id: team.id.to_string(),
            is_dark_boss: false,
        })
    }

    /// 进入某场对战：记录是否为 Dark Boss，并生成战斗配置。
    pub fn battle_setup(&mut self, matchup: &Matchup) -> BattleSetup {
        self.is_dark_boss = matchup.is_dark_boss;
        BattleSetup {
            player_team_id: self.selected_team_id.clone(),
            rival_team_id: matchup.rival_team_id.clone(),
            is_dark_boss: matchup.is_dark_boss,
            carried_score: self.cumulative_score,
        }
    }

    /// 按战斗结果生成下一份进度；总分以引擎结算值为准。
    pub fn record_result(&self, result: &BattleResult) -> ProgressionState {
        let mut next = self.clone();
        next.cumulative_score = result.settlement.total_score;
        next.is_dark_boss = false;
        if result.player_won() && !next.has_defeated(&result.rival_team_id) {
            next.defeated_rival_ids.push(result.rival_team_id.clone());
        }
        info!(
            rival = %result.rival_team_id,
            won = result.player_won(),
            defeated = next.defeated_rival_ids.len(),
            cumulative_score = next.cumulative_score,
            "progression updated"
        );
        next
    }
}
