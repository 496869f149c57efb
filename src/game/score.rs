use serde::{Deserialize, Serialize};

pub const BASE_POINTS: u32 = 500;
pub const POINTS_PER_HIT: u32 = 40;
pub const TIME_BONUS_START: f64 = 600.0;
pub const TIME_BONUS_DECAY_PER_SECOND: f64 = 8.0;
pub const TIME_BONUS_FLOOR: u32 = 100;
pub const VICTORY_BONUS: u32 = 200;
pub const FINAL_BOSS_BONUS: u32 = 1000;

/// 单场战斗的得分明细。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BattleScore {
    pub base: u32,
    pub accuracy: u32,
    pub time: u32,
    pub total: u32,
    pub duration_seconds: f64,
}

impl BattleScore {
    pub fn compute(successful_hits: u32, duration_seconds: f64) -> Self {
        let accuracy = successful_hits.saturating_mul(POINTS_PER_HIT);
        let decayed =
            round_half_up(TIME_BONUS_START - duration_seconds * TIME_BONUS_DECAY_PER_SECOND);
        let time = decayed.max(f64::from(TIME_BONUS_FLOOR)) as u32;
        Self {
            base: BASE_POINTS,
            accuracy,
            time,
            total: BASE_POINTS + accuracy + time,
            duration_seconds,
        }
    }
}

/// 战斗结束时的结算：本场得分、奖励以及新的累计总分。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoreSettlement {
    pub battle: BattleScore,
    pub victory_bonus: u32,
    pub final_bonus: u32,
    pub previous_total: u32,
    pub total_score: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreTracker {
    successful_hits: u32,
    started_at_ms: Option<f64>,
    total_score: u32,
}

impl ScoreTracker {
    pub fn new(carried_score: u32) -> Self {
        Self {
            successful_hits: 0,
            started_at_ms: None,
            total_score: carried_score,
        }
    }

    pub fn start_timer(&mut self, now_ms: f64) {
        self.started_at_ms = Some(now_ms);
    }

    pub fn record_hits(&mut self, successes: u8) {
        self.successful_hits = self.successful_hits.saturating_add(u32::from(successes));
    }

    pub fn successful_hits(&self) -> u32 {
        self.successful_hits
    }

    pub fn total_score(&self) -> u32 {
        self.total_score
    }

    pub fn elapsed_seconds(&self, now_ms: f64) -> f64 {
        self.started_at_ms
            .map(|started| ((now_ms - started) / 1000.0).max(0.0))
            .unwrap_or(0.0)
    }

    /// 胜负都计入本场得分；胜利额外 +200，击败最终 Boss 再 +1000。
    pub fn settle(
        &mut self,
        now_ms: f64,
        player_won: bool,
        defeated_final_boss: bool,
    ) -> ScoreSettlement {
        let battle = BattleScore::compute(self.successful_hits, self.elapsed_seconds(now_ms));
        let victory_bonus = if player_won { VICTORY_BONUS } else { 0 };
        let final_bonus = if player_won && defeated_final_boss {
            FINAL_BOSS_BONUS
        } else {
            0
        };
        let previous_total = self.total_score;
        self.total_score = previous_total
            .saturating_add(battle.total)
            .saturating_add(victory_bonus)
            .saturating_add(final_bonus);
        ScoreSettlement {
            battle,
            victory_bonus,
            final_bonus,
            previous_total,
            total_score: self.total_score,
        }
    }
}

fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quick_accurate_battle() {
        let score = BattleScore::compute(12, 30.0);
        assert_eq!(score.accuracy, 480);
        assert_eq!(score.time, 360);
        assert_eq!(score.total, 500 + 480 + 360);
    }

    #[test]
    fn time_bonus_has_a_floor() {
        let score = BattleScore::compute(0, 600.0);
        assert_eq!(score.time, TIME_BONUS_FLOOR);
        assert_eq!(score.total, BASE_POINTS + TIME_BONUS_FLOOR);
    }

    #[test]
    fn time_bonus_rounds_half_up() {
        // 600 - 0.0625 * 8 = 599.5
        assert_eq!(BattleScore::compute(0, 0.0625).time, 600);
    }

    #[test]
    fn settlement_accumulates_and_applies_bonuses() {
        let mut tracker = ScoreTracker::new(1_000);
        tracker.start_timer(10_000.0);
        tracker.record_hits(3);
        tracker.record_hits(2);
        let settlement = tracker.settle(20_000.0, true, false);
        assert_eq!(settlement.battle.accuracy, 200);
        assert_eq!(settlement.battle.time, 520);
        assert_eq!(settlement.victory_bonus, VICTORY_BONUS);
        assert_eq!(settlement.final_bonus, 0);
        assert_eq!(settlement.previous_total, 1_000);
        assert_eq!(settlement.total_score, 1_000 + 500 + 200 + 520 + 200);
        assert_eq!(tracker.total_score(), settlement.total_score);
    }

    #[test]
    fn defeat_earns_battle_points_only() {
        let mut tracker = ScoreTracker::new(0);
        tracker.start_timer(0.0);
        let settlement = tracker.settle(0.0, false, true);
        assert_eq!(settlement.victory_bonus, 0);
        assert_eq!(settlement.final_bonus, 0);
        assert_eq!(settlement.total_score, BASE_POINTS + 600);
    }

    #[test]
    fn untimed_battle_counts_zero_seconds() {
        let tracker = ScoreTracker::new(0);
        assert_eq!(tracker.elapsed_seconds(5_000.0), 0.0);
    }
}
