use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::str::FromStr;
use thiserror::Error;

use super::effects::ActionKind;
use super::score::ScoreSettlement;

/// 满血时的 HP 段数。
pub const MAX_HP_SEGMENTS: u8 = 10;
/// 进化能量上限，达到即可进化。
pub const MAX_ENERGY: u8 = 100;
/// Dark Boss 开局自带的护盾段数。
pub const DARK_BOSS_STARTING_SHIELD: u32 = 10;
/// 事件日志只保留最近的这么多条。
pub const EVENT_LOG_CAPACITY: usize = 128;

/// 对战双方。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Player,
    Rival,
}

impl Side {
    pub fn opponent(self) -> Self {
        match self {
            Side::Player => Side::Rival,
            Side::Rival => Side::Player,
        }
    }
}

impl FromStr for Side {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "player" => Ok(Side::Player),
            "rival" | "enemy" => Ok(Side::Rival),
            _ => Err(()),
        }
    }
}

/// 一次伤害结算的明细：护盾吸收量与实际扣除的 HP。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DamageReport {
    pub absorbed: u8,
    pub hp_lost: u8,
}

/// 一次能量增长的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnergyGain {
    pub gained: u8,
    pub total: u8,
    pub became_available: bool,
}

/// 战斗中的一方（玩家或对手）。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Combatant {
    pub team_id: String,
    pub hp_segments: u8,
    #[serde(default)]
    pub shield_segments: u32,
    #[serde(default)]
    pub is_evolved: bool,
    #[serde(default)]
    pub evolution_energy: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_action: Option<ActionKind>,
}

impl Combatant {
    pub fn new(team_id: impl Into<String>) -> Self {
        Self {
            team_id: team_id.into(),
            hp_segments: MAX_HP_SEGMENTS,
            shield_segments: 0,
            is_evolved: false,
            evolution_energy: 0,
            last_action: None,
        }
    }

    pub fn with_shield(mut self, shield_segments: u32) -> Self {
        self.shield_segments = shield_segments;
        self
    }

    pub fn is_knocked_out(&self) -> bool {
        self.hp_segments == 0
    }

    pub fn evolution_ready(&self) -> bool {
        !self.is_evolved && self.evolution_energy >= MAX_ENERGY
    }

    /// 护盾先于 HP 承受伤害，HP 最低为 0。
    pub fn take_damage(&mut self, amount: u8) -> DamageReport {
        let absorbed = u32::from(amount).min(self.shield_segments);
        self.shield_segments -= absorbed;
        let remaining = amount - absorbed as u8;
        let hp_lost = remaining.min(self.hp_segments);
        self.hp_segments -= hp_lost;
        DamageReport {
            absorbed: absorbed as u8,
            hp_lost,
        }
    }

    /// 返回实际恢复的段数。
    pub fn heal(&mut self, amount: u8) -> u8 {
        let healed = self
            .hp_segments
            .saturating_add(amount)
            .min(MAX_HP_SEGMENTS);
        let restored = healed - self.hp_segments;
        self.hp_segments = healed;
        restored
    }

    pub fn gain_shield(&mut self, amount: u8) {
        self.shield_segments = self.shield_segments.saturating_add(u32::from(amount));
    }

    /// 已进化后能量不再增长。
    pub fn gain_energy(&mut self, amount: u8) -> Option<EnergyGain> {
        if self.is_evolved || amount == 0 || self.evolution_energy >= MAX_ENERGY {
            return None;
        }
        let before = self.evolution_energy;
        self.evolution_energy = before.saturating_add(amount).min(MAX_ENERGY);
        Some(EnergyGain {
            gained: self.evolution_energy - before,
            total: self.evolution_energy,
            became_available: self.evolution_energy >= MAX_ENERGY,
        })
    }

    /// 幂等：重复进化不会产生效果。
    pub fn evolve(&mut self) -> bool {
        if self.is_evolved {
            return false;
        }
        self.is_evolved = true;
        true
    }
}

/// 回合状态机所处阶段。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TurnPhase {
    AwaitingCoinFlip,
    PlayerTurn,
    RivalTurn,
    BattleEnded,
}

/// 正在等待外部小游戏结果的技能检定。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingSkillCheck {
    pub kind: ActionKind,
    pub initiator: Side,
    pub attempts: u8,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum BattleEnd {
    Decided { winner: Side },
    Abandoned,
}

/// 引擎向表现层发出的事件流。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum BattleEvent {
    CoinFlipped {
        first: Side,
    },
    TurnChanged {
        side: Side,
    },
    SkillCheckRequested {
        kind: ActionKind,
        initiator: Side,
        attempts: u8,
    },
    RivalActionChosen {
        kind: ActionKind,
    },
    DamageApplied {
        target: Side,
        amount: u8,
        absorbed: u8,
        hp_lost: u8,
    },
    Healed {
        target: Side,
        amount: u8,
    },
    ShieldGained {
        target: Side,
        amount: u8,
    },
    EnergyGained {
        side: Side,
        amount: u8,
        total: u8,
    },
    EvolutionAvailable {
        side: Side,
    },
    EvolutionPerformed {
        side: Side,
    },
    BattleEnded {
        winner: Side,
        final_score: u32,
        score: ScoreSettlement,
    },
    BattleAbandoned,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum IntegrityError {
    #[error("{side:?} has {value} hp segments, above the maximum of 10")]
    HpOutOfRange { side: Side, value: u8 },
    #[error("{side:?} has {value} evolution energy, above the maximum of 100")]
    EnergyOutOfRange { side: Side, value: u8 },
    #[error("a skill-check is pending while the battle is inactive")]
    PendingCheckWhileInactive,
    #[error("battle is marked active after it ended")]
    ActiveAfterEnd,
    #[error("{initiator:?} skill-check is pending during the {acting_side:?} turn")]
    PendingCheckFromWrongSide { acting_side: Side, initiator: Side },
    #[error("rival turn has no pending skill-check to resolve")]
    RivalTurnStalled,
    #[error("player turn is used up but no skill-check is pending")]
    PlayerTurnStalled,
}

/// 一场战斗的完整状态。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BattleState {
    pub player: Combatant,
    pub rival: Combatant,
    pub acting_side: Side,
    #[serde(default)]
    pub turn_counter: u32,
    #[serde(default)]
    pub has_acted_this_turn: bool,
    #[serde(default)]
    pub is_dark_boss: bool,
    #[serde(default)]
    pub battle_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_check: Option<PendingSkillCheck>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<BattleEnd>,
    #[serde(default, skip_serializing_if = "VecDeque::is_empty")]
    pub event_log: VecDeque<BattleEvent>,
}

impl BattleState {
    pub fn new(
        player_team_id: impl Into<String>,
        rival_team_id: impl Into<String>,
        is_dark_boss: bool,
    ) -> Self {
        let rival_shield = if is_dark_boss {
            DARK_BOSS_STARTING_SHIELD
        } else {
            0
        };
        Self {
            player: Combatant::new(player_team_id),
            rival: Combatant::new(rival_team_id).with_shield(rival_shield),
            acting_side: Side::Player,
            turn_counter: 0,
            has_acted_this_turn: false,
            is_dark_boss,
            battle_active: false,
            pending_check: None,
            end: None,
            event_log: VecDeque::new(),
        }
    }

    pub fn phase(&self) -> TurnPhase {
        if self.end.is_some() {
            return TurnPhase::BattleEnded;
        }
        if !self.battle_active {
            return TurnPhase::AwaitingCoinFlip;
        }
        match self.acting_side {
            Side::Player => TurnPhase::PlayerTurn,
            Side::Rival => TurnPhase::RivalTurn,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.end.is_some()
    }

    pub fn winner(&self) -> Option<Side> {
        match self.end {
            Some(BattleEnd::Decided { winner }) => Some(winner),
            _ => None,
        }
    }

    pub fn combatant(&self, side: Side) -> &Combatant {
        match side {
            Side::Player => &self.player,
            Side::Rival => &self.rival,
        }
    }

    pub fn combatant_mut(&mut self, side: Side) -> &mut Combatant {
        match side {
            Side::Player => &mut self.player,
            Side::Rival => &mut self.rival,
        }
    }

    pub fn record_event(&mut self, event: BattleEvent) {
        if self.event_log.len() == EVENT_LOG_CAPACITY {
            self.event_log.pop_front();
        }
        self.event_log.push_back(event);
    }

    pub fn apply_damage(&mut self, target: Side, amount: u8) -> Option<BattleEvent> {
        if !self.battle_active || amount == 0 {
            return None;
        }
        let report = self.combatant_mut(target).take_damage(amount);
        Some(BattleEvent::DamageApplied {
            target,
            amount,
            absorbed: report.absorbed,
            hp_lost: report.hp_lost,
        })
    }

    pub fn apply_heal(&mut self, target: Side, amount: u8) -> Option<BattleEvent> {
        if !self.battle_active || amount == 0 {
            return None;
        }
        let restored = self.combatant_mut(target).heal(amount);
        if restored == 0 {
            return None;
        }
        Some(BattleEvent::Healed {
            target,
            amount: restored,
        })
    }

    pub fn apply_shield_gain(&mut self, target: Side, amount: u8) -> Option<BattleEvent> {
        if !self.battle_active || amount == 0 {
            return None;
        }
        self.combatant_mut(target).gain_shield(amount);
        Some(BattleEvent::ShieldGained { target, amount })
    }

    pub fn apply_energy(&mut self, side: Side, amount: u8) -> Vec<BattleEvent> {
        let mut events = Vec::new();
        if !self.battle_active {
            return events;
        }
        if let Some(gain) = self.combatant_mut(side).gain_energy(amount) {
            events.push(BattleEvent::EnergyGained {
                side,
                amount: gain.gained,
                total: gain.total,
            });
            if gain.became_available {
                events.push(BattleEvent::EvolutionAvailable { side });
            }
        }
        events
    }

    /// 同时倒下时判玩家落败。
    pub fn knocked_out_side(&self) -> Option<Side> {
        if self.player.is_knocked_out() {
            Some(Side::Player)
        } else if self.rival.is_knocked_out() {
            Some(Side::Rival)
        } else {
            None
        }
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        for side in [Side::Player, Side::Rival] {
            let combatant = self.combatant(side);
            if combatant.hp_segments > MAX_HP_SEGMENTS {
                return Err(IntegrityError::HpOutOfRange {
                    side,
                    value: combatant.hp_segments,
                });
            }
            if combatant.evolution_energy > MAX_ENERGY {
                return Err(IntegrityError::EnergyOutOfRange {
                    side,
                    value: combatant.evolution_energy,
                });
            }
        }
        if self.pending_check.is_some() && !self.battle_active {
            return Err(IntegrityError::PendingCheckWhileInactive);
        }
        if self.battle_active && self.end.is_some() {
            return Err(IntegrityError::ActiveAfterEnd);
        }
        if self.battle_active {
            self.check_turn_progress()?;
        }
        Ok(())
    }

    /// 对手回合只会停在等待玩家防守的检定上；玩家用过行动后必然有待提交的检定。
    fn check_turn_progress(&self) -> Result<(), IntegrityError> {
        match (self.acting_side, self.pending_check) {
            (acting_side, Some(pending)) if pending.initiator != acting_side => {
                Err(IntegrityError::PendingCheckFromWrongSide {
                    acting_side,
                    initiator: pending.initiator,
                })
            }
            (Side::Rival, None) => Err(IntegrityError::RivalTurnStalled),
            (Side::Player, None) if self.has_acted_this_turn => {
                Err(IntegrityError::PlayerTurnStalled)
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn active_state() -> BattleState {
        let mut state = BattleState::new("team-avax", "team-wolves", false);
        state.battle_active = true;
        state
    }

    #[test]
    fn damage_within_shield_leaves_hp_untouched() {
        let mut fighter = Combatant::new("team-g3").with_shield(3);
        let report = fighter.take_damage(2);
        assert_eq!(report, DamageReport { absorbed: 2, hp_lost: 0 });
        assert_eq!(fighter.shield_segments, 1);
        assert_eq!(fighter.hp_segments, MAX_HP_SEGMENTS);
    }

    #[test]
    fn damage_overflowing_shield_reaches_hp() {
        let mut fighter = Combatant::new("team-g3").with_shield(1);
        let report = fighter.take_damage(2);
        assert_eq!(report, DamageReport { absorbed: 1, hp_lost: 1 });
        assert_eq!(fighter.shield_segments, 0);
        assert_eq!(fighter.hp_segments, 9);
    }

    #[test]
    fn heal_at_full_hp_is_noop() {
        let mut state = active_state();
        assert!(state.apply_heal(Side::Player, 3).is_none());
        assert_eq!(state.player.hp_segments, MAX_HP_SEGMENTS);
    }

    #[test]
    fn heal_is_clamped_to_max() {
        let mut fighter = Combatant::new("team-opensea");
        fighter.take_damage(1);
        assert_eq!(fighter.heal(3), 1);
        assert_eq!(fighter.hp_segments, MAX_HP_SEGMENTS);
    }

    #[test]
    fn energy_crossing_cap_raises_availability_once() {
        let mut state = active_state();
        state.player.evolution_energy = 80;
        let events = state.apply_energy(Side::Player, 35);
        assert_eq!(
            events,
            vec![
                BattleEvent::EnergyGained {
                    side: Side::Player,
                    amount: 20,
                    total: MAX_ENERGY
                },
                BattleEvent::EvolutionAvailable { side: Side::Player },
            ]
        );
        assert!(state.apply_energy(Side::Player, 25).is_empty());
    }

    #[test]
    fn evolved_combatant_gains_no_energy() {
        let mut fighter = Combatant::new("team-solana");
        assert!(fighter.evolve());
        assert!(!fighter.evolve());
        assert!(fighter.gain_energy(40).is_none());
        assert_eq!(fighter.evolution_energy, 0);
    }

    #[test]
    fn effects_are_ignored_while_inactive() {
        let mut state = BattleState::new("team-avax", "team-wolves", false);
        assert!(state.apply_damage(Side::Rival, 4).is_none());
        assert!(state.apply_shield_gain(Side::Player, 2).is_none());
        assert!(state.apply_energy(Side::Player, 35).is_empty());
        assert_eq!(state.rival.hp_segments, MAX_HP_SEGMENTS);
    }

    #[test]
    fn dark_boss_starts_with_full_shield() {
        let state = BattleState::new("team-avax", "team-remix", true);
        assert_eq!(state.rival.shield_segments, DARK_BOSS_STARTING_SHIELD);
        assert_eq!(state.player.shield_segments, 0);
        assert_eq!(state.phase(), TurnPhase::AwaitingCoinFlip);
    }

    #[test]
    fn integrity_rejects_overfull_hp() {
        let mut state = active_state();
        state.rival.hp_segments = 12;
        assert_eq!(
            state.integrity_check(),
            Err(IntegrityError::HpOutOfRange {
                side: Side::Rival,
                value: 12
            })
        );
    }

    #[test]
    fn integrity_rejects_stalled_rival_turn() {
        let mut state = active_state();
        state.acting_side = Side::Rival;
        assert_eq!(state.integrity_check(), Err(IntegrityError::RivalTurnStalled));

        state.pending_check = Some(PendingSkillCheck {
            kind: ActionKind::Attack,
            initiator: Side::Rival,
            attempts: 3,
        });
        state.has_acted_this_turn = true;
        assert_eq!(state.integrity_check(), Ok(()));
    }

    #[test]
    fn integrity_rejects_pending_check_from_other_side() {
        let mut state = active_state();
        state.acting_side = Side::Rival;
        state.pending_check = Some(PendingSkillCheck {
            kind: ActionKind::Steal,
            initiator: Side::Player,
            attempts: 3,
        });
        assert_eq!(
            state.integrity_check(),
            Err(IntegrityError::PendingCheckFromWrongSide {
                acting_side: Side::Rival,
                initiator: Side::Player
            })
        );
    }

    #[test]
    fn integrity_rejects_used_player_turn_without_check() {
        let mut state = active_state();
        state.has_acted_this_turn = true;
        assert_eq!(state.integrity_check(), Err(IntegrityError::PlayerTurnStalled));
    }

    #[test]
    fn turn_rules_are_not_checked_before_the_coin_flip() {
        let mut state = BattleState::new("team-avax", "team-wolves", false);
        state.acting_side = Side::Rival;
        assert_eq!(state.integrity_check(), Ok(()));
    }

    #[test]
    fn event_log_keeps_only_recent_events() {
        let mut state = active_state();
        let shield = |amount: usize| BattleEvent::ShieldGained {
            target: Side::Rival,
            amount: amount as u8,
        };
        for amount in 0..EVENT_LOG_CAPACITY + 10 {
            state.record_event(shield(amount));
        }
        assert_eq!(state.event_log.len(), EVENT_LOG_CAPACITY);
        assert_eq!(state.event_log.front(), Some(&shield(10)));
        assert_eq!(state.event_log.back(), Some(&shield(EVENT_LOG_CAPACITY + 9)));
    }

    #[test]
    fn simultaneous_knockout_counts_against_player() {
        let mut state = active_state();
        state.player.hp_segments = 0;
        state.rival.hp_segments = 0;
        assert_eq!(state.knocked_out_side(), Some(Side::Player));
    }

    #[derive(Debug, Clone)]
    enum Effect {
        Damage(u8),
        Heal(u8),
        Shield(u8),
    }

    fn effect_strategy() -> impl Strategy<Value = Effect> {
        prop_oneof![
            (0u8..=6).prop_map(Effect::Damage),
            (0u8..=4).prop_map(Effect::Heal),
            (0u8..=3).prop_map(Effect::Shield),
        ]
    }

    proptest! {
        #[test]
        fn hp_stays_within_bounds(effects in prop::collection::vec(effect_strategy(), 0..64)) {
            let mut fighter = Combatant::new("team-arbitrum");
            for effect in effects {
                match effect {
                    Effect::Damage(amount) => { fighter.take_damage(amount); }
                    Effect::Heal(amount) => { fighter.heal(amount); }
                    Effect::Shield(amount) => fighter.gain_shield(amount),
                }
                prop_assert!(fighter.hp_segments <= MAX_HP_SEGMENTS);
            }
        }

        #[test]
        fn shield_absorbs_before_hp(shield in 0u32..12, hp in 0u8..=10, amount in 0u8..=12) {
            let mut fighter = Combatant::new("team-yieldguild").with_shield(shield);
            fighter.hp_segments = hp;
            fighter.take_damage(amount);
            if u32::from(amount) <= shield {
                prop_assert_eq!(fighter.shield_segments, shield - u32::from(amount));
                prop_assert_eq!(fighter.hp_segments, hp);
            } else {
                let overflow = amount - shield as u8;
                prop_assert_eq!(fighter.shield_segments, 0);
                prop_assert_eq!(fighter.hp_segments, hp.saturating_sub(overflow));
            }
        }
    }
}
