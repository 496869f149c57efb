use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{
    clock::{Clock, WallClock},
    effects::{lookup, resolution_for, ActionKind, Outcome, Resolution},
    rng::{RandomSource, SeededRandom},
    score::{ScoreSettlement, ScoreTracker},
    state::{
        BattleEnd, BattleEvent, BattleState, Combatant, IntegrityError, PendingSkillCheck, Side,
        TurnPhase,
    },
};
use crate::ai::{RivalAgent, RivalDecision};

/// 开始一场战斗所需的配置。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BattleSetup {
    pub player_team_id: String,
    pub rival_team_id: String,
    #[serde(default)]
    pub is_dark_boss: bool,
    /// 进入本场前的累计总分。
    #[serde(default)]
    pub carried_score: u32,
}

impl BattleSetup {
    pub fn new(
        player_team_id: impl Into<String>,
        rival_team_id: impl Into<String>,
        is_dark_boss: bool,
    ) -> Self {
        Self {
            player_team_id: player_team_id.into(),
            rival_team_id: rival_team_id.into(),
            is_dark_boss,
            carried_score: 0,
        }
    }

    pub fn with_carried_score(mut self, carried_score: u32) -> Self {
        self.carried_score = carried_score;
        self
    }
}

/// 被忽略的请求及原因，只用于日志与 UI 判断，不会抛给调用方。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Rejection {
    AlreadyStarted,
    BattleInactive,
    NotPlayerTurn,
    AlreadyActed,
    SkillCheckInProgress,
    NoPendingSkillCheck,
    SkillCheckMismatch {
        expected: ActionKind,
        actual: ActionKind,
    },
    SpecialLocked,
    EvolutionNotReady,
    AlreadyEvolved,
}

/// 一场已分出胜负的战斗，交给进度层使用。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BattleResult {
    pub winner: Side,
    pub rival_team_id: String,
    pub was_dark_boss: bool,
    pub settlement: ScoreSettlement,
}

impl BattleResult {
    pub fn player_won(&self) -> bool {
        self.winner == Side::Player
    }
}

/// 表现层渲染所需的只读视图。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BattleSnapshot {
    pub phase: TurnPhase,
    pub acting_side: Side,
    pub player: Combatant,
    pub rival: Combatant,
    pub turn_counter: u32,
    pub has_acted_this_turn: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_check: Option<PendingSkillCheck>,
    pub is_dark_boss: bool,
    pub battle_active: bool,
    pub total_score: u32,
    pub evolution_available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BattleResolution {
    pub events: Vec<BattleEvent>,
    pub snapshot: BattleSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<BattleResult>,
}

/// 回合状态机。所有调用都是同步的，返回本次调用产生的事件。
pub struct BattleEngine {
    state: BattleState,
    rival: RivalAgent,
    score: ScoreTracker,
    rng: Box<dyn RandomSource>,
    clock: Box<dyn Clock>,
    result: Option<BattleResult>,
}

impl BattleEngine {
    pub fn new(setup: BattleSetup, rng: Box<dyn RandomSource>, clock: Box<dyn Clock>) -> Self {
        Self {
            state: BattleState::new(
                setup.player_team_id,
                setup.rival_team_id,
                setup.is_dark_boss,
            ),
            rival: RivalAgent::new(setup.is_dark_boss),
            score: ScoreTracker::new(setup.carried_score),
            rng,
            clock,
            result: None,
        }
    }

    pub fn with_defaults(setup: BattleSetup) -> Self {
        Self::new(
            setup,
            Box::new(SeededRandom::from_entropy()),
            Box::new(WallClock),
        )
    }

    pub fn with_seed(setup: BattleSetup, seed: u64) -> Self {
        Self::new(
            setup,
            Box::new(SeededRandom::with_seed(seed)),
            Box::new(WallClock),
        )
    }

    pub fn state(&self) -> &BattleState {
        &self.state
    }

    pub fn result(&self) -> Option<&BattleResult> {
        self.result.as_ref()
    }

    pub fn total_score(&self) -> u32 {
        self.score.total_score()
    }

    pub fn snapshot(&self) -> BattleSnapshot {
        BattleSnapshot {
            phase: self.state.phase(),
            acting_side: self.state.acting_side,
            player: self.state.player.clone(),
            rival: self.state.rival.clone(),
            turn_counter: self.state.turn_counter,
            has_acted_this_turn: self.state.has_acted_this_turn,
            pending_check: self.state.pending_check,
            is_dark_boss: self.state.is_dark_boss,
            battle_active: self.state.battle_active,
            total_score: self.score.total_score(),
            evolution_available: self.state.player.evolution_ready(),
        }
    }

    pub fn resolution(&self, events: Vec<BattleEvent>) -> BattleResolution {
        BattleResolution {
            events,
            snapshot: self.snapshot(),
            result: self.result.clone(),
        }
    }

    /// 用外部保存的状态替换当前战斗，先做完整性校验。
    pub fn restore_state(&mut self, state: BattleState) -> Result<(), IntegrityError> {
        state.integrity_check()?;
        self.rival = RivalAgent::new(state.is_dark_boss);
        self.state = state;
        Ok(())
    }

    fn ensure_not_started(state: &BattleState) -> Result<(), Rejection> {
        if state.phase() != TurnPhase::AwaitingCoinFlip {
            return Err(Rejection::AlreadyStarted);
        }
        Ok(())
    }

    fn ensure_active(state: &BattleState) -> Result<(), Rejection> {
        if !state.battle_active {
            return Err(Rejection::BattleInactive);
        }
        Ok(())
    }

    fn ensure_player_turn(state: &BattleState) -> Result<(), Rejection> {
        if state.acting_side != Side::Player {
            return Err(Rejection::NotPlayerTurn);
        }
        Ok(())
    }

    fn ensure_no_pending(state: &BattleState) -> Result<(), Rejection> {
        if state.pending_check.is_some() {
            return Err(Rejection::SkillCheckInProgress);
        }
        Ok(())
    }

    fn ensure_not_acted(state: &BattleState) -> Result<(), Rejection> {
        if state.has_acted_this_turn {
            return Err(Rejection::AlreadyActed);
        }
        Ok(())
    }

    pub fn check_request(&self, kind: ActionKind) -> Result<(), Rejection> {
        let state = &self.state;
        Self::ensure_active(state)?;
        Self::ensure_player_turn(state)?;
        Self::ensure_no_pending(state)?;
        Self::ensure_not_acted(state)?;
        if kind == ActionKind::Special && !state.player.is_evolved {
            return Err(Rejection::SpecialLocked);
        }
        Ok(())
    }

    pub fn check_evolution(&self) -> Result<(), Rejection> {
        let state = &self.state;
        Self::ensure_active(state)?;
        Self::ensure_player_turn(state)?;
        Self::ensure_not_acted(state)?;
        if state.player.is_evolved {
            return Err(Rejection::AlreadyEvolved);
        }
        if !state.player.evolution_ready() {
            return Err(Rejection::EvolutionNotReady);
        }
        Ok(())
    }

    pub fn can_request(&self, kind: ActionKind) -> bool {
        self.check_request(kind).is_ok()
    }

    pub fn can_evolve(&self) -> bool {
        self.check_evolution().is_ok()
    }

    /// 掷硬币决定先手并开始计时；对手先手时立即执行对手回合。
    pub fn start(&mut self) -> Vec<BattleEvent> {
        let mut events = Vec::new();
        if let Err(rejection) = Self::ensure_not_started(&self.state) {
            debug!(?rejection, "start ignored");
            return events;
        }

        let first = if self.rng.coin_flip() {
            Side::Player
        } else {
            Side::Rival
        };
        self.state.battle_active = true;
        self.state.acting_side = first;
        self.state.has_acted_this_turn = false;
        self.score.start_timer(self.clock.now_ms());
        info!(
            player = %self.state.player.team_id,
            rival = %self.state.rival.team_id,
            dark_boss = self.state.is_dark_boss,
            ?first,
            "battle started"
        );

        self.emit(BattleEvent::CoinFlipped { first }, &mut events);
        self.emit(BattleEvent::TurnChanged { side: first }, &mut events);
        if first == Side::Rival {
            self.run_rival_turn(&mut events);
        }
        events
    }

    /// 玩家选择行动，打开一次技能检定。
    pub fn request_action(&mut self, kind: ActionKind) -> Vec<BattleEvent> {
        let mut events = Vec::new();
        if let Err(rejection) = self.check_request(kind) {
            debug!(?rejection, ?kind, "action request ignored");
            return events;
        }

        let attempts = kind.attempt_budget();
        self.state.has_acted_this_turn = true;
        self.state.pending_check = Some(PendingSkillCheck {
            kind,
            initiator: Side::Player,
            attempts,
        });
        self.emit(
            BattleEvent::SkillCheckRequested {
                kind,
                initiator: Side::Player,
                attempts,
            },
            &mut events,
        );
        events
    }

    /// 提交技能检定结果（玩家行动或对玩家的防守），结算并推进回合。
    pub fn submit_skill_check_result(
        &mut self,
        kind: ActionKind,
        successes: u8,
    ) -> Vec<BattleEvent> {
        let mut events = Vec::new();
        let pending = match self.check_submission(kind) {
            Ok(pending) => pending,
            Err(rejection) => {
                debug!(?rejection, ?kind, successes, "skill-check result discarded");
                return events;
            }
        };

        self.state.pending_check = None;
        let successes = successes.min(pending.attempts);
        self.score.record_hits(successes);
        let Some(outcome) = lookup(pending.kind, pending.initiator, successes) else {
            warn!(?pending, "no outcome table for pending skill-check");
            self.switch_turn(&mut events);
            return events;
        };

        self.resolve(pending.initiator, outcome, Side::Player, &mut events);
        if !self.finish_if_knocked_out(&mut events) {
            self.switch_turn(&mut events);
        }
        events
    }

    fn check_submission(&self, kind: ActionKind) -> Result<PendingSkillCheck, Rejection> {
        Self::ensure_active(&self.state)?;
        let pending = self
            .state
            .pending_check
            .ok_or(Rejection::NoPendingSkillCheck)?;
        if pending.kind != kind {
            return Err(Rejection::SkillCheckMismatch {
                expected: pending.kind,
                actual: kind,
            });
        }
        Ok(pending)
    }

    /// 进化不消耗回合，也不切换行动方。
    pub fn trigger_evolution(&mut self) -> Vec<BattleEvent> {
        let mut events = Vec::new();
        if let Err(rejection) = self.check_evolution() {
            debug!(?rejection, "evolution ignored");
            return events;
        }
        self.state.player.evolve();
        self.emit(BattleEvent::EvolutionPerformed { side: Side::Player }, &mut events);
        events
    }

    /// 中途退出：之后到达的检定结果全部丢弃，不计分。
    pub fn abandon(&mut self) -> Vec<BattleEvent> {
        let mut events = Vec::new();
        if self.state.is_finished() {
            return events;
        }
        self.state.battle_active = false;
        self.state.pending_check = None;
        self.state.end = Some(BattleEnd::Abandoned);
        info!(turn = self.state.turn_counter, "battle abandoned");
        self.emit(BattleEvent::BattleAbandoned, &mut events);
        events
    }

    fn emit(&mut self, event: BattleEvent, events: &mut Vec<BattleEvent>) {
        self.state.record_event(event.clone());
        events.push(event);
    }

    fn emit_all(&mut self, batch: Vec<BattleEvent>, events: &mut Vec<BattleEvent>) {
        for event in batch {
            self.emit(event, events);
        }
    }

    /// 一次结算的全部效果先落地，再统一做终局判断。
    fn resolve(
        &mut self,
        initiator: Side,
        outcome: Outcome,
        energy_to: Side,
        events: &mut Vec<BattleEvent>,
    ) {
        let opponent = initiator.opponent();
        let applied = [
            self.state.apply_damage(opponent, outcome.opponent_damage),
            self.state.apply_damage(initiator, outcome.self_damage),
            self.state.apply_heal(initiator, outcome.self_heal),
            self.state.apply_shield_gain(initiator, outcome.shield_gain),
        ];
        self.emit_all(applied.into_iter().flatten().collect(), events);
        let energy = self.state.apply_energy(energy_to, outcome.energy);
        self.emit_all(energy, events);
    }

    fn finish_if_knocked_out(&mut self, events: &mut Vec<BattleEvent>) -> bool {
        match self.state.knocked_out_side() {
            Some(loser) => {
                self.finish(loser.opponent(), events);
                true
            }
            None => false,
        }
    }

    fn finish(&mut self, winner: Side, events: &mut Vec<BattleEvent>) {
        self.state.battle_active = false;
        self.state.pending_check = None;
        self.state.end = Some(BattleEnd::Decided { winner });

        let settlement = self.score.settle(
            self.clock.now_ms(),
            winner == Side::Player,
            self.state.is_dark_boss,
        );
        info!(
            ?winner,
            battle_score = settlement.battle.total,
            total_score = settlement.total_score,
            "battle ended"
        );
        self.result = Some(BattleResult {
            winner,
            rival_team_id: self.state.rival.team_id.clone(),
            was_dark_boss: self.state.is_dark_boss,
            settlement,
        });
        self.emit(
            BattleEvent::BattleEnded {
                winner,
                final_score: settlement.total_score,
                score: settlement,
            },
            events,
        );
    }

    fn switch_turn(&mut self, events: &mut Vec<BattleEvent>) {
        let next = self.state.acting_side.opponent();
        self.state.acting_side = next;
        self.state.has_acted_this_turn = false;
        self.emit(BattleEvent::TurnChanged { side: next }, events);
        if next == Side::Rival {
            self.run_rival_turn(events);
        }
    }

    fn run_rival_turn(&mut self, events: &mut Vec<BattleEvent>) {
        self.state.turn_counter += 1;
        let decision = self
            .rival
            .decide(&self.state.rival, self.state.turn_counter, self.rng.as_mut());

        let kind = match decision {
            RivalDecision::Evolve => {
                self.state.rival.evolve();
                self.emit(BattleEvent::EvolutionPerformed { side: Side::Rival }, events);
                self.switch_turn(events);
                return;
            }
            RivalDecision::Act { kind } => kind,
        };

        self.state.rival.last_action = Some(kind);
        self.state.has_acted_this_turn = true;
        self.emit(BattleEvent::RivalActionChosen { kind }, events);

        match resolution_for(kind, Side::Rival) {
            Resolution::Fixed { outcome } => {
                self.resolve(Side::Rival, outcome, Side::Rival, events);
                if !self.finish_if_knocked_out(events) {
                    self.switch_turn(events);
                }
            }
            Resolution::SkillCheck { attempts } => {
                self.state.pending_check = Some(PendingSkillCheck {
                    kind,
                    initiator: Side::Rival,
                    attempts,
                });
                self.emit(
                    BattleEvent::SkillCheckRequested {
                        kind,
                        initiator: Side::Rival,
                        attempts,
                    },
                    events,
                );
            }
        }
    }
}
