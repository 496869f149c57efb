//! 战斗核心：状态、结算表、回合状态机、计分与连续挑战进度。

pub mod clock;
pub mod effects;
pub mod progression;
pub mod rng;
pub mod rules;
pub mod score;
pub mod state;
pub mod teams;

pub use clock::{Clock, ManualClock, WallClock};
pub use effects::{
    lookup, outcome_table, resolution_for, ActionKind, Outcome, Resolution, RIVAL_DEFEND,
    RIVAL_DEFEND_SHIELD,
};
pub use progression::{Matchup, ProgressionState};
pub use rng::{RandomSource, ScriptedRandom, SeededRandom};
pub use rules::{
    BattleEngine, BattleResolution, BattleResult, BattleSetup, BattleSnapshot, Rejection,
};
pub use score::{BattleScore, ScoreSettlement, ScoreTracker};
pub use state::{
    BattleEnd, BattleEvent, BattleState, Combatant, IntegrityError, PendingSkillCheck, Side,
    TurnPhase, DARK_BOSS_STARTING_SHIELD, EVENT_LOG_CAPACITY, MAX_ENERGY, MAX_HP_SEGMENTS,
};
pub use teams::{selectable_teams, team_by_id, Team, DARK_CHAMPION_ID, TEAMS};
