pub mod ai;
pub mod game;
pub mod platform;
pub mod utils;

use gloo_timers::future::TimeoutFuture;
use serde_wasm_bindgen::{from_value, to_value};
use std::str::FromStr;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, JsFuture};
use web_sys::js_sys::{Array, Promise};

pub use ai::{RivalAgent, RivalDecision, RIVAL_FORCED_EVOLUTION_TURN};
pub use game::{
    lookup, resolution_for, selectable_teams, team_by_id, ActionKind, BattleEngine, BattleEnd,
    BattleEvent, BattleResolution, BattleResult, BattleScore, BattleSetup, BattleSnapshot,
    BattleState, Clock, Combatant, IntegrityError, ManualClock, Matchup, Outcome,
    PendingSkillCheck, ProgressionState, RandomSource, Rejection, Resolution, ScoreSettlement,
    ScoreTracker, ScriptedRandom, SeededRandom, Side, Team, TurnPhase, WallClock,
    DARK_CHAMPION_ID, TEAMS,
};
pub use platform::{
    flags_or_default, load_or_default, MemoryStore, SaveStateError, SaveStore, SdkGameInfo,
    Tutorial, TutorialFlags, SAVE_STATE_TIMEOUT_MS,
};
pub use utils::{console_log, init_logging, set_panic_hook};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

const TIMEOUT_MARKER: &str = "save-state-timeout";

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
    init_logging();
}

fn to_js_error(error: IntegrityError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn parse_action(kind: &str) -> Result<ActionKind, JsValue> {
    ActionKind::from_str(kind)
        .map_err(|_| JsValue::from_str(&format!("unknown action kind `{kind}`")))
}

fn parse_side(side: &str) -> Result<Side, JsValue> {
    Side::from_str(side).map_err(|_| JsValue::from_str(&format!("unknown side `{side}`")))
}

fn ensure_team(team_id: &str) -> Result<(), JsValue> {
    team_by_id(team_id)
        .map(|_| ())
        .ok_or_else(|| JsValue::from_str(&format!("unknown team `{team_id}`")))
}

fn make_rng(seed: Option<u32>) -> Box<dyn RandomSource> {
    match seed {
        Some(seed) => Box::new(SeededRandom::with_seed(u64::from(seed))),
        None => Box::new(SeededRandom::from_entropy()),
    }
}

fn make_resolution_json(
    engine: &BattleEngine,
    events: Vec<BattleEvent>,
) -> Result<String, JsValue> {
    serde_json::to_string(&engine.resolution(events)).map_err(serde_to_js_error)
}

/// 一场战斗的 JS 句柄。每个操作返回 `BattleResolution` 的 JSON：本次事件、快照与结果。
#[wasm_bindgen]
pub struct BattleHandle {
    engine: BattleEngine,
    progression: Option<ProgressionState>,
}

impl BattleHandle {
    fn from_setup(setup: BattleSetup, seed: Option<u32>) -> Result<BattleHandle, JsValue> {
        ensure_team(&setup.player_team_id)?;
        ensure_team(&setup.rival_team_id)?;
        Ok(BattleHandle {
            engine: BattleEngine::new(setup, make_rng(seed), Box::new(WallClock)),
            progression: None,
        })
    }
}

#[wasm_bindgen]
impl BattleHandle {
    #[wasm_bindgen(constructor)]
    pub fn new(setup_json: &str, seed: Option<u32>) -> Result<BattleHandle, JsValue> {
        let setup: BattleSetup = serde_json::from_str(setup_json).map_err(serde_to_js_error)?;
        Self::from_setup(setup, seed)
    }

    pub fn start(&mut self) -> Result<String, JsValue> {
        let events = self.engine.start();
        make_resolution_json(&self.engine, events)
    }

    pub fn request_action(&mut self, kind: &str) -> Result<String, JsValue> {
        let kind = parse_action(kind)?;
        let events = self.engine.request_action(kind);
        make_resolution_json(&self.engine, events)
    }

    pub fn submit_skill_check_result(
        &mut self,
        kind: &str,
        successes: u8,
    ) -> Result<String, JsValue> {
        let kind = parse_action(kind)?;
        let events = self.engine.submit_skill_check_result(kind, successes);
        make_resolution_json(&self.engine, events)
    }

    pub fn trigger_evolution(&mut self) -> Result<String, JsValue> {
        let events = self.engine.trigger_evolution();
        make_resolution_json(&self.engine, events)
    }

    pub fn abandon(&mut self) -> Result<String, JsValue> {
        let events = self.engine.abandon();
        make_resolution_json(&self.engine, events)
    }

    pub fn can_request(&self, kind: &str) -> bool {
        parse_action(kind)
            .map(|kind| self.engine.can_request(kind))
            .unwrap_or(false)
    }

    pub fn can_evolve(&self) -> bool {
        self.engine.can_evolve()
    }

    pub fn snapshot_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.engine.snapshot()).map_err(serde_to_js_error)
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.engine.state()).map_err(serde_to_js_error)
    }

    pub fn set_state_json(&mut self, json: &str) -> Result<(), JsValue> {
        let state: BattleState = serde_json::from_str(json).map_err(serde_to_js_error)?;
        self.engine.restore_state(state).map_err(to_js_error)
    }

    pub fn total_score(&self) -> u32 {
        self.engine.total_score()
    }

    pub fn result_json(&self) -> Result<Option<String>, JsValue> {
        self.engine
            .result()
            .map(|result| serde_json::to_string(result).map_err(serde_to_js_error))
            .transpose()
    }

    /// 把本场结果记入进度，返回新的 `ProgressionState` JSON。
    /// 未传入进度时使用开战时的进度。
    pub fn record_result_json(&self, progression_json: Option<String>) -> Result<String, JsValue> {
        let progression = match progression_json {
            Some(json) => serde_json::from_str(&json).map_err(serde_to_js_error)?,
            None => self
                .progression
                .clone()
                .ok_or_else(|| JsValue::from_str("no progression attached to this battle"))?,
        };
        let result = self
            .engine
            .result()
            .ok_or_else(|| JsValue::from_str("battle has not been decided"))?;
        let next: ProgressionState = progression.record_result(result);
        serde_json::to_string(&next).map_err(serde_to_js_error)
    }
}

/// 以给定队伍创建一场战斗；调用 `start()` 掷硬币开局。
#[wasm_bindgen(js_name = "startBattle")]
pub fn start_battle(
    player_team_id: String,
    rival_team_id: String,
    is_dark_boss: bool,
    carried_score: Option<u32>,
    seed: Option<u32>,
) -> Result<BattleHandle, JsValue> {
    let setup = BattleSetup::new(player_team_id, rival_team_id, is_dark_boss)
        .with_carried_score(carried_score.unwrap_or(0));
    BattleHandle::from_setup(setup, seed)
}

/// 按进度抽取下一位对手并创建战斗；连续挑战已完成时返回 `undefined`。
#[wasm_bindgen(js_name = "startNextBattle")]
pub fn start_next_battle(
    progression: JsValue,
    seed: Option<u32>,
) -> Result<Option<BattleHandle>, JsValue> {
    let mut progression: ProgressionState = from_value(progression).map_err(JsValue::from)?;
    let mut rng = make_rng(seed);
    let Some(matchup) = progression.next_matchup(rng.as_mut()) else {
        return Ok(None);
    };
    let setup = progression.battle_setup(&matchup);
    ensure_team(&setup.player_team_id)?;
    Ok(Some(BattleHandle {
        engine: BattleEngine::new(setup, rng, Box::new(WallClock)),
        progression: Some(progression),
    }))
}

#[wasm_bindgen(js_name = "nextMatchup")]
pub fn next_matchup(progression: JsValue, seed: Option<u32>) -> Result<JsValue, JsValue> {
    let progression: ProgressionState = from_value(progression).map_err(JsValue::from)?;
    let matchup = progression.next_matchup(make_rng(seed).as_mut());
    to_value(&matchup).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "availableRivals")]
pub fn available_rivals(progression: JsValue) -> Result<JsValue, JsValue> {
    let progression: ProgressionState = from_value(progression).map_err(JsValue::from)?;
    to_value(&progression.available_rivals()).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "listTeams")]
pub fn list_teams() -> Result<JsValue, JsValue> {
    to_value(&TEAMS).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "selectableTeams")]
pub fn selectable_team_list() -> Result<JsValue, JsValue> {
    let teams: Vec<&Team> = selectable_teams().collect();
    to_value(&teams).map_err(JsValue::from)
}

/// 查询结算表，供 UI 预览某个成功次数的效果。
#[wasm_bindgen(js_name = "outcomeFor")]
pub fn outcome_for(kind: &str, initiator: &str, successes: u8) -> Result<JsValue, JsValue> {
    let kind = parse_action(kind)?;
    let initiator = parse_side(initiator)?;
    let outcome = match resolution_for(kind, initiator) {
        Resolution::Fixed { outcome } => Some(outcome),
        Resolution::SkillCheck { .. } => lookup(kind, initiator, successes),
    };
    to_value(&outcome).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "tutorialFor")]
pub fn tutorial_for(kind: &str, initiator: &str) -> Result<JsValue, JsValue> {
    let tutorial = Tutorial::for_action(parse_action(kind)?, parse_side(initiator)?);
    to_value(&tutorial).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "markTutorialSeen")]
pub fn mark_tutorial_seen(flags: JsValue, tutorial: &str) -> Result<JsValue, JsValue> {
    let mut flags: TutorialFlags = if flags.is_undefined() || flags.is_null() {
        TutorialFlags::default()
    } else {
        from_value(flags).map_err(JsValue::from)?
    };
    let tutorial = Tutorial::from_str(tutorial)
        .map_err(|_| JsValue::from_str(&format!("unknown tutorial `{tutorial}`")))?;
    flags.mark_seen(tutorial);
    to_value(&flags).map_err(JsValue::from)
}

async fn fetch_tutorial_flags(
    game_info: Promise,
    timeout_ms: u32,
) -> Result<TutorialFlags, SaveStateError> {
    let deadline = future_to_promise(async move {
        TimeoutFuture::new(timeout_ms).await;
        Err(JsValue::from_str(TIMEOUT_MARKER))
    });
    let raced = Promise::race(&Array::of2(&game_info, &deadline));
    match JsFuture::from(raced).await {
        Ok(value) if value.is_undefined() || value.is_null() => {
            Err(SaveStateError::Unavailable("SDK returned no gameInfo".into()))
        }
        Ok(value) => {
            let info: SdkGameInfo = from_value(value)
                .map_err(|error| SaveStateError::Malformed(error.to_string()))?;
            info.into_flags()
        }
        Err(reason) if reason.as_string().as_deref() == Some(TIMEOUT_MARKER) => {
            Err(SaveStateError::Timeout(timeout_ms))
        }
        Err(reason) => Err(SaveStateError::Unavailable(format!("{reason:?}"))),
    }
}

/// 等待平台 SDK 的 `gameInfo`，超时或失败时返回默认标记，Promise 永不 reject。
#[wasm_bindgen(js_name = "loadTutorialFlags")]
pub fn load_tutorial_flags(game_info: Promise, timeout_ms: Option<u32>) -> Promise {
    let timeout_ms = timeout_ms.unwrap_or(SAVE_STATE_TIMEOUT_MS);
    future_to_promise(async move {
        let fetched = fetch_tutorial_flags(game_info, timeout_ms).await;
        if let Err(error) = &fetched {
            console_log(&format!("tutorial flags unavailable, using defaults: {error}"));
        }
        let flags = flags_or_default(fetched);
        to_value(&flags).map_err(JsValue::from)
    })
}
