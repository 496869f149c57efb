#![cfg(target_arch = "wasm32")]

use monster_battler::{
    init_logging, list_teams, load_tutorial_flags, mark_tutorial_seen, outcome_for, start_battle,
    BattleResolution, Outcome, TutorialFlags, TEAMS,
};
use serde_wasm_bindgen::from_value;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;
use web_sys::js_sys::Promise;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn battle_handle_round_trip() {
    let mut handle = start_battle("team-avax".into(), "team-wolves".into(), false, None, Some(7))
        .expect("known teams");
    let started: BattleResolution =
        serde_json::from_str(&handle.start().expect("start")).expect("resolution json");
    assert!(started.snapshot.battle_active);
    assert!(started.events.len() >= 2);
    assert!(handle.snapshot_json().expect("snapshot").contains("\"phase\""));
}

#[wasm_bindgen_test]
fn console_logging_installs_once() {
    init_logging();
    init_logging();
    let mut handle = start_battle("team-g3".into(), "team-solana".into(), false, None, Some(3))
        .expect("known teams");
    assert!(handle.start().is_ok());
}

#[wasm_bindgen_test]
fn unknown_team_is_rejected() {
    assert!(start_battle("team-avax".into(), "team-nobody".into(), false, None, None).is_err());
}

#[wasm_bindgen_test]
fn outcome_preview_and_roster() {
    let outcome: Option<Outcome> =
        from_value(outcome_for("attack", "player", 3).expect("outcome")).expect("outcome value");
    assert_eq!(outcome, Some(Outcome::new(2, 0, 0, 0, 35)));

    let teams: Vec<serde_json::Value> =
        from_value(list_teams().expect("teams")).expect("team list");
    assert_eq!(teams.len(), TEAMS.len());
}

#[wasm_bindgen_test]
fn mark_tutorial_from_empty_flags() {
    let flags: TutorialFlags =
        from_value(mark_tutorial_seen(JsValue::UNDEFINED, "smash").expect("mark")).expect("flags");
    assert!(flags.has_seen_smash_tutorial);
}

#[wasm_bindgen_test]
async fn tutorial_flags_fall_back_on_timeout() {
    let never = Promise::new(&mut |_, _| {});
    let loaded = JsFuture::from(load_tutorial_flags(never, Some(10)))
        .await
        .expect("load never rejects");
    let flags: TutorialFlags = from_value(loaded).expect("flags");
    assert_eq!(flags, TutorialFlags::default());
}

#[wasm_bindgen_test]
async fn tutorial_flags_from_sdk_game_info() {
    let info = web_sys::js_sys::JSON::parse(
        r#"{"initialGameState":{"gameState":{"hasSeenStealTutorial":true}}}"#,
    )
    .expect("json");
    let loaded = JsFuture::from(load_tutorial_flags(Promise::resolve(&info), None))
        .await
        .expect("load never rejects");
    let flags: TutorialFlags = from_value(loaded).expect("flags");
    assert!(flags.has_seen_steal_tutorial);
}
