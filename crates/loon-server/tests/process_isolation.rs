// crates/loon-server/tests/process_isolation.rs
#![cfg(unix)]

mod common;

use std::path::PathBuf;

use common::{create_game, start, test_config, Client};
use loon_server::Isolation;

#[tokio::test]
async fn game_runs_in_its_own_process() {
    let mut config = test_config(Isolation::Process);
    config.session_exe = Some(PathBuf::from(env!("CARGO_BIN_EXE_loon-server")));
    let server = start(config).await;

    let ids = create_game(server.admin, "isolated", 2).await.unwrap();
    assert_eq!(ids.len(), 2);

    let mut alice = Client::join(server.players, &ids[0]).await;

    let select = alice.expect().await;
    assert_eq!(select["type"], "select");
    assert_eq!(select["options"][2], "Gold");

    alice.answer("prov").await;

    let event = alice.expect().await;
    assert_eq!(event["event_type"], "CardDrafted");
    assert_eq!(event["values"]["card"]["name"], "Province");
    assert_eq!(event["values"]["card"]["cost"], 8);

    let mut bob = Client::join(server.players, &ids[1]).await;
    assert_eq!(bob.expect().await["first"], false);
    assert_eq!(bob.expect().await["type"], "select");
}

#[tokio::test]
async fn finished_process_game_forgets_its_ids() {
    let mut config = test_config(Isolation::Process);
    config.session_exe = Some(PathBuf::from(env!("CARGO_BIN_EXE_loon-server")));
    let server = start(config).await;

    let ids = create_game(server.admin, "short", 1).await.unwrap();
    let mut solo = Client::join(server.players, &ids[0]).await;
    assert_eq!(solo.expect().await["type"], "select");
    solo.answer("pass").await;

    assert_eq!(solo.expect().await["event_type"], "PlayerPassed");
    assert_eq!(solo.expect().await["event_type"], "GameOver");
    assert_eq!(solo.recv().await, None);

    // The process exit deregisters the game; its id becomes unknown.
    let mut refused = None;
    for _ in 0..100 {
        let mut late = Client::connect(server.players).await;
        late.send(serde_json::json!({"type": "connect", "id": ids[0]})).await;
        let reply = late.expect().await;
        if reply["result"] == "failed" {
            refused = Some(reply);
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    assert_eq!(refused.unwrap()["reason"], "invalid id");
}
