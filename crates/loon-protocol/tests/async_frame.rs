// crates/loon-protocol/tests/async_frame.rs
#![cfg(feature = "tokio")]

use loon_protocol::async_frame::{read_frame, write_frame};
use serde_json::json;
use tokio::io::AsyncReadExt;

#[tokio::test]
async fn frames_cross_a_duplex_pipe() {
    let (mut a, mut b) = tokio::io::duplex(64);

    write_frame(&mut a, &json!({"type": "connect", "id": "x"})).await.unwrap();
    write_frame(&mut a, &json!([1, 2, 3])).await.unwrap();

    assert_eq!(read_frame(&mut b).await.unwrap(), Some(json!({"type": "connect", "id": "x"})));
    assert_eq!(read_frame(&mut b).await.unwrap(), Some(json!([1, 2, 3])));
}

#[tokio::test]
async fn garbage_then_frame_then_eof() {
    let (mut a, mut b) = tokio::io::duplex(64);
    tokio::io::AsyncWriteExt::write_all(&mut a, b"}{oops\n\"ok\"\ntrailing")
        .await
        .unwrap();
    drop(a);

    assert_eq!(read_frame(&mut b).await.unwrap(), Some(json!("ok")));
    assert_eq!(read_frame(&mut b).await.unwrap(), None);
}

#[tokio::test]
async fn handshake_read_leaves_following_bytes() {
    let (mut a, mut b) = tokio::io::duplex(64);
    tokio::io::AsyncWriteExt::write_all(&mut a, b"{\"id\":1}\nnext")
        .await
        .unwrap();
    drop(a);

    read_frame(&mut b).await.unwrap();
    let mut rest = String::new();
    b.read_to_string(&mut rest).await.unwrap();

    assert_eq!(rest, "next");
}
