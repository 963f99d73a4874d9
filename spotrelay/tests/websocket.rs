use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use spotclient::{Credentials, SpotifyClient};
use spotrelay::{
    BroadcastEngine, PlayingState, PollScheduler, RelayContext, RelayInfo, RelayServerExt,
};
use spotserver::Server;
use tokio_tungstenite::connect_async;
use tokio_util::sync::CancellationToken;

const PLAYING: &str = r#"{
    "timestamp": 1700000000,
    "progress_ms": 30500,
    "is_playing": true,
    "currently_playing_type": "track",
    "item": {
        "id": "abc",
        "name": "Song",
        "album": {"name": "Album", "images": [{"url": "https://img/1", "height": 300, "width": 300}]},
        "artists": [{"name": "Artist", "genres": []}],
        "duration_ms": 180999,
        "external_urls": {"spotify": "https://open.spotify.com/track/abc"},
        "preview_url": null
    }
}"#;

async fn next_state<S>(ws: &mut S) -> PlayingState
where
    S: futures::Stream<
            Item = Result<tokio_tungstenite::tungstenite::Message, tokio_tungstenite::tungstenite::Error>,
        > + Unpin,
{
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("read error");
        if frame.is_text() {
            return serde_json::from_str(frame.to_text().unwrap()).unwrap();
        }
    }
}

#[tokio::test]
async fn websocket_clients_receive_greeting_then_updates() {
    let mut upstream = mockito::Server::new_async().await;
    let player = upstream
        .mock("GET", "/v1/me/player/currently-playing")
        .match_header("authorization", "Bearer seeded-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(PLAYING)
        .expect_at_least(1)
        .create_async()
        .await;

    let client = SpotifyClient::builder()
        .player_url(format!("{}/v1/me/player/currently-playing", upstream.url()))
        .access_token("seeded-token")
        .build(Credentials::new("id", "secret", "refresh"))
        .unwrap();

    let token = CancellationToken::new();
    let (ctx, rx) = RelayContext::new();
    let engine = BroadcastEngine::new(ctx.clone(), rx).spawn(token.clone());

    let mut server = Server::new("SpotSocket", 0);
    server.init_relay(ctx.clone()).await;
    server.start().await.unwrap();
    let port = server.local_addr().unwrap().port();

    let (mut ws, _) = connect_async(format!("ws://127.0.0.1:{}/ws", port))
        .await
        .unwrap();
    assert_eq!(next_state(&mut ws).await, PlayingState::initial());

    let info: RelayInfo = reqwest::get(format!("http://127.0.0.1:{}/info", port))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(info.name, "SpotSocket");
    assert_eq!(info.clients, 1);

    let scheduler = Arc::new(PollScheduler::new(
        ctx.clone(),
        Arc::new(client),
        Duration::from_secs(60),
    ))
    .spawn(token.clone());

    let update = next_state(&mut ws).await;
    assert!(update.is_playing);
    assert_eq!(update.total_time_in_seconds, 180);
    assert_eq!(update.progress_time_in_seconds, 30);
    assert_eq!(update.music.name, "Song");
    assert_eq!(update.music.artists, vec!["Artist"]);
    assert_eq!(update.music.preview_link, "");

    let state: PlayingState = reqwest::get(format!("http://127.0.0.1:{}/api/state", port))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(state, update);

    drop(ws);
    for _ in 0..100 {
        if ctx.registry().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(ctx.registry().is_empty());

    token.cancel();
    server.stop();
    server.wait().await;
    scheduler.await.unwrap();
    engine.await.unwrap();
    player.assert_async().await;
}
