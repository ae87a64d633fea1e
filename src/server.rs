//! HTTP endpoints: health check, one responder route per bot name.

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, future::Future, net::SocketAddr, sync::Arc};
use tracing::{info, warn};

use crate::{
    event::Event,
    responder::Responder,
    signer::{verify_event, Signer},
};

#[derive(Clone)]
struct HttpState {
    responder: Responder,
    bots: Arc<HashMap<String, Signer>>,
    verify_sig: bool,
}

/// Response body for the `/healthz` endpoint.
#[derive(Serialize, Deserialize)]
struct Health {
    /// Always "ok" when the server is running.
    status: String,
}

/// Body of every 4xx answer.
#[derive(Serialize, Deserialize)]
struct ErrorBody {
    error: String,
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Router exposing `/healthz` and `/{bot}` for every configured bot.
pub fn router(
    responder: Responder,
    bots: HashMap<String, Signer>,
    verify_sig: bool,
) -> Router {
    let state = Arc::new(HttpState {
        responder,
        bots: Arc::new(bots),
        verify_sig,
    });
    Router::new()
        .route("/healthz", get(healthz))
        .route("/:bot", get(quiz).post(respond))
        .with_state(state)
}

/// Start the HTTP server and run until `shutdown` resolves.
pub async fn serve_http(
    addr: SocketAddr,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "http listening");
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Health check endpoint.
async fn healthz() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
    })
}

/// Map responder output onto a status: one event is sent bare, several as an
/// array, none as 204.
fn events_response(result: crate::error::Result<Option<Vec<Event>>>) -> Response {
    match result {
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Ok(Some(mut events)) if events.len() == 1 => Json(events.remove(0)).into_response(),
        Ok(Some(events)) if events.is_empty() => StatusCode::NO_CONTENT.into_response(),
        Ok(Some(events)) => Json(events).into_response(),
        Err(e) => {
            warn!("responder failed: {e}");
            error(StatusCode::BAD_REQUEST, e.to_string())
        }
    }
}

/// Answer the posted event as the bot named in the path.
async fn respond(
    State(state): State<Arc<HttpState>>,
    Path(bot): Path<String>,
    body: String,
) -> Response {
    let Some(signer) = state.bots.get(&bot) else {
        return error(StatusCode::NOT_FOUND, format!("unknown bot: {bot}"));
    };
    let event: Event = match serde_json::from_str(&body) {
        Ok(ev) => ev,
        Err(e) => return error(StatusCode::BAD_REQUEST, format!("invalid event: {e}")),
    };
    if state.verify_sig {
        if let Err(e) = verify_event(&event) {
            return error(StatusCode::BAD_REQUEST, format!("invalid event: {e}"));
        }
    }
    let response = events_response(state.responder.respond(Some(&event), signer).await);
    info!(bot = %bot, id = %event.id, status = %response.status(), "POST");
    response
}

/// Post a new quiz as the bot named in the path.
async fn quiz(State(state): State<Arc<HttpState>>, Path(bot): Path<String>) -> Response {
    let Some(signer) = state.bots.get(&bot) else {
        return error(StatusCode::NOT_FOUND, format!("unknown bot: {bot}"));
    };
    let response = events_response(state.responder.respond(None, signer).await);
    info!(bot = %bot, status = %response.status(), "GET");
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        event::{Draft, Tag},
        persona::PersonaTable,
        quiz::{QuizCorpus, QuizEngine},
        relay::WsRelayClient,
        responder::Context,
    };
    use reqwest::StatusCode as HttpStatus;
    use std::time::Duration;
    use tokio::task;

    const CHANNEL: &str = "c8d5c2709a5670d6f621ac8020ac3e4fc3057a4961a15319f7c0818309407723";

    fn bot() -> Signer {
        Signer::from_hex(&"01".repeat(32)).unwrap()
    }

    fn user() -> Signer {
        Signer::from_hex(&"02".repeat(32)).unwrap()
    }

    fn signed_note(content: &str) -> Event {
        user()
            .sign(&Draft {
                content: content.into(),
                kind: 1,
                tags: vec![],
                created_at: 1_700_000_000,
            })
            .unwrap()
    }

    /// Serve the app on an ephemeral port; the bot answers as `testbot`.
    async fn spawn_app(verify_sig: bool) -> (String, task::JoinHandle<()>) {
        let relay = WsRelayClient::new("ws://127.0.0.1:9", Duration::from_millis(200), None);
        let mut ctx = Context::new(
            QuizEngine::new(QuizCorpus::default(), CHANNEL),
            Arc::new(relay),
        );
        ctx.personas = PersonaTable::new([(
            bot().public_key(),
            crate::persona::Profile::player("testbot", "テスト"),
        )]);
        let bots = HashMap::from([("testbot".to_string(), bot())]);
        let app = router(Responder::new(Arc::new(ctx)), bots, verify_sig);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = axum::serve(listener, app.into_make_service());
        let handle = task::spawn(async move {
            server.await.unwrap();
        });
        (format!("http://{addr}"), handle)
    }

    async fn post(url: &str, body: String) -> reqwest::Response {
        reqwest::Client::new()
            .post(url)
            .body(body)
            .send()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let (base, handle) = spawn_app(true).await;
        let resp = reqwest::get(format!("{base}/healthz")).await.unwrap();
        let body: super::Health = resp.json().await.unwrap();
        assert_eq!(body.status, "ok");
        handle.abort();
    }

    #[tokio::test]
    async fn single_reply_is_an_object() {
        let (base, handle) = spawn_app(true).await;
        let ev = signed_note("shanten 123456789m11222p");
        let resp = post(
            &format!("{base}/testbot"),
            serde_json::to_string(&ev).unwrap(),
        )
        .await;
        assert_eq!(resp.status(), HttpStatus::OK);
        let reply: Event = resp.json().await.unwrap();
        assert!(reply.content.ends_with("和了"));
        assert_eq!(reply.pubkey, bot().public_key());
        assert!(reply
            .tags
            .contains(&Tag::new(["p", user().public_key(), ""])));
        handle.abort();
    }

    #[tokio::test]
    async fn persona_reply_is_an_array() {
        let (base, handle) = spawn_app(true).await;
        let ev = signed_note(r"\s[0]");
        let resp = post(
            &format!("{base}/testbot"),
            serde_json::to_string(&ev).unwrap(),
        )
        .await;
        assert_eq!(resp.status(), HttpStatus::OK);
        let events: Vec<Event> = resp.json().await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, 0);
        handle.abort();
    }

    #[tokio::test]
    async fn nothing_to_say_is_no_content() {
        let (base, handle) = spawn_app(true).await;
        let ev = signed_note("good morning");
        let resp = post(
            &format!("{base}/testbot"),
            serde_json::to_string(&ev).unwrap(),
        )
        .await;
        assert_eq!(resp.status(), HttpStatus::NO_CONTENT);
        handle.abort();
    }

    #[tokio::test]
    async fn bad_input_is_rejected() {
        let (base, handle) = spawn_app(true).await;
        let url = format!("{base}/testbot");

        let resp = post(&url, "{not json".into()).await;
        assert_eq!(resp.status(), HttpStatus::BAD_REQUEST);
        let body: ErrorBody = resp.json().await.unwrap();
        assert!(body.error.starts_with("invalid event"));

        let mut forged = signed_note("shanten 123456789m11222p");
        forged.content.push('!');
        let resp = post(&url, serde_json::to_string(&forged).unwrap()).await;
        assert_eq!(resp.status(), HttpStatus::BAD_REQUEST);

        let unsupported = user()
            .sign(&Draft {
                content: "shanten 123456789m11222p".into(),
                kind: 30023,
                tags: vec![],
                created_at: 1,
            })
            .unwrap();
        let resp = post(&url, serde_json::to_string(&unsupported).unwrap()).await;
        assert_eq!(resp.status(), HttpStatus::BAD_REQUEST);
        let body: ErrorBody = resp.json().await.unwrap();
        assert_eq!(body.error, "kind 30023 is not supported");
        handle.abort();
    }

    #[tokio::test]
    async fn unverified_events_pass_when_verification_is_off() {
        let (base, handle) = spawn_app(false).await;
        let mut ev = signed_note("shanten 123456789m11222p");
        ev.sig = String::new();
        let resp = post(
            &format!("{base}/testbot"),
            serde_json::to_string(&ev).unwrap(),
        )
        .await;
        assert_eq!(resp.status(), HttpStatus::OK);
        handle.abort();
    }

    #[tokio::test]
    async fn unknown_bot_is_not_found() {
        let (base, handle) = spawn_app(true).await;
        let ev = signed_note("shanten 123456789m11222p");
        let resp = post(
            &format!("{base}/nobody"),
            serde_json::to_string(&ev).unwrap(),
        )
        .await;
        assert_eq!(resp.status(), HttpStatus::NOT_FOUND);
        let resp = reqwest::get(format!("{base}/nobody")).await.unwrap();
        assert_eq!(resp.status(), HttpStatus::NOT_FOUND);
        handle.abort();
    }

    #[tokio::test]
    async fn get_posts_a_quiz() {
        let (base, handle) = spawn_app(true).await;
        let resp = reqwest::get(format!("{base}/testbot")).await.unwrap();
        assert_eq!(resp.status(), HttpStatus::OK);
        let events: Vec<Event> = resp.json().await.unwrap();
        assert_eq!(events.len(), 2);
        for ev in &events {
            verify_event(ev).unwrap();
        }
        handle.abort();
    }
}
