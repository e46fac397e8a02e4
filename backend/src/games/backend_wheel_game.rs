use std::time::Duration;

use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use shared::shared_wheel_game::*;

use crate::error::Error;
use crate::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/info", get(info))
        .route("/chats/:chat_id/spin", post(spin_wheel))
        .route("/chats/:chat_id/spin/confirm", post(confirm_spin))
        .route("/chats/:chat_id/spin/decline", post(decline_spin))
        .route("/chats/:chat_id/explain", get(explain_wheel))
        .route("/chats/:chat_id/stats", get(show_statistics))
        .route("/chats/:chat_id/current", post(current_awards))
        .route("/chats/:chat_id/settings", get(get_settings).put(update_settings))
        .route("/chats/:chat_id/snapshot", put(update_snapshot))
        .route("/chats/:chat_id/reset", post(reset_chat))
        .route("/chats/:chat_id/events/score-change", post(on_score_change))
        .route("/chats/:chat_id/events/message", post(on_chat_message))
        .route("/chats/:chat_id/events/timed", post(on_timed_event))
        .route("/chats/:chat_id/outbox", get(drain_outbox))
}

#[debug_handler]
async fn info() -> Json<TextResponse> {
    Json(TextResponse { message: info_text() })
}

#[debug_handler]
async fn spin_wheel(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    Json(request): Json<WheelSpinRequest>,
) -> Json<WheelSpinResponse> {
    let reply = state
        .plugin
        .lock()
        .await
        .chat_manager(chat_id)
        .request_spin(&request.user, Utc::now());
    Json(begin_resolution(&state, chat_id, reply))
}

#[debug_handler]
async fn confirm_spin(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    Json(request): Json<WheelSpinRequest>,
) -> Json<WheelSpinResponse> {
    let reply = state
        .plugin
        .lock()
        .await
        .chat_manager(chat_id)
        .confirm_repeat_spin(&request.user, Utc::now());
    Json(begin_resolution(&state, chat_id, reply))
}

#[debug_handler]
async fn decline_spin(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    Json(request): Json<WheelSpinRequest>,
) -> Json<TextResponse> {
    let message = state
        .plugin
        .lock()
        .await
        .chat_manager(chat_id)
        .decline_repeat_spin(&request.user);
    Json(TextResponse { message })
}

#[debug_handler]
async fn explain_wheel(State(state): State<AppState>, Path(chat_id): Path<i64>) -> Json<TextResponse> {
    let message = state.plugin.lock().await.chat_manager(chat_id).explain_wheel();
    Json(TextResponse { message })
}

#[debug_handler]
async fn show_statistics(State(state): State<AppState>, Path(chat_id): Path<i64>) -> Json<TextResponse> {
    let message = state.plugin.lock().await.stats(chat_id);
    Json(TextResponse { message })
}

#[debug_handler]
async fn current_awards(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    Json(request): Json<WheelSpinRequest>,
) -> Json<TextResponse> {
    let message = state.plugin.lock().await.chat_manager(chat_id).print_user_awards(
        request.user.id,
        &request.user.name,
        Utc::now(),
    );
    Json(TextResponse { message })
}

#[debug_handler]
async fn get_settings(State(state): State<AppState>, Path(chat_id): Path<i64>) -> Json<WheelSettings> {
    Json(state.plugin.lock().await.settings(chat_id))
}

#[debug_handler]
async fn update_settings(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    Json(settings): Json<WheelSettings>,
) -> Result<Json<WheelSettings>, Error> {
    state
        .plugin
        .lock()
        .await
        .update_settings(chat_id, settings.clone())?;
    tracing::info!(chat_id, "Updated wheel settings: {:?}", settings);
    Ok(Json(settings))
}

#[debug_handler]
async fn update_snapshot(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    Json(mut snapshot): Json<ChatSnapshot>,
) -> StatusCode {
    snapshot.chat_id = chat_id;
    state.plugin.lock().await.update_snapshot(snapshot);
    StatusCode::NO_CONTENT
}

#[debug_handler]
async fn reset_chat(State(state): State<AppState>, Path(chat_id): Path<i64>) -> Json<EventResponse> {
    let actions = state.plugin.lock().await.reset_chat(chat_id);
    tracing::info!(chat_id, "Statistics were reset");
    Json(EventResponse { actions })
}

#[debug_handler]
async fn on_score_change(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    Json(event): Json<ScoreChangeEvent>,
) -> Json<ScoreChangeResponse> {
    let outcome = state
        .plugin
        .lock()
        .await
        .chat_manager(chat_id)
        .handle_score_change(&event, Utc::now());
    Json(ScoreChangeResponse {
        change_in_score: outcome.change_in_score,
    })
}

#[debug_handler]
async fn on_chat_message(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    Json(event): Json<MessageEvent>,
) -> Json<EventResponse> {
    let actions = state
        .plugin
        .lock()
        .await
        .chat_manager(chat_id)
        .handle_chat_message(&event, Utc::now());
    Json(EventResponse { actions })
}

#[debug_handler]
async fn on_timed_event(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    Json(event): Json<TimedOccurrenceEvent>,
) -> Json<EventResponse> {
    let actions = state
        .plugin
        .lock()
        .await
        .chat_manager(chat_id)
        .handle_timed_event(&event, Utc::now());
    Json(EventResponse { actions })
}

#[debug_handler]
async fn drain_outbox(State(state): State<AppState>, Path(chat_id): Path<i64>) -> Json<EventResponse> {
    let actions = state.plugin.lock().await.drain_outbox(chat_id);
    Json(EventResponse { actions })
}

/// Schedules the resolution of a started spin and converts the reply.
fn begin_resolution(state: &AppState, chat_id: i64, reply: SpinReply) -> WheelSpinResponse {
    if let SpinReply::Started(ticket) = &reply {
        schedule_resolution(state.clone(), chat_id, ticket.resolve_after_ms);
    }
    reply.into()
}

fn schedule_resolution(state: AppState, chat_id: i64, after_ms: u64) {
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(after_ms)).await;

        let resolution = state
            .plugin
            .lock()
            .await
            .chat_manager(chat_id)
            .resolve_spin(Utc::now());
        match resolution {
            Some(resolution) => {
                tracing::info!(
                    chat_id,
                    "🎡 WHEEL SPIN: {} won '{}'",
                    resolution.winner.name,
                    resolution.effect_name
                );
                deliver_deferred(&state, chat_id, resolution.actions).await;
            }
            None => tracing::warn!(chat_id, "No spin to resolve"),
        }
    });
}

/// Sends actions to the host's callback, falling back to the outbox.
async fn deliver_deferred(state: &AppState, chat_id: i64, actions: Vec<HostAction>) {
    if state.host.is_configured() {
        match state.host.deliver(chat_id, &actions).await {
            Ok(()) => return,
            Err(e) => tracing::warn!(
                chat_id,
                "{}; keeping {} action(s) in the outbox",
                e,
                actions.len()
            ),
        }
    }
    state.plugin.lock().await.queue(chat_id, actions);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::services::wheel_service::WheelPlugin;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        crate::create_app(AppState::new(WheelPlugin::default(), AppConfig::default()))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.map(|b| b.to_string()).unwrap_or_default()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn member(id: i64, name: &str, score: i64) -> Value {
        json!({ "user": { "id": id, "name": name, "score": score } })
    }

    #[tokio::test]
    async fn test_health_and_info() {
        let app = app();
        let (status, _) = send(&app, Method::GET, "/api/health_check", None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, Method::GET, "/api/info", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].as_str().unwrap().contains("/wofexplain"));
    }

    #[tokio::test]
    async fn test_spin_rejects_while_resolving() {
        let app = app();
        let snapshot = json!({
            "chat_id": 0,
            "users": [{ "id": 1, "name": "alice", "score": 300 }, { "id": 2, "name": "bob", "score": 120 }],
            "companions": ["Life"]
        });
        let (status, _) = send(&app, Method::PUT, "/api/chats/7/snapshot", Some(snapshot)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, Method::POST, "/api/chats/7/spin", Some(member(1, "alice", 300))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["message"], json!(SPIN_STARTED_MESSAGE));
        assert_eq!(body["actions"].as_array().map(Vec::len), Some(2));
        assert_eq!(body["actions"][0]["type"], json!("send_message"));

        let (_, body) = send(&app, Method::POST, "/api/chats/7/spin", Some(member(2, "bob", 120))).await;
        assert_eq!(body["success"], json!(false));

        let (_, body) = send(&app, Method::POST, "/api/chats/8/spin", Some(member(2, "bob", 120))).await;
        assert_eq!(body["success"], json!(true));
    }

    #[tokio::test]
    async fn test_settings_are_validated() {
        let app = app();
        let invalid = json!({ "items_on_wheel": 12, "spin_interval_minutes": 5, "min_award_hours": 1, "max_award_hours": 16 });
        let (status, body) = send(&app, Method::PUT, "/api/chats/1/settings", Some(invalid)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let valid = json!({ "items_on_wheel": 4, "spin_interval_minutes": 0, "min_award_hours": 2, "max_award_hours": 4 });
        let (status, _) = send(&app, Method::PUT, "/api/chats/1/settings", Some(valid.clone())).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = send(&app, Method::GET, "/api/chats/1/settings", None).await;
        assert_eq!(body, valid);
    }

    #[tokio::test]
    async fn test_events_without_effects_pass_through() {
        let app = app();
        let event = json!({
            "user": { "id": 3, "name": "carol", "score": 10 },
            "change_in_score": 25,
            "reason": "normal.danktime"
        });
        let (status, body) = send(&app, Method::POST, "/api/chats/2/events/score-change", Some(event)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "change_in_score": 25 }));

        let message = json!({ "message_id": 1, "text": "hi", "date": 0, "user": { "id": 3, "name": "carol", "score": 10 } });
        let (_, body) = send(&app, Method::POST, "/api/chats/2/events/message", Some(message)).await;
        assert_eq!(body, json!({ "actions": [] }));

        let (_, body) = send(&app, Method::GET, "/api/chats/2/outbox", None).await;
        assert_eq!(body, json!({ "actions": [] }));
    }

    #[tokio::test]
    async fn test_reset_and_statistics() {
        let app = app();
        let (_, body) = send(&app, Method::GET, "/api/chats/4/stats", None).await;
        assert_eq!(body["message"], json!("Wheel of Fortune --- Statistics\n\nBalance: 0\nSpins: 0"));

        let (_, body) = send(&app, Method::POST, "/api/chats/4/reset", None).await;
        assert_eq!(body["actions"][0]["type"], json!("send_message"));
    }
}
