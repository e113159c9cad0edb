use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::Serialize;
use tracing::{debug, warn};

use crate::corpus::SongSummary;
use crate::practice::{AudioClip, InboundEvent, SessionSnapshot, Word};

use super::error::ApiError;
use super::AppState;

#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
    pub version: &'static str,
    pub sessions: usize,
}

#[derive(Debug, Serialize)]
pub struct SongDetail {
    pub id: String,
    pub title: String,
    pub words: Vec<String>,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        sessions: state.registry.len().await,
    })
}

pub async fn list_songs(State(state): State<AppState>) -> Json<Vec<SongSummary>> {
    Json(state.catalog.list().await)
}

pub async fn song_detail(
    State(state): State<AppState>,
    Path(song_id): Path<String>,
) -> Result<Json<SongDetail>, ApiError> {
    let song = state.catalog.song(&song_id).await?;
    Ok(Json(SongDetail {
        id: song.id.clone(),
        title: song.title.clone(),
        words: song.words().iter().map(|word| word.text().to_string()).collect(),
    }))
}

/// Streams the clip for a single word, or redirects when the source only
/// knows where the clip lives.
pub async fn pronounce(
    State(state): State<AppState>,
    Path(word): Path<String>,
) -> Result<Response, ApiError> {
    let word = Word::new(&word);
    if word.is_empty() {
        return Err(ApiError::BadRequest {
            code: "INVALID_WORD",
            message: "word must contain letters or digits".into(),
        });
    }

    match state.audio.clip(&word).await {
        Ok(AudioClip::Inline { content_type, data }) => {
            Ok(([(header::CONTENT_TYPE, content_type)], data).into_response())
        }
        Ok(AudioClip::Reference { data }) => Ok(Redirect::temporary(&data).into_response()),
        Err(err) => {
            warn!(target: "audio", word = word.text(), %err, "no clip for word");
            Err(ApiError::NotFound {
                code: "AUDIO_NOT_FOUND",
                message: format!("no pronunciation available for {}", word.text()),
            })
        }
    }
}

pub async fn session_snapshot(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(state.registry.snapshot(&session_id).await?))
}

pub async fn post_event(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    payload: Result<Json<InboundEvent>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(event) = payload.map_err(|rejection| ApiError::BadRequest {
        code: "INVALID_EVENT",
        message: rejection.body_text(),
    })?;
    debug!(target: "transport", session_id = %session_id, ?event, "event posted over http");
    state.registry.dispatch(&session_id, event).await?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn remove_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> StatusCode {
    match state.registry.remove(&session_id).await {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::audio::{AudioSource, ClipDirectory, ReferenceAudio};
    use crate::corpus::InMemoryCatalog;
    use crate::practice::{PracticeConfig, SessionRegistry, SessionState};
    use crate::server::{router, AppState};

    fn state_with(audio: Arc<dyn AudioSource>) -> AppState {
        let registry = SessionRegistry::new(PracticeConfig::default(), Arc::clone(&audio));
        AppState::new(registry, Arc::new(InMemoryCatalog::builtin()), audio)
    }

    fn state() -> AppState {
        state_with(Arc::new(ReferenceAudio::new(
            "https://cdn.example/clips/{word}.mp3",
        )))
    }

    async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = router(state.clone())
            .oneshot(request)
            .await
            .expect("router responds");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        (status, body.to_vec())
    }

    async fn get(state: &AppState, uri: &str) -> (StatusCode, Vec<u8>) {
        send(
            state,
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("request"),
        )
        .await
    }

    fn json_body(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).expect("json body")
    }

    #[tokio::test]
    async fn lists_builtin_songs() {
        let (status, body) = get(&state(), "/songs").await;
        assert_eq!(status, StatusCode::OK);
        let songs = json_body(&body);
        assert_eq!(songs.as_array().map(Vec::len), Some(3));
        assert_eq!(songs[0]["id"], "abc");
    }

    #[tokio::test]
    async fn song_detail_and_legacy_alias() {
        let state = state();
        let (status, body) = get(&state, "/songs/row_boat").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body)["words"][4], "boat");

        let (status, _) = get(&state, "/song/row_boat").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_song_is_404_with_code() {
        let (status, body) = get(&state(), "/songs/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json_body(&body)["code"], "SONG_NOT_FOUND");
    }

    #[tokio::test]
    async fn unknown_session_is_404() {
        let (status, body) = get(&state(), "/sessions/ghost").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json_body(&body)["code"], "SESSION_NOT_FOUND");
    }

    #[tokio::test]
    async fn posted_events_reach_live_session() {
        let state = state();
        let song = state.catalog.song("twinkle").await.expect("song");
        let (handle, mut events) = state
            .registry
            .create("s-1", song)
            .await
            .expect("session");
        assert_eq!(events.recv().await.map(|event| event.kind()), Some("word"));

        let (status, _) = send(
            &state,
            Request::builder()
                .method("POST")
                .uri("/sessions/s-1/events")
                .header("content-type", "application/json")
                .body(Body::from(json!({"type": "audio_ended"}).to_string()))
                .expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let mut snapshots = handle.subscribe();
        while snapshots.borrow_and_update().state != SessionState::AwaitingAttempt {
            snapshots.changed().await.expect("session alive");
        }

        let (status, body) = get(&state, "/sessions/s-1").await;
        assert_eq!(status, StatusCode::OK);
        let snapshot = json_body(&body);
        assert_eq!(snapshot["state"], "AWAITING_ATTEMPT");
        assert_eq!(snapshot["currentWord"], "twinkle");
    }

    #[tokio::test]
    async fn malformed_event_is_bad_request() {
        let (status, body) = send(
            &state(),
            Request::builder()
                .method("POST")
                .uri("/sessions/s-1/events")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"type":"dance"}"#))
                .expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_body(&body)["code"], "INVALID_EVENT");
    }

    #[tokio::test]
    async fn delete_removes_session() {
        let state = state();
        let song = state.catalog.song("abc").await.expect("song");
        let _session = state.registry.create("s-2", song).await.expect("session");

        let delete = || {
            Request::builder()
                .method("DELETE")
                .uri("/sessions/s-2")
                .body(Body::empty())
                .expect("request")
        };
        assert_eq!(send(&state, delete()).await.0, StatusCode::NO_CONTENT);
        assert_eq!(send(&state, delete()).await.0, StatusCode::NOT_FOUND);
        assert_eq!(get(&state, "/sessions/s-2").await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn pronounce_redirects_for_references() {
        let response = router(state())
            .oneshot(
                Request::builder()
                    .uri("/pronounce/Star")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://cdn.example/clips/Star.mp3"
        );
    }

    #[tokio::test]
    async fn pronounce_serves_clip_bytes() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("star.mp3"), b"ID3star").expect("write");
        let state = state_with(Arc::new(ClipDirectory::new(dir.path(), "mp3")));

        let (status, body) = get(&state, "/pronounce/star").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"ID3star");

        let (status, body) = get(&state, "/pronounce/Star").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"ID3star");

        let (status, body) = get(&state, "/pronounce/moon").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json_body(&body)["code"], "AUDIO_NOT_FOUND");
    }

    #[tokio::test]
    async fn health_reports_session_count() {
        let (status, body) = get(&state(), "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        let health = json_body(&body);
        assert_eq!(health["status"], "ok");
        assert_eq!(health["sessions"], 0);
    }
}
