use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use chrono::Utc;
use tracing::{error, warn};
use uuid::Uuid;

use p100_db::models::SubmissionRow;
use p100_storage::{extension_for, public_url};
use p100_types::api::{SubmitRequest, SubmitResponse, DUPLICATE_SUBMISSION_REASON};

use crate::state::AppState;

/// 5 MiB limit on decoded screenshots.
const MAX_SCREENSHOT_SIZE: usize = 5 * 1024 * 1024;

const SCREENSHOT_BUCKET: &str = "screenshots";

pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.len() <= 32
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | ' '))
}

fn deny(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "message": message }))).into_response()
}

/// POST /submissions — validate, anti-spam checks, store the screenshot
/// under a randomized name, insert a pending row.
///
/// The duplicate guard is a point query before the insert; two submitters
/// racing can both pass it. The suggested partial unique index that would
/// close the race is noted in the migrations.
pub async fn submit(
    State(state): State<AppState>,
    Json(req): Json<SubmitRequest>,
) -> Result<Response, StatusCode> {
    let username = req.username.trim().to_string();
    if !is_valid_username(&username) {
        return Ok(deny(
            StatusCode::BAD_REQUEST,
            "Username must be 1-32 characters: letters, digits, spaces, '_', '.' or '-'",
        ));
    }

    let Some(extension) = extension_for(&req.content_type) else {
        return Ok(deny(
            StatusCode::BAD_REQUEST,
            "Screenshot must be a PNG, JPEG or WebP image",
        ));
    };

    let screenshot = B64
        .decode(&req.screenshot)
        .map_err(|_| StatusCode::BAD_REQUEST)?;
    if screenshot.is_empty() || screenshot.len() > MAX_SCREENSHOT_SIZE {
        return Ok(deny(
            StatusCode::BAD_REQUEST,
            "Screenshot must be between 1 byte and 5 MiB",
        ));
    }

    // Existence, blacklist and duplicate checks in one blocking hop
    let db = state.clone();
    let uname = username.clone();
    let character_id = req.character_id.clone();
    let check = tokio::task::spawn_blocking(move || {
        if !db.db.character_exists(&character_id)? {
            return Ok(IntakeCheck::UnknownCharacter);
        }
        if db.db.is_blacklisted(&uname)? {
            return Ok(IntakeCheck::Blacklisted);
        }
        if db.db.has_active_submission(&uname, &character_id)? {
            return Ok(IntakeCheck::Duplicate);
        }
        Ok::<_, anyhow::Error>(IntakeCheck::Clear)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|e| {
        error!("Intake checks failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    match check {
        IntakeCheck::UnknownCharacter => {
            return Ok(deny(StatusCode::BAD_REQUEST, "Unknown character"));
        }
        IntakeCheck::Blacklisted => {
            warn!("Blacklisted username '{}' tried to submit", username);
            return Ok(deny(
                StatusCode::FORBIDDEN,
                "Submissions from this username are not accepted",
            ));
        }
        IntakeCheck::Duplicate => {
            // Anti-spam heuristic: keep a rejected audit row for the attempt.
            let audit = SubmissionRow {
                id: Uuid::new_v4().to_string(),
                username: username.clone(),
                character_id: req.character_id.clone(),
                screenshot_url: None,
                status: "rejected".to_string(),
                rejection_reason: Some(DUPLICATE_SUBMISSION_REASON.to_string()),
                comment: req.comment.clone(),
                legacy: req.legacy,
                submitted_at: String::new(),
                reviewed_at: Some(Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()),
            };
            let db = state.clone();
            match tokio::task::spawn_blocking(move || db.db.insert_submission(&audit)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Duplicate audit insert failed: {}", e),
                Err(e) => error!("spawn_blocking join error: {}", e),
            }
            return Ok(deny(StatusCode::CONFLICT, DUPLICATE_SUBMISSION_REASON));
        }
        IntakeCheck::Clear => {}
    }

    // Store the screenshot under a randomized name, then insert the row.
    let object_name = format!("{}.{}", Uuid::new_v4(), extension);
    state
        .store
        .save(SCREENSHOT_BUCKET, &object_name, &screenshot)
        .await
        .map_err(|e| {
            error!("Screenshot upload failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let screenshot_url = public_url(&state.public_base, SCREENSHOT_BUCKET, &object_name);
    let submission_id = Uuid::new_v4();
    let row = SubmissionRow {
        id: submission_id.to_string(),
        username,
        character_id: req.character_id,
        screenshot_url: Some(screenshot_url.clone()),
        status: "pending".to_string(),
        rejection_reason: None,
        comment: req.comment,
        legacy: req.legacy,
        submitted_at: String::new(),
        reviewed_at: None,
    };

    let db = state.clone();
    let insert = tokio::task::spawn_blocking(move || db.db.insert_submission(&row))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    if let Err(e) = insert {
        // The object is already on disk; drop it rather than leave an orphan.
        error!("Submission insert failed: {}", e);
        if let Err(e) = state.store.delete(SCREENSHOT_BUCKET, &object_name).await {
            warn!("Orphan screenshot cleanup failed for {}: {}", object_name, e);
        }
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            id: submission_id,
            screenshot_url,
        }),
    )
        .into_response())
}

enum IntakeCheck {
    UnknownCharacter,
    Blacklisted,
    Duplicate,
    Clear,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppStateInner;
    use p100_db::models::CharacterRow;
    use p100_db::Database;
    use p100_storage::Store;
    use std::sync::Arc;

    async fn test_state() -> AppState {
        let root = std::env::temp_dir().join(format!("p100-intake-{}", Uuid::new_v4()));
        let store = Store::new(root).await.unwrap();
        let db = Database::open_in_memory().unwrap();
        db.insert_character(
            &CharacterRow {
                id: "trapper".into(),
                kind: "killer".into(),
                name: "TRAPPER".into(),
                image_url: None,
                background_url: None,
                header_url: None,
                display_order: 0,
                created_at: String::new(),
            },
            &[],
        )
        .unwrap();
        Arc::new(AppStateInner {
            db,
            store,
            public_base: "http://localhost:4000".into(),
        })
    }

    fn request(username: &str) -> SubmitRequest {
        SubmitRequest {
            username: username.into(),
            character_id: "trapper".into(),
            screenshot: B64.encode(b"fake-png-bytes"),
            content_type: "image/png".into(),
            comment: None,
            legacy: false,
        }
    }

    #[test]
    fn username_validation() {
        assert!(is_valid_username("Alice_99"));
        assert!(is_valid_username("a b.c-d"));
        assert!(!is_valid_username(""));
        assert!(!is_valid_username(&"x".repeat(33)));
        assert!(!is_valid_username("nul\0byte"));
        assert!(!is_valid_username("émile"));
    }

    #[tokio::test]
    async fn accepts_then_auto_rejects_duplicate() {
        let state = test_state().await;

        let resp = submit(State(state.clone()), Json(request("alice"))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        // Same username (different case) while the first is pending
        let resp = submit(State(state.clone()), Json(request("ALICE"))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        // The denial left a rejected audit row behind
        let filter = p100_db::moderation::SubmissionFilter {
            status: Some("rejected"),
            ..Default::default()
        };
        let (rows, total) = state.db.list_submissions(&filter, 1, 20).unwrap();
        assert_eq!(total, 1);
        assert_eq!(
            rows[0].submission.rejection_reason.as_deref(),
            Some(DUPLICATE_SUBMISSION_REASON)
        );
    }

    #[tokio::test]
    async fn rejects_bad_payloads() {
        let state = test_state().await;

        let mut req = request("alice");
        req.content_type = "text/html".into();
        let resp = submit(State(state.clone()), Json(req)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let mut req = request("alice");
        req.character_id = "nonexistent".into();
        let resp = submit(State(state.clone()), Json(req)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let mut req = request("alice");
        req.screenshot = B64.encode(b"");
        let resp = submit(State(state.clone()), Json(req)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn blacklisted_usernames_are_refused_without_audit() {
        let state = test_state().await;
        state.db.add_to_blacklist("spammer", Some("repeat offender")).unwrap();

        let resp = submit(State(state.clone()), Json(request("Spammer"))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let (_, total) = state
            .db
            .list_submissions(&Default::default(), 1, 20)
            .unwrap();
        assert_eq!(total, 0);
    }
}
