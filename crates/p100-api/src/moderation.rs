use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use p100_db::models::PlayerRow;
use p100_db::moderation::{ReviewOutcome, SubmissionFilter};
use p100_types::api::{
    BlacklistEntry, BlacklistRequest, BulkAction, BulkReviewRequest, BulkReviewResult,
    RejectRequest, SubmissionPage,
};
use p100_types::models::{CharacterKind, SubmissionStatus};

use crate::convert;
use crate::state::AppState;

/// Fixed moderation page size, offset-paginated.
pub const PAGE_SIZE: i64 = 20;

#[derive(Debug, Deserialize)]
pub struct SubmissionQuery {
    pub status: Option<SubmissionStatus>,
    pub kind: Option<CharacterKind>,
    pub search: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_page() -> i64 {
    1
}

/// GET /admin/submissions
pub async fn list_submissions(
    State(state): State<AppState>,
    Query(query): Query<SubmissionQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let page = query.page.max(1);

    let (rows, total) = tokio::task::spawn_blocking(move || {
        let filter = SubmissionFilter {
            status: query.status.map(|s| s.as_str()),
            kind: query.kind.map(|k| k.as_str()),
            search: query.search.as_deref().filter(|s| !s.is_empty()),
        };
        db.db.list_submissions(&filter, page, PAGE_SIZE)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|e| {
        error!("DB list_submissions error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(SubmissionPage {
        submissions: rows.into_iter().map(convert::submission_view_from_row).collect(),
        total,
        page,
        page_size: PAGE_SIZE,
    }))
}

/// Shared approve/reject core, also used by the bulk endpoint. On approval,
/// creates the player unless an equivalent one already exists — approving
/// the same submission twice, or approving after a manual player insert,
/// still yields exactly one player row.
fn review(
    state: &AppState,
    id: &Uuid,
    action: BulkAction,
    reason: Option<&str>,
) -> Result<(StatusCode, String), anyhow::Error> {
    let (new_status, reason) = match action {
        BulkAction::Approve => ("approved", None),
        BulkAction::Reject => ("rejected", reason.or(Some("Rejected by moderator"))),
    };

    let outcome = state.db.review_submission(&id.to_string(), new_status, reason)?;
    match outcome {
        ReviewOutcome::NotFound => Ok((StatusCode::NOT_FOUND, "Submission not found".into())),
        ReviewOutcome::AlreadyReviewed(status) => Ok((
            StatusCode::CONFLICT,
            format!("Submission already {}", status),
        )),
        ReviewOutcome::Reviewed(row) => {
            if action == BulkAction::Approve {
                let created = state.db.insert_player_if_absent(&PlayerRow {
                    id: Uuid::new_v4().to_string(),
                    username: row.username.clone(),
                    character_id: row.character_id.clone(),
                    p200: false,
                    legacy: row.legacy,
                    favorite: false,
                    priority: 0,
                    added_at: String::new(),
                })?;
                info!(
                    "Approved submission {} for {} on {} (player created: {})",
                    id, row.username, row.character_id, created
                );
                Ok((
                    StatusCode::OK,
                    if created {
                        "Approved; player created".into()
                    } else {
                        "Approved; player already existed".into()
                    },
                ))
            } else {
                info!("Rejected submission {} for {}", id, row.username);
                Ok((StatusCode::OK, "Rejected".into()))
            }
        }
    }
}

async fn review_blocking(
    state: AppState,
    id: Uuid,
    action: BulkAction,
    reason: Option<String>,
) -> Result<(StatusCode, String), StatusCode> {
    tokio::task::spawn_blocking(move || review(&state, &id, action, reason.as_deref()))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("Review failed for {}: {}", id, e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

/// POST /admin/submissions/{id}/approve
pub async fn approve_submission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let (status, message) = review_blocking(state, id, BulkAction::Approve, None).await?;
    Ok((status, Json(serde_json::json!({ "message": message }))))
}

/// POST /admin/submissions/{id}/reject
pub async fn reject_submission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RejectRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let (status, message) = review_blocking(state, id, BulkAction::Reject, req.reason).await?;
    Ok((status, Json(serde_json::json!({ "message": message }))))
}

/// POST /admin/submissions/bulk — per-id best effort, no transaction across
/// ids; each result reports its own success or failure.
pub async fn bulk_review(
    State(state): State<AppState>,
    Json(req): Json<BulkReviewRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let mut results = Vec::with_capacity(req.ids.len());
    for id in req.ids {
        let result =
            review_blocking(state.clone(), id, req.action, req.reason.clone()).await;
        results.push(match result {
            Ok((status, message)) => BulkReviewResult {
                id,
                success: status == StatusCode::OK,
                message: Some(message),
            },
            Err(_) => BulkReviewResult {
                id,
                success: false,
                message: Some("Internal error".into()),
            },
        });
    }
    Ok(Json(results))
}

// -- Blacklist --

/// GET /admin/blacklist
pub async fn list_blacklist(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, StatusCode> {
    let rows = state.db.list_blacklist().map_err(|e| {
        error!("DB list_blacklist error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    let entries: Vec<BlacklistEntry> = rows
        .into_iter()
        .map(|row| BlacklistEntry {
            created_at: convert::parse_db_time(&row.created_at, "blacklist"),
            username: row.username,
            reason: row.reason,
        })
        .collect();
    Ok(Json(entries))
}

/// POST /admin/blacklist
pub async fn add_blacklist(
    State(state): State<AppState>,
    Json(req): Json<BlacklistRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let username = req.username.trim();
    if username.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    state
        .db
        .add_to_blacklist(username, req.reason.as_deref())
        .map_err(|e| {
            error!("DB add_to_blacklist error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    info!("Blacklisted username '{}'", username);
    Ok(StatusCode::CREATED)
}

/// DELETE /admin/blacklist/{username}
pub async fn remove_blacklist(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let removed = state.db.remove_from_blacklist(&username).map_err(|e| {
        error!("DB remove_from_blacklist error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}
