use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::{error, info};
use uuid::Uuid;

use p100_db::models::PlayerRow;
use p100_types::api::{
    CreatePlayerRequest, UpdatePlayerRequest, UpdatePriorityRequest, UpdatePriorityResponse,
};

use crate::state::AppState;
use crate::submissions::is_valid_username;

/// POST /admin/players — direct creation; same idempotent existence check
/// as submission approval, so a manual add and an approval cannot double up.
pub async fn create_player(
    State(state): State<AppState>,
    Json(req): Json<CreatePlayerRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let username = req.username.trim().to_string();
    if !is_valid_username(&username) {
        return Err(StatusCode::BAD_REQUEST);
    }
    if !state.db.character_exists(&req.character_id).map_err(|e| {
        error!("DB character_exists error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })? {
        return Err(StatusCode::BAD_REQUEST);
    }

    let row = PlayerRow {
        id: Uuid::new_v4().to_string(),
        username: username.clone(),
        character_id: req.character_id.clone(),
        p200: req.p200,
        legacy: req.legacy,
        favorite: req.favorite,
        priority: req.priority.max(0),
        added_at: String::new(),
    };
    let created = state.db.insert_player_if_absent(&row).map_err(|e| {
        error!("DB insert_player_if_absent error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    if !created {
        return Err(StatusCode::CONFLICT);
    }
    info!("Added player '{}' to {}", username, req.character_id);
    Ok(StatusCode::CREATED)
}

/// PUT /admin/players/{id}
pub async fn update_player(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePlayerRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let username = req.username.trim().to_string();
    if !is_valid_username(&username) {
        return Err(StatusCode::BAD_REQUEST);
    }
    let found = state
        .db
        .update_player(
            &id.to_string(),
            &username,
            req.p200,
            req.legacy,
            req.favorite,
            req.priority.max(0),
        )
        .map_err(|e| {
            error!("DB update_player error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    if !found {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(StatusCode::OK)
}

/// DELETE /admin/players/{id}
pub async fn delete_player(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let deleted = state.db.delete_player(&id.to_string()).map_err(|e| {
        error!("DB delete_player error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    if !deleted {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Clamp an arbitrary JSON number to a usable priority: negatives floor to
/// zero, fractions truncate.
pub fn clamp_priority(raw: f64) -> Option<i64> {
    if !raw.is_finite() {
        return None;
    }
    Some(raw.trunc().max(0.0) as i64)
}

/// POST /admin/players/update-priority — `{id, priority}` in,
/// `{success, message}` out. Kept as its own endpoint with this exact wire
/// shape for the admin dashboard's reorder widget.
pub async fn update_priority(
    State(state): State<AppState>,
    Json(req): Json<UpdatePriorityRequest>,
) -> (StatusCode, Json<UpdatePriorityResponse>) {
    let Some(priority) = clamp_priority(req.priority) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(UpdatePriorityResponse {
                success: false,
                message: "Priority must be a finite number".into(),
            }),
        );
    };

    match state.db.set_player_priority(&req.id.to_string(), priority) {
        Ok(true) => (
            StatusCode::OK,
            Json(UpdatePriorityResponse {
                success: true,
                message: format!("Priority updated to {}", priority),
            }),
        ),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(UpdatePriorityResponse {
                success: false,
                message: "Player not found".into(),
            }),
        ),
        Err(e) => {
            error!("DB set_player_priority error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(UpdatePriorityResponse {
                    success: false,
                    message: "Internal error".into(),
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppStateInner;
    use p100_db::models::CharacterRow;
    use p100_db::Database;
    use p100_storage::Store;
    use std::sync::Arc;

    #[test]
    fn priority_clamping() {
        assert_eq!(clamp_priority(-3.0), Some(0));
        assert_eq!(clamp_priority(2.7), Some(2));
        assert_eq!(clamp_priority(0.0), Some(0));
        assert_eq!(clamp_priority(10.0), Some(10));
        assert_eq!(clamp_priority(f64::NAN), None);
        assert_eq!(clamp_priority(f64::INFINITY), None);
    }

    #[tokio::test]
    async fn update_priority_endpoint_shapes() {
        let root = std::env::temp_dir().join(format!("p100-prio-{}", Uuid::new_v4()));
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
        let player_id = Uuid::new_v4();
        db.insert_player_if_absent(&PlayerRow {
            id: player_id.to_string(),
            username: "alice".into(),
            character_id: "trapper".into(),
            p200: false,
            legacy: false,
            favorite: false,
            priority: 0,
            added_at: String::new(),
        })
        .unwrap();
        let state: AppState = Arc::new(AppStateInner {
            db,
            store,
            public_base: "http://localhost:4000".into(),
        });

        let (status, Json(body)) = update_priority(
            State(state.clone()),
            Json(UpdatePriorityRequest {
                id: player_id,
                priority: -7.9,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.success);
        assert_eq!(
            state.db.players_for_character("trapper").unwrap()[0].priority,
            0
        );

        let (status, Json(body)) = update_priority(
            State(state.clone()),
            Json(UpdatePriorityRequest {
                id: Uuid::new_v4(),
                priority: 5.0,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!body.success);
    }
}
