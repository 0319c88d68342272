use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::{error, info};

use p100_db::models::CharacterRow;
use p100_types::api::{CreateCharacterRequest, UpsertCharacterRequest};

use crate::state::AppState;

fn is_valid_slug(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn row_from_fields(id: String, fields: &UpsertCharacterRequest) -> CharacterRow {
    CharacterRow {
        id,
        kind: fields.kind.as_str().to_string(),
        name: fields.name.clone(),
        image_url: fields.image_url.clone(),
        background_url: fields.background_url.clone(),
        header_url: fields.header_url.clone(),
        display_order: fields.display_order,
        created_at: String::new(),
    }
}

/// POST /admin/characters
pub async fn create_character(
    State(state): State<AppState>,
    Json(req): Json<CreateCharacterRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if !is_valid_slug(&req.id) || req.name.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    if state.db.character_exists(&req.id).map_err(|e| {
        error!("DB character_exists error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })? {
        return Err(StatusCode::CONFLICT);
    }

    let row = CharacterRow {
        id: req.id.clone(),
        kind: req.kind.as_str().to_string(),
        name: req.name,
        image_url: req.image_url,
        background_url: req.background_url,
        header_url: req.header_url,
        display_order: req.display_order,
        created_at: String::new(),
    };
    state
        .db
        .insert_character(&row, &req.legacy_header_urls)
        .map_err(|e| {
            error!("DB insert_character error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    info!("Created {} '{}'", req.kind, req.id);
    Ok(StatusCode::CREATED)
}

/// PUT /admin/characters/{id} — full-row update, including the legacy
/// header list.
pub async fn update_character(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpsertCharacterRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.name.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let row = row_from_fields(id.clone(), &req);
    let found = state
        .db
        .update_character(&row, &req.legacy_header_urls)
        .map_err(|e| {
            error!("DB update_character error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    if !found {
        return Err(StatusCode::NOT_FOUND);
    }
    info!("Updated character '{}'", id);
    Ok(StatusCode::OK)
}

/// DELETE /admin/characters/{id} — players, submissions, legacy headers and
/// artwork links cascade away with the row.
pub async fn delete_character(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let deleted = state.db.delete_character(&id).map_err(|e| {
        error!("DB delete_character error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    if !deleted {
        return Err(StatusCode::NOT_FOUND);
    }
    info!("Deleted character '{}'", id);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::is_valid_slug;

    #[test]
    fn slug_validation() {
        assert!(is_valid_slug("trapper"));
        assert!(is_valid_slug("the-skull-merchant"));
        assert!(!is_valid_slug("The Trapper"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("x/../y"));
    }
}
