use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::{error, info};
use uuid::Uuid;

use p100_db::models::ArtistRow;
use p100_types::api::{CreateArtworkRequest, SetCharacterArtworksRequest, UpsertArtistRequest};

use crate::convert;
use crate::state::AppState;

/// GET /admin/artists
pub async fn list_artists(State(state): State<AppState>) -> Result<impl IntoResponse, StatusCode> {
    let rows = state.db.list_artists().map_err(|e| {
        error!("DB list_artists error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    let artists: Vec<_> = rows.into_iter().map(convert::artist_from_row).collect();
    Ok(Json(artists))
}

/// POST /admin/artists
pub async fn create_artist(
    State(state): State<AppState>,
    Json(req): Json<UpsertArtistRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.name.trim().is_empty() || req.url.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let id = Uuid::new_v4();
    state
        .db
        .insert_artist(&ArtistRow {
            id: id.to_string(),
            name: req.name.clone(),
            url: req.url,
            platform: req.platform.as_str().to_string(),
        })
        .map_err(|e| {
            error!("DB insert_artist error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    info!("Created artist '{}'", req.name);
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// PUT /admin/artists/{id}
pub async fn update_artist(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpsertArtistRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.name.trim().is_empty() || req.url.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let found = state
        .db
        .update_artist(&ArtistRow {
            id: id.to_string(),
            name: req.name,
            url: req.url,
            platform: req.platform.as_str().to_string(),
        })
        .map_err(|e| {
            error!("DB update_artist error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    if !found {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(StatusCode::OK)
}

/// DELETE /admin/artists/{id} — artworks keep their rows, attribution
/// goes NULL.
pub async fn delete_artist(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let deleted = state.db.delete_artist(&id.to_string()).map_err(|e| {
        error!("DB delete_artist error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    if !deleted {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /admin/artworks
pub async fn create_artwork(
    State(state): State<AppState>,
    Json(req): Json<CreateArtworkRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.url.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let id = Uuid::new_v4();
    state
        .db
        .insert_artwork(
            &id.to_string(),
            &req.url,
            req.artist_id.map(|a| a.to_string()).as_deref(),
        )
        .map_err(|e| {
            error!("DB insert_artwork error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// DELETE /admin/artworks/{id} — junction rows cascade.
pub async fn delete_artwork(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let deleted = state.db.delete_artwork(&id.to_string()).map_err(|e| {
        error!("DB delete_artwork error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    if !deleted {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /admin/characters/{id}/artworks — replaces the character's ordered
/// artwork list in one junction rewrite.
pub async fn set_character_artworks(
    State(state): State<AppState>,
    Path(character_id): Path<String>,
    Json(req): Json<SetCharacterArtworksRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if !state.db.character_exists(&character_id).map_err(|e| {
        error!("DB character_exists error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })? {
        return Err(StatusCode::NOT_FOUND);
    }

    let ids: Vec<String> = req.artwork_ids.iter().map(|id| id.to_string()).collect();
    state
        .db
        .set_character_artworks(&character_id, &ids)
        .map_err(|e| {
            error!("DB set_character_artworks error: {}", e);
            StatusCode::BAD_REQUEST
        })?;
    info!(
        "Set {} artworks on character '{}'",
        ids.len(),
        character_id
    );
    Ok(StatusCode::OK)
}
