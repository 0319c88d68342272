use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::{error, warn};

use p100_storage::{content_type_for, StoreError};
use p100_types::api::{CharacterArtworks, CharacterDetail, CharacterSummary, PlayerList};
use p100_types::models::CharacterKind;

use crate::convert;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CharacterQuery {
    pub kind: Option<CharacterKind>,
}

/// GET /characters — all characters in display order, with player counts.
pub async fn list_characters(
    State(state): State<AppState>,
    Query(query): Query<CharacterQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let kind = query.kind.map(|k| k.as_str());

    let rows = tokio::task::spawn_blocking(move || db.db.list_characters(kind))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("DB list_characters error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let characters: Vec<CharacterSummary> = rows
        .into_iter()
        .map(|(row, player_count)| CharacterSummary {
            kind: row.kind.parse().unwrap_or_else(|e| {
                warn!("{}", e);
                CharacterKind::Killer
            }),
            id: row.id,
            name: row.name,
            image_url: row.image_url,
            display_order: row.display_order,
            player_count,
        })
        .collect();

    Ok(Json(characters))
}

/// GET /characters/{id}
pub async fn get_character(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let cid = id.clone();
    let (row, legacy_headers) = tokio::task::spawn_blocking(move || {
        let row = db.db.get_character(&cid)?;
        let headers = db.db.legacy_headers(&cid)?;
        Ok::<_, anyhow::Error>((row, headers))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|e| {
        error!("DB get_character error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let row = row.ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(CharacterDetail {
        kind: row.kind.parse().unwrap_or_else(|e| {
            warn!("{}", e);
            CharacterKind::Killer
        }),
        id: row.id,
        name: row.name,
        image_url: row.image_url,
        background_url: row.background_url,
        header_url: row.header_url,
        legacy_header_urls: legacy_headers,
        display_order: row.display_order,
    }))
}

/// GET /characters/{id}/players — favorites first, then priority, then age.
pub async fn get_players(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let cid = id.clone();
    let (exists, rows) = tokio::task::spawn_blocking(move || {
        let exists = db.db.character_exists(&cid)?;
        let rows = if exists {
            db.db.players_for_character(&cid)?
        } else {
            Vec::new()
        };
        Ok::<_, anyhow::Error>((exists, rows))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|e| {
        error!("DB players_for_character error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    if !exists {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(PlayerList {
        character_id: id,
        players: rows.into_iter().map(convert::player_from_row).collect(),
    }))
}

/// GET /characters/{id}/artworks
pub async fn get_artworks(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let cid = id.clone();
    let (exists, rows) = tokio::task::spawn_blocking(move || {
        let exists = db.db.character_exists(&cid)?;
        let rows = if exists {
            db.db.artworks_for_character(&cid)?
        } else {
            Vec::new()
        };
        Ok::<_, anyhow::Error>((exists, rows))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|e| {
        error!("DB artworks_for_character error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    if !exists {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(CharacterArtworks {
        character_id: id,
        artworks: rows.into_iter().map(convert::artwork_from_row).collect(),
    }))
}

/// GET /storage/v1/object/public/{bucket}/{*path} — serves stored objects.
/// This route is what makes the public URLs written into the database
/// resolvable.
pub async fn serve_object(
    State(state): State<AppState>,
    Path((bucket, path)): Path<(String, String)>,
) -> Result<impl IntoResponse, StatusCode> {
    let bytes = state.store.read(&bucket, &path).await.map_err(|e| match e {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::UnknownBucket(_) | StoreError::InvalidPath(_) => StatusCode::NOT_FOUND,
        e => {
            error!("Object read failed for {}/{}: {}", bucket, path, e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    })?;

    Ok(([(header::CONTENT_TYPE, content_type_for(&path))], bytes))
}

/// GET /health — liveness check (no auth).
pub async fn health() -> &'static str {
    "ok"
}
