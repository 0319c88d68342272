//! Admin storage browser: list buckets, upload objects, and the rename /
//! delete operations that keep database references consistent with what is
//! actually on disk.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use p100_storage::{extension_for, public_url, StoreError};
use p100_types::api::{
    DeleteObjectRequest, ObjectEntry, RenameObjectRequest, SweepReport, UploadObjectRequest,
    UploadObjectResponse,
};

use crate::state::AppState;

/// 20 MiB cap on admin uploads (artwork scans run large).
const MAX_OBJECT_SIZE: usize = 20 * 1024 * 1024;

fn store_status(e: &StoreError) -> StatusCode {
    match e {
        StoreError::UnknownBucket(_) | StoreError::InvalidPath(_) => StatusCode::BAD_REQUEST,
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::AlreadyExists(_) => StatusCode::CONFLICT,
        StoreError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub prefix: Option<String>,
}

/// GET /admin/storage/{bucket} — recursive listing with public URLs.
pub async fn list_objects(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let objects = state
        .store
        .list(&bucket, query.prefix.as_deref())
        .await
        .map_err(|e| {
            warn!("Storage list failed for {}: {}", bucket, e);
            store_status(&e)
        })?;

    let entries: Vec<ObjectEntry> = objects
        .into_iter()
        .map(|o| ObjectEntry {
            public_url: public_url(&state.public_base, &bucket, &o.path),
            path: o.path,
            size: o.size,
            modified_at: o.modified,
        })
        .collect();
    Ok(Json(entries))
}

/// POST /admin/storage/{bucket}/upload — base64 body; a randomized name is
/// generated when no path is given.
pub async fn upload_object(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
    Json(req): Json<UploadObjectRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let data = B64.decode(&req.data).map_err(|_| StatusCode::BAD_REQUEST)?;
    if data.is_empty() || data.len() > MAX_OBJECT_SIZE {
        return Err(StatusCode::BAD_REQUEST);
    }

    let path = match req.path {
        Some(path) if !path.is_empty() => path,
        _ => {
            let Some(ext) = extension_for(&req.content_type) else {
                return Err(StatusCode::BAD_REQUEST);
            };
            format!("{}.{}", Uuid::new_v4(), ext)
        }
    };

    state.store.save(&bucket, &path, &data).await.map_err(|e| {
        warn!("Storage upload failed for {}/{}: {}", bucket, path, e);
        store_status(&e)
    })?;

    Ok((
        StatusCode::CREATED,
        Json(UploadObjectResponse {
            public_url: public_url(&state.public_base, &bucket, &path),
            path,
        }),
    ))
}

/// POST /admin/storage/{bucket}/rename — move the object, then rewrite
/// every database reference from the old public URL to the new one.
///
/// The move and the sweep are separate operations: if a sweep target fails
/// the object is already at its new name and the report says which rows
/// were left behind. There is no rollback.
pub async fn rename_object(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
    Json(req): Json<RenameObjectRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    state
        .store
        .rename(&bucket, &req.from, &req.to)
        .await
        .map_err(|e| {
            warn!("Storage rename failed in {}: {}", bucket, e);
            store_status(&e)
        })?;

    let old_url = public_url(&state.public_base, &bucket, &req.from);
    let new_url = public_url(&state.public_base, &bucket, &req.to);

    let db = state.clone();
    let (old, new) = (old_url.clone(), new_url.clone());
    let targets = tokio::task::spawn_blocking(move || db.db.sweep_rename(&old, &new))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let rewritten: u64 = targets.iter().map(|t| t.rows_affected).sum();
    info!(
        "Renamed {}/{} -> {} and rewrote {} references",
        bucket, req.from, req.to, rewritten
    );
    Ok(Json(SweepReport {
        old_url,
        new_url: Some(new_url),
        targets,
    }))
}

/// POST /admin/storage/{bucket}/delete — remove the object, then drop every
/// database reference to it. Runs the sweep even when the file was already
/// gone, since the URL may still dangle from an earlier partial failure.
pub async fn delete_object(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
    Json(req): Json<DeleteObjectRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    state.store.delete(&bucket, &req.path).await.map_err(|e| {
        warn!("Storage delete failed for {}/{}: {}", bucket, req.path, e);
        store_status(&e)
    })?;

    let old_url = public_url(&state.public_base, &bucket, &req.path);

    let db = state.clone();
    let old = old_url.clone();
    let targets = tokio::task::spawn_blocking(move || db.db.sweep_remove(&old))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let removed: u64 = targets.iter().map(|t| t.rows_affected).sum();
    info!(
        "Deleted {}/{} and removed {} references",
        bucket, req.path, removed
    );
    Ok(Json(SweepReport {
        old_url,
        new_url: None,
        targets,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{AppState, AppStateInner};
    use p100_db::models::CharacterRow;
    use p100_db::Database;
    use p100_storage::Store;
    use std::sync::Arc;

    const BASE: &str = "http://localhost:4000";

    async fn test_state() -> AppState {
        let root = std::env::temp_dir().join(format!("p100-storage-admin-{}", Uuid::new_v4()));
        let store = Store::new(root).await.unwrap();
        let db = Database::open_in_memory().unwrap();
        Arc::new(AppStateInner {
            db,
            store,
            public_base: BASE.into(),
        })
    }

    #[tokio::test]
    async fn rename_moves_object_and_rewrites_references() {
        let state = test_state().await;
        state.store.save("backgrounds", "old.png", b"bg").await.unwrap();

        let old_url = public_url(BASE, "backgrounds", "old.png");
        state
            .db
            .insert_character(
                &CharacterRow {
                    id: "trapper".into(),
                    kind: "killer".into(),
                    name: "TRAPPER".into(),
                    image_url: None,
                    background_url: Some(old_url.clone()),
                    header_url: None,
                    display_order: 0,
                    created_at: String::new(),
                },
                &[],
            )
            .unwrap();

        let resp = rename_object(
            State(state.clone()),
            Path("backgrounds".into()),
            Json(RenameObjectRequest {
                from: "old.png".into(),
                to: "halloween/new.png".into(),
            }),
        )
        .await;
        assert!(resp.is_ok());

        // Object moved
        assert_eq!(
            state.store.read("backgrounds", "halloween/new.png").await.unwrap(),
            b"bg"
        );
        // Reference rewritten
        let row = state.db.get_character("trapper").unwrap().unwrap();
        assert_eq!(
            row.background_url.unwrap(),
            public_url(BASE, "backgrounds", "halloween/new.png")
        );
    }

    #[tokio::test]
    async fn rename_collision_leaves_references_alone() {
        let state = test_state().await;
        state.store.save("artworks", "a.png", b"a").await.unwrap();
        state.store.save("artworks", "b.png", b"b").await.unwrap();

        let url = public_url(BASE, "artworks", "a.png");
        state.db.insert_artwork("w1", &url, None).unwrap();

        let resp = rename_object(
            State(state.clone()),
            Path("artworks".into()),
            Json(RenameObjectRequest {
                from: "a.png".into(),
                to: "b.png".into(),
            }),
        )
        .await;
        assert_eq!(resp.err(), Some(StatusCode::CONFLICT));

        // Sweep did not run; reference unchanged
        let sweep = state.db.sweep_rename("nothing", "nowhere");
        assert!(sweep.iter().all(|t| t.rows_affected == 0));
    }

    #[tokio::test]
    async fn delete_sweeps_even_when_object_missing() {
        let state = test_state().await;
        let url = public_url(BASE, "screenshots", "ghost.png");
        state
            .db
            .insert_character(
                &CharacterRow {
                    id: "meg".into(),
                    kind: "survivor".into(),
                    name: "MEG".into(),
                    image_url: Some(url.clone()),
                    background_url: None,
                    header_url: None,
                    display_order: 0,
                    created_at: String::new(),
                },
                &[],
            )
            .unwrap();

        // File never existed on disk; the dangling reference still gets swept
        let resp = delete_object(
            State(state.clone()),
            Path("screenshots".into()),
            Json(DeleteObjectRequest {
                path: "ghost.png".into(),
            }),
        )
        .await;
        assert!(resp.is_ok());

        let row = state.db.get_character("meg").unwrap().unwrap();
        assert_eq!(row.image_url, None);
    }
}
