//! Storage-reference consistency sweep.
//!
//! Renaming or deleting an object in storage must visit every (table,
//! column) that can hold its public URL, or the site grows dangling links.
//! The sweep is best-effort: each target runs as its own statement, a
//! failed target is logged and recorded, and the rest still run. Nothing
//! spans the filesystem operation and these updates transactionally.

use crate::Database;
use p100_types::api::SweepTargetResult;
use tracing::warn;

/// One tracked reference location.
struct SweepTarget {
    name: &'static str,
    /// Rewrites references from the old URL to a new one.
    rename_sql: &'static str,
    /// Removes references to a deleted object. Single-value columns are
    /// nulled; rows that exist only to carry a URL are deleted outright
    /// (artwork junction rows go with their artwork via CASCADE).
    delete_sql: &'static str,
}

const TARGETS: &[SweepTarget] = &[
    SweepTarget {
        name: "characters.image_url",
        rename_sql: "UPDATE characters SET image_url = ?2 WHERE image_url = ?1",
        delete_sql: "UPDATE characters SET image_url = NULL WHERE image_url = ?1",
    },
    SweepTarget {
        name: "characters.background_url",
        rename_sql: "UPDATE characters SET background_url = ?2 WHERE background_url = ?1",
        delete_sql: "UPDATE characters SET background_url = NULL WHERE background_url = ?1",
    },
    SweepTarget {
        name: "characters.header_url",
        rename_sql: "UPDATE characters SET header_url = ?2 WHERE header_url = ?1",
        delete_sql: "UPDATE characters SET header_url = NULL WHERE header_url = ?1",
    },
    SweepTarget {
        name: "legacy_headers.url",
        rename_sql: "UPDATE legacy_headers SET url = ?2 WHERE url = ?1",
        delete_sql: "DELETE FROM legacy_headers WHERE url = ?1",
    },
    SweepTarget {
        name: "artworks.url",
        rename_sql: "UPDATE artworks SET url = ?2 WHERE url = ?1",
        delete_sql: "DELETE FROM artworks WHERE url = ?1",
    },
    SweepTarget {
        name: "submissions.screenshot_url",
        rename_sql: "UPDATE submissions SET screenshot_url = ?2 WHERE screenshot_url = ?1",
        delete_sql: "UPDATE submissions SET screenshot_url = NULL WHERE screenshot_url = ?1",
    },
];

impl Database {
    /// After a storage rename: point every reference at the new URL.
    pub fn sweep_rename(&self, old_url: &str, new_url: &str) -> Vec<SweepTargetResult> {
        TARGETS
            .iter()
            .map(|target| {
                let outcome = self.with_conn_mut(|conn| {
                    conn.execute(target.rename_sql, rusqlite::params![old_url, new_url])
                        .map_err(Into::into)
                });
                report(target.name, outcome)
            })
            .collect()
    }

    /// After a storage delete: drop every reference to the old URL.
    pub fn sweep_remove(&self, old_url: &str) -> Vec<SweepTargetResult> {
        TARGETS
            .iter()
            .map(|target| {
                let outcome = self.with_conn_mut(|conn| {
                    conn.execute(target.delete_sql, rusqlite::params![old_url])
                        .map_err(Into::into)
                });
                report(target.name, outcome)
            })
            .collect()
    }
}

fn report(target: &'static str, outcome: anyhow::Result<usize>) -> SweepTargetResult {
    match outcome {
        Ok(rows) => SweepTargetResult {
            target: target.to_string(),
            rows_affected: rows as u64,
            error: None,
        },
        Err(e) => {
            warn!("Reference sweep failed for {}: {}", target, e);
            SweepTargetResult {
                target: target.to_string(),
                rows_affected: 0,
                error: Some(e.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::models::{CharacterRow, SubmissionRow};
    use crate::Database;

    const OLD: &str = "https://host/storage/v1/object/public/backgrounds/old.png";
    const NEW: &str = "https://host/storage/v1/object/public/backgrounds/new.png";

    fn seed(db: &Database) {
        db.insert_character(
            &CharacterRow {
                id: "trapper".into(),
                kind: "killer".into(),
                name: "TRAPPER".into(),
                image_url: Some(OLD.into()),
                background_url: Some(OLD.into()),
                header_url: Some("https://elsewhere/x.png".into()),
                display_order: 0,
                created_at: String::new(),
            },
            &[OLD.into(), "https://elsewhere/y.png".into()],
        )
        .unwrap();
        db.insert_artwork("w1", OLD, None).unwrap();
        db.insert_submission(&SubmissionRow {
            id: "s1".into(),
            username: "alice".into(),
            character_id: "trapper".into(),
            screenshot_url: Some(OLD.into()),
            status: "pending".into(),
            rejection_reason: None,
            comment: None,
            legacy: false,
            submitted_at: String::new(),
            reviewed_at: None,
        })
        .unwrap();
    }

    #[test]
    fn rename_rewrites_every_tracked_reference() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);

        let results = db.sweep_rename(OLD, NEW);
        assert!(results.iter().all(|r| r.error.is_none()));
        let rewritten: u64 = results.iter().map(|r| r.rows_affected).sum();
        // image_url + background_url + legacy_headers + artworks + submissions
        assert_eq!(rewritten, 5);

        let character = db.get_character("trapper").unwrap().unwrap();
        assert_eq!(character.image_url.as_deref(), Some(NEW));
        assert_eq!(character.background_url.as_deref(), Some(NEW));
        // Untracked value untouched
        assert_eq!(character.header_url.as_deref(), Some("https://elsewhere/x.png"));
        assert_eq!(
            db.legacy_headers("trapper").unwrap(),
            vec![NEW.to_string(), "https://elsewhere/y.png".to_string()]
        );
        assert_eq!(
            db.get_submission("s1").unwrap().unwrap().screenshot_url.as_deref(),
            Some(NEW)
        );
    }

    #[test]
    fn remove_nulls_columns_and_drops_url_rows() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);
        db.set_character_artworks("trapper", &["w1".into()]).unwrap();

        let results = db.sweep_remove(OLD);
        assert!(results.iter().all(|r| r.error.is_none()));

        let character = db.get_character("trapper").unwrap().unwrap();
        assert_eq!(character.image_url, None);
        assert_eq!(character.background_url, None);
        assert_eq!(
            db.legacy_headers("trapper").unwrap(),
            vec!["https://elsewhere/y.png".to_string()]
        );
        // Artwork row gone, junction cascaded
        assert!(db.artworks_for_character("trapper").unwrap().is_empty());
        // Submission row kept as audit, URL nulled
        let sub = db.get_submission("s1").unwrap().unwrap();
        assert_eq!(sub.screenshot_url, None);
    }
}
