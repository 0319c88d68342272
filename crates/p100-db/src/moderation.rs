use crate::models::{SubmissionListRow, SubmissionRow};
use crate::Database;
use anyhow::Result;
use rusqlite::{types::ToSql, OptionalExtension};

/// Result of trying to move a submission out of `pending`.
pub enum ReviewOutcome {
    NotFound,
    /// Already approved or rejected — both states are terminal.
    AlreadyReviewed(String),
    Reviewed(SubmissionRow),
}

/// Filters for the moderation list. All optional; combined with AND.
#[derive(Default)]
pub struct SubmissionFilter<'a> {
    pub status: Option<&'a str>,
    pub kind: Option<&'a str>,
    /// Username substring match, case-insensitive.
    pub search: Option<&'a str>,
}

impl Database {
    /// The duplicate-submission guard: does a pending or approved non-legacy
    /// submission already exist for this (username, character) pair?
    /// Point query only — concurrent submitters can still race past it.
    pub fn has_active_submission(&self, username: &str, character_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM submissions
                 WHERE LOWER(username) = LOWER(?1)
                   AND character_id = ?2
                   AND status IN ('pending', 'approved')
                   AND legacy = 0",
                rusqlite::params![username, character_id],
                |r| r.get(0),
            )?;
            Ok(n > 0)
        })
    }

    pub fn insert_submission(&self, row: &SubmissionRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO submissions (id, username, character_id, screenshot_url,
                                          status, rejection_reason, comment, legacy, reviewed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    row.id,
                    row.username,
                    row.character_id,
                    row.screenshot_url,
                    row.status,
                    row.rejection_reason,
                    row.comment,
                    row.legacy,
                    row.reviewed_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_submission(&self, id: &str) -> Result<Option<SubmissionRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, username, character_id, screenshot_url, status,
                        rejection_reason, comment, legacy, submitted_at, reviewed_at
                 FROM submissions WHERE id = ?1",
                [id],
                map_submission,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    /// Offset-paginated moderation list with its total count. `page` is
    /// 1-based; anything below 1 is treated as page 1.
    pub fn list_submissions(
        &self,
        filter: &SubmissionFilter<'_>,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<SubmissionListRow>, i64)> {
        let page = page.max(1);

        let mut clauses: Vec<&str> = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();
        if let Some(status) = filter.status {
            clauses.push("s.status = ?");
            params.push(Box::new(status.to_string()));
        }
        if let Some(kind) = filter.kind {
            clauses.push("c.kind = ?");
            params.push(Box::new(kind.to_string()));
        }
        if let Some(search) = filter.search {
            clauses.push("s.username LIKE '%' || ? || '%' COLLATE NOCASE");
            params.push(Box::new(search.to_string()));
        }
        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        self.with_conn(|conn| {
            let count_sql = format!(
                "SELECT COUNT(*) FROM submissions s
                 JOIN characters c ON c.id = s.character_id{}",
                where_sql
            );
            let total: i64 = conn.query_row(
                &count_sql,
                rusqlite::params_from_iter(params.iter().map(|p| p.as_ref())),
                |r| r.get(0),
            )?;

            let list_sql = format!(
                "SELECT s.id, s.username, s.character_id, s.screenshot_url, s.status,
                        s.rejection_reason, s.comment, s.legacy, s.submitted_at, s.reviewed_at,
                        c.name, c.kind
                 FROM submissions s
                 JOIN characters c ON c.id = s.character_id{}
                 ORDER BY s.submitted_at DESC, s.id
                 LIMIT {} OFFSET {}",
                where_sql,
                page_size,
                (page - 1) * page_size
            );
            let mut stmt = conn.prepare(&list_sql)?;
            let rows = stmt
                .query_map(
                    rusqlite::params_from_iter(params.iter().map(|p| p.as_ref())),
                    |row| {
                        Ok(SubmissionListRow {
                            submission: map_submission(row)?,
                            character_name: row.get(10)?,
                            character_kind: row.get(11)?,
                        })
                    },
                )?
                .collect::<Result<Vec<_>, _>>()?;
            Ok((rows, total))
        })
    }

    /// Moves a pending submission to `approved` or `rejected` and stamps
    /// `reviewed_at`. Reviewing a non-pending submission is refused.
    pub fn review_submission(
        &self,
        id: &str,
        new_status: &str,
        rejection_reason: Option<&str>,
    ) -> Result<ReviewOutcome> {
        self.with_conn_mut(|conn| {
            let current: Option<String> = conn
                .query_row(
                    "SELECT status FROM submissions WHERE id = ?1",
                    [id],
                    |r| r.get(0),
                )
                .optional()?;
            let current = match current {
                Some(status) => status,
                None => return Ok(ReviewOutcome::NotFound),
            };
            if current != "pending" {
                return Ok(ReviewOutcome::AlreadyReviewed(current));
            }

            conn.execute(
                "UPDATE submissions
                 SET status = ?2, rejection_reason = ?3, reviewed_at = datetime('now')
                 WHERE id = ?1",
                rusqlite::params![id, new_status, rejection_reason],
            )?;

            let row = conn.query_row(
                "SELECT id, username, character_id, screenshot_url, status,
                        rejection_reason, comment, legacy, submitted_at, reviewed_at
                 FROM submissions WHERE id = ?1",
                [id],
                map_submission,
            )?;
            Ok(ReviewOutcome::Reviewed(row))
        })
    }
}

fn map_submission(row: &rusqlite::Row<'_>) -> rusqlite::Result<SubmissionRow> {
    Ok(SubmissionRow {
        id: row.get(0)?,
        username: row.get(1)?,
        character_id: row.get(2)?,
        screenshot_url: row.get(3)?,
        status: row.get(4)?,
        rejection_reason: row.get(5)?,
        comment: row.get(6)?,
        legacy: row.get(7)?,
        submitted_at: row.get(8)?,
        reviewed_at: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::{ReviewOutcome, SubmissionFilter};
    use crate::models::{CharacterRow, SubmissionRow};
    use crate::Database;

    fn seed_character(db: &Database, id: &str, kind: &str) {
        db.insert_character(
            &CharacterRow {
                id: id.into(),
                kind: kind.into(),
                name: id.to_uppercase(),
                image_url: None,
                background_url: None,
                header_url: None,
                display_order: 0,
                created_at: String::new(),
            },
            &[],
        )
        .unwrap();
    }

    fn submission(username: &str, character_id: &str) -> SubmissionRow {
        SubmissionRow {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.into(),
            character_id: character_id.into(),
            screenshot_url: Some("https://host/storage/v1/object/public/screenshots/x.png".into()),
            status: "pending".into(),
            rejection_reason: None,
            comment: None,
            legacy: false,
            submitted_at: String::new(),
            reviewed_at: None,
        }
    }

    #[test]
    fn duplicate_guard_matches_pending_and_approved_only() {
        let db = Database::open_in_memory().unwrap();
        seed_character(&db, "trapper", "killer");

        let mut rejected = submission("alice", "trapper");
        rejected.status = "rejected".into();
        db.insert_submission(&rejected).unwrap();
        assert!(!db.has_active_submission("alice", "trapper").unwrap());

        let mut legacy = submission("alice", "trapper");
        legacy.legacy = true;
        db.insert_submission(&legacy).unwrap();
        assert!(!db.has_active_submission("alice", "trapper").unwrap());

        db.insert_submission(&submission("Alice", "trapper")).unwrap();
        // Case-insensitive on username
        assert!(db.has_active_submission("ALICE", "trapper").unwrap());
        assert!(!db.has_active_submission("alice", "wraith").unwrap());
    }

    #[test]
    fn review_is_terminal() {
        let db = Database::open_in_memory().unwrap();
        seed_character(&db, "trapper", "killer");
        let sub = submission("bob", "trapper");
        db.insert_submission(&sub).unwrap();

        match db.review_submission(&sub.id, "approved", None).unwrap() {
            ReviewOutcome::Reviewed(row) => {
                assert_eq!(row.status, "approved");
                assert!(row.reviewed_at.is_some());
            }
            _ => panic!("expected review to succeed"),
        }

        match db.review_submission(&sub.id, "rejected", Some("nope")).unwrap() {
            ReviewOutcome::AlreadyReviewed(status) => assert_eq!(status, "approved"),
            _ => panic!("expected terminal state to be preserved"),
        }

        match db.review_submission("missing", "approved", None).unwrap() {
            ReviewOutcome::NotFound => {}
            _ => panic!("expected not found"),
        }
    }

    #[test]
    fn list_filters_and_paginates() {
        let db = Database::open_in_memory().unwrap();
        seed_character(&db, "trapper", "killer");
        seed_character(&db, "meg", "survivor");

        for i in 0..25 {
            db.insert_submission(&submission(&format!("killerfan{}", i), "trapper"))
                .unwrap();
        }
        db.insert_submission(&submission("survivorfan", "meg")).unwrap();

        let filter = SubmissionFilter {
            kind: Some("killer"),
            ..Default::default()
        };
        let (page1, total) = db.list_submissions(&filter, 1, 20).unwrap();
        assert_eq!(total, 25);
        assert_eq!(page1.len(), 20);

        let (page2, total) = db.list_submissions(&filter, 2, 20).unwrap();
        assert_eq!(total, 25);
        assert_eq!(page2.len(), 5);

        // Page below 1 is clamped to page 1
        let (clamped, _) = db.list_submissions(&filter, 0, 20).unwrap();
        assert_eq!(clamped.len(), 20);

        let search = SubmissionFilter {
            search: Some("SURVIVOR"),
            ..Default::default()
        };
        let (found, total) = db.list_submissions(&search, 1, 20).unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].submission.username, "survivorfan");
        assert_eq!(found[0].character_kind, "survivor");
    }
}
