//! Row-to-wire conversions. SQLite hands back strings; corrupt values are
//! logged and replaced with defaults rather than failing the whole page.

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use p100_db::models::{ArtistRow, ArtworkRow, PlayerRow, SubmissionListRow};
use p100_types::api::SubmissionView;
use p100_types::models::{Artist, Artwork, CharacterKind, Platform, Player, SubmissionStatus};

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
/// Parse as naive UTC and convert; fall back to RFC 3339 for values written
/// by the application itself.
pub fn parse_db_time(raw: &str, context: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on {}: {}", raw, context, e);
            DateTime::default()
        })
}

pub fn parse_db_uuid(raw: &str, context: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt id '{}' on {}: {}", raw, context, e);
        Uuid::default()
    })
}

pub fn player_from_row(row: PlayerRow) -> Player {
    Player {
        id: parse_db_uuid(&row.id, "player"),
        added_at: parse_db_time(&row.added_at, "player"),
        username: row.username,
        character_id: row.character_id,
        p200: row.p200,
        legacy: row.legacy,
        favorite: row.favorite,
        priority: row.priority,
    }
}

pub fn artist_from_row(row: ArtistRow) -> Artist {
    Artist {
        id: parse_db_uuid(&row.id, "artist"),
        platform: row.platform.parse().unwrap_or_else(|e| {
            warn!("{}", e);
            Platform::Other
        }),
        name: row.name,
        url: row.url,
    }
}

pub fn artwork_from_row(row: ArtworkRow) -> Artwork {
    Artwork {
        id: parse_db_uuid(&row.id, "artwork"),
        created_at: parse_db_time(&row.created_at, "artwork"),
        artist: row.artist.map(artist_from_row),
        url: row.url,
    }
}

pub fn submission_view_from_row(row: SubmissionListRow) -> SubmissionView {
    let sub = row.submission;
    SubmissionView {
        id: parse_db_uuid(&sub.id, "submission"),
        status: sub.status.parse().unwrap_or_else(|e| {
            warn!("{}", e);
            SubmissionStatus::Pending
        }),
        character_kind: row.character_kind.parse().unwrap_or_else(|e| {
            warn!("{}", e);
            CharacterKind::Killer
        }),
        submitted_at: parse_db_time(&sub.submitted_at, "submission"),
        reviewed_at: sub
            .reviewed_at
            .map(|t| parse_db_time(&t, "submission reviewed_at")),
        username: sub.username,
        character_id: sub.character_id,
        character_name: row.character_name,
        screenshot_url: sub.screenshot_url,
        rejection_reason: sub.rejection_reason,
        comment: sub.comment,
        legacy: sub.legacy,
    }
}

#[cfg(test)]
mod tests {
    use super::parse_db_time;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_sqlite_and_rfc3339_timestamps() {
        let t = parse_db_time("2025-06-01 12:30:00", "test");
        assert_eq!((t.year(), t.hour()), (2025, 12));

        let t = parse_db_time("2025-06-01T12:30:00Z", "test");
        assert_eq!(t.minute(), 30);

        // Corrupt input falls back to the epoch default instead of panicking
        let t = parse_db_time("not-a-time", "test");
        assert_eq!(t.year(), 1970);
    }
}
