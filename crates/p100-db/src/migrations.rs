use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);",
    )?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("DB: running migration v1 (characters, players, submissions)");
        conn.execute_batch(
            "
            CREATE TABLE characters (
                id              TEXT PRIMARY KEY,
                kind            TEXT NOT NULL CHECK (kind IN ('killer', 'survivor')),
                name            TEXT NOT NULL,
                image_url       TEXT,
                background_url  TEXT,
                header_url      TEXT,
                display_order   INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE legacy_headers (
                character_id    TEXT NOT NULL REFERENCES characters(id) ON DELETE CASCADE,
                url             TEXT NOT NULL,
                position        INTEGER NOT NULL,
                PRIMARY KEY (character_id, position)
            );

            CREATE TABLE players (
                id              TEXT PRIMARY KEY,
                username        TEXT NOT NULL,
                character_id    TEXT NOT NULL REFERENCES characters(id) ON DELETE CASCADE,
                p200            INTEGER NOT NULL DEFAULT 0,
                legacy          INTEGER NOT NULL DEFAULT 0,
                favorite        INTEGER NOT NULL DEFAULT 0,
                priority        INTEGER NOT NULL DEFAULT 0,
                added_at        TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_players_character
                ON players(character_id, favorite, priority);

            CREATE TABLE submissions (
                id               TEXT PRIMARY KEY,
                username         TEXT NOT NULL,
                character_id     TEXT NOT NULL REFERENCES characters(id) ON DELETE CASCADE,
                screenshot_url   TEXT,
                status           TEXT NOT NULL DEFAULT 'pending'
                                 CHECK (status IN ('pending', 'approved', 'rejected')),
                rejection_reason TEXT,
                comment          TEXT,
                legacy           INTEGER NOT NULL DEFAULT 0,
                submitted_at     TEXT NOT NULL DEFAULT (datetime('now')),
                reviewed_at      TEXT
            );

            CREATE INDEX idx_submissions_status
                ON submissions(status, submitted_at);

            -- The duplicate guard is enforced in application code. A partial
            -- unique index would close the race:
            --   CREATE UNIQUE INDEX idx_submissions_active
            --       ON submissions(username COLLATE NOCASE, character_id)
            --       WHERE status IN ('pending', 'approved') AND legacy = 0;
            -- Not applied: existing data predates the guard and violates it.

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("DB: running migration v2 (artists, artworks)");
        conn.execute_batch(
            "
            CREATE TABLE artists (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                url         TEXT NOT NULL,
                platform    TEXT NOT NULL DEFAULT 'other'
                            CHECK (platform IN ('twitter', 'instagram', 'tumblr', 'other'))
            );

            CREATE TABLE artworks (
                id          TEXT PRIMARY KEY,
                url         TEXT NOT NULL,
                artist_id   TEXT REFERENCES artists(id) ON DELETE SET NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE character_artworks (
                character_id    TEXT NOT NULL REFERENCES characters(id) ON DELETE CASCADE,
                artwork_id      TEXT NOT NULL REFERENCES artworks(id) ON DELETE CASCADE,
                position        INTEGER NOT NULL,
                PRIMARY KEY (character_id, artwork_id)
            );

            CREATE INDEX idx_character_artworks_character
                ON character_artworks(character_id, position);

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    if version < 3 {
        info!("DB: running migration v3 (blacklisted users)");
        conn.execute_batch(
            "
            CREATE TABLE blacklisted_users (
                username    TEXT PRIMARY KEY COLLATE NOCASE,
                reason      TEXT,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            INSERT INTO schema_version (version) VALUES (3);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
