use crate::models::{ArtistRow, ArtworkRow, BlacklistRow, CharacterRow, PlayerRow};
use crate::Database;
use anyhow::{anyhow, bail, Result};
use rusqlite::{Connection, OptionalExtension};

impl Database {
    // -- Characters --

    pub fn list_characters(&self, kind: Option<&str>) -> Result<Vec<(CharacterRow, i64)>> {
        self.with_conn(|conn| {
            let base = "SELECT c.id, c.kind, c.name, c.image_url, c.background_url,
                               c.header_url, c.display_order, c.created_at,
                               (SELECT COUNT(*) FROM players p WHERE p.character_id = c.id)
                        FROM characters c";
            let order = " ORDER BY c.display_order, c.id";

            let map = |row: &rusqlite::Row<'_>| {
                Ok((
                    CharacterRow {
                        id: row.get(0)?,
                        kind: row.get(1)?,
                        name: row.get(2)?,
                        image_url: row.get(3)?,
                        background_url: row.get(4)?,
                        header_url: row.get(5)?,
                        display_order: row.get(6)?,
                        created_at: row.get(7)?,
                    },
                    row.get::<_, i64>(8)?,
                ))
            };

            let rows = match kind {
                Some(kind) => {
                    let sql = format!("{} WHERE c.kind = ?1{}", base, order);
                    let mut stmt = conn.prepare(&sql)?;
                    let rows = stmt.query_map([kind], map)?;
                    rows.collect::<Result<Vec<_>, _>>()?
                }
                None => {
                    let sql = format!("{}{}", base, order);
                    let mut stmt = conn.prepare(&sql)?;
                    let rows = stmt.query_map([], map)?;
                    rows.collect::<Result<Vec<_>, _>>()?
                }
            };
            Ok(rows)
        })
    }

    pub fn get_character(&self, id: &str) -> Result<Option<CharacterRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, kind, name, image_url, background_url, header_url,
                        display_order, created_at
                 FROM characters WHERE id = ?1",
                [id],
                map_character,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    pub fn character_exists(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM characters WHERE id = ?1",
                [id],
                |r| r.get(0),
            )?;
            Ok(n > 0)
        })
    }

    pub fn legacy_headers(&self, character_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT url FROM legacy_headers WHERE character_id = ?1 ORDER BY position",
            )?;
            let urls = stmt
                .query_map([character_id], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(urls)
        })
    }

    pub fn insert_character(&self, row: &CharacterRow, legacy_headers: &[String]) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO characters (id, kind, name, image_url, background_url,
                                         header_url, display_order)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    row.id,
                    row.kind,
                    row.name,
                    row.image_url,
                    row.background_url,
                    row.header_url,
                    row.display_order,
                ],
            )?;
            replace_legacy_headers(conn, &row.id, legacy_headers)?;
            Ok(())
        })
    }

    /// Full-row update including the legacy header list. Returns false if the
    /// character does not exist.
    pub fn update_character(&self, row: &CharacterRow, legacy_headers: &[String]) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "UPDATE characters
                 SET kind = ?2, name = ?3, image_url = ?4, background_url = ?5,
                     header_url = ?6, display_order = ?7
                 WHERE id = ?1",
                rusqlite::params![
                    row.id,
                    row.kind,
                    row.name,
                    row.image_url,
                    row.background_url,
                    row.header_url,
                    row.display_order,
                ],
            )?;
            if n == 0 {
                return Ok(false);
            }
            replace_legacy_headers(conn, &row.id, legacy_headers)?;
            Ok(true)
        })
    }

    /// Deletes a character; players, submissions, legacy headers and artwork
    /// links go with it via ON DELETE CASCADE.
    pub fn delete_character(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM characters WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    // -- Players --

    /// Players for a character page: favorites first, then priority
    /// descending, then oldest first.
    pub fn players_for_character(&self, character_id: &str) -> Result<Vec<PlayerRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, character_id, p200, legacy, favorite, priority, added_at
                 FROM players WHERE character_id = ?1
                 ORDER BY favorite DESC, priority DESC, added_at, id",
            )?;
            let rows = stmt
                .query_map([character_id], map_player)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Inserts a player unless one already exists for the same username
    /// (case-insensitive) and character. Returns true if inserted — this is
    /// what makes submission approval idempotent.
    pub fn insert_player_if_absent(&self, row: &PlayerRow) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let existing: i64 = conn.query_row(
                "SELECT COUNT(*) FROM players
                 WHERE LOWER(username) = LOWER(?1) AND character_id = ?2",
                rusqlite::params![row.username, row.character_id],
                |r| r.get(0),
            )?;
            if existing > 0 {
                return Ok(false);
            }
            conn.execute(
                "INSERT INTO players (id, username, character_id, p200, legacy, favorite, priority)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    row.id,
                    row.username,
                    row.character_id,
                    row.p200,
                    row.legacy,
                    row.favorite,
                    row.priority,
                ],
            )?;
            Ok(true)
        })
    }

    pub fn update_player(
        &self,
        id: &str,
        username: &str,
        p200: bool,
        legacy: bool,
        favorite: bool,
        priority: i64,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "UPDATE players
                 SET username = ?2, p200 = ?3, legacy = ?4, favorite = ?5, priority = ?6
                 WHERE id = ?1",
                rusqlite::params![id, username, p200, legacy, favorite, priority],
            )?;
            Ok(n > 0)
        })
    }

    pub fn delete_player(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM players WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    pub fn set_player_priority(&self, id: &str, priority: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "UPDATE players SET priority = ?2 WHERE id = ?1",
                rusqlite::params![id, priority],
            )?;
            Ok(n > 0)
        })
    }

    // -- Artists --

    pub fn list_artists(&self) -> Result<Vec<ArtistRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, url, platform FROM artists ORDER BY name, id",
            )?;
            let rows = stmt
                .query_map([], map_artist)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn insert_artist(&self, row: &ArtistRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO artists (id, name, url, platform) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![row.id, row.name, row.url, row.platform],
            )?;
            Ok(())
        })
    }

    pub fn update_artist(&self, row: &ArtistRow) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "UPDATE artists SET name = ?2, url = ?3, platform = ?4 WHERE id = ?1",
                rusqlite::params![row.id, row.name, row.url, row.platform],
            )?;
            Ok(n > 0)
        })
    }

    /// Deleting an artist keeps their artworks; artist_id goes NULL via
    /// ON DELETE SET NULL.
    pub fn delete_artist(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM artists WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    // -- Artworks --

    pub fn insert_artwork(&self, id: &str, url: &str, artist_id: Option<&str>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO artworks (id, url, artist_id) VALUES (?1, ?2, ?3)",
                rusqlite::params![id, url, artist_id],
            )?;
            Ok(())
        })
    }

    pub fn delete_artwork(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM artworks WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    pub fn artworks_for_character(&self, character_id: &str) -> Result<Vec<ArtworkRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT w.id, w.url, w.created_at,
                        a.id, a.name, a.url, a.platform
                 FROM character_artworks ca
                 JOIN artworks w ON w.id = ca.artwork_id
                 LEFT JOIN artists a ON a.id = w.artist_id
                 WHERE ca.character_id = ?1
                 ORDER BY ca.position",
            )?;
            let rows = stmt
                .query_map([character_id], |row| {
                    let artist = match row.get::<_, Option<String>>(3)? {
                        Some(artist_id) => Some(ArtistRow {
                            id: artist_id,
                            name: row.get(4)?,
                            url: row.get(5)?,
                            platform: row.get(6)?,
                        }),
                        None => None,
                    };
                    Ok(ArtworkRow {
                        id: row.get(0)?,
                        url: row.get(1)?,
                        created_at: row.get(2)?,
                        artist,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Replaces a character's ordered artwork list in one junction rewrite.
    /// Fails up front if any artwork id is unknown.
    pub fn set_character_artworks(&self, character_id: &str, artwork_ids: &[String]) -> Result<()> {
        self.with_conn_mut(|conn| {
            for id in artwork_ids {
                let n: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM artworks WHERE id = ?1",
                    [id],
                    |r| r.get(0),
                )?;
                if n == 0 {
                    bail!("unknown artwork id: {}", id);
                }
            }
            conn.execute(
                "DELETE FROM character_artworks WHERE character_id = ?1",
                [character_id],
            )?;
            for (position, id) in artwork_ids.iter().enumerate() {
                conn.execute(
                    "INSERT INTO character_artworks (character_id, artwork_id, position)
                     VALUES (?1, ?2, ?3)",
                    rusqlite::params![character_id, id, position as i64],
                )?;
            }
            Ok(())
        })
    }

    // -- Blacklist --

    pub fn is_blacklisted(&self, username: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM blacklisted_users WHERE username = ?1",
                [username],
                |r| r.get(0),
            )?;
            Ok(n > 0)
        })
    }

    pub fn list_blacklist(&self) -> Result<Vec<BlacklistRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT username, reason, created_at FROM blacklisted_users ORDER BY username",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(BlacklistRow {
                        username: row.get(0)?,
                        reason: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn add_to_blacklist(&self, username: &str, reason: Option<&str>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO blacklisted_users (username, reason) VALUES (?1, ?2)
                 ON CONFLICT(username) DO UPDATE SET reason = excluded.reason",
                rusqlite::params![username, reason],
            )?;
            Ok(())
        })
    }

    pub fn remove_from_blacklist(&self, username: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "DELETE FROM blacklisted_users WHERE username = ?1",
                [username],
            )?;
            Ok(n > 0)
        })
    }

    pub fn character_name(&self, id: &str) -> Result<String> {
        self.with_conn(|conn| {
            conn.query_row("SELECT name FROM characters WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .map_err(|_| anyhow!("Character not found: {}", id))
        })
    }
}

fn map_character(row: &rusqlite::Row<'_>) -> rusqlite::Result<CharacterRow> {
    Ok(CharacterRow {
        id: row.get(0)?,
        kind: row.get(1)?,
        name: row.get(2)?,
        image_url: row.get(3)?,
        background_url: row.get(4)?,
        header_url: row.get(5)?,
        display_order: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn map_player(row: &rusqlite::Row<'_>) -> rusqlite::Result<PlayerRow> {
    Ok(PlayerRow {
        id: row.get(0)?,
        username: row.get(1)?,
        character_id: row.get(2)?,
        p200: row.get(3)?,
        legacy: row.get(4)?,
        favorite: row.get(5)?,
        priority: row.get(6)?,
        added_at: row.get(7)?,
    })
}

fn map_artist(row: &rusqlite::Row<'_>) -> rusqlite::Result<ArtistRow> {
    Ok(ArtistRow {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        platform: row.get(3)?,
    })
}

fn replace_legacy_headers(
    conn: &Connection,
    character_id: &str,
    urls: &[String],
) -> Result<()> {
    conn.execute(
        "DELETE FROM legacy_headers WHERE character_id = ?1",
        [character_id],
    )?;
    for (position, url) in urls.iter().enumerate() {
        conn.execute(
            "INSERT INTO legacy_headers (character_id, url, position) VALUES (?1, ?2, ?3)",
            rusqlite::params![character_id, url, position as i64],
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::models::{CharacterRow, PlayerRow};
    use crate::Database;

    fn character(id: &str, kind: &str, order: i64) -> CharacterRow {
        CharacterRow {
            id: id.into(),
            kind: kind.into(),
            name: id.to_uppercase(),
            image_url: None,
            background_url: None,
            header_url: None,
            display_order: order,
            created_at: String::new(),
        }
    }

    fn player(username: &str, character_id: &str) -> PlayerRow {
        PlayerRow {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.into(),
            character_id: character_id.into(),
            p200: false,
            legacy: false,
            favorite: false,
            priority: 0,
            added_at: String::new(),
        }
    }

    #[test]
    fn characters_ordered_by_display_order() {
        let db = Database::open_in_memory().unwrap();
        db.insert_character(&character("wraith", "killer", 2), &[]).unwrap();
        db.insert_character(&character("trapper", "killer", 1), &[]).unwrap();

        let rows = db.list_characters(Some("killer")).unwrap();
        let ids: Vec<&str> = rows.iter().map(|(c, _)| c.id.as_str()).collect();
        assert_eq!(ids, vec!["trapper", "wraith"]);

        assert!(db.list_characters(Some("survivor")).unwrap().is_empty());
    }

    #[test]
    fn legacy_headers_replaced_on_update() {
        let db = Database::open_in_memory().unwrap();
        let row = character("nurse", "killer", 0);
        db.insert_character(&row, &["a".into(), "b".into()]).unwrap();
        assert_eq!(db.legacy_headers("nurse").unwrap(), vec!["a", "b"]);

        db.update_character(&row, &["c".into()]).unwrap();
        assert_eq!(db.legacy_headers("nurse").unwrap(), vec!["c"]);
    }

    #[test]
    fn player_insert_is_idempotent_per_username_and_character() {
        let db = Database::open_in_memory().unwrap();
        db.insert_character(&character("trapper", "killer", 0), &[]).unwrap();

        assert!(db.insert_player_if_absent(&player("Alice", "trapper")).unwrap());
        // Same username, different case — still a duplicate
        assert!(!db.insert_player_if_absent(&player("alice", "trapper")).unwrap());

        let players = db.players_for_character("trapper").unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].username, "Alice");
    }

    #[test]
    fn character_delete_cascades_to_players() {
        let db = Database::open_in_memory().unwrap();
        db.insert_character(&character("trapper", "killer", 0), &[]).unwrap();
        db.insert_player_if_absent(&player("alice", "trapper")).unwrap();

        assert!(db.delete_character("trapper").unwrap());
        let orphans: i64 = db
            .with_conn(|conn| {
                conn.query_row("SELECT COUNT(*) FROM players", [], |r| r.get(0))
                    .map_err(Into::into)
            })
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn player_ordering_favorites_then_priority() {
        let db = Database::open_in_memory().unwrap();
        db.insert_character(&character("trapper", "killer", 0), &[]).unwrap();

        let mut a = player("low", "trapper");
        a.priority = 1;
        let mut b = player("high", "trapper");
        b.priority = 10;
        let mut c = player("fav", "trapper");
        c.favorite = true;
        db.insert_player_if_absent(&a).unwrap();
        db.insert_player_if_absent(&b).unwrap();
        db.insert_player_if_absent(&c).unwrap();

        let names: Vec<String> = db
            .players_for_character("trapper")
            .unwrap()
            .into_iter()
            .map(|p| p.username)
            .collect();
        assert_eq!(names, vec!["fav", "high", "low"]);
    }

    #[test]
    fn blacklist_is_case_insensitive() {
        let db = Database::open_in_memory().unwrap();
        db.add_to_blacklist("Spammer", None).unwrap();
        assert!(db.is_blacklisted("spammer").unwrap());
        assert!(db.is_blacklisted("SPAMMER").unwrap());
        assert!(db.remove_from_blacklist("spammer").unwrap());
        assert!(!db.is_blacklisted("Spammer").unwrap());
    }

    #[test]
    fn artwork_list_rewrite_and_artist_set_null() {
        let db = Database::open_in_memory().unwrap();
        db.insert_character(&character("trapper", "killer", 0), &[]).unwrap();

        let artist = crate::models::ArtistRow {
            id: "a1".into(),
            name: "Painter".into(),
            url: "https://example.com/painter".into(),
            platform: "twitter".into(),
        };
        db.insert_artist(&artist).unwrap();
        db.insert_artwork("w1", "https://img/1.png", Some("a1")).unwrap();
        db.insert_artwork("w2", "https://img/2.png", None).unwrap();

        db.set_character_artworks("trapper", &["w2".into(), "w1".into()]).unwrap();
        let artworks = db.artworks_for_character("trapper").unwrap();
        assert_eq!(artworks.len(), 2);
        assert_eq!(artworks[0].id, "w2");
        assert!(artworks[0].artist.is_none());
        assert_eq!(artworks[1].artist.as_ref().unwrap().name, "Painter");

        // Deleting the artist keeps the artwork, attribution goes away
        db.delete_artist("a1").unwrap();
        let artworks = db.artworks_for_character("trapper").unwrap();
        assert!(artworks[1].artist.is_none());
    }
}
