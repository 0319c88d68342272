//! Database row types, mapping directly to SQLite rows. Distinct from the
//! p100-types API models so the DB layer stays independent of the wire shapes.

pub struct CharacterRow {
    pub id: String,
    pub kind: String,
    pub name: String,
    pub image_url: Option<String>,
    pub background_url: Option<String>,
    pub header_url: Option<String>,
    pub display_order: i64,
    pub created_at: String,
}

pub struct PlayerRow {
    pub id: String,
    pub username: String,
    pub character_id: String,
    pub p200: bool,
    pub legacy: bool,
    pub favorite: bool,
    pub priority: i64,
    pub added_at: String,
}

pub struct SubmissionRow {
    pub id: String,
    pub username: String,
    pub character_id: String,
    pub screenshot_url: Option<String>,
    pub status: String,
    pub rejection_reason: Option<String>,
    pub comment: Option<String>,
    pub legacy: bool,
    pub submitted_at: String,
    pub reviewed_at: Option<String>,
}

/// Submission joined with its character, for the moderation list.
pub struct SubmissionListRow {
    pub submission: SubmissionRow,
    pub character_name: String,
    pub character_kind: String,
}

pub struct ArtistRow {
    pub id: String,
    pub name: String,
    pub url: String,
    pub platform: String,
}

pub struct ArtworkRow {
    pub id: String,
    pub url: String,
    pub artist: Option<ArtistRow>,
    pub created_at: String,
}

pub struct BlacklistRow {
    pub username: String,
    pub reason: Option<String>,
    pub created_at: String,
}
