use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Artwork, CharacterKind, Platform, Player, SubmissionStatus};

// -- Public browse --

#[derive(Debug, Serialize)]
pub struct CharacterSummary {
    pub id: String,
    pub kind: CharacterKind,
    pub name: String,
    pub image_url: Option<String>,
    pub display_order: i64,
    pub player_count: i64,
}

#[derive(Debug, Serialize)]
pub struct CharacterDetail {
    pub id: String,
    pub kind: CharacterKind,
    pub name: String,
    pub image_url: Option<String>,
    pub background_url: Option<String>,
    pub header_url: Option<String>,
    pub legacy_header_urls: Vec<String>,
    pub display_order: i64,
}

// -- Submissions --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitRequest {
    pub username: String,
    pub character_id: String,
    /// Base64-encoded screenshot bytes.
    pub screenshot: String,
    pub content_type: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub legacy: bool,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub id: Uuid,
    pub screenshot_url: String,
}

/// Fixed denial message returned by the duplicate-submission guard and
/// written into the auto-inserted rejected audit row.
pub const DUPLICATE_SUBMISSION_REASON: &str = "Duplicate submission: an entry \
    for this username and character is already pending or approved";

// -- Admin: moderation --

#[derive(Debug, Serialize)]
pub struct SubmissionView {
    pub id: Uuid,
    pub username: String,
    pub character_id: String,
    pub character_name: String,
    pub character_kind: CharacterKind,
    pub screenshot_url: Option<String>,
    pub status: SubmissionStatus,
    pub rejection_reason: Option<String>,
    pub comment: Option<String>,
    pub legacy: bool,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct SubmissionPage {
    pub submissions: Vec<SubmissionView>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RejectRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkAction {
    Approve,
    Reject,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BulkReviewRequest {
    pub ids: Vec<Uuid>,
    pub action: BulkAction,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkReviewResult {
    pub id: Uuid,
    pub success: bool,
    pub message: Option<String>,
}

// -- Admin: characters --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpsertCharacterRequest {
    pub kind: CharacterKind,
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub background_url: Option<String>,
    #[serde(default)]
    pub header_url: Option<String>,
    #[serde(default)]
    pub legacy_header_urls: Vec<String>,
    #[serde(default)]
    pub display_order: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCharacterRequest {
    /// Slug, also the primary key (e.g. "trapper").
    pub id: String,
    pub kind: CharacterKind,
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub background_url: Option<String>,
    #[serde(default)]
    pub header_url: Option<String>,
    #[serde(default)]
    pub legacy_header_urls: Vec<String>,
    #[serde(default)]
    pub display_order: i64,
}

// -- Admin: players --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePlayerRequest {
    pub username: String,
    pub character_id: String,
    #[serde(default)]
    pub p200: bool,
    #[serde(default)]
    pub legacy: bool,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub priority: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePlayerRequest {
    pub username: String,
    pub p200: bool,
    pub legacy: bool,
    pub favorite: bool,
    pub priority: i64,
}

/// Body of POST /admin/players/update-priority. Priority arrives as an
/// arbitrary JSON number and is clamped server-side.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePriorityRequest {
    pub id: Uuid,
    pub priority: f64,
}

#[derive(Debug, Serialize)]
pub struct UpdatePriorityResponse {
    pub success: bool,
    pub message: String,
}

// -- Admin: artists & artworks --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpsertArtistRequest {
    pub name: String,
    pub url: String,
    pub platform: Platform,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateArtworkRequest {
    pub url: String,
    #[serde(default)]
    pub artist_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetCharacterArtworksRequest {
    /// Ordered artwork ids; replaces the character's current list.
    pub artwork_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct CharacterArtworks {
    pub character_id: String,
    pub artworks: Vec<Artwork>,
}

// -- Admin: blacklist --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlacklistRequest {
    pub username: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BlacklistEntry {
    pub username: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

// -- Admin: storage --

#[derive(Debug, Serialize)]
pub struct ObjectEntry {
    pub path: String,
    pub size: u64,
    pub modified_at: Option<DateTime<Utc>>,
    pub public_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UploadObjectRequest {
    #[serde(default)]
    pub path: Option<String>,
    pub content_type: String,
    /// Base64-encoded object bytes.
    pub data: String,
}

#[derive(Debug, Serialize)]
pub struct UploadObjectResponse {
    pub path: String,
    pub public_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenameObjectRequest {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteObjectRequest {
    pub path: String,
}

/// Outcome of one (table, column) target in a reference sweep.
#[derive(Debug, Serialize)]
pub struct SweepTargetResult {
    pub target: String,
    pub rows_affected: u64,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SweepReport {
    pub old_url: String,
    pub new_url: Option<String>,
    pub targets: Vec<SweepTargetResult>,
}

// -- Players (public) --

#[derive(Debug, Serialize)]
pub struct PlayerList {
    pub character_id: String,
    pub players: Vec<Player>,
}
