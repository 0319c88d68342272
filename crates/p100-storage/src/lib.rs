pub mod store;
pub mod url;

pub use store::{ObjectInfo, Store, StoreError};
pub use url::{content_type_for, extension_for, parse_public_url, public_url, ObjectRef, PUBLIC_URL_PREFIX};

/// The fixed set of buckets the site uses. Anything else is rejected.
pub const BUCKETS: &[&str] = &[
    "killerimages",
    "backgrounds",
    "survivorbackgrounds",
    "survivors",
    "screenshots",
    "artworks",
];

pub fn is_valid_bucket(name: &str) -> bool {
    BUCKETS.contains(&name)
}
