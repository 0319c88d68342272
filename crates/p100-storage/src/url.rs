//! Public object URL shape:
//! `{base}/storage/v1/object/public/{bucket}/{path}`. Every URL stored in
//! the database follows it, and the reference sweep relies on being able to
//! invert it.

use crate::is_valid_bucket;

pub const PUBLIC_URL_PREFIX: &str = "/storage/v1/object/public/";

/// A parsed public URL: which bucket, which object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub bucket: String,
    pub path: String,
}

pub fn public_url(base: &str, bucket: &str, path: &str) -> String {
    format!(
        "{}{}{}/{}",
        base.trim_end_matches('/'),
        PUBLIC_URL_PREFIX,
        bucket,
        path
    )
}

/// Inverts [`public_url`]. Returns None for foreign hosts, unknown buckets,
/// or anything not shaped like a public object URL.
pub fn parse_public_url(base: &str, url: &str) -> Option<ObjectRef> {
    let rest = url.strip_prefix(base.trim_end_matches('/'))?;
    let rest = rest.strip_prefix(PUBLIC_URL_PREFIX)?;
    let (bucket, path) = rest.split_once('/')?;
    if !is_valid_bucket(bucket) || path.is_empty() {
        return None;
    }
    Some(ObjectRef {
        bucket: bucket.to_string(),
        path: path.to_string(),
    })
}

/// Content type for serving an object, from its file extension.
pub fn content_type_for(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or_default();
    match ext.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

/// File extension for an uploaded content type; used when generating
/// randomized object names.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpg"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://p100.example.com";

    #[test]
    fn url_roundtrip() {
        let url = public_url(BASE, "screenshots", "ab/cd.png");
        assert_eq!(
            url,
            "https://p100.example.com/storage/v1/object/public/screenshots/ab/cd.png"
        );
        let parsed = parse_public_url(BASE, &url).unwrap();
        assert_eq!(parsed.bucket, "screenshots");
        assert_eq!(parsed.path, "ab/cd.png");
    }

    #[test]
    fn trailing_slash_on_base_is_tolerated() {
        let url = public_url("https://p100.example.com/", "artworks", "x.webp");
        assert_eq!(
            parse_public_url(BASE, &url).unwrap(),
            ObjectRef {
                bucket: "artworks".into(),
                path: "x.webp".into()
            }
        );
    }

    #[test]
    fn rejects_foreign_and_malformed_urls() {
        assert!(parse_public_url(BASE, "https://other.host/storage/v1/object/public/screenshots/x.png").is_none());
        assert!(parse_public_url(BASE, &format!("{}/storage/v1/object/public/unknownbucket/x.png", BASE)).is_none());
        assert!(parse_public_url(BASE, &format!("{}/storage/v1/object/public/screenshots", BASE)).is_none());
        assert!(parse_public_url(BASE, &format!("{}/api/other", BASE)).is_none());
    }

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type_for("a/b.PNG"), "image/png");
        assert_eq!(content_type_for("c.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
        assert_eq!(extension_for("image/webp"), Some("webp"));
        assert_eq!(extension_for("text/html"), None);
    }
}
