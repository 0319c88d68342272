use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::Response,
};

/// Gate for the /admin surface: the `X-Admin-Key` header must equal the
/// configured key. Plain string equality against the env var; the binary
/// refuses to start without a real key.
pub async fn require_admin_key(req: Request, next: Next) -> Result<Response, StatusCode> {
    let presented = req
        .headers()
        .get("x-admin-key")
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let expected = std::env::var("P100_ADMIN_KEY").map_err(|_| StatusCode::UNAUTHORIZED)?;
    if expected.is_empty() || presented != expected {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(req).await)
}
