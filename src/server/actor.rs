//! Identity of the user performing a request.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::debug;

use crate::error::SocialError;
use crate::social_store::UserId;

pub const HEADER_USER_ID_KEY: &str = "X-User-Id";

/// The acting user, taken from the `X-User-Id` header set by the upstream gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor(pub UserId);

fn extract_actor(parts: &Parts) -> Option<Actor> {
    let value = parts.headers.get(HEADER_USER_ID_KEY)?;
    let value = match value.to_str() {
        Ok(value) => value,
        Err(_) => {
            debug!("Non-ASCII {} header", HEADER_USER_ID_KEY);
            return None;
        }
    };
    match value.trim().parse::<UserId>() {
        Ok(id) if id > 0 => Some(Actor(id)),
        _ => {
            debug!("Invalid {} header: {}", HEADER_USER_ID_KEY, value);
            None
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = SocialError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        extract_actor(parts).ok_or(SocialError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/v1/posts");
        if let Some(value) = header {
            builder = builder.header(HEADER_USER_ID_KEY, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn reads_numeric_user_id() {
        assert_eq!(extract_actor(&parts_with(Some("42"))), Some(Actor(42)));
        assert_eq!(extract_actor(&parts_with(Some(" 7 "))), Some(Actor(7)));
    }

    #[test]
    fn rejects_missing_or_malformed_header() {
        assert_eq!(extract_actor(&parts_with(None)), None);
        assert_eq!(extract_actor(&parts_with(Some("abc"))), None);
        assert_eq!(extract_actor(&parts_with(Some("0"))), None);
        assert_eq!(extract_actor(&parts_with(Some("-3"))), None);
    }

    #[tokio::test]
    async fn rejection_is_unauthenticated() {
        let mut parts = parts_with(None);
        let err = Actor::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert!(matches!(err, SocialError::Unauthenticated));
    }
}
