use axum::{
    async_trait,
    body::{Bytes, HttpBody},
    extract::FromRequest,
    http::{header::CONTENT_TYPE, HeaderMap, Request},
    BoxError,
};
use serde_json::Value;
use tracing::warn;

use super::Error;

/// Body of a reset request. A body that is absent, empty or not declared as
/// JSON carries no email, same as `{}`.
#[derive(Debug, Default)]
pub struct ResetRequest {
    pub email: Option<String>,
}

fn is_json(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };

    let essence = content_type.split(';').next().unwrap_or_default().trim();

    essence.eq_ignore_ascii_case("application/json")
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}

/// `null`, `false`, `0` and `""` count as no email.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

impl TryFrom<Value> for ResetRequest {
    type Error = Error;

    fn try_from(mut body: Value) -> Result<Self, Error> {
        let email = match body.get_mut("email").map(Value::take) {
            None => None,
            Some(v) if is_falsy(&v) => None,
            Some(Value::String(email)) => Some(email),
            Some(other) => {
                warn!("rejected request body: email is not a string: {other}");
                return Err(Error::InvalidBody("Email address must be a string.".into()));
            }
        };

        Ok(Self { email })
    }
}

#[async_trait]
impl<S, B> FromRequest<S, B> for ResetRequest
where
    B: HttpBody + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request<B>, state: &S) -> Result<Self, Self::Rejection> {
        let json = is_json(req.headers());

        let body = Bytes::from_request(req, state).await.map_err(|e| {
            warn!("rejected request body: {e}");
            Error::InvalidBody(e.body_text())
        })?;

        if !json || body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        let value: Value = serde_json::from_slice(&body).map_err(|e| {
            warn!("rejected request body: {e}");
            Error::InvalidBody(format!("Failed to parse the request body as JSON: {e}"))
        })?;

        value.try_into()
    }
}
