//! Server-rendered page support.
//!
//! The portal is an API-first service; the only server-rendered page is the
//! login form, which needs to carry its CSRF token and visibility notices
//! without a client bundle.

use axum::response::{IntoResponse, Response};

/// Wrapper that renders an askama template into an HTML response.
pub struct HtmlTemplate<T>(pub T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: askama::Template,
{
    fn into_response(self) -> Response {
        use axum::response::Html;

        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => {
                tracing::error!("Template rendering error: {}", err);
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Template error: {}", err),
                )
                    .into_response()
            }
        }
    }
}
