//! Directory index rendering.
//!
//! Names are written as-is into both the link target and the link text.
//! They are not HTML-escaped.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};

pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// One `<a>` per entry, in the order given.
pub fn render_directory<S: AsRef<str>>(entries: &[S]) -> Vec<u8> {
    let mut page = String::from("<html>");
    for entry in entries {
        let name = entry.as_ref();
        page.push_str("<a href='");
        page.push_str(name);
        page.push_str("'>");
        page.push_str(name);
        page.push_str("</a><br/>\n");
    }
    page.push_str("</html>");
    page.into_bytes()
}

pub fn directory_response(page: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static(HTML_CONTENT_TYPE),
        )],
        page,
    )
        .into_response()
}
