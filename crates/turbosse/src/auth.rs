//! HTTP basic credentials.

use base64::{Engine as _, engine::general_purpose::STANDARD};

/// Build an `Authorization` header value for HTTP basic authentication.
///
/// The credentials are joined with a colon and encoded with the standard
/// base64 alphabet (with padding).
///
/// ```
/// use turbosse::basic_auth_header;
///
/// assert_eq!(
///     basic_auth_header("Aladdin", "open sesame"),
///     "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ=="
/// );
/// ```
pub fn basic_auth_header(username: &str, password: &str) -> String {
    let credentials = format!("{username}:{password}");
    format!("Basic {}", STANDARD.encode(credentials.as_bytes()))
}
