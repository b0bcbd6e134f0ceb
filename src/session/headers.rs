use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT,
};

use crate::utils::error::TransportError;

/// Browser-like User-Agent sent when the config does not override it
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_14_0) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/69.0.3497.100 Safari/537.36";

/// Accept-Language sent when the config does not override it
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "ru,en-US;q=0.9,en;q=0.8";

/// Content type of the applicant form submission
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Build the headers attached to every request of the session
///
/// # Examples
///
/// ```
/// use rezerwacje::session::headers::build_default_headers;
///
/// let headers = build_default_headers("Mozilla/5.0", "pl-PL,pl;q=0.9").unwrap();
/// assert_eq!(headers["accept-language"], "pl-PL,pl;q=0.9");
/// ```
pub fn build_default_headers(
    user_agent: &str,
    accept_language: &str,
) -> Result<HeaderMap, TransportError> {
    let mut headers = HeaderMap::new();

    headers.insert(USER_AGENT, header_value(user_agent)?);
    headers.insert(ACCEPT_LANGUAGE, header_value(accept_language)?);
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );

    Ok(headers)
}

/// Convert per-request header pairs into a `HeaderMap`
pub fn build_request_headers(pairs: &[(String, String)]) -> Result<HeaderMap, TransportError> {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::InvalidHeader(format!("{name}: {e}")))?;
        headers.insert(name, header_value(value)?);
    }
    Ok(headers)
}

/// Header pair marking a request as AJAX, required by the slot listing endpoint
pub fn xhr_header() -> (String, String) {
    ("X-Requested-With".to_string(), "XMLHttpRequest".to_string())
}

/// Header pair for JSON bodies
pub fn json_content_type() -> (String, String) {
    (CONTENT_TYPE.as_str().to_string(), JSON_CONTENT_TYPE.to_string())
}

fn header_value(value: &str) -> Result<HeaderValue, TransportError> {
    HeaderValue::from_str(value).map_err(|e| TransportError::InvalidHeader(format!("{value}: {e}")))
}
