use crate::errors::ServerError;
use crate::handlers::{compare, properties, system};
use crate::responses::ResultResp;
use crate::state::AppState;
use astra::Request;
use std::collections::HashMap;
use std::io::Read;

/// Request bodies above this size are rejected.
const MAX_BODY_BYTES: u64 = 1 << 20;

pub fn handle(mut req: Request, state: &AppState) -> ResultResp {
    let method = req.method().as_str().to_string();
    let path = req.uri().path().to_string();
    let query = parse_query(&req);

    tracing::debug!(%method, %path, "request");

    match (method.as_str(), path.as_str()) {
        ("GET", "/") => system::banner(),
        ("GET", "/health") => system::health(state),

        ("POST", "/compare-properties") => compare::compare_properties(state, &read_body(&mut req)?),

        ("GET", "/properties") => properties::list(state, &query),
        ("POST", "/properties") => properties::create(state, &read_body(&mut req)?),
        ("GET", "/properties/search") => properties::search(state, &query),
        ("GET", "/properties/export.xlsx") => properties::export_xlsx(state),
        ("GET", "/properties/stats/summary") => properties::stats_summary(state),
        ("GET", "/properties/stats/sources") => properties::stats_sources(state),

        (m, p) if p.starts_with("/properties/") => {
            let address = decode_path_segment(&p["/properties/".len()..]);
            match m {
                "GET" => properties::get(state, &address),
                "PUT" => properties::update(state, &address, &read_body(&mut req)?),
                "DELETE" => properties::delete(state, &address),
                _ => Err(ServerError::NotFound(format!("No route for {m} {p}"))),
            }
        }

        (m, p) => Err(ServerError::NotFound(format!("No route for {m} {p}"))),
    }
}

pub fn parse_query(req: &Request) -> HashMap<String, String> {
    req.uri()
        .query()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// Percent-decode one path segment. `+`, `&` and `=` are literal in a path,
/// so they are escaped before going through the form decoder.
pub fn decode_path_segment(raw: &str) -> String {
    let escaped = raw
        .replace('+', "%2B")
        .replace('&', "%26")
        .replace('=', "%3D");
    url::form_urlencoded::parse(escaped.as_bytes())
        .next()
        .map(|(k, _)| k.into_owned())
        .unwrap_or_default()
}

fn read_body(req: &mut Request) -> Result<Vec<u8>, ServerError> {
    let mut buf = Vec::new();
    req.body_mut()
        .reader()
        .take(MAX_BODY_BYTES + 1)
        .read_to_end(&mut buf)
        .map_err(|e| ServerError::BadRequest(format!("Failed to read request body: {e}")))?;

    if buf.len() as u64 > MAX_BODY_BYTES {
        return Err(ServerError::BadRequest("Request body too large".into()));
    }
    Ok(buf)
}
