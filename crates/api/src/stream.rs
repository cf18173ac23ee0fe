use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header::ORIGIN, HeaderMap, HeaderValue, StatusCode},
    response::Response,
};
use orbital_stream::{preamble_headers, StreamWriter};

use crate::routes::AppState;

/// `GET /stream`: register a subscriber and stream its events until the
/// peer goes away or the server shuts down.
pub async fn stream_events(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Response {
    let remote_addr = connect_info.map(|ConnectInfo(addr)| addr);
    let origin = headers.get(ORIGIN).and_then(|value| value.to_str().ok());

    let subscription = state.hub.subscribe(remote_addr);
    let mut writer = StreamWriter::new(subscription, state.shutdown.clone());
    if let Some(interval) = state.keep_alive {
        writer = writer.with_keep_alive(interval);
    }

    let mut response = Response::new(Body::from_stream(writer.into_stream()));
    *response.status_mut() = StatusCode::OK;

    let response_headers = response.headers_mut();
    for (name, value) in preamble_headers(origin) {
        match HeaderValue::from_str(&value) {
            Ok(value) => {
                response_headers.insert(name, value);
            }
            Err(_) => tracing::debug!(header = name, "Skipping unrepresentable header value"),
        }
    }

    response
}
