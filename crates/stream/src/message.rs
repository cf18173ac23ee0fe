// Event-stream wire framing

use bytes::{BufMut, Bytes, BytesMut};
use orbital_models::{Event, Result};

pub const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream";

const DATA_PREFIX: &[u8] = b"data: ";

/// Append one framed message: every payload line prefixed with `data: `,
/// followed by a blank line.
pub fn encode_frame(payload: &str, out: &mut BytesMut) {
    let mut wrote_line = false;
    for line in payload.lines() {
        out.put_slice(DATA_PREFIX);
        out.put_slice(line.as_bytes());
        out.put_u8(b'\n');
        wrote_line = true;
    }
    if !wrote_line {
        out.put_slice(DATA_PREFIX);
        out.put_u8(b'\n');
    }
    out.put_u8(b'\n');
}

pub fn encode_event(event: &Event, out: &mut BytesMut) -> Result<()> {
    let payload = event.to_json()?;
    encode_frame(&payload, out);
    Ok(())
}

pub fn event_frame(event: &Event) -> Result<Bytes> {
    let mut out = BytesMut::new();
    encode_event(event, &mut out)?;
    Ok(out.freeze())
}

/// Response headers sent once before the first frame. The allowed origin
/// echoes the requesting origin when one was given.
pub fn preamble_headers(origin: Option<&str>) -> Vec<(&'static str, String)> {
    vec![
        ("content-type", EVENT_STREAM_CONTENT_TYPE.to_string()),
        ("cache-control", "no-cache".to_string()),
        ("connection", "keep-alive".to_string()),
        (
            "access-control-allow-origin",
            origin.filter(|o| !o.is_empty()).unwrap_or("*").to_string(),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbital_models::Coordinates;

    #[test]
    fn test_event_frame() {
        let event = Event::new(Coordinates::new(37.77, -122.41).unwrap(), 1000, "python");
        let frame = event_frame(&event).unwrap();

        assert_eq!(&frame[..], b"data: [37.77,-122.41,1000,\"python\"]\n\n");
    }

    #[test]
    fn test_multiline_payload() {
        let mut out = BytesMut::new();
        encode_frame("a\nb", &mut out);
        assert_eq!(&out[..], b"data: a\ndata: b\n\n");
    }

    #[test]
    fn test_empty_payload() {
        let mut out = BytesMut::new();
        encode_frame("", &mut out);
        assert_eq!(&out[..], b"data: \n\n");
    }

    #[test]
    fn test_preamble_origin() {
        let origin_of = |headers: Vec<(&'static str, String)>| {
            headers
                .into_iter()
                .find(|(name, _)| *name == "access-control-allow-origin")
                .map(|(_, value)| value)
        };

        assert_eq!(origin_of(preamble_headers(None)).as_deref(), Some("*"));
        assert_eq!(
            origin_of(preamble_headers(Some("https://sentry.io"))).as_deref(),
            Some("https://sentry.io")
        );
    }
}
