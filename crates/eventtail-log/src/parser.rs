use serde_json::Value;

use eventtail_types::Event;

/// Parse raw log bytes into events, one JSON value per line
///
/// Blank lines are skipped. Lines that are not valid JSON are dropped,
/// so a corrupt or half-written line never affects its neighbours.
pub fn parse_events(bytes: &[u8]) -> Vec<Event> {
    bytes
        .split(|b| *b == b'\n')
        .filter_map(parse_line)
        .collect()
}

/// Try to parse a single line (without its newline) as JSON
fn parse_line(line: &[u8]) -> Option<Event> {
    // Invalid UTF-8 is replaced rather than rejecting the whole line
    let text = String::from_utf8_lossy(line);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => Some(Event::new(value)),
        Err(err) => {
            tracing::trace!(error = %err, len = line.len(), "skipping malformed event line");
            None
        }
    }
}
