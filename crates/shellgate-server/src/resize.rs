//! The resize control embedded in the input stream: `ESC [ 8 ; rows ; cols t`
//! (xterm's "resize text area" window operation).

use shellgate_pty::WindowSize;

const PREFIX: &str = "\x1b[8;";
const SUFFIX: char = 't';

/// Parse a whole text message as a resize control.
///
/// Returns `None` unless the message is exactly the control sequence with
/// two integers that fit the pty's dimension type. Such messages are
/// ordinary input and must be forwarded unchanged.
pub fn parse_resize(message: &str) -> Option<WindowSize> {
    let body = message.strip_prefix(PREFIX)?.strip_suffix(SUFFIX)?;
    let (rows, cols) = body.split_once(';')?;
    Some(WindowSize::new(parse_dimension(rows)?, parse_dimension(cols)?))
}

fn parse_dimension(field: &str) -> Option<u16> {
    // `u16::from_str` also takes a leading '+'; plain digits only.
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

/// Encode a resize control, as a client would send it.
pub fn encode_resize(size: WindowSize) -> String {
    format!("{PREFIX}{};{}{SUFFIX}", size.rows, size.cols)
}
