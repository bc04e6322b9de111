//! Helpers for keeping log lines single-line when they embed player-supplied
//! text (display names, quest titles, kudos notes, the MOTD).

/// Escape a player-supplied string for single-line logging.
///
/// Newlines, carriage returns, tabs and backslashes are backslash-escaped;
/// any other control character becomes `\xNN`. Strings longer than
/// `max_preview` characters are truncated with an ellipsis so a pasted
/// novel cannot flood the log.
pub fn escape_log(s: &str) -> String {
    escape_log_with(s, 240)
}

pub fn escape_log_with(s: &str, max_preview: usize) -> String {
    let mut out = String::with_capacity(s.len().min(max_preview) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= max_preview {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}
