//! Dashboard utilities — status line formatting.

use crate::error::DashError;

/// Label of the row that shows the last rejected message.
pub const ERROR_LABEL: &str = "!error";

/// Footer text: listening port plus key bindings.
pub fn footer_text(port: u16) -> String {
    format!("OSC port {port}  |  q: quit  r: refresh  s: sort  c: clear")
}

/// One-line description of a rejected message for the error row.
pub fn format_error(address: &str, err: &DashError) -> String {
    format!("{address}: {err}")
}
