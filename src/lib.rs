//! oscprint — a live terminal dashboard for OSC datagrams.
//!
//! Every distinct address or label gets its own row. Rows can be promoted
//! to horizontal faders (range, VU in dB, percent), reordered with natural
//! sorting, pinned to a line, or removed, all from OSC messages.

pub mod config;
pub mod error;
pub mod registry;
pub mod router;
pub mod transform;
pub mod transport;
pub mod tui;
pub mod value;
pub mod widget;
