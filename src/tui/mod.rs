//! Terminal front end — the live board.
//!
//! One row per label, one footer row at the bottom. Rows are redrawn only
//! when their content changed; the whole screen only on request.
//!
//! ## Loop
//!
//! `runner` polls keys and the transport, feeds [`event::DashEvent`]s to a
//! [`runner::Session`], then asks [`screen::Renderer`] to repaint whatever
//! went dirty.

pub mod dashboard;
pub mod event;
pub mod input;
pub mod runner;
pub mod screen;
