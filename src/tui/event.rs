//! Events that drive the dashboard.
//!
//! The runner turns keypresses, decoded datagrams and the interrupt signal
//! into `DashEvent`s and feeds them one at a time to
//! [`Session::update`](super::runner::Session::update).

use crate::transport::Message;

use super::input::KeyAction;

#[derive(Debug, Clone)]
pub enum DashEvent {
    /// A bound key was pressed.
    Key(KeyAction),
    /// A message arrived on the transport.
    Inbound(Message),
    /// SIGINT from outside the terminal.
    Interrupt,
}

/// Whether the loop keeps going after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}
