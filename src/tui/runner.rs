//! TUI runner — main loop that wires everything together.
//!
//! Creates the terminal and the transport, then polls both in turn: one
//! short keyboard poll on the blocking pool, one bounded wait for
//! datagrams, one refresh if anything changed. Terminal teardown lives in
//! a drop guard so every exit path restores the terminal.

use std::io;
use std::time::Duration;

use crossterm::cursor::{Hide, Show};
use crossterm::event::{self, Event};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::{Backend, CrosstermBackend};
use tracing::{info, warn};

use crate::config::DashConfig;
use crate::error::DashResult;
use crate::registry::Registry;
use crate::router;
use crate::transport::{Transport, UdpTransport};
use crate::value::Value;

use super::dashboard::{footer_text, format_error, ERROR_LABEL};
use super::event::{DashEvent, Flow};
use super::input::{map_key, KeyAction};
use super::screen::Renderer;

/// Raw mode + alternate screen for as long as it lives.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let guard = Self;
        io::stdout().execute(EnterAlternateScreen)?.execute(Hide)?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        let _ = stdout.execute(Show);
        let _ = stdout.execute(LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

/// Everything the loop owns: the board, the screen and the transport.
pub struct Session<B: Backend, T: Transport> {
    registry: Registry,
    renderer: Renderer<B>,
    transport: T,
}

impl<B: Backend, T: Transport> Session<B, T> {
    pub fn new(config: &DashConfig, backend: B, transport: T) -> Self {
        Self {
            registry: Registry::new(
                config.label_width,
                config.fader_width,
                config.autosort,
                &footer_text(config.port),
            ),
            renderer: Renderer::new(backend),
            transport,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn renderer(&self) -> &Renderer<B> {
        &self.renderer
    }

    /// Apply one event.
    pub fn update(&mut self, event: DashEvent) -> DashResult<Flow> {
        match event {
            DashEvent::Key(KeyAction::Quit) | DashEvent::Interrupt => return Ok(Flow::Quit),
            DashEvent::Key(KeyAction::Refresh) => self.refresh(true)?,
            DashEvent::Key(KeyAction::Sort) => self.registry.sort(),
            DashEvent::Key(KeyAction::Clear) => self.registry.clear(),
            DashEvent::Inbound(message) => {
                if let Err(e) = router::route(&mut self.registry, &message) {
                    warn!(address = %message.address, error = %e, "message rejected");
                    let line = format_error(&message.address, &e);
                    self.registry.handle(ERROR_LABEL, &[Value::Text(line)], None);
                }
            }
        }
        Ok(Flow::Continue)
    }

    /// Wait up to `wait` for messages and apply them. Returns how many
    /// arrived.
    pub async fn pump(&mut self, wait: Duration) -> DashResult<usize> {
        let batch = self.transport.recv(wait).await?;
        let count = batch.len();
        for message in batch {
            self.update(DashEvent::Inbound(message))?;
        }
        Ok(count)
    }

    pub fn refresh(&mut self, force: bool) -> DashResult<()> {
        self.renderer.refresh(&mut self.registry, force)
    }

    /// Redraw if anything changed since the last refresh.
    pub fn refresh_if_needed(&mut self) -> DashResult<bool> {
        if !self.registry.needs_refresh() {
            return Ok(false);
        }
        self.refresh(false)?;
        Ok(true)
    }
}

/// Poll the keyboard once. Blocks for up to `wait`.
fn poll_key(wait: Duration) -> DashResult<Option<KeyAction>> {
    if !event::poll(wait)? {
        return Ok(None);
    }
    Ok(map_event(event::read()?))
}

/// Resizes count as a refresh request.
fn map_event(event: Event) -> Option<KeyAction> {
    match event {
        Event::Key(key) => map_key(key),
        Event::Resize(..) => Some(KeyAction::Refresh),
        _ => None,
    }
}

/// Run the dashboard until quit or interrupt.
pub async fn run(config: DashConfig) -> anyhow::Result<()> {
    let transport = UdpTransport::bind(config.port).await?;
    info!(port = config.port, "listening");

    let _guard = TerminalGuard::enter()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut session = Session::new(&config, backend, transport);
    session.refresh(true)?;

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        // crossterm's poll blocks; keep it off the runtime thread
        let wait = config.key_poll();
        let key = tokio::task::spawn_blocking(move || poll_key(wait)).await??;
        if let Some(action) = key {
            if session.update(DashEvent::Key(action))? == Flow::Quit {
                break;
            }
        }

        let received = tokio::select! {
            _ = &mut interrupt => None,
            count = session.pump(config.recv_timeout()) => Some(count?),
        };
        if received.is_none() {
            session.update(DashEvent::Interrupt)?;
            break;
        }

        session.refresh_if_needed()?;
    }

    info!("shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use ratatui::backend::TestBackend;

    use crate::transport::Message;

    /// Hands out pre-built batches, then empty ones.
    struct ScriptedTransport {
        batches: VecDeque<Vec<Message>>,
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn recv(&mut self, _wait: Duration) -> DashResult<Vec<Message>> {
            Ok(self.batches.pop_front().unwrap_or_default())
        }
    }

    fn session(batches: Vec<Vec<Message>>) -> Session<TestBackend, ScriptedTransport> {
        let config = DashConfig {
            label_width: 8,
            fader_width: 10,
            ..DashConfig::default()
        };
        let transport = ScriptedTransport {
            batches: batches.into(),
        };
        Session::new(&config, TestBackend::new(60, 10), transport)
    }

    fn print(label: &str, value: f64) -> Message {
        Message::new("/print", vec![Value::from(label), Value::Float(value)])
    }

    fn screen(s: &Session<TestBackend, ScriptedTransport>) -> String {
        let buffer = s.renderer().backend().buffer();
        buffer.content.iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn terminal_events_map_to_actions() {
        use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
        let key = KeyEvent::new(KeyCode::Char('s'), KeyModifiers::NONE);
        assert_eq!(map_event(Event::Key(key)), Some(KeyAction::Sort));
        assert_eq!(map_event(Event::Resize(80, 24)), Some(KeyAction::Refresh));
        assert_eq!(map_event(Event::FocusGained), None);
    }


        let mut s = session(vec![]);
        assert_eq!(s.update(DashEvent::Key(KeyAction::Quit)).unwrap(), Flow::Quit);
        assert_eq!(s.update(DashEvent::Interrupt).unwrap(), Flow::Quit);
        assert_eq!(s.update(DashEvent::Key(KeyAction::Sort)).unwrap(), Flow::Continue);
    }

    #[tokio::test]
    async fn pump_routes_batches() {
        let mut s = session(vec![vec![print("b", 1.0), print("a", 2.0)]]);
        assert_eq!(s.pump(Duration::from_millis(1)).await.unwrap(), 2);
        assert_eq!(s.registry().len(), 2);
        assert_eq!(s.registry().get("a").unwrap().row(), 0);
        assert_eq!(s.pump(Duration::from_millis(1)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_delivery_redraws_once() {
        let mut s = session(vec![vec![print("a", 1.0)], vec![print("a", 1.0)]]);
        s.pump(Duration::from_millis(1)).await.unwrap();
        assert!(s.refresh_if_needed().unwrap());
        s.pump(Duration::from_millis(1)).await.unwrap();
        assert!(!s.refresh_if_needed().unwrap());
    }

    #[test]
    fn rejected_message_shows_error_row() {
        let mut s = session(vec![]);
        let bogus = Message::new("/config", vec![Value::from("bogus-method"), Value::from("x")]);
        assert_eq!(s.update(DashEvent::Inbound(bogus)).unwrap(), Flow::Continue);
        let row = s.registry().get(ERROR_LABEL).unwrap();
        assert!(row.render().contains("unknown config method: bogus-method"));
        s.refresh(false).unwrap();
        assert!(screen(&s).contains("bogus-method"));
    }

    #[test]
    fn clear_key_empties_board() {
        let mut s = session(vec![]);
        s.update(DashEvent::Inbound(print("a", 1.0))).unwrap();
        s.refresh(false).unwrap();
        s.update(DashEvent::Key(KeyAction::Clear)).unwrap();
        s.refresh_if_needed().unwrap();
        assert!(s.registry().is_empty());
        let text = screen(&s);
        assert!(!text.contains("1.000000"));
        assert!(text.contains("OSC port 31415"));
    }

    #[test]
    fn refresh_key_redraws_everything() {
        let mut s = session(vec![]);
        s.update(DashEvent::Inbound(print("temp", 20.0))).unwrap();
        s.update(DashEvent::Key(KeyAction::Refresh)).unwrap();
        assert!(screen(&s).contains("temp"));
        assert!(!s.registry().needs_refresh());
    }
}
