//! Incremental renderer — redraws only rows whose widgets changed.
//!
//! Works directly against a ratatui [`Backend`] rather than a `Terminal`:
//! every row is a cursor move, a clear-to-end-of-line and one styled
//! write, and the backend is flushed once per refresh. Column 0 is
//! reserved for the cursor indicator that follows the most recently
//! updated row.

use std::collections::{BTreeSet, HashSet};
use std::fmt::Display;

use ratatui::backend::{Backend, ClearType};
use ratatui::buffer::Buffer;
use ratatui::layout::{Position, Rect};
use ratatui::style::{Modifier, Style};

use crate::error::{DashError, DashResult};
use crate::registry::Registry;

/// Column where widget text starts.
pub const LABEL_COLUMN: u16 = 1;
pub const CURSOR_GLYPH: &str = ">";

fn term<E: Display>(e: E) -> DashError {
    DashError::Terminal(e.to_string())
}

pub struct Renderer<B: Backend> {
    backend: B,
    width: u16,
    cursor_row: Option<u16>,
    /// Rows currently showing something.
    drawn: BTreeSet<u16>,
}

impl<B: Backend> Renderer<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            width: 0,
            cursor_row: None,
            drawn: BTreeSet::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Row currently carrying the cursor indicator.
    pub fn cursor_row(&self) -> Option<u16> {
        self.cursor_row
    }

    /// Bring the screen in line with the registry.
    ///
    /// `force` (or a pending clear in the registry) wipes the screen,
    /// re-reads the terminal size and moves the footer to the last row.
    pub fn refresh(&mut self, registry: &mut Registry, force: bool) -> DashResult<()> {
        let force = registry.take_force_redraw() || force;
        let size = self.backend.size().map_err(term)?;
        self.width = size.width;
        let footer_row = size.height.saturating_sub(1);

        if force {
            self.backend.clear().map_err(term)?;
            self.drawn.clear();
            self.cursor_row = None;
            registry.set_footer_row(footer_row);
        }

        let live: HashSet<u16> = registry.widgets().map(|w| w.row()).collect();
        let stale: Vec<u16> = self
            .drawn
            .iter()
            .copied()
            .filter(|row| !live.contains(row))
            .collect();
        for row in stale {
            self.clear_row(row, 0)?;
            self.drawn.remove(&row);
            if self.cursor_row == Some(row) {
                self.cursor_row = None;
            }
        }

        // (seq, row) of the newest cursor-eligible widget drawn this pass
        let mut newest: Option<(u64, u16)> = None;
        for widget in registry.widgets_mut() {
            if !(widget.dirty || force) {
                continue;
            }
            widget.dirty = false;
            let row = widget.row();
            let footer = widget.is_footer();
            if !footer && row >= footer_row {
                continue;
            }
            let style = widget
                .color()
                .map_or_else(Style::default, |c| Style::default().fg(c));
            let column = if footer { 0 } else { LABEL_COLUMN };
            self.clear_row(row, column)?;
            self.put(column, row, &widget.render(), style)?;
            self.drawn.insert(row);

            if widget.show_cursor() {
                match newest {
                    Some((seq, _)) if seq >= widget.seq() => {}
                    _ => newest = Some((widget.seq(), row)),
                }
            }
        }

        // the holder may have been promoted or its row taken by a widget
        // that never shows the cursor
        if let Some(row) = self.cursor_row {
            if !registry.widgets().any(|w| w.row() == row && w.show_cursor()) {
                self.put(0, row, " ", Style::default())?;
                self.cursor_row = None;
            }
        }

        if let Some((_, row)) = newest {
            if self.cursor_row != Some(row) {
                if let Some(old) = self.cursor_row {
                    self.put(0, old, " ", Style::default())?;
                }
                self.put(
                    0,
                    row,
                    CURSOR_GLYPH,
                    Style::default().add_modifier(Modifier::BOLD),
                )?;
                self.cursor_row = Some(row);
            }
        }

        self.backend.flush().map_err(term)?;
        registry.mark_clean();
        Ok(())
    }

    fn clear_row(&mut self, row: u16, column: u16) -> DashResult<()> {
        self.backend
            .set_cursor_position(Position::new(column, row))
            .map_err(term)?;
        self.backend
            .clear_region(ClearType::UntilNewLine)
            .map_err(term)
    }

    /// Write `text` at `(x, y)`, cut at the right edge of the screen.
    fn put(&mut self, x: u16, y: u16, text: &str, style: Style) -> DashResult<()> {
        let room = self.width.saturating_sub(x);
        if room == 0 {
            return Ok(());
        }
        let mut line = Buffer::empty(Rect::new(x, y, room, 1));
        let (end, _) = line.set_stringn(x, y, text, room as usize, style);
        let cells = (x..end).filter_map(|cx| line.cell((cx, y)).map(|cell| (cx, y, cell)));
        self.backend.draw(cells).map_err(term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use crate::widget::{Autocal, WidgetKind};
    use ratatui::backend::TestBackend;

    fn setup() -> (Registry, Renderer<TestBackend>) {
        let registry = Registry::new(8, 10, false, "OSC port 31415");
        let renderer = Renderer::new(TestBackend::new(40, 6));
        (registry, renderer)
    }

    fn row_text(renderer: &Renderer<TestBackend>, row: u16) -> String {
        let buffer = renderer.backend().buffer();
        (0..buffer.area.width)
            .map(|x| buffer[(x, row)].symbol().to_string())
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    #[test]
    fn first_refresh_draws_rows_and_footer() {
        let (mut reg, mut r) = setup();
        reg.handle("temp", &[Value::Int(20)], None);
        r.refresh(&mut reg, false).unwrap();
        assert_eq!(row_text(&r, 0), ">temp     20");
        assert_eq!(row_text(&r, 5), "OSC port 31415");
        assert!(!reg.needs_refresh());
    }

    #[test]
    fn clean_widgets_are_not_redrawn() {
        let (mut reg, mut r) = setup();
        reg.handle("a", &[Value::Int(1)], None);
        r.refresh(&mut reg, false).unwrap();
        // scribble over the row; a clean refresh must leave it alone
        r.put(1, 0, "scribble", Style::default()).unwrap();
        reg.handle("a", &[Value::Int(1)], None);
        assert!(!reg.needs_refresh());
        r.refresh(&mut reg, false).unwrap();
        assert_eq!(row_text(&r, 0), ">scribble 1");
    }

    #[test]
    fn cursor_follows_latest_update() {
        let (mut reg, mut r) = setup();
        reg.handle("a", &[Value::Int(1)], None);
        reg.handle("b", &[Value::Int(1)], None);
        r.refresh(&mut reg, false).unwrap();
        assert_eq!(r.cursor_row(), Some(1));
        reg.handle("a", &[Value::Int(2)], None);
        r.refresh(&mut reg, false).unwrap();
        assert_eq!(r.cursor_row(), Some(0));
        assert!(row_text(&r, 0).starts_with('>'));
        assert!(row_text(&r, 1).starts_with(' '));
    }

    #[test]
    fn hidden_labels_never_take_cursor() {
        let (mut reg, mut r) = setup();
        reg.handle("a", &[Value::Int(1)], None);
        r.refresh(&mut reg, false).unwrap();
        reg.handle("_sys", &[Value::Int(1)], None);
        r.refresh(&mut reg, false).unwrap();
        assert_eq!(r.cursor_row(), Some(0));
    }

    #[test]
    fn cursor_leaves_row_promoted_to_vu() {
        let (mut reg, mut r) = setup();
        reg.handle("a", &[Value::Int(1)], None);
        r.refresh(&mut reg, false).unwrap();
        assert_eq!(r.cursor_row(), Some(0));
        reg.promote("a", WidgetKind::vu(10));
        reg.set_value("a", &[Value::Float(1.0)]);
        r.refresh(&mut reg, false).unwrap();
        assert_eq!(r.cursor_row(), None);
        assert!(row_text(&r, 0).starts_with(' '));
    }

    #[test]
    fn cursor_leaves_row_taken_by_hidden_label() {
        let (mut reg, mut r) = setup();
        reg.handle("a", &[Value::Int(1)], None);
        r.refresh(&mut reg, false).unwrap();
        reg.remove("a");
        reg.handle("_sys", &[Value::Int(2)], None);
        assert_eq!(reg.get("_sys").unwrap().row(), 0);
        r.refresh(&mut reg, false).unwrap();
        assert_eq!(r.cursor_row(), None);
        assert_eq!(row_text(&r, 0), " _sys     2");
    }

    #[test]
    fn removed_rows_are_blanked() {
        let (mut reg, mut r) = setup();
        reg.handle("a", &[Value::Int(1)], None);
        reg.handle("b", &[Value::Int(2)], None);
        r.refresh(&mut reg, false).unwrap();
        reg.remove("b");
        assert!(reg.needs_refresh());
        r.refresh(&mut reg, false).unwrap();
        assert_eq!(row_text(&r, 1), "");
        assert_eq!(row_text(&r, 0), " a        1");
    }

    #[test]
    fn fader_row_shows_bar() {
        let (mut reg, mut r) = setup();
        reg.promote("f", WidgetKind::range(0.0, 1.0, Autocal::Off, 10));
        reg.set_value("f", &[Value::Float(0.5)]);
        r.refresh(&mut reg, false).unwrap();
        assert!(row_text(&r, 0).contains("[█████·····]"));
    }

    #[test]
    fn forced_refresh_moves_footer_after_resize() {
        let (mut reg, mut r) = setup();
        r.refresh(&mut reg, false).unwrap();
        r.backend_mut().resize(40, 8);
        r.refresh(&mut reg, true).unwrap();
        assert_eq!(reg.footer().row(), 7);
        assert_eq!(row_text(&r, 7), "OSC port 31415");
    }

    #[test]
    fn rows_below_footer_are_skipped() {
        let (mut reg, mut r) = setup();
        for i in 0..8 {
            reg.handle(&format!("w{i}"), &[Value::Int(i)], None);
        }
        r.refresh(&mut reg, false).unwrap();
        assert_eq!(row_text(&r, 5), "OSC port 31415");
    }
}
