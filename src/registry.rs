//! Widget registry — label → widget map and row bookkeeping.
//!
//! Every label owns exactly one widget and every live widget owns exactly
//! one row. New widgets take the lowest free row; removing a widget frees
//! its row without renumbering anyone else. With auto-sort on, every new
//! label re-sorts the whole board in natural order.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::{DashError, DashResult};
use crate::transform::Transform;
use crate::value::Value;
use crate::widget::{Autocal, Widget, WidgetKind};

/// A parsed `config` message.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigCommand {
    /// Pin the widget to a row, swapping with whoever holds it.
    LineNum(u16),
    /// Turn the widget into a range fader with these bounds.
    Range {
        min: f64,
        max: f64,
        autocal: Option<Autocal>,
        unit: Option<String>,
        width: Option<usize>,
    },
    Remove,
    /// Append a transform by name. Unknown names are ignored.
    Transform(String),
    Unit(String),
    Autocal(Autocal),
}

impl ConfigCommand {
    /// Parse a method name and its arguments (label already stripped).
    pub fn parse(method: &str, args: &[Value]) -> DashResult<Self> {
        match method {
            "linenum" => {
                let row = arg_f64(method, args, 0)?;
                if !(0.0..=u16::MAX as f64).contains(&row) {
                    return Err(invalid(method, format!("row out of range: {row}")));
                }
                Ok(Self::LineNum(row as u16))
            }
            "range" | "fader" => {
                let min = arg_f64(method, args, 0)?;
                let max = arg_f64(method, args, 1)?;
                let autocal = match args.get(2) {
                    Some(v) => Some(parse_autocal(method, v)?),
                    None => None,
                };
                let unit = args.get(3).map(|v| v.to_string());
                let width = match args.get(4) {
                    Some(v) => match v.as_f64() {
                        Some(w) if w >= 1.0 => Some(w as usize),
                        _ => return Err(invalid(method, format!("bad width: {v}"))),
                    },
                    None => None,
                };
                Ok(Self::Range {
                    min,
                    max,
                    autocal,
                    unit,
                    width,
                })
            }
            "remove" => Ok(Self::Remove),
            "transform" => Ok(Self::Transform(arg_str(method, args, 0)?.to_string())),
            "unit" => Ok(Self::Unit(
                args.first()
                    .map(|v| v.to_string())
                    .ok_or_else(|| missing(method, 0))?,
            )),
            "autocal" => {
                let v = args.first().ok_or_else(|| missing(method, 0))?;
                Ok(Self::Autocal(parse_autocal(method, v)?))
            }
            other => Err(DashError::UnknownMethod(other.to_string())),
        }
    }
}

fn missing(method: &str, index: usize) -> DashError {
    DashError::MissingArgument {
        method: method.to_string(),
        index,
    }
}

fn invalid(method: &str, reason: String) -> DashError {
    DashError::InvalidArgument {
        method: method.to_string(),
        reason,
    }
}

fn arg_f64(method: &str, args: &[Value], index: usize) -> DashResult<f64> {
    let value = args.get(index).ok_or_else(|| missing(method, index))?;
    value
        .as_f64()
        .ok_or_else(|| invalid(method, format!("expected a number, got {value}")))
}

fn arg_str<'a>(method: &str, args: &'a [Value], index: usize) -> DashResult<&'a str> {
    let value = args.get(index).ok_or_else(|| missing(method, index))?;
    value
        .as_str()
        .ok_or_else(|| invalid(method, format!("expected text, got {value}")))
}

fn parse_autocal(method: &str, value: &Value) -> DashResult<Autocal> {
    let name = value.to_string();
    Autocal::from_name(&name).ok_or_else(|| invalid(method, format!("bad autocal mode: {name}")))
}

/// Compare two labels so embedded numbers order by value: `ch2` < `ch10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (ca, cb) = (chunks(a), chunks(b));
    for (x, y) in ca.iter().zip(cb.iter()) {
        let ord = if is_digits(x) && is_digits(y) {
            numeric_cmp(x, y)
        } else {
            x.cmp(y)
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    ca.len().cmp(&cb.len()).then_with(|| a.cmp(b))
}

fn is_digits(s: &str) -> bool {
    s.as_bytes().first().is_some_and(u8::is_ascii_digit)
}

fn numeric_cmp(x: &str, y: &str) -> Ordering {
    let x = x.trim_start_matches('0');
    let y = y.trim_start_matches('0');
    x.len().cmp(&y.len()).then_with(|| x.cmp(y))
}

/// Split into alternating runs of ASCII digits and everything else.
fn chunks(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_digits = None;
    for (i, c) in s.char_indices() {
        let digit = c.is_ascii_digit();
        if in_digits.is_some_and(|d| d != digit) {
            out.push(&s[start..i]);
            start = i;
        }
        in_digits = Some(digit);
    }
    if start < s.len() {
        out.push(&s[start..]);
    }
    out
}

pub struct Registry {
    widgets: HashMap<String, Widget>,
    footer: Widget,
    label_width: usize,
    fader_width: usize,
    autosort: bool,
    seq: u64,
    /// A row was vacated or reshuffled; stale screen rows need clearing.
    layout_changed: bool,
    /// The whole screen must be redrawn.
    force_redraw: bool,
}

impl Registry {
    pub fn new(label_width: usize, fader_width: usize, autosort: bool, footer_text: &str) -> Self {
        Self {
            widgets: HashMap::new(),
            footer: Widget::footer(footer_text, 0),
            label_width,
            fader_width,
            autosort,
            seq: 0,
            layout_changed: false,
            force_redraw: true,
        }
    }

    pub fn get(&self, label: &str) -> Option<&Widget> {
        self.widgets.get(label)
    }

    /// Number of widgets, footer excluded.
    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    pub fn footer(&self) -> &Widget {
        &self.footer
    }

    pub fn set_footer_row(&mut self, row: u16) {
        self.footer.set_row(row);
    }

    pub fn fader_width(&self) -> usize {
        self.fader_width
    }

    /// All widgets, footer last.
    pub fn widgets(&self) -> impl Iterator<Item = &Widget> {
        self.widgets.values().chain(std::iter::once(&self.footer))
    }

    pub fn widgets_mut(&mut self) -> impl Iterator<Item = &mut Widget> {
        self.widgets
            .values_mut()
            .chain(std::iter::once(&mut self.footer))
    }

    pub fn needs_refresh(&self) -> bool {
        self.force_redraw || self.layout_changed || self.widgets().any(|w| w.dirty)
    }

    /// Consume the forced-redraw request.
    pub fn take_force_redraw(&mut self) -> bool {
        std::mem::take(&mut self.force_redraw)
    }

    /// Called by the renderer once the screen matches the registry.
    pub fn mark_clean(&mut self) {
        self.layout_changed = false;
        self.force_redraw = false;
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn occupied_rows(&self) -> HashSet<u16> {
        self.widgets.values().map(Widget::row).collect()
    }

    /// Lowest row no widget holds.
    fn free_row(&self) -> u16 {
        let used = self.occupied_rows();
        (0..u16::MAX).find(|r| !used.contains(r)).unwrap_or(u16::MAX)
    }

    fn label_at(&self, row: u16) -> Option<String> {
        self.widgets
            .iter()
            .find(|(_, w)| w.row() == row)
            .map(|(label, _)| label.clone())
    }

    /// Look up `label`, creating a plain line if it is new.
    fn ensure(&mut self, label: &str, explicit_row: Option<u16>) -> &mut Widget {
        if !self.widgets.contains_key(label) {
            let row = match explicit_row {
                Some(row) => {
                    if let Some(occupant) = self.label_at(row) {
                        let free = self.free_row();
                        if let Some(w) = self.widgets.get_mut(&occupant) {
                            w.set_row(free);
                        }
                    }
                    row
                }
                None => self.free_row(),
            };
            debug!(label, row, "widget created");
            self.widgets.insert(
                label.to_string(),
                Widget::new(label, row, WidgetKind::Line, self.label_width),
            );
            if explicit_row.is_none() && self.autosort {
                self.sort();
            }
        }
        let label_width = self.label_width;
        self.widgets
            .entry(label.to_string())
            .or_insert_with(|| Widget::new(label, 0, WidgetKind::Line, label_width))
    }

    /// Route values to a label, creating its widget on first sight.
    pub fn handle(&mut self, label: &str, values: &[Value], explicit_row: Option<u16>) -> &Widget {
        let seq = self.next_seq();
        let widget = self.ensure(label, explicit_row);
        if widget.set_value(values) {
            widget.stamp(seq);
        }
        widget
    }

    /// Make sure `label` is a widget of `kind`'s variant. An existing widget
    /// of the same variant is left alone.
    pub fn promote(&mut self, label: &str, kind: WidgetKind) -> &mut Widget {
        let widget = self.ensure(label, None);
        if !widget.kind().same_variant(&kind) {
            debug!(label, from = widget.kind().name(), to = kind.name(), "widget promoted");
            widget.promote(kind);
        }
        widget
    }

    /// Store values on an existing or new widget without changing its kind.
    pub fn set_value(&mut self, label: &str, values: &[Value]) -> bool {
        let seq = self.next_seq();
        let widget = self.ensure(label, None);
        let changed = widget.set_value(values);
        if changed {
            widget.stamp(seq);
        }
        changed
    }

    /// Parse and apply a `config` message.
    pub fn configure(&mut self, method: &str, label: &str, args: &[Value]) -> DashResult<()> {
        let command = ConfigCommand::parse(method, args)?;
        self.apply(label, command);
        Ok(())
    }

    pub fn apply(&mut self, label: &str, command: ConfigCommand) {
        match command {
            ConfigCommand::LineNum(row) => self.pin(label, row),
            ConfigCommand::Range {
                min,
                max,
                autocal,
                unit,
                width,
            } => {
                let autocal = autocal.unwrap_or(Autocal::Off);
                let width = width.unwrap_or(self.fader_width);
                let widget = self.promote(label, WidgetKind::range(min, max, autocal, width));
                if let Some(fader) = widget.kind_mut().fader_mut() {
                    fader.min = min;
                    fader.max = max;
                    fader.autocal = autocal;
                    fader.width = width;
                    if let Some(unit) = unit {
                        fader.unit = unit;
                    }
                }
                widget.refit();
            }
            ConfigCommand::Remove => self.remove(label),
            ConfigCommand::Transform(name) => {
                let widget = self.ensure(label, None);
                match Transform::from_name(&name) {
                    Some(t) => {
                        debug!(label, transform = t.name(), "transform added");
                        widget.add_transform(t);
                    }
                    None => debug!(label, name = %name, "unknown transform ignored"),
                }
            }
            // VU and percent faders keep their fixed scale; only range
            // faders take a unit or an autocal mode.
            ConfigCommand::Unit(unit) => {
                let widget = self.ensure(label, None);
                if let WidgetKind::Range(fader) = widget.kind_mut() {
                    fader.unit = unit;
                    widget.dirty = true;
                }
            }
            ConfigCommand::Autocal(mode) => {
                let widget = self.ensure(label, None);
                if let WidgetKind::Range(fader) = widget.kind_mut() {
                    fader.autocal = mode;
                    widget.refit();
                }
            }
        }
    }

    /// Pin `label` to `row`; a widget already there takes the old row.
    pub fn pin(&mut self, label: &str, row: u16) {
        if !self.widgets.contains_key(label) {
            self.ensure(label, Some(row));
            return;
        }
        let old = self.widgets.get(label).map(Widget::row).unwrap_or(row);
        if old == row {
            return;
        }
        if let Some(occupant) = self.label_at(row) {
            if let Some(w) = self.widgets.get_mut(&occupant) {
                w.set_row(old);
            }
        } else {
            self.layout_changed = true;
        }
        if let Some(w) = self.widgets.get_mut(label) {
            w.set_row(row);
        }
    }

    pub fn remove(&mut self, label: &str) {
        if let Some(w) = self.widgets.remove(label) {
            debug!(label, row = w.row(), "widget removed");
            self.layout_changed = true;
        }
    }

    /// Reassign rows `0..N` in natural label order.
    pub fn sort(&mut self) {
        let mut labels: Vec<String> = self.widgets.keys().cloned().collect();
        labels.sort_by(|a, b| natural_cmp(a, b));
        for (row, label) in labels.iter().enumerate() {
            if let Some(w) = self.widgets.get_mut(label) {
                w.set_row(row.min(u16::MAX as usize) as u16);
            }
        }
        self.layout_changed = true;
        debug!(count = labels.len(), "widgets sorted");
    }

    /// Drop every widget but the footer and redraw from scratch.
    pub fn clear(&mut self) {
        self.widgets.clear();
        self.footer.dirty = true;
        self.force_redraw = true;
        debug!("registry cleared");
    }
}
