//! Widgets — one labelled row on the dashboard.
//!
//! A widget is a plain value line until a message asks for something
//! richer. The variant lives in [`WidgetKind`]; promoting a widget swaps
//! the kind in place so the label, row and color survive.

pub mod format;

use ratatui::style::Color;

use crate::transform::{apply_chain, Transform};
use crate::value::{self, Value};

use format::{bar, fill_count, label_column};

/// Bounds of a VU meter, in dB.
pub const VU_MIN_DB: f64 = -72.0;
pub const VU_MAX_DB: f64 = 0.0;

/// Label of the status line.
pub const FOOTER_LABEL: &str = "_footer";

/// How a fader widens its bounds when a value falls outside them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Autocal {
    /// Clip into `[min, max]`.
    Off,
    /// Raise `max` when exceeded; clip below `min`.
    ExpandMax,
    /// Raise `max` and lower `min` as needed.
    ExpandBoth,
}

impl Autocal {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "off" | "none" | "0" | "false" => Some(Self::Off),
            "up" | "max" | "expand-max" => Some(Self::ExpandMax),
            "both" | "expand-both" | "1" | "true" => Some(Self::ExpandBoth),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FaderState {
    pub min: f64,
    pub max: f64,
    pub autocal: Autocal,
    pub width: usize,
    pub unit: String,
}

impl FaderState {
    pub fn new(min: f64, max: f64, autocal: Autocal, width: usize) -> Self {
        Self {
            min,
            max,
            autocal,
            width,
            unit: String::new(),
        }
    }

    /// Fit `x` into the bounds, widening them first if autocalibrating.
    /// Infinities pin to the nearer bound and never widen it.
    pub fn calibrate(&mut self, x: f64) -> f64 {
        if x.is_infinite() {
            return if x > 0.0 { self.max } else { self.min };
        }
        match self.autocal {
            Autocal::Off => x.max(self.min).min(self.max),
            Autocal::ExpandMax => {
                if x > self.max {
                    self.max = x;
                }
                x.max(self.min)
            }
            Autocal::ExpandBoth => {
                if x > self.max {
                    self.max = x;
                }
                if x < self.min {
                    self.min = x;
                }
                x
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WidgetKind {
    Line,
    Footer,
    Range(FaderState),
    Vu(FaderState),
    Percent(FaderState),
}

impl WidgetKind {
    pub fn range(min: f64, max: f64, autocal: Autocal, width: usize) -> Self {
        Self::Range(FaderState::new(min, max, autocal, width))
    }

    pub fn vu(width: usize) -> Self {
        let mut state = FaderState::new(VU_MIN_DB, VU_MAX_DB, Autocal::Off, width);
        state.unit = "dB".into();
        Self::Vu(state)
    }

    pub fn percent(width: usize) -> Self {
        let mut state = FaderState::new(0.0, 100.0, Autocal::Off, width);
        state.unit = "%".into();
        Self::Percent(state)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Footer => "footer",
            Self::Range(_) => "fader",
            Self::Vu(_) => "vu",
            Self::Percent(_) => "percent",
        }
    }

    /// Transforms every widget of this kind starts with.
    pub fn transforms(&self) -> Vec<Transform> {
        match self {
            Self::Vu(_) => vec![Transform::AmpToDb],
            Self::Percent(_) => vec![Transform::FractionToPercent],
            _ => Vec::new(),
        }
    }

    pub fn same_variant(&self, other: &WidgetKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    pub fn fader(&self) -> Option<&FaderState> {
        match self {
            Self::Range(f) | Self::Vu(f) | Self::Percent(f) => Some(f),
            _ => None,
        }
    }

    pub fn fader_mut(&mut self) -> Option<&mut FaderState> {
        match self {
            Self::Range(f) | Self::Vu(f) | Self::Percent(f) => Some(f),
            _ => None,
        }
    }
}

/// Label shown on screen: trailing separators dropped.
pub fn display_label(label: &str) -> &str {
    label.trim_end_matches(|c: char| matches!(c, '/' | ':' | '~') || c.is_whitespace())
}

/// Color a label asks for by its prefix.
pub fn label_color(label: &str) -> Option<Color> {
    if label.starts_with('!') {
        Some(Color::Red)
    } else if label.starts_with('_') {
        Some(Color::DarkGray)
    } else if label.starts_with("MIDI/") {
        Some(Color::Magenta)
    } else if label.starts_with("/firmata/") {
        Some(Color::Green)
    } else {
        None
    }
}

fn label_allows_cursor(label: &str) -> bool {
    !(label.starts_with('_') || label.starts_with('!') || label.ends_with('~'))
}

#[derive(Debug, Clone)]
pub struct Widget {
    label: String,
    display: String,
    row: u16,
    values: Vec<Value>,
    transforms: Vec<Transform>,
    kind: WidgetKind,
    color: Option<Color>,
    label_width: usize,
    seq: u64,
    pub dirty: bool,
}

impl Widget {
    pub fn new(label: &str, row: u16, kind: WidgetKind, label_width: usize) -> Self {
        Self {
            label: label.to_string(),
            display: display_label(label).to_string(),
            row,
            values: Vec::new(),
            transforms: kind.transforms(),
            kind,
            color: label_color(label),
            label_width,
            seq: 0,
            dirty: true,
        }
    }

    pub fn footer(text: &str, row: u16) -> Self {
        let mut footer = Self::new(FOOTER_LABEL, row, WidgetKind::Footer, 0);
        footer.values = vec![Value::from(text)];
        footer
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn row(&self) -> u16 {
        self.row
    }

    pub fn set_row(&mut self, row: u16) {
        if self.row != row {
            self.row = row;
            self.dirty = true;
        }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// First value as a number, if it is one.
    pub fn number(&self) -> Option<f64> {
        self.values.first().and_then(Value::as_f64)
    }

    pub fn kind(&self) -> &WidgetKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut WidgetKind {
        &mut self.kind
    }

    pub fn transforms(&self) -> &[Transform] {
        &self.transforms
    }

    pub fn is_footer(&self) -> bool {
        matches!(self.kind, WidgetKind::Footer)
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub(crate) fn stamp(&mut self, seq: u64) {
        self.seq = seq;
    }

    pub fn show_cursor(&self) -> bool {
        !matches!(self.kind, WidgetKind::Footer | WidgetKind::Vu(_))
            && label_allows_cursor(&self.label)
    }

    pub fn color(&self) -> Option<Color> {
        match self.kind {
            WidgetKind::Vu(_) => Some(Color::Yellow),
            _ => self.color,
        }
    }

    /// Fix a fader's bounds explicitly; turns autocalibration off.
    pub fn set_bounds(&mut self, min: f64, max: f64) {
        if let Some(fader) = self.kind.fader_mut() {
            if fader.min != min || fader.max != max || fader.autocal != Autocal::Off {
                fader.min = min;
                fader.max = max;
                fader.autocal = Autocal::Off;
                self.refit();
            }
        }
    }

    /// Fit the stored value into the fader's current bounds. Call after
    /// changing bounds or the autocalibration mode.
    pub fn refit(&mut self) {
        let Some(fader) = self.kind.fader_mut() else {
            return;
        };
        if let Some(first) = self.values.first_mut() {
            if let Some(x) = first.as_f64().filter(|x| !x.is_nan()) {
                let fitted = fader.calibrate(x);
                if fitted != x {
                    *first = Value::Float(fitted);
                }
            }
        }
        self.dirty = true;
    }

    pub fn add_transform(&mut self, transform: Transform) {
        self.transforms.push(transform);
    }

    /// Replace the variant. Row and label stay; values and transforms
    /// are reset to what the new variant starts with.
    pub fn promote(&mut self, kind: WidgetKind) {
        self.transforms = kind.transforms();
        self.kind = kind;
        self.values.clear();
        self.dirty = true;
    }

    /// Store a new set of raw values. Returns whether anything changed.
    pub fn set_value(&mut self, raw: &[Value]) -> bool {
        let mut values: Vec<Value> = raw
            .iter()
            .cloned()
            .map(|v| apply_chain(&self.transforms, v))
            .collect();

        if values == self.values {
            return false;
        }

        if let Some(fader) = self.kind.fader_mut() {
            if let Some(first) = values.first_mut() {
                if let Some(x) = first.as_f64().filter(|x| !x.is_nan()) {
                    let fitted = fader.calibrate(x);
                    if fitted != x {
                        *first = Value::Float(fitted);
                    }
                }
            }
            if values == self.values {
                return false;
            }
        }

        self.values = values;
        self.dirty = true;
        true
    }

    /// Filled bar cells for the current value, for fader kinds.
    pub fn fill(&self) -> Option<usize> {
        let fader = self.kind.fader()?;
        let x = self.number()?;
        Some(fill_count(x, fader.min, fader.max, fader.width))
    }

    /// Text of the row, starting at the label column.
    pub fn render(&self) -> String {
        if self.is_footer() {
            return value::join(&self.values);
        }
        let label = label_column(&self.display, self.label_width);
        match (self.kind.fader(), self.number().filter(|x| !x.is_nan())) {
            (Some(fader), Some(x)) => {
                let filled = fill_count(x, fader.min, fader.max, fader.width);
                format!(
                    "{label} {x:>9.2} {unit:<3} {bar}",
                    unit = fader.unit,
                    bar = bar(filled, fader.width)
                )
            }
            _ => format!("{label} {}", value::join(&self.values)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(label: &str) -> Widget {
        Widget::new(label, 0, WidgetKind::Line, 8)
    }

    #[test]
    fn equal_values_do_not_dirty() {
        let mut w = line("temp");
        assert!(w.set_value(&[Value::Float(20.0)]));
        w.dirty = false;
        assert!(!w.set_value(&[Value::Float(20.0)]));
        assert!(!w.dirty);
    }

    #[test]
    fn plain_line_renders_label_and_values() {
        let mut w = line("MIDI/in:");
        w.set_value(&[Value::from("noteon"), Value::Int(1), Value::Int(60)]);
        assert_eq!(w.render(), "MIDI/in  noteon 1 60");
    }

    #[test]
    fn transforms_apply_to_every_value() {
        let mut w = line("note");
        w.add_transform(Transform::MidiToNote);
        w.set_value(&[Value::Int(60), Value::Int(69)]);
        assert_eq!(w.values(), &[Value::from("C4"), Value::from("A4")]);
    }

    #[test]
    fn fader_clips_when_not_calibrating() {
        let mut w = Widget::new("f", 0, WidgetKind::range(0.0, 1.0, Autocal::Off, 10), 4);
        w.set_value(&[Value::Float(3.0)]);
        assert_eq!(w.number(), Some(1.0));
        assert_eq!(w.fill(), Some(10));
        w.dirty = false;
        // clips to the same stored value
        assert!(!w.set_value(&[Value::Float(5.0)]));
        assert!(!w.dirty);
    }

    #[test]
    fn narrowed_bounds_clip_stored_value() {
        let mut w = Widget::new("k", 0, WidgetKind::range(0.0, 100.0, Autocal::Off, 10), 4);
        w.set_value(&[Value::Float(50.0)]);
        w.dirty = false;
        w.set_bounds(0.0, 10.0);
        assert!(w.dirty);
        assert_eq!(w.number(), Some(10.0));
        assert_eq!(w.fill(), Some(10));
        // the same raw value still clips to the stored one
        w.dirty = false;
        assert!(!w.set_value(&[Value::Float(50.0)]));
        assert!(!w.dirty);
    }

    #[test]
    fn infinity_pins_to_nearer_bound() {
        let mut w = Widget::new("k", 0, WidgetKind::range(0.0, 1.0, Autocal::ExpandBoth, 10), 4);
        w.set_value(&[Value::Float(f64::INFINITY)]);
        assert_eq!(w.number(), Some(1.0));
        w.set_value(&[Value::Float(f64::NEG_INFINITY)]);
        assert_eq!(w.number(), Some(0.0));
        let fader = w.kind().fader().unwrap();
        assert_eq!((fader.min, fader.max), (0.0, 1.0));

        let mut vu = Widget::new("out", 0, WidgetKind::vu(20), 4);
        vu.set_value(&[Value::Float(f64::INFINITY)]);
        assert_eq!(vu.number(), Some(VU_MAX_DB));
        assert_eq!(vu.fill(), Some(20));
    }

    #[test]
    fn nan_fader_falls_back_to_text() {
        let mut w = Widget::new("t", 0, WidgetKind::range(0.0, 1.0, Autocal::Off, 4), 2);
        w.set_value(&[Value::Float(f64::NAN)]);
        assert_eq!(w.render(), "t  NaN");
    }

    #[test]
    fn expand_both_widens_bounds() {
        let mut w = Widget::new("f", 0, WidgetKind::range(0.0, 1.0, Autocal::ExpandBoth, 10), 4);
        w.set_value(&[Value::Float(-0.5)]);
        w.set_value(&[Value::Float(2.0)]);
        let fader = w.kind().fader().unwrap();
        assert_eq!((fader.min, fader.max), (-0.5, 2.0));
        assert_eq!(w.fill(), Some(10));
    }

    #[test]
    fn expand_max_only_raises_max() {
        let mut w = Widget::new("f", 0, WidgetKind::range(0.0, 1.0, Autocal::ExpandMax, 10), 4);
        w.set_value(&[Value::Float(-0.5)]);
        assert_eq!(w.number(), Some(0.0));
        w.set_value(&[Value::Float(4.0)]);
        let fader = w.kind().fader().unwrap();
        assert_eq!((fader.min, fader.max), (0.0, 4.0));
    }

    #[test]
    fn vu_full_scale_and_silence() {
        let mut w = Widget::new("out", 0, WidgetKind::vu(20), 4);
        w.set_value(&[Value::Float(1.0)]);
        assert_eq!(w.number(), Some(0.0));
        assert_eq!(w.fill(), Some(20));
        w.set_value(&[Value::Float(0.0)]);
        assert_eq!(w.number(), Some(VU_MIN_DB));
        assert_eq!(w.fill(), Some(0));
        assert!(!w.show_cursor());
        assert_eq!(w.color(), Some(Color::Yellow));
    }

    #[test]
    fn percent_keeps_integer_value() {
        let mut w = Widget::new("load", 0, WidgetKind::percent(10), 4);
        w.set_value(&[Value::Float(0.5)]);
        assert_eq!(w.values(), &[Value::Int(50)]);
        assert_eq!(w.fill(), Some(5));
    }

    #[test]
    fn fader_render_has_bar() {
        let mut w = Widget::new("t", 0, WidgetKind::range(0.0, 100.0, Autocal::Off, 4), 2);
        w.set_value(&[Value::Float(50.0)]);
        assert_eq!(w.render(), "t      50.00     [██··]");
    }

    #[test]
    fn non_numeric_fader_falls_back_to_text() {
        let mut w = Widget::new("t", 0, WidgetKind::range(0.0, 1.0, Autocal::Off, 4), 2);
        w.set_value(&[Value::from("n/a")]);
        assert_eq!(w.render(), "t  n/a");
        assert_eq!(w.fill(), None);
    }

    #[test]
    fn degenerate_bounds_render_empty_bar() {
        let mut w = Widget::new("t", 0, WidgetKind::range(1.0, 1.0, Autocal::Off, 3), 1);
        w.set_value(&[Value::Float(1.0)]);
        assert_eq!(w.fill(), Some(0));
        assert!(w.render().ends_with("[···]"));
    }

    #[test]
    fn promotion_replaces_transforms_and_keeps_row() {
        let mut w = Widget::new("x", 3, WidgetKind::Line, 4);
        w.add_transform(Transform::MidiToNote);
        w.promote(WidgetKind::percent(10));
        assert_eq!(w.row(), 3);
        assert_eq!(w.transforms(), &[Transform::FractionToPercent]);
        assert!(w.values().is_empty());
    }

    #[test]
    fn cursor_rules_follow_label() {
        assert!(line("temp").show_cursor());
        assert!(!line("_hidden").show_cursor());
        assert!(!line("!error").show_cursor());
        assert!(!line("quiet~").show_cursor());
        assert!(!Widget::footer("hi", 10).show_cursor());
    }

    #[test]
    fn label_prefix_colors() {
        assert_eq!(label_color("MIDI/port"), Some(Color::Magenta));
        assert_eq!(label_color("/firmata/a0"), Some(Color::Green));
        assert_eq!(label_color("temp"), None);
    }

    #[test]
    fn display_label_strips_separators() {
        assert_eq!(display_label("MIDI/in: "), "MIDI/in");
        assert_eq!(display_label("quiet~"), "quiet");
    }
}
