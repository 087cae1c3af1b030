//! Value transforms — the closed catalog of converters a row can apply to
//! every incoming value before it is stored.
//!
//! Transforms are looked up by name from `config transform <label> <name>`
//! messages. Unknown names resolve to `None` and are ignored by the caller,
//! so newer producers can talk to older dashboards.

use crate::value::Value;

/// Floor of the decibel scale. Zero amplitude maps here instead of -inf.
pub const DB_FLOOR: f64 = -90.0;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// MIDI note number → note name (`60` → `C4`).
    MidiToNote,
    /// Frequency in Hz → fractional MIDI note number.
    FreqToMidi,
    /// Frequency in Hz → note name.
    FreqToNote,
    /// Linear amplitude → decibels, clipped to `[DB_FLOOR, 0]`.
    AmpToDb,
    /// Fraction → integer percent (truncated).
    FractionToPercent,
}

impl Transform {
    /// Resolve a transform by its wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "midi2note" | "m2n" => Some(Self::MidiToNote),
            "freq2midi" | "f2m" => Some(Self::FreqToMidi),
            "freq2note" | "f2n" => Some(Self::FreqToNote),
            "amp2db" | "a2db" => Some(Self::AmpToDb),
            "frac2percent" | "percent" | "%" => Some(Self::FractionToPercent),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::MidiToNote => "midi2note",
            Self::FreqToMidi => "freq2midi",
            Self::FreqToNote => "freq2note",
            Self::AmpToDb => "amp2db",
            Self::FractionToPercent => "frac2percent",
        }
    }

    /// Apply the transform. Text and non-finite numbers pass through.
    pub fn apply(self, value: Value) -> Value {
        let x = match value.as_f64() {
            Some(x) if x.is_finite() => x,
            _ => return value,
        };
        match self {
            Self::MidiToNote => Value::Text(midi_to_note(x)),
            Self::FreqToMidi => match freq_to_midi(x) {
                Some(m) => Value::Float(m),
                None => value,
            },
            Self::FreqToNote => match freq_to_midi(x) {
                Some(m) => Value::Text(midi_to_note(m)),
                None => value,
            },
            Self::AmpToDb => Value::Float(amp_to_db(x)),
            Self::FractionToPercent => Value::Int(fraction_to_percent(x)),
        }
    }
}

/// Run a value through a chain of transforms in order.
pub fn apply_chain(chain: &[Transform], value: Value) -> Value {
    chain.iter().fold(value, |v, t| t.apply(v))
}

/// Note name for a (possibly fractional) MIDI note. Off-grid notes carry
/// their deviation in cents: `60.25` → `C4+25`.
pub fn midi_to_note(midi: f64) -> String {
    let nearest = midi.round();
    let cents = ((midi - nearest) * 100.0).round() as i64;
    let n = nearest as i64;
    let name = NOTE_NAMES[n.rem_euclid(12) as usize];
    let octave = n.div_euclid(12) - 1;
    match cents {
        0 => format!("{name}{octave}"),
        c if c > 0 => format!("{name}{octave}+{c}"),
        c => format!("{name}{octave}{c}"),
    }
}

/// Fractional MIDI note for a frequency. `None` for non-positive input.
pub fn freq_to_midi(freq: f64) -> Option<f64> {
    if freq <= 0.0 {
        return None;
    }
    Some(69.0 + 12.0 * (freq / 440.0).log2())
}

pub fn amp_to_db(amp: f64) -> f64 {
    if amp <= 0.0 {
        return DB_FLOOR;
    }
    (20.0 * amp.log10()).clamp(DB_FLOOR, 0.0)
}

fn fraction_to_percent(x: f64) -> i64 {
    // 0.29 * 100 lands just under 29; snap before truncating.
    let scaled = ((x * 100.0) * 1e9).round() / 1e9;
    scaled.trunc() as i64
}
