//! Message router — maps OSC addresses onto registry operations.
//!
//! | address                               | args                     |
//! |---------------------------------------|--------------------------|
//! | `/print`, `/value-print`              | label, values…           |
//! | `/config`                             | method, label, args…     |
//! | `/fader-print`                        | label, value, [min, max] |
//! | `/vu-print`                           | label, amplitude         |
//! | `/percent-print`, `/percentage-print` | label, fraction          |
//! | `/clear`                              | —                        |
//! | `/sort`                               | —                        |
//!
//! Any other address is shown as a row labelled with the address itself.

use tracing::trace;

use crate::error::{DashError, DashResult};
use crate::registry::Registry;
use crate::transport::Message;
use crate::value::Value;
use crate::widget::{Autocal, WidgetKind};

/// Bounds a fader starts with when the message gives none.
const DEFAULT_BOUNDS: (f64, f64) = (0.0, 1.0);

/// Apply one message to the registry.
pub fn route(registry: &mut Registry, message: &Message) -> DashResult<()> {
    let address = message.address.as_str();
    let args = message.args.as_slice();
    trace!(address, argc = args.len(), "routing");

    match address.strip_prefix('/').unwrap_or(address) {
        "print" | "value-print" => {
            let (label, values) = split_label(address, args, 0)?;
            registry.handle(label, values, None);
        }
        "config" => {
            let method = text_arg(address, args, 0)?;
            let (label, rest) = split_label(address, args, 1)?;
            registry.configure(method, label, rest)?;
        }
        "fader-print" => fader_print(registry, address, args)?,
        "vu-print" => {
            let (label, values) = split_label(address, args, 0)?;
            let value = first_value(address, values)?;
            let width = registry.fader_width();
            registry.promote(label, WidgetKind::vu(width));
            registry.set_value(label, std::slice::from_ref(value));
        }
        "percent-print" | "percentage-print" => {
            let (label, values) = split_label(address, args, 0)?;
            let value = first_value(address, values)?;
            let width = registry.fader_width();
            registry.promote(label, WidgetKind::percent(width));
            registry.set_value(label, std::slice::from_ref(value));
        }
        "clear" => registry.clear(),
        "sort" => registry.sort(),
        _ => {
            registry.handle(address, args, None);
        }
    }
    Ok(())
}

fn fader_print(registry: &mut Registry, address: &str, args: &[Value]) -> DashResult<()> {
    let (label, values) = split_label(address, args, 0)?;
    let value = first_value(address, values)?;
    let bounds = match (values.get(1), values.get(2)) {
        (Some(lo), Some(hi)) => Some((number(address, lo)?, number(address, hi)?)),
        (Some(_), None) => {
            return Err(DashError::MissingArgument {
                method: address.to_string(),
                index: 3,
            })
        }
        _ => None,
    };

    let width = registry.fader_width();
    let kind = match bounds {
        Some((min, max)) => WidgetKind::range(min, max, Autocal::Off, width),
        None => WidgetKind::range(DEFAULT_BOUNDS.0, DEFAULT_BOUNDS.1, Autocal::ExpandBoth, width),
    };
    let widget = registry.promote(label, kind);
    if let Some((min, max)) = bounds {
        widget.set_bounds(min, max);
    }
    registry.set_value(label, std::slice::from_ref(value));
    Ok(())
}

/// Split `args` at `index` into a text label and everything after it.
fn split_label<'a>(
    address: &str,
    args: &'a [Value],
    index: usize,
) -> DashResult<(&'a str, &'a [Value])> {
    let label = text_arg(address, args, index)?;
    Ok((label, &args[index + 1..]))
}

fn text_arg<'a>(address: &str, args: &'a [Value], index: usize) -> DashResult<&'a str> {
    match args.get(index) {
        Some(Value::Text(s)) => Ok(s),
        Some(other) => Err(DashError::InvalidArgument {
            method: address.to_string(),
            reason: format!("expected text at #{index}, got {other}"),
        }),
        None => Err(DashError::MissingArgument {
            method: address.to_string(),
            index,
        }),
    }
}

fn first_value<'a>(address: &str, values: &'a [Value]) -> DashResult<&'a Value> {
    values.first().ok_or_else(|| DashError::MissingArgument {
        method: address.to_string(),
        index: 1,
    })
}

fn number(address: &str, value: &Value) -> DashResult<f64> {
    value.as_f64().ok_or_else(|| DashError::InvalidArgument {
        method: address.to_string(),
        reason: format!("expected a number, got {value}"),
    })
}
