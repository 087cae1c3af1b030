//! Row formatting helpers — label column, numbers, bars.

/// Significant characters a float gets, integer digits plus decimals.
pub const NUMBER_DIGITS: usize = 8;
/// Most decimals shown for small-magnitude numbers.
pub const MAX_PRECISION: usize = 6;

pub const BAR_FILLED: char = '█';
pub const BAR_EMPTY: char = '·';

/// Format a float so every value takes roughly the same room on screen:
/// small numbers get more decimals, large ones fewer.
pub fn format_number(x: f64) -> String {
    if !x.is_finite() {
        return format!("{x}");
    }
    let precision = NUMBER_DIGITS
        .saturating_sub(integer_digits(x))
        .min(MAX_PRECISION);
    format!("{x:.precision$}")
}

fn integer_digits(x: f64) -> usize {
    let magnitude = x.abs();
    if magnitude < 1.0 {
        1
    } else {
        magnitude.log10().floor() as usize + 1
    }
}

/// Left-justify `label` in a column of `width` characters, truncating.
pub fn label_column(label: &str, width: usize) -> String {
    let truncated: String = label.chars().take(width).collect();
    format!("{truncated:<width$}")
}

/// Number of filled bar cells for `value` within `[min, max]`.
/// A degenerate or non-finite range gives an empty bar.
pub fn fill_count(value: f64, min: f64, max: f64, width: usize) -> usize {
    let span = max - min;
    if span <= 0.0 || !span.is_finite() || !value.is_finite() {
        return 0;
    }
    let ratio = ((value - min) / span).clamp(0.0, 1.0);
    (ratio * width as f64).round() as usize
}

/// Bar of `width` cells, `filled` of them solid.
pub fn bar(filled: usize, width: usize) -> String {
    let filled = filled.min(width);
    let mut out = String::with_capacity(width * 3 + 2);
    out.push('[');
    out.extend(std::iter::repeat(BAR_FILLED).take(filled));
    out.extend(std::iter::repeat(BAR_EMPTY).take(width - filled));
    out.push(']');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_numbers_keep_precision() {
        assert_eq!(format_number(0.001234), "0.001234");
        assert_eq!(format_number(0.5), "0.500000");
    }

    #[test]
    fn precision_shrinks_with_magnitude() {
        assert_eq!(format_number(20.0), "20.000000");
        assert_eq!(format_number(12345.678), "12345.678");
        assert_eq!(format_number(123456789.0), "123456789");
    }

    #[test]
    fn negative_numbers() {
        assert_eq!(format_number(-6.5), "-6.500000");
    }

    #[test]
    fn label_truncates_and_pads() {
        assert_eq!(label_column("abc", 5), "abc  ");
        assert_eq!(label_column("abcdefgh", 4), "abcd");
    }

    #[test]
    fn fill_is_rounded() {
        assert_eq!(fill_count(55.0, 0.0, 100.0, 40), 22);
        assert_eq!(fill_count(1.0, 0.0, 1.0, 10), 10);
        assert_eq!(fill_count(-1.0, 0.0, 1.0, 10), 0);
    }

    #[test]
    fn degenerate_range_is_empty() {
        assert_eq!(fill_count(3.0, 3.0, 3.0, 10), 0);
        assert_eq!(fill_count(f64::NAN, 0.0, 1.0, 10), 0);
    }

    #[test]
    fn bar_layout() {
        assert_eq!(bar(2, 4), "[██··]");
        assert_eq!(bar(9, 3), "[███]");
    }
}
