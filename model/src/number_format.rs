//! FILENAME: model/src/number_format.rs
//! PURPOSE: Turns cell values into display text.
//! CONTEXT: Number presentation is driven by the resolved style's
//! `decimals`, `thousands` and `percent` attributes. It is shared by every
//! renderer so the same theme writes the same digits in every format.

use crate::theme::Style;
use crate::value::CellValue;

/// Format a cell value for display under a resolved style.
pub fn format_value(value: &CellValue, style: &Style, no_data_text: &str) -> String {
    match value {
        CellValue::NoData => no_data_text.to_string(),
        CellValue::Number(n) => format_number(*n, style),
        CellValue::Text(s) => s.clone(),
        CellValue::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
    }
}

/// Format a number according to the style's number attributes.
pub fn format_number(value: f64, style: &Style) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Inf" } else { "-Inf" }.to_string();
    }

    if style.percent() {
        return format_percentage(value, style.decimals().unwrap_or(0), style.thousands());
    }

    match style.decimals() {
        Some(places) => format_decimal(value, places, style.thousands()),
        None if style.thousands() => {
            let general = format_general(value);
            // Scientific notation has no integer part to group
            if general.contains('e') {
                general
            } else {
                add_thousands_separator(&general)
            }
        }
        None => format_general(value),
    }
}

/// Format a number in general format (auto-detect best representation).
fn format_general(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }

    let abs_value = value.abs();

    // Use scientific notation for very large or very small numbers
    if abs_value >= 1e10 || (abs_value < 1e-4 && abs_value > 0.0) {
        let formatted = format!("{:.5e}", value);
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) => {
                let mantissa = mantissa.trim_end_matches('0').trim_end_matches('.');
                format!("{}e{}", mantissa, exponent)
            }
            None => formatted,
        };
    }

    // For integers, don't show decimal point
    if value.fract() == 0.0 && abs_value < 1e15 {
        return format!("{:.0}", value);
    }

    // For decimals, show up to 10 decimal places but trim trailing zeros
    let formatted = format!("{:.10}", value);
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Format a number with specified decimal places and optional thousands separator.
fn format_decimal(value: f64, decimal_places: u8, use_thousands_separator: bool) -> String {
    let rounded = format!("{:.prec$}", value, prec = decimal_places as usize);

    if use_thousands_separator {
        add_thousands_separator(&rounded)
    } else {
        rounded
    }
}

/// Format a number as percentage.
fn format_percentage(value: f64, decimal_places: u8, use_thousands_separator: bool) -> String {
    let percentage = format_decimal(value * 100.0, decimal_places, use_thousands_separator);
    format!("{}%", percentage)
}

/// Add thousands separators to a numeric string.
fn add_thousands_separator(s: &str) -> String {
    let (integer_part, decimal_part) = match s.split_once('.') {
        Some((int, dec)) => (int, Some(dec)),
        None => (s, None),
    };

    let negative = integer_part.starts_with('-');
    let digits: String = integer_part.chars().filter(|c| c.is_ascii_digit()).collect();

    let mut result = String::new();
    let len = digits.len();

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    if negative {
        result = format!("-{}", result);
    }

    if let Some(decimal) = decimal_part {
        result.push('.');
        result.push_str(decimal);
    }

    result
}
