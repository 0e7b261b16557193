//! Numeric token rendering and parsing shared by all deck and report formats.

/// Renders a float in plain decimal form where the magnitude allows it.
///
/// Values outside `1e-4..1e6` (except zero) use exponent form. Integral values keep a
/// trailing `.0` so Fortran reads them as reals.
pub fn format_fixed(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let magnitude = value.abs();
    if value == 0.0 || (1e-4..1e6).contains(&magnitude) {
        let text = (value + 0.0).to_string();
        if text.contains('.') {
            text
        } else {
            format!("{text}.0")
        }
    } else {
        format!("{value:e}")
    }
}

/// Renders a float as `d.ddddE+xx` with `digits` fractional mantissa digits.
pub fn format_sci(value: f64, digits: usize) -> String {
    let rendered = format!("{:.*e}", digits, value);
    match rendered.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{mantissa}E{sign}{:02}", exponent.abs())
        }
        None => rendered,
    }
}

/// Parses a numeric token as written by Fortran programs.
///
/// Accepts `E` and `D` exponent markers, signed and unsigned exponents, and the
/// overflow form without a marker (`1.234-100`).
pub fn parse_number(token: &str) -> Option<f64> {
    let token = token.trim().trim_end_matches(',');
    if token.is_empty() {
        return None;
    }
    let normalized = token.replace(['D', 'd'], "E");
    if let Ok(value) = normalized.parse::<f64>() {
        return Some(value);
    }
    let split = normalized
        .char_indices()
        .skip(1)
        .filter(|&(_, c)| c == '+' || c == '-')
        .map(|(i, _)| i)
        .last()?;
    if normalized[..split].ends_with(['E', 'e']) {
        return None;
    }
    format!("{}E{}", &normalized[..split], &normalized[split..])
        .parse()
        .ok()
}

pub fn parse_int(token: &str) -> Option<i64> {
    token.trim().trim_end_matches(',').parse().ok()
}

fn round_to(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round() / scale + 0.0
}

/// Scales `values` to sum to one and rounds them to `digits` decimals.
///
/// The last non-zero entry absorbs the rounding remainder, so zero entries stay
/// exactly zero. An all-zero input is treated as an even split. Applying the
/// function to its own output is a no-op.
pub fn normalize_fractions(values: &[f64], digits: i32) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let sum: f64 = values.iter().sum();
    let shares: Vec<f64> = if sum == 0.0 {
        vec![1.0 / values.len() as f64; values.len()]
    } else {
        values.iter().map(|v| v / sum).collect()
    };
    let mut normalized: Vec<f64> = shares.iter().map(|&v| round_to(v, digits)).collect();
    if let Some(last) = shares.iter().rposition(|&v| v != 0.0) {
        let rest: f64 = normalized
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != last)
            .map(|(_, v)| v)
            .sum();
        normalized[last] = round_to(1.0 - rest, digits);
    }
    normalized
}

pub fn format_bool(value: bool) -> &'static str {
    if value { ".true." } else { ".false." }
}

pub fn parse_bool(token: &str) -> Option<bool> {
    match token.trim().to_ascii_lowercase().as_str() {
        ".true." | ".t." | "true" | "t" => Some(true),
        ".false." | ".f." | "false" | "f" => Some(false),
        _ => None,
    }
}
