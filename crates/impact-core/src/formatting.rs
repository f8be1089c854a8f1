/// Format a number with `,` thousands separators and a fixed number of
/// decimal places.
///
/// # Examples
///
/// ```
/// use impact_core::formatting::format_number;
///
/// assert_eq!(format_number(5022.4, 0), "5,022");
/// assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
/// assert_eq!(format_number(-6413.0, 1), "-6,413.0");
/// ```
pub fn format_number(value: f64, decimals: usize) -> String {
    let rendered = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match rendered.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rendered.as_str(), None),
    };

    let grouped = group_thousands(int_part);
    let body = match frac_part {
        Some(f) => format!("{}.{}", grouped, f),
        None => grouped,
    };

    // Avoid "-0" after rounding.
    if value < 0.0 && body.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-{}", body)
    } else {
        body
    }
}

/// Signed percentage with two decimals, e.g. `"+43.85%"` or `"-12.00%"`.
pub fn format_growth(pct: f64) -> String {
    if pct > 0.0 {
        format!("+{:.2}%", pct)
    } else if pct < 0.0 {
        format!("{:.2}%", pct)
    } else {
        "0.00%".to_string()
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
