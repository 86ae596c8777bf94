/// Format a count with thousands separators (e.g. `"1,234,567"`).
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Signed change with separators: `"+1,024"`, `"-3"`, `"0"`.
pub fn format_delta(delta: i64) -> String {
    let magnitude = format_count(delta.unsigned_abs());
    match delta.signum() {
        1  => format!("+{magnitude}"),
        -1 => format!("-{magnitude}"),
        _  => magnitude,
    }
}

/// Rate per hour with one decimal, e.g. `"+12.5/h"`.
pub fn format_rate(per_hour: f64) -> String {
    if per_hour > 0.0 {
        format!("+{per_hour:.1}/h")
    } else {
        format!("{per_hour:.1}/h")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_count_groups() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_000), "1,000");
        assert_eq!(format_count(1_234_567), "1,234,567");
    }

    #[test]
    fn format_delta_signs() {
        assert_eq!(format_delta(1_024), "+1,024");
        assert_eq!(format_delta(-3), "-3");
        assert_eq!(format_delta(0), "0");
    }

    #[test]
    fn format_rate_one_decimal() {
        assert_eq!(format_rate(12.46), "+12.5/h");
        assert_eq!(format_rate(-0.26), "-0.3/h");
        assert_eq!(format_rate(0.0), "0.0/h");
    }
}
