use chrono::{DateTime, Utc};

/// Formats naira with two decimals and thousands separators, e.g. `₦1,234.50`.
pub fn format_naira(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let fixed = format!("{:.2}", amount.abs());
    let (whole, frac) = fixed.split_once('.').unwrap_or((&fixed, "00"));
    format!("{sign}₦{}.{frac}", group_thousands(whole))
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `19 Oct 2026`
pub fn format_date(ts: i64) -> String {
    utc(ts).format("%-d %b %Y").to_string()
}

/// `19 Oct 2026, 14:05` (UTC)
pub fn format_datetime(ts: i64) -> String {
    utc(ts).format("%-d %b %Y, %H:%M").to_string()
}

fn utc(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naira_groups_thousands() {
        assert_eq!(format_naira(0.0), "₦0.00");
        assert_eq!(format_naira(950.0), "₦950.00");
        assert_eq!(format_naira(1234.5), "₦1,234.50");
        assert_eq!(format_naira(1_000_000.0), "₦1,000,000.00");
        assert_eq!(format_naira(-20.0), "-₦20.00");
    }

    #[test]
    fn dates_render_in_utc() {
        // 2026-10-19T14:05:00Z
        assert_eq!(format_date(1_792_418_700), "19 Oct 2026");
        assert_eq!(format_datetime(1_792_418_700), "19 Oct 2026, 14:05");
        assert_eq!(format_date(0), "1 Jan 1970");
    }
}
