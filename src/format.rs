//! Text rendering for the departure board.
//!
//! Countdown, clock-time, and delay formatting, plus a plain-text renderer
//! for the grouped board used by the CLI.

use chrono::{DateTime, FixedOffset, NaiveDateTime};

use crate::engine::DepartureGroup;
use crate::lines::badge_class;
use crate::stations::Station;

/// `None` renders as `?`; a departure without a countdown is still shown.
pub fn format_countdown(countdown: Option<i64>) -> String {
    match countdown {
        None => "?".to_string(),
        Some(0) => "Jetzt".to_string(),
        Some(m) => format!("{m} Min"),
    }
}

/// Parses the API's ISO-ish timestamps. The feed writes offsets without a
/// colon (`+0200`), which RFC 3339 parsing rejects, so both forms are tried,
/// then a naive fallback without any offset.
pub fn parse_timestamp(ts: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(ts)
        .or_else(|_| DateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc().fixed_offset())
        })
}

/// `HH:MM` wall-clock rendering; empty string when absent or unparseable.
pub fn format_time(ts: Option<&str>) -> String {
    ts.and_then(parse_timestamp)
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_default()
}

/// Whole minutes between planned and real time, when both parse.
pub fn delay_minutes(planned: &str, real: &str) -> Option<i64> {
    let planned = parse_timestamp(planned)?;
    let real = parse_timestamp(real)?;
    Some((real - planned).num_minutes())
}

/// `+n` late, `-n` early, `±0` on time.
pub fn format_delay(minutes: i64) -> String {
    match minutes {
        m if m > 0 => format!("+{m}"),
        m if m < 0 => format!("{m}"),
        _ => "±0".to_string(),
    }
}

/// Renders one grouped board as plain text. Real-time departures show the
/// live clock time and delay; planned-only ones are marked unconfirmed.
pub fn render_board(station: &Station, groups: &[DepartureGroup]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}{}\n",
        station.name,
        station
            .municipality
            .as_deref()
            .map(|m| format!(" ({m})"))
            .unwrap_or_default()
    ));

    if groups.is_empty() {
        out.push_str("  Keine Abfahrten in den nächsten Minuten\n");
        return out;
    }

    for group in groups {
        let platform = if group.platform.is_empty() {
            String::new()
        } else {
            format!(" Steig {}", group.platform)
        };
        out.push_str(&format!(
            "[{}] {} → {}{}\n",
            badge_class(&group.line, group.category),
            group.line,
            group.destination,
            platform
        ));

        for dep in &group.departures {
            let countdown = format_countdown(dep.countdown);
            let detail = match (dep.time_planned.as_deref(), dep.time_real.as_deref()) {
                (Some(planned), Some(real)) => {
                    let delay = delay_minutes(planned, real)
                        .map(|m| format!(" {}", format_delay(m)))
                        .unwrap_or_default();
                    format!(" ({}{})", format_time(Some(real)), delay)
                }
                (Some(planned), None) => format!(" (Plan {})", format_time(Some(planned))),
                _ => String::new(),
            };
            out.push_str(&format!("    {countdown}{detail}\n"));
        }
    }
    out
}
