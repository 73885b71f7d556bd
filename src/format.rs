//! Display formatting for player readouts.
//!
//! Every text the player shows is produced here: the elapsed/total time
//! readouts (`M:SS.mmm`), the speed readout (`1.00x`), the volume readout
//! (`100%`) and the combined time ratio. `parse_time` is the inverse used by
//! the typed-seek field.

/// Format seconds as `M:SS.mmm`, truncating at every unit.
///
/// Minutes are unbounded and carry no leading zero, so an hour renders as
/// `60:00.000`. Negative and non-finite input (duration before the source has
/// loaded) renders as `0:00.000`.
pub fn format_time(seconds: f64) -> String {
    let seconds = if seconds.is_finite() {
        seconds.max(0.0)
    } else {
        0.0
    };

    // 61.234 * 1000 lands a few ulps under 61234; only that error rounds up
    let scaled = seconds * 1000.0;
    let next = scaled.floor() + 1.0;
    let whole_millis = if next - scaled <= next * f64::EPSILON * 4.0 {
        next
    } else {
        scaled.floor()
    };
    let total_millis = whole_millis as u64;
    let minutes = total_millis / 60_000;
    let secs = (total_millis / 1000) % 60;
    let millis = total_millis % 1000;

    format!("{minutes}:{secs:02}.{millis:03}")
}

/// Speed readout, e.g. `1.00x`
pub fn format_rate(rate: f64) -> String {
    format!("{rate:.2}x")
}

/// Volume readout as a zero-padded percentage, e.g. `100%` or `050%`
pub fn format_volume(volume: f64) -> String {
    let percent = (volume.clamp(0.0, 1.0) * 100.0).round() as u32;
    format!("{percent:03}%")
}

/// Elapsed and total time on one line
pub fn format_ratio(current: f64, duration: f64) -> String {
    format!("{} / {}", format_time(current), format_time(duration))
}

/// Parse a typed time back into seconds.
///
/// Accepts `M:SS`, `M:SS.mmm` or plain seconds. Anything else (wrong number
/// of `:` segments, non-numeric or negative parts, seconds of 60 or more after
/// a minute field) yields `None` and no seek should happen.
pub fn parse_time(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let parts: Vec<&str> = text.split(':').collect();
    match parts.as_slice() {
        [secs] => parse_non_negative(secs),
        [mins, secs] => {
            if mins.contains('.') {
                return None;
            }
            let minutes = mins.trim().parse::<u64>().ok()?;
            let seconds = parse_non_negative(secs)?;
            if seconds >= 60.0 {
                return None;
            }
            Some(minutes as f64 * 60.0 + seconds)
        }
        _ => None,
    }
}

fn parse_non_negative(text: &str) -> Option<f64> {
    let value = text.trim().parse::<f64>().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}
