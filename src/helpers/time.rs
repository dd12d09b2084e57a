use chrono::{DateTime, Local, Utc};

/// Wall-clock time of day with millisecond precision, for console output
pub fn clock_millis(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%H:%M:%S%.3f").to_string()
}

/// Age in seconds of `ts` relative to `now`, rounded to one decimal
pub fn age_secs(ts: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let millis = (now - ts).num_milliseconds() as f64;
    (millis / 100.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn age_is_rounded() {
        let now = Utc::now();
        assert_eq!(age_secs(now - Duration::milliseconds(12_345), now), 12.3);
        assert_eq!(age_secs(now, now), 0.0);
    }
}
