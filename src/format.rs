//! Display strings for route distances and durations.

/// `"850 m"` below one kilometer, `"12.3 km"` above.
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{} m", meters.round())
    } else {
        format!("{:.1} km", meters / 1000.0)
    }
}

/// Whole minutes, with hours split out once there is at least one.
pub fn format_duration(seconds: f64) -> String {
    let minutes = (seconds / 60.0).floor().max(0.0) as u64;
    let hours = minutes / 60;

    if hours > 0 {
        format!("{} hr {} min", hours, minutes % 60)
    } else {
        format!("{} min", minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(0.0), "0 m");
        assert_eq!(format_distance(849.6), "850 m");
        assert_eq!(format_distance(999.4), "999 m");
        assert_eq!(format_distance(1000.0), "1.0 km");
        assert_eq!(format_distance(12_345.0), "12.3 km");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "0 min");
        assert_eq!(format_duration(59.0), "0 min");
        assert_eq!(format_duration(125.0), "2 min");
        assert_eq!(format_duration(3600.0), "1 hr 0 min");
        assert_eq!(format_duration(5430.0), "1 hr 30 min");
    }
}
