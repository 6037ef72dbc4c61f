use std::time::Duration;

/// Returns the wait following `current`: `current * factor`, capped at `max`.
///
/// The result never exceeds `max` and, for `factor >= 1`, never drops below
/// `current` as long as `current <= max`.
pub fn next_interval(current: Duration, factor: f64, max: Duration) -> Duration {
    Duration::try_from_secs_f64(current.as_secs_f64() * factor)
        .unwrap_or(max)
        .min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_interval() {
        let max = Duration::from_secs(30);
        assert_eq!(next_interval(Duration::from_secs(1), 2.0, max), Duration::from_secs(2));
        assert_eq!(next_interval(Duration::from_secs(4), 2.0, max), Duration::from_secs(8));
        assert_eq!(next_interval(Duration::from_secs(16), 2.0, max), max);
        assert_eq!(next_interval(Duration::from_secs(30), 2.0, max), max);
        assert_eq!(
            next_interval(Duration::from_millis(500), 1.5, max),
            Duration::from_millis(750)
        );
    }

    #[test]
    fn test_overflow_saturates_at_max() {
        let max = Duration::from_secs(30);
        assert_eq!(next_interval(Duration::MAX, 2.0, max), max);
        assert_eq!(next_interval(Duration::from_secs(10), f64::MAX, max), max);
    }
}
