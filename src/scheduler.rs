use std::time::{Duration, Instant};

/// The refresh periods offered in the dashboard's drop-down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshInterval {
    Secs30,
    Min1,
    #[default]
    Min5,
    Min10,
    Min30,
    Hour1,
}

impl RefreshInterval {
    pub const ALL: [RefreshInterval; 6] = [
        RefreshInterval::Secs30,
        RefreshInterval::Min1,
        RefreshInterval::Min5,
        RefreshInterval::Min10,
        RefreshInterval::Min30,
        RefreshInterval::Hour1,
    ];

    pub fn duration(self) -> Duration {
        match self {
            RefreshInterval::Secs30 => Duration::from_secs(30),
            RefreshInterval::Min1 => Duration::from_secs(60),
            RefreshInterval::Min5 => Duration::from_secs(5 * 60),
            RefreshInterval::Min10 => Duration::from_secs(10 * 60),
            RefreshInterval::Min30 => Duration::from_secs(30 * 60),
            RefreshInterval::Hour1 => Duration::from_secs(60 * 60),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RefreshInterval::Secs30 => "30 sec",
            RefreshInterval::Min1 => "1 min",
            RefreshInterval::Min5 => "5 min",
            RefreshInterval::Min10 => "10 min",
            RefreshInterval::Min30 => "30 min",
            RefreshInterval::Hour1 => "1 h",
        }
    }

    /// Unrecognized labels fall back to the 5 minute default.
    pub fn from_label(label: &str) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|interval| interval.label() == label)
            .unwrap_or_default()
    }
}

/// A single repeating deadline. The one `Option` slot is the whole state:
/// re-arming replaces the pending deadline, so two concurrent timers cannot
/// exist. Callers pass `now` explicitly, which keeps ticking testable.
#[derive(Debug)]
pub struct RefreshScheduler {
    interval: RefreshInterval,
    next_tick: Option<Instant>,
}

impl RefreshScheduler {
    pub fn new(interval: RefreshInterval) -> Self {
        Self {
            interval,
            next_tick: None,
        }
    }

    pub fn interval(&self) -> RefreshInterval {
        self.interval
    }

    pub fn is_armed(&self) -> bool {
        self.next_tick.is_some()
    }

    /// Arms (or re-arms) the deadline at `now + interval`, cancelling any
    /// pending one.
    pub fn arm(&mut self, now: Instant) {
        self.next_tick = Some(now + self.interval.duration());
    }

    /// Switches the interval and re-arms; the new period takes effect on the
    /// next cycle.
    pub fn set_interval(&mut self, interval: RefreshInterval, now: Instant) {
        self.interval = interval;
        self.arm(now);
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next_tick.is_some_and(|tick| now >= tick)
    }

    /// Time remaining until the deadline, `Duration::ZERO` once due.
    pub fn time_to_next(&self, now: Instant) -> Option<Duration> {
        self.next_tick
            .map(|tick| tick.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_roundtrip() {
        for interval in RefreshInterval::ALL {
            assert_eq!(RefreshInterval::from_label(interval.label()), interval);
        }
    }

    #[test]
    fn unknown_label_falls_back_to_five_minutes() {
        assert_eq!(
            RefreshInterval::from_label("2 fortnights"),
            RefreshInterval::Min5
        );
        assert_eq!(RefreshInterval::from_label(""), RefreshInterval::Min5);
    }

    #[test]
    fn arming_sets_a_deadline_one_interval_away() {
        let now = Instant::now();
        let mut scheduler = RefreshScheduler::new(RefreshInterval::Min1);

        assert!(!scheduler.is_armed());
        assert!(!scheduler.is_due(now));

        scheduler.arm(now);
        assert!(scheduler.is_armed());
        assert!(!scheduler.is_due(now));
        assert!(scheduler.is_due(now + Duration::from_secs(60)));
        assert_eq!(scheduler.time_to_next(now), Some(Duration::from_secs(60)));
    }

    #[test]
    fn rearming_cancels_the_previous_deadline() {
        let now = Instant::now();
        let mut scheduler = RefreshScheduler::new(RefreshInterval::Secs30);

        scheduler.arm(now);
        scheduler.arm(now + Duration::from_secs(10));

        // Only the later deadline survives.
        assert!(!scheduler.is_due(now + Duration::from_secs(30)));
        assert!(scheduler.is_due(now + Duration::from_secs(40)));
    }

    #[test]
    fn set_interval_twice_leaves_exactly_one_deadline() {
        let now = Instant::now();
        let mut scheduler = RefreshScheduler::new(RefreshInterval::Min5);

        scheduler.set_interval(RefreshInterval::Hour1, now);
        scheduler.set_interval(RefreshInterval::Min1, now);

        assert_eq!(scheduler.interval(), RefreshInterval::Min1);
        assert_eq!(scheduler.time_to_next(now), Some(Duration::from_secs(60)));
        assert!(!scheduler.is_due(now + Duration::from_secs(59)));
        assert!(scheduler.is_due(now + Duration::from_secs(60)));
    }

    #[test]
    fn time_to_next_saturates_at_zero_once_due() {
        let now = Instant::now();
        let mut scheduler = RefreshScheduler::new(RefreshInterval::Secs30);

        scheduler.arm(now);
        assert_eq!(
            scheduler.time_to_next(now + Duration::from_secs(45)),
            Some(Duration::ZERO)
        );
    }
}
