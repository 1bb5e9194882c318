use std::time::{Duration, Instant};

/// Idle-interval gate for saves.
///
/// Every change pushes the deadline back by the full interval; a save is
/// due only once the interval passes with no further change. The caller
/// drives time by passing `now`, so nothing here sleeps or spawns.
#[derive(Debug, Clone)]
pub struct SaveDebouncer {
    interval: Duration,
    read_only: bool,
    pending: Option<PendingSave>,
}

#[derive(Debug, Clone, PartialEq)]
struct PendingSave {
    page_id: String,
    deadline: Instant,
}

impl SaveDebouncer {
    pub fn new(interval: Duration, read_only: bool) -> Self {
        Self {
            interval,
            read_only,
            pending: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Entering read-only mode drops any pending save
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
        if read_only {
            self.cancel();
        }
    }

    /// Record a change to `page_id`, restarting the countdown
    pub fn touch(&mut self, page_id: &str, now: Instant) {
        if self.read_only {
            return;
        }
        self.pending = Some(PendingSave {
            page_id: page_id.to_string(),
            deadline: now + self.interval,
        });
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the pending save if its countdown has elapsed
    pub fn due(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some(pending) if now >= pending.deadline => {
                self.pending.take().map(|pending| pending.page_id)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const INTERVAL: Duration = Duration::from_millis(1000);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_nothing_due_without_changes() {
        let mut debouncer = SaveDebouncer::new(INTERVAL, false);
        assert_eq!(debouncer.due(Instant::now() + ms(5000)), None);
    }

    #[test]
    fn test_burst_of_changes_yields_one_save() {
        let start = Instant::now();
        let mut debouncer = SaveDebouncer::new(INTERVAL, false);

        let mut saves = 0;
        for step in 0..10 {
            let now = start + ms(step * 200);
            debouncer.touch("page", now);
            if debouncer.due(now).is_some() {
                saves += 1;
            }
        }
        assert_eq!(saves, 0);

        let last_change = start + ms(9 * 200);
        assert_eq!(debouncer.due(last_change + ms(999)), None);
        assert_eq!(debouncer.due(last_change + ms(1000)), Some("page".to_string()));
        assert_eq!(debouncer.due(last_change + ms(5000)), None);
    }

    #[test]
    fn test_cancel_drops_pending_save() {
        let start = Instant::now();
        let mut debouncer = SaveDebouncer::new(INTERVAL, false);
        debouncer.touch("page", start);
        debouncer.cancel();

        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.due(start + ms(2000)), None);
    }

    #[test]
    fn test_read_only_never_schedules() {
        let start = Instant::now();
        let mut debouncer = SaveDebouncer::new(INTERVAL, true);
        debouncer.touch("page", start);
        assert_eq!(debouncer.due(start + ms(2000)), None);
    }

    #[test]
    fn test_switching_to_read_only_cancels() {
        let start = Instant::now();
        let mut debouncer = SaveDebouncer::new(INTERVAL, false);
        debouncer.touch("page", start);
        debouncer.set_read_only(true);
        assert_eq!(debouncer.due(start + ms(2000)), None);

        debouncer.set_read_only(false);
        debouncer.touch("page", start);
        assert_eq!(debouncer.due(start + ms(1000)), Some("page".to_string()));
    }
}
