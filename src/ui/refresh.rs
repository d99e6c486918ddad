/// Identifies one refresh request. Later requests carry larger tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Tracks outstanding refreshes so duplicate triggers are ignored and a
/// slow response can never replace data from a newer one.
#[derive(Debug, Default)]
pub struct RefreshTracker {
    issued: u64,
    in_flight: Option<Ticket>,
    applied: Option<Ticket>,
}

impl RefreshTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a refresh unless one is already outstanding.
    pub fn begin(&mut self) -> Option<Ticket> {
        if self.in_flight.is_some() {
            return None;
        }
        self.issued += 1;
        let ticket = Ticket(self.issued);
        self.in_flight = Some(ticket);
        Some(ticket)
    }

    /// Start a refresh even if one is outstanding; the older one will be
    /// discarded if it finishes after this one.
    pub fn supersede(&mut self) -> Ticket {
        self.issued += 1;
        let ticket = Ticket(self.issued);
        self.in_flight = Some(ticket);
        ticket
    }

    /// Record a completed refresh; `true` when its result should be applied.
    pub fn complete(&mut self, ticket: Ticket) -> bool {
        if self.in_flight == Some(ticket) {
            self.in_flight = None;
        }
        if self.applied.is_some_and(|applied| applied >= ticket) {
            return false;
        }
        self.applied = Some(ticket);
        true
    }

    pub fn is_refreshing(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn has_applied(&self) -> bool {
        self.applied.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_triggers_are_ignored() {
        let mut tracker = RefreshTracker::new();
        let ticket = tracker.begin().unwrap();
        assert!(tracker.is_refreshing());
        assert!(tracker.begin().is_none());

        assert!(tracker.complete(ticket));
        assert!(!tracker.is_refreshing());
        assert!(tracker.begin().is_some());
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut tracker = RefreshTracker::new();
        let older = tracker.begin().unwrap();
        let newer = tracker.supersede();

        assert!(tracker.complete(newer));
        assert!(!tracker.is_refreshing());
        assert!(!tracker.complete(older));
        assert!(tracker.has_applied());
    }

    #[test]
    fn test_in_order_responses_both_apply() {
        let mut tracker = RefreshTracker::new();
        let older = tracker.begin().unwrap();
        let newer = tracker.supersede();

        assert!(tracker.complete(older));
        assert!(tracker.is_refreshing());
        assert!(tracker.complete(newer));
        assert!(!tracker.is_refreshing());
    }
}
