use std::time::Duration;

/// Whether the orbit camera is spinning on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationState {
    Rotating,
    Paused,
}

/// Identifies one armed resume. Only the most recently issued ticket can fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumeTicket {
    generation: u64,
    deadline: Duration,
}

impl ResumeTicket {
    /// Session time at which the resume becomes due.
    pub fn deadline(self) -> Duration {
        self.deadline
    }
}

/// Pauses auto-rotate on interaction and resumes it after a quiet period.
///
/// Holds a single pending resume slot: arming always replaces the previous
/// ticket, so at most one resume can ever be outstanding.
#[derive(Debug)]
pub struct AutoRotateDebounce {
    delay: Duration,
    state: RotationState,
    generation: u64,
    pending: Option<ResumeTicket>,
}

impl AutoRotateDebounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: RotationState::Rotating,
            generation: 0,
            pending: None,
        }
    }

    pub fn state(&self) -> RotationState {
        self.state
    }

    pub fn is_rotating(&self) -> bool {
        self.state == RotationState::Rotating
    }

    /// Number of armed resumes; never more than one.
    pub fn pending_count(&self) -> usize {
        usize::from(self.pending.is_some())
    }

    /// Handles an orbit interaction at session time `now`.
    ///
    /// Cancels the previously armed resume and arms a new one `delay` later.
    pub fn interaction_started(&mut self, now: Duration) -> ResumeTicket {
        self.pending = None;
        self.generation += 1;
        let ticket = ResumeTicket {
            generation: self.generation,
            deadline: now + self.delay,
        };
        self.pending = Some(ticket);
        self.state = RotationState::Paused;
        ticket
    }

    /// Fires `ticket`. Returns `true` if rotation resumed.
    ///
    /// Stale, cancelled and already fired tickets are ignored.
    pub fn resume(&mut self, ticket: ResumeTicket) -> bool {
        if self.pending != Some(ticket) {
            return false;
        }
        self.pending = None;
        self.state = RotationState::Rotating;
        true
    }

    /// Fires the pending resume if its deadline has passed.
    pub fn poll(&mut self, now: Duration) -> bool {
        match self.pending {
            Some(ticket) if now >= ticket.deadline => self.resume(ticket),
            _ => false,
        }
    }

    /// Drops the pending resume without changing the rotation state.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(1000);

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn starts_rotating_without_pending_resume() {
        let debounce = AutoRotateDebounce::new(DELAY);
        assert!(debounce.is_rotating());
        assert_eq!(debounce.pending_count(), 0);
    }

    #[test]
    fn interaction_pauses_until_delay_elapses() {
        let mut debounce = AutoRotateDebounce::new(DELAY);
        debounce.interaction_started(ms(0));
        assert_eq!(debounce.state(), RotationState::Paused);
        assert!(!debounce.poll(ms(999)));
        assert_eq!(debounce.state(), RotationState::Paused);
        assert!(debounce.poll(ms(1000)));
        assert!(debounce.is_rotating());
        assert_eq!(debounce.pending_count(), 0);
    }

    #[test]
    fn rearming_keeps_a_single_pending_resume() {
        let mut debounce = AutoRotateDebounce::new(DELAY);
        let first = debounce.interaction_started(ms(0));
        let second = debounce.interaction_started(ms(400));
        assert_eq!(debounce.pending_count(), 1);
        assert!(!debounce.resume(first));
        assert_eq!(debounce.state(), RotationState::Paused);
        assert!(!debounce.poll(ms(1000)));
        assert!(debounce.poll(second.deadline()));
        assert!(debounce.is_rotating());
    }

    #[test]
    fn firing_twice_is_a_no_op() {
        let mut debounce = AutoRotateDebounce::new(DELAY);
        let ticket = debounce.interaction_started(ms(0));
        assert!(debounce.resume(ticket));
        assert!(!debounce.resume(ticket));
        assert!(debounce.is_rotating());
    }

    #[test]
    fn cancelled_ticket_never_resumes() {
        let mut debounce = AutoRotateDebounce::new(DELAY);
        let ticket = debounce.interaction_started(ms(0));
        debounce.cancel();
        assert!(!debounce.resume(ticket));
        assert!(!debounce.poll(ms(5000)));
        assert_eq!(debounce.state(), RotationState::Paused);
    }
}
