use crate::{Effect, FetchPurpose, ScanId};

/// Where the poll loop stands for the observed scan.
///
/// `Idle → Scheduled → AwaitingResponse → Scheduled | Stopped`. At most one
/// request is in flight: the next tick is scheduled only after the previous
/// response has been reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PollState {
    #[default]
    Idle,
    Scheduled { scan_id: ScanId, generation: u64 },
    AwaitingResponse { scan_id: ScanId, generation: u64 },
    Stopped,
}

/// Serial poll loop as a state machine. Timers live in the runtime; each
/// observation gets a fresh `generation` so ticks armed for an earlier
/// observation are recognised and ignored.
///
/// The request in flight is remembered across re-observation: observing a
/// scan whose poll is still unanswered waits for that answer instead of
/// issuing a second request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PollLoop {
    state: PollState,
    generation: u64,
    in_flight: Option<(ScanId, u64)>,
}

impl PollLoop {
    pub fn state(&self) -> &PollState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.state,
            PollState::Scheduled { .. } | PollState::AwaitingResponse { .. }
        )
    }

    /// Starts polling `scan_id`. Returns the timer to arm, or `None` when a
    /// request for the same scan is still outstanding.
    pub(crate) fn observe(&mut self, scan_id: ScanId) -> Option<Effect> {
        self.generation += 1;
        if let Some((pending, pending_generation)) = &self.in_flight {
            if *pending == scan_id {
                self.state = PollState::AwaitingResponse {
                    scan_id,
                    generation: *pending_generation,
                };
                return None;
            }
        }
        self.state = PollState::Scheduled {
            scan_id: scan_id.clone(),
            generation: self.generation,
        };
        Some(Effect::SchedulePoll {
            scan_id,
            generation: self.generation,
        })
    }

    /// The timer fired. Issues the request if the tick belongs to the current
    /// schedule.
    pub(crate) fn tick(&mut self, scan_id: &str, generation: u64) -> Option<Effect> {
        match &self.state {
            PollState::Scheduled {
                scan_id: current,
                generation: current_generation,
            } if current == scan_id && *current_generation == generation => {
                self.state = PollState::AwaitingResponse {
                    scan_id: scan_id.to_string(),
                    generation,
                };
                self.in_flight = Some((scan_id.to_string(), generation));
                Some(Effect::FetchStatus {
                    scan_id: scan_id.to_string(),
                    purpose: FetchPurpose::Poll { generation },
                })
            }
            _ => None,
        }
    }

    /// Records that the request issued for `(scan_id, generation)` answered.
    /// Returns whether it is the answer the loop is waiting for.
    pub(crate) fn settle(&mut self, scan_id: &str, generation: u64) -> bool {
        if matches!(&self.in_flight, Some((pending, pending_generation))
            if pending == scan_id && *pending_generation == generation)
        {
            self.in_flight = None;
        }
        matches!(&self.state, PollState::AwaitingResponse { scan_id: current, generation: awaited }
            if current == scan_id && *awaited == generation)
    }

    /// The awaited response was reconciled and the scan is still live:
    /// schedule the next tick under the current generation.
    pub(crate) fn resume(&mut self) -> Option<Effect> {
        match &self.state {
            PollState::AwaitingResponse { scan_id, .. } => {
                let scan_id = scan_id.clone();
                self.state = PollState::Scheduled {
                    scan_id: scan_id.clone(),
                    generation: self.generation,
                };
                Some(Effect::SchedulePoll {
                    scan_id,
                    generation: self.generation,
                })
            }
            _ => None,
        }
    }

    pub(crate) fn stop(&mut self) {
        if !matches!(self.state, PollState::Idle) {
            self.state = PollState::Stopped;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PollLoop, PollState};
    use crate::{Effect, FetchPurpose};

    #[test]
    fn observe_schedule_tick_resume_cycle() {
        let mut poll = PollLoop::default();
        assert_eq!(
            poll.observe("abc123".to_string()),
            Some(Effect::SchedulePoll {
                scan_id: "abc123".to_string(),
                generation: 1
            })
        );

        assert_eq!(
            poll.tick("abc123", 1),
            Some(Effect::FetchStatus {
                scan_id: "abc123".to_string(),
                purpose: FetchPurpose::Poll { generation: 1 }
            })
        );
        // A second tick while awaiting does not overlap requests.
        assert_eq!(poll.tick("abc123", 1), None);

        assert!(poll.settle("abc123", 1));
        assert!(poll.resume().is_some());
        assert!(matches!(poll.state(), PollState::Scheduled { .. }));
    }

    #[test]
    fn ticks_from_an_earlier_observation_are_ignored() {
        let mut poll = PollLoop::default();
        poll.observe("old".to_string());
        poll.observe("new".to_string());

        assert_eq!(poll.tick("old", 1), None);
        assert_eq!(poll.tick("new", 1), None);
        assert!(poll.tick("new", 2).is_some());
    }

    #[test]
    fn stop_leaves_nothing_scheduled() {
        let mut poll = PollLoop::default();
        poll.stop();
        assert_eq!(poll.state(), &PollState::Idle);

        poll.observe("abc123".to_string());
        poll.stop();
        assert_eq!(poll.state(), &PollState::Stopped);
        assert!(!poll.is_active());
        assert_eq!(poll.tick("abc123", 1), None);
        assert_eq!(poll.resume(), None);
    }

    #[test]
    fn reobserving_waits_for_the_outstanding_request() {
        let mut poll = PollLoop::default();
        poll.observe("abc123".to_string());
        assert!(poll.tick("abc123", 1).is_some());

        // Same scan observed again while generation 1 is unanswered.
        assert_eq!(poll.observe("abc123".to_string()), None);
        assert_eq!(poll.generation(), 2);
        assert_eq!(poll.tick("abc123", 2), None);

        assert!(poll.settle("abc123", 1));
        assert_eq!(
            poll.resume(),
            Some(Effect::SchedulePoll {
                scan_id: "abc123".to_string(),
                generation: 2
            })
        );
        assert!(poll.tick("abc123", 2).is_some());
    }

    #[test]
    fn answer_from_an_abandoned_observation_is_not_awaited() {
        let mut poll = PollLoop::default();
        poll.observe("abc123".to_string());
        poll.tick("abc123", 1);
        poll.observe("other".to_string());

        assert!(!poll.settle("abc123", 1));
        // Once answered, coming back to the scan schedules normally.
        assert!(poll.observe("abc123".to_string()).is_some());
        assert!(!poll.settle("abc123", 1));
    }
}
