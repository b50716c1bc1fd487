use std::fmt;

use crate::state::non_empty;
use crate::{Phase, StatusModel, StatusUpdate};

/// Outcome of offering a candidate update to a [`StatusModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The model changed and its revision advanced.
    Applied {
        /// The update moved the scan into a terminal phase for the first time.
        reached_terminal: bool,
    },
    Rejected(RejectReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The update names a scan other than the observed one.
    NotObserved,
    /// The scan already reached a terminal phase and the update adds nothing.
    Terminal,
    /// The update's phase is behind the current phase.
    Stale,
    /// Same phase, nothing new to attach.
    Duplicate,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NotObserved => write!(f, "scan is not observed"),
            RejectReason::Terminal => write!(f, "scan already terminal"),
            RejectReason::Stale => write!(f, "phase is behind current phase"),
            RejectReason::Duplicate => write!(f, "nothing new"),
        }
    }
}

/// Applies `update` to `model` if it moves the scan forward.
///
/// Accepts only updates for the observed scan whose phase is strictly ahead of
/// the current one. Terminal phases are sticky: afterwards the only accepted
/// update is a same-phase repeat that attaches data the model still lacks
/// (`results` on `Completed`, an error message on `Error`). Existing data is
/// never overwritten, so delivering an update twice changes nothing.
pub fn reconcile(model: &mut StatusModel, update: StatusUpdate) -> Verdict {
    if model.scan_id.as_deref() != Some(update.scan_id.as_str()) {
        return Verdict::Rejected(RejectReason::NotObserved);
    }
    let Some(current) = model.phase else {
        return Verdict::Rejected(RejectReason::NotObserved);
    };

    if current.is_terminal() {
        if update.phase == current && attach_missing(model, update) {
            model.revision += 1;
            return Verdict::Applied {
                reached_terminal: false,
            };
        }
        return Verdict::Rejected(RejectReason::Terminal);
    }

    if update.phase.rank() < current.rank() {
        return Verdict::Rejected(RejectReason::Stale);
    }
    if update.phase == current {
        return Verdict::Rejected(RejectReason::Duplicate);
    }

    model.phase = Some(update.phase);
    match update.phase {
        Phase::Completed => model.results = update.results,
        Phase::Error => model.error_message = non_empty(update.error),
        Phase::Starting | Phase::Running => {}
    }
    model.revision += 1;
    Verdict::Applied {
        reached_terminal: update.phase.is_terminal(),
    }
}

fn attach_missing(model: &mut StatusModel, update: StatusUpdate) -> bool {
    match update.phase {
        Phase::Completed if model.results.is_none() => match update.results {
            Some(results) => {
                model.results = Some(results);
                true
            }
            None => false,
        },
        Phase::Error if model.error_message.is_none() => match non_empty(update.error) {
            Some(message) => {
                model.error_message = Some(message);
                true
            }
            None => false,
        },
        _ => false,
    }
}
