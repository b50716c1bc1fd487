//! Scanwatch core: pure scan-status state machine and view-model helpers.
//!
//! Every input (user action, push event, poll tick, fetch completion) enters
//! through [`update`], which mutates [`AppState`] and returns the [`Effect`]s
//! the runtime must carry out. Nothing in this crate performs IO.
mod effect;
mod history;
mod msg;
mod phase;
mod poll;
mod reconcile;
mod state;
mod submit;
mod update;
mod view_model;

pub use effect::{Effect, FetchPurpose};
pub use history::HistoryCache;
pub use msg::Msg;
pub use phase::Phase;
pub use poll::{PollLoop, PollState};
pub use reconcile::{reconcile, RejectReason, Verdict};
pub use state::{
    AppState, Finding, HistoryEntry, ScanId, StatusModel, StatusUpdate, UpdateSource,
};
pub use submit::{ScanForm, ScanRequest};
pub use update::update;
pub use view_model::{
    AppViewModel, FindingRowView, HistoryRowView, StatusView, FINDING_STATE_OPEN,
};
