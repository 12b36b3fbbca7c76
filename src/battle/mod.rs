//! Battle lifecycle domain: statuses, sides, transitions and result reports.
//!
//! Nothing here touches the database. The services load a game, ask this
//! module what the next state is, and persist the answer.

mod lifecycle;
mod report;
mod side;
mod status;

pub use lifecycle::{Action, Effect, Lifecycle, LifecycleError, Transition};
pub use report::{
    EntryInput, NamedEntry, ReportError, ResultReport, ResultSubmission, RolledEntry, SideInput,
    SideReport,
};
pub use side::{Side, SideFlags, resolve_side};
pub use status::{GameStatus, WarbandStatus};
