pub mod catalog;
pub mod challenges;
pub mod confirm;
pub mod deadlines;
pub mod progress;
pub mod sync_engine;

pub use catalog::{BoardCatalog, BoardSummary};
pub use challenges::{ChallengeDetail, ChallengeProgress, ChallengeService, compute_challenge_progress};
pub use confirm::{Confirmation, DeleteOutcome};
pub use deadlines::{DEFAULT_DEADLINE_LIMIT, Deadline, DeadlineStatus, fetch_upcoming, upcoming_deadlines};
pub use progress::{Progress, aggregate};
pub use sync_engine::{BoardSnapshot, BoardSyncEngine, Operation, SyncNotice, SyncPhase};
