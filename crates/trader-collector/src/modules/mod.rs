//! 동기화 엔진 모듈.

pub mod backfill;
pub mod boundary;
pub mod clock;
pub mod context;
pub mod forward;
pub mod gaps;
pub mod orchestrator;

pub use backfill::{run_backfill, BackfillOutcome, BackfillReport};
pub use boundary::BoundaryTracker;
pub use clock::{Clock, FixedClock, SystemClock};
pub use context::SyncContext;
pub use forward::{run_forward, ForwardReport};
pub use gaps::{check_gaps, find_gaps, Gap};
pub use orchestrator::{KlineSync, SyncPhase, SyncReport, SyncStatus};
