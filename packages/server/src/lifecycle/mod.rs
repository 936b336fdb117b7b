pub mod cascade;
pub mod error;
pub mod gc;
pub mod graph;
pub mod index;
pub mod ledger;
pub mod orphans;
pub mod scheduler;
pub mod store;

pub use cascade::{BatchDeletion, CascadeDeleter, DeletionResult, ItemFailure};
pub use error::{FailureReason, LifecycleError};
pub use gc::{GarbageCollector, ReclaimReport, ReclaimScope, SkippedFile};
pub use graph::{EntityKind, EntityRef};
pub use index::BlobReferenceIndex;
pub use ledger::BlobLedger;
pub use orphans::OrphanScanner;
pub use scheduler::{
    CleanupReport, CleanupScheduler, CleanupStatus, CleanupStep, StepFailure,
    run_cleanup_scheduler,
};
