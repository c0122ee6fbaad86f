//! Auxiliary services around the engine: periodic cleanup, preloading,
//! two-engine synchronization, scheduled eviction

mod cleanup;
mod preload;
mod scheduler;
mod sync;

pub use cleanup::CleanupService;
pub use preload::{
    PreloadEvent, PreloadProgress, PreloadState, Preloader, Producer, ProgressCallback,
};
pub use scheduler::{EvictionScheduler, PlatformSignal, ScheduleConfig, TimeOfDay};
pub use sync::{ConflictResolution, SyncEvent, SyncOptions, SyncStats, Synchronizer};
