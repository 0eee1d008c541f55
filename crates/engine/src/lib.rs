#![forbid(unsafe_code)]

mod countdown;
mod dispatcher;
mod hydrator;
mod snapshot;
mod sync;

#[cfg(test)]
mod fake;

pub use countdown::Countdown;
pub use dispatcher::{DispatchState, Dispatcher, Mutation, Outcome};
pub use hydrator::Hydrator;
pub use snapshot::{KeyPreview, Snapshot, Ttl};
pub use sync::{EngineConfig, PreviewSync, RefreshOutcome};
