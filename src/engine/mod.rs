pub mod queue;
pub mod scheduler;
pub mod timeline;

pub use queue::{EventQueue, ScheduledEvent};
pub use scheduler::{DispatchStats, EventScheduler};
pub use timeline::{beats_to_ticks, Timeline};
