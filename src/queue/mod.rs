pub mod broker;
pub mod job;
pub mod store;

pub use broker::JobBroker;
pub use job::{Job, JobDraft};
pub use store::{JobQueue, QueueError};
