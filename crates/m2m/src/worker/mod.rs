pub mod job;
pub mod pool;

pub use job::Submission;
pub use pool::WorkerPool;
