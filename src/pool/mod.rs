pub mod mpmc;
pub mod topology;
pub mod worker;

pub use mpmc::Mpmc;
pub use worker::WorkerPool;
