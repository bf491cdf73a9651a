pub mod cache;
pub mod config;
pub mod display;
pub mod error;
pub mod reconcile;
pub mod remote;
pub mod retry;
pub mod schedule;
pub mod snapshot;
pub mod tasks {
    pub mod frame;
}
