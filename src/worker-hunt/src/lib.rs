pub mod errors;
pub mod work;

pub use errors::Error;

pub use work::{RunTotals, WorkerConfig, execute_run, fail_run, finish_run, handle_run, next_run_in_queue, store_jobs};
