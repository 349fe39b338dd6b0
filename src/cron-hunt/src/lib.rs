mod auth_client;
mod errors;
mod process;

pub use auth_client::{AuthenticatedClient, json_or_error};
pub use errors::Error;
pub use process::{RunWait, Scheduler, check_trigger_file, company_counts};
