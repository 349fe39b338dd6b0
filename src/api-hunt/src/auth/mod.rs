pub mod handlers;
pub mod middleware;
pub mod password;
pub mod session;

pub use handlers::{get_me, post_login, post_logout, post_register};
pub use middleware::{AuthUser, require_auth};
