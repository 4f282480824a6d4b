pub mod handlers;
pub mod router;
pub mod session;
pub mod tenant;
pub mod types;

pub use router::{create_router, ApiDoc};
pub use session::{AdminUser, CurrentUser, SessionStore, SESSION_COOKIE};
pub use types::{AppConfig, AppState};
