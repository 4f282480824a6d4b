pub mod app;
pub mod domain;
pub mod error;
pub mod infra;
pub mod storage;
pub mod transport;

// Convenience re-exports (keeps call-sites clean)
pub use app::{OrderService, WalletService};
pub use domain::tenant::Tenant;
pub use error::{Error, Result};
pub use storage::{MemStorage, PgStorage, Storage};
pub use transport::http::{AppConfig, AppState};
