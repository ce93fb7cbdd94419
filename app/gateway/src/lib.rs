//! Pack gateway -- live group-run sessions, position fan-out, and gap
//! tracking over WebSocket.

pub mod config;
mod error;
pub mod gap;
pub mod gateway;
pub mod hub;
pub mod ingest;
pub mod lifecycle;
pub mod session;
pub mod synthetic;

pub use config::GatewayConfig;
pub use error::{Error, Result};
pub use gap::{GapReport, compute_gaps, haversine};
pub use gateway::{
    Gateway, router,
    serve::{ServeHandle, serve},
};
pub use hub::BroadcastHub;
pub use ingest::PositionIngester;
pub use lifecycle::ConnectionLifecycle;
pub use session::{RunnerRecord, Session, SessionRegistry};
pub use synthetic::TestRunnerFactory;
