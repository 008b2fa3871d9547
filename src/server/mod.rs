mod actor;
pub mod config;
mod http_layers;
pub mod metrics;
mod notification_routes;
pub mod server;
mod social_routes;
pub mod state;

pub use actor::{Actor, HEADER_USER_ID_KEY};
pub use config::ServerConfig;
pub use http_layers::*;
pub use server::{make_app, make_metrics_app, run_server};
pub use state::ServerState;
