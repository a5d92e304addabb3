mod product_routes;
mod server;
mod state;

pub use server::{make_app, run_server};
pub use state::ServerState;

#[derive(Clone, Debug, Default)]
pub struct ServerConfig {
    pub port: u16,
}
