pub mod schema;

#[allow(unused_imports)]
pub use schema::{env_truthy, Config, GatewayConfig, ReliabilityConfig};
