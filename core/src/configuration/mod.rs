pub use provider::*;

pub mod clock;
pub mod provider;
pub mod routes;
pub mod ttl;
