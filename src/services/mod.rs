pub mod factory;
pub mod navigation;
pub mod retry_ledger;
pub mod route_classifier;
pub mod session;
pub mod transport;

pub use factory::build_client;
