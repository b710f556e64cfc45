pub mod client;
pub mod http;

pub use client::Transport;
pub use http::ReqwestTransport;
