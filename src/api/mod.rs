//! Daemon API: JSON-line protocol over a Unix socket, server, and client.

pub mod client;
pub mod handler;
pub mod protocol;
pub mod server;

pub use client::send_request;
pub use handler::ApiHandler;
pub use protocol::{Request, Response};
pub use server::{ApiServer, RequestHandler};
