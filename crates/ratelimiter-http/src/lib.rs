//! HTTP transport surface (C6): raw `hyper` 1.x, no framework.

pub mod server;

pub use server::HttpServer;
