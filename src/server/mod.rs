pub mod fallback_routes;
pub mod proxy_routes;
pub mod server;
