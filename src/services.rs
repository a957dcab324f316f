pub mod api_client;
pub mod auth;
pub mod dashboard_service;
pub mod inflight;
pub mod session;
