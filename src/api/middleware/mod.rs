// Middleware - shared state, authentication extractors, rate limiting

pub mod auth;
pub mod rate_limit;
pub mod state;
