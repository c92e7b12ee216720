//! # PMS API
//! 
//! HTTP handlers, access-control middleware, extractors, the response
//! envelope and the router.

pub mod error;
pub mod extractors;
pub mod form;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;

#[cfg(test)]
mod test_support;

pub use error::ApiError;
pub use routes::build_router;
pub use state::AppState;
