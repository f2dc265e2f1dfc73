pub mod routes;
pub mod session;
pub mod throttle;
pub mod validation;
