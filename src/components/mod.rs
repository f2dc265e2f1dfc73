pub mod routes;
pub mod view;
pub mod visibility;
