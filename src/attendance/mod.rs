pub mod handlers;
pub mod model;
pub mod repo;

pub use handlers::router;
