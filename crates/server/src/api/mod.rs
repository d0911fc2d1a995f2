pub mod catalog;
pub mod handlers;
pub mod middleware;
pub mod reference;
pub mod routes;
pub mod sets;
pub mod verify;

pub use routes::create_router;
