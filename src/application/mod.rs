//! Application layer - Commands and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Each webhook or job maps to one command and its handler.

pub mod handlers;

pub use handlers::phone;
