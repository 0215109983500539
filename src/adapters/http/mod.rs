//! HTTP adapters - Webhook endpoints.
//!
//! Each surface has its own HTTP adapter module.

pub mod phone;

// Re-export key types for convenience
pub use phone::phone_router;
pub use phone::PhoneAppState;
