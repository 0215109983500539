//! Phone number policies.

mod north_america;

pub use north_america::NorthAmericaPolicy;
