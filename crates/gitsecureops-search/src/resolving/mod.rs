//! Scope resolution
pub mod resolver;

pub use resolver::{Resolution, Resolver};
