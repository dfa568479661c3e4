//! Business-logic services behind the route handlers.

pub mod persistence;
pub mod project;
pub mod session;
pub mod sync;
