//! Middleware for the protected analytics routes.
//!
//! Stack (outermost → innermost): user identity → access log → handler.

pub mod audit;
pub mod user;
