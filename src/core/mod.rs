//! Core business logic - framework-agnostic operations behind the HTTP API.
//! Every operation is a free `async fn` taking a database connection so it can be
//! called from route handlers and tests alike.

pub mod audit;
pub mod chat;
pub mod classify;
pub mod family;
pub mod incentive;
pub mod product;
pub mod reminder;
pub mod risk;
pub mod transaction;
