//! Business logic.
//!
//! > **Logic** is the "business (or domain) logic" of the application. The router will pull the
//! > necessary information out of the HTTP request, and call into this module as quickly as
//! > possible to do all the actual work.
//!
//! Every operation that touches a group goes through `access::authorize` first.

pub mod access;
pub mod auth;
pub mod membership;
pub mod places;
pub mod ranking;
pub mod recommend;
