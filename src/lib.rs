//! tripplat
//! ========
//!
//! A group travel planner that was invented here. Friends form a group, save the places they might
//! visit, and recommend the ones they like best.
//!
//! Hacking
//! -------
//!
//! This follows the approach laid out in
//! ["Stateless MVC"](https://www.tedinski.com/2018/09/11/stateless-mvc.html). Ignore the "Should
//! you use this design?" section...
//!
//! - `schema` holds plain data.
//! - `dal` talks to SQLite and to the place-search provider.
//! - `logic` decides who may do what, and does it.
//! - `view` renders templates.
//! - `router` is the only module that speaks HTTP.
#![deny(
    nonstandard_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    unused_allocation,
    unused_comparisons,
    unused_parens,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    // unused_qualifications,
    unused_results,
    while_true
)]

#[macro_use]
pub mod util;

pub mod dal;
pub mod error;
pub mod logic;
pub mod router;
pub mod schema;
pub mod view;

pub use crate::error::{Error, Result};
