//! Library entry for pkgcollection exposing the collection engine for the
//! binary and integration tests.

pub mod app;
pub mod args;
pub mod error;
pub mod index;
pub mod logic;
pub mod prefs;
pub mod sources;
pub mod state;
pub mod util;

#[cfg(test)]
mod test_utils;
