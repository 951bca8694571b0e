//! `wordbloom` crate (library surface).
//!
//! The primary entrypoint for end users is the `wordbloom` binary. This library exposes the
//! fallback generation server so it can be embedded or driven from tests.

pub mod serve;
