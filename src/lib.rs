//! Product listings and community feedback read from a public ledger, with
//! descriptive content resolved from a content-addressed store and held in a
//! staleness-aware client cache.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
