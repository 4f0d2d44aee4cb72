//! Application services: read orchestration, write flows and views.

pub mod assemble;
pub mod catalog;
pub mod content;
pub mod error;
pub mod ledger;
pub mod merge;
pub mod submit;
pub mod view;
