//! SessionData raw record schema
//!
//! This module describes the loosely-typed record handed over by the record
//! reader, and classifies which producer generation wrote it.

mod raw_record;
mod version;

pub use raw_record::*;
pub use version::*;
