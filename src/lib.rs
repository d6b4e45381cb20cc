//! Fetches EPG data from XMLTV and JSON sources, merges it deterministically
//! and writes a single XMLTV guide.

pub mod config;
pub mod epg;
pub mod errors;
pub mod ingestor;
pub mod models;
pub mod sources;
pub mod utils;
