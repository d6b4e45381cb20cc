//! Merging parsed sources and emitting the final XMLTV document

pub mod generator;
pub mod merger;

pub use generator::{GeneratorOptions, XmltvGenerator};
pub use merger::{EpgMerger, MergeOutcome, SourceDocument};
