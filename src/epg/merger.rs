//! Deterministic merge of parsed sources into one guide
//!
//! Sources are applied in declared order. Each source contributes all of its
//! channels before any of its programmes, so a source may reference channels
//! it declares later in its own payload. The first programme scheduled into a
//! slot keeps it.

use tracing::{debug, warn};

use crate::models::{
    ChannelUpsert, EpgDocument, PartialDocument, ProgramRef, ProgramRejection, ValidationWarning,
};

/// A parsed source, ready to merge
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub name: String,
    pub document: PartialDocument,
}

impl SourceDocument {
    pub fn new<N: Into<String>>(name: N, document: PartialDocument) -> Self {
        Self {
            name: name.into(),
            document,
        }
    }
}

/// Merged guide plus everything that was dropped on the way
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub document: EpgDocument,
    pub warnings: Vec<ValidationWarning>,
}

#[derive(Debug, Default)]
pub struct EpgMerger {
    document: EpgDocument,
    warnings: Vec<ValidationWarning>,
}

impl EpgMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge sources in the order given
    pub fn merge<I>(sources: I) -> MergeOutcome
    where
        I: IntoIterator<Item = SourceDocument>,
    {
        let mut merger = Self::new();
        for source in sources {
            merger.add_source(source);
        }
        merger.finish()
    }

    /// Apply one more source on top of what was merged so far
    pub fn add_source(&mut self, source: SourceDocument) {
        let SourceDocument { name, document } = source;
        let PartialDocument {
            channels,
            programs,
            rejected,
        } = document;

        for rejection in rejected {
            self.push_warning(ValidationWarning::Rejected {
                source: name.clone(),
                rejection,
            });
        }

        let mut inserted = 0usize;
        let mut updated = 0usize;
        for channel in channels {
            match self.document.upsert_channel(channel) {
                ChannelUpsert::Inserted => inserted += 1,
                ChannelUpsert::Updated => updated += 1,
                ChannelUpsert::Unchanged => {}
            }
        }

        let mut scheduled = 0usize;
        for program in programs {
            let dropped = ProgramRef::new(&name, &program);
            let channel_id = program.channel_id.clone();
            match self.document.insert_program(program, &name) {
                Ok(()) => scheduled += 1,
                Err(ProgramRejection::UnknownChannel) => {
                    self.push_warning(ValidationWarning::UnknownChannel {
                        source: name.clone(),
                        channel_id,
                        title: dropped.title,
                    });
                }
                Err(ProgramRejection::Overlap { existing }) => {
                    self.push_warning(ValidationWarning::MergeConflict {
                        channel_id,
                        kept: existing,
                        dropped,
                    });
                }
            }
        }

        debug!(
            "Merged source '{}': {} new channels, {} updated channels, {} programmes scheduled",
            name, inserted, updated, scheduled
        );
    }

    pub fn finish(self) -> MergeOutcome {
        MergeOutcome {
            document: self.document,
            warnings: self.warnings,
        }
    }

    fn push_warning(&mut self, warning: ValidationWarning) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }
}
