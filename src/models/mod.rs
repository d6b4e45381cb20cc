//! In-memory EPG model shared by the parsers, the merger and the generator

use chrono::{DateTime, FixedOffset};
use std::collections::HashMap;

pub mod report;
pub mod warnings;

pub use report::{RunReport, SourceOutcome, SourceStatus};
pub use warnings::{ProgramRef, Rejection, ValidationWarning};

/// A guide channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: String,
    pub display_name: String,
    pub icon: Option<String>,
}

impl Channel {
    pub fn new<I: Into<String>, N: Into<String>>(id: I, display_name: N) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            icon: None,
        }
    }
}

/// A single scheduled programme
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub channel_id: String,
    pub start: DateTime<FixedOffset>,
    pub stop: DateTime<FixedOffset>,
    pub title: String,
    /// Empty when the source had no description
    pub description: String,
    pub category: Option<String>,
    pub icon: Option<String>,
}

impl Program {
    /// Whether two programmes on the same channel would collide.
    ///
    /// Ranges are half-open; equal starts always collide, so two zero-length
    /// entries at the same instant are still a conflict.
    pub fn overlaps(&self, other: &Program) -> bool {
        self.start == other.start || (self.start < other.stop && other.start < self.stop)
    }
}

/// What one parser invocation produced for one source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialDocument {
    /// Channels in source order
    pub channels: Vec<Channel>,
    /// Programmes in source order
    pub programs: Vec<Program>,
    /// Entries dropped while parsing
    pub rejected: Vec<Rejection>,
}

impl PartialDocument {
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty() && self.programs.is_empty()
    }
}

/// Result of inserting a channel into an [`EpgDocument`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelUpsert {
    Inserted,
    /// Existing channel had empty fields that were filled in
    Updated,
    Unchanged,
}

/// Why [`EpgDocument::insert_program`] refused a programme
#[derive(Debug, Clone, PartialEq)]
pub enum ProgramRejection {
    UnknownChannel,
    /// Collides with an already scheduled programme
    Overlap { existing: ProgramRef },
}

#[derive(Debug, Clone)]
struct ScheduledProgram {
    program: Program,
    source: String,
}

/// The merged guide: unique channels in first-seen order and, per channel,
/// a start-ascending list of non-overlapping programmes.
#[derive(Debug, Clone, Default)]
pub struct EpgDocument {
    channels: Vec<Channel>,
    index: HashMap<String, usize>,
    schedules: HashMap<String, Vec<ScheduledProgram>>,
}

impl EpgDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channel(&self, id: &str) -> Option<&Channel> {
        self.index.get(id).map(|&i| &self.channels[i])
    }

    pub fn contains_channel(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Programmes of one channel, start-ascending
    pub fn programs_for<'a>(&'a self, channel_id: &str) -> impl Iterator<Item = &'a Program> + use<'a> {
        self.schedules
            .get(channel_id)
            .into_iter()
            .flat_map(|slots| slots.iter().map(|slot| &slot.program))
    }

    /// Every programme, grouped by channel order then start-ascending
    pub fn programs(&self) -> impl Iterator<Item = &Program> + '_ {
        self.channels
            .iter()
            .flat_map(move |channel| self.programs_for(&channel.id))
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn program_count(&self) -> usize {
        self.schedules.values().map(Vec::len).sum()
    }

    /// Insert a channel, or fill the empty fields of an existing one.
    pub fn upsert_channel(&mut self, channel: Channel) -> ChannelUpsert {
        if let Some(&i) = self.index.get(&channel.id) {
            let existing = &mut self.channels[i];
            let mut changed = false;
            if existing.display_name.is_empty() && !channel.display_name.is_empty() {
                existing.display_name = channel.display_name;
                changed = true;
            }
            if existing.icon.as_deref().is_none_or(str::is_empty)
                && channel.icon.as_deref().is_some_and(|icon| !icon.is_empty())
            {
                existing.icon = channel.icon;
                changed = true;
            }
            return if changed {
                ChannelUpsert::Updated
            } else {
                ChannelUpsert::Unchanged
            };
        }

        self.index.insert(channel.id.clone(), self.channels.len());
        self.channels.push(channel);
        ChannelUpsert::Inserted
    }

    /// Schedule a programme on its channel, keeping start-ascending order.
    ///
    /// Programmes with equal starts never coexist, so the insertion point is
    /// unambiguous; whichever programme was scheduled first wins a collision.
    pub fn insert_program(&mut self, program: Program, source: &str) -> Result<(), ProgramRejection> {
        if !self.index.contains_key(&program.channel_id) {
            return Err(ProgramRejection::UnknownChannel);
        }

        let slots = self.schedules.entry(program.channel_id.clone()).or_default();
        let at = slots.partition_point(|slot| slot.program.start <= program.start);

        // The schedule is sorted and disjoint, so only the neighbours can collide.
        let neighbours = [at.checked_sub(1), Some(at)];
        for slot in neighbours.into_iter().flatten().filter_map(|i| slots.get(i)) {
            if slot.program.overlaps(&program) {
                return Err(ProgramRejection::Overlap {
                    existing: ProgramRef::new(&slot.source, &slot.program),
                });
            }
        }

        slots.insert(
            at,
            ScheduledProgram {
                program,
                source: source.to_string(),
            },
        );
        Ok(())
    }
}
