//! Variant-track data model, single-source reading and multi-source merging.
//!
//! Sources are read with [`TrackReader`] and merged by [`TrackParser`] into a
//! single stream ordered by `(chromosome index, coordinate)` in which every
//! position appears once.

mod chromosomes;
mod error;
mod merge;
mod reader;
mod types;

pub use chromosomes::ChromosomeList;
pub use error::TrackError;
pub use merge::{MergeConfig, TrackParser, DEFAULT_CHUNK_MAX, DEFAULT_CHUNK_SIZE};
pub use reader::{BufferedTrackReader, Entries, TrackReader};
pub use types::{Allele, EntryDisplay, Position, Statistics, TrackEntry, UNKNOWN_BASE};
