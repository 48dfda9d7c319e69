//! Windowed k-way merge of position-sorted track sources.
//!
//! Each chromosome is cut into windows of `chunk_size` coordinates. For the
//! active window every source hands over its entries that fall inside it;
//! the collected entries are sorted and entries sharing a position are
//! merged. Only one window's worth of entries is ever held in memory.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, trace, warn};

use crate::track::{BufferedTrackReader, ChromosomeList, Position, TrackEntry, TrackError};

/// Default window width in coordinates.
pub const DEFAULT_CHUNK_SIZE: u64 = 10_000;

/// Default index of the last window of a chromosome.
pub const DEFAULT_CHUNK_MAX: u64 = 500_000;

/// Window configuration of a [`TrackParser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeConfig {
    /// Coordinates per window.
    pub chunk_size: u64,
    /// Index of the last window before moving to the next chromosome.
    pub chunk_max: u64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_max: DEFAULT_CHUNK_MAX,
        }
    }
}

impl MergeConfig {
    /// Set the window width, keeping `chunk_max`.
    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Derive `chunk_max` from the largest expected chromosome size.
    pub fn with_maximum_chromosome_size(mut self, max_size: u64) -> Self {
        if self.chunk_size > 0 {
            self.chunk_max = max_size.div_ceil(self.chunk_size);
        }
        self
    }

    /// First coordinate past the last window of a chromosome.
    pub fn coordinate_limit(&self) -> u64 {
        self.chunk_max
            .saturating_add(1)
            .saturating_mul(self.chunk_size)
    }

    fn validate(&self) -> Result<(), TrackError> {
        if self.chunk_size == 0 {
            return Err(TrackError::InvalidConfiguration(
                "chunk size must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Source<R> {
    reader: BufferedTrackReader<R>,
    open: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Inside,
    Ahead,
}

/// Merges any number of position-sorted sources into one ordered stream.
///
/// All sources share the parser's [`ChromosomeList`]; chromosome order is
/// the order in which names are first read (or the seeded order). Dropping
/// the parser drops, and thereby closes, every registered stream.
#[derive(Debug)]
pub struct TrackParser<R = Box<dyn BufRead>> {
    config: MergeConfig,
    chromosomes: ChromosomeList,
    sources: Vec<Source<R>>,
    buffer: VecDeque<TrackEntry>,
    window_len: usize,
    curchr: usize,
    chunki: u64,
    started: bool,
    finished: bool,
}

impl<R: BufRead> TrackParser<R> {
    /// Parser with the default window configuration.
    pub fn new() -> Self {
        Self::build(MergeConfig::default(), ChromosomeList::new())
    }

    /// Parser with an explicit window configuration.
    pub fn with_config(config: MergeConfig) -> Result<Self, TrackError> {
        config.validate()?;
        Ok(Self::build(config, ChromosomeList::new()))
    }

    /// Parser resolving chromosomes against a pre-seeded list.
    pub fn with_chromosomes(
        config: MergeConfig,
        chromosomes: ChromosomeList,
    ) -> Result<Self, TrackError> {
        config.validate()?;
        Ok(Self::build(config, chromosomes))
    }

    fn build(config: MergeConfig, chromosomes: ChromosomeList) -> Self {
        Self {
            config,
            chromosomes,
            sources: Vec::new(),
            buffer: VecDeque::new(),
            window_len: 0,
            curchr: 0,
            chunki: 0,
            started: false,
            finished: false,
        }
    }

    /// Register a sorted source stream; returns its source index.
    pub fn register(&mut self, stream: R) -> usize {
        self.sources.push(Source {
            reader: BufferedTrackReader::new(stream),
            open: true,
        });
        self.sources.len() - 1
    }

    /// Size hint for the largest chromosome; bounds the windows per
    /// chromosome. `None` keeps the current setting.
    pub fn set_maximum_chromosome_size(&mut self, max_size: Option<u64>) {
        if let Some(max_size) = max_size {
            self.config = self.config.with_maximum_chromosome_size(max_size);
        }
    }

    /// Window configuration in use.
    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Chromosome names seen so far.
    pub fn chromosomes(&self) -> &ChromosomeList {
        &self.chromosomes
    }

    /// Number of registered sources.
    pub fn n_sources(&self) -> usize {
        self.sources.len()
    }

    /// Comment lines read so far from source `index`.
    pub fn headers(&self, index: usize) -> Option<&[String]> {
        self.sources.get(index).map(|source| source.reader.headers())
    }

    /// Number of merged entries in the most recently filled window.
    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// Next merged entry, or `Ok(None)` once every source is exhausted and
    /// the last window drained.
    pub fn next_entry(&mut self) -> Result<Option<TrackEntry>, TrackError> {
        loop {
            if let Some(entry) = self.buffer.pop_front() {
                return Ok(Some(entry));
            }
            if self.finished {
                return Ok(None);
            }
            if self.started {
                self.advance_window();
            } else {
                self.started = true;
            }
            if let Err(err) = self.refill() {
                self.finished = true;
                self.buffer.clear();
                return Err(err);
            }
        }
    }

    fn advance_window(&mut self) {
        self.chunki += 1;
        if self.chunki > self.config.chunk_max {
            self.chunki = 0;
            self.curchr += 1;
        }
    }

    fn window_bounds(&self) -> (u64, u64) {
        let start = self.chunki.saturating_mul(self.config.chunk_size);
        (start, start.saturating_add(self.config.chunk_size))
    }

    fn refill(&mut self) -> Result<(), TrackError> {
        loop {
            self.collect_window()?;
            if !self.buffer.is_empty() || self.finished {
                return Ok(());
            }
            self.seek_pending();
        }
    }

    /// Fill the delivery buffer with the active window.
    fn collect_window(&mut self) -> Result<(), TrackError> {
        if self.sources.iter().all(|source| !source.open) {
            self.finished = true;
            return Ok(());
        }

        let (start, end) = self.window_bounds();
        let mut collected = Vec::new();
        for index in 0..self.sources.len() {
            self.drain_source(index, start, end, &mut collected)?;
        }

        // stable: entries at one position keep registration order
        collected.sort_by(|a, b| a.position.cmp(&b.position));

        self.buffer.clear();
        for entry in collected {
            match self.buffer.back_mut() {
                Some(last) if last.position == entry.position => {
                    if last.position.sequence != entry.position.sequence {
                        warn!(
                            chromosome = entry.position.chromosome,
                            coordinate = entry.position.coordinate,
                            kept = %last.position.sequence,
                            ignored = %entry.position.sequence,
                            "sources disagree on the reference sequence"
                        );
                    }
                    last.merge(entry);
                }
                _ => self.buffer.push_back(entry),
            }
        }
        self.window_len = self.buffer.len();

        debug!(
            chromosome = self.curchr,
            window = self.chunki,
            entries = self.window_len,
            "filled merge window"
        );
        Ok(())
    }

    /// Move every entry of source `index` that lies inside the window into
    /// `collected`.
    fn drain_source(
        &mut self,
        index: usize,
        start: u64,
        end: u64,
        collected: &mut Vec<TrackEntry>,
    ) -> Result<(), TrackError> {
        let curchr = self.curchr;
        let limit = self.config.coordinate_limit();
        let source = &mut self.sources[index];

        while source.open {
            let placement = match source.reader.peek() {
                Some(entry) => place(&entry.position, curchr, start, end, limit, index)?,
                None => {
                    if source.reader.advance(&mut self.chromosomes)?.is_none() {
                        source.open = false;
                    }
                    continue;
                }
            };
            match placement {
                Placement::Ahead => break,
                Placement::Inside => {
                    collected.extend(source.reader.take());
                    if source.reader.advance(&mut self.chromosomes)?.is_none() {
                        source.open = false;
                    }
                }
            }
        }
        Ok(())
    }

    /// Jump to the window holding the lowest pending lookahead.
    ///
    /// Equivalent to advancing through every empty window in between.
    fn seek_pending(&mut self) {
        let pending = self
            .sources
            .iter()
            .filter(|source| source.open)
            .filter_map(|source| source.reader.peek())
            .map(|entry| (entry.position.chromosome, entry.position.coordinate))
            .min();

        match pending {
            Some((chromosome, coordinate)) => {
                self.curchr = chromosome;
                self.chunki = coordinate / self.config.chunk_size;
                trace!(
                    chromosome = self.curchr,
                    window = self.chunki,
                    "skipping to next occupied window"
                );
            }
            None => self.advance_window(),
        }
    }
}

impl<R: BufRead> Default for TrackParser<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackParser<Box<dyn BufRead>> {
    /// Open and register a track file.
    pub fn register_path(&mut self, path: impl AsRef<Path>) -> Result<usize, TrackError> {
        let file = File::open(path.as_ref())?;
        Ok(self.register(Box::new(BufReader::new(file))))
    }
}

impl<R: BufRead> Iterator for TrackParser<R> {
    type Item = Result<TrackEntry, TrackError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}

fn place(
    position: &Position,
    curchr: usize,
    start: u64,
    end: u64,
    limit: u64,
    source_index: usize,
) -> Result<Placement, TrackError> {
    if position.coordinate >= limit {
        return Err(TrackError::CoordinateOutOfRange {
            coordinate: position.coordinate,
            limit,
        });
    }
    if position.chromosome < curchr || (position.chromosome == curchr && position.coordinate < start)
    {
        return Err(TrackError::OutOfOrder {
            source_index,
            chromosome: position.chromosome,
            coordinate: position.coordinate,
            active_chromosome: curchr,
            window_start: start,
        });
    }
    if position.chromosome > curchr || position.coordinate >= end {
        return Ok(Placement::Ahead);
    }
    Ok(Placement::Inside)
}
