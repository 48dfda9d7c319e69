//! Reader for a single position-sorted track stream.
//!
//! A record is a header line followed by as many allele lines as the header
//! announces:
//!
//! ```text
//! chr1\t20000\tT\t2\t21\t220
//! \tG\t1\t20\tA, forward
//! \tG\t20\t200\tB, forward
//! ```
//!
//! Lines starting with `#` are collected as header text in input order,
//! including ones that appear between records; blank lines are skipped.
//! Allele lines are never treated as comments.

use std::io::BufRead;

use tracing::{debug, warn};

use crate::track::{Allele, ChromosomeList, Position, TrackEntry, TrackError};

const COMMENT_MARKER: char = '#';
const RECORD_FIELDS: usize = 6;
const ALLELE_FIELDS: usize = 5;

/// Streaming parser producing one [`TrackEntry`] per record.
#[derive(Debug)]
pub struct TrackReader<R> {
    inner: R,
    line_number: usize,
    line: String,
    headers: Vec<String>,
}

impl<R: BufRead> TrackReader<R> {
    /// Wrap a buffered stream.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line_number: 0,
            line: String::new(),
            headers: Vec::new(),
        }
    }

    /// Comment lines seen so far, in input order, wherever they occurred.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of lines consumed so far.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Read the next record, interning its chromosome into `chromosomes`.
    ///
    /// Returns `Ok(None)` at end of input.
    pub fn read_entry(
        &mut self,
        chromosomes: &mut ChromosomeList,
    ) -> Result<Option<TrackEntry>, TrackError> {
        loop {
            if !self.next_line()? {
                return Ok(None);
            }
            let line = self.line.trim_end();
            if line.is_empty() {
                continue;
            }
            if line.starts_with(COMMENT_MARKER) {
                self.headers.push(line.to_string());
                continue;
            }
            break;
        }

        let header_line = self.line_number;
        let header = parse_record_header(self.line.trim_end(), header_line, chromosomes)?;
        let mut entry = TrackEntry::new(header.position);

        for found in 0..header.number_of_alleles {
            if !self.next_line()? {
                return Err(TrackError::format(
                    header_line,
                    format!(
                        "record truncated: expected {} allele lines, found {}",
                        header.number_of_alleles, found
                    ),
                ));
            }
            let allele = parse_allele(self.line.trim_end(), self.line_number)?;
            entry.add_allele(allele);
        }

        let statistics = entry.statistics();
        if statistics.depth != header.depth || statistics.quality != header.quality {
            warn!(
                line = header_line,
                declared_depth = header.depth,
                declared_quality = header.quality,
                depth = statistics.depth,
                quality = statistics.quality,
                "record statistics disagree with its alleles; using allele sums"
            );
        }

        Ok(Some(entry))
    }

    /// Iterate over the remaining records.
    pub fn entries<'a>(&'a mut self, chromosomes: &'a mut ChromosomeList) -> Entries<'a, R> {
        Entries {
            reader: self,
            chromosomes,
            done: false,
        }
    }

    fn next_line(&mut self) -> Result<bool, TrackError> {
        self.line.clear();
        let read = self.inner.read_line(&mut self.line)?;
        if read == 0 {
            return Ok(false);
        }
        self.line_number += 1;
        Ok(true)
    }
}

struct RecordHeader {
    position: Position,
    number_of_alleles: usize,
    depth: u64,
    quality: u64,
}

fn parse_record_header(
    line: &str,
    line_number: usize,
    chromosomes: &mut ChromosomeList,
) -> Result<RecordHeader, TrackError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != RECORD_FIELDS {
        return Err(TrackError::format(
            line_number,
            format!(
                "record header has {} fields, expected {}",
                fields.len(),
                RECORD_FIELDS
            ),
        ));
    }
    if fields[0].is_empty() {
        return Err(TrackError::format(line_number, "record header lacks a chromosome"));
    }

    let coordinate = parse_number(fields[1], "coordinate", line_number)?;
    let number_of_alleles = parse_number(fields[3], "allele count", line_number)?;
    let depth = parse_number(fields[4], "depth", line_number)?;
    let quality = parse_number(fields[5], "quality", line_number)?;

    Ok(RecordHeader {
        position: Position::interned(chromosomes, fields[0], coordinate, fields[2]),
        number_of_alleles: usize::try_from(number_of_alleles).map_err(|_| {
            TrackError::format(line_number, "allele count does not fit in memory")
        })?,
        depth,
        quality,
    })
}

fn parse_allele(line: &str, line_number: usize) -> Result<Allele, TrackError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != ALLELE_FIELDS || !fields[0].is_empty() {
        return Err(TrackError::format(
            line_number,
            format!("could not read an allele from '{line}'"),
        ));
    }
    if fields[1].is_empty() {
        return Err(TrackError::format(line_number, "allele sequence is empty"));
    }

    let depth = parse_number(fields[2], "allele depth", line_number)?;
    let quality = parse_number(fields[3], "allele quality", line_number)?;
    let tags = fields[4]
        .split(',')
        .map(|tag| tag.strip_prefix(' ').unwrap_or(tag));

    Ok(Allele::new(fields[1], depth, quality, tags))
}

fn parse_number(field: &str, what: &str, line_number: usize) -> Result<u64, TrackError> {
    field
        .parse()
        .map_err(|_| TrackError::format(line_number, format!("invalid {what} '{field}'")))
}

/// Iterator adapter over [`TrackReader::read_entry`]; stops after the first
/// error.
#[derive(Debug)]
pub struct Entries<'a, R> {
    reader: &'a mut TrackReader<R>,
    chromosomes: &'a mut ChromosomeList,
    done: bool,
}

impl<R: BufRead> Iterator for Entries<'_, R> {
    type Item = Result<TrackEntry, TrackError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.read_entry(self.chromosomes) {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// [`TrackReader`] that keeps the most recently read entry available for
/// inspection.
#[derive(Debug)]
pub struct BufferedTrackReader<R> {
    reader: TrackReader<R>,
    last: Option<TrackEntry>,
    exhausted: bool,
}

impl<R: BufRead> BufferedTrackReader<R> {
    /// Wrap a buffered stream.
    pub fn new(inner: R) -> Self {
        Self::from_reader(TrackReader::new(inner))
    }

    /// Wrap an existing reader.
    pub fn from_reader(reader: TrackReader<R>) -> Self {
        Self {
            reader,
            last: None,
            exhausted: false,
        }
    }

    /// The retained entry, if any.
    pub fn peek(&self) -> Option<&TrackEntry> {
        self.last.as_ref()
    }

    /// Hand over the retained entry.
    pub fn take(&mut self) -> Option<TrackEntry> {
        self.last.take()
    }

    /// Replace the retained entry with the next record.
    ///
    /// End of input or a read failure mark the reader exhausted.
    pub fn advance(
        &mut self,
        chromosomes: &mut ChromosomeList,
    ) -> Result<Option<&TrackEntry>, TrackError> {
        if self.exhausted {
            self.last = None;
            return Ok(None);
        }
        match self.reader.read_entry(chromosomes) {
            Ok(entry) => {
                if entry.is_none() {
                    debug!(lines = self.reader.line_number(), "track source exhausted");
                    self.exhausted = true;
                }
                self.last = entry;
                Ok(self.last.as_ref())
            }
            Err(err) => {
                self.exhausted = true;
                self.last = None;
                Err(err)
            }
        }
    }

    /// Whether the underlying stream reached its end.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Comment lines seen so far.
    pub fn headers(&self) -> &[String] {
        self.reader.headers()
    }
}
