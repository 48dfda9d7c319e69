use thiserror::Error;

/// Errors raised while reading, merging or configuring variant tracks.
#[derive(Debug, Error)]
pub enum TrackError {
    /// Underlying stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed record header or allele line.
    #[error("format error at line {line}: {message}")]
    Format {
        /// 1-based line number within the offending stream.
        line: usize,
        /// Description of what was wrong with the line.
        message: String,
    },

    /// A source produced a position behind the window being merged.
    #[error(
        "source {source_index} is not sorted: chromosome index {chromosome} coordinate {coordinate} \
         lies before the active window (chromosome index {active_chromosome}, start {window_start})"
    )]
    OutOfOrder {
        /// Registration index of the offending source.
        source_index: usize,
        /// Chromosome index of the offending entry.
        chromosome: usize,
        /// Coordinate of the offending entry.
        coordinate: u64,
        /// Chromosome index being merged.
        active_chromosome: usize,
        /// Lower bound of the active window.
        window_start: u64,
    },

    /// A coordinate lies past the last window of its chromosome.
    #[error("coordinate {coordinate} exceeds the maximum chromosome size {limit}")]
    CoordinateOutOfRange {
        /// Offending coordinate.
        coordinate: u64,
        /// First coordinate no window covers.
        limit: u64,
    },

    /// Engine or filter configured with unusable parameters.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl TrackError {
    /// Helper for constructing format errors.
    pub fn format(line: usize, message: impl Into<String>) -> Self {
        TrackError::Format {
            line,
            message: message.into(),
        }
    }
}
