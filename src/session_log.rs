//! Recording of normalized samples to disk, and the trait the feed loop
//! records through. The on-disk layout is:
//!
//! - a [ron]-encoded header naming the recorded channels, in order:
//!
//! ```text
//! (channels:["EMG1","EMG2",...])
//! ```
//!
//! - a separator byte of all 1s, `0xFF`;
//! - then the rows, one per published sample: the session timestamp
//!   followed by one value per channel, each a big-endian `f64`.
//!
//! The writer streams rows as they are produced, so a log is useful even if
//! the process dies mid-session; the reader loads a complete file back for
//! offline tooling and tests.

use serde::{Deserialize, Serialize};
use std::{
    borrow::Cow,
    fmt,
    fs::File,
    io::{BufWriter, Read, Write},
    path::Path,
};

/// Where the feed loop hands recorded samples. Implementations serialize
/// their own I/O; the loop calls from a single thread.
pub trait SampleSink: Send {
    /// Appends one normalized sample at the given session time.
    fn append(&mut self, time: f64, values: &[f64]) -> Result<(), SessionLogError>;

    /// Flushes and closes the underlying resource. Called once when the
    /// feed loop exits.
    fn finish(&mut self) -> Result<(), SessionLogError>;
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
struct SessionLogHeader {
    channels: Vec<String>,
}

/// Things that can go wrong reading, writing, or decoding a session log.
#[derive(Debug)]
pub enum SessionLogError {
    /// A row was handed to the writer with the wrong number of values.
    RowArity {
        /// Channel count the log was created with.
        expected: usize,
        /// Values actually supplied.
        got: usize,
    },
    /// No `0xFF` separator between header and rows.
    NoDelimiter,
    /// The row section does not divide into whole rows.
    TruncatedRow,
    /// Underlying file I/O failed.
    IoError(std::io::Error),
    /// Serialization of the header failed.
    RonError(ron::Error),
    /// Deserialization of the header failed.
    RonSpannedError(ron::de::SpannedError),
}

impl fmt::Display for SessionLogError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use SessionLogError as SLE;
        let msg = match self {
            SLE::RowArity { expected, got } => {
                Cow::from(format!("row has {} values, log has {} channels", got, expected))
            }
            SLE::NoDelimiter => Cow::from("no delimiter in session log"),
            SLE::TruncatedRow => Cow::from("session log ends mid-row"),
            SLE::IoError(error) => Cow::from(format!("io error: {}", error)),
            SLE::RonError(error) => Cow::from(format!("ron error: {}", error)),
            SLE::RonSpannedError(error) => Cow::from(format!("ron spanning error: {}", error)),
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for SessionLogError {}

/// Streaming writer for a session log. Create it before acquisition starts
/// and pass it to the device as its [`SampleSink`].
pub struct SessionLogWriter<W: Write + Send> {
    out: W,
    n_channels: usize,
}

impl SessionLogWriter<BufWriter<File>> {
    /// Creates a log file at `path` and writes its header.
    pub fn create(
        path: impl AsRef<Path>,
        channels: Vec<String>,
    ) -> Result<Self, SessionLogError> {
        let file = File::create(path).map_err(SessionLogError::IoError)?;
        Self::new(BufWriter::new(file), channels)
    }
}

impl<W: Write + Send> SessionLogWriter<W> {
    /// Wraps any writer, emitting the header and separator immediately.
    pub fn new(mut out: W, channels: Vec<String>) -> Result<Self, SessionLogError> {
        let n_channels = channels.len();
        let header = SessionLogHeader { channels };
        let h_str = ron::ser::to_string(&header).map_err(SessionLogError::RonError)?;

        out.write_all(h_str.as_bytes())
            .map_err(SessionLogError::IoError)?;
        out.write_all(&[0xFF]).map_err(SessionLogError::IoError)?;

        Ok(SessionLogWriter { out, n_channels })
    }
}

impl<W: Write + Send> SampleSink for SessionLogWriter<W> {
    fn append(&mut self, time: f64, values: &[f64]) -> Result<(), SessionLogError> {
        if values.len() != self.n_channels {
            return Err(SessionLogError::RowArity {
                expected: self.n_channels,
                got: values.len(),
            });
        }

        let mut row = Vec::with_capacity((values.len() + 1) * 8);
        row.extend_from_slice(&time.to_be_bytes());
        for value in values {
            row.extend_from_slice(&value.to_be_bytes());
        }
        self.out.write_all(&row).map_err(SessionLogError::IoError)
    }

    fn finish(&mut self) -> Result<(), SessionLogError> {
        self.out.flush().map_err(SessionLogError::IoError)
    }
}

/// A fully loaded session log.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionLog {
    header: SessionLogHeader,
    rows: Vec<(f64, Vec<f64>)>,
}

impl SessionLog {
    /// Reads a session log from the path provided.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SessionLogError> {
        let mut handle = File::open(path).map_err(SessionLogError::IoError)?;
        Self::from_file(&mut handle)
    }

    /// Reads a session log from the [Read]able object provided.
    pub fn from_file(file: &mut impl Read) -> Result<Self, SessionLogError> {
        let mut raw = Vec::new();
        file.read_to_end(&mut raw).map_err(SessionLogError::IoError)?;

        let delim_idx = raw
            .iter()
            .position(|b| *b == 0xFF)
            .ok_or(SessionLogError::NoDelimiter)?;

        let (header_buf, rows_buf) = raw.split_at(delim_idx);
        let rows_buf = &rows_buf[1..];

        let header = ron::de::from_bytes::<SessionLogHeader>(header_buf)
            .map_err(SessionLogError::RonSpannedError)?;

        let row_bytes = (header.channels.len() + 1) * 8;
        if rows_buf.len() % row_bytes != 0 {
            return Err(SessionLogError::TruncatedRow);
        }

        let rows = rows_buf
            .chunks(row_bytes)
            .map(|chunk| {
                let mut fields = chunk.chunks(8).map(|bs| {
                    // chunk size is a multiple of 8, so this cannot fail
                    let eight: [u8; 8] = bs.try_into().unwrap_or_default();
                    f64::from_be_bytes(eight)
                });
                let time = fields.next().unwrap_or_default();
                (time, fields.collect())
            })
            .collect();

        Ok(SessionLog { header, rows })
    }

    /// Channel names the log was recorded with, in order.
    pub fn channels(&self) -> &[String] {
        &self.header.channels
    }

    /// The recorded `(time, values)` rows in arrival order.
    pub fn rows(&self) -> &[(f64, Vec<f64>)] {
        &self.rows
    }
}
