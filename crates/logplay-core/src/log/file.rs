//! On-disk event log format
//!
//! Each record is framed as:
//!
//! ```text
//! u32 magic (0xEDA1DA01) | i64 event number | i64 timestamp (us)
//! i32 channel length     | i32 payload length
//! channel bytes          | payload bytes
//! ```
//!
//! All integers are big-endian. Readers resynchronize on the magic word, so
//! a cursor placed at an arbitrary byte offset finds the next record.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::{LogAccessor, LogError, Record, RecordWriter};

/// Record framing marker
pub const LOG_MAGIC: u32 = 0xEDA1_DA01;

/// Channel names must be shorter than this
pub const MAX_CHANNEL_LEN: usize = 256;

/// Payloads must be shorter than this
pub const MAX_PAYLOAD_LEN: usize = 16 * 1024 * 1024;

/// Map a short read to the end-of-stream sentinel
fn eos(err: io::Error) -> LogError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        LogError::EndOfStream
    } else {
        LogError::Io(err)
    }
}

/// Read-only cursor over an event log file
pub struct LogFile {
    path: PathBuf,
    reader: BufReader<File>,
    len: u64,
}

impl LogFile {
    /// Open a log file for reading
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LogError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            path,
            reader: BufReader::new(file),
            len,
        })
    }

    /// File length in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    /// True if the file holds no bytes
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn sync_to_magic(&mut self) -> Result<(), LogError> {
        let mut magic: u32 = 0;
        loop {
            let byte = self.reader.read_u8().map_err(eos)?;
            magic = (magic << 8) | u32::from(byte);
            if magic == LOG_MAGIC {
                return Ok(());
            }
        }
    }
}

impl LogAccessor for LogFile {
    fn read_next(&mut self) -> Result<Record, LogError> {
        loop {
            self.sync_to_magic()?;

            let event_number = self.reader.read_i64::<BigEndian>().map_err(eos)?;
            let timestamp = self.reader.read_i64::<BigEndian>().map_err(eos)?;
            let channel_len = self.reader.read_i32::<BigEndian>().map_err(eos)?;
            let payload_len = self.reader.read_i32::<BigEndian>().map_err(eos)?;

            if channel_len <= 0
                || payload_len <= 0
                || channel_len as usize >= MAX_CHANNEL_LEN
                || payload_len as usize >= MAX_PAYLOAD_LEN
            {
                tracing::warn!(
                    event_number,
                    timestamp,
                    channel_len,
                    payload_len,
                    "Bad log record header, resynchronizing"
                );
                continue;
            }

            let mut channel = vec![0u8; channel_len as usize];
            self.reader.read_exact(&mut channel).map_err(eos)?;
            let mut payload = vec![0u8; payload_len as usize];
            self.reader.read_exact(&mut payload).map_err(eos)?;

            return Ok(Record {
                event_number,
                timestamp,
                channel: String::from_utf8_lossy(&channel).into_owned(),
                payload,
            });
        }
    }

    fn seek_fraction(&mut self, fraction: f64) -> Result<(), LogError> {
        let offset = (self.len as f64 * fraction.clamp(0.0, 1.0)) as u64;
        self.reader.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    fn position_fraction(&mut self) -> Result<f64, LogError> {
        if self.len == 0 {
            return Ok(0.0);
        }
        let offset = self.reader.stream_position()?;
        Ok(offset as f64 / self.len as f64)
    }

    fn reopen(&self) -> Result<Box<dyn LogAccessor>, LogError> {
        Ok(Box::new(LogFile::open(&self.path)?))
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// Writer producing the on-disk event log format
pub struct LogFileWriter {
    writer: BufWriter<File>,
}

impl LogFileWriter {
    /// Create (or truncate) a log file for writing
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, LogError> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl RecordWriter for LogFileWriter {
    fn write_record(&mut self, record: &Record) -> Result<(), LogError> {
        let channel = record.channel.as_bytes();
        if channel.is_empty() || channel.len() >= MAX_CHANNEL_LEN {
            return Err(LogError::InvalidRecord(format!(
                "channel name length {} out of range",
                channel.len()
            )));
        }
        if record.payload.is_empty() || record.payload.len() >= MAX_PAYLOAD_LEN {
            return Err(LogError::InvalidRecord(format!(
                "payload length {} out of range on channel {}",
                record.payload.len(),
                record.channel
            )));
        }

        self.writer.write_u32::<BigEndian>(LOG_MAGIC)?;
        self.writer.write_i64::<BigEndian>(record.event_number)?;
        self.writer.write_i64::<BigEndian>(record.timestamp)?;
        self.writer.write_i32::<BigEndian>(channel.len() as i32)?;
        self.writer
            .write_i32::<BigEndian>(record.payload.len() as i32)?;
        self.writer.write_all(channel)?;
        self.writer.write_all(&record.payload)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), LogError> {
        self.writer.flush()?;
        Ok(())
    }
}
