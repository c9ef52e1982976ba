//! Per-log preferences file
//!
//! Stored next to the log as `<logpath>.jlp`. Line oriented, whitespace
//! separated tokens:
//!
//! ```text
//! BOOKMARK <PLAIN|LREPEAT|RREPEAT> <position>
//! ZOOMFRAC <fraction>
//! CHANNEL <inchannel> <outchannel> <enabled>
//! ```
//!
//! Unknown or malformed lines are skipped.

use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::filter::ChannelFilter;

/// Extension appended to the log path
pub const PREFERENCES_EXTENSION: &str = "jlp";

/// Errors reading or writing a preferences file
#[derive(Error, Debug)]
pub enum PreferencesError {
    /// Preferences file exists but could not be read
    #[error("Failed to read preferences {path}: {source}")]
    Read {
        /// File involved
        path: PathBuf,
        /// OS error
        source: io::Error,
    },

    /// Preferences file could not be written
    #[error("Failed to write preferences {path}: {source}")]
    Write {
        /// File involved
        path: PathBuf,
        /// OS error
        source: io::Error,
    },
}

/// Scrubber bookmark flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookmarkKind {
    /// Ordinary marker
    Plain,
    /// Left end of a repeat region
    LeftRepeat,
    /// Right end of a repeat region
    RightRepeat,
}

impl BookmarkKind {
    fn token(&self) -> &'static str {
        match self {
            BookmarkKind::Plain => "PLAIN",
            BookmarkKind::LeftRepeat => "LREPEAT",
            BookmarkKind::RightRepeat => "RREPEAT",
        }
    }

    fn from_token(token: &str) -> Self {
        match token {
            "LREPEAT" => BookmarkKind::LeftRepeat,
            "RREPEAT" => BookmarkKind::RightRepeat,
            _ => BookmarkKind::Plain,
        }
    }
}

/// A marked position in the log
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bookmark {
    /// Marker type
    pub kind: BookmarkKind,
    /// Position as a fraction of the log
    pub position: f64,
}

/// Contents of a preferences file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preferences {
    /// Scrubber bookmarks
    pub bookmarks: Vec<Bookmark>,
    /// Scrubber zoom level
    pub zoom_fraction: Option<f64>,
    /// Saved channel filters
    pub channels: Vec<ChannelFilter>,
}

impl Preferences {
    /// Preferences path for a log file
    pub fn path_for<P: AsRef<Path>>(log_path: P) -> PathBuf {
        let mut name = OsString::from(log_path.as_ref().as_os_str());
        name.push(".");
        name.push(PREFERENCES_EXTENSION);
        PathBuf::from(name)
    }

    /// Parse preferences text, skipping anything unrecognized
    pub fn parse(content: &str) -> Self {
        let mut prefs = Preferences::default();

        for (line_no, line) in content.lines().enumerate() {
            let toks: Vec<&str> = line.split_whitespace().collect();
            match toks.as_slice() {
                [] => {}
                ["BOOKMARK", kind, position] => match position.parse::<f64>() {
                    Ok(position) => prefs.bookmarks.push(Bookmark {
                        kind: BookmarkKind::from_token(kind),
                        position,
                    }),
                    Err(_) => skip(line_no, line),
                },
                ["ZOOMFRAC", fraction, ..] => match fraction.parse::<f64>() {
                    Ok(f) => prefs.zoom_fraction = Some(f),
                    Err(_) => skip(line_no, line),
                },
                ["CHANNEL", inchannel, outchannel, enabled] => {
                    prefs.channels.push(ChannelFilter {
                        inchannel: inchannel.to_string(),
                        outchannel: outchannel.to_string(),
                        enabled: enabled.eq_ignore_ascii_case("true"),
                    });
                }
                _ => skip(line_no, line),
            }
        }

        prefs
    }

    /// Load a preferences file. A missing file is not an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PreferencesError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => Ok(Self::parse(&content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(PreferencesError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Save to a file, replacing it
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), PreferencesError> {
        let path = path.as_ref();
        fs::write(path, self.to_string()).map_err(|source| PreferencesError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn skip(line_no: usize, line: &str) {
    tracing::warn!(line = line_no + 1, content = line, "Skipping preferences line");
}

impl fmt::Display for Preferences {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.bookmarks {
            writeln!(f, "BOOKMARK {} {}", b.kind.token(), b.position)?;
        }
        if let Some(zoom) = self.zoom_fraction {
            writeln!(f, "ZOOMFRAC {}", zoom)?;
        }
        for c in &self.channels {
            writeln!(f, "CHANNEL {} {} {}", c.inchannel, c.outchannel, c.enabled)?;
        }
        Ok(())
    }
}
