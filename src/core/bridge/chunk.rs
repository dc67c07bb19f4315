use crate::domain::config::OPERATOR_TAG;
use chrono::{DateTime, Local};
use std::fmt;

/// `ctime`-style layout used for record timestamps
pub const TIMESTAMP_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

const HEX_FIELD: &str = " | HEX: ";
const TXT_FIELD: &str = " | TXT: ";

/// Where a chunk came from and where it went
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Direction {
    /// Forwarded by the relay loop from one endpoint to the other
    Relay { from: String, to: String },
    /// Written by the operator through the injection channel
    Injected { to: String },
}

impl Direction {
    pub fn destination(&self) -> &str {
        match self {
            Direction::Relay { to, .. } | Direction::Injected { to } => to,
        }
    }

    pub fn is_injected(&self) -> bool {
        matches!(self, Direction::Injected { .. })
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Relay { from, to } => {
                write!(f, "{} → {}", from.to_uppercase(), to.to_uppercase())
            }
            Direction::Injected { to } => {
                write!(f, "{} → {}", OPERATOR_TAG.to_uppercase(), to.to_uppercase())
            }
        }
    }
}

/// Bytes moved in one step, with direction and capture time.
#[derive(Debug, Clone)]
pub struct TransferChunk {
    direction: Direction,
    data: Vec<u8>,
    captured_at: DateTime<Local>,
}

impl TransferChunk {
    pub fn new(direction: Direction, data: Vec<u8>) -> Self {
        Self {
            direction,
            data,
            captured_at: Local::now(),
        }
    }

    pub fn relayed(from: &str, to: &str, data: Vec<u8>) -> Self {
        Self::new(
            Direction::Relay {
                from: from.to_string(),
                to: to.to_string(),
            },
            data,
        )
    }

    pub fn injected(to: &str, data: Vec<u8>) -> Self {
        Self::new(Direction::Injected { to: to.to_string() }, data)
    }

    pub fn direction(&self) -> &Direction {
        &self.direction
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn captured_at(&self) -> DateTime<Local> {
        self.captured_at
    }

    pub fn hex(&self) -> String {
        hex::encode(&self.data)
    }

    pub fn text(&self) -> String {
        printable_text(&self.data)
    }

    /// Render the log record: `[FROM → TO] <time> | HEX: <hex> | TXT: <text>`
    pub fn render(&self) -> String {
        format!(
            "[{}] {}{}{}{}{}",
            self.direction,
            self.captured_at.format(TIMESTAMP_FORMAT),
            HEX_FIELD,
            self.hex(),
            TXT_FIELD,
            self.text()
        )
    }
}

/// Best-effort text view of raw bytes.
///
/// Invalid UTF-8 is dropped and control characters are escaped so a record
/// always stays on a single line.
pub fn printable_text(data: &[u8]) -> String {
    let mut text = String::with_capacity(data.len());
    for chunk in data.utf8_chunks() {
        for c in chunk.valid().chars() {
            if c.is_control() {
                text.extend(c.escape_default());
            } else {
                text.push(c);
            }
        }
    }
    text
}

/// Recover the payload bytes from a rendered record line.
pub fn parse_hex_field(line: &str) -> Option<Vec<u8>> {
    let start = line.find(HEX_FIELD)? + HEX_FIELD.len();
    let rest = &line[start..];
    let end = rest.find(TXT_FIELD).unwrap_or(rest.len());
    hex::decode(&rest[..end]).ok()
}
