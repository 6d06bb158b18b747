//! Transaction log events
//!
//! Defines the immutable record written for every mutation and its
//! line-oriented text encoding.

use std::fmt;

use crate::error::{KvError, Result};

/// Kind of mutation recorded by an event
///
/// Discriminants are part of the on-disk format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventType {
    Delete = 1,
    Put = 2,
}

impl TryFrom<u8> for EventType {
    type Error = KvError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(EventType::Delete),
            2 => Ok(EventType::Put),
            other => Err(KvError::Parse {
                line: 0,
                reason: format!("unknown event type {}", other),
            }),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Delete => f.write_str("DELETE"),
            EventType::Put => f.write_str("PUT"),
        }
    }
}

/// A single logged mutation
///
/// `sequence` is 0 until a backend persists the event and assigns one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub sequence: u64,
    pub kind: EventType,
    pub key: String,
    pub value: String,
}

impl Event {
    /// An unsequenced Put
    pub fn put(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            sequence: 0,
            kind: EventType::Put,
            key: key.into(),
            value: value.into(),
        }
    }

    /// An unsequenced Delete
    pub fn delete(key: impl Into<String>) -> Self {
        Self {
            sequence: 0,
            kind: EventType::Delete,
            key: key.into(),
            value: String::new(),
        }
    }

    /// Copy of this event carrying an assigned sequence number
    pub fn with_sequence(&self, sequence: u64) -> Self {
        Self {
            sequence,
            ..self.clone()
        }
    }

    /// Encode as `sequence\ttype\tkey\tvalue\n`
    pub fn encode_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\n",
            self.sequence, self.kind as u8, self.key, self.value
        )
    }

    /// Parse one line (without its trailing newline)
    ///
    /// `line_no` is 1-based and only used for error reporting. The value is
    /// everything after the third tab.
    pub fn parse_line(line: &str, line_no: u64) -> Result<Self> {
        let parse_err = |reason: String| KvError::Parse {
            line: line_no,
            reason,
        };

        let mut fields = line.splitn(4, '\t');

        let sequence = fields
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| parse_err("missing sequence field".to_string()))?;
        let sequence = sequence
            .parse::<u64>()
            .map_err(|e| parse_err(format!("invalid sequence {:?}: {}", sequence, e)))?;

        let kind = fields
            .next()
            .ok_or_else(|| parse_err("missing type field".to_string()))?;
        let kind = kind
            .parse::<u8>()
            .map_err(|e| parse_err(format!("invalid type {:?}: {}", kind, e)))?;
        let kind = EventType::try_from(kind)
            .map_err(|_| parse_err(format!("unknown event type {}", kind)))?;

        let key = fields
            .next()
            .ok_or_else(|| parse_err("missing key field".to_string()))?;
        let value = fields
            .next()
            .ok_or_else(|| parse_err("missing value field".to_string()))?;

        Ok(Self {
            sequence,
            kind,
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}
