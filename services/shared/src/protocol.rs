/// Wire format shared by the agency client and the aggregator
///
/// Two framings exist for requests:
/// - length-prefixed: a big-endian `u16` byte count followed by the payload
/// - newline-delimited: the payload followed by a single `\n`
///
/// Responses are always text terminated by `\n`. A run uses one framing for
/// every request; the server does not accept both interchangeably.
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::constants::*;
use crate::errors::ProtocolError;
use crate::types::Bet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    #[default]
    LengthPrefixed,
    NewlineDelimited,
}

impl Framing {
    /// Largest payload this framing can carry
    pub fn max_payload(&self) -> usize {
        match self {
            Framing::LengthPrefixed => MAX_FRAME_PAYLOAD,
            Framing::NewlineDelimited => usize::MAX,
        }
    }

    /// Whether a batch of more than one bet can be expressed in one frame
    pub fn supports_multi_record(&self) -> bool {
        matches!(self, Framing::LengthPrefixed)
    }

    /// Encode one payload into a complete frame
    pub fn encode(&self, payload: &str) -> Result<Vec<u8>, ProtocolError> {
        let bytes = payload.as_bytes();
        match self {
            Framing::LengthPrefixed => {
                let len = u16::try_from(bytes.len()).map_err(|_| ProtocolError::PayloadTooLarge {
                    len: bytes.len(),
                    max: MAX_FRAME_PAYLOAD,
                })?;
                let mut frame = Vec::with_capacity(LENGTH_PREFIX_BYTES + bytes.len());
                frame.extend_from_slice(&len.to_be_bytes());
                frame.extend_from_slice(bytes);
                Ok(frame)
            }
            Framing::NewlineDelimited => {
                if payload.contains(RECORD_SEPARATOR) {
                    return Err(ProtocolError::EmbeddedDelimiter);
                }
                let mut frame = Vec::with_capacity(bytes.len() + 1);
                frame.extend_from_slice(bytes);
                frame.push(b'\n');
                Ok(frame)
            }
        }
    }

    /// Decode the first complete frame in `buf`
    ///
    /// Returns the payload and the number of bytes consumed, or `None` when
    /// more bytes are needed.
    pub fn decode(&self, buf: &[u8]) -> Result<Option<(String, usize)>, ProtocolError> {
        let (payload, consumed) = match self {
            Framing::LengthPrefixed => {
                if buf.len() < LENGTH_PREFIX_BYTES {
                    return Ok(None);
                }
                let len = u16::from_be_bytes([buf[0], buf[1]]) as usize;
                let end = LENGTH_PREFIX_BYTES + len;
                if buf.len() < end {
                    return Ok(None);
                }
                (&buf[LENGTH_PREFIX_BYTES..end], end)
            }
            Framing::NewlineDelimited => match buf.iter().position(|b| *b == b'\n') {
                Some(pos) => (&buf[..pos], pos + 1),
                None => return Ok(None),
            },
        };

        let payload = std::str::from_utf8(payload).map_err(|_| ProtocolError::InvalidUtf8)?;
        Ok(Some((payload.to_string(), consumed)))
    }
}

impl FromStr for Framing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "length_prefixed" | "length-prefixed" | "binary" => Ok(Framing::LengthPrefixed),
            "newline" | "newline_delimited" | "newline-delimited" | "line" => {
                Ok(Framing::NewlineDelimited)
            }
            other => Err(format!("unknown framing '{}'", other)),
        }
    }
}

impl std::fmt::Display for Framing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Framing::LengthPrefixed => write!(f, "length_prefixed"),
            Framing::NewlineDelimited => write!(f, "newline"),
        }
    }
}

/// A request sent by an agency
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Bets { agency: String, bets: Vec<Bet> },
    BetsFinished { agency: String },
    GetWinners { agency: String },
}

impl Message {
    /// Request payload, before framing
    pub fn payload(&self) -> String {
        match self {
            Message::Bets { agency, bets } => batch_payload(agency, bets),
            Message::BetsFinished { agency } => format!("{} {}", NOTIFY_BETS_FINISHED, agency),
            Message::GetWinners { agency } => format!("{} {}", GET_WINNERS, agency),
        }
    }

    /// Parse a request payload as received by the server
    pub fn parse(payload: &str) -> Result<Self, ProtocolError> {
        if let Some(agency) = command_argument(payload, NOTIFY_BETS_FINISHED) {
            return Ok(Message::BetsFinished { agency });
        }
        if let Some(agency) = command_argument(payload, GET_WINNERS) {
            return Ok(Message::GetWinners { agency });
        }

        let mut agency: Option<String> = None;
        let mut bets = Vec::new();
        for record in payload.split(RECORD_SEPARATOR) {
            if !record.contains(FIELD_SEPARATOR) {
                return Err(ProtocolError::UnknownCommand(truncate(record, 32)));
            }
            let (record_agency, bet) = Bet::from_wire(record)?;
            match &agency {
                Some(expected) if *expected != record_agency => {
                    return Err(ProtocolError::AgencyMismatch {
                        expected: expected.clone(),
                        found: record_agency,
                    });
                }
                Some(_) => {}
                None => agency = Some(record_agency),
            }
            bets.push(bet);
        }

        match agency {
            Some(agency) => Ok(Message::Bets { agency, bets }),
            None => Err(ProtocolError::UnknownCommand(String::new())),
        }
    }
}

/// Join bets into one batch payload: fields by `,`, records by `\n`
pub fn batch_payload(agency: &str, bets: &[Bet]) -> String {
    bets.iter()
        .map(|bet| bet.to_wire(agency))
        .collect::<Vec<_>>()
        .join(&RECORD_SEPARATOR.to_string())
}

fn command_argument(payload: &str, command: &str) -> Option<String> {
    let rest = payload.strip_prefix(command)?;
    let agency = rest.strip_prefix(' ')?.trim();
    if agency.is_empty() {
        None
    } else {
        Some(agency.to_string())
    }
}

/// Cut a string for status lines without splitting a character
pub fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// The server's answer to a winners request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WinnersResponse {
    /// The draw has not been held yet
    NotReady,
    /// Documents of the agency's winners, possibly none
    Ready(Vec<String>),
}

impl WinnersResponse {
    pub fn parse(response: &str) -> Self {
        if response.contains(DRAW_NOT_HELD) {
            return WinnersResponse::NotReady;
        }
        let winners = response
            .split(RECORD_SEPARATOR)
            .map(|line| line.trim_end_matches('\r').trim())
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        WinnersResponse::Ready(winners)
    }

    /// Text a server sends for this answer, terminator included
    pub fn render(&self) -> String {
        match self {
            WinnersResponse::NotReady => format!("{}{}", DRAW_NOT_HELD, RECORD_SEPARATOR),
            WinnersResponse::Ready(winners) => {
                format!("{}{}", winners.join(&RECORD_SEPARATOR.to_string()), RECORD_SEPARATOR)
            }
        }
    }
}
