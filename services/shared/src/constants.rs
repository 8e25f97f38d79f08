/// Shared constants for the lottery agency protocol
///
/// This module centralizes the wire vocabulary so the client and any
/// server-side tooling agree on command names, separators and limits.

/// Command sent once every bet of an agency has been acknowledged.
pub const NOTIFY_BETS_FINISHED: &str = "NOTIFY_BETS_FINISHED";

/// Command used to ask the server for the winners of an agency.
pub const GET_WINNERS: &str = "GET_WINNERS";

/// Substring the server answers with while the draw has not been held.
pub const DRAW_NOT_HELD: &str = "Sorteo no realizado";

/// Separator between the fields of one serialized bet.
pub const FIELD_SEPARATOR: char = ',';

/// Separator between bets inside a batch payload, and the response terminator.
pub const RECORD_SEPARATOR: char = '\n';

/// Number of fields in a CSV row of the agency file (no agency column).
pub const CSV_FIELD_COUNT: usize = 5;

/// Number of fields in a serialized bet on the wire (agency first).
pub const WIRE_FIELD_COUNT: usize = 6;

/// Largest payload the length-prefixed framing can describe.
///
/// The prefix is a big-endian `u16`, so anything longer cannot be framed.
pub const MAX_FRAME_PAYLOAD: usize = u16::MAX as usize;

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_BYTES: usize = 2;

/// Delay between winners requests while the draw is pending (seconds)
pub const DEFAULT_POLL_DELAY_SECS: u64 = 5;

/// Default number of bets per batch
pub const DEFAULT_BATCH_MAX_SIZE: usize = 100;

/// Shortest possible serialized bet plus its record separator:
/// five one-character fields, a ten-character birthdate and six separators.
pub const MIN_WIRE_RECORD_BYTES: usize = 21;

/// Largest batch whose payload could still fit in one length-prefixed frame
pub const MAX_BATCH_SIZE: usize = MAX_FRAME_PAYLOAD / MIN_WIRE_RECORD_BYTES;

/// Format used for birthdates both in the CSV file and on the wire.
pub const BIRTHDATE_FORMAT: &str = "%Y-%m-%d";
