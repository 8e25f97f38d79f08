/// Type-safe bet record and its validation
///
/// Bets are validated once, when they enter the client from the agency file,
/// so everything downstream can rely on well-formed fields and serialize
/// without further checks.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::*;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Wrong field count: {found} (expected {expected})")]
    FieldCount { found: usize, expected: usize },

    #[error("Field {0} is empty")]
    EmptyField(&'static str),

    #[error("Field {0} contains a reserved separator")]
    ReservedCharacter(&'static str),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Invalid birthdate: {0}")]
    InvalidBirthdate(String),

    #[error("Invalid number: {0}")]
    InvalidNumber(String),
}

/// National identity document of the person placing a bet.
///
/// Only ASCII digits are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Document(String);

impl Document {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Document {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyField("document"));
        }
        if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::InvalidDocument(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One lottery bet as read from the agency file.
///
/// The agency identifier is not part of the record; it is supplied by the
/// session when the bet is serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bet {
    pub first_name: String,
    pub last_name: String,
    pub document: Document,
    pub birthdate: NaiveDate,
    pub number: u32,
}

impl Bet {
    /// Build a bet from its raw textual fields, validating each of them
    pub fn new(
        first_name: &str,
        last_name: &str,
        document: &str,
        birthdate: &str,
        number: &str,
    ) -> Result<Self, ValidationError> {
        let first_name = validate_name("first_name", first_name)?;
        let last_name = validate_name("last_name", last_name)?;
        let document = Document::try_from(document)?;

        let birthdate = NaiveDate::parse_from_str(birthdate.trim(), BIRTHDATE_FORMAT)
            .map_err(|_| ValidationError::InvalidBirthdate(birthdate.trim().to_string()))?;

        let number = number
            .trim()
            .parse::<u32>()
            .map_err(|_| ValidationError::InvalidNumber(number.trim().to_string()))?;

        Ok(Self {
            first_name,
            last_name,
            document,
            birthdate,
            number,
        })
    }

    /// Build a bet from one row of the agency CSV file
    ///
    /// Column order: first name, last name, document, birthdate, number.
    pub fn from_csv_fields<S: AsRef<str>>(fields: &[S]) -> Result<Self, ValidationError> {
        if fields.len() != CSV_FIELD_COUNT {
            return Err(ValidationError::FieldCount {
                found: fields.len(),
                expected: CSV_FIELD_COUNT,
            });
        }
        Self::new(
            fields[0].as_ref(),
            fields[1].as_ref(),
            fields[2].as_ref(),
            fields[3].as_ref(),
            fields[4].as_ref(),
        )
    }

    /// Serialize the bet as one wire record, agency first
    pub fn to_wire(&self, agency: &str) -> String {
        format!(
            "{agency}{sep}{}{sep}{}{sep}{}{sep}{}{sep}{}",
            self.first_name,
            self.last_name,
            self.document,
            self.birthdate.format(BIRTHDATE_FORMAT),
            self.number,
            sep = FIELD_SEPARATOR,
        )
    }

    /// Parse one wire record back into its agency and bet
    pub fn from_wire(record: &str) -> Result<(String, Self), ValidationError> {
        let fields: Vec<&str> = record.split(FIELD_SEPARATOR).collect();
        if fields.len() != WIRE_FIELD_COUNT {
            return Err(ValidationError::FieldCount {
                found: fields.len(),
                expected: WIRE_FIELD_COUNT,
            });
        }
        let agency = fields[0].trim();
        if agency.is_empty() {
            return Err(ValidationError::EmptyField("agency"));
        }
        let bet = Self::from_csv_fields(&fields[1..])?;
        Ok((agency.to_string(), bet))
    }
}

fn validate_name(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    if trimmed.contains(FIELD_SEPARATOR) || trimmed.contains(RECORD_SEPARATOR) {
        return Err(ValidationError::ReservedCharacter(field));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Bet {
        Bet::new("Santiago Lionel", "Lorca", "30904465", "1999-03-17", "7574").unwrap()
    }

    #[test]
    fn test_bet_validation_accepts_well_formed_fields() {
        let bet = sample();
        assert_eq!(bet.first_name, "Santiago Lionel");
        assert_eq!(bet.document.as_str(), "30904465");
        assert_eq!(bet.birthdate, NaiveDate::from_ymd_opt(1999, 3, 17).unwrap());
        assert_eq!(bet.number, 7574);
    }

    #[test]
    fn test_bet_validation_rejects_bad_fields() {
        assert_eq!(
            Bet::new("", "Lorca", "1", "1999-03-17", "1").unwrap_err(),
            ValidationError::EmptyField("first_name")
        );
        assert_eq!(
            Bet::new("Ana", "Lo,rca", "1", "1999-03-17", "1").unwrap_err(),
            ValidationError::ReservedCharacter("last_name")
        );
        assert!(matches!(
            Bet::new("Ana", "Lorca", "12a", "1999-03-17", "1"),
            Err(ValidationError::InvalidDocument(_))
        ));
        assert!(matches!(
            Bet::new("Ana", "Lorca", "1", "17/03/1999", "1"),
            Err(ValidationError::InvalidBirthdate(_))
        ));
        assert!(matches!(
            Bet::new("Ana", "Lorca", "1", "1999-03-17", "-4"),
            Err(ValidationError::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_csv_row_with_wrong_field_count() {
        let err = Bet::from_csv_fields(&["Ana", "Lorca", "1"]).unwrap_err();
        assert_eq!(err, ValidationError::FieldCount { found: 3, expected: 5 });
    }

    #[test]
    fn test_wire_record_starts_with_agency() {
        let wire = sample().to_wire("3");
        assert_eq!(wire, "3,Santiago Lionel,Lorca,30904465,1999-03-17,7574");
    }

    #[test]
    fn test_shortest_wire_record_matches_batch_bound() {
        let bet = Bet::new("A", "B", "1", "1990-01-01", "0").unwrap();
        assert_eq!(bet.to_wire("1").len() + 1, MIN_WIRE_RECORD_BYTES);
        assert!(MAX_BATCH_SIZE * MIN_WIRE_RECORD_BYTES <= MAX_FRAME_PAYLOAD);
    }

    #[test]
    fn test_wire_record_parses_back() {
        let (agency, bet) = Bet::from_wire("3,Santiago Lionel,Lorca,30904465,1999-03-17,7574").unwrap();
        assert_eq!(agency, "3");
        assert_eq!(bet, sample());
    }

    #[test]
    fn test_bet_serialization() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(json.contains("30904465"));
        assert!(json.contains("1999-03-17"));
    }
}
