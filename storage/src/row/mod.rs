use std::fmt;

use bytes::{Buf, BufMut};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Result, StorageError};

pub const COLUMN_USERNAME_SIZE: usize = 32;
pub const COLUMN_EMAIL_SIZE: usize = 255;

pub const ID_SIZE: usize = std::mem::size_of::<u32>();
// Each string field keeps one spare byte for the terminating zero
pub const USERNAME_SIZE: usize = COLUMN_USERNAME_SIZE + 1;
pub const EMAIL_SIZE: usize = COLUMN_EMAIL_SIZE + 1;
pub const ID_OFFSET: usize = 0;
pub const USERNAME_OFFSET: usize = ID_OFFSET + ID_SIZE;
pub const EMAIL_OFFSET: usize = USERNAME_OFFSET + USERNAME_SIZE;
pub const ROW_SIZE: usize = ID_SIZE + USERNAME_SIZE + EMAIL_SIZE;

/// The single record type stored in the table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Row {
    pub id: u32,
    pub username: String,
    pub email: String,
}

impl Row {
    pub fn new(id: u32, username: impl Into<String>, email: impl Into<String>) -> Result<Self> {
        let row = Self {
            id,
            username: username.into(),
            email: email.into(),
        };
        row.validate()?;
        Ok(row)
    }

    /// Checks both string columns fit their fixed-width fields.
    pub fn validate(&self) -> Result<()> {
        check_len("username", &self.username, COLUMN_USERNAME_SIZE)?;
        check_len("email", &self.email, COLUMN_EMAIL_SIZE)
    }

    /// Writes the fixed-width encoding into the first `ROW_SIZE` bytes of `dst`.
    pub fn serialize(&self, dst: &mut [u8]) -> Result<()> {
        self.validate()?;

        let mut buf = &mut dst[..ROW_SIZE];
        buf.put_u32(self.id);
        put_padded(&mut buf, self.username.as_bytes(), USERNAME_SIZE);
        put_padded(&mut buf, self.email.as_bytes(), EMAIL_SIZE);
        Ok(())
    }

    pub fn deserialize(src: &[u8]) -> Result<Self> {
        if src.len() < ROW_SIZE {
            return Err(StorageError::CorruptRow(format!(
                "expected {} bytes, got {}",
                ROW_SIZE,
                src.len()
            )));
        }

        let mut buf = &src[..ROW_SIZE];
        let id = buf.get_u32();
        let username = take_padded(&mut buf, "username", USERNAME_SIZE)?;
        let email = take_padded(&mut buf, "email", EMAIL_SIZE)?;

        Ok(Self {
            id,
            username,
            email,
        })
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.id, self.username, self.email)
    }
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<()> {
    if value.len() > max {
        return Err(StorageError::FieldTooLong {
            field,
            max,
            actual: value.len(),
        });
    }
    Ok(())
}

fn put_padded(buf: &mut &mut [u8], value: &[u8], width: usize) {
    buf.put_slice(value);
    buf.put_bytes(0, width - value.len());
}

fn take_padded(buf: &mut &[u8], field: &'static str, width: usize) -> Result<String> {
    let raw = &buf[..width];
    let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    let value = String::from_utf8(raw[..end].to_vec())
        .map_err(|e| StorageError::CorruptRow(format!("{field} is not valid UTF-8: {e}")))?;
    buf.advance(width);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_row_size() {
        assert_eq!(USERNAME_SIZE, 33);
        assert_eq!(EMAIL_SIZE, 256);
        assert_eq!(ROW_SIZE, 293);
        assert_eq!(EMAIL_OFFSET, 37);
    }

    #[test]
    fn test_serialize_layout() {
        let row = Row::new(0x0102_0304, "bob", "bob@example.com").unwrap();
        let mut buf = [0xFFu8; ROW_SIZE];
        row.serialize(&mut buf).unwrap();

        assert_eq!(&buf[..4], &[1, 2, 3, 4]);
        assert_eq!(&buf[USERNAME_OFFSET..USERNAME_OFFSET + 3], b"bob");
        assert!(buf[USERNAME_OFFSET + 3..EMAIL_OFFSET].iter().all(|&b| b == 0));
        assert_eq!(&buf[EMAIL_OFFSET..EMAIL_OFFSET + 15], b"bob@example.com");
        assert!(buf[EMAIL_OFFSET + 15..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_max_length_fields() {
        let username = "a".repeat(COLUMN_USERNAME_SIZE);
        let email = "a".repeat(COLUMN_EMAIL_SIZE);
        let row = Row::new(1, username, email).unwrap();

        let mut buf = [0u8; ROW_SIZE];
        row.serialize(&mut buf).unwrap();
        assert_eq!(Row::deserialize(&buf).unwrap(), row);
    }

    #[test]
    fn test_too_long_fields() {
        let result = Row::new(1, "a".repeat(COLUMN_USERNAME_SIZE + 1), "e");
        assert!(matches!(
            result,
            Err(StorageError::FieldTooLong {
                field: "username",
                max: 32,
                actual: 33
            })
        ));

        let result = Row::new(1, "u", "a".repeat(COLUMN_EMAIL_SIZE + 1));
        assert!(matches!(
            result,
            Err(StorageError::FieldTooLong { field: "email", .. })
        ));
    }

    #[test]
    fn test_invalid_utf8_is_corrupt() {
        let mut buf = [0u8; ROW_SIZE];
        buf[USERNAME_OFFSET] = 0xFF;

        assert!(matches!(
            Row::deserialize(&buf),
            Err(StorageError::CorruptRow(_))
        ));
    }

    #[test]
    fn test_display() {
        let row = Row::new(7, "user7", "person7@example.com").unwrap();
        assert_eq!(row.to_string(), "(7, user7, person7@example.com)");
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            id in any::<u32>(),
            username in "[a-zA-Z0-9_.]{0,32}",
            email in "[a-zA-Z0-9@._-]{0,255}",
        ) {
            let row = Row::new(id, username, email).unwrap();
            let mut buf = [0u8; ROW_SIZE];
            row.serialize(&mut buf).unwrap();
            prop_assert_eq!(Row::deserialize(&buf).unwrap(), row);
        }
    }
}
