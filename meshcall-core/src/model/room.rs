use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const MAX_ROOM_CODE_LEN: usize = 128;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidRoomCode {
    #[error("room code is empty")]
    Empty,
    #[error("room code longer than {MAX_ROOM_CODE_LEN} characters")]
    TooLong,
}

/// Opaque room identifier chosen by the clients (meeting code or page path).
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    pub fn parse(code: impl Into<String>) -> Result<Self, InvalidRoomCode> {
        let code = code.into();
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return Err(InvalidRoomCode::Empty);
        }
        if trimmed.chars().count() > MAX_ROOM_CODE_LEN {
            return Err(InvalidRoomCode::TooLong);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomCode {
    type Error = InvalidRoomCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
