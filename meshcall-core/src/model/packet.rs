use crate::model::caption::CaptionEvent;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("caption channel packet: {0}")]
pub struct PacketError(#[from] postcard::Error);

/// Frame exchanged on the peer-to-peer caption channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Packet {
    Caption(CaptionEvent),
}

impl Packet {
    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        Ok(postcard::to_allocvec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, PacketError> {
        Ok(postcard::from_bytes(bytes)?)
    }
}
