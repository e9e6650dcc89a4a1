mod chat_history;
mod room;
mod room_command;
mod room_registry;

pub(crate) use chat_history::ChatHistory;
pub(crate) use room::Room;
pub use room_command::{JoinReply, RoomCommand};
pub use room_registry::RoomRegistry;
