use crate::error::RelayError;
use crate::registry::room_command::{JoinReply, RoomCommand};
use crate::registry::Room;
use crate::relay::SignalingOutput;
use dashmap::DashMap;
use meshcall_core::{ParticipantId, RoomCode};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

/// A closed room unregisters itself right after it stops accepting commands, so a join rarely
/// needs more than one retry.
const JOIN_ATTEMPTS: usize = 8;

pub(crate) struct RoomHandle {
    pub(crate) generation: u64,
    pub(crate) tx: mpsc::Sender<RoomCommand>,
}

pub(crate) struct RegistryShared {
    pub(crate) rooms: DashMap<RoomCode, RoomHandle>,
    pub(crate) membership: DashMap<ParticipantId, RoomCode>,
    next_generation: AtomicU64,
    output: Arc<dyn SignalingOutput>,
    history_limit: usize,
    command_buffer: usize,
}

/// Handle to every live room. Cloning is cheap and all clones see the same rooms.
#[derive(Clone)]
pub struct RoomRegistry {
    inner: Arc<RegistryShared>,
}

impl RoomRegistry {
    pub fn new(
        output: Arc<dyn SignalingOutput>,
        history_limit: usize,
        command_buffer: usize,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryShared {
                rooms: DashMap::new(),
                membership: DashMap::new(),
                next_generation: AtomicU64::new(0),
                output,
                history_limit,
                command_buffer: command_buffer.max(1),
            }),
        }
    }

    fn room_sender(&self, code: &RoomCode) -> mpsc::Sender<RoomCommand> {
        let handle = self.inner.rooms.entry(code.clone()).or_insert_with(|| {
            info!(room = %code, "Creating new room");
            let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
            let (tx, rx) = mpsc::channel(self.inner.command_buffer);

            let room = Room::new(
                code.clone(),
                generation,
                rx,
                self.inner.clone(),
                self.inner.output.clone(),
                self.inner.history_limit,
            );
            tokio::spawn(room.run());

            RoomHandle { generation, tx }
        });

        handle.tx.clone()
    }

    /// Add `participant` to `code`, creating the room when needed, and return the ordered roster.
    /// Joining a room the participant is already in just answers with the current roster.
    pub async fn join(
        &self,
        code: &RoomCode,
        participant: ParticipantId,
    ) -> Result<Vec<ParticipantId>, RelayError> {
        for _ in 0..JOIN_ATTEMPTS {
            let tx = self.room_sender(code);
            let (reply, rx) = oneshot::channel();

            if tx.send(RoomCommand::Join { participant, reply }).await.is_err() {
                self.forget_closed(code, &tx);
                continue;
            }

            match rx.await {
                Ok(JoinReply::Joined(roster)) => return Ok(roster),
                Ok(JoinReply::Closed) | Err(_) => self.forget_closed(code, &tx),
            }
        }

        warn!(room = %code, %participant, "Giving up on join, room kept closing");
        Err(RelayError::RoomUnavailable(code.clone()))
    }

    /// Remove `participant` from whatever room it is in. `None` when it was in no room.
    pub async fn leave(&self, participant: ParticipantId) -> Option<Vec<ParticipantId>> {
        let code = self.find_room_of(&participant)?;
        let tx = self.inner.rooms.get(&code).map(|h| h.tx.clone())?;

        let (reply, rx) = oneshot::channel();
        tx.send(RoomCommand::Leave { participant, reply }).await.ok()?;
        rx.await.ok().flatten()
    }

    pub fn find_room_of(&self, participant: &ParticipantId) -> Option<RoomCode> {
        self.inner
            .membership
            .get(participant)
            .map(|code| code.value().clone())
    }

    /// Current roster of `code`; empty when the room does not exist.
    pub async fn roster(&self, code: &RoomCode) -> Vec<ParticipantId> {
        let Some(tx) = self.inner.rooms.get(code).map(|h| h.tx.clone()) else {
            return Vec::new();
        };

        let (reply, rx) = oneshot::channel();
        if tx.send(RoomCommand::Roster { reply }).await.is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    /// Hand a fire-and-forget command to the room `participant` belongs to.
    pub async fn dispatch(
        &self,
        participant: &ParticipantId,
        cmd: RoomCommand,
    ) -> Result<(), RelayError> {
        let code = self
            .find_room_of(participant)
            .ok_or(RelayError::NotInRoom(*participant))?;
        let tx = self
            .inner
            .rooms
            .get(&code)
            .map(|h| h.tx.clone())
            .ok_or(RelayError::NotInRoom(*participant))?;

        tx.send(cmd)
            .await
            .map_err(|_| RelayError::NotInRoom(*participant))
    }

    pub fn room_count(&self) -> usize {
        self.inner.rooms.len()
    }

    fn forget_closed(&self, code: &RoomCode, tx: &mpsc::Sender<RoomCommand>) {
        self.inner
            .rooms
            .remove_if(code, |_, handle| handle.tx.same_channel(tx));
    }
}
