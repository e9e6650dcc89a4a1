use crate::registry::chat_history::ChatEntry;
use crate::registry::room_command::{JoinReply, RoomCommand};
use crate::registry::room_registry::RegistryShared;
use crate::registry::ChatHistory;
use crate::relay::SignalingOutput;
use meshcall_core::utils::now_millis;
use meshcall_core::{CaptionPayload, ParticipantId, RoomCode, ServerMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Actor owning the roster and chat history of one room.
///
/// Every mutation of the room and every fan-out it triggers happens inside [`Room::run`], so the
/// notifications each member sees are in the same order as the roster changes.
pub(crate) struct Room {
    code: RoomCode,
    generation: u64,
    roster: Vec<ParticipantId>,
    history: ChatHistory,
    command_rx: mpsc::Receiver<RoomCommand>,
    registry: Arc<RegistryShared>,
    output: Arc<dyn SignalingOutput>,
}

impl Room {
    pub(crate) fn new(
        code: RoomCode,
        generation: u64,
        command_rx: mpsc::Receiver<RoomCommand>,
        registry: Arc<RegistryShared>,
        output: Arc<dyn SignalingOutput>,
        history_limit: usize,
    ) -> Self {
        Self {
            code,
            generation,
            roster: Vec::new(),
            history: ChatHistory::new(history_limit),
            command_rx,
            registry,
            output,
        }
    }

    pub async fn run(mut self) {
        info!(room = %self.code, "Room opened");

        while let Some(cmd) = self.command_rx.recv().await {
            self.handle_command(cmd).await;

            if self.roster.is_empty() {
                break;
            }
        }

        self.shutdown();
        info!(room = %self.code, "Room closed");
    }

    async fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join { participant, reply } => {
                let roster = self.join(participant).await;
                let _ = reply.send(JoinReply::Joined(roster));
            }

            RoomCommand::Leave { participant, reply } => {
                let remaining = self.leave(participant).await;
                let _ = reply.send(remaining);
            }

            RoomCommand::Chat { from, text, sender } => {
                self.relay_chat(from, text, sender).await;
            }

            RoomCommand::Caption { from, payload } => {
                self.relay_caption(from, payload).await;
            }

            RoomCommand::Roster { reply } => {
                let _ = reply.send(self.roster.clone());
            }
        }
    }

    async fn join(&mut self, participant: ParticipantId) -> Vec<ParticipantId> {
        if self.roster.contains(&participant) {
            debug!(room = %self.code, %participant, "Repeated join, answering the joiner only");
            let msg = ServerMessage::Joined {
                participant,
                roster: self.roster.clone(),
            };
            self.output.deliver(&participant, msg).await;
            return self.roster.clone();
        }

        self.roster.push(participant);
        self.registry
            .membership
            .insert(participant, self.code.clone());
        info!(
            room = %self.code,
            %participant,
            members = self.roster.len(),
            "Participant joined"
        );

        self.broadcast_join(participant).await;
        self.replay_history(participant).await;

        self.roster.clone()
    }

    /// Everybody, the newcomer included, learns the full roster. Each side then decides on its
    /// own whether to dial.
    async fn broadcast_join(&self, participant: ParticipantId) {
        let msg = ServerMessage::Joined {
            participant,
            roster: self.roster.clone(),
        };
        self.output.broadcast(&self.roster, msg).await;
    }

    async fn replay_history(&self, participant: ParticipantId) {
        for entry in self.history.iter() {
            let msg = ServerMessage::Chat {
                text: entry.text.clone(),
                sender: entry.sender.clone(),
                from: entry.from,
            };
            self.output.deliver(&participant, msg).await;
        }
    }

    async fn leave(&mut self, participant: ParticipantId) -> Option<Vec<ParticipantId>> {
        let position = self.roster.iter().position(|p| *p == participant)?;
        self.roster.remove(position);

        self.registry
            .membership
            .remove_if(&participant, |_, code| *code == self.code);
        info!(
            room = %self.code,
            %participant,
            members = self.roster.len(),
            "Participant left"
        );

        self.output
            .broadcast(&self.roster, ServerMessage::Left { participant })
            .await;

        Some(self.roster.clone())
    }

    async fn relay_chat(&mut self, from: ParticipantId, text: String, sender: String) {
        if !self.roster.contains(&from) {
            debug!(room = %self.code, %from, "Dropping chat from non-member");
            return;
        }

        self.history.push(ChatEntry {
            text: text.clone(),
            sender: sender.clone(),
            from,
        });

        let msg = ServerMessage::Chat { text, sender, from };
        self.output.broadcast(&self.roster, msg).await;
    }

    async fn relay_caption(&self, from: ParticipantId, payload: CaptionPayload) {
        if !self.roster.contains(&from) {
            debug!(room = %self.code, %from, "Dropping caption from non-member");
            return;
        }

        let event = payload.into_event(from, now_millis());
        let others: Vec<ParticipantId> =
            self.roster.iter().copied().filter(|p| *p != from).collect();
        self.output
            .broadcast(&others, ServerMessage::Caption { event })
            .await;
    }

    /// Unregister this instance and answer whatever raced into the queue after the last member
    /// left. Joins get `Closed` so the registry retries them on a fresh room.
    fn shutdown(&mut self) {
        let generation = self.generation;
        self.registry
            .rooms
            .remove_if(&self.code, |_, handle| handle.generation == generation);

        self.command_rx.close();
        while let Ok(cmd) = self.command_rx.try_recv() {
            match cmd {
                RoomCommand::Join { reply, .. } => {
                    let _ = reply.send(JoinReply::Closed);
                }
                RoomCommand::Leave { reply, .. } => {
                    let _ = reply.send(None);
                }
                RoomCommand::Roster { reply } => {
                    let _ = reply.send(Vec::new());
                }
                RoomCommand::Chat { from, .. } | RoomCommand::Caption { from, .. } => {
                    debug!(room = %self.code, %from, "Dropping message for closed room");
                }
            }
        }
    }
}
