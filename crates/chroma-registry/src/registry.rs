//! The client registry: maps client identities to their open channels.
//!
//! This is the leaf of the server's state. Every other component finds a
//! client's channel by looking it up here.
//!
//! # Concurrency note
//!
//! `ClientRegistry` is NOT thread-safe by itself: it uses a plain
//! `HashMap`. It is owned by the single coordinator task, which applies
//! every connect, message, disconnect and tick one at a time.

use std::collections::HashMap;

use chroma_protocol::{ClientId, Codec, JsonCodec, ServerMessage};
use tokio::sync::mpsc::error::TrySendError;

use crate::{Client, ClientSender, Frame, RegistryError};

/// Tracks every connected client.
///
/// ## Lifecycle
///
/// ```text
/// channel opens ──→ register() ──→ send() / send_frame() ... ──→ unregister()
///                      │
///                      └──→ pushes {"method":"connect","clientId":…}
/// ```
pub struct ClientRegistry<C: Codec = JsonCodec> {
    clients: HashMap<ClientId, Client>,
    codec: C,
}

impl ClientRegistry<JsonCodec> {
    /// Creates an empty registry that speaks JSON.
    pub fn new() -> Self {
        Self::with_codec(JsonCodec)
    }
}

impl Default for ClientRegistry<JsonCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Codec> ClientRegistry<C> {
    /// Creates an empty registry using the given codec for outbound frames.
    pub fn with_codec(codec: C) -> Self {
        Self {
            clients: HashMap::new(),
            codec,
        }
    }

    /// Registers a newly opened channel and returns its fresh identity.
    ///
    /// The `connect` message is queued on `sender` before this returns:
    /// it is the only message a client ever receives unprompted. A
    /// channel that is already gone is still registered; its closing
    /// event will remove it.
    pub fn register(&mut self, sender: ClientSender) -> ClientId {
        // Ids must be unique among live clients.
        let mut id = ClientId::random();
        while self.clients.contains_key(&id) {
            id = ClientId::random();
        }

        self.clients
            .insert(id.clone(), Client::new(id.clone(), sender));
        tracing::info!(client_id = %id, clients = self.clients.len(), "client registered");

        let connect = ServerMessage::Connect {
            client_id: id.clone(),
        };
        if let Err(e) = self.send(&id, &connect) {
            tracing::debug!(client_id = %id, error = %e, "connect message not delivered");
        }

        id
    }

    /// Removes a client. Returns `false` if it was not registered.
    pub fn unregister(&mut self, id: &ClientId) -> bool {
        match self.clients.remove(id) {
            Some(client) => {
                tracing::info!(
                    client_id = %id,
                    connected_for = ?client.connected_for(),
                    clients = self.clients.len(),
                    "client unregistered"
                );
                true
            }
            None => false,
        }
    }

    /// Looks up a live client's channel.
    pub fn lookup(&self, id: &ClientId) -> Option<&ClientSender> {
        self.clients.get(id).map(Client::sender)
    }

    /// Looks up a client's full record.
    pub fn get(&self, id: &ClientId) -> Option<&Client> {
        self.clients.get(id)
    }

    /// `true` if a client is registered under `id`.
    pub fn contains(&self, id: &ClientId) -> bool {
        self.clients.contains_key(id)
    }

    /// Encodes a message into a frame with the registry's codec.
    pub fn encode(&self, msg: &ServerMessage) -> Result<Frame, RegistryError> {
        Ok(Frame::from(self.codec.encode(msg)?))
    }

    /// Encodes and queues a message for one client.
    ///
    /// # Errors
    /// - [`RegistryError::UnknownClient`] — nobody registered under `id`
    /// - [`RegistryError::ChannelClosed`] — the client's writer is gone
    /// - [`RegistryError::QueueFull`] — the client is not keeping up
    /// - [`RegistryError::Protocol`] — the message failed to encode
    pub fn send(&self, id: &ClientId, msg: &ServerMessage) -> Result<(), RegistryError> {
        let frame = self.encode(msg)?;
        self.send_frame(id, frame)
    }

    /// Queues an already-encoded frame for one client.
    ///
    /// Never waits: if the client's queue is full the frame is dropped
    /// and [`RegistryError::QueueFull`] returned. Every `update` carries
    /// the whole game, so a slow reader only misses intermediate states.
    pub fn send_frame(&self, id: &ClientId, frame: Frame) -> Result<(), RegistryError> {
        let client = self
            .clients
            .get(id)
            .ok_or_else(|| RegistryError::UnknownClient(id.clone()))?;
        client.sender.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => RegistryError::QueueFull(id.clone()),
            TrySendError::Closed(_) => RegistryError::ChannelClosed(id.clone()),
        })
    }

    /// Queues one frame for each of `ids`, skipping any that are missing
    /// or closed. Returns how many clients the frame was queued for.
    pub fn send_to_all<'a>(
        &self,
        ids: impl IntoIterator<Item = &'a ClientId>,
        frame: &Frame,
    ) -> usize {
        let mut delivered = 0;
        for id in ids {
            match self.send_frame(id, Frame::clone(frame)) {
                Ok(()) => delivered += 1,
                Err(e) => tracing::debug!(client_id = %id, error = %e, "skipping recipient"),
            }
        }
        delivered
    }

    /// Returns the identities of all registered clients.
    pub fn ids(&self) -> Vec<ClientId> {
        self.clients.keys().cloned().collect()
    }

    /// Returns the number of registered clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns `true` if no clients are registered.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================
