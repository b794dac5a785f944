//! # Module Bus
//!
//! This module defines the [`MessageBus`], the in-process router that connects modules.
//!
//! Every module registers under a unique name and a group, and receives its messages on its
//! own bounded mpsc queue. Senders address a module by name, or a whole group by group name.
//!
//! The bus also offers the synchronous primitive modules need for request/response over
//! queues: [`MessageBus::send_sync`] registers the request in a [`CorrelationTable`] and
//! suspends the caller until the receiver answers with [`MessageBus::send_resp`] or the
//! deadline passes.

use crate::correlation::CorrelationTable;
use crate::error::BusError;
use crate::message::Message;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

struct ModuleEntry {
    group: String,
    sender: mpsc::Sender<Message>,
}

/// Registry and router for module queues.
///
/// The bus is cheap to clone; every clone shares the same registry.
#[derive(Clone)]
pub struct MessageBus {
    modules: Arc<DashMap<String, ModuleEntry>>,
    waiters: CorrelationTable,
    buffer_size: usize,
}

impl MessageBus {
    /// Creates an empty bus whose module queues hold up to `buffer_size` messages.
    pub fn new(buffer_size: usize) -> Self {
        Self {
            modules: Arc::new(DashMap::new()),
            waiters: CorrelationTable::new(),
            buffer_size,
        }
    }

    /// Registers `name` in `group` and returns the receiving end of its queue.
    ///
    /// Registering a name again replaces the previous queue, which then closes.
    pub fn add_module(&self, name: &str, group: &str) -> mpsc::Receiver<Message> {
        let (sender, receiver) = mpsc::channel(self.buffer_size);
        let entry = ModuleEntry {
            group: group.to_string(),
            sender,
        };
        if self.modules.insert(name.to_string(), entry).is_some() {
            warn!(module = name, "Module registered twice; previous queue closed");
        }
        info!(module = name, group, "Module registered");
        receiver
    }

    /// Removes `name` from the registry. Its queue closes once in-flight sends finish.
    pub fn remove_module(&self, name: &str) {
        if self.modules.remove(name).is_some() {
            info!(module = name, "Module removed");
        }
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Names of the modules registered in `group`.
    pub fn group_members(&self, group: &str) -> Vec<String> {
        self.modules
            .iter()
            .filter(|entry| entry.value().group == group)
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Delivers `msg` to the module called `module`.
    pub async fn send(&self, module: &str, msg: Message) -> Result<(), BusError> {
        // Clone the sender so no registry lock is held across the await.
        let sender = self
            .modules
            .get(module)
            .map(|entry| entry.sender.clone())
            .ok_or_else(|| BusError::ModuleNotFound(module.to_string()))?;
        debug!(
            module,
            id = msg.id(),
            operation = %msg.operation(),
            resource = msg.resource(),
            "Send"
        );
        sender
            .send(msg)
            .await
            .map_err(|_| BusError::ModuleClosed(module.to_string()))
    }

    /// Delivers a copy of `msg` to every module of `group`.
    pub async fn send_to_group(&self, group: &str, msg: Message) -> Result<(), BusError> {
        let members = self.group_members(group);
        if members.is_empty() {
            return Err(BusError::GroupNotFound(group.to_string()));
        }
        for module in members {
            self.send(&module, msg.clone()).await?;
        }
        Ok(())
    }

    /// Sends `msg` to `module` and waits for the correlated response.
    pub async fn send_sync(
        &self,
        module: &str,
        msg: Message,
        timeout: Duration,
    ) -> Result<Message, BusError> {
        let msg = msg.with_sync(true);
        let call = self.waiters.register(msg.id(), timeout);
        self.send(module, msg).await?;
        call.wait().await
    }

    /// Answers a request previously sent with [`MessageBus::send_sync`].
    ///
    /// Returns the response back when no caller is waiting for it.
    pub fn send_resp(&self, response: Message) -> Result<(), Message> {
        self.waiters.resolve(response)
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}
