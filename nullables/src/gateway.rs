//! Nullable chat gateway and responder.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use mintgate_gateway::{ChannelId, GatewayError, Responder, RoleGateway};
use mintgate_types::UserId;

use crate::{Journal, JournalEntry};

fn forbidden() -> GatewayError {
    GatewayError::Http {
        status: 403,
        body: "injected failure".into(),
    }
}

/// Records role changes and messages; tracks who currently holds the role.
#[derive(Default)]
pub struct NullGateway {
    role_holders: Mutex<HashSet<UserId>>,
    grants: Mutex<Vec<UserId>>,
    removals: Mutex<Vec<UserId>>,
    direct_messages: Mutex<Vec<(UserId, String)>>,
    channel_messages: Mutex<Vec<(ChannelId, String)>>,
    fail_grants: AtomicBool,
    fail_dms: AtomicBool,
    fail_removal_for: Mutex<HashSet<UserId>>,
    journal: Option<Journal>,
}

impl NullGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal: Some(journal),
            ..Self::default()
        }
    }

    /// Pretend `user` already holds the role.
    pub fn give_role(&self, user: &str) {
        self.role_holders.lock().unwrap().insert(UserId::new(user));
    }

    pub fn has_role(&self, user: &str) -> bool {
        self.role_holders.lock().unwrap().contains(&UserId::new(user))
    }

    pub fn fail_grants(&self, fail: bool) {
        self.fail_grants.store(fail, Ordering::SeqCst);
    }

    /// Direct messages (and opening DM channels) fail while set.
    pub fn fail_direct_messages(&self, fail: bool) {
        self.fail_dms.store(fail, Ordering::SeqCst);
    }

    pub fn fail_removal_for(&self, user: &str) {
        self.fail_removal_for.lock().unwrap().insert(UserId::new(user));
    }

    pub fn grants(&self) -> Vec<UserId> {
        self.grants.lock().unwrap().clone()
    }

    pub fn removals(&self) -> Vec<UserId> {
        self.removals.lock().unwrap().clone()
    }

    pub fn direct_messages(&self) -> Vec<(UserId, String)> {
        self.direct_messages.lock().unwrap().clone()
    }

    pub fn channel_messages(&self) -> Vec<(ChannelId, String)> {
        self.channel_messages.lock().unwrap().clone()
    }

    fn journal(&self, entry: JournalEntry) {
        if let Some(journal) = &self.journal {
            journal.record(entry);
        }
    }
}

#[async_trait]
impl RoleGateway for NullGateway {
    async fn grant_role(&self, user: &UserId) -> Result<(), GatewayError> {
        if self.fail_grants.load(Ordering::SeqCst) {
            return Err(forbidden());
        }
        self.role_holders.lock().unwrap().insert(user.clone());
        self.grants.lock().unwrap().push(user.clone());
        self.journal(JournalEntry::Grant(user.clone()));
        Ok(())
    }

    async fn remove_role(&self, user: &UserId) -> Result<(), GatewayError> {
        if self.fail_removal_for.lock().unwrap().contains(user) {
            return Err(forbidden());
        }
        self.role_holders.lock().unwrap().remove(user);
        self.removals.lock().unwrap().push(user.clone());
        self.journal(JournalEntry::Remove(user.clone()));
        Ok(())
    }

    async fn open_direct_channel(&self, user: &UserId) -> Result<ChannelId, GatewayError> {
        if self.fail_dms.load(Ordering::SeqCst) {
            return Err(forbidden());
        }
        Ok(ChannelId::new(format!("dm-{user}")))
    }

    async fn send_channel_message(
        &self,
        channel: &ChannelId,
        text: &str,
    ) -> Result<(), GatewayError> {
        self.channel_messages
            .lock()
            .unwrap()
            .push((channel.clone(), text.to_string()));
        Ok(())
    }

    async fn send_direct_message(&self, user: &UserId, text: &str) -> Result<(), GatewayError> {
        self.open_direct_channel(user).await?;
        self.direct_messages
            .lock()
            .unwrap()
            .push((user.clone(), text.to_string()));
        self.journal(JournalEntry::DirectMessage(user.clone()));
        Ok(())
    }
}

/// Records interaction replies.
#[derive(Default)]
pub struct NullResponder {
    edits: Mutex<Vec<String>>,
    follow_ups: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl NullResponder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every reply fails while set.
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn edits(&self) -> Vec<String> {
        self.edits.lock().unwrap().clone()
    }

    pub fn follow_ups(&self) -> Vec<String> {
        self.follow_ups.lock().unwrap().clone()
    }

    /// Most recent text sent through either channel.
    pub fn last_message(&self) -> Option<String> {
        self.follow_ups
            .lock()
            .unwrap()
            .last()
            .cloned()
            .or_else(|| self.edits.lock().unwrap().last().cloned())
    }
}

#[async_trait]
impl Responder for NullResponder {
    async fn edit_original(&self, text: &str) -> Result<(), GatewayError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(GatewayError::Unreachable("injected failure".into()));
        }
        self.edits.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn follow_up(&self, text: &str) -> Result<(), GatewayError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(GatewayError::Unreachable("injected failure".into()));
        }
        self.follow_ups.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn role_tracking() {
        let gw = NullGateway::new();
        gw.grant_role(&UserId::new("a")).await.unwrap();
        assert!(gw.has_role("a"));
        gw.remove_role(&UserId::new("a")).await.unwrap();
        assert!(!gw.has_role("a"));
        assert_eq!(gw.removals(), vec![UserId::new("a")]);
    }

    #[tokio::test]
    async fn failing_dm_is_forbidden() {
        let gw = NullGateway::new();
        gw.fail_direct_messages(true);
        let err = gw
            .send_direct_message(&UserId::new("a"), "hi")
            .await
            .unwrap_err();
        assert!(err.is_forbidden());
        assert!(gw.direct_messages().is_empty());
    }
}
