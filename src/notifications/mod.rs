// ABOUTME: Fire-and-forget delivery of affiliation lifecycle events
// ABOUTME: Structured-log dispatcher for default delivery and a broadcast dispatcher for in-process subscribers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

//! # Notifications
//!
//! The affiliation workflow emits an [`AffiliationEvent`] after each
//! successful transition. Delivery runs on a spawned task through
//! [`spawn_dispatch`] and its outcome never affects the workflow result.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::AppResult;

/// Default capacity of the broadcast channel
pub const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// Something that happened to an affiliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AffiliationEvent {
    /// An existing account was invited and can accept or decline
    GymInvite {
        /// Pending row
        affiliation_id: Uuid,
        /// Invited account
        user_id: Uuid,
        /// Inviting gym
        gym_id: Uuid,
        /// Gym name for display
        gym_name: String,
    },
    /// A new account was invited and must complete registration
    AccountInvite {
        /// Pending row
        affiliation_id: Uuid,
        /// Placeholder account
        user_id: Uuid,
        /// Where the invitation is sent
        email: String,
        /// Name the owner entered for the invitee
        display_name: String,
        /// Inviting gym
        gym_id: Uuid,
        /// Verify page link carrying the invite token
        link: String,
    },
    /// The invited account accepted
    InviteAccepted {
        /// Row now active
        affiliation_id: Uuid,
        /// Affiliate
        user_id: Uuid,
        /// Gym
        gym_id: Uuid,
    },
    /// The invited account declined
    InviteDeclined {
        /// Deleted row
        affiliation_id: Uuid,
        /// Former invitee
        user_id: Uuid,
        /// Gym
        gym_id: Uuid,
    },
    /// The gym owner removed an affiliate
    AffiliateRemoved {
        /// Deleted row
        affiliation_id: Uuid,
        /// Former affiliate
        user_id: Uuid,
        /// Gym
        gym_id: Uuid,
    },
    /// An account joined through a referral code
    ReferralJoined {
        /// Active row
        affiliation_id: Uuid,
        /// New affiliate
        user_id: Uuid,
        /// Gym
        gym_id: Uuid,
    },
}

impl AffiliationEvent {
    /// Stable event name
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::GymInvite { .. } => "gym_invite",
            Self::AccountInvite { .. } => "account_invite",
            Self::InviteAccepted { .. } => "invite_accepted",
            Self::InviteDeclined { .. } => "invite_declined",
            Self::AffiliateRemoved { .. } => "affiliate_removed",
            Self::ReferralJoined { .. } => "referral_joined",
        }
    }

    /// Row the event is about
    #[must_use]
    pub const fn affiliation_id(&self) -> Uuid {
        match self {
            Self::GymInvite { affiliation_id, .. }
            | Self::AccountInvite { affiliation_id, .. }
            | Self::InviteAccepted { affiliation_id, .. }
            | Self::InviteDeclined { affiliation_id, .. }
            | Self::AffiliateRemoved { affiliation_id, .. }
            | Self::ReferralJoined { affiliation_id, .. } => *affiliation_id,
        }
    }

    /// Account the event concerns
    #[must_use]
    pub const fn user_id(&self) -> Uuid {
        match self {
            Self::GymInvite { user_id, .. }
            | Self::AccountInvite { user_id, .. }
            | Self::InviteAccepted { user_id, .. }
            | Self::InviteDeclined { user_id, .. }
            | Self::AffiliateRemoved { user_id, .. }
            | Self::ReferralJoined { user_id, .. } => *user_id,
        }
    }
}

/// Delivers affiliation events to whoever needs them
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Deliver one event
    ///
    /// # Errors
    ///
    /// Returns an error if delivery failed; callers only log it
    async fn dispatch(&self, event: AffiliationEvent) -> AppResult<()>;
}

/// Hand an event to a dispatcher on a detached task
pub fn spawn_dispatch(dispatcher: &Arc<dyn NotificationDispatcher>, event: AffiliationEvent) {
    let dispatcher = Arc::clone(dispatcher);
    tokio::spawn(async move {
        let kind = event.kind();
        let affiliation_id = event.affiliation_id();
        if let Err(e) = dispatcher.dispatch(event).await {
            warn!(
                event = kind,
                affiliation_id = %affiliation_id,
                error = %e,
                "Notification delivery failed"
            );
        }
    });
}

/// Writes every event to the structured log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotificationDispatcher;

#[async_trait]
impl NotificationDispatcher for LogNotificationDispatcher {
    async fn dispatch(&self, event: AffiliationEvent) -> AppResult<()> {
        if let AffiliationEvent::AccountInvite { email, link, .. } = &event {
            debug!(email = %email, link = %link, "Invite link issued");
        }
        info!(
            event = event.kind(),
            affiliation_id = %event.affiliation_id(),
            user_id = %event.user_id(),
            "Affiliation notification"
        );
        Ok(())
    }
}

/// Fans events out to in-process subscribers
#[derive(Debug, Clone)]
pub struct BroadcastNotificationDispatcher {
    sender: broadcast::Sender<AffiliationEvent>,
}

impl BroadcastNotificationDispatcher {
    /// Create a dispatcher whose channel buffers `capacity` events
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Receive every event dispatched from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AffiliationEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastNotificationDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_BROADCAST_CAPACITY)
    }
}

#[async_trait]
impl NotificationDispatcher for BroadcastNotificationDispatcher {
    async fn dispatch(&self, event: AffiliationEvent) -> AppResult<()> {
        let kind = event.kind();
        // No subscribers is not a failure
        if self.sender.send(event).is_err() {
            debug!(event = kind, "No notification subscribers");
        }
        Ok(())
    }
}
