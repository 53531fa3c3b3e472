//! Actor-based concurrency for the issuer
//!
//! The issuer core is synchronous and relies on at most one in-flight
//! mutation per member. This module provides that guarantee for concurrent
//! embeddings with the single-writer pattern:
//!
//! - One actor task owns all mutating calls
//! - Callers hold a cloneable [`IssuerHandle`] over a bounded mailbox
//! - Read-only views stay on the shared [`CreditIssuer`] directly

use crate::{
    issuer::CreditIssuer,
    types::{Role, SyncOutcome},
    Error, Result,
};
use chrono::{DateTime, Duration, Utc};
use credit_ledger::MemberId;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Parameters for opening a credit line through the actor
#[derive(Debug, Clone)]
pub struct InitializeCreditLine {
    /// Principal invoking the operation
    pub caller: MemberId,
    /// Member receiving the line
    pub member: MemberId,
    /// Active window length
    pub period_length: Duration,
    /// Grace window length
    pub grace_length: Duration,
    /// Credit limit
    pub credit_limit: Decimal,
    /// Fee fraction
    pub fee_rate: Decimal,
    /// Minimum income-to-debt ratio
    pub min_itd: Decimal,
    /// Starting balance (debt assigned to the network)
    pub initial_balance: Decimal,
}

/// Message sent to the issuer actor
pub enum IssuerMessage {
    /// Run the transaction validation hook
    ValidateTransaction {
        from: MemberId,
        to: MemberId,
        amount: Decimal,
        response: oneshot::Sender<Result<bool>>,
    },

    /// Open a credit line
    Initialize {
        params: Box<InitializeCreditLine>,
        response: oneshot::Sender<Result<()>>,
    },

    /// Evaluate a member's period against the clock
    Sync {
        member: MemberId,
        response: oneshot::Sender<Result<SyncOutcome>>,
    },

    /// Suspend a member's period clock
    Pause {
        caller: MemberId,
        member: MemberId,
        response: oneshot::Sender<Result<()>>,
    },

    /// Resume a member's period clock
    Unpause {
        caller: MemberId,
        member: MemberId,
        response: oneshot::Sender<Result<SyncOutcome>>,
    },

    /// Override a member's period expiration
    SetPeriodExpiration {
        caller: MemberId,
        member: MemberId,
        expiration: DateTime<Utc>,
        response: oneshot::Sender<Result<()>>,
    },

    /// Override a member's grace window
    SetGraceLength {
        caller: MemberId,
        member: MemberId,
        grace_length: Duration,
        response: oneshot::Sender<Result<()>>,
    },

    /// Update a member's fee rate
    UpdateFeeRate {
        caller: MemberId,
        member: MemberId,
        fee_rate: Decimal,
        response: oneshot::Sender<Result<()>>,
    },

    /// Update a member's minimum income-to-debt ratio
    UpdateMinItd {
        caller: MemberId,
        member: MemberId,
        min_itd: Decimal,
        response: oneshot::Sender<Result<()>>,
    },

    /// Grant a role to a principal
    GrantRole {
        caller: MemberId,
        grantee: MemberId,
        role: Role,
        response: oneshot::Sender<Result<()>>,
    },

    /// Revoke a role from a principal
    RevokeRole {
        caller: MemberId,
        grantee: MemberId,
        role: Role,
        response: oneshot::Sender<Result<()>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that serializes issuer mutations
pub struct IssuerActor {
    /// Shared issuer core
    issuer: Arc<CreditIssuer>,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<IssuerMessage>,
}

impl IssuerActor {
    /// Create new actor
    pub fn new(issuer: Arc<CreditIssuer>, mailbox: mpsc::Receiver<IssuerMessage>) -> Self {
        Self { issuer, mailbox }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            if matches!(msg, IssuerMessage::Shutdown) {
                break;
            }
            self.handle_message(msg);
        }
        tracing::debug!("issuer actor stopped");
    }

    fn handle_message(&self, msg: IssuerMessage) {
        match msg {
            IssuerMessage::ValidateTransaction {
                from,
                to,
                amount,
                response,
            } => {
                let _ = response.send(self.issuer.validate_transaction(&from, &to, amount));
            }
            IssuerMessage::Initialize { params, response } => {
                let p = *params;
                let _ = response.send(self.issuer.initialize_credit_line(
                    &p.caller,
                    &p.member,
                    p.period_length,
                    p.grace_length,
                    p.credit_limit,
                    p.fee_rate,
                    p.min_itd,
                    p.initial_balance,
                ));
            }
            IssuerMessage::Sync { member, response } => {
                let _ = response.send(self.issuer.sync_credit_period(&member));
            }
            IssuerMessage::Pause {
                caller,
                member,
                response,
            } => {
                let _ = response.send(self.issuer.pause_period_of(&caller, &member));
            }
            IssuerMessage::Unpause {
                caller,
                member,
                response,
            } => {
                let _ = response.send(self.issuer.unpause_period_of(&caller, &member));
            }
            IssuerMessage::SetPeriodExpiration {
                caller,
                member,
                expiration,
                response,
            } => {
                let _ =
                    response.send(self.issuer.set_period_expiration(&caller, &member, expiration));
            }
            IssuerMessage::SetGraceLength {
                caller,
                member,
                grace_length,
                response,
            } => {
                let _ = response.send(self.issuer.set_grace_length(&caller, &member, grace_length));
            }
            IssuerMessage::UpdateFeeRate {
                caller,
                member,
                fee_rate,
                response,
            } => {
                let _ = response.send(self.issuer.update_fee_rate(&caller, &member, fee_rate));
            }
            IssuerMessage::UpdateMinItd {
                caller,
                member,
                min_itd,
                response,
            } => {
                let _ = response.send(self.issuer.update_min_itd(&caller, &member, min_itd));
            }
            IssuerMessage::GrantRole {
                caller,
                grantee,
                role,
                response,
            } => {
                let _ = response.send(self.issuer.grant_role(&caller, &grantee, role));
            }
            IssuerMessage::RevokeRole {
                caller,
                grantee,
                role,
                response,
            } => {
                let _ = response.send(self.issuer.revoke_role(&caller, &grantee, role));
            }
            IssuerMessage::Shutdown => unreachable!("handled in run loop"),
        }
    }
}

/// Handle for sending messages to the issuer actor
#[derive(Clone)]
pub struct IssuerHandle {
    sender: mpsc::Sender<IssuerMessage>,
}

impl IssuerHandle {
    /// Run the transaction validation hook
    pub async fn validate_transaction(
        &self,
        from: MemberId,
        to: MemberId,
        amount: Decimal,
    ) -> Result<bool> {
        let (tx, rx) = oneshot::channel();
        self.send(IssuerMessage::ValidateTransaction {
            from,
            to,
            amount,
            response: tx,
        })
        .await?;
        Self::recv(rx).await
    }

    /// Open a credit line
    pub async fn initialize_credit_line(&self, params: InitializeCreditLine) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(IssuerMessage::Initialize {
            params: Box::new(params),
            response: tx,
        })
        .await?;
        Self::recv(rx).await
    }

    /// Evaluate a member's period against the clock
    pub async fn sync_credit_period(&self, member: MemberId) -> Result<SyncOutcome> {
        let (tx, rx) = oneshot::channel();
        self.send(IssuerMessage::Sync {
            member,
            response: tx,
        })
        .await?;
        Self::recv(rx).await
    }

    /// Suspend a member's period clock
    pub async fn pause_period_of(&self, caller: MemberId, member: MemberId) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(IssuerMessage::Pause {
            caller,
            member,
            response: tx,
        })
        .await?;
        Self::recv(rx).await
    }

    /// Resume a member's period clock
    pub async fn unpause_period_of(
        &self,
        caller: MemberId,
        member: MemberId,
    ) -> Result<SyncOutcome> {
        let (tx, rx) = oneshot::channel();
        self.send(IssuerMessage::Unpause {
            caller,
            member,
            response: tx,
        })
        .await?;
        Self::recv(rx).await
    }

    /// Override a member's period expiration
    pub async fn set_period_expiration(
        &self,
        caller: MemberId,
        member: MemberId,
        expiration: DateTime<Utc>,
    ) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(IssuerMessage::SetPeriodExpiration {
            caller,
            member,
            expiration,
            response: tx,
        })
        .await?;
        Self::recv(rx).await
    }

    /// Override a member's grace window
    pub async fn set_grace_length(
        &self,
        caller: MemberId,
        member: MemberId,
        grace_length: Duration,
    ) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(IssuerMessage::SetGraceLength {
            caller,
            member,
            grace_length,
            response: tx,
        })
        .await?;
        Self::recv(rx).await
    }

    /// Update a member's fee rate
    pub async fn update_fee_rate(
        &self,
        caller: MemberId,
        member: MemberId,
        fee_rate: Decimal,
    ) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(IssuerMessage::UpdateFeeRate {
            caller,
            member,
            fee_rate,
            response: tx,
        })
        .await?;
        Self::recv(rx).await
    }

    /// Update a member's minimum income-to-debt ratio
    pub async fn update_min_itd(
        &self,
        caller: MemberId,
        member: MemberId,
        min_itd: Decimal,
    ) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(IssuerMessage::UpdateMinItd {
            caller,
            member,
            min_itd,
            response: tx,
        })
        .await?;
        Self::recv(rx).await
    }

    /// Grant a role to a principal
    pub async fn grant_role(
        &self,
        caller: MemberId,
        grantee: MemberId,
        role: Role,
    ) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(IssuerMessage::GrantRole {
            caller,
            grantee,
            role,
            response: tx,
        })
        .await?;
        Self::recv(rx).await
    }

    /// Revoke a role from a principal
    pub async fn revoke_role(
        &self,
        caller: MemberId,
        grantee: MemberId,
        role: Role,
    ) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(IssuerMessage::RevokeRole {
            caller,
            grantee,
            role,
            response: tx,
        })
        .await?;
        Self::recv(rx).await
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> Result<()> {
        self.send(IssuerMessage::Shutdown).await
    }

    async fn send(&self, msg: IssuerMessage) -> Result<()> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| Error::Concurrency("issuer mailbox closed".to_string()))
    }

    async fn recv<T>(rx: oneshot::Receiver<Result<T>>) -> Result<T> {
        rx.await
            .map_err(|_| Error::Concurrency("issuer actor dropped response".to_string()))?
    }
}

/// Spawn the issuer actor and return a handle to it
pub fn spawn_issuer_actor(issuer: Arc<CreditIssuer>, mailbox_capacity: usize) -> IssuerHandle {
    let (sender, mailbox) = mpsc::channel(mailbox_capacity.max(1));
    let actor = IssuerActor::new(issuer, mailbox);
    tokio::spawn(actor.run());
    IssuerHandle { sender }
}
