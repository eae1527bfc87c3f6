// Infraction ledger service - core business logic for moderation records.
//
// This service handles:
// - Filing infractions and evaluating auto-escalation
// - Listing, counting and removing cases
// - Role hierarchy checks before any action is taken
//
// NO Discord dependencies here - just pure domain logic.

use super::escalation::EscalationPolicy;
use super::moderation_models::{
    Infraction, InfractionFilter, Issuer, MemberRank, NewInfraction, RecordOutcome,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Case #{0} not found")]
    NotFound(u64),

    #[error("{0}")]
    Hierarchy(String),

    #[error("Malformed infraction record: {0}")]
    Malformed(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Persistence for the infraction ledger. Every operation is scoped to a
/// guild and ignores soft-deleted records.
#[async_trait]
pub trait InfractionStore: Send + Sync {
    /// The case id the next `append` in this guild will receive.
    async fn next_id(&self, guild_id: u64) -> Result<u64, ModerationError>;

    /// Reserve an id, stamp the creation time and persist the record.
    /// Id reservation must be atomic so concurrent appends never collide.
    async fn append(&self, new: NewInfraction) -> Result<Infraction, ModerationError>;

    async fn get(&self, guild_id: u64, id: u64) -> Result<Option<Infraction>, ModerationError>;

    /// Live records matching the filter, ordered by id.
    async fn find(
        &self,
        guild_id: u64,
        filter: InfractionFilter,
    ) -> Result<Vec<Infraction>, ModerationError>;

    /// Soft-delete a case. Returns the record, or `None` if there was no live
    /// case with that id.
    async fn delete(&self, guild_id: u64, id: u64) -> Result<Option<Infraction>, ModerationError>;

    /// Number of live records in the guild.
    async fn count(&self, guild_id: u64) -> Result<u64, ModerationError>;

    /// Live timed records whose `until` falls in `(from, to]`, across guilds.
    async fn expiring_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Infraction>, ModerationError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct ModerationService<S: InfractionStore> {
    store: S,
    policy: EscalationPolicy,
}

impl<S: InfractionStore> ModerationService<S> {
    pub fn new(store: S, policy: EscalationPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &EscalationPolicy {
        &self.policy
    }

    /// File an infraction and run the escalation policy against the
    /// offender's updated history.
    pub async fn record(&self, new: NewInfraction) -> Result<RecordOutcome, ModerationError> {
        let guild_id = new.guild_id;
        let offender_id = new.offender_id;
        let kind = new.kind;

        let infraction = self.store.append(new).await?;
        tracing::info!(
            guild_id,
            case_id = infraction.id,
            offender_id,
            kind = kind.as_tag(),
            "Infraction recorded"
        );

        if self.policy.is_suppressed(kind) {
            return Ok(RecordOutcome {
                infraction,
                escalation: None,
            });
        }

        let history = self
            .store
            .find(guild_id, InfractionFilter::offender(offender_id))
            .await?;
        let total = self.policy.qualifying(&history);

        let escalation = match self.policy.evaluate(kind, total) {
            Some(escalation) => {
                let auto = self
                    .store
                    .append(NewInfraction::new(
                        guild_id,
                        offender_id,
                        Issuer::System,
                        escalation.kind,
                        Some(escalation.reason),
                    ))
                    .await?;
                tracing::warn!(
                    guild_id,
                    case_id = auto.id,
                    offender_id,
                    total,
                    "Escalation threshold reached"
                );
                Some(auto)
            }
            None => None,
        };

        Ok(RecordOutcome {
            infraction,
            escalation,
        })
    }

    pub async fn next_id(&self, guild_id: u64) -> Result<u64, ModerationError> {
        self.store.next_id(guild_id).await
    }

    pub async fn get(&self, guild_id: u64, id: u64) -> Result<Option<Infraction>, ModerationError> {
        self.store.get(guild_id, id).await
    }

    pub async fn find(
        &self,
        guild_id: u64,
        filter: InfractionFilter,
    ) -> Result<Vec<Infraction>, ModerationError> {
        self.store.find(guild_id, filter).await
    }

    pub async fn delete(
        &self,
        guild_id: u64,
        id: u64,
    ) -> Result<Option<Infraction>, ModerationError> {
        let removed = self.store.delete(guild_id, id).await?;
        if removed.is_some() {
            tracing::info!(guild_id, case_id = id, "Infraction removed");
        }
        Ok(removed)
    }

    pub async fn count(&self, guild_id: u64) -> Result<u64, ModerationError> {
        self.store.count(guild_id).await
    }

    pub async fn expiring_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Infraction>, ModerationError> {
        self.store.expiring_between(from, to).await
    }
}

/// Reject actions a moderator is not allowed to take against a member.
pub fn ensure_hierarchy(actor: MemberRank, target: MemberRank) -> Result<(), ModerationError> {
    if actor.user_id == target.user_id {
        return Err(ModerationError::Hierarchy(
            "You can't moderate yourself.".to_string(),
        ));
    }
    if target.is_owner {
        return Err(ModerationError::Hierarchy(
            "You can't moderate the server owner.".to_string(),
        ));
    }
    if !actor.is_owner && target.top_role_position >= actor.top_role_position {
        return Err(ModerationError::Hierarchy(
            "That member's top role is equal to or higher than yours.".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
