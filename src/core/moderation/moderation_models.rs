// Moderation domain models - the infraction ledger.
//
// These are pure domain types with no Discord dependencies.
// The Discord layer converts them into embeds and member actions.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Reason recorded when a moderator does not give one.
pub const DEFAULT_REASON: &str = "No reason provided.";

/// Every kind of disciplinary record the ledger knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfractionKind {
    Warn,
    Mute,
    Kick,
    Ban,
    Unban,
    AutoWarn,
    AutoMute,
    SoftBan,
    Timeout,
    /// Secondary action filed by the escalation policy.
    AutoAction,
}

impl InfractionKind {
    pub const ALL: [InfractionKind; 10] = [
        InfractionKind::Warn,
        InfractionKind::Mute,
        InfractionKind::Kick,
        InfractionKind::Ban,
        InfractionKind::Unban,
        InfractionKind::AutoWarn,
        InfractionKind::AutoMute,
        InfractionKind::SoftBan,
        InfractionKind::Timeout,
        InfractionKind::AutoAction,
    ];

    /// Tag used in the database.
    pub fn as_tag(&self) -> &'static str {
        match self {
            InfractionKind::Warn => "warn",
            InfractionKind::Mute => "mute",
            InfractionKind::Kick => "kick",
            InfractionKind::Ban => "ban",
            InfractionKind::Unban => "unban",
            InfractionKind::AutoWarn => "auto-warn",
            InfractionKind::AutoMute => "auto-mute",
            InfractionKind::SoftBan => "soft-ban",
            InfractionKind::Timeout => "timeout",
            InfractionKind::AutoAction => "auto-action",
        }
    }

    /// Human readable label for embeds and lists.
    pub fn label(&self) -> &'static str {
        match self {
            InfractionKind::Warn => "Warn",
            InfractionKind::Mute => "Mute",
            InfractionKind::Kick => "Kick",
            InfractionKind::Ban => "Ban",
            InfractionKind::Unban => "Unban",
            InfractionKind::AutoWarn => "Automatic Warn",
            InfractionKind::AutoMute => "Automatic Mute",
            InfractionKind::SoftBan => "Soft Ban",
            InfractionKind::Timeout => "Timeout",
            InfractionKind::AutoAction => "Automatic Action",
        }
    }

    /// Embed colour (RGB).
    pub fn colour(&self) -> u32 {
        match self {
            InfractionKind::Warn | InfractionKind::AutoWarn => 0xF1C40F,
            InfractionKind::Mute | InfractionKind::AutoMute | InfractionKind::Timeout => 0xE67E22,
            InfractionKind::Kick | InfractionKind::AutoAction => 0xE74C3C,
            InfractionKind::Ban | InfractionKind::SoftBan => 0x992D22,
            InfractionKind::Unban => 0x2ECC71,
        }
    }

    /// Whether this kind is filed by the bot rather than a moderator.
    pub fn is_automatic(&self) -> bool {
        match self {
            InfractionKind::AutoWarn | InfractionKind::AutoMute | InfractionKind::AutoAction => true,
            InfractionKind::Warn
            | InfractionKind::Mute
            | InfractionKind::Kick
            | InfractionKind::Ban
            | InfractionKind::Unban
            | InfractionKind::SoftBan
            | InfractionKind::Timeout => false,
        }
    }

    /// Kinds that may carry an `until` and get lifted by the expiry sweep.
    pub fn is_timed(&self) -> bool {
        matches!(
            self,
            InfractionKind::Mute | InfractionKind::AutoMute | InfractionKind::Timeout
        )
    }
}

impl fmt::Display for InfractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Error returned when a stored kind tag is not one we know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown infraction kind `{0}`")]
pub struct UnknownKind(pub String);

impl FromStr for InfractionKind {
    type Err = UnknownKind;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        InfractionKind::ALL
            .into_iter()
            .find(|kind| kind.as_tag() == tag)
            .ok_or_else(|| UnknownKind(tag.to_string()))
    }
}

/// Who filed an infraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Issuer {
    /// The bot itself (detectors, escalation).
    System,
    User(u64),
}

impl Issuer {
    pub fn user_id(&self) -> Option<u64> {
        match self {
            Issuer::System => None,
            Issuer::User(id) => Some(*id),
        }
    }

    pub fn mention(&self) -> String {
        match self {
            Issuer::System => "System".to_string(),
            Issuer::User(id) => format!("<@{}>", id),
        }
    }
}

/// One disciplinary record.
#[derive(Debug, Clone, PartialEq)]
pub struct Infraction {
    /// Case number, unique within the guild and never reused.
    pub id: u64,
    pub guild_id: u64,
    pub offender_id: u64,
    pub moderator: Issuer,
    pub kind: InfractionKind,
    pub reason: String,
    pub created: DateTime<Utc>,
    /// Expiry for timed mutes; `None` means permanent.
    pub until: Option<DateTime<Utc>>,
    pub deleted: bool,
}

/// Everything needed to file a new infraction. The store assigns the id and
/// creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInfraction {
    pub guild_id: u64,
    pub offender_id: u64,
    pub moderator: Issuer,
    pub kind: InfractionKind,
    pub reason: String,
    pub until: Option<DateTime<Utc>>,
}

impl NewInfraction {
    pub fn new(
        guild_id: u64,
        offender_id: u64,
        moderator: Issuer,
        kind: InfractionKind,
        reason: Option<String>,
    ) -> Self {
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_REASON.to_string());

        Self {
            guild_id,
            offender_id,
            moderator,
            kind,
            reason,
            until: None,
        }
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }
}

/// Optional filters for listing a guild's infractions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InfractionFilter {
    pub offender: Option<u64>,
    pub moderator: Option<u64>,
}

impl InfractionFilter {
    pub fn offender(user_id: u64) -> Self {
        Self {
            offender: Some(user_id),
            moderator: None,
        }
    }

    pub fn moderator(user_id: u64) -> Self {
        Self {
            offender: None,
            moderator: Some(user_id),
        }
    }

    pub fn matches(&self, infraction: &Infraction) -> bool {
        self.offender.map_or(true, |id| infraction.offender_id == id)
            && self
                .moderator
                .map_or(true, |id| infraction.moderator.user_id() == Some(id))
    }
}

/// What happened when an infraction was recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordOutcome {
    pub infraction: Infraction,
    /// Set when the escalation threshold was crossed; the caller should
    /// remove the offender from the guild.
    pub escalation: Option<Infraction>,
}

/// Position of a member in the guild's role hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberRank {
    pub user_id: u64,
    pub top_role_position: u16,
    pub is_owner: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_round_trip_through_from_str() {
        for kind in InfractionKind::ALL {
            assert_eq!(kind.as_tag().parse::<InfractionKind>(), Ok(kind));
        }
        assert_eq!(
            "yeet".parse::<InfractionKind>(),
            Err(UnknownKind("yeet".to_string()))
        );
    }

    #[test]
    fn automatic_kinds_are_flagged() {
        assert!(InfractionKind::AutoWarn.is_automatic());
        assert!(InfractionKind::AutoAction.is_automatic());
        assert!(!InfractionKind::Warn.is_automatic());
        assert!(!InfractionKind::SoftBan.is_automatic());
    }

    #[test]
    fn blank_reason_falls_back_to_placeholder() {
        let new = NewInfraction::new(1, 2, Issuer::User(3), InfractionKind::Warn, Some("  ".into()));
        assert_eq!(new.reason, DEFAULT_REASON);

        let new = NewInfraction::new(1, 2, Issuer::User(3), InfractionKind::Warn, None);
        assert_eq!(new.reason, DEFAULT_REASON);

        let new = NewInfraction::new(1, 2, Issuer::System, InfractionKind::Kick, Some(" spam ".into()));
        assert_eq!(new.reason, "spam");
    }

    #[test]
    fn filter_matches_offender_and_moderator() {
        let infraction = Infraction {
            id: 1,
            guild_id: 10,
            offender_id: 20,
            moderator: Issuer::User(30),
            kind: InfractionKind::Warn,
            reason: DEFAULT_REASON.into(),
            created: Utc::now(),
            until: None,
            deleted: false,
        };

        assert!(InfractionFilter::default().matches(&infraction));
        assert!(InfractionFilter::offender(20).matches(&infraction));
        assert!(!InfractionFilter::offender(30).matches(&infraction));
        assert!(InfractionFilter::moderator(30).matches(&infraction));

        let automatic = Infraction {
            moderator: Issuer::System,
            ..infraction
        };
        assert!(!InfractionFilter::moderator(30).matches(&automatic));
    }
}
