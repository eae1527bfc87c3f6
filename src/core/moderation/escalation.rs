// Auto-escalation: every Nth qualifying infraction earns the offender an
// automatic kick. There is no time window and no decay, just a modulo check
// against the offender's running total.

use super::moderation_models::{Infraction, InfractionKind};

pub const DEFAULT_THRESHOLD: u64 = 5;

/// A secondary action the policy wants filed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Escalation {
    pub kind: InfractionKind,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    threshold: u64,
    /// Kinds that neither count toward nor trigger escalation.
    suppressed: Vec<InfractionKind>,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl EscalationPolicy {
    /// A zero threshold is treated as 1 so the modulo stays defined.
    pub fn new(threshold: u64) -> Self {
        Self {
            threshold: threshold.max(1),
            suppressed: vec![InfractionKind::Unban, InfractionKind::AutoAction],
        }
    }

    #[cfg(test)]
    pub fn with_suppressed(mut self, suppressed: Vec<InfractionKind>) -> Self {
        self.suppressed = suppressed;
        self
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn is_suppressed(&self, kind: InfractionKind) -> bool {
        self.suppressed.contains(&kind)
    }

    /// Count the records in `history` that count toward escalation.
    pub fn qualifying<'a>(&self, history: impl IntoIterator<Item = &'a Infraction>) -> u64 {
        history
            .into_iter()
            .filter(|infraction| !infraction.deleted && !self.is_suppressed(infraction.kind))
            .count() as u64
    }

    /// Decide whether filing `kind` and reaching `total` qualifying records
    /// triggers the automatic action.
    pub fn evaluate(&self, kind: InfractionKind, total: u64) -> Option<Escalation> {
        if self.is_suppressed(kind) || total == 0 || total % self.threshold != 0 {
            return None;
        }

        Some(Escalation {
            kind: InfractionKind::AutoAction,
            reason: format!("violated {} infractions.", total),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::Issuer;
    use chrono::Utc;

    fn record(id: u64, kind: InfractionKind) -> Infraction {
        Infraction {
            id,
            guild_id: 1,
            offender_id: 2,
            moderator: Issuer::User(3),
            kind,
            reason: "x".into(),
            created: Utc::now(),
            until: None,
            deleted: false,
        }
    }

    #[test]
    fn fires_exactly_on_multiples_of_threshold() {
        let policy = EscalationPolicy::default();
        for total in 0..=27u64 {
            let fired = policy.evaluate(InfractionKind::Warn, total).is_some();
            assert_eq!(fired, total > 0 && total % 5 == 0, "total = {}", total);
        }
    }

    #[test]
    fn escalation_reason_names_the_total() {
        let escalation = EscalationPolicy::default()
            .evaluate(InfractionKind::Warn, 10)
            .unwrap();
        assert_eq!(escalation.kind, InfractionKind::AutoAction);
        assert_eq!(escalation.reason, "violated 10 infractions.");
    }

    #[test]
    fn suppressed_kinds_never_fire() {
        let policy = EscalationPolicy::default();
        assert_eq!(policy.evaluate(InfractionKind::Unban, 5), None);
        assert_eq!(policy.evaluate(InfractionKind::AutoAction, 5), None);
    }

    #[test]
    fn qualifying_skips_suppressed_and_deleted() {
        let policy = EscalationPolicy::default();
        let mut deleted = record(4, InfractionKind::Warn);
        deleted.deleted = true;
        let history = vec![
            record(1, InfractionKind::Warn),
            record(2, InfractionKind::Unban),
            record(3, InfractionKind::AutoAction),
            deleted,
            record(5, InfractionKind::AutoWarn),
        ];

        assert_eq!(policy.qualifying(&history), 2);
    }

    #[test]
    fn custom_suppression_and_threshold() {
        let policy = EscalationPolicy::new(3).with_suppressed(vec![InfractionKind::AutoWarn]);
        assert_eq!(policy.threshold(), 3);
        assert!(policy.evaluate(InfractionKind::AutoWarn, 3).is_none());
        assert!(policy.evaluate(InfractionKind::Unban, 3).is_some());
    }

    #[test]
    fn zero_threshold_is_clamped() {
        assert_eq!(EscalationPolicy::new(0).threshold(), 1);
    }
}
