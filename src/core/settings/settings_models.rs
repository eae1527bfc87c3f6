// Per-guild configuration document.
//
// Stored as JSON with camelCase keys; the field names below are the stable
// document schema. Deserialisation is the validation boundary: a document
// missing a key or carrying the wrong type is rejected.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const DEFAULT_PREFIX: &str = ".";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogChannels {
    /// Moderation actions, joins/leaves, bans.
    pub bot: Option<u64>,
    /// Message edits and deletes.
    pub message: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraRoles {
    pub admin: Option<u64>,
    /// Members with this role skip detectors and disabled-channel checks.
    pub bypass: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GuildSettings {
    pub prefix: String,
    pub log_channels: LogChannels,
    pub extra_roles: ExtraRoles,
    pub mod_roles: Vec<u64>,
    pub command_disabled_channels: Vec<u64>,
    pub bad_words: Vec<String>,
    pub domains_whitelisted: Vec<String>,
    pub detection_exclusive_channels: Vec<u64>,
    pub mute_role: Option<u64>,
    pub domain_detection: bool,
    pub bad_word_detection: bool,
    pub timeout_instead_of_mute: bool,
    pub tickets_channel: Option<u64>,
}

impl Default for GuildSettings {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            log_channels: LogChannels::default(),
            extra_roles: ExtraRoles::default(),
            mod_roles: Vec::new(),
            command_disabled_channels: Vec::new(),
            bad_words: Vec::new(),
            domains_whitelisted: Vec::new(),
            detection_exclusive_channels: Vec::new(),
            mute_role: None,
            domain_detection: false,
            bad_word_detection: false,
            timeout_instead_of_mute: false,
            tickets_channel: None,
        }
    }
}

impl GuildSettings {
    pub fn log_channel(&self, kind: LogChannelKind) -> Option<u64> {
        match kind {
            LogChannelKind::Bot => self.log_channels.bot,
            LogChannelKind::Message => self.log_channels.message,
        }
    }

    pub fn is_command_disabled_in(&self, channel_id: u64) -> bool {
        self.command_disabled_channels.contains(&channel_id)
    }

    /// Moderators are members with a mod role or the admin role, plus anyone
    /// the platform already trusts with Manage Server.
    pub fn is_moderator(&self, member_roles: &[u64], has_manage_guild: bool) -> bool {
        has_manage_guild
            || self.is_admin(member_roles, false)
            || member_roles.iter().any(|role| self.mod_roles.contains(role))
    }

    pub fn is_admin(&self, member_roles: &[u64], has_administrator: bool) -> bool {
        has_administrator
            || self
                .extra_roles
                .admin
                .is_some_and(|admin| member_roles.contains(&admin))
    }

    pub fn can_bypass(&self, member_roles: &[u64]) -> bool {
        self.extra_roles
            .bypass
            .is_some_and(|bypass| member_roles.contains(&bypass))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogChannelKind {
    Bot,
    Message,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtraRoleKind {
    Admin,
    Bypass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectionFlag {
    Domain,
    BadWord,
    TimeoutInsteadOfMute,
}

/// List-valued settings that commands add to and remove from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListSetting {
    ModRoles,
    CommandDisabledChannels,
    DetectionExclusiveChannels,
    BadWords,
    DomainsWhitelisted,
}

/// One targeted update of a settings document. Each variant replaces exactly
/// one top-level or nested field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsField {
    Prefix(String),
    LogChannel(LogChannelKind, Option<u64>),
    ExtraRole(ExtraRoleKind, Option<u64>),
    IdList(ListSetting, Vec<u64>),
    WordList(ListSetting, Vec<String>),
    MuteRole(Option<u64>),
    Flag(DetectionFlag, bool),
    TicketsChannel(Option<u64>),
}

impl SettingsField {
    /// JSON path of the field inside the stored document.
    pub fn path(&self) -> &'static str {
        match self {
            SettingsField::Prefix(_) => "$.prefix",
            SettingsField::LogChannel(LogChannelKind::Bot, _) => "$.logChannels.bot",
            SettingsField::LogChannel(LogChannelKind::Message, _) => "$.logChannels.message",
            SettingsField::ExtraRole(ExtraRoleKind::Admin, _) => "$.extraRoles.admin",
            SettingsField::ExtraRole(ExtraRoleKind::Bypass, _) => "$.extraRoles.bypass",
            SettingsField::IdList(list, _) | SettingsField::WordList(list, _) => list.path(),
            SettingsField::MuteRole(_) => "$.muteRole",
            SettingsField::Flag(DetectionFlag::Domain, _) => "$.domainDetection",
            SettingsField::Flag(DetectionFlag::BadWord, _) => "$.badWordDetection",
            SettingsField::Flag(DetectionFlag::TimeoutInsteadOfMute, _) => {
                "$.timeoutInsteadOfMute"
            }
            SettingsField::TicketsChannel(_) => "$.ticketsChannel",
        }
    }

    /// New value of the field.
    pub fn value(&self) -> Value {
        match self {
            SettingsField::Prefix(prefix) => json!(prefix),
            SettingsField::LogChannel(_, id)
            | SettingsField::ExtraRole(_, id)
            | SettingsField::MuteRole(id)
            | SettingsField::TicketsChannel(id) => json!(id),
            SettingsField::IdList(_, ids) => json!(ids),
            SettingsField::WordList(_, words) => json!(words),
            SettingsField::Flag(_, enabled) => json!(enabled),
        }
    }

    /// Apply the update to an in-memory document.
    pub fn apply(&self, settings: &mut GuildSettings) {
        match self {
            SettingsField::Prefix(prefix) => settings.prefix = prefix.clone(),
            SettingsField::LogChannel(LogChannelKind::Bot, id) => settings.log_channels.bot = *id,
            SettingsField::LogChannel(LogChannelKind::Message, id) => {
                settings.log_channels.message = *id
            }
            SettingsField::ExtraRole(ExtraRoleKind::Admin, id) => settings.extra_roles.admin = *id,
            SettingsField::ExtraRole(ExtraRoleKind::Bypass, id) => {
                settings.extra_roles.bypass = *id
            }
            SettingsField::IdList(list, ids) => match list {
                ListSetting::ModRoles => settings.mod_roles = ids.clone(),
                ListSetting::CommandDisabledChannels => {
                    settings.command_disabled_channels = ids.clone()
                }
                ListSetting::DetectionExclusiveChannels => {
                    settings.detection_exclusive_channels = ids.clone()
                }
                ListSetting::BadWords | ListSetting::DomainsWhitelisted => {}
            },
            SettingsField::WordList(list, words) => match list {
                ListSetting::BadWords => settings.bad_words = words.clone(),
                ListSetting::DomainsWhitelisted => settings.domains_whitelisted = words.clone(),
                ListSetting::ModRoles
                | ListSetting::CommandDisabledChannels
                | ListSetting::DetectionExclusiveChannels => {}
            },
            SettingsField::MuteRole(id) => settings.mute_role = *id,
            SettingsField::Flag(DetectionFlag::Domain, on) => settings.domain_detection = *on,
            SettingsField::Flag(DetectionFlag::BadWord, on) => settings.bad_word_detection = *on,
            SettingsField::Flag(DetectionFlag::TimeoutInsteadOfMute, on) => {
                settings.timeout_instead_of_mute = *on
            }
            SettingsField::TicketsChannel(id) => settings.tickets_channel = *id,
        }
    }
}

impl ListSetting {
    pub fn path(&self) -> &'static str {
        match self {
            ListSetting::ModRoles => "$.modRoles",
            ListSetting::CommandDisabledChannels => "$.commandDisabledChannels",
            ListSetting::DetectionExclusiveChannels => "$.detectionExclusiveChannels",
            ListSetting::BadWords => "$.badWords",
            ListSetting::DomainsWhitelisted => "$.domainsWhitelisted",
        }
    }

    /// Whether the list holds snowflake ids rather than words.
    pub fn holds_ids(&self) -> bool {
        match self {
            ListSetting::ModRoles
            | ListSetting::CommandDisabledChannels
            | ListSetting::DetectionExclusiveChannels => true,
            ListSetting::BadWords | ListSetting::DomainsWhitelisted => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_document_matches_schema() {
        let settings = GuildSettings::default();
        assert_eq!(settings.prefix, ".");
        assert_eq!(settings.log_channels.bot, None);
        assert_eq!(settings.log_channels.message, None);
        assert!(!settings.domain_detection);
        assert!(!settings.bad_word_detection);
        assert!(!settings.timeout_instead_of_mute);

        let doc = serde_json::to_value(&settings).unwrap();
        assert_eq!(doc["logChannels"], json!({ "bot": null, "message": null }));
        assert_eq!(doc["extraRoles"], json!({ "admin": null, "bypass": null }));
        assert_eq!(doc["domainsWhitelisted"], json!([]));
    }

    #[test]
    fn malformed_documents_are_rejected() {
        let missing_prefix = json!({ "logChannels": { "bot": null, "message": null } });
        assert!(serde_json::from_value::<GuildSettings>(missing_prefix).is_err());

        let mut doc = serde_json::to_value(GuildSettings::default()).unwrap();
        doc["badWordDetection"] = json!("yes");
        assert!(serde_json::from_value::<GuildSettings>(doc).is_err());
    }

    #[test]
    fn field_paths_point_at_document_keys() {
        let doc = serde_json::to_value(GuildSettings::default()).unwrap();
        let fields = [
            SettingsField::Prefix("!".into()),
            SettingsField::LogChannel(LogChannelKind::Bot, Some(1)),
            SettingsField::LogChannel(LogChannelKind::Message, Some(1)),
            SettingsField::ExtraRole(ExtraRoleKind::Admin, Some(1)),
            SettingsField::ExtraRole(ExtraRoleKind::Bypass, Some(1)),
            SettingsField::IdList(ListSetting::ModRoles, vec![1]),
            SettingsField::WordList(ListSetting::BadWords, vec!["x".into()]),
            SettingsField::MuteRole(Some(1)),
            SettingsField::Flag(DetectionFlag::TimeoutInsteadOfMute, true),
            SettingsField::TicketsChannel(Some(1)),
        ];

        for field in fields {
            let mut node = &doc;
            for key in field.path().trim_start_matches("$.").split('.') {
                node = node
                    .get(key)
                    .unwrap_or_else(|| panic!("{} missing", field.path()));
            }
        }
    }

    #[test]
    fn apply_matches_document_update() {
        let mut settings = GuildSettings::default();
        let field = SettingsField::LogChannel(LogChannelKind::Message, Some(55));
        field.apply(&mut settings);
        assert_eq!(settings.log_channel(LogChannelKind::Message), Some(55));

        let mut doc = serde_json::to_value(GuildSettings::default()).unwrap();
        doc["logChannels"]["message"] = field.value();
        assert_eq!(serde_json::from_value::<GuildSettings>(doc).unwrap(), settings);
    }

    #[test]
    fn moderator_and_bypass_roles() {
        let settings = GuildSettings {
            mod_roles: vec![10],
            extra_roles: ExtraRoles {
                admin: Some(20),
                bypass: Some(30),
            },
            ..Default::default()
        };

        assert!(settings.is_moderator(&[10], false));
        assert!(settings.is_moderator(&[20], false));
        assert!(settings.is_moderator(&[], true));
        assert!(!settings.is_moderator(&[30], false));
        assert!(settings.can_bypass(&[30]));
        assert!(!settings.can_bypass(&[10]));
    }
}
