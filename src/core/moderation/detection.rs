// Automated content detectors - bad words and non-whitelisted link domains.
//
// Pure functions over a message and the guild's settings. The Discord layer
// turns a hit into a deleted message plus an automatic warn.

use crate::core::settings::GuildSettings;
use std::fmt;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    BadWord(String),
    Domain(String),
}

impl Detection {
    pub fn reason(&self) -> String {
        match self {
            Detection::BadWord(word) => format!("Used a blocked word (`{}`)", word),
            Detection::Domain(domain) => format!("Posted a link to a non-whitelisted domain (`{}`)", domain),
        }
    }
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// Run the enabled detectors against a message.
pub fn detect(settings: &GuildSettings, channel_id: u64, content: &str) -> Option<Detection> {
    if !settings.bad_word_detection && !settings.domain_detection {
        return None;
    }
    if !settings.detection_exclusive_channels.is_empty()
        && !settings.detection_exclusive_channels.contains(&channel_id)
    {
        return None;
    }

    if settings.bad_word_detection {
        if let Some(word) = find_bad_word(&settings.bad_words, content) {
            return Some(Detection::BadWord(word));
        }
    }

    if settings.domain_detection {
        if let Some(domain) = link_domains(content)
            .into_iter()
            .find(|domain| !is_whitelisted(&settings.domains_whitelisted, domain))
        {
            return Some(Detection::Domain(domain));
        }
    }

    None
}

/// Case-insensitive whole-word match. Entries with spaces match as phrases.
fn find_bad_word(bad_words: &[String], content: &str) -> Option<String> {
    let lowered = content.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .collect();
    let joined = format!(" {} ", words.join(" "));

    bad_words
        .iter()
        .map(|bad| bad.trim().to_lowercase())
        .filter(|bad| !bad.is_empty())
        .find(|bad| {
            if bad.contains(' ') {
                joined.contains(&format!(" {} ", bad))
            } else {
                words.contains(&bad.as_str())
            }
        })
}

/// Hosts of every http(s) link in the message, lower-cased with `www.` removed.
pub fn link_domains(content: &str) -> Vec<String> {
    link_candidates(content)
        .filter_map(|candidate| Url::parse(candidate).ok())
        .filter_map(|url| {
            let host = url.host_str()?.trim_end_matches('.').to_lowercase();
            let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
            (!host.is_empty()).then_some(host)
        })
        .collect()
}

/// Every `http://` or `https://` run up to the next whitespace or angle bracket.
fn link_candidates(content: &str) -> impl Iterator<Item = &str> {
    let lowered = content.to_ascii_lowercase();
    let mut starts = Vec::new();
    let mut from = 0;
    while let Some(offset) = lowered[from..].find("http") {
        let start = from + offset;
        let tail = &lowered[start..];
        if tail.starts_with("https://") || tail.starts_with("http://") {
            starts.push(start);
        }
        from = start + "http".len();
    }

    starts.into_iter().map(move |start| {
        let tail = &content[start..];
        let end = tail
            .find(|c: char| c.is_whitespace() || matches!(c, '<' | '>' | '"'))
            .unwrap_or(tail.len());
        &tail[..end]
    })
}

fn is_whitelisted(whitelist: &[String], domain: &str) -> bool {
    whitelist.iter().any(|allowed| {
        let allowed = allowed.trim().trim_start_matches("www.").to_lowercase();
        domain == allowed || domain.ends_with(&format!(".{}", allowed))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> GuildSettings {
        GuildSettings {
            bad_words: vec!["heck".into(), "dang it".into()],
            domains_whitelisted: vec!["rust-lang.org".into(), "www.github.com".into()],
            bad_word_detection: true,
            domain_detection: true,
            ..Default::default()
        }
    }

    #[test]
    fn nothing_runs_when_disabled() {
        let settings = GuildSettings {
            bad_words: vec!["heck".into()],
            ..Default::default()
        };
        assert_eq!(detect(&settings, 1, "heck"), None);
    }

    #[test]
    fn bad_words_match_whole_words_only() {
        let settings = settings();
        assert_eq!(
            detect(&settings, 1, "What the HECK!"),
            Some(Detection::BadWord("heck".into()))
        );
        assert_eq!(detect(&settings, 1, "checking in"), None);
        assert_eq!(
            detect(&settings, 1, "oh dang  it, again"),
            Some(Detection::BadWord("dang it".into()))
        );
    }

    #[test]
    fn domains_outside_whitelist_are_flagged() {
        let settings = settings();
        assert_eq!(detect(&settings, 1, "see https://doc.rust-lang.org/book"), None);
        assert_eq!(detect(&settings, 1, "<https://github.com/foo>"), None);
        assert_eq!(
            detect(&settings, 1, "free nitro http://www.Sketchy.example/claim"),
            Some(Detection::Domain("sketchy.example".into()))
        );
        assert_eq!(detect(&settings, 1, "notrust-lang.org is not a link"), None);
    }

    #[test]
    fn whitelist_does_not_match_lookalike_suffixes() {
        let settings = settings();
        assert_eq!(
            detect(&settings, 1, "https://evilrust-lang.org"),
            Some(Detection::Domain("evilrust-lang.org".into()))
        );
    }

    #[test]
    fn exclusive_channels_limit_detection() {
        let settings = GuildSettings {
            detection_exclusive_channels: vec![5],
            ..settings()
        };
        assert_eq!(detect(&settings, 4, "heck"), None);
        assert!(detect(&settings, 5, "heck").is_some());
    }

    #[test]
    fn userinfo_does_not_hide_the_real_host() {
        let settings = GuildSettings {
            domains_whitelisted: vec!["github.com".into()],
            domain_detection: true,
            ..Default::default()
        };
        assert_eq!(
            detect(&settings, 1, "free nitro https://github.com@evil.example/claim"),
            Some(Detection::Domain("evil.example".into()))
        );
        assert_eq!(
            link_domains("https://user:pw@www.github.com:8443/x"),
            vec!["github.com".to_string()]
        );
    }

    #[test]
    fn link_domains_extracts_every_host() {
        assert_eq!(
            link_domains("a https://one.com/x and http://www.two.org. httpnope"),
            vec!["one.com".to_string(), "two.org".to_string()]
        );
    }
}
