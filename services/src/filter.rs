use lb_scrobbler_core::TrackSnapshot;
use log::{
    debug,
    warn,
};

use crate::config::FilterSettings;

const KNOWN_FIELDS: &[&str] = &[
    "title", "artist", "album", "state", "track", "date", "composer", "genre", "duration", "bitrate", "encoded",
];

/// Suppresses snapshots whose fields contain a configured substring
#[derive(Debug, Clone, Default)]
pub struct IgnoreFilter {
    rules: Vec<(String, Vec<String>)>,
    case_sensitive: bool,
}

impl IgnoreFilter {
    pub fn new(settings: &FilterSettings) -> Self {
        let case_sensitive = settings.case_sensitive;
        let mut rules: Vec<_> = settings
            .ignore_patterns
            .iter()
            .filter(|(field, _)| {
                let known = KNOWN_FIELDS.contains(&field.as_str());
                if !known {
                    warn!("Ignoring filter on unknown field '{field}'");
                }
                known
            })
            .map(|(field, patterns)| {
                let patterns = patterns
                    .iter()
                    .filter(|p| !p.is_empty())
                    .map(|p| if case_sensitive { p.clone() } else { p.to_lowercase() })
                    .collect::<Vec<_>>();
                (field.clone(), patterns)
            })
            .filter(|(_, patterns)| !patterns.is_empty())
            .collect();
        rules.sort_by(|(a, _), (b, _)| a.cmp(b));

        Self { rules, case_sensitive }
    }

    pub fn is_empty(&self) -> bool { self.rules.is_empty() }

    /// Name of the first field with a matching pattern
    pub fn matched_field(&self, snapshot: &TrackSnapshot) -> Option<&str> {
        self.rules
            .iter()
            .find(|(field, patterns)| {
                snapshot.field(field).is_some_and(|value| {
                    if self.case_sensitive {
                        patterns.iter().any(|p| value.contains(p.as_str()))
                    } else {
                        let value = value.to_lowercase();
                        patterns.iter().any(|p| value.contains(p.as_str()))
                    }
                })
            })
            .map(|(field, _)| field.as_str())
    }

    pub fn should_ignore(&self, snapshot: &TrackSnapshot) -> bool {
        match self.matched_field(snapshot) {
            Some(field) => {
                debug!("Ignoring content: {} (matched {field} pattern)", snapshot.title);
                true
            },
            None => false,
        }
    }
}


#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use super::*;

    fn filter(patterns: &[(&str, &[&str])], case_sensitive: bool) -> IgnoreFilter {
        IgnoreFilter::new(&FilterSettings {
            ignore_patterns: patterns
                .iter()
                .map(|(f, p)| (f.to_string(), p.iter().map(|s| s.to_string()).collect()))
                .collect::<HashMap<_, _>>(),
            case_sensitive,
        })
    }

    fn with_album(album: &str) -> TrackSnapshot {
        TrackSnapshot {
            title: "Track".to_owned(),
            artist: "Artist".to_owned(),
            album: Some(album.to_owned()),
            ..Default::default()
        }
    }

    #[test]
    fn test_substring_semantics() {
        let filter = filter(&[("album", &["radio"])], false);

        assert!(filter.should_ignore(&with_album("My Radio Show")));
        assert!(filter.should_ignore(&with_album("My Radioactive Album")));
        assert!(!filter.should_ignore(&with_album("Broadcast")));
    }

    #[test]
    fn test_case_sensitive() {
        let filter = filter(&[("album", &["Radio"])], true);

        assert!(filter.should_ignore(&with_album("My Radio Show")));
        assert!(!filter.should_ignore(&with_album("my radio show")));
    }

    #[test]
    fn test_pattern_normalized_once() {
        let filter = filter(&[("album", &["RADIO"])], false);
        assert!(filter.should_ignore(&with_album("my radio show")));
    }

    #[test]
    fn test_absent_field_never_matches() {
        let filter = filter(&[("genre", &["talk"]), ("album", &[])], false);
        let snapshot = with_album("Talk Radio");

        assert!(!filter.should_ignore(&snapshot));
        assert!(filter.matched_field(&snapshot).is_none());
    }

    #[test]
    fn test_empty_and_unknown_patterns_dropped() {
        let filter = filter(&[("album", &[""]), ("station", &["fm"])], false);
        assert!(filter.is_empty());
        assert!(!filter.should_ignore(&with_album("anything")));
    }

    #[test]
    fn test_any_field_matches() {
        let filter = filter(&[("album", &["radio"]), ("artist", &["advert", "jingle"])], false);
        let mut snapshot = with_album("Regular Album");
        snapshot.artist = "Station Jingle".to_owned();

        assert_eq!(filter.matched_field(&snapshot), Some("artist"));
    }
}
