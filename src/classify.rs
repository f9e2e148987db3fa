use std::collections::HashSet;
use std::fmt;

use crate::config::ClassifierSettings;
use crate::record::{is_known, JobRecord};

const LOCATION_DELIMITERS: &[char] = &[',', '/', '-', '(', ')'];
const ALL_ROLES: &str = "all";

/// Outcome of classifying one record. Bucketing uses the variant only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    /// Relevant, but the title could not be extracted.
    AmbiguousAccept,
    Reject(RejectReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    OutsideUs,
    NothingToEvaluate,
    Excluded { field: Field, keyword: String },
    NoKeywordMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Description,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::OutsideUs => f.write_str("location outside the US"),
            RejectReason::NothingToEvaluate => f.write_str("no title or description"),
            RejectReason::Excluded { field, keyword } => {
                let field = match field {
                    Field::Title => "title",
                    Field::Description => "description",
                };
                write!(f, "{} contains excluded '{}'", field, keyword)
            }
            RejectReason::NoKeywordMatch => f.write_str("no role keyword matched"),
        }
    }
}

/// Keywords for the selected role profiles, plus any names that did not
/// match a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSelection {
    pub keywords: Vec<String>,
    pub unknown: Vec<String>,
}

/// Relevance and geography rules over immutable keyword tables.
#[derive(Debug, Clone)]
pub struct Classifier {
    profiles: Vec<(String, Vec<String>)>,
    title_exclusions: Vec<String>,
    description_exclusions: Vec<String>,
    gazetteer: HashSet<String>,
}

impl Classifier {
    pub fn new(settings: &ClassifierSettings) -> Self {
        Self {
            profiles: settings
                .profiles
                .iter()
                .map(|(name, words)| (name.to_lowercase(), lowercase(words)))
                .collect(),
            title_exclusions: lowercase(&settings.exclusions.title),
            description_exclusions: lowercase(&settings.exclusions.description),
            gazetteer: settings
                .gazetteer
                .iter()
                .map(|g| g.trim().to_lowercase())
                .collect(),
        }
    }

    /// `all`, or a comma-separated list of profile names.
    pub fn select_roles(&self, selector: &str) -> RoleSelection {
        let mut selection = RoleSelection::default();
        let selector = selector.trim();
        if selector.eq_ignore_ascii_case(ALL_ROLES) {
            for (_, words) in &self.profiles {
                extend_unique(&mut selection.keywords, words);
            }
            return selection;
        }
        for name in selector.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let wanted = name.to_lowercase();
            match self.profiles.iter().find(|(p, _)| *p == wanted) {
                Some((_, words)) => extend_unique(&mut selection.keywords, words),
                None => selection.unknown.push(name.to_string()),
            }
        }
        selection
    }

    /// Unknown or empty locations pass; otherwise some delimited token must
    /// be a gazetteer entry.
    pub fn in_usa(&self, location: &str) -> bool {
        if !is_known(location.trim()) {
            return true;
        }
        location
            .split(LOCATION_DELIMITERS)
            .map(|token| token.trim().to_lowercase())
            .any(|token| self.gazetteer.contains(&token))
    }

    pub fn classify(&self, record: &JobRecord, keywords: &[String]) -> Verdict {
        if !self.in_usa(&record.location) {
            return Verdict::Reject(RejectReason::OutsideUs);
        }
        if !is_known(&record.title) && !is_known(&record.description) {
            return Verdict::Reject(RejectReason::NothingToEvaluate);
        }

        let title = match_text(&record.title);
        let description = match_text(&record.description);

        if let Some(kw) = first_contained(&title, &self.title_exclusions) {
            return Verdict::Reject(RejectReason::Excluded {
                field: Field::Title,
                keyword: kw.to_string(),
            });
        }
        if let Some(kw) = first_contained(&description, &self.description_exclusions) {
            return Verdict::Reject(RejectReason::Excluded {
                field: Field::Description,
                keyword: kw.to_string(),
            });
        }

        let relevant = keywords.iter().any(|kw| {
            let kw = kw.to_lowercase();
            title.contains(&kw) || description.contains(&kw)
        });
        if !relevant {
            return Verdict::Reject(RejectReason::NoKeywordMatch);
        }

        if record.has_title() {
            Verdict::Accept
        } else {
            Verdict::AmbiguousAccept
        }
    }
}

fn lowercase(words: &[String]) -> Vec<String> {
    words.iter().map(|w| w.to_lowercase()).collect()
}

fn extend_unique(into: &mut Vec<String>, words: &[String]) {
    for w in words {
        if !into.contains(w) {
            into.push(w.clone());
        }
    }
}

// Unknown fields match as empty text.
fn match_text(value: &str) -> String {
    if is_known(value) {
        value.to_lowercase()
    } else {
        String::new()
    }
}

fn first_contained<'a>(text: &str, words: &'a [String]) -> Option<&'a str> {
    words
        .iter()
        .find(|w| text.contains(w.as_str()))
        .map(|w| w.as_str())
}
