use std::fmt;

/// Hosting platforms a posting can live on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Lever,
    Greenhouse,
    Workday,
    Ashby,
    Icims,
    SmartRecruiters,
    Oracle,
    Unknown,
}

/// How a platform's posting URLs are reduced to a canonical key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalRule {
    /// Keep five segments, truncate the posting id to this many characters.
    TruncateId(usize),
    /// Keep five segments, reduce the sixth to its digits.
    NumericId,
    /// Drop the query string.
    StripQuery,
    /// Leave the URL as published.
    Verbatim,
}

struct PlatformEntry {
    platform: Platform,
    domain: &'static str,
    rule: CanonicalRule,
}

const LEVER_ID_LEN: usize = 36;

const PLATFORMS: &[PlatformEntry] = &[
    PlatformEntry { platform: Platform::Lever, domain: "lever.co", rule: CanonicalRule::TruncateId(LEVER_ID_LEN) },
    PlatformEntry { platform: Platform::Greenhouse, domain: "greenhouse.io", rule: CanonicalRule::NumericId },
    PlatformEntry { platform: Platform::Workday, domain: "myworkdayjobs.com", rule: CanonicalRule::StripQuery },
    PlatformEntry { platform: Platform::Ashby, domain: "ashbyhq.com", rule: CanonicalRule::StripQuery },
    PlatformEntry { platform: Platform::Icims, domain: "icims.com", rule: CanonicalRule::StripQuery },
    PlatformEntry { platform: Platform::SmartRecruiters, domain: "smartrecruiters.com", rule: CanonicalRule::StripQuery },
    PlatformEntry { platform: Platform::Oracle, domain: "careers.oracle.com", rule: CanonicalRule::StripQuery },
];

impl Platform {
    /// Infer the platform from a URL's host. Falls back to a substring test
    /// when the URL does not parse.
    pub fn detect(url: &str) -> Platform {
        match url::Url::parse(url) {
            Ok(parsed) => {
                let host = parsed.host_str().unwrap_or("").to_ascii_lowercase();
                PLATFORMS
                    .iter()
                    .find(|s| host == s.domain || host.ends_with(&format!(".{}", s.domain)))
                    .map(|s| s.platform)
                    .unwrap_or(Platform::Unknown)
            }
            Err(_) => PLATFORMS
                .iter()
                .find(|s| url.contains(s.domain))
                .map(|s| s.platform)
                .unwrap_or(Platform::Unknown),
        }
    }

    pub fn rule(self) -> CanonicalRule {
        self.entry().map(|s| s.rule).unwrap_or(CanonicalRule::Verbatim)
    }

    pub fn is_known(self) -> bool {
        self != Platform::Unknown
    }

    fn entry(self) -> Option<&'static PlatformEntry> {
        PLATFORMS.iter().find(|s| s.platform == self)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Lever => "lever",
            Platform::Greenhouse => "greenhouse",
            Platform::Workday => "workday",
            Platform::Ashby => "ashby",
            Platform::Icims => "icims",
            Platform::SmartRecruiters => "smartrecruiters",
            Platform::Oracle => "oracle",
            Platform::Unknown => "unknown",
        };
        f.write_str(name)
    }
}
