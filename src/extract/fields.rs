use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::canonical::CanonicalKey;
use crate::record::{JobRecord, UNKNOWN};

static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static OG_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[property="og:title"]"#).unwrap());
static OG_DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[property="og:description"]"#).unwrap());

/// A parsed posting document and the key it was fetched under.
pub struct Page<'a> {
    pub html: &'a Html,
    pub url: &'a str,
}

impl<'a> Page<'a> {
    pub fn new(html: &'a Html, url: &'a str) -> Self {
        Self { html, url }
    }

    /// Text of the first element matching `selector`.
    pub fn text(&self, selector: &Selector) -> Option<String> {
        self.html.select(selector).next().and_then(element_text)
    }

    pub fn title(&self) -> Option<String> {
        self.text(&TITLE)
    }

    pub fn og_title(&self) -> Option<String> {
        self.meta(&OG_TITLE)
    }

    pub fn og_description(&self) -> Option<String> {
        self.meta(&OG_DESCRIPTION)
    }

    fn meta(&self, selector: &Selector) -> Option<String> {
        self.html
            .select(selector)
            .next()
            .and_then(|el| el.value().attr("content"))
            .and_then(clean)
    }

    /// `/`-separated pieces of the URL, scheme and empty authority slot included.
    pub fn segments(&self) -> Vec<&'a str> {
        self.url.trim_end_matches('/').split('/').collect()
    }

    /// The host label in front of `marker` (e.g. `acme.wd5.myworkdayjobs.com`
    /// with `.wd` yields `acme`).
    pub fn host_label(&self, marker: &str) -> Option<&'a str> {
        let host = self.url.split("//").nth(1)?.split('/').next()?;
        let label = host.split(marker).next()?;
        (label != host && !label.is_empty()).then_some(label)
    }
}

/// Partially extracted posting fields. `None` means not determined yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    pub company: Option<String>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
}

/// One extraction strategy. Strategies never fail; a miss is an empty field.
pub type Strategy = fn(&Page) -> Fields;

impl Fields {
    /// Fill fields that are still empty from `other`.
    pub fn fill(&mut self, other: Fields) {
        fill_slot(&mut self.company, other.company);
        fill_slot(&mut self.title, other.title);
        fill_slot(&mut self.location, other.location);
        fill_slot(&mut self.description, other.description);
    }

    /// Overwrite record fields with every non-empty value held here.
    pub fn apply(self, record: &mut JobRecord) {
        apply_slot(&mut record.company, self.company);
        apply_slot(&mut record.title, self.title);
        apply_slot(&mut record.location, self.location);
        apply_slot(&mut record.description, self.description);
    }

    pub fn is_complete(&self) -> bool {
        self.company.is_some()
            && self.title.is_some()
            && self.location.is_some()
            && self.description.is_some()
    }

    pub fn into_record(self, url: CanonicalKey) -> JobRecord {
        let or_unknown = |v: Option<String>| v.unwrap_or_else(|| UNKNOWN.to_string());
        JobRecord {
            company: or_unknown(self.company),
            title: or_unknown(self.title),
            location: or_unknown(self.location),
            description: or_unknown(self.description),
            url,
            found_at: None,
        }
    }
}

fn fill_slot(slot: &mut Option<String>, value: Option<String>) {
    if slot.is_none() {
        *slot = value.and_then(|v| clean(&v));
    }
}

fn apply_slot(slot: &mut String, value: Option<String>) {
    if let Some(v) = value.and_then(|v| clean(&v)) {
        *slot = v;
    }
}

/// Run strategies in order; the first non-empty value wins per field.
pub fn run_chain(page: &Page, chain: &[Strategy]) -> Fields {
    let mut fields = Fields::default();
    for strategy in chain {
        if fields.is_complete() {
            break;
        }
        fields.fill(strategy(page));
    }
    fields
}

/// Shared last-resort strategy.
pub fn open_graph(page: &Page) -> Fields {
    Fields {
        title: page.og_title(),
        description: page.og_description(),
        ..Default::default()
    }
}

pub fn element_text(el: ElementRef) -> Option<String> {
    clean(&el.text().collect::<String>())
}

/// Collapse whitespace runs to one space and trim. Empty text is absent.
pub fn clean(text: &str) -> Option<String> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

/// Turn a URL slug into display text: dashes become spaces, then every
/// alphabetic run is capitalized.
pub fn humanize(slug: &str) -> String {
    let mut out = String::with_capacity(slug.len());
    let mut prev_alpha = false;
    for c in slug.replace('-', " ").chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out.trim().to_string()
}

/// Company named by a trailing `" at Company"` in the page title.
pub fn title_suffix_company(page: &Page) -> Fields {
    let company = page
        .title()
        .and_then(|t| t.rsplit_once(" at ").map(|(_, c)| c.to_string()));
    Fields {
        company,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn humanize_title_cases_slugs() {
        assert_eq!(humanize("acme-robotics"), "Acme Robotics");
        assert_eq!(humanize("ACME"), "Acme");
        assert_eq!(humanize("o'neil-labs"), "O'Neil Labs");
        assert_eq!(humanize("web3-co"), "Web3 Co");
    }

    #[test]
    fn clean_collapses_whitespace() {
        assert_eq!(clean("  Software \n\t Engineer "), Some("Software Engineer".to_string()));
        assert_eq!(clean(" \n "), None);
    }

    #[test]
    fn fill_keeps_first_value() {
        let mut f = Fields {
            title: Some("First".into()),
            ..Default::default()
        };
        f.fill(Fields {
            title: Some("Second".into()),
            company: Some("  ".into()),
            location: Some("Austin, TX".into()),
            ..Default::default()
        });
        assert_eq!(f.title.as_deref(), Some("First"));
        assert_eq!(f.company, None);
        assert_eq!(f.location.as_deref(), Some("Austin, TX"));
    }

    #[test]
    fn apply_ignores_empty_values() {
        let key = crate::canonical::canonicalize("https://jobs.ashbyhq.com/acme/1");
        let mut r = Fields {
            title: Some("Page".into()),
            location: Some("Remote".into()),
            ..Default::default()
        }
        .into_record(key);
        Fields {
            title: Some("Api".into()),
            location: Some("".into()),
            ..Default::default()
        }
        .apply(&mut r);
        assert_eq!(r.title, "Api");
        assert_eq!(r.location, "Remote");
        assert_eq!(r.company, UNKNOWN);
    }

    #[test]
    fn missing_fields_become_unknown() {
        let key = crate::canonical::canonicalize("https://jobs.lever.co/acme/1");
        let r = Fields::default().into_record(key);
        assert_eq!(r.company, UNKNOWN);
        assert_eq!(r.description, UNKNOWN);
    }

    #[test]
    fn host_label_before_marker() {
        let html = Html::parse_document("");
        let page = Page::new(&html, "https://acme-corp.wd5.myworkdayjobs.com/en-US/x");
        assert_eq!(page.host_label(".wd"), Some("acme-corp"));
        assert_eq!(page.host_label(".icims"), None);
    }

    #[test]
    fn title_suffix_uses_last_at() {
        let html = Html::parse_document("<title>Job Application for Engineer at Scale at Acme</title>");
        let page = Page::new(&html, "https://example.com");
        assert_eq!(title_suffix_company(&page).company.as_deref(), Some("Acme"));
    }
}
