use std::sync::LazyLock;

use scraper::Selector;

use super::fields::{humanize, open_graph, Fields, Page, Strategy};

static HEADLINE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".posting-headline h2").unwrap());
static LOCATION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.posting-categories .location").unwrap());
static DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"div[data-qa="job-description"]"#).unwrap());

pub const CHAIN: &[Strategy] = &[headline, title_tag, categories, board_slug, open_graph];

fn headline(page: &Page) -> Fields {
    Fields {
        title: page.text(&HEADLINE),
        ..Default::default()
    }
}

/// Lever page titles read `Company - Title`.
fn title_tag(page: &Page) -> Fields {
    let Some(text) = page.title() else {
        return Fields::default();
    };
    let parts: Vec<&str> = text.split(" - ").collect();
    if parts.len() < 2 {
        return Fields::default();
    }
    Fields {
        company: Some(parts[0].to_string()),
        title: Some(parts[1].to_string()),
        ..Default::default()
    }
}

fn categories(page: &Page) -> Fields {
    Fields {
        location: page.text(&LOCATION),
        description: page.text(&DESCRIPTION),
        ..Default::default()
    }
}

// https://jobs.lever.co/<slug>/<id>
fn board_slug(page: &Page) -> Fields {
    Fields {
        company: page.segments().get(3).filter(|s| !s.is_empty()).map(|s| humanize(s)),
        ..Default::default()
    }
}
