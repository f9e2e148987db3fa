use std::sync::LazyLock;

use scraper::Selector;

use super::fields::{element_text, humanize, open_graph, title_suffix_company, Fields, Page, Strategy};

static JOB_TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.job__title").unwrap());
static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());
static JOB_LOCATION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.job__location").unwrap());
static JOB_DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"div[class*="job__description"]"#).unwrap());

static COMPANY_NAME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.company-name").unwrap());
static APP_TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1.app-title").unwrap());
static LOCATION: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.location").unwrap());
static CONTENT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div#content").unwrap());

const BOARD_HOSTS: [&str; 2] = ["job-boards.greenhouse.io/", "boards.greenhouse.io/"];

pub const CHAIN: &[Strategy] = &[
    current_template,
    legacy_template,
    title_suffix_company,
    board_slug,
    open_graph,
];

/// `job-boards.greenhouse.io` layout.
fn current_template(page: &Page) -> Fields {
    let Some(block) = page.html.select(&JOB_TITLE).next() else {
        return Fields::default();
    };
    let title = block
        .select(&H1)
        .next()
        .and_then(element_text)
        .or_else(|| element_text(block));
    Fields {
        title,
        location: page.text(&JOB_LOCATION),
        description: page.text(&JOB_DESCRIPTION),
        ..Default::default()
    }
}

/// `boards.greenhouse.io` layout. Skipped on current-layout pages, whose
/// generic `div.location`/`div#content` blocks are not posting fields.
fn legacy_template(page: &Page) -> Fields {
    if page.html.select(&JOB_TITLE).next().is_some() {
        return Fields::default();
    }
    let company = page.text(&COMPANY_NAME).map(|c| match c.strip_prefix("at ") {
        Some(rest) => rest.trim().to_string(),
        None => c,
    });
    Fields {
        company,
        title: page.text(&APP_TITLE),
        location: page.text(&LOCATION),
        description: page.text(&CONTENT),
    }
}

fn board_slug(page: &Page) -> Fields {
    let company = BOARD_HOSTS.iter().find_map(|host| {
        let (_, rest) = page.url.split_once(host)?;
        rest.split('/').next().filter(|s| !s.is_empty()).map(humanize)
    });
    Fields {
        company,
        ..Default::default()
    }
}
