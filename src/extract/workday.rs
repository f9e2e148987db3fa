use super::fields::{humanize, open_graph, Fields, Page, Strategy};

/// Workday pages render client-side, so the URL is the main source.
pub const CHAIN: &[Strategy] = &[from_url, open_graph];

// https://<tenant>.wd5.myworkdayjobs.com/<site>/job/<Location>/<Title_R123>
fn from_url(page: &Page) -> Fields {
    let company = page.host_label(".wd").map(humanize);
    let parts = page.segments();
    let (location, title) = match parts.iter().position(|p| *p == "job") {
        Some(i) if i + 2 < parts.len() => {
            (Some(location_slug(parts[i + 1])), Some(title_slug(parts[i + 2])))
        }
        _ => (None, None),
    };
    Fields {
        company,
        title,
        location,
        ..Default::default()
    }
}

fn location_slug(raw: &str) -> String {
    raw.replace("---", ", ").replace('-', " ").trim().to_string()
}

fn title_slug(raw: &str) -> String {
    let base = match raw.rsplit_once('_') {
        Some((head, _)) => head,
        None => raw,
    };
    base.split("--")
        .map(|part| part.replace('-', " ").trim().to_string())
        .collect::<Vec<_>>()
        .join(" - ")
}
