use scraper::Html;
use serde::Deserialize;

use super::fields::{clean, humanize, open_graph, Fields, Page, Strategy};

pub const CHAIN: &[Strategy] = &[board_slug, open_graph, title_tag];

// https://jobs.ashbyhq.com/<slug>/<job id>
fn board_slug(page: &Page) -> Fields {
    Fields {
        company: board_parts(page.url).map(|(slug, _)| humanize(slug)),
        ..Default::default()
    }
}

fn title_tag(page: &Page) -> Fields {
    Fields {
        title: page.title(),
        ..Default::default()
    }
}

fn board_parts(url: &str) -> Option<(&str, Option<&str>)> {
    let parts: Vec<&str> = url.trim_end_matches('/').split('/').collect();
    let slug = parts.get(3).filter(|s| !s.is_empty())?;
    Some((*slug, parts.get(4).copied().filter(|s| !s.is_empty())))
}

/// Job-board endpoint and posting id for an Ashby posting URL.
pub fn lookup_target(api_base: &str, url: &str) -> Option<(String, String)> {
    let (slug, job_id) = board_parts(url)?;
    let job_id = job_id?;
    let endpoint = format!(
        "{}/posting-api/job-board/{}",
        api_base.trim_end_matches('/'),
        slug
    );
    Some((endpoint, job_id.to_string()))
}

#[derive(Debug, Deserialize)]
struct JobBoard {
    #[serde(default)]
    jobs: Vec<BoardJob>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoardJob {
    id: String,
    title: Option<String>,
    location: Option<String>,
    description_plain: Option<String>,
    description_html: Option<String>,
}

/// Fields for `job_id` from a job-board response, description truncated to
/// `limit` characters. `None` when the body does not parse or lacks the job.
pub fn parse_board(body: &str, job_id: &str, limit: usize) -> Option<Fields> {
    let board: JobBoard = serde_json::from_str(body).ok()?;
    let job = board.jobs.into_iter().find(|j| j.id == job_id)?;
    let description = job
        .description_plain
        .filter(|d| !d.trim().is_empty())
        .or(job.description_html)
        .map(|d| if d.contains('<') { html_text(&d) } else { d })
        .and_then(|d| clean(&d))
        .map(|d| d.chars().take(limit).collect());
    Some(Fields {
        company: None,
        title: job.title,
        location: job.location,
        description,
    })
}

fn html_text(fragment: &str) -> String {
    Html::parse_fragment(fragment)
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ")
}
