use super::fields::{humanize, open_graph, title_suffix_company, Fields, Page, Strategy};

pub const SMARTRECRUITERS: &[Strategy] = &[open_graph, title_tag, first_path_segment];

pub const UNKNOWN: &[Strategy] = &[open_graph, title_tag, title_suffix_company];

fn title_tag(page: &Page) -> Fields {
    Fields {
        title: page.title(),
        ..Default::default()
    }
}

// https://jobs.smartrecruiters.com/<Company>/<id>-<slug>
fn first_path_segment(page: &Page) -> Fields {
    Fields {
        company: page.segments().get(3).filter(|s| !s.is_empty()).map(|s| humanize(s)),
        ..Default::default()
    }
}
