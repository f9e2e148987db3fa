use super::fields::{humanize, Fields, Page, Strategy};

pub const CHAIN: &[Strategy] = &[from_url, title_as_description];

// https://careers-<tenant>.icims.com/jobs/<id>/<title-slug>/job
fn from_url(page: &Page) -> Fields {
    let company = page
        .host_label(".icims")
        .map(|label| humanize(&label.replace("careers-", "")));
    let title = page.segments().get(5).map(|slug| {
        let decoded = urlencoding::decode(slug)
            .map(|d| d.into_owned())
            .unwrap_or_else(|_| slug.to_string());
        humanize(&decoded)
    });
    Fields {
        company,
        title,
        ..Default::default()
    }
}

fn title_as_description(page: &Page) -> Fields {
    Fields {
        description: page.title(),
        ..Default::default()
    }
}
