use super::fields::{open_graph, Fields, Page, Strategy};

pub const CHAIN: &[Strategy] = &[constant_company, open_graph];

fn constant_company(_: &Page) -> Fields {
    Fields {
        company: Some("Oracle".to_string()),
        ..Default::default()
    }
}
