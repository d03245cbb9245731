/// One entry as handed over by a feed source, before normalization.
///
/// Which fields are populated depends on the feed dialect: RSS documents fill
/// `description` and `pub_date`, Atom documents fill `summary`, `published`
/// and `updated`. Dates stay textual so the normalizer decides how to read
/// them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEntry {
    pub link: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub content: Vec<String>,
    pub pub_date: Option<String>,
    pub published: Option<String>,
    pub updated: Option<String>,
}

impl RawEntry {
    pub fn new(link: &str, title: &str) -> Self {
        Self {
            link: Some(link.to_string()),
            title: Some(title.to_string()),
            ..Default::default()
        }
    }
}
