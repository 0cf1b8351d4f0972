use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};

use super::{joined_text, non_empty, selector, LabelRules, PageExtraction, Region};
use crate::record::RawRecord;

static PICTURE: LazyLock<Selector> = LazyLock::new(|| selector("div.picture"));
static MAIN_IMAGE: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"img[id^="main-product-img"]"#));
static DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| selector("div.full-description"));
static PRODUCT_NAME: LazyLock<Selector> = LazyLock::new(|| selector("div.product-name"));
static NAME_HEADING: LazyLock<Selector> = LazyLock::new(|| selector(r#"h1[itemprop="name"]"#));
static CATEGORY_BOX: LazyLock<Selector> = LazyLock::new(|| selector("div.allCategoriesBox"));
static CATEGORY_LINK: LazyLock<Selector> =
    LazyLock::new(|| selector("a.CategoriesBox_SingleCategory"));
static BIO_TABLE: LazyLock<Selector> = LazyLock::new(|| selector("table.bioInfo"));
static ROW: LazyLock<Selector> = LazyLock::new(|| selector("tr"));
static LABEL: LazyLock<Selector> = LazyLock::new(|| selector("th.bioInfoLabel"));
static DATA: LazyLock<Selector> = LazyLock::new(|| selector("th.bioInfoData"));

/// Turns a product page into a [`RawRecord`]. Never fails: whatever is
/// missing from the page stays `None`.
#[derive(Debug, Clone)]
pub struct ProductParser {
    rules: LabelRules,
    excluded_categories: HashSet<String>,
}

#[cfg(test)]
impl Default for ProductParser {
    fn default() -> Self {
        ProductParser::new(
            LabelRules::default(),
            ["Aktualne promocje", "Szybka wysyłka", "Promocje!"]
                .into_iter()
                .map(String::from),
        )
    }
}

impl ProductParser {
    pub fn new(rules: LabelRules, excluded_categories: impl IntoIterator<Item = String>) -> Self {
        ProductParser {
            rules,
            excluded_categories: excluded_categories.into_iter().collect(),
        }
    }

    pub fn parse(&self, link: &str, html: &str) -> PageExtraction {
        let doc = Html::parse_document(html);
        let mut record = RawRecord::new(link);
        let mut missing = Vec::new();

        match doc.select(&PICTURE).next() {
            Some(picture) => {
                record.image = picture
                    .select(&MAIN_IMAGE)
                    .next()
                    .and_then(|img| img.value().attr("src"))
                    .map(String::from);
            }
            None => missing.push(Region::Picture),
        }

        match doc.select(&DESCRIPTION).next() {
            Some(desc) => record.description = non_empty(joined_text(desc, " ")),
            None => missing.push(Region::Description),
        }

        match doc
            .select(&PRODUCT_NAME)
            .next()
            .and_then(|name| name.select(&NAME_HEADING).next())
        {
            Some(h1) => record.title = non_empty(joined_text(h1, "")),
            None => missing.push(Region::Title),
        }

        match doc.select(&CATEGORY_BOX).next() {
            Some(categories) => {
                let kept: Vec<String> = categories
                    .select(&CATEGORY_LINK)
                    .map(|a| joined_text(a, ""))
                    .filter(|c| !self.excluded_categories.contains(c))
                    .collect();
                record.category = non_empty(kept.join(", "));
            }
            None => missing.push(Region::Categories),
        }

        match doc.select(&BIO_TABLE).next() {
            Some(table) => {
                for row in table.select(&ROW) {
                    let (Some(label), Some(data)) =
                        (row.select(&LABEL).next(), row.select(&DATA).next())
                    else {
                        continue;
                    };
                    let label = joined_text(label, "");
                    if let Some(field) = self.rules.field_for(&label) {
                        *record.slot_mut(field) = non_empty(joined_text(data, " "));
                    }
                }
            }
            None => missing.push(Region::BioTable),
        }

        PageExtraction { record, missing }
    }
}
