use std::sync::LazyLock;

use scraper::{Html, Selector};

use super::selector;

static PRODUCT_ITEM: LazyLock<Selector> = LazyLock::new(|| selector("div.product-item"));
static PICTURE: LazyLock<Selector> = LazyLock::new(|| selector("div.picture"));
static LINK: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));

/// Link of the first product tile on a search results page.
/// Only the first tile is considered; if it has no usable link there is no hit.
pub fn first_result_link(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let item = doc.select(&PRODUCT_ITEM).next()?;
    let picture = item.select(&PICTURE).next()?;
    let href = picture.select(&LINK).next()?.value().attr("href")?.trim();
    if href.is_empty() {
        None
    } else {
        Some(href.to_string())
    }
}
