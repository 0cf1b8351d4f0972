use serde::{Deserialize, Serialize};

/// One product page, as extracted. Field order is the batch CSV column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    #[serde(rename = "Link")]
    pub link: String,
    #[serde(rename = "Rodzaj (nośnik)")]
    pub media_kind: Option<String>,
    #[serde(rename = "Dział")]
    pub department: Option<String>,
    #[serde(rename = "Autor")]
    pub author: Option<String>,
    #[serde(rename = "Tytuł")]
    pub title: Option<String>,
    #[serde(rename = "Tytuł originału")]
    pub original_title: Option<String>,
    #[serde(rename = "Język")]
    pub language: Option<String>,
    #[serde(rename = "Wydawca")]
    pub publisher: Option<String>,
    #[serde(rename = "Rok wydania")]
    pub year: Option<String>,
    #[serde(rename = "Rodzaj oprawy")]
    pub binding: Option<String>,
    #[serde(rename = "Wymiary")]
    pub dimensions: Option<String>,
    #[serde(rename = "Liczba stron")]
    pub page_count: Option<String>,
    #[serde(rename = "Ciężar")]
    pub weight: Option<String>,
    #[serde(rename = "Wydano")]
    pub publication_note: Option<String>,
    #[serde(rename = "ISBN")]
    pub isbn: Option<String>,
    #[serde(rename = "EAN/UPC")]
    pub ean_upc: Option<String>,
    #[serde(rename = "Image")]
    pub image: Option<String>,
    #[serde(rename = "Description")]
    pub description: Option<String>,
    #[serde(rename = "Kategoria")]
    pub category: Option<String>,
}

/// Named slots of a [`RawRecord`] that a bibliographic label can fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    MediaKind,
    Department,
    Author,
    Title,
    OriginalTitle,
    Language,
    Publisher,
    Year,
    Binding,
    Dimensions,
    PageCount,
    Weight,
    PublicationNote,
    Isbn,
    EanUpc,
    Image,
    Description,
    Category,
}

/// Batch file header, `Link` first.
pub const HEADERS: [&str; 19] = [
    "Link",
    "Rodzaj (nośnik)",
    "Dział",
    "Autor",
    "Tytuł",
    "Tytuł originału",
    "Język",
    "Wydawca",
    "Rok wydania",
    "Rodzaj oprawy",
    "Wymiary",
    "Liczba stron",
    "Ciężar",
    "Wydano",
    "ISBN",
    "EAN/UPC",
    "Image",
    "Description",
    "Kategoria",
];

impl RawRecord {
    pub fn new(link: impl Into<String>) -> Self {
        RawRecord {
            link: link.into(),
            ..Default::default()
        }
    }

    pub fn slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::MediaKind => &mut self.media_kind,
            Field::Department => &mut self.department,
            Field::Author => &mut self.author,
            Field::Title => &mut self.title,
            Field::OriginalTitle => &mut self.original_title,
            Field::Language => &mut self.language,
            Field::Publisher => &mut self.publisher,
            Field::Year => &mut self.year,
            Field::Binding => &mut self.binding,
            Field::Dimensions => &mut self.dimensions,
            Field::PageCount => &mut self.page_count,
            Field::Weight => &mut self.weight,
            Field::PublicationNote => &mut self.publication_note,
            Field::Isbn => &mut self.isbn,
            Field::EanUpc => &mut self.ean_upc,
            Field::Image => &mut self.image,
            Field::Description => &mut self.description,
            Field::Category => &mut self.category,
        }
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        let value = match field {
            Field::MediaKind => &self.media_kind,
            Field::Department => &self.department,
            Field::Author => &self.author,
            Field::Title => &self.title,
            Field::OriginalTitle => &self.original_title,
            Field::Language => &self.language,
            Field::Publisher => &self.publisher,
            Field::Year => &self.year,
            Field::Binding => &self.binding,
            Field::Dimensions => &self.dimensions,
            Field::PageCount => &self.page_count,
            Field::Weight => &self.weight,
            Field::PublicationNote => &self.publication_note,
            Field::Isbn => &self.isbn,
            Field::EanUpc => &self.ean_upc,
            Field::Image => &self.image,
            Field::Description => &self.description,
            Field::Category => &self.category,
        };
        value.as_deref()
    }

    /// Number of fields besides `link` that carry a value.
    pub fn filled(&self) -> usize {
        ALL_FIELDS.iter().filter(|f| self.get(**f).is_some()).count()
    }
}

/// Every optional field in header order.
pub const ALL_FIELDS: [Field; 18] = [
    Field::MediaKind,
    Field::Department,
    Field::Author,
    Field::Title,
    Field::OriginalTitle,
    Field::Language,
    Field::Publisher,
    Field::Year,
    Field::Binding,
    Field::Dimensions,
    Field::PageCount,
    Field::Weight,
    Field::PublicationNote,
    Field::Isbn,
    Field::EanUpc,
    Field::Image,
    Field::Description,
    Field::Category,
];
