use serde::Deserialize;

use crate::record::Field;

/// Label substring that routes a bibliographic table row into a record field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LabelRule {
    pub pattern: String,
    pub field: Field,
}

impl LabelRule {
    pub fn new(pattern: impl Into<String>, field: Field) -> Self {
        LabelRule {
            pattern: pattern.into(),
            field,
        }
    }
}

/// Ordered rule list. The first rule whose pattern occurs in the label wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRules {
    rules: Vec<LabelRule>,
}

// Order is the catalog's table order; keep it when adding labels.
const DEFAULT_RULES: [(&str, Field); 14] = [
    ("Rodzaj (nośnik)", Field::MediaKind),
    ("Dział", Field::Department),
    ("Autor", Field::Author),
    ("Tytuł originału", Field::OriginalTitle),
    ("Język", Field::Language),
    ("Wydawca", Field::Publisher),
    ("Rok wydania", Field::Year),
    ("Rodzaj oprawy", Field::Binding),
    ("Wymiary", Field::Dimensions),
    ("Liczba stron", Field::PageCount),
    ("Ciężar", Field::Weight),
    ("Wydano", Field::PublicationNote),
    ("ISBN", Field::Isbn),
    ("EAN/UPC", Field::EanUpc),
];

impl Default for LabelRules {
    fn default() -> Self {
        LabelRules {
            rules: DEFAULT_RULES
                .iter()
                .map(|(p, f)| LabelRule::new(*p, *f))
                .collect(),
        }
    }
}

impl LabelRules {
    pub fn new(rules: Vec<LabelRule>) -> Self {
        LabelRules { rules }
    }

    pub fn field_for(&self, label: &str) -> Option<Field> {
        self.rules
            .iter()
            .find(|r| label.contains(r.pattern.as_str()))
            .map(|r| r.field)
    }
}
