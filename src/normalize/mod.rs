pub mod sql;

use std::collections::HashMap;

use crate::record::{Field, RawRecord};

/// Distinct values of one categorical column, numbered from 1 in the order
/// they are first seen. Blank values never get an id.
#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    ids: HashMap<String, u32>,
    names: Vec<String>,
}

impl LookupTable {
    pub fn build<'a>(values: impl IntoIterator<Item = Option<&'a str>>) -> Self {
        let mut table = LookupTable::default();
        for value in values.into_iter().flatten() {
            table.insert(value);
        }
        table
    }

    fn insert(&mut self, value: &str) {
        if value.trim().is_empty() || self.ids.contains_key(value) {
            return;
        }
        self.names.push(value.to_string());
        self.ids.insert(value.to_string(), self.names.len() as u32);
    }

    pub fn id(&self, value: Option<&str>) -> Option<u32> {
        value.and_then(|v| self.ids.get(v).copied())
    }

    /// `(id, name)` in id order.
    pub fn entries(&self) -> impl Iterator<Item = (u32, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, name)| (i as u32 + 1, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}

/// The five categorical columns, in script order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Authors,
    Publishers,
    Categories,
    Departments,
    Languages,
}

impl Lookup {
    pub const ALL: [Lookup; 5] = [
        Lookup::Authors,
        Lookup::Publishers,
        Lookup::Categories,
        Lookup::Departments,
        Lookup::Languages,
    ];

    pub fn table(self) -> &'static str {
        match self {
            Lookup::Authors => "authors",
            Lookup::Publishers => "publishers",
            Lookup::Categories => "categories",
            Lookup::Departments => "departments",
            Lookup::Languages => "languages",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Lookup::Authors => "Authors",
            Lookup::Publishers => "Publishers",
            Lookup::Categories => "Categories",
            Lookup::Departments => "Departments",
            Lookup::Languages => "Languages",
        }
    }

    pub fn field(self) -> Field {
        match self {
            Lookup::Authors => Field::Author,
            Lookup::Publishers => Field::Publisher,
            Lookup::Categories => Field::Category,
            Lookup::Departments => Field::Department,
            Lookup::Languages => Field::Language,
        }
    }
}

/// Page count as it will be emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCount {
    Number(i64),
    Text(String),
    Null,
}

impl PageCount {
    pub fn coerce(value: Option<&str>) -> PageCount {
        match value {
            None => PageCount::Null,
            Some(v) => match v.trim().parse::<i64>() {
                Ok(n) => PageCount::Number(n),
                Err(_) => PageCount::Text(v.to_string()),
            },
        }
    }
}

/// One `products` row: foreign keys resolved, everything else carried as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRow {
    pub link: Option<String>,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub author_id: Option<u32>,
    pub publisher_id: Option<u32>,
    pub category_id: Option<u32>,
    pub department_id: Option<u32>,
    pub language_id: Option<u32>,
    pub media_kind: Option<String>,
    pub binding: Option<String>,
    pub year: Option<String>,
    pub dimensions: Option<String>,
    pub page_count: PageCount,
    pub weight: Option<String>,
    pub publication_note: Option<String>,
    pub isbn: Option<String>,
    pub ean_upc: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
}

/// Lookup tables plus product rows for one export run.
#[derive(Debug, Clone)]
pub struct Normalized {
    tables: [LookupTable; 5],
    pub products: Vec<ProductRow>,
}

impl Normalized {
    pub fn table(&self, lookup: Lookup) -> &LookupTable {
        &self.tables[lookup as usize]
    }
}

pub fn normalize(records: &[RawRecord]) -> Normalized {
    let tables =
        Lookup::ALL.map(|l| LookupTable::build(records.iter().map(|r| r.get(l.field()))));
    let fk = |lookup: Lookup, record: &RawRecord| {
        tables[lookup as usize].id(record.get(lookup.field()))
    };

    let products = records
        .iter()
        .map(|r| ProductRow {
            link: Some(r.link.clone()).filter(|l| !l.trim().is_empty()),
            title: r.title.clone(),
            original_title: r.original_title.clone(),
            author_id: fk(Lookup::Authors, r),
            publisher_id: fk(Lookup::Publishers, r),
            category_id: fk(Lookup::Categories, r),
            department_id: fk(Lookup::Departments, r),
            language_id: fk(Lookup::Languages, r),
            media_kind: r.media_kind.clone(),
            binding: r.binding.clone(),
            year: r.year.clone(),
            dimensions: r.dimensions.clone(),
            page_count: PageCount::coerce(r.page_count.as_deref()),
            weight: r.weight.clone(),
            publication_note: r.publication_note.clone(),
            isbn: r.isbn.clone(),
            ean_upc: r.ean_upc.clone(),
            image: r.image.clone(),
            description: r.description.clone(),
        })
        .collect();

    Normalized { tables, products }
}
