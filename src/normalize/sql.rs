use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use super::{Lookup, LookupTable, Normalized, PageCount, ProductRow};

const PRODUCT_COLUMNS: &str = "link, tytul, tytul_orginalu, author_id, publisher_id, \
     category_id, department_id, language_id, rodzaj_nosnik, rodzaj_oprawy, \
     rok_wydania, wymiary, liczba_stron, ciezar, wydano, isbn, ean_upc, image, description";

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS authors (id INTEGER PRIMARY KEY, name TEXT NOT NULL);",
    "CREATE TABLE IF NOT EXISTS publishers (id INTEGER PRIMARY KEY, name TEXT NOT NULL);",
    "CREATE TABLE IF NOT EXISTS categories (id INTEGER PRIMARY KEY, name TEXT NOT NULL);",
    "CREATE TABLE IF NOT EXISTS departments (id INTEGER PRIMARY KEY, name TEXT NOT NULL);",
    "CREATE TABLE IF NOT EXISTS languages (id INTEGER PRIMARY KEY, name TEXT NOT NULL);",
    "CREATE TABLE IF NOT EXISTS products (\
     link TEXT, tytul TEXT, tytul_orginalu TEXT, \
     author_id INTEGER REFERENCES authors(id), \
     publisher_id INTEGER REFERENCES publishers(id), \
     category_id INTEGER REFERENCES categories(id), \
     department_id INTEGER REFERENCES departments(id), \
     language_id INTEGER REFERENCES languages(id), \
     rodzaj_nosnik TEXT, rodzaj_oprawy TEXT, rok_wydania TEXT, wymiary TEXT, \
     liczba_stron INTEGER, ciezar TEXT, wydano TEXT, isbn TEXT, ean_upc TEXT, \
     image TEXT, description TEXT);",
];

/// Backslashes doubled first, then single quotes.
pub fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "''")
}

/// Quoted, escaped literal or bare `NULL`.
pub fn literal(value: Option<&str>) -> String {
    match value {
        Some(v) => format!("'{}'", escape(v)),
        None => "NULL".to_string(),
    }
}

fn key(id: Option<u32>) -> String {
    id.map_or_else(|| "NULL".to_string(), |id| id.to_string())
}

fn page_count(value: &PageCount) -> String {
    match value {
        PageCount::Number(n) => n.to_string(),
        PageCount::Text(t) => literal(Some(t.as_str())),
        PageCount::Null => "NULL".to_string(),
    }
}

pub fn lookup_inserts(table: &str, lookup: &LookupTable) -> Vec<String> {
    lookup
        .entries()
        .map(|(id, name)| {
            format!(
                "INSERT INTO {} (id, name) VALUES ({}, {});",
                table,
                id,
                literal(Some(name))
            )
        })
        .collect()
}

pub fn product_insert(row: &ProductRow) -> String {
    let values = [
        literal(row.link.as_deref()),
        literal(row.title.as_deref()),
        literal(row.original_title.as_deref()),
        key(row.author_id),
        key(row.publisher_id),
        key(row.category_id),
        key(row.department_id),
        key(row.language_id),
        literal(row.media_kind.as_deref()),
        literal(row.binding.as_deref()),
        literal(row.year.as_deref()),
        literal(row.dimensions.as_deref()),
        page_count(&row.page_count),
        literal(row.weight.as_deref()),
        literal(row.publication_note.as_deref()),
        literal(row.isbn.as_deref()),
        literal(row.ean_upc.as_deref()),
        literal(row.image.as_deref()),
        literal(row.description.as_deref()),
    ];
    format!(
        "INSERT INTO products ({}) VALUES ({});",
        PRODUCT_COLUMNS,
        values.join(", ")
    )
}

fn section(out: &mut String, label: &str, statements: &[String]) {
    out.push_str("-- ");
    out.push_str(label);
    out.push('\n');
    out.push_str(&statements.join("\n"));
    out.push_str("\n\n");
}

/// Full import script: lookup tables in fixed order, then products in record
/// order. With `schema`, table definitions come first.
pub fn render_script(normalized: &Normalized, schema: bool) -> String {
    let mut out = String::new();
    if schema {
        let ddl: Vec<String> = SCHEMA.iter().map(|s| s.to_string()).collect();
        section(&mut out, "Schema", &ddl);
    }
    for lookup in Lookup::ALL {
        section(
            &mut out,
            lookup.label(),
            &lookup_inserts(lookup.table(), normalized.table(lookup)),
        );
    }
    let products: Vec<String> = normalized.products.iter().map(product_insert).collect();
    section(&mut out, "Products", &products);
    out
}

pub fn write_script(path: &Path, normalized: &Normalized, schema: bool) -> Result<()> {
    fs::write(path, render_script(normalized, schema))
        .with_context(|| format!("Failed to write {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use crate::record::RawRecord;

    fn unescape(literal: &str) -> String {
        literal[1..literal.len() - 1]
            .replace("''", "'")
            .replace("\\\\", "\\")
    }

    #[test]
    fn escapes_backslash_then_quote() {
        assert_eq!(escape(r"O'Brien\path"), r"O''Brien\\path");
        assert_eq!(literal(Some(r"O'Brien\path")), r"'O''Brien\\path'");
        assert_eq!(literal(None), "NULL");
    }

    #[test]
    fn escaping_round_trips() {
        for s in [r"O'Brien\path", r"\'", "''", r"a\\b", "plain"] {
            assert_eq!(unescape(&literal(Some(s))), s);
        }
    }

    #[test]
    fn non_numeric_page_count_is_quoted() {
        let mut r = RawRecord::new("/p");
        r.page_count = Some("XIV+320".into());
        let n = normalize(&[r]);
        let stmt = product_insert(&n.products[0]);
        assert!(stmt.contains(", 'XIV+320', "));
    }

    #[test]
    fn product_statement_layout() {
        let mut r = RawRecord::new("/solaris");
        r.title = Some("Solaris".into());
        r.author = Some("Stanisław Lem".into());
        r.page_count = Some("340".into());
        let n = normalize(&[r]);
        assert_eq!(
            product_insert(&n.products[0]),
            "INSERT INTO products (link, tytul, tytul_orginalu, author_id, publisher_id, \
             category_id, department_id, language_id, rodzaj_nosnik, rodzaj_oprawy, \
             rok_wydania, wymiary, liczba_stron, ciezar, wydano, isbn, ean_upc, image, \
             description) VALUES ('/solaris', 'Solaris', NULL, 1, NULL, NULL, NULL, NULL, \
             NULL, NULL, NULL, NULL, 340, NULL, NULL, NULL, NULL, NULL, NULL);"
        );
    }

    #[test]
    fn script_sections_in_order() {
        let mut a = RawRecord::new("/a");
        a.author = Some("Flann O'Brien".into());
        a.language = Some("angielski".into());
        let mut b = RawRecord::new("/b");
        b.publisher = Some("Znak".into());
        b.author = Some("Flann O'Brien".into());

        let script = render_script(&normalize(&[a, b]), false);
        let expected = "-- Authors\n\
            INSERT INTO authors (id, name) VALUES (1, 'Flann O''Brien');\n\n\
            -- Publishers\n\
            INSERT INTO publishers (id, name) VALUES (1, 'Znak');\n\n\
            -- Categories\n\n\n\
            -- Departments\n\n\n\
            -- Languages\n\
            INSERT INTO languages (id, name) VALUES (1, 'angielski');\n\n\
            -- Products\n";
        assert!(script.starts_with(expected), "{}", script);
        assert!(script.ends_with(");\n\n"));
        assert_eq!(script.matches("INSERT INTO products").count(), 2);
    }

    #[test]
    fn no_records_still_replaces_script() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("import_data.sql");
        std::fs::write(&path, "INSERT INTO products VALUES ('stale');").unwrap();

        write_script(&path, &normalize(&[]), false).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "-- Authors\n\n\n-- Publishers\n\n\n-- Categories\n\n\n\
             -- Departments\n\n\n-- Languages\n\n\n-- Products\n\n\n"
        );
    }

    #[test]
    fn schema_script_loads_with_integrity() {
        let mut a = RawRecord::new("/a");
        a.author = Some("Lem".into());
        a.publisher = Some("Wydawnictwo Literackie".into());
        a.category = Some("Fantastyka, Klasyka".into());
        a.department = Some("Literatura".into());
        a.language = Some("polski".into());
        a.page_count = Some("XIV+320".into());
        let mut b = RawRecord::new("/b");
        b.author = Some("Mrożek".into());
        b.title = Some("Tango".into());
        b.page_count = Some("96".into());

        let script = render_script(&normalize(&[a, b.clone(), b]), true);
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        conn.execute_batch(&script).unwrap();

        let products: i64 = conn
            .query_row("SELECT COUNT(*) FROM products", [], |r| r.get(0))
            .unwrap();
        assert_eq!(products, 3);
        let author: String = conn
            .query_row(
                "SELECT a.name FROM products p JOIN authors a ON a.id = p.author_id WHERE p.tytul = 'Tango' LIMIT 1",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(author, "Mrożek");
        let null_publishers: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM products WHERE publisher_id IS NULL",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(null_publishers, 2);
        let mut check = conn.prepare("PRAGMA foreign_key_check").unwrap();
        assert!(check.query([]).unwrap().next().unwrap().is_none());
    }
}
