use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::parser::{LabelRule, LabelRules};
use crate::store;

const DEFAULT_CONFIG_FILE: &str = "catalog_harvester";
pub const DEFAULT_USER_AGENT: &str = concat!("catalog_harvester/", env!("CARGO_PKG_VERSION"));

/// Everything the pipeline needs to know about where to read, write and fetch.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub base_url: String,
    pub search_path: String,
    pub isbn_source: PathBuf,
    pub resolved_links: PathBuf,
    pub link_source: PathBuf,
    pub output_dir: PathBuf,
    pub batch_prefix: String,
    pub batch_size: usize,
    pub sql_output: PathBuf,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub excluded_categories: Vec<String>,
    /// Overrides the built-in label order when non-empty.
    #[serde(default)]
    pub label_rules: Vec<LabelRule>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            base_url: "https://ksiegarniainternetowa.co.uk".into(),
            search_path: "/en/search?q=".into(),
            isbn_source: "source.csv".into(),
            resolved_links: "results.csv".into(),
            link_source: "ready_links.csv".into(),
            output_dir: ".".into(),
            batch_prefix: "results_batch".into(),
            batch_size: 200,
            sql_output: "import_data.sql".into(),
            request_timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.into(),
            excluded_categories: vec![
                "Aktualne promocje".into(),
                "Szybka wysyłka".into(),
                "Promocje!".into(),
            ],
            label_rules: Vec::new(),
        }
    }
}

impl Settings {
    /// Defaults, then an optional TOML file, then `CATALOG_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Settings> {
        let d = Settings::default();
        let mut builder = Config::builder()
            .set_default("base_url", d.base_url)?
            .set_default("search_path", d.search_path)?
            .set_default("isbn_source", path_str(&d.isbn_source))?
            .set_default("resolved_links", path_str(&d.resolved_links))?
            .set_default("link_source", path_str(&d.link_source))?
            .set_default("output_dir", path_str(&d.output_dir))?
            .set_default("batch_prefix", d.batch_prefix)?
            .set_default("batch_size", d.batch_size as u64)?
            .set_default("sql_output", path_str(&d.sql_output))?
            .set_default("request_timeout_secs", d.request_timeout_secs)?
            .set_default("user_agent", d.user_agent)?
            .set_default("excluded_categories", d.excluded_categories)?;

        builder = match path {
            Some(p) => builder.add_source(File::from(p).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix("CATALOG")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("excluded_categories"),
            )
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        if self.base_url.trim().is_empty() {
            bail!("base_url must not be empty");
        }
        Ok(())
    }

    pub fn label_rules(&self) -> LabelRules {
        if self.label_rules.is_empty() {
            LabelRules::default()
        } else {
            LabelRules::new(self.label_rules.clone())
        }
    }

    /// Absolute page URL for a catalog link.
    pub fn page_url(&self, link: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), link)
    }

    pub fn search_url(&self, isbn: &str) -> String {
        format!(
            "{}{}{}",
            self.base_url.trim_end_matches('/'),
            self.search_path,
            isbn
        )
    }

    pub fn batch_path(&self, number: usize) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}.csv", self.batch_prefix, number))
    }

    pub fn manifest_path(&self) -> PathBuf {
        store::manifest_path(&self.output_dir, &self.batch_prefix)
    }
}

fn path_str(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_join_without_double_slash() {
        let s = Settings {
            base_url: "https://shop.example/".into(),
            ..Default::default()
        };
        assert_eq!(s.page_url("/book-1"), "https://shop.example/book-1");
        assert_eq!(
            s.search_url("9780000000000"),
            "https://shop.example/en/search?q=9780000000000"
        );
    }

    #[test]
    fn batch_files_are_numbered() {
        let s = Settings {
            output_dir: "out".into(),
            ..Default::default()
        };
        assert_eq!(s.batch_path(3), PathBuf::from("out/results_batch_3.csv"));
        assert_eq!(
            s.manifest_path(),
            PathBuf::from("out/results_batch_manifest.json")
        );
    }

    #[test]
    fn zero_batch_size_rejected() {
        let s = Settings {
            batch_size: 0,
            ..Default::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harvest.toml");
        std::fs::write(&path, "batch_size = 50\nbase_url = \"http://localhost:8080\"\n").unwrap();
        let s = Settings::load(Some(&path)).unwrap();
        assert_eq!(s.batch_size, 50);
        assert_eq!(s.base_url, "http://localhost:8080");
        assert_eq!(s.batch_prefix, "results_batch");
        assert_eq!(s.excluded_categories.len(), 3);
        assert_eq!(s.label_rules(), LabelRules::default());
    }

    #[test]
    fn label_order_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harvest.toml");
        std::fs::write(
            &path,
            "[[label_rules]]\npattern = \"ISBN\"\nfield = \"isbn\"\n\n\
             [[label_rules]]\npattern = \"Autor\"\nfield = \"author\"\n",
        )
        .unwrap();
        let rules = Settings::load(Some(&path)).unwrap().label_rules();
        assert_eq!(rules.field_for("Autor / ISBN"), Some(crate::record::Field::Isbn));
        assert_eq!(rules.field_for("Wydawca:"), None);
    }
}
