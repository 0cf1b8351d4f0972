use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::config::Settings;
use crate::error::FetchError;
use crate::fetch::PageFetcher;
use crate::parser::first_result_link;
use crate::store::ResolutionWriter;

/// Outcome of looking one identifier up in the catalog search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(String),
    NotFound,
}

impl Resolution {
    pub fn link(&self) -> Option<&str> {
        match self {
            Resolution::Found(link) => Some(link),
            Resolution::NotFound => None,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResolveStats {
    pub total: usize,
    pub found: usize,
    pub not_found: usize,
    pub errors: usize,
}

pub struct LinkResolver<'a, F> {
    fetcher: &'a F,
    settings: &'a Settings,
}

impl<'a, F: PageFetcher> LinkResolver<'a, F> {
    pub fn new(fetcher: &'a F, settings: &'a Settings) -> Self {
        LinkResolver { fetcher, settings }
    }

    /// Search for `isbn` and return the first hit's page link.
    pub async fn resolve(&self, isbn: &str) -> Result<Resolution, FetchError> {
        let html = self.fetcher.fetch(&self.settings.search_url(isbn)).await?;
        Ok(match first_result_link(&html) {
            Some(link) => Resolution::Found(link),
            None => Resolution::NotFound,
        })
    }

    /// Resolve every identifier in order, one output row each. A failed lookup
    /// is written with a blank link and does not stop the run.
    pub async fn resolve_all(
        &self,
        isbns: &[String],
        out: &mut ResolutionWriter,
    ) -> Result<ResolveStats> {
        let mut stats = ResolveStats {
            total: isbns.len(),
            ..Default::default()
        };

        let pb = ProgressBar::new(isbns.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({percent}%, eta {eta})")?
                .progress_chars("=> "),
        );

        for isbn in isbns {
            let resolution = match self.resolve(isbn).await {
                Ok(Resolution::Found(link)) => {
                    info!(isbn = %isbn, link = %link, "found");
                    stats.found += 1;
                    Resolution::Found(link)
                }
                Ok(Resolution::NotFound) => {
                    info!(isbn = %isbn, "no product found");
                    stats.not_found += 1;
                    Resolution::NotFound
                }
                Err(e) => {
                    warn!(isbn = %isbn, "lookup failed: {}", e);
                    stats.errors += 1;
                    Resolution::NotFound
                }
            };
            out.write(isbn, resolution.link())?;
            pb.inc(1);
        }

        pb.finish_and_clear();
        Ok(stats)
    }
}
