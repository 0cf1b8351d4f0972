use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::FetchError;
use crate::fetch::PageFetcher;
use crate::manifest::{BatchEntry, FailedLink, HarvestManifest};
use crate::parser::{PageExtraction, ProductParser};
use crate::store;

/// What happened to a single link.
#[derive(Debug)]
pub enum ItemOutcome {
    Extracted(PageExtraction),
    Failed(FetchError),
}

pub struct Harvester<'a, F> {
    fetcher: &'a F,
    parser: ProductParser,
    settings: &'a Settings,
}

impl<'a, F: PageFetcher> Harvester<'a, F> {
    pub fn new(fetcher: &'a F, parser: ProductParser, settings: &'a Settings) -> Self {
        Harvester {
            fetcher,
            parser,
            settings,
        }
    }

    pub async fn harvest_one(&self, link: &str) -> ItemOutcome {
        match self.fetcher.fetch(&self.settings.page_url(link)).await {
            Ok(html) => ItemOutcome::Extracted(self.parser.parse(link, &html)),
            Err(e) => ItemOutcome::Failed(e),
        }
    }

    /// Scrape `links` in order, `batch_size` at a time. Each batch with at least
    /// one record becomes `<prefix>_<n>.csv`; `n` advances even for batches
    /// where every link failed.
    pub async fn run(&self, links: &[String]) -> Result<HarvestManifest> {
        let size = self.settings.batch_size.max(1);
        let total = links.len();
        let mut manifest = HarvestManifest::start(total, size);

        let removed =
            store::clear_batches(&self.settings.output_dir, &self.settings.batch_prefix)?;
        if removed > 0 {
            info!(removed, "removed batch files from a previous harvest");
        }

        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({percent}%) {wide_msg}")?
                .progress_chars("=> "),
        );

        for (batch_idx, chunk) in links.chunks(size).enumerate() {
            let number = batch_idx + 1;
            let mut records = Vec::with_capacity(chunk.len());

            for (offset, link) in chunk.iter().enumerate() {
                let index = batch_idx * size + offset + 1;
                let percent = index as f64 / total as f64 * 100.0;
                debug!(index, total, "scraping {}/{} ({:.2}%) - {}", index, total, percent, link);
                pb.set_message(link.clone());

                if link.trim().is_empty() {
                    warn!(index, "blank link, skipped");
                    manifest.failed.push(FailedLink {
                        index,
                        link: link.clone(),
                        error: "blank link".to_string(),
                    });
                    pb.inc(1);
                    continue;
                }

                match self.harvest_one(link).await {
                    ItemOutcome::Extracted(page) => {
                        if !page.missing.is_empty() {
                            debug!(
                                link = %link,
                                missing = ?page.missing,
                                fields = page.record.filled(),
                                "page regions absent"
                            );
                        }
                        records.push(page.record);
                    }
                    ItemOutcome::Failed(e) => {
                        warn!(index, link = %link, "failed to scrape: {}", e);
                        manifest.failed.push(FailedLink {
                            index,
                            link: link.clone(),
                            error: e.to_string(),
                        });
                    }
                }
                pb.inc(1);
            }

            if records.is_empty() {
                warn!(batch = number, "batch produced no records, nothing written");
                continue;
            }

            let path = self.settings.batch_path(number);
            store::write_batch(&path, &records)?;
            pb.suspend(|| info!(batch = number, records = records.len(), "saved {:?}", path));
            manifest.extracted += records.len();
            manifest.batches.push(BatchEntry {
                number,
                path,
                records: records.len(),
            });
        }

        pb.finish_and_clear();
        manifest.finish();
        manifest.write(&self.settings.manifest_path())?;
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::stub::StubFetcher;

    const PAGE: &str = r#"<div class="product-name"><h1 itemprop="name">Book</h1></div>"#;

    fn settings(dir: &std::path::Path, batch_size: usize) -> Settings {
        Settings {
            base_url: "https://shop.test".into(),
            output_dir: dir.to_path_buf(),
            batch_size,
            ..Default::default()
        }
    }

    fn links(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("/p/{}", i)).collect()
    }

    fn fetcher_for(links: &[String]) -> StubFetcher {
        links.iter().fold(StubFetcher::default(), |f, l| {
            f.page(&format!("https://shop.test{}", l), PAGE)
        })
    }

    #[tokio::test]
    async fn one_failure_in_a_full_batch_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path(), 200);
        let links = links(200);
        let fetcher = fetcher_for(&links).status("https://shop.test/p/150", 500);

        let manifest = Harvester::new(&fetcher, ProductParser::default(), &s)
            .run(&links)
            .await
            .unwrap();

        let written = store::read_batch(&s.batch_path(1)).unwrap();
        assert_eq!(written.len(), 199);
        assert!(written.iter().all(|r| r.link != "/p/150"));
        assert_eq!(written[148].link, "/p/149");
        assert_eq!(written[149].link, "/p/151");
        assert_eq!(written[0].title.as_deref(), Some("Book"));
        assert_eq!(manifest.extracted, 199);
        assert_eq!(manifest.failed.len(), 1);
        assert_eq!(manifest.failed[0].index, 150);
        assert_eq!(manifest.failed[0].link, "/p/150");
    }

    #[tokio::test]
    async fn failed_batch_advances_counter() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path(), 2);
        let links = links(5);
        let fetcher = fetcher_for(&links)
            .status("https://shop.test/p/3", 500)
            .status("https://shop.test/p/4", 502);

        let manifest = Harvester::new(&fetcher, ProductParser::default(), &s)
            .run(&links)
            .await
            .unwrap();

        assert!(s.batch_path(1).exists());
        assert!(!s.batch_path(2).exists());
        assert!(s.batch_path(3).exists());
        assert_eq!(store::read_batch(&s.batch_path(3)).unwrap().len(), 1);
        let numbers: Vec<usize> = manifest.batches.iter().map(|b| b.number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(manifest.total, 5);
        assert_eq!(manifest.extracted, 3);
    }

    #[tokio::test]
    async fn links_fetched_strictly_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path(), 3);
        let links = links(7);
        let fetcher = fetcher_for(&links);

        Harvester::new(&fetcher, ProductParser::default(), &s)
            .run(&links)
            .await
            .unwrap();

        let expected: Vec<String> = links.iter().map(|l| format!("https://shop.test{}", l)).collect();
        assert_eq!(*fetcher.requested.borrow(), expected);
        let all = store::read_all_batches(dir.path(), &s.batch_prefix).unwrap();
        let got: Vec<&str> = all.iter().map(|r| r.link.as_str()).collect();
        assert_eq!(got, links.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn manifest_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path(), 10);
        let links = links(2);
        let fetcher = fetcher_for(&links[..1]);

        Harvester::new(&fetcher, ProductParser::default(), &s)
            .run(&links)
            .await
            .unwrap();

        let m = HarvestManifest::read(&s.manifest_path()).unwrap();
        assert!(m.finished_at.is_some());
        assert_eq!(m.batches.len(), 1);
        assert_eq!(m.batches[0].records, 1);
        assert_eq!(m.failed[0].link, "/p/2");
    }

    #[tokio::test]
    async fn rerun_replaces_previous_batches() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path(), 2);

        let old: Vec<String> = (1..=6).map(|i| format!("/old/{}", i)).collect();
        Harvester::new(&fetcher_for(&old), ProductParser::default(), &s)
            .run(&old)
            .await
            .unwrap();
        assert_eq!(store::discover_batches(dir.path(), &s.batch_prefix).unwrap().len(), 3);

        let new: Vec<String> = (1..=4).map(|i| format!("/new/{}", i)).collect();
        let fetcher = fetcher_for(&new[..2]);
        let manifest = Harvester::new(&fetcher, ProductParser::default(), &s)
            .run(&new)
            .await
            .unwrap();

        assert_eq!(manifest.batches.len(), 1);
        assert!(!s.batch_path(2).exists());
        assert!(!s.batch_path(3).exists());
        for records in [
            store::read_all_batches(dir.path(), &s.batch_prefix).unwrap(),
            store::read_harvested(dir.path(), &s.batch_prefix).unwrap(),
        ] {
            let got: Vec<&str> = records.iter().map(|r| r.link.as_str()).collect();
            assert_eq!(got, vec!["/new/1", "/new/2"]);
        }
    }

    #[tokio::test]
    async fn blank_links_are_not_fetched() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path(), 10);
        let links = vec!["/p/1".to_string(), String::new(), "  ".to_string()];
        let fetcher = fetcher_for(&links[..1]).page("https://shop.test", PAGE);

        let manifest = Harvester::new(&fetcher, ProductParser::default(), &s)
            .run(&links)
            .await
            .unwrap();

        assert_eq!(*fetcher.requested.borrow(), vec!["https://shop.test/p/1".to_string()]);
        assert_eq!(manifest.extracted, 1);
        let skipped: Vec<usize> = manifest.failed.iter().map(|f| f.index).collect();
        assert_eq!(skipped, vec![2, 3]);
    }

    #[tokio::test]
    async fn empty_input_clears_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path(), 10);
        let links = links(3);
        Harvester::new(&fetcher_for(&links), ProductParser::default(), &s)
            .run(&links)
            .await
            .unwrap();

        let m = Harvester::new(&StubFetcher::default(), ProductParser::default(), &s)
            .run(&[])
            .await
            .unwrap();
        assert!(m.batches.is_empty());
        assert!(store::read_harvested(dir.path(), &s.batch_prefix).unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_input_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path(), 10);
        let fetcher = StubFetcher::default();
        let m = Harvester::new(&fetcher, ProductParser::default(), &s)
            .run(&[])
            .await
            .unwrap();
        assert_eq!(m.total, 0);
        assert!(store::discover_batches(dir.path(), &s.batch_prefix).unwrap().is_empty());
    }
}
