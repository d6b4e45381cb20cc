//! One grab run: fetch every source, parse, map, merge, emit and write
//!
//! A source that fails to fetch or parse is reported and skipped; the run
//! only fails outright when nothing usable is left (subject to
//! `output.on_empty`) or when the output cannot be produced.

use std::path::PathBuf;

use bytes::Bytes;
use futures::future::join_all;
use tracing::{debug, error, info, warn};

pub mod output;

use crate::config::{Config, OnEmpty, SourceConfig};
use crate::epg::{EpgMerger, GeneratorOptions, SourceDocument, XmltvGenerator};
use crate::errors::{AppError, AppResult, FetchError, FetchResult, ParseResult};
use crate::models::{PartialDocument, RunReport, SourceOutcome, SourceStatus};
use crate::sources::{ChannelMappings, SourceFormat};
use crate::utils::http_client::{SourceFetcher, StandardHttpClient};
use output::{WriteStatus, write_atomic};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Run the whole pipeline but leave the output file alone
    pub dry_run: bool,
}

/// Drives a single grab run over the configured sources
pub struct EpgGrabber<F> {
    config: Config,
    fetcher: F,
    mappings: ChannelMappings,
}

impl EpgGrabber<StandardHttpClient> {
    /// Build a grabber with the reqwest fetcher and the configured mapping file
    pub fn from_config(config: Config) -> AppResult<Self> {
        let fetcher = StandardHttpClient::new(config.fetch.timeout, &config.fetch.user_agent)?;
        let mappings = match &config.mapping_file {
            Some(path) => ChannelMappings::load_from_file(path)?,
            None => ChannelMappings::default(),
        };
        Ok(Self::new(config, fetcher, mappings))
    }
}

impl<F: SourceFetcher> EpgGrabber<F> {
    pub fn new(config: Config, fetcher: F, mappings: ChannelMappings) -> Self {
        Self {
            config,
            fetcher,
            mappings,
        }
    }

    /// Execute one run and return its report.
    ///
    /// Fails with [`AppError::NoUsableSources`] when no source parsed and
    /// `on_empty` is `keep-existing`; the summary is logged either way.
    pub async fn run(&self, options: RunOptions) -> AppResult<RunReport> {
        info!(
            "Starting EPG grab: {} sources ({} fetch)",
            self.config.sources.len(),
            if self.config.fetch.concurrent { "concurrent" } else { "sequential" }
        );

        let fetched = self.fetch_all().await;

        let mut report = RunReport::default();
        let mut parsed = Vec::with_capacity(fetched.len());

        for (source, fetch_result) in self.config.sources.iter().zip(fetched) {
            let name = source.display_name();
            let status = match fetch_result {
                Err(e) => {
                    error!("Failed to fetch source '{}': {}", name, e);
                    SourceStatus::FetchFailed { error: e.to_string() }
                }
                Ok(data) => match self.parse_source(source, &data) {
                    Err(e) => {
                        error!("Failed to parse source '{}': {}", name, e);
                        SourceStatus::ParseFailed { error: e.to_string() }
                    }
                    Ok(document) => {
                        let status = SourceStatus::Parsed {
                            channels: document.channels.len(),
                            programs: document.programs.len(),
                        };
                        info!(
                            "Parsed source '{}': {} channels, {} programmes",
                            name,
                            document.channels.len(),
                            document.programs.len()
                        );
                        parsed.push(SourceDocument::new(name.clone(), document));
                        status
                    }
                },
            };
            report.sources.push(SourceOutcome { name, status });
        }

        let contents = if parsed.is_empty() {
            match self.config.output.on_empty {
                OnEmpty::KeepExisting => {
                    log_summary(&report);
                    return Err(AppError::NoUsableSources {
                        failed: report.failed_sources(),
                    });
                }
                OnEmpty::WriteEmpty => {
                    warn!("No source could be parsed, writing an empty guide");
                    XmltvGenerator::generate_empty()
                }
            }
        } else {
            let outcome = EpgMerger::merge(parsed);
            report.warnings = outcome.warnings;
            report.channels_written = outcome.document.channel_count();
            report.programs_written = outcome.document.program_count();

            let generator = XmltvGenerator::new(GeneratorOptions {
                normalize_to_utc: self.config.output.normalize_to_utc,
            });
            generator.generate(&outcome.document)?
        };

        if options.dry_run {
            info!(
                "Dry run: would write {} bytes to {}",
                contents.len(),
                self.config.output.path.display()
            );
        } else {
            let path = self.config.output.path.clone();
            let status = write_output(path.clone(), contents).await?;
            report.unchanged = status == WriteStatus::Unchanged;
            report.output_path = Some(path);
        }

        log_summary(&report);
        Ok(report)
    }

    async fn fetch_all(&self) -> Vec<FetchResult<Bytes>> {
        if self.config.fetch.concurrent {
            join_all(self.config.sources.iter().map(|source| self.fetch_source(source))).await
        } else {
            let mut results = Vec::with_capacity(self.config.sources.len());
            for source in &self.config.sources {
                results.push(self.fetch_source(source).await);
            }
            results
        }
    }

    async fn fetch_source(&self, source: &SourceConfig) -> FetchResult<Bytes> {
        let request = source.fetch_request()?;
        let timeout = self.config.fetch.timeout;

        match tokio::time::timeout(timeout, self.fetcher.fetch(&request)).await {
            Ok(result) => {
                if let Ok(data) = &result {
                    debug!("Fetched {} bytes for '{}'", data.len(), source.display_name());
                }
                result
            }
            Err(_) => Err(FetchError::Timeout {
                url: source.display_name(),
                timeout,
            }),
        }
    }

    fn parse_source(&self, source: &SourceConfig, data: &[u8]) -> ParseResult<PartialDocument> {
        let format = SourceFormat::resolve(source.format, data)?;
        if source.format.is_none() {
            debug!("Detected {} format for '{}'", format, source.display_name());
        }

        let mut document = format.parse(data)?;
        self.mappings.apply(&mut document);
        Ok(document)
    }
}

async fn write_output(path: PathBuf, contents: Vec<u8>) -> AppResult<WriteStatus> {
    let target = path.clone();
    tokio::task::spawn_blocking(move || write_atomic(&target, &contents))
        .await
        .map_err(|e| AppError::io(path, std::io::Error::other(e)))?
}

/// Log the end-of-run summary
pub fn log_summary(report: &RunReport) {
    info!(
        "EPG grab summary: {}/{} sources succeeded, {} channels, {} programmes, {} warnings",
        report.succeeded_sources(),
        report.sources.len(),
        report.channels_written,
        report.programs_written,
        report.warnings.len()
    );

    for source in &report.sources {
        match &source.status {
            SourceStatus::Parsed { channels, programs } => {
                info!("  [OK] {}: {} channels, {} programmes", source.name, channels, programs)
            }
            SourceStatus::FetchFailed { error } => {
                warn!("  [FETCH FAILED] {}: {}", source.name, error)
            }
            SourceStatus::ParseFailed { error } => {
                warn!("  [PARSE FAILED] {}: {}", source.name, error)
            }
        }
    }

    for warning in &report.warnings {
        warn!("  {}", warning);
    }

    match (&report.output_path, report.unchanged) {
        (Some(path), true) => info!("Output {} unchanged", path.display()),
        (Some(path), false) => info!("Wrote {}", path.display()),
        (None, _) => info!("No output written"),
    }
}
