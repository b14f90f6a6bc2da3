//! CLI runner - executes commands

use crate::bookkeeping::Bookkeeper;
use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::cli::server::{serve, Schedule, ServerConfig};
use crate::config::Settings;
use crate::engine::{run_job_for, JobFailure, JobParams, JobResult, SyncConfig, SyncEngine};
use crate::error::{Error, Result};
use crate::registry::{self, by_range};
use crate::source::{FixtureSource, GoogleSheetsSource, SheetSource};
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command. `Ok(false)` means a job ran but did not fully succeed.
    pub async fn run(&self) -> Result<bool> {
        let settings = Settings::load(self.cli.config.as_deref())?;

        match &self.cli.command {
            Commands::Run {
                spreadsheet,
                tenant,
                fixture,
                tables,
            } => {
                self.sync(
                    &settings,
                    spreadsheet.as_deref(),
                    tenant,
                    fixture.as_deref(),
                    tables.as_deref(),
                )
                .await
            }
            Commands::Ranges {
                spreadsheet,
                fixture,
            } => {
                self.ranges(&settings, spreadsheet.as_deref(), fixture.as_deref())
                    .await?;
                Ok(true)
            }
            Commands::Tables => {
                self.output_message(&json!({
                    "type": "TABLES",
                    "tables": registry::describe()
                }));
                Ok(true)
            }
            Commands::LastSync { tenant } => {
                self.last_sync(&settings, tenant).await?;
                Ok(true)
            }
            Commands::Serve {
                port,
                every,
                spreadsheet,
                tenant,
            } => {
                let schedule = every
                    .map(|secs| -> Result<Schedule> {
                        let spreadsheet = spreadsheet
                            .clone()
                            .ok_or_else(|| Error::missing_field("spreadsheet"))?;
                        let tenant = tenant.clone().ok_or_else(|| Error::missing_field("tenant"))?;
                        Ok(Schedule {
                            every: Duration::from_secs(secs.max(1)),
                            params: JobParams::new(spreadsheet, tenant),
                        })
                    })
                    .transpose()?;
                let config = ServerConfig {
                    settings,
                    store: None,
                    schedule,
                };
                serve(config, *port).await?;
                Ok(true)
            }
        }
    }

    /// Run one job, against the Sheets API or a fixture file
    async fn sync(
        &self,
        settings: &Settings,
        spreadsheet: Option<&str>,
        tenant: &str,
        fixture: Option<&Path>,
        tables: Option<&str>,
    ) -> Result<bool> {
        let specs = registry::select(tables)?;

        let outcome: std::result::Result<JobResult, JobFailure> = match fixture {
            Some(path) => {
                let source = FixtureSource::from_json_file(path)?;
                let store = settings.store.open(None)?;
                SyncEngine::new(Arc::new(source), store)
                    .with_config(SyncConfig::from(&settings.sync))
                    .with_specs(specs)
                    .run_and_record(tenant)
                    .await
                    .map_err(JobFailure::from)
            }
            None => {
                let params = JobParams::new(spreadsheet.unwrap_or_default(), tenant);
                run_job_for(settings, &params, None, specs).await
            }
        };

        match outcome {
            Ok(result) => {
                self.output_message(&result);
                Ok(result.success)
            }
            Err(failure) => {
                self.output_message(&failure);
                Ok(false)
            }
        }
    }

    /// List the spreadsheet's ranges and the table each one feeds
    async fn ranges(
        &self,
        settings: &Settings,
        spreadsheet: Option<&str>,
        fixture: Option<&Path>,
    ) -> Result<()> {
        let source: Box<dyn SheetSource> = match fixture {
            Some(path) => Box::new(FixtureSource::from_json_file(path)?),
            None => {
                settings.validate_source()?;
                Box::new(GoogleSheetsSource::with_http_config(
                    &settings.source.base_url,
                    spreadsheet.unwrap_or_default(),
                    settings.source.auth.clone(),
                    settings.source.http_client_config(),
                )?)
            }
        };

        let ranges: Vec<_> = source
            .list_ranges()
            .await?
            .into_iter()
            .map(|range| {
                let table = by_range(&range).map(|spec| spec.table);
                json!({ "range": range, "table": table })
            })
            .collect();

        self.output_message(&json!({
            "type": "RANGES",
            "ranges": ranges
        }));
        Ok(())
    }

    /// Print the tenant's last successful sync
    async fn last_sync(&self, settings: &Settings, tenant: &str) -> Result<()> {
        let store = settings.store.open(None)?;
        let last = Bookkeeper::new(store.as_ref(), settings.sync.bookkeeping)
            .last_sync(tenant)
            .await?;

        self.output_message(&json!({
            "type": "LAST_SYNC",
            "tenantId": tenant,
            "lastSyncedAt": last.map(|t| t.to_rfc3339())
        }));
        Ok(())
    }

    /// Output a message in the selected format
    fn output_message(&self, msg: &impl Serialize) {
        let rendered = match self.cli.format {
            OutputFormat::Json => serde_json::to_string(msg),
            OutputFormat::Pretty => serde_json::to_string_pretty(msg),
        };
        println!("{}", rendered.unwrap_or_default());
    }
}
