use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use fleet_cli::{parse_field, parse_instant, render_table, RangeEdge};
use fleet_client::{
    ClientConfig, HttpScheduler, HttpTransport, Outcome, ReportSession, RoutePlanner,
    SCHEDULE_LISTING_PATH,
};
use fleet_core::{DispatchMode, FieldValue, FilterState, ReportKind, Scalar, ScheduleBase};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Fleet dashboard reports from the command line", long_about = None)]
struct Args {
    /// Backend URL (overrides FLEET_BASE_URL)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Request timeout in seconds (overrides FLEET_REQUEST_TIMEOUT_SECS)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Display offset from UTC in minutes (overrides FLEET_UTC_OFFSET_MINUTES)
    #[arg(long, global = true, allow_hyphen_values = true, value_parser = utc_offset_arg)]
    utc_offset: Option<i32>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct ReportArgs {
    /// insurance, fuel, maintenance or behavior
    kind: ReportKind,

    /// Device id (repeatable)
    #[arg(short = 'd', long = "device")]
    devices: Vec<i64>,

    /// Group id (repeatable)
    #[arg(short = 'g', long = "group")]
    groups: Vec<i64>,

    /// Range start, RFC 3339 or YYYY-MM-DD
    #[arg(long)]
    from: Option<String>,

    /// Range end, RFC 3339 or YYYY-MM-DD
    #[arg(long)]
    to: Option<String>,

    /// Report-specific filter as key=value (repeatable)
    #[arg(short = 'f', long = "field", value_parser = field_arg)]
    fields: Vec<(String, FieldValue)>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a report and print it
    Generate {
        #[command(flatten)]
        report: ReportArgs,

        /// Print formatted rows as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Export a report as XLSX
    Export {
        #[command(flatten)]
        report: ReportArgs,

        /// Download the spreadsheet to this file instead of printing its URL
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Ask the backend to e-mail a report
    Mail {
        #[command(flatten)]
        report: ReportArgs,
    },
    /// Persist a recurring report schedule
    Schedule {
        #[command(flatten)]
        report: ReportArgs,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long)]
        calendar_id: Option<i64>,

        /// Extra schedule attribute as key=value (repeatable)
        #[arg(long = "attribute", value_parser = field_arg)]
        attributes: Vec<(String, FieldValue)>,
    },
    /// List devices from the directory
    Devices,
    /// Plan route alternatives for a device
    PlanRoute {
        #[arg(long)]
        device_id: i64,

        #[arg(long)]
        start: String,

        #[arg(long)]
        end: String,

        #[arg(long)]
        json: bool,
    },
}

fn field_arg(raw: &str) -> Result<(String, FieldValue), String> {
    parse_field(raw).map_err(|err| err.to_string())
}

fn utc_offset_arg(raw: &str) -> Result<i32, String> {
    fleet_client::config::parse_utc_offset(raw).map_err(|err| err.to_string())
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("fleet_client=info".parse()?)
        .add_directive("fleet_report=info".parse()?);
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}

fn filter_state(report: &ReportArgs, utc_offset_minutes: i32) -> Result<FilterState> {
    let mut filter = FilterState::new(report.devices.clone(), report.groups.clone());
    filter.report_specific = report.kind.descriptor().default_filters();
    filter.report_specific.extend(report.fields.iter().cloned());
    if let Some(from) = &report.from {
        filter.from = Some(parse_instant(from, utc_offset_minutes, RangeEdge::Start).context("invalid --from")?);
    }
    if let Some(to) = &report.to {
        filter.to = Some(parse_instant(to, utc_offset_minutes, RangeEdge::End).context("invalid --to")?);
    }
    Ok(filter)
}

async fn download(config: &ClientConfig, url: &str, output: &Path) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()?;
    let mut request = client.get(url);
    if let Some(token) = &config.auth_token {
        request = request.bearer_auth(token);
    }
    let response = request.send().await.context("export request failed")?;
    let status = response.status();
    let bytes = response.bytes().await?;
    if !status.is_success() {
        return Err(anyhow!(
            "export failed ({}): {}",
            status,
            fleet_core::error::error_message_from_body(&String::from_utf8_lossy(&bytes))
        ));
    }
    tokio::fs::write(output, &bytes)
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs)?;

    let mut config = ClientConfig::from_env()?;
    if let Some(url) = args.url {
        config.base_url = url;
    }
    if let Some(timeout) = args.timeout {
        config.request_timeout_secs = timeout;
    }
    if let Some(offset) = args.utc_offset {
        config.utc_offset_minutes = offset;
    }
    let transport = HttpTransport::new(&config)?;
    tracing::debug!(base_url = %transport.base_url(), "client ready");

    match args.command {
        Command::Generate { report, json } => {
            let filter = filter_state(&report, config.utc_offset_minutes)?;
            let descriptor = report.kind.descriptor();
            let session = ReportSession::new(transport, descriptor, config.locale());
            session
                .submit(&filter, DispatchMode::Generate)
                .await
                .map_err(|err| anyhow!(err.user_message()))?;
            let rows = session.formatted_rows();
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                println!("{}", descriptor.title);
                print!("{}", render_table(descriptor, &rows));
            }
        }
        Command::Export { report, output } => {
            let filter = filter_state(&report, config.utc_offset_minutes)?;
            let session = ReportSession::new(transport, report.kind.descriptor(), config.locale());
            let outcome = session
                .submit(&filter, DispatchMode::Export)
                .await
                .map_err(|err| anyhow!(err.user_message()))?;
            if let Outcome::Redirected(url) = outcome {
                match output {
                    Some(path) => {
                        download(&config, &url, &path).await?;
                        println!("Saved {}", path.display());
                    }
                    None => println!("{}", url),
                }
            }
        }
        Command::Mail { report } => {
            let filter = filter_state(&report, config.utc_offset_minutes)?;
            let session = ReportSession::new(transport, report.kind.descriptor(), config.locale());
            session
                .submit(&filter, DispatchMode::Mail)
                .await
                .map_err(|err| anyhow!(err.user_message()))?;
            println!("Report e-mail requested");
        }
        Command::Schedule {
            report,
            description,
            calendar_id,
            attributes,
        } => {
            let filter = filter_state(&report, config.utc_offset_minutes)?;
            let base = ScheduleBase {
                description,
                calendar_id,
                attributes: attributes
                    .into_iter()
                    .map(|(key, value)| (key, Scalar::from(value)))
                    .collect(),
            };
            let scheduler = HttpScheduler::new(transport.clone());
            let session = ReportSession::new(transport, report.kind.descriptor(), config.locale());
            session
                .schedule(&scheduler, &filter, base)
                .await
                .map_err(|err| anyhow!(err.user_message()))?;
            println!("Schedule saved, see {}", SCHEDULE_LISTING_PATH);
        }
        Command::Devices => {
            let devices = fleet_client::fetch_devices(&transport)
                .await
                .map_err(|err| anyhow!(err.user_message()))?;
            for device in devices {
                let position = device
                    .position
                    .map(|p| format!("{:.5}, {:.5}", p.lat, p.lng))
                    .unwrap_or_else(|| fleet_core::PLACEHOLDER.to_string());
                println!("{:>6}  {:<24}  {:?}  {}", device.id, device.name, device.status, position);
            }
        }
        Command::PlanRoute {
            device_id,
            start,
            end,
            json,
        } => {
            let mut planner = RoutePlanner::new(transport);
            planner
                .load_devices()
                .await
                .map_err(|err| anyhow!(err.user_message()))?;
            planner.set_map_ready(true);
            let routes = planner.plan_routes(device_id, &start, &end).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(routes)?);
            } else {
                for route in routes {
                    let alternative = &route.alternative;
                    println!(
                        "{:<12} {:>8.1} km {:>6.0} min  fuel {:>8} L  {} points  {:.1} km drawn",
                        alternative.route_type.as_str(),
                        alternative.distance_km,
                        alternative.duration_min,
                        alternative.estimated_fuel_liters,
                        route.path.len(),
                        route.path_length_m / 1000.0,
                    );
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utc_offset_flag_accepts_negative_minutes() {
        let args = Args::try_parse_from(["fleet-report", "--utc-offset", "-300", "devices"]).unwrap();
        assert_eq!(args.utc_offset, Some(-300));
    }

    #[test]
    fn utc_offset_flag_rejects_a_day_or_more() {
        for raw in ["1440", "-1440", "40000000"] {
            assert!(Args::try_parse_from(["fleet-report", "--utc-offset", raw, "devices"]).is_err());
        }
    }
}
