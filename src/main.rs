// Entry point and high-level CLI flow.
//
// Interactive mode:
// - Option [1] loads and validates the CSV, printing a rejection summary.
//   Choosing it again reloads the file.
// - Option [2] picks the region to report on.
// - Option [3] writes the report files and prints previews; afterwards the
//   user can go back to the menu or exit.
//
// Passing --region skips the menu and runs one selection.
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

use covid_trends::cli::Args;
use covid_trends::config::{Config, DEFAULT_CONFIG_FILE};
use covid_trends::loader::{self, LoadOutcome};
use covid_trends::reports::{self, Dashboard};
use covid_trends::types::Metric;
use covid_trends::util::{format_int, format_number};
use covid_trends::views::Selection;
use covid_trends::output;

// The loaded snapshot is shared read-only; a reload swaps in a new one.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| {
    Mutex::new(AppState {
        loaded: None,
        region: None,
    })
});

struct AppState {
    loaded: Option<Arc<LoadOutcome>>,
    region: Option<String>,
}

fn state() -> MutexGuard<'static, AppState> {
    APP_STATE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One trimmed line from stdin after printing `label`; `None` once stdin
/// is closed.
fn prompt(label: &str) -> Option<String> {
    print!("{label}");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

fn confirm_back_to_menu() -> bool {
    loop {
        match prompt("Back to menu (Y/N): ").map(|s| s.to_ascii_uppercase()).as_deref() {
            Some("Y") => return true,
            Some("N") | None => return false,
            _ => println!("Please answer Y or N."),
        }
    }
}

fn init_logging(args: &Args) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level())
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Logging was already initialised");
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?.unwrap_or_default(),
    };
    config.merge_with_args(args);
    Ok(config)
}

fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);
    if path.exists() {
        anyhow::bail!("{DEFAULT_CONFIG_FILE} already exists. Remove it first or edit it manually.");
    }
    std::fs::write(path, Config::default_toml())
        .with_context(|| format!("Failed to write {DEFAULT_CONFIG_FILE}"))?;
    println!("Created {DEFAULT_CONFIG_FILE} with default settings.");
    Ok(())
}

/// Option [1]: load (or reload) and validate the CSV file.
fn handle_load(input: &Path, config: &Config) -> Result<()> {
    let outcome = loader::load(input, &config.schema)
        .with_context(|| format!("Failed to load {}", input.display()))?;
    let rej = &outcome.rejections;
    println!(
        "Processing dataset... ({} rows read, {} valid)",
        format_int(rej.total_rows),
        format_int(rej.accepted)
    );
    if rej.rejected() > 0 {
        println!(
            "Note: {} rows skipped due to validation errors.",
            format_int(rej.rejected())
        );
        output::preview_table("Rejected rows by reason", &reports::rejection_rows(rej), usize::MAX);
    }
    println!(
        "Regions: {}\n",
        outcome.records.regions().join(", ")
    );

    let mut st = state();
    // A reload invalidates a region that no longer exists.
    let stale = st
        .region
        .as_ref()
        .is_some_and(|r| !outcome.records.regions().contains(r));
    if stale {
        st.region = None;
    }
    st.loaded = Some(Arc::new(outcome));
    Ok(())
}

/// Option [2]: choose a region by number or by name.
fn handle_select_region() {
    let Some(loaded) = state().loaded.clone() else {
        println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
        return;
    };
    let regions = loaded.records.regions();
    if regions.is_empty() {
        println!("No valid records to choose from.\n");
        return;
    }
    for (i, r) in regions.iter().enumerate() {
        println!("[{}] {}", i + 1, r);
    }
    let Some(choice) = prompt("Region (number or name): ") else {
        return;
    };
    let picked = choice
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| regions.get(i))
        .or_else(|| regions.iter().find(|r| **r == choice));
    match picked {
        Some(r) => {
            println!("Selected {}\n", r);
            state().region = Some(r.clone());
        }
        None => println!("Invalid choice.\n"),
    }
}

fn selection_for(region: &str, config: &Config, period: Option<i32>) -> Selection {
    let metric = config.forecast.metric;
    let secondary_metric = if metric == Metric::NewDeaths {
        Metric::NewCases
    } else {
        Metric::NewDeaths
    };
    Selection {
        region: region.to_string(),
        period,
        metric,
        secondary_metric,
        horizon: config.forecast.horizon,
    }
}

/// Option [3]: build the dashboard for the chosen region and write the
/// report files.
fn handle_generate_reports(config: &Config, period: Option<i32>) -> Result<()> {
    let (loaded, region) = {
        let st = state();
        (st.loaded.clone(), st.region.clone())
    };
    let Some(loaded) = loaded else {
        println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
        return Ok(());
    };
    let Some(region) = region else {
        println!("Error: No region selected. Please select a region first (option 2).\n");
        return Ok(());
    };

    let selection = selection_for(&region, config, period);
    debug!("Selection: {:?}", selection);
    let dashboard = reports::build_dashboard(&loaded.records, &selection)?;
    write_reports(&dashboard, &loaded, config)
}

fn write_reports(d: &Dashboard, loaded: &LoadOutcome, config: &Config) -> Result<()> {
    let out_dir = PathBuf::from(&config.output.directory);
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let preview = config.output.preview_rows;
    let sel = &d.selection;

    println!("Generating reports for {}...\n", sel.region);

    match &d.summary {
        Some(s) => {
            println!("Summary Statistics ({} to {})", s.first_date, s.last_date);
            println!("Total New Cases: {}", format_number(s.total_new_cases, 0));
            println!("Total New Deaths: {}", format_number(s.total_new_deaths, 0));
            if let Some(rec) = s.total_cases_recovered {
                println!("Total Recovered: {}", format_number(rec, 0));
            }
            println!();
        }
        None => println!("No records for {}.\n", sel.region),
    }

    output::preview_table(
        &format!("Data for {}", sel.region),
        &reports::record_rows(&d.filtered),
        preview,
    );
    let file = out_dir.join("filtered_records.csv");
    output::export_records(&file, &d.filtered, &config.schema)?;
    println!("(Full table exported to {})\n", file.display());

    let r1 = reports::period_rows(d.bucket, &d.views.time_series);
    let file = out_dir.join("report1_time_series.csv");
    output::write_csv(&file, &r1)?;
    output::preview_table(&format!("Report 1: {} over time", sel.metric), &r1, preview);
    println!("(Full table exported to {})\n", file.display());

    let r2 = reports::distribution_rows(&d.views.distribution);
    let file = out_dir.join("report2_distribution.csv");
    output::write_csv(&file, &r2)?;
    let period_label = d
        .views
        .distribution_period
        .map(|p| d.bucket.label(p))
        .unwrap_or_else(|| "-".to_string());
    output::preview_table(
        &format!("Report 2: {} by region ({})", sel.metric, period_label),
        &r2,
        preview,
    );
    println!("(Full table exported to {})\n", file.display());

    let r3 = reports::period_rows(d.bucket, &d.views.trend_by_period);
    let file = out_dir.join("report3_trend_by_period.csv");
    output::write_csv(&file, &r3)?;
    output::preview_table(
        &format!("Report 3: {} by period", sel.secondary_metric),
        &r3,
        preview,
    );
    println!("(Full table exported to {})\n", file.display());

    match &d.forecast {
        Ok(f) => {
            let r4 = reports::forecast_rows(d.bucket, f);
            let file = out_dir.join("report4_forecast.csv");
            output::write_csv(&file, &r4)?;
            let title = format!(
                "Report 4: {}-period forecast of {} (slope {}, R² {})\n\
                 Note: a linear trend is not clamped and may project negative values.",
                sel.horizon,
                sel.metric,
                format_number(f.model.slope, 2),
                format_number(f.model.r_squared, 3)
            );
            output::preview_table(&title, &r4, r4.len());
            println!("(Full table exported to {})\n", file.display());
        }
        Err(e) => println!("Report 4: forecast unavailable: {}\n", e),
    }

    let summary = reports::generate_summary(d, &loaded.rejections);
    let file = out_dir.join("summary.json");
    output::write_json(&file, &summary)?;
    println!("Summary written to {}\n", file.display());
    info!("Reports written to {}", out_dir.display());
    Ok(())
}

fn run_batch(args: &Args, config: &Config, region: &str) -> Result<()> {
    handle_load(&args.input, config)?;
    let known = state()
        .loaded
        .as_ref()
        .is_some_and(|l| l.records.regions().iter().any(|r| r == region));
    if !known {
        anyhow::bail!("region '{region}' has no valid records in {}", args.input.display());
    }
    state().region = Some(region.to_string());
    handle_generate_reports(config, args.period)
}

fn run_menu(args: &Args, config: &Config) {
    loop {
        println!("Select an option:");
        println!("[1] Load the file");
        println!("[2] Select a region");
        println!("[3] Generate reports\n");
        let Some(choice) = prompt("Enter choice: ") else {
            println!("\nExiting the program.");
            break;
        };
        match choice.as_str() {
            "1" => {
                if let Err(e) = handle_load(&args.input, config) {
                    eprintln!("{:#}\n", e);
                }
            }
            "2" => handle_select_region(),
            "3" => {
                println!();
                if let Err(e) = handle_generate_reports(config, args.period) {
                    eprintln!("Report error: {:#}\n", e);
                }
                if !confirm_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => println!("Invalid choice. Please enter 1, 2 or 3.\n"),
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse_args();

    if args.init_config {
        return match handle_init_config() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        };
    }

    init_logging(&args);
    info!("covid_trends v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    let config = match load_config(&args) {
        Ok(c) => c,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match args.region.clone() {
        Some(region) => match run_batch(&args, &config, &region) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("{:#}", e);
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        },
        None => {
            run_menu(&args, &config);
            ExitCode::SUCCESS
        }
    }
}
