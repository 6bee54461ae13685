// ==========================================
// 饲料搅拌批次偏差分析系统 - 命令行入口
// ==========================================
// 子命令:
//   inspect <file>  列出可用筛选项与数据质量
//   analyze <file>  执行分析，输出文本/JSON，可导出 CSV
// ==========================================

use anyhow::{bail, Context, Result};
use batidas_qc::api::{AnalysisApi, FilterOptions};
use batidas_qc::domain::{AnalysisOutcome, AnalysisReport, FeedDataset, NoDataReason, Selection};
use batidas_qc::engine::{AnalysisRequest, DateRange, FilterCriteria};
use batidas_qc::i18n::{self, t, t_with_args};
use batidas_qc::logging::{self, LogFormat};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

/// Feed-batch deviation quality control.
///
/// Reads weighing exports (XLSX/CSV), computes the weighted average deviation
/// of each batch and summarises the distribution.
#[derive(Parser, Debug)]
#[command(name = "batidas-qc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (JSON); defaults to the user config directory
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Output language (pt-BR or en); overrides the configuration
    #[arg(long, global = true)]
    locale: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Verbose logging (debug level)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List operators, foods, diets, food types and the date range of a file
    Inspect {
        /// Input file (.xlsx, .xls, .ods or .csv)
        file: PathBuf,

        /// Output format
        #[arg(short = 'f', long, default_value = "text")]
        format: OutputFormat,
    },

    /// Run the deviation analysis
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Input file (.xlsx, .xls, .ods or .csv)
    file: PathBuf,

    /// Keep only these operators (repeatable)
    #[arg(long = "operator")]
    operators: Vec<String>,

    /// Keep only these foods (repeatable)
    #[arg(long = "food")]
    foods: Vec<String>,

    /// Keep only these diets (repeatable)
    #[arg(long = "diet")]
    diets: Vec<String>,

    /// First day (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last day, inclusive (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Relative weight of a food type, e.g. --weight VOLUMOSO=1.5 (repeatable)
    #[arg(short = 'w', long = "weight", value_parser = parse_weight)]
    weights: Vec<(String, f64)>,

    /// Remove outlier batches (IQR upper fence)
    #[arg(long, conflicts_with = "keep_outliers")]
    remove_outliers: bool,

    /// Keep outlier batches even if the configuration removes them
    #[arg(long)]
    keep_outliers: bool,

    /// Write estatisticas.csv, dados_processados.csv, pesos_relativos.csv and histograma.csv here
    #[arg(short = 'o', long)]
    export: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn parse_weight(raw: &str) -> std::result::Result<(String, f64), String> {
    let (food_type, value) = raw
        .rsplit_once('=')
        .ok_or_else(|| format!("expected TYPE=VALUE, got '{}'", raw))?;
    let food_type = food_type.trim();
    if food_type.is_empty() {
        return Err(format!("missing food type in '{}'", raw));
    }
    let weight = value
        .trim()
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|e| format!("invalid weight '{}': {}", value, e))?;
    Ok((food_type.to_string(), weight))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    logging::init_with(format, if cli.verbose { "debug" } else { "warn" });

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let api = AnalysisApi::from_config_path(cli.config.as_deref())
        .context("failed to load configuration")?;
    i18n::set_locale(cli.locale.as_deref().unwrap_or(&api.config().locale));

    match cli.command {
        Command::Inspect { file, format } => {
            let dataset = api
                .load_dataset(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let options = api.filter_options(&dataset);
            match format {
                OutputFormat::Text => print_options(&dataset, &options),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&options)?),
            }
            Ok(())
        }
        Command::Analyze(args) => analyze(&api, args),
    }
}

fn analyze(api: &AnalysisApi, args: AnalyzeArgs) -> Result<()> {
    let dataset = api
        .load_dataset(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    let date_range = match (args.start, args.end) {
        (None, None) => None,
        (Some(start), None) => Some(DateRange::new(start, start)?),
        (start, Some(end)) => {
            let start = start
                .or_else(|| dataset.date_bounds().map(|(lo, _)| lo))
                .unwrap_or(end);
            Some(DateRange::new(start, end)?)
        }
    };

    let criteria = FilterCriteria {
        operators: Selection::from_values(args.operators),
        foods: Selection::from_values(args.foods),
        diets: Selection::from_values(args.diets),
        date_range,
    };
    let weights = api.with_weight_overrides(api.default_weights(&dataset), args.weights)?;

    let mut request = AnalysisRequest::new(criteria, weights);
    if args.remove_outliers {
        request = request.with_outlier_removal(true);
    } else if args.keep_outliers {
        request = request.with_outlier_removal(false);
    }

    let outcome = api.run_analysis(&dataset, &request)?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Text => match &outcome {
            AnalysisOutcome::NoData { reason } => print_no_data(*reason),
            AnalysisOutcome::Completed(report) => print_report(&dataset, report),
        },
    }

    if let Some(dir) = args.export {
        let Some(report) = outcome.report() else {
            bail!("nothing to export: the selected filters produced no batches");
        };
        let files = api
            .export_report(report, &dir)
            .with_context(|| format!("failed to export to {}", dir.display()))?;
        for path in files {
            eprintln!("{}", t_with_args("cli.exported", &[("path", &path.display().to_string())]));
        }
    }

    Ok(())
}

// ==========================================
// 文本输出
// ==========================================

fn print_options(dataset: &FeedDataset, options: &FilterOptions) {
    println!("{}", t_with_args("cli.source", &[("path", &dataset.source)]));
    println!("{}", t_with_args("cli.rows", &[("count", &dataset.len().to_string())]));
    print_quality(dataset);

    for (key, values) in [
        ("cli.operators", &options.operators),
        ("cli.foods", &options.foods),
        ("cli.diets", &options.diets),
        ("cli.food_types", &options.food_types),
    ] {
        println!("{} ({}):", t(key), values.len());
        for value in values {
            println!("  {}", value);
        }
    }

    if let Some((start, end)) = options.date_bounds {
        println!(
            "{}",
            t_with_args(
                "cli.date_range",
                &[("start", &fmt_date(start)), ("end", &fmt_date(end))]
            )
        );
    }
}

fn print_quality(dataset: &FeedDataset) {
    let missing: usize = dataset.quality.missing_numeric.values().sum();
    if missing > 0 {
        println!("{}", t_with_args("cli.quality_warning", &[("count", &missing.to_string())]));
    }
}

fn print_no_data(reason: NoDataReason) {
    match reason {
        NoDataReason::FiltersExcludedAllRows => println!("{}", t("cli.no_data_filters")),
        NoDataReason::NoGroupableBatches => println!("{}", t("cli.no_data_batches")),
    }
}

fn print_report(dataset: &FeedDataset, report: &AnalysisReport) {
    println!("{}", t("cli.title"));
    println!("{}", t_with_args("cli.source", &[("path", &dataset.source)]));
    println!("{}", t_with_args("cli.filtered_rows", &[("count", &report.filtered_rows.to_string())]));
    if let Some((start, end)) = report.period {
        println!(
            "{}",
            t_with_args("cli.period", &[("start", &fmt_date(start)), ("end", &fmt_date(end))])
        );
    }
    println!("{}", t_with_args("cli.total_batches", &[("count", &report.total_batches().to_string())]));
    if let Some(removed) = report.outliers_removed {
        println!("{}", t_with_args("cli.outliers_removed", &[("count", &removed.to_string())]));
    }
    println!(
        "{}",
        t_with_args(
            "cli.generated_at",
            &[("time", &report.generated_at.format("%d/%m/%Y %H:%M").to_string())]
        )
    );
    print_quality(dataset);

    // 统计表
    let stats = &report.statistics;
    println!();
    println!("{:<32} {}", t("stats.header_statistic"), t("stats.header_value"));
    println!("{:<32} {}", t("stats.batch_count"), stats.batch_count);
    println!("{:<32} {}", t("stats.mean"), fmt_opt(stats.mean_pct));
    println!("{:<32} {}", t("stats.median"), fmt_opt(stats.median_pct));
    for bucket in &stats.buckets {
        let lower = bucket.band.lower.to_string();
        let label = match bucket.band.upper {
            Some(upper) => t_with_args(
                "stats.interval_between",
                &[("lower", &lower), ("upper", &upper.to_string())],
            ),
            None => t_with_args("stats.interval_above", &[("lower", &lower)]),
        };
        println!("{:<32} {}", label, bucket.count);
    }

    // 相对权重
    println!();
    println!("{}", t("cli.weights"));
    for (food_type, weight) in report.weights.iter() {
        println!("{:>20}: {:>4.1}", food_type, weight);
    }

    // 直方图
    if let Some(bins) = &report.histogram {
        println!();
        println!("{}", t_with_args("cli.histogram", &[("tolerance", &bins.tolerance.to_string())]));
        let peak = bins.bins.iter().map(|b| b.count).max().unwrap_or(0).max(1);
        for bin in &bins.bins {
            let width = bin.count * 40 / peak;
            let mark = if bin.lower >= bins.tolerance { '#' } else { '=' };
            println!(
                "[{:>7.2}, {:>7.2}) {:>4} {}",
                bin.lower,
                bin.upper,
                bin.count,
                mark.to_string().repeat(width)
            );
        }
        if bins.excluded > 0 {
            println!("{}", t_with_args("cli.histogram_excluded", &[("count", &bins.excluded.to_string())]));
        }
    }
}

fn fmt_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}
