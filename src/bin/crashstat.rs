use std::process::ExitCode;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crashstat::alcohol::{
    alcohol_share, alcohol_share_figure, alcohol_states, alcohol_summary, render_states,
};
use crashstat::cache::{CacheStats, RegionCache, load_table};
use crashstat::compact::{load_and_compact, megabytes, write_snapshot};
use crashstat::config::ConfigLoader;
use crashstat::domain::RegionCode;
use crashstat::error::CrashError;
use crashstat::fetcher::{Fetcher, HttpArchiveSource};
use crashstat::figure::Figure;
use crashstat::geo::{
    DEFAULT_REGION, DEFAULT_THRESHOLD, DEFAULT_YEARS, ROAD_KINDS, cluster_figure, cluster_points,
    make_geo, region_rows, road_figure, road_panels,
};
use crashstat::output::{
    AlcoholReport, AnalysisReport, FetchReport, GeoReport, JsonOutput, OutputMode, PanelSize,
    RegionsReport, SnapshotReport,
};
use crashstat::parser::RegionParser;
use crashstat::stats::{
    FOCUS_REGIONS, RegionCount, animal_fault_counts, animal_fault_figure, condition_figure,
    condition_series, region_overview, region_overview_figure, road_type_counts, road_type_figure,
};
use crashstat::store::Store;
use crashstat::tui::show_figure;

#[derive(Parser)]
#[command(name = "crashstat")]
#[command(about = "Czech police road accident statistics: download, parse, cache and plot")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Plot accidents per region for every region")]
    Stat(FigureArgs),
    #[command(about = "Download the yearly archives into the data directory")]
    Fetch,
    #[command(about = "Load regions and print their row counts")]
    Regions(RegionsArgs),
    #[command(about = "Write the selected regions as a single snapshot file")]
    Snapshot(SnapshotArgs),
    #[command(about = "Compact a snapshot and plot road, animal and weather statistics")]
    Analysis(AnalysisArgs),
    #[command(about = "Plot accident locations and their clusters")]
    Geo(GeoArgs),
    #[command(about = "Alcohol involvement per region")]
    Alcohol(AlcoholArgs),
}

#[derive(Args)]
struct FigureArgs {
    #[arg(long = "fig_location")]
    fig_location: Option<Utf8PathBuf>,

    #[arg(long = "show_figure")]
    show_figure: bool,
}

#[derive(Args)]
struct RegionsArgs {
    codes: Vec<String>,
}

#[derive(Args)]
struct SnapshotArgs {
    #[arg(long)]
    out: Utf8PathBuf,

    codes: Vec<String>,
}

#[derive(Args)]
struct AnalysisArgs {
    #[arg(long)]
    snapshot: Utf8PathBuf,

    #[arg(long)]
    verbose: bool,

    #[arg(long = "fig_dir")]
    fig_dir: Option<Utf8PathBuf>,

    #[arg(long = "show_figure")]
    show_figure: bool,
}

#[derive(Args)]
struct GeoArgs {
    #[arg(long)]
    snapshot: Utf8PathBuf,

    #[arg(long, default_value = DEFAULT_REGION)]
    region: String,

    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    threshold: f64,

    #[arg(long = "fig_dir")]
    fig_dir: Option<Utf8PathBuf>,

    #[arg(long = "show_figure")]
    show_figure: bool,
}

#[derive(Args)]
struct AlcoholArgs {
    #[arg(long)]
    snapshot: Utf8PathBuf,

    #[command(flatten)]
    figure: FigureArgs,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<CrashError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &CrashError) -> u8 {
    match error {
        CrashError::UnknownRegion(_)
        | CrashError::ConfigRead(_)
        | CrashError::ConfigParse(_)
        | CrashError::MissingColumn(_)
        | CrashError::ColumnType { .. } => 2,
        CrashError::Http(_) | CrashError::HttpStatus { .. } | CrashError::Listing(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Stat(args) => run_stat(config, args, output_mode),
        Commands::Fetch => run_fetch(config, output_mode),
        Commands::Regions(args) => run_regions(config, args, output_mode),
        Commands::Snapshot(args) => run_snapshot(config, args, output_mode),
        Commands::Analysis(args) => run_analysis(args, output_mode),
        Commands::Geo(args) => run_geo(args, output_mode),
        Commands::Alcohol(args) => run_alcohol(args, output_mode),
    }
}

fn open_cache(config: Option<&str>) -> miette::Result<RegionCache<HttpArchiveSource>> {
    let resolved = ConfigLoader::resolve(config)?;
    let source = HttpArchiveSource::new()?;
    let fetcher = Fetcher::new(source, resolved.listing_url.clone());
    Ok(RegionCache::new(RegionParser::new(
        fetcher,
        Store::new(&resolved),
    )))
}

fn parse_codes(codes: &[String]) -> Result<Vec<RegionCode>, CrashError> {
    codes.iter().map(|code| code.parse()).collect()
}

fn emit(figure: &Figure, location: Option<&Utf8Path>, show: bool) -> miette::Result<()> {
    if let Some(path) = location {
        figure.save(path)?;
        info!(path = %path, "figure written");
    }
    if show {
        show_figure(figure)?;
    }
    Ok(())
}

fn run_stat(config: Option<&str>, args: FigureArgs, output_mode: OutputMode) -> miette::Result<()> {
    let mut cache = open_cache(config)?;
    let table = cache.get_regions(&[])?;
    let overview = region_overview(&table)?;
    emit(
        &region_overview_figure(&overview),
        args.fig_location.as_deref(),
        args.show_figure,
    )?;
    print_regions(overview, cache.stats(), output_mode)
}

fn run_fetch(config: Option<&str>, output_mode: OutputMode) -> miette::Result<()> {
    let resolved = ConfigLoader::resolve(config)?;
    let fetcher = Fetcher::new(HttpArchiveSource::new()?, resolved.listing_url.clone());
    let files = fetcher.download_archives(&resolved.data_dir)?;
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_fetch(&FetchReport {
            files: files.iter().map(|path| path.to_string()).collect(),
        })
        .into_diagnostic(),
        OutputMode::Interactive => {
            for file in &files {
                println!("{file}");
            }
            println!("{} archives downloaded", files.len());
            Ok(())
        }
    }
}

fn run_regions(
    config: Option<&str>,
    args: RegionsArgs,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let codes = parse_codes(&args.codes)?;
    let mut cache = open_cache(config)?;
    let table = cache.get_regions(&codes)?;
    let overview = region_overview(&table)?
        .into_iter()
        .filter(|entry| codes.is_empty() || codes.iter().any(|code| code.as_str() == entry.region))
        .collect();
    print_regions(overview, cache.stats(), output_mode)
}

fn print_regions(
    regions: Vec<RegionCount>,
    cache: CacheStats,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let total = regions.iter().map(|entry| entry.count).sum();
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_regions(&RegionsReport {
            regions,
            total,
            cache,
        })
        .into_diagnostic(),
        OutputMode::Interactive => {
            for entry in &regions {
                println!("{}\t{}", entry.region, entry.count);
            }
            println!("total\t{total}");
            Ok(())
        }
    }
}

fn run_snapshot(
    config: Option<&str>,
    args: SnapshotArgs,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let codes = parse_codes(&args.codes)?;
    let mut cache = open_cache(config)?;
    let table = cache.get_regions(&codes)?;
    write_snapshot(&table, &args.out)?;
    let report = SnapshotReport {
        path: args.out.to_string(),
        rows: table.len(),
        columns: table.width(),
    };
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_snapshot(&report).into_diagnostic(),
        OutputMode::Interactive => {
            println!(
                "wrote {} rows x {} columns to {}",
                report.rows, report.columns, report.path
            );
            Ok(())
        }
    }
}

fn run_analysis(args: AnalysisArgs, output_mode: OutputMode) -> miette::Result<()> {
    let verbose = args.verbose && matches!(output_mode, OutputMode::Interactive);
    let (table, memory) = load_and_compact(&args.snapshot, verbose)?;

    let road_types = road_type_counts(&table, &FOCUS_REGIONS)?;
    let animals = animal_fault_counts(&table, &FOCUS_REGIONS)?;
    let conditions = condition_series(&table, &FOCUS_REGIONS)?;

    let figures = [
        ("01_roadtype.svg", road_type_figure(&road_types, &FOCUS_REGIONS)),
        ("02_animals.svg", animal_fault_figure(&animals, &FOCUS_REGIONS)),
        ("03_conditions.svg", condition_figure(&conditions, &FOCUS_REGIONS)),
    ];
    for (name, figure) in &figures {
        let location = args.fig_dir.as_ref().map(|dir| dir.join(name));
        emit(figure, location.as_deref(), args.show_figure)?;
    }

    if let OutputMode::NonInteractive = output_mode {
        JsonOutput::print_analysis(&AnalysisReport {
            orig_size_mb: megabytes(memory.before_bytes),
            new_size_mb: megabytes(memory.after_bytes),
            road_types,
            animals,
            conditions,
        })
        .into_diagnostic()?;
    }
    Ok(())
}

fn run_geo(args: GeoArgs, output_mode: OutputMode) -> miette::Result<()> {
    let region: RegionCode = args.region.parse()?;
    let (table, _) = load_and_compact(&args.snapshot, false)?;
    let points = make_geo(&region_rows(&table, region.as_str())?)?;

    let panels = road_panels(&points, region.as_str(), DEFAULT_YEARS, &ROAD_KINDS);
    let location = args.fig_dir.as_ref().map(|dir| dir.join("geo1.svg"));
    emit(
        &road_figure(region.as_str(), &panels, ROAD_KINDS.len()),
        location.as_deref(),
        args.show_figure,
    )?;

    let coordinates: Vec<(f64, f64)> = points.iter().map(|point| (point.x, point.y)).collect();
    let clustering = cluster_points(&coordinates, args.threshold);
    let location = args.fig_dir.as_ref().map(|dir| dir.join("geo2.svg"));
    emit(
        &cluster_figure(region.as_str(), &coordinates, &clustering),
        location.as_deref(),
        args.show_figure,
    )?;

    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_geo(&GeoReport {
            region: region.to_string(),
            points: coordinates.len(),
            threshold: args.threshold,
            panels: panels.iter().map(PanelSize::from).collect(),
            clusters: clustering.clusters,
        })
        .into_diagnostic(),
        OutputMode::Interactive => {
            println!(
                "{region}: {} accidents in {} clusters",
                coordinates.len(),
                clustering.clusters.len()
            );
            for cluster in clustering.clusters.iter().take(10) {
                println!(
                    "cluster {}\t{}\t({:.0}, {:.0})",
                    cluster.label, cluster.count, cluster.centroid.0, cluster.centroid.1
                );
            }
            Ok(())
        }
    }
}

fn run_alcohol(args: AlcoholArgs, output_mode: OutputMode) -> miette::Result<()> {
    let table = load_table(&args.snapshot)?;
    let shares = alcohol_share(&table)?;
    emit(
        &alcohol_share_figure(&shares),
        args.figure.fig_location.as_deref(),
        args.figure.show_figure,
    )?;
    let states = alcohol_states(&table)?;
    let summary = alcohol_summary(&table)?;

    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_alcohol(&AlcoholReport {
            shares,
            states,
            summary,
        })
        .into_diagnostic(),
        OutputMode::Interactive => {
            println!("{}", render_states(&states));
            println!();
            println!("{summary}");
            Ok(())
        }
    }
}
