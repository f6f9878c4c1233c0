use clap::Parser;
use leonardo_motion::{runner, LeonardoStudio, Settings, SiteContract};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "leonardo-motion")]
#[command(about = "Generate an image on Leonardo.ai and turn it into a motion video")]
#[command(version)]
struct Cli {
    /// Site contract (YAML) replacing the built-in selectors
    #[arg(long, value_name = "FILE")]
    site: Option<PathBuf>,

    /// Prompt file (overrides LEONARDO_PROMPT_FILE)
    #[arg(long, value_name = "FILE")]
    prompt_file: Option<PathBuf>,

    /// Output directory (overrides DOWNLOAD_DIR)
    #[arg(long, value_name = "DIR")]
    download_dir: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Validate settings and site contract without running
    #[arg(long)]
    check: bool,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("error [{}]: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> leonardo_motion::Result<()> {
    // A .env file in the working directory supplies variables not already set.
    dotenvy::dotenv().ok();

    // Credentials are checked here, before anything touches the network.
    let mut settings = Settings::from_env()?;
    if let Some(dir) = cli.download_dir {
        settings.download_dir = dir;
    }
    if let Some(file) = cli.prompt_file {
        settings.prompt_file = file;
    }
    if cli.headed {
        settings.browser.headless = false;
    }
    settings.validate()?;

    let site = match cli.site {
        Some(ref path) => SiteContract::load(path)?,
        None => SiteContract::builtin()?,
    };

    if cli.check {
        println!("Settings valid");
        println!("  Account: {}", settings.credentials.email);
        println!("  Prompt file: {}", settings.prompt_file.display());
        println!("  Download dir: {}", settings.download_dir.display());
        println!(
            "  Motion: {} ({}s)",
            settings.motion.motion_type, settings.motion.duration_secs
        );
        println!("  Headless: {}", settings.browser.headless);
        if let Some(ref viewport) = settings.browser.viewport {
            println!("  Viewport: {}x{}", viewport.width, viewport.height);
        }
        if let Some(ref user_agent) = settings.browser.user_agent {
            println!("  User agent: {}", user_agent);
        }
        println!("Site contract valid");
        println!("  Login: {}", site.login.url);
        println!("  Image: {}", site.image.url);
        println!("  Video: {}", site.video.url);
        return Ok(());
    }

    runner::prepare(&settings).await?;
    let studio = LeonardoStudio::launch(&settings, site).await?;
    let report = runner::run(&settings, studio).await?;

    tracing::info!(
        "{} steps in {}ms",
        report.steps_executed,
        report.duration_ms
    );
    println!("Video siap: {}", report.video_path.display());
    Ok(())
}
