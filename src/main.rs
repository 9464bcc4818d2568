use clap::{ArgAction, Parser};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use wok::config::{DEFAULT_CONFIG_FILE, Options};
use wok::site::Site;
use wok::{init, output, serve};

#[derive(Parser)]
#[command(name = "wok")]
#[command(version)]
#[command(about = "Static site generator")]
#[command(long_about = "\
Static site generator

Run inside a site directory to build it into output/:

  site/
  ├── wokconfig               # YAML options (site_title, url_pattern, ...)
  ├── content/                # pages: YAML header, a `---` line, then the body
  ├── templates/              # default.html and any other page templates
  ├── media/                  # copied verbatim into output/
  ├── hooks/                  # optional executables named after a stage
  └── renderers/              # optional executables named after an extension

Start a new site with 'wok --init --title \"My Site\"'.")]
struct Cli {
    /// More logging: -v for progress, -vv for debug detail
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Create a new site skeleton instead of building
    #[arg(long, conflicts_with = "server")]
    init: bool,

    /// Site title for --init
    #[arg(long, requires = "init")]
    title: Option<String>,

    /// Build, then serve the output and rebuild on change
    #[arg(
        long,
        value_name = "HOST[:PORT]",
        num_args = 0..=1,
        default_missing_value = ""
    )]
    server: Option<String>,

    /// Site root directory
    #[arg(long, default_value = ".")]
    site_root: PathBuf,

    /// Config file name, relative to the site root
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: String,
}

/// `-v` and `-vv` win over `RUST_LOG`; without them the default is `warn`.
fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.init {
        let title = cli
            .title
            .unwrap_or_else(|| Options::default().site_title);
        let created = init::init_site(&cli.site_root, &title, &cli.config)?;
        output::print_init_output(&title, &created, &cli.site_root);
        return Ok(());
    }

    // Parse the address before building so a typo fails fast.
    let address = cli
        .server
        .as_deref()
        .map(serve::parse_address)
        .transpose()?;

    let site = Site::open(&cli.site_root, &cli.config)?;
    let report = site.generate()?;
    output::print_build_output(&report, &site.layout().content);

    if let Some((host, port)) = address {
        serve::serve_site(site, &host, port)?;
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
