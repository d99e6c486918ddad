use anomaly_dashboard::{
    app::{App, DataSource},
    capture::ApiClient,
    session::{Credentials, Session, SessionStore, SignupForm, User, ValidationErrors},
    settings::Config,
    validation::validate_domain,
};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info};
use std::fs::File;
use std::process;
use tokio::runtime::Runtime;

#[derive(Parser)]
#[command(name = "anomaly-dashboard")]
#[command(about = "Terminal dashboard for network traffic anomalies and vulnerabilities")]
struct Cli {
    #[arg(short, long, help = "Configuration file path")]
    config: Option<String>,

    #[arg(long, help = "Override the backend base URL")]
    api_url: Option<String>,

    #[arg(long, help = "Use generated data instead of the backend")]
    demo: bool,

    #[arg(short, long, help = "Enable debug logging")]
    debug: bool,

    #[arg(long, help = "Write log output to this file")]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Open the interactive dashboard (default)
    Dashboard,
    /// Sign in and remember the session
    Login { email: String, password: String },
    /// Create an account and sign in
    Signup { name: String, email: String, password: String },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Request a security scan of a domain
    Scan { domain: String },
    /// Start or stop packet capture on the backend
    Capture {
        #[arg(value_enum)]
        action: CaptureAction,
    },
    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Write the default configuration to a file
    Init { path: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum CaptureAction {
    Start,
    Stop,
}

fn init_logging(cli: &Cli, interactive: bool) -> anyhow::Result<()> {
    // Only errors reach the terminal while the UI owns it.
    let default_level = match (cli.debug, interactive && cli.log_file.is_none()) {
        (_, true) => "error",
        (true, false) => "debug",
        (false, false) => "warn",
    };
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));

    if let Some(path) = &cli.log_file {
        let file = File::create(path).with_context(|| format!("Failed to open log file {}", path))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}

fn print_field_errors(errors: &ValidationErrors) {
    for error in &errors.0 {
        eprintln!("  {}", error);
    }
}

fn main() {
    let cli = Cli::parse();
    let interactive = matches!(cli.command, None | Some(Command::Dashboard));

    if let Err(e) = init_logging(&cli, interactive) {
        eprintln!("Warning: {:#}", e);
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load_or_default(cli.config.as_deref())?;
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }
    if cli.demo {
        config.ui.demo_mode = true;
    }
    debug!("Using backend {}", config.api.base_url);

    let runtime = Runtime::new().context("Failed to start async runtime")?;
    let store = SessionStore::new(config.session.resolve_store_path());
    debug!("Session store at {}", store.path().display());

    match cli.command.unwrap_or(Command::Dashboard) {
        Command::Dashboard => run_dashboard(&config, store, &runtime),
        Command::Login { email, password } => {
            let credentials = Credentials::new(&email, &password);
            if let Err(errors) = credentials.validate() {
                print_field_errors(&errors);
                bail!("Invalid login details");
            }
            let client = ApiClient::new(&config.api)?;
            let user = runtime.block_on(client.login(&credentials))?;
            let mut session = Session::restore(store);
            let user = session.establish(user)?;
            println!("Signed in as {} <{}>", user.name, user.email);
            Ok(())
        }
        Command::Signup { name, email, password } => {
            let form = SignupForm::new(&name, &email, &password);
            if let Err(errors) = form.validate() {
                print_field_errors(&errors);
                bail!("Invalid signup details");
            }
            let client = ApiClient::new(&config.api)?;
            let user = runtime.block_on(client.signup(&form))?;
            let mut session = Session::restore(store);
            let user = session.establish(user)?;
            println!("Account created; signed in as {} <{}>", user.name, user.email);
            Ok(())
        }
        Command::Logout => {
            Session::restore(store).end()?;
            println!("Signed out");
            Ok(())
        }
        Command::Whoami => {
            match Session::restore(store).user() {
                Some(user) => println!("{} <{}> (id {})", user.name, user.email, user.id),
                None => println!("Not signed in"),
            }
            Ok(())
        }
        Command::Scan { domain } => {
            if let Err(errors) = validate_domain(&domain) {
                print_field_errors(&errors);
                bail!("Invalid domain");
            }
            let session = Session::restore(store);
            let Some(email) = session.email() else {
                bail!("Sign in before requesting a scan");
            };
            let client = ApiClient::new(&config.api)?;
            let report = runtime.block_on(client.scan(domain.trim(), email))?;
            if report.findings.is_empty() {
                println!("No findings for {}", domain.trim());
            }
            for finding in &report.findings {
                println!("{}: {}", finding.kind, finding.message);
            }
            Ok(())
        }
        Command::Capture { action } => {
            let client = ApiClient::new(&config.api)?;
            match action {
                CaptureAction::Start => {
                    runtime.block_on(client.start_capture())?;
                    println!("Capture started on {}", client.base_url());
                }
                CaptureAction::Stop => {
                    runtime.block_on(client.stop_capture())?;
                    println!("Capture stopped on {}", client.base_url());
                }
            }
            Ok(())
        }
        Command::Config { action: ConfigCommand::Init { path } } => {
            Config::default().save_to_file(&path)?;
            println!("Wrote default configuration to {}", path);
            Ok(())
        }
    }
}

fn run_dashboard(config: &Config, store: SessionStore, runtime: &Runtime) -> anyhow::Result<()> {
    let (session, source) = if config.ui.demo_mode {
        let user = User {
            id: "demo".to_string(),
            email: "demo@example.com".to_string(),
            name: "Demo".to_string(),
        };
        let source = DataSource::Demo {
            packet_count: config.ui.mock_packet_count,
        };
        (Session::ephemeral(user), source)
    } else {
        let session = Session::restore(store);
        if !session.is_authenticated() {
            bail!("Not signed in; run `anomaly-dashboard login <email> <password>` or use --demo");
        }
        (session, DataSource::Api(ApiClient::new(&config.api)?))
    };

    info!("Starting dashboard (demo: {})", config.ui.demo_mode);
    let mut app = App::new(&config.ui, &session, source, runtime.handle().clone());

    if let Err(e) = app.run() {
        eprintln!("Application error: {}", e);
        process::exit(1);
    }

    println!("Dashboard closed.");
    Ok(())
}
