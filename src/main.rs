//! Binary entrypoint for the gowork CLI.
//!
//! Commands:
//! - `start [--daemon] [--pid-file <path>]` - run the game server
//! - `init` - create a starter `config.toml`, seed the world state, and
//!   optionally create the first manager account
//! - `status` - print store statistics and the current world state
//! - `admin-passwd <username> [--promote]` - reset an account password
//!   (argon2 hashed), optionally promoting the account to manager
//!
//! See the library crate docs for module-level details: `gowork::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use gowork::config::Config;
use gowork::game::Role;
use gowork::server::GameServer;
use gowork::storage::GameStore;

#[derive(Parser)]
#[command(name = "gowork")]
#[command(about = "A gamified attendance and progression server for small teams")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the game server
    Start {
        /// Run as a background daemon (Unix only)
        #[arg(short, long)]
        daemon: bool,

        /// Listen on this port, overriding the configured bind address
        #[arg(short, long)]
        port: Option<u16>,

        /// PID file location (for daemon mode)
        #[arg(long, default_value = "/tmp/gowork.pid")]
        pid_file: String,
    },
    /// Create a starter configuration and seed the world
    Init,
    /// Show store statistics and the current world state
    Status,
    /// Set or update an account password
    AdminPasswd {
        /// Account to update
        username: String,

        /// Also promote the account to manager
        #[arg(long)]
        promote: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config early to configure logging. Init may be about to create
    // the file, and daemon-mode start initializes logging after the fork.
    let pre_config = match &cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    match &cli.command {
        Commands::Start { daemon, .. } if *daemon => {}
        Commands::Init => {}
        _ => init_logging(&pre_config, cli.verbose),
    }

    match cli.command {
        Commands::Start {
            daemon,
            port,
            pid_file,
        } => {
            #[cfg(all(unix, feature = "daemon"))]
            if daemon {
                let mut config = match pre_config {
                    Some(config) => config,
                    None => Config::load(&cli.config).await?,
                };
                if let Some(port) = port {
                    config.server.bind_addr = with_port(&config.server.bind_addr, port);
                }
                // The parent exits inside; only the child returns here.
                daemonize_process(&config, &pid_file)?;
                init_logging(&Some(config.clone()), cli.verbose);
                info!("Starting gowork v{}", env!("CARGO_PKG_VERSION"));
                let server = GameServer::new(config)?;
                server.run().await?;
                return Ok(());
            }

            #[cfg(not(all(unix, feature = "daemon")))]
            if daemon {
                let _ = pid_file;
                eprintln!("Error: daemon mode requires a Unix platform and the 'daemon' feature.");
                eprintln!("Compile with: cargo build --features daemon");
                std::process::exit(1);
            }

            let mut config = match pre_config {
                Some(config) => config,
                None => Config::load(&cli.config).await?,
            };
            if let Some(port) = port {
                config.server.bind_addr = with_port(&config.server.bind_addr, port);
            }
            info!("Starting gowork v{}", env!("CARGO_PKG_VERSION"));
            let server = GameServer::new(config)?;
            server.run().await?;
        }
        Commands::Init => {
            init_logging(&None, cli.verbose);
            let config = match Config::load(&cli.config).await {
                Ok(config) => {
                    info!("Using existing configuration at {}", cli.config);
                    config
                }
                Err(_) => {
                    Config::create_default(&cli.config).await?;
                    info!("Configuration file created at {}", cli.config);
                    Config::default()
                }
            };

            // Opening a fresh store seeds the boss, the event modifiers, the
            // weather, and the MOTD.
            let server = GameServer::new(config.clone())?;
            server.store().put_weather(config.game.default_weather)?;
            info!(
                "World seeded in {} (weather: {})",
                config.storage.data_dir,
                config.game.default_weather.name()
            );

            if server.store().account_count() == 0 {
                create_first_manager(server.store())?;
            }
        }
        Commands::Status => {
            let config = match pre_config {
                Some(config) => config,
                None => Config::load(&cli.config).await?,
            };
            let server = GameServer::new(config)?;
            server.show_status()?;
        }
        Commands::AdminPasswd { username, promote } => {
            let config = match pre_config {
                Some(config) => config,
                None => Config::load(&cli.config).await?,
            };
            // Takes the same store lock as the server, so stop the daemon
            // before resetting passwords.
            let server = GameServer::new(config)?;
            let store = server.store();

            println!("Setting password for '{}'.", username);
            let pass1 = rpassword::prompt_password("New password: ")?;
            if pass1.len() < 8 {
                println!("Error: password too short (min 8).");
                return Ok(());
            }
            if pass1.len() > 128 {
                println!("Error: password too long.");
                return Ok(());
            }
            let pass2 = rpassword::prompt_password("Confirm password: ")?;
            if pass1 != pass2 {
                println!("Error: passwords do not match.");
                return Ok(());
            }
            store.set_password(&username, &pass1)?;
            if promote {
                let mut account = store.get_account(&username)?;
                account.role = Role::Manager;
                store.put_account(account)?;
                println!("Password updated and '{}' promoted to manager.", username);
            } else {
                println!("Password updated.");
            }
        }
    }

    Ok(())
}

/// Interactive bootstrap for an empty store. Registration over the wire can
/// be disabled in config, so `init` offers a way to create the first
/// manager directly.
fn create_first_manager(store: &GameStore) -> Result<()> {
    use std::io::Write;

    println!("No accounts yet. Create the first manager account.");
    print!("Manager username (blank to skip): ");
    std::io::stdout().flush()?;
    let mut username = String::new();
    std::io::stdin().read_line(&mut username)?;
    let username = username.trim();
    if username.is_empty() {
        println!("Skipped. Register over the wire, then use admin-passwd --promote.");
        return Ok(());
    }

    let pass1 = rpassword::prompt_password("Manager password: ")?;
    if pass1.len() < 8 {
        println!("Error: password too short (min 8).");
        return Ok(());
    }
    let pass2 = rpassword::prompt_password("Confirm password: ")?;
    if pass1 != pass2 {
        println!("Error: passwords do not match.");
        return Ok(());
    }

    let account = store.register_account(username, username, &pass1, Role::Manager)?;
    println!("Manager account '{}' created.", account.username);
    Ok(())
}

/// Swap the port on a `host:port` bind address.
fn with_port(bind_addr: &str, port: u16) -> String {
    match bind_addr.rsplit_once(':') {
        Some((host, _)) => format!("{}:{}", host, port),
        None => format!("{}:{}", bind_addr, port),
    }
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;

    let mut builder = env_logger::Builder::new();
    // CLI verbosity wins; otherwise fall back to the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config.as_ref().and_then(|c| {
        let path = c.logging.file.as_ref()?;
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });
    let security_path = config.as_ref().and_then(|c| c.logging.security_file.clone());

    match log_file {
        Some(file) => {
            let file = std::sync::Mutex::new(file);
            // In daemon mode stdout is redirected into the log file already,
            // so only mirror to the console when it is a real terminal.
            let is_tty = atty::is(atty::Stream::Stdout);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());

                if let Ok(mut guard) = file.lock() {
                    let _ = writeln!(guard, "{}", line);
                }

                // Security events also land in their own file for review.
                if record.target() == "security" {
                    if let Some(ref path) = security_path {
                        if let Ok(mut sec) = std::fs::OpenOptions::new()
                            .create(true)
                            .append(true)
                            .open(path)
                        {
                            let _ = writeln!(sec, "{}", line);
                        }
                    }
                }

                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(|fmt, record| {
                writeln!(
                    fmt,
                    "{} [{}] {}",
                    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                    record.level(),
                    record.args()
                )
            });
        }
    }

    let _ = builder.try_init();
}

/// Daemonize the process (Unix only)
///
/// Re-executes the binary detached from the terminal with stdout/stderr
/// pointed at the log file, writes the child PID, and exits the parent.
#[cfg(all(unix, feature = "daemon"))]
fn daemonize_process(config: &Config, pid_file: &str) -> Result<()> {
    use std::fs::OpenOptions;
    use std::process::Command;

    let log_path = config.logging.file.as_deref().unwrap_or("gowork.log");

    let current_exe = std::env::current_exe()?;
    let mut args: Vec<String> = std::env::args().collect();

    // Drop the --daemon flag so the child does not fork again
    if let Some(pos) = args.iter().position(|arg| arg == "--daemon" || arg == "-d") {
        args.remove(pos);
    }

    let log_file = OpenOptions::new().create(true).append(true).open(log_path)?;

    let child = Command::new(&current_exe)
        .args(&args[1..])
        .stdin(std::process::Stdio::null())
        .stdout(log_file.try_clone()?)
        .stderr(log_file)
        .spawn()?;

    std::fs::write(pid_file, child.id().to_string())?;

    // Parent ends here; the child carries on as the daemon
    std::process::exit(0);
}
