use std::env;
use std::path::PathBuf;

use luna_convert::{ClientConfig, TransferClient};

fn print_usage() {
    eprintln!("Usage: luna [OPTIONS] [FILE]...");
    eprintln!();
    eprintln!("Select images, upload them, convert them to WebP and save the zip archive.");
    eprintln!("FILEs given on the command line are selected and uploaded at startup.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --server <URL>      Conversion service base URL (overrides API_URL and config)");
    eprintln!("  -h, --help          Show this help");
    eprintln!();
    eprintln!(
        "Config file: {}",
        ClientConfig::config_path().display()
    );
}

/// Sends log output to `luna.log` in the data directory, since the TUI owns the terminal.
fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("info");
    let mut builder = env_logger::Builder::from_env(env);

    let log_dir = dirs::data_dir()
        .unwrap_or_else(env::temp_dir)
        .join("luna-convert");
    let log_file = std::fs::create_dir_all(&log_dir).and_then(|()| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_dir.join("luna.log"))
    });
    match log_file {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Err(_) => {
            builder.filter_level(log::LevelFilter::Off);
        }
    }
    let _ = builder.try_init();
}

#[tokio::main]
async fn main() -> luna_convert::Result<()> {
    let mut server = None;
    let mut paths = Vec::new();

    let args: Vec<String> = env::args().skip(1).collect();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            "--server" => {
                i += 1;
                if i < args.len() {
                    server = Some(args[i].clone());
                } else {
                    eprintln!("Error: --server requires a value");
                    std::process::exit(1);
                }
            }
            "--" => {
                paths.extend(args[i + 1..].iter().map(PathBuf::from));
                break;
            }
            flag if flag.starts_with('-') && flag.len() > 1 => {
                eprintln!("Error: unknown option {flag}");
                print_usage();
                std::process::exit(1);
            }
            path => paths.push(PathBuf::from(path)),
        }
        i += 1;
    }

    init_logging();

    let mut config = ClientConfig::load()?;
    if let Some(server) = server {
        config = config.with_base_url(server);
    }
    log::info!(
        "Using {} (archives go to {})",
        config.base_url,
        config.archive_path().display()
    );

    let client = TransferClient::new(config)?;

    #[cfg(feature = "tui")]
    {
        luna_convert::tui::run(client, &paths)
            .await
            .map_err(luna_convert::Error::Io)
    }
    #[cfg(not(feature = "tui"))]
    {
        let _ = (client, paths);
        eprintln!("TUI support not compiled in");
        std::process::exit(1);
    }
}
