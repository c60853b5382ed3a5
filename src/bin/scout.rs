use std::io;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;

use fbref_scout::cli::{self, Args, EXIT_INVALID_INPUT};
use fbref_scout::config::ScraperConfig;
use fbref_scout::fetch::PageFetcher;
use fbref_scout::logging;

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(EXIT_INVALID_INPUT as u8),
            };
        }
    };
    logging::init(&args.log_level);

    let config = args.apply_to(ScraperConfig::from_env());
    let mut fetcher = match PageFetcher::new(&config) {
        Ok(fetcher) => fetcher,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(cli::EXIT_DOWNLOAD_FAILED as u8);
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let code = cli::run(&args, &mut fetcher, &config, &mut out);
    ExitCode::from(code as u8)
}
