use anyhow::Result;
use clap::Parser;
use tracing::instrument;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "rstage",
    version,
    about = "Move rotated logs to a remote directory, compressing them on the way",
    long_about = "`rstage` moves rotated log files (*.log, *.log.gz) from a local directory into a \
remote directory. Files are copied into a temporary staging directory, compressed there with \
gzip, and then copied into the remote directory keeping their relative layout.

Symbolic links are never transferred, and neither are the files they point to: a rotation \
scheme like `current.log -> current.20240101.log` contributes nothing, so the same content is \
never shipped twice.

EXAMPLE:
    # Move logs into a mounted remote directory
    rstage /var/log/myapp /mnt/archive/myapp --summary

EXIT STATUS:
    0 on success, 1 if <LOCAL> is missing, 2 if <REMOTE> is missing, 3 if the transfer failed, 4 on any other usage error."
)]
struct Args {
    // Association
    /// How symbolic links are resolved when excluding link targets
    ///
    /// `single-hop` resolves exactly one level: for a link to a link, the second link is the
    /// excluded target. `chain` follows links until a non-link is reached and excludes that.
    #[arg(
        long,
        value_name = "MODE",
        value_enum,
        default_value_t = common::LinkResolution::SingleHop,
        help_heading = "Association"
    )]
    link_resolution: common::LinkResolution,

    // Staging
    /// Directory in which the temporary staging directory is created (default: system temp directory)
    #[arg(long, value_name = "PATH", help_heading = "Staging")]
    staging_dir: Option<std::path::PathBuf>,

    // Timeouts
    /// Maximum time for each copy step (local -> staging, staging -> remote)
    ///
    /// This option accepts a human readable duration, e.g. "200ms", "10s", "5min" etc.
    /// On expiry no further files are started, but the file being copied at that moment is
    /// finished in the background before the process exits.
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration, help_heading = "Timeouts")]
    copy_timeout: Option<std::time::Duration>,

    /// Maximum time for compressing the staged files
    ///
    /// On expiry the running compression stops at the next chunk and its partial output is removed.
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration, help_heading = "Timeouts")]
    compress_timeout: Option<std::time::Duration>,

    /// Maximum time for removing the staging directory
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration, help_heading = "Timeouts")]
    cleanup_timeout: Option<std::time::Duration>,

    // Progress & output
    /// Verbose level (implies "summary"): -v INFO / -vv DEBUG / -vvv TRACE (default: ERROR)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, help_heading = "Progress & output")]
    verbose: u8,

    /// Print summary at the end
    #[arg(long, help_heading = "Progress & output")]
    summary: bool,

    /// Quiet mode, don't report errors
    #[arg(short = 'q', long = "quiet", help_heading = "Progress & output")]
    quiet: bool,

    // ARGUMENTS
    /// Directory holding the logs to move
    #[arg()]
    local: Option<std::path::PathBuf>,

    /// Directory receiving the compressed logs
    #[arg()]
    remote: Option<std::path::PathBuf>,
}

#[instrument(skip(settings))]
async fn async_main(
    local: std::path::PathBuf,
    remote: std::path::PathBuf,
    settings: common::TransferSettings,
) -> Result<common::TransferSummary> {
    let summary = common::transfer(&local, &remote, &settings).await?;
    tracing::info!(
        "delivered {} file(s) to {:?}",
        summary.delivered.files_copied,
        &remote
    );
    Ok(summary)
}

fn main() -> Result<()> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(error)
            if matches!(
                error.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) =>
        {
            error.exit()
        }
        Err(error) => {
            // usage errors get their own code; clap's default of 2 means "missing <REMOTE>" here
            let _ = error.print();
            std::process::exit(4);
        }
    };
    let Some(local) = args.local.clone() else {
        eprintln!("rstage: missing <LOCAL> argument");
        std::process::exit(1);
    };
    let Some(remote) = args.remote.clone() else {
        eprintln!("rstage: missing <REMOTE> argument");
        std::process::exit(2);
    };
    let settings = common::TransferSettings {
        working_dir: std::env::current_dir()?,
        staging_parent: args.staging_dir.clone().unwrap_or_else(std::env::temp_dir),
        pattern: common::LogPattern::logs()?,
        link_resolution: args.link_resolution,
        timeouts: common::TimeoutConfig {
            copy: args.copy_timeout,
            compress: args.compress_timeout,
            cleanup: args.cleanup_timeout,
        },
        print_listing: true,
    };
    let func = || async_main(local, remote, settings);
    let output = common::OutputConfig {
        quiet: args.quiet,
        verbose: args.verbose,
        print_summary: args.summary || args.verbose > 0,
    };
    let res = common::run(output, func);
    if res.is_none() {
        std::process::exit(3);
    }
    Ok(())
}
