//! Configuration types for output and execution settings

/// Output and logging configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Suppress error output
    pub quiet: bool,
    /// Verbosity level: 0=ERROR, 1=INFO, 2=DEBUG, 3=TRACE
    pub verbose: u8,
    /// Print summary statistics at the end
    pub print_summary: bool,
}

impl OutputConfig {
    /// Filter directive passed to the tracing subscriber
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "off";
        }
        match self.verbose {
            0 => "error",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Deadlines for the blocking stages of a transfer (None = wait indefinitely)
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeoutConfig {
    /// Applies to each pull (local -> staging, staging -> remote) separately
    pub copy: Option<std::time::Duration>,
    pub compress: Option<std::time::Duration>,
    /// Removal of the staging directory
    pub cleanup: Option<std::time::Duration>,
}

/// How far symbolic links are followed when computing link targets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LinkResolution {
    /// Resolve exactly one level, a link to a link yields the intermediate link
    #[default]
    SingleHop,
    /// Follow links until a non-link (or missing) path is reached
    Chain,
}

/// Glob patterns selecting log files, relative to a directory root
pub const LOG_PATTERNS: [&str; 2] = ["**/*.log", "**/*.log.gz"];

/// Maximum number of links followed by [`LinkResolution::Chain`]
pub const MAX_LINK_HOPS: usize = 40;
