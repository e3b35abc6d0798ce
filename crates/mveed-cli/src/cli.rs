//! Command line arguments.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use mveed_client::ClientConfig;
use mveed_models::ReelStyle;

#[derive(Debug, Parser)]
#[command(name = "mveed", version, about = "Download social videos and cut highlight reels")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Overrides for values otherwise read from the environment.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Highlight and account backend
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Extraction backend
    #[arg(long, global = true)]
    pub extractor_url: Option<String>,

    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Local store for the auth token and last download
    #[arg(long, global = true)]
    pub storage: Option<PathBuf>,

    /// Where downloads are saved
    #[arg(long, global = true)]
    pub download_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    pub max_upload_mb: Option<u64>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Print Prometheus metrics for this run on exit
    #[arg(long, global = true)]
    pub metrics: bool,
}

impl GlobalArgs {
    pub fn apply(&self, mut config: ClientConfig) -> ClientConfig {
        if let Some(v) = &self.api_url {
            config.api_base_url = v.clone();
        }
        if let Some(v) = &self.extractor_url {
            config.extractor_base_url = v.clone();
        }
        if let Some(v) = &self.api_key {
            config.api_key = Some(v.clone());
        }
        if let Some(v) = &self.storage {
            config.storage_path = v.clone();
        }
        if let Some(v) = &self.download_dir {
            config.download_dir = v.clone();
        }
        if let Some(v) = self.max_upload_mb {
            config.max_upload_mb = v;
        }
        if let Some(v) = self.timeout {
            config.request_timeout = Some(Duration::from_secs(v));
        }
        config
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show metadata for a YouTube, TikTok, Instagram or Twitter URL
    Extract { url: String },

    /// Download a video (or its audio) from a supported platform
    Download {
        url: String,
        #[arg(long)]
        audio: bool,
    },

    /// Analyze a video, pick segments and compile a reel
    Highlight(HighlightArgs),

    /// List recent highlight sessions
    Sessions,

    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Keep the session for 30 days instead of 48 hours
        #[arg(long)]
        remember: bool,
    },

    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        remember: bool,
    },

    Logout,

    Profile,

    #[command(subcommand)]
    Autopost(AutopostCommand),

    /// Report sign-in changes until interrupted
    WatchAuth {
        /// Stop after this many seconds
        #[arg(long)]
        seconds: Option<u64>,
    },
}

#[derive(Debug, Args)]
pub struct HighlightArgs {
    /// Local video file
    #[arg(required_unless_present_any = ["from_url", "last"], conflicts_with_all = ["from_url", "last"])]
    pub file: Option<PathBuf>,

    /// Fetch the video from a URL instead of a local file
    #[arg(long, conflicts_with = "last")]
    pub from_url: Option<String>,

    /// Title used to name a fetched video
    #[arg(long, requires = "from_url")]
    pub title: Option<String>,

    /// Use the last completed `download`
    #[arg(long)]
    pub last: bool,

    #[arg(long, default_value = "variety")]
    pub style: ReelStyle,

    /// Segment ids to leave out of the reel
    #[arg(long = "exclude", value_name = "SEGMENT_ID")]
    pub exclude: Vec<String>,

    /// Stop after analysis
    #[arg(long)]
    pub no_compile: bool,

    /// Also download captions and timeline
    #[arg(long)]
    pub all_assets: bool,
}

#[derive(Debug, Subcommand)]
pub enum AutopostCommand {
    /// Queue a reel for posting
    Request {
        #[arg(long)]
        session: String,
        #[arg(long = "platform", required = true)]
        platforms: Vec<String>,
        #[arg(long)]
        reel_url: Option<String>,
        #[arg(long)]
        caption: Option<String>,
    },
    Jobs,
    Status,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_highlight_args() {
        let cli = Cli::parse_from([
            "mveed", "highlight", "clip.mp4", "--style", "story", "--exclude", "s2", "--exclude", "s3",
        ]);
        let Command::Highlight(args) = cli.command else {
            panic!("expected highlight");
        };
        assert_eq!(args.file, Some(PathBuf::from("clip.mp4")));
        assert_eq!(args.style, ReelStyle::Story);
        assert_eq!(args.exclude, vec!["s2", "s3"]);
    }

    #[test]
    fn test_global_overrides() {
        let cli = Cli::parse_from(["mveed", "sessions", "--api-url", "http://x", "--timeout", "9"]);
        let config = cli.global.apply(ClientConfig::default());
        assert_eq!(config.api_base_url, "http://x");
        assert_eq!(config.request_timeout, Some(Duration::from_secs(9)));
    }
}
