//! Command-line surface.

use clap::Parser;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "container-watchdog", version, about = "Container-lifecycle watchdog")]
pub struct Cli {
    /// Shell-split argv for the program sink.
    #[arg(long)]
    pub prog: Option<String>,

    /// `ipc://<path>` or `tcp://<host>:<port>`.
    #[arg(long, env = "SOCKET_URL", default_value = "ipc:///var/run/docker.sock")]
    pub socket_url: String,

    /// YAML overlay; hyphenated top-level keys override these defaults.
    #[arg(long)]
    pub config_file: Option<String>,

    /// Events are logged by default; pass `--do-not-print-events` to silence them.
    #[arg(long, default_value_t = true, overrides_with = "do_not_print_events")]
    pub print_all_events: bool,
    #[arg(long, overrides_with = "print_all_events")]
    pub do_not_print_events: bool,

    #[arg(long, overrides_with = "do_not_restart_containers_on_die")]
    pub restart_containers_on_die: bool,
    #[arg(long, overrides_with = "restart_containers_on_die")]
    pub do_not_restart_containers_on_die: bool,

    #[arg(long, default_value_t = 3)]
    pub restart_limit: usize,
    /// Minutes.
    #[arg(long, default_value_t = 10)]
    pub restart_threshold: u64,
    /// Minutes.
    #[arg(long, default_value_t = 2)]
    pub restart_reset_period: u64,

    /// Comma-separated or repeated; a bare `*` expands to `.*`.
    #[arg(long, value_delimiter = ',')]
    pub containers_to_restart: Vec<String>,

    #[arg(long)]
    pub restart_notification_email_addresses_path: Option<String>,
    #[arg(long)]
    pub restart_notification_email_server: Option<String>,

    /// Raises the tracing filter to debug.
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Resolves the enable/disable flag pair into a single boolean. `clap`'s
    /// `overrides_with` ensures only the last flag of each pair takes effect
    /// when both are passed.
    pub fn print_events(&self) -> bool {
        self.print_all_events && !self.do_not_print_events
    }

    pub fn restart_enabled(&self) -> bool {
        self.restart_containers_on_die && !self.do_not_restart_containers_on_die
    }
}
