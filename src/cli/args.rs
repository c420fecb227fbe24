use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "pathsweep",
    version,
    about = "concurrent multi-port HTTP path discovery",
    long_about = "Pathsweep probes a wordlist of paths (expanded with file extensions) against every web port of a host and records which paths exist.\n\nExamples:\n  pathsweep -t 10.0.0.5\n  pathsweep -t target.tld -p 80,8080 -x php,bak -c 20\n  pathsweep -t target.tld --services ./nmap-services.json -o paths.json\n\nTip: Use --config to persist scan settings and keep CLI invocations short."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "vb",
        visible_alias = "verbose",
        action = ArgAction::Count,
        help_heading = "Output",
        help = "Increase log verbosity (-v, -vv, -vvv)."
    )]
    pub verbose: u8,

    #[arg(
        long = "nc",
        visible_alias = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'o',
        long = "out",
        visible_alias = "output",
        value_name = "FILE",
        help_heading = "Output",
        help = "Write results as JSON to FILE."
    )]
    pub output: Option<String>,

    #[arg(
        long = "of",
        visible_alias = "output-format",
        value_name = "FORMAT",
        help_heading = "Output",
        help = "JSON layout: results (port -> path -> result) or session."
    )]
    pub output_format: Option<String>,

    #[arg(
        short = 't',
        long = "tg",
        visible_alias = "target",
        value_name = "HOST",
        help_heading = "Input",
        help = "Target host name or IP address."
    )]
    pub target: Option<String>,

    #[arg(
        short = 'p',
        long = "pt",
        visible_alias = "ports",
        value_name = "PORTS",
        help_heading = "Input",
        help = "Ports to sweep (comma-separated). Overrides --services."
    )]
    pub ports: Option<String>,

    #[arg(
        short = 'S',
        long = "svc",
        visible_alias = "services",
        value_name = "FILE",
        help_heading = "Input",
        help = "JSON port -> service map from a port scan; http/https services become targets."
    )]
    pub services: Option<String>,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        help_heading = "Input",
        help = "Path to config file (defaults to ~/.pathsweep/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        long = "ic",
        visible_alias = "init-config",
        help_heading = "Input",
        help = "Write a default config file (if none exists) and exit."
    )]
    pub init_config: bool,

    #[arg(
        short = 'w',
        long = "wl",
        visible_alias = "wordlist",
        value_name = "FILE",
        help_heading = "Wordlist",
        help = "Wordlist file, one path per line, '#' starts a comment."
    )]
    pub wordlist: Option<String>,

    #[arg(
        short = 'x',
        long = "ext",
        visible_alias = "extensions",
        value_name = "EXTS",
        help_heading = "Wordlist",
        help = "Extensions appended to every word (comma-separated, e.g. php,bak). The bare word is always probed."
    )]
    pub extensions: Option<String>,

    #[arg(
        short = 'c',
        long = "cnc",
        visible_alias = "concurrency",
        value_name = "N",
        help_heading = "Performance",
        help = "Max concurrent probes per port."
    )]
    pub concurrency: Option<usize>,

    #[arg(
        long = "wk",
        visible_alias = "workers",
        value_name = "N",
        help_heading = "Performance",
        help = "Runtime worker threads."
    )]
    pub workers: Option<usize>,

    #[arg(
        short = 'T',
        long = "to",
        visible_alias = "timeout",
        value_name = "SECONDS",
        help_heading = "HTTP",
        help = "Per-request timeout in seconds."
    )]
    pub timeout: Option<u64>,

    #[arg(
        long = "sp",
        visible_alias = "secure-ports",
        value_name = "PORTS",
        help_heading = "HTTP",
        help = "Ports probed over https (comma-separated)."
    )]
    pub secure_ports: Option<String>,

    #[arg(
        long = "vt",
        visible_alias = "verify-tls",
        help_heading = "HTTP",
        help = "Verify TLS certificates and hostnames (off by default in recon mode)."
    )]
    pub verify_tls: bool,

    #[arg(
        short = 'a',
        long = "ua",
        visible_alias = "user-agent",
        value_name = "UA",
        help_heading = "HTTP",
        help = "User-Agent header sent with every probe."
    )]
    pub user_agent: Option<String>,
}
