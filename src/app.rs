use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::{error::ErrorKind, Parser};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

use crate::cli::args::CliArgs;
use crate::cli::validation;
use crate::config::{self, ConfigFile};
use crate::events::{EventSink, ScanEvent};
use crate::output::{self, OutputFormat};
use crate::runner::{Options, Runner, ScanSession};
use crate::target;
use crate::utils;
use crate::wordlist::{self, WordlistSource};

fn print_banner(no_color: bool) {
    const BANNER: &str = r#"
                 __    __
    ____  ____ _/ /_  / /_  ________      _____  ___  ____
   / __ \/ __ `/ __/ / __ \/ ___/ / | /| / / _ \/ _ \/ __ \
  / /_/ / /_/ / /_  / / / (__  )| |/ |/ /  __/  __/ /_/ /
 / .___/\__,_/\__/ /_/ /_/____/ |__/|__/\___/\___/ .___/
/_/                                             /_/
         multi-port http path discovery
    "#;
    if no_color {
        print!("{}", BANNER);
    } else {
        let _ = write!(&mut rainbowcoat::stdout(), "{}", BANNER);
    }
    println!();
}

fn format_kv_line(label: &str, value: &str) {
    println!(":: {:<12}: {}", label, value);
}

fn join_ports(ports: &[u16]) -> String {
    ports
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "pathsweep=error",
        1 => "pathsweep=info",
        2 => "pathsweep=debug",
        _ => "pathsweep=trace",
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Clone, Debug)]
struct RunConfig {
    target: String,
    ports: Vec<u16>,
    port_origin: &'static str,
    options: Options,
    output: Option<String>,
    output_format: OutputFormat,
    workers: usize,
    no_color: bool,
}

fn resolve_ports(
    cli_ports: Option<String>,
    cfg_ports: Option<String>,
    services: Option<String>,
) -> Result<(Vec<u16>, &'static str), String> {
    if let Some(raw) = cli_ports.or(cfg_ports) {
        let ports = utils::parse_port_list_csv(&raw)
            .map_err(|e| format!("invalid ports '{raw}': {e}"))?;
        return Ok((ports, "explicit"));
    }
    if let Some(path) = services {
        let path = config::expand_tilde(&path);
        let json = std::fs::read_to_string(&path)
            .map_err(|e| format!("failed to read service map '{}': {e}", path.display()))?;
        let services = target::parse_service_map(&json)
            .map_err(|e| format!("failed to parse service map '{}': {e}", path.display()))?;
        let web_ports = target::candidate_http_ports(&services);
        let origin = if services.values().any(|s| s.is_web()) {
            "service map"
        } else {
            "default (no web services in map)"
        };
        return Ok((web_ports, origin));
    }
    Ok((target::DEFAULT_HTTP_PORTS.to_vec(), "default"))
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let no_color = args.no_color || cfg.no_color.unwrap_or(false);

    let target = args
        .target
        .or(cfg.target)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| "a target is required (--target or `target:` in config)".to_string())?;
    validation::validate_target(&target)?;

    let (ports, port_origin) = resolve_ports(args.ports, cfg.ports, args.services.or(cfg.services))?;

    let defaults = Options::default();

    let wordlist = match args.wordlist.or(cfg.wordlist) {
        Some(path) => WordlistSource::FilePath(config::expand_tilde(&path)),
        None => WordlistSource::Default(PathBuf::from(wordlist::DEFAULT_WORDLIST_PATH)),
    };

    let extensions = match args.extensions.or(cfg.extensions) {
        Some(raw) => utils::parse_extensions_csv(&raw)
            .map_err(|e| format!("invalid extensions '{raw}': {e}"))?,
        None => defaults.extensions.clone(),
    };

    let concurrency = args
        .concurrency
        .or(cfg.concurrency)
        .unwrap_or(defaults.concurrency);
    if concurrency == 0 {
        return Err("invalid concurrency, expected positive integer".to_string());
    }
    let timeout_secs = args.timeout.or(cfg.timeout).unwrap_or(5);
    if timeout_secs == 0 {
        return Err("invalid timeout, expected positive number of seconds".to_string());
    }

    let secure_ports: BTreeSet<u16> = match args.secure_ports.or(cfg.secure_ports) {
        Some(raw) => utils::parse_port_set_csv(&raw)
            .map_err(|e| format!("invalid secure ports '{raw}': {e}"))?,
        None => defaults.secure_ports.clone(),
    };

    let verify_tls = args.verify_tls || cfg.verify_tls.unwrap_or(false);
    let user_agent = args
        .user_agent
        .or(cfg.user_agent)
        .unwrap_or_else(|| defaults.user_agent.clone());
    let progress_interval = cfg
        .progress_interval_ms
        .map(Duration::from_millis)
        .unwrap_or(defaults.progress_interval);

    let output = args.output.or(cfg.output).filter(|o| !o.trim().is_empty());
    let output_format = match args.output_format.or(cfg.output_format) {
        Some(raw) => OutputFormat::parse(&raw)
            .ok_or_else(|| format!("invalid output format '{raw}'"))?,
        None => OutputFormat::Results,
    };

    let workers = args.workers.or(cfg.workers).unwrap_or(4).max(1);

    Ok(RunConfig {
        target,
        ports,
        port_origin,
        options: Options {
            wordlist,
            extensions,
            concurrency,
            timeout: Duration::from_secs(timeout_secs),
            secure_ports,
            accept_invalid_certs: !verify_tls,
            user_agent,
            progress_interval,
        },
        output,
        output_format,
        workers,
        no_color,
    })
}

fn print_settings(run: &RunConfig) {
    let exts: Vec<&str> = run
        .options
        .extensions
        .iter()
        .map(|e| if e.is_empty() { "(none)" } else { e.as_str() })
        .collect();
    println!("{}", "-".repeat(58));
    format_kv_line("Target", &run.target);
    format_kv_line(
        "Ports",
        &format!("{} [{}]", join_ports(&run.ports), run.port_origin),
    );
    format_kv_line("Wordlist", &run.options.wordlist.describe());
    format_kv_line("Extensions", &exts.join(" "));
    format_kv_line("Concurrency", &run.options.concurrency.to_string());
    format_kv_line("Timeout", &format!("{}s", run.options.timeout.as_secs()));
    format_kv_line(
        "TLS verify",
        if run.options.accept_invalid_certs {
            "off"
        } else {
            "on"
        },
    );
    if let Some(out) = run.output.as_deref() {
        format_kv_line("Output", out);
    }
    println!("{}", "-".repeat(58));
    println!();
}

/// One console line per event that deserves one. Progress is shown on the bar instead.
fn describe_event(event: &ScanEvent) -> Option<String> {
    match event {
        ScanEvent::SessionStarted {
            port,
            base_url,
            candidates,
            workers,
        } => Some(format!(
            "{} {} ({} candidates, {} workers)",
            format!("[{port}]").bold().white(),
            base_url.bold().blue(),
            candidates,
            workers
        )),
        ScanEvent::CandidateFound {
            path,
            result,
            found,
            ..
        } => {
            let status = result.status_code.to_string();
            let status = if result.is_redirect() {
                status.bold().yellow()
            } else {
                status.bold().green()
            };
            let mut line = format!(
                "{} {} {} {} bytes",
                format!("[{found}]").bold().white(),
                status,
                path.bold().white(),
                result.content_length
            );
            if !result.redirect_url.is_empty() {
                line.push_str(&format!(" -> {}", result.redirect_url.cyan()));
            }
            Some(line)
        }
        ScanEvent::Progress(_) => None,
        ScanEvent::SessionCompleted {
            port,
            found,
            elapsed,
        } => Some(format!(
            "{} {} paths found in {}",
            format!("[{port}]").bold().white(),
            found.to_string().bold().green(),
            utils::format_duration_secs(elapsed.as_secs_f64())
        )),
        ScanEvent::PortSkipped {
            port,
            base_url,
            reason,
        } => Some(format!(
            "{} {} unreachable, skipping port {}: {}",
            "[WRN]".bold().yellow(),
            base_url,
            port,
            reason
        )),
        ScanEvent::WordlistMissing {
            port,
            source,
            reason,
        } => Some(format!(
            "{} wordlist {} unavailable for port {}: {}",
            "[WRN]".bold().yellow(),
            source,
            port,
            reason
        )),
        ScanEvent::SessionFailed { port, reason } => Some(format!(
            "{} port {} failed: {}",
            "[ERR]".bold().red(),
            port,
            reason
        )),
    }
}

async fn render_events(pb: ProgressBar, mut rx: mpsc::UnboundedReceiver<ScanEvent>) {
    while let Some(event) = rx.recv().await {
        match &event {
            ScanEvent::SessionStarted {
                port, candidates, ..
            } => {
                pb.reset();
                pb.set_length(*candidates as u64);
                pb.set_position(0);
                pb.set_prefix(port.to_string());
                pb.set_message("");
            }
            ScanEvent::Progress(snapshot) => {
                pb.set_position(snapshot.completed as u64);
                pb.set_message(format!(
                    "{:.0}/s eta {}",
                    snapshot.rate,
                    utils::format_duration_secs(snapshot.eta)
                ));
            }
            _ => {}
        }
        if let Some(line) = describe_event(&event) {
            pb.println(line);
        }
    }
    pb.finish_and_clear();
}

async fn write_output(path: &str, rendered: &[u8]) -> Result<(), String> {
    let path = config::expand_tilde(path);
    let mut outfile = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&path)
        .await
        .map_err(|e| format!("failed to open output file '{}': {e}", path.display()))?;
    outfile
        .write_all(rendered)
        .await
        .map_err(|e| format!("failed to write output file '{}': {e}", path.display()))
}

fn print_summary(session: &ScanSession) {
    println!();
    for s in output::summarize(session) {
        println!(
            ":: port {:<6}: {} found ({} redirects)",
            s.port, s.found, s.redirects
        );
    }
    if session.interrupted {
        println!(
            "{}",
            ":: interrupted, ports not listed above were not scanned"
                .bold()
                .yellow()
        );
    }
}

async fn run_async(run: RunConfig) -> Result<ScanSession, String> {
    let now = Instant::now();
    print_settings(&run);

    let pb = ProgressBar::new(0);
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.enable_steady_tick(Duration::from_millis(500));
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.blue} [{prefix}] {elapsed} {bar:30} {pos}/{len} {msg}")
            .map_err(|e| format!("invalid progress template: {e}"))?
            .progress_chars(r#"#>-"#),
    );

    let (events, rx) = EventSink::channel();
    let render_handle = tokio::spawn(render_events(pb, rx));

    let runner = Runner::new(run.options.clone())
        .map_err(|e| e.to_string())?
        .with_events(events);

    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let session = runner
        .discover_until(&run.target, &run.ports, shutdown)
        .await
        .map_err(|e| e.to_string());

    // closes the event channel so the renderer drains and exits
    drop(runner);
    let _ = render_handle.await;
    let session = session?;

    if let Some(path) = run.output.as_deref() {
        let rendered = output::render(&session, run.output_format)
            .map_err(|e| format!("failed to serialize results: {e}"))?;
        write_output(path, &rendered).await?;
    }

    print_summary(&session);
    println!(
        ":: Completed :: {} paths across {} ports in {} ::",
        session.total_found(),
        session.results.len(),
        utils::format_duration_secs(now.elapsed().as_secs_f64())
    );
    if let Some(path) = run.output.as_deref() {
        println!("{} {}", "results are saved in".bold().white(), path.bold().cyan());
    }
    Ok(session)
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{e}");
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    init_tracing(args.verbose);

    if args.init_config {
        let path = match args.config.as_deref() {
            Some(p) => config::expand_tilde(p),
            None => config::default_config_path()
                .ok_or_else(|| "cannot locate home directory for config".to_string())?,
        };
        if config::ensure_default_config_file(&path)? {
            println!("wrote default config to {}", path.display());
        } else {
            println!("config already exists at {}", path.display());
        }
        return Ok(());
    }

    let cfg = match args.config.as_deref() {
        Some(p) => config::load_config(&config::expand_tilde(p), false)?,
        None => match config::default_config_path() {
            Some(path) => config::load_config(&path, true)?,
            None => ConfigFile::default(),
        },
    };

    let run = build_run_config(args, cfg)?;
    if run.no_color {
        colored::control::set_override(false);
    }
    print_banner(run.no_color);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(run.workers)
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))?;
    Ok(())
}
