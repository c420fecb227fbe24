use crate::cli::args::CliArgs;

/// A target must be a bare host name or address: no scheme, no path.
pub fn validate_target(target: &str) -> Result<(), String> {
    if target.trim().is_empty() {
        return Err("invalid target, expected a host name or address".to_string());
    }
    if target.contains("://") || target.contains('/') {
        return Err(format!(
            "invalid target '{target}', expected a bare host without scheme or path"
        ));
    }
    Ok(())
}

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(target) = args.target.as_deref() {
        validate_target(target)?;
    }
    if let Some(raw) = args.ports.as_deref() {
        crate::utils::parse_port_list_csv(raw)
            .map_err(|e| format!("invalid --ports '{raw}': {e}"))?;
    }
    if let Some(raw) = args.secure_ports.as_deref() {
        crate::utils::parse_port_set_csv(raw)
            .map_err(|e| format!("invalid --secure-ports '{raw}': {e}"))?;
    }
    if let Some(raw) = args.extensions.as_deref() {
        crate::utils::parse_extensions_csv(raw)
            .map_err(|e| format!("invalid --extensions '{raw}': {e}"))?;
    }
    if args.concurrency == Some(0) {
        return Err("invalid concurrency, expected positive integer".to_string());
    }
    if args.timeout == Some(0) {
        return Err("invalid timeout, expected positive number of seconds".to_string());
    }
    if args.workers == Some(0) {
        return Err("invalid workers, expected positive integer".to_string());
    }
    if let Some(raw) = args.output_format.as_deref() {
        if crate::output::OutputFormat::parse(raw).is_none() {
            return Err(format!(
                "invalid --output-format '{raw}', expected results or session"
            ));
        }
    }
    Ok(())
}
