use clap::Parser;

/// Command-line flags. Anything left unset falls back to the layered
/// configuration.
#[derive(Parser, Debug, Default)]
#[command(name = "orbital", version, about = "Live event map stream server")]
pub struct Cli {
    /// Address both listeners bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port for the HTTP event stream
    #[arg(long)]
    pub http_port: Option<u16>,

    /// Port for inbound event datagrams
    #[arg(long)]
    pub udp_port: Option<u16>,

    /// Fraction of inbound datagrams forwarded to clients (0.0 to 1.0)
    #[arg(long)]
    pub sample_rate: Option<f64>,

    /// Send this many synthetic datagrams to the ingest port and exit
    #[arg(long, default_value_t = 0)]
    pub test: u64,

    /// Pause between synthetic datagrams, in microseconds
    #[arg(long, default_value_t = 500)]
    pub test_interval_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let cli = Cli::parse_from([
            "orbital",
            "--host",
            "0.0.0.0",
            "--http-port",
            "8000",
            "--udp-port",
            "9000",
            "--test",
            "25",
        ]);

        assert_eq!(cli.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(cli.http_port, Some(8000));
        assert_eq!(cli.udp_port, Some(9000));
        assert_eq!(cli.test, 25);
        assert_eq!(cli.test_interval_us, 500);
        assert!(cli.sample_rate.is_none());
    }
}
