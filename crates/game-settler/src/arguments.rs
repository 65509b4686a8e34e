use {
    crate::{
        burn::DEAD_ADDRESS,
        feed::EspnScoreboard,
        gas::{DEFAULT_FALLBACK_GAS_PRICE, GasPolicy},
    },
    alloy::primitives::Address,
    clap::Parser,
    std::{
        fmt::{self, Display, Formatter},
        net::SocketAddr,
        path::PathBuf,
        time::Duration,
    },
    url::Url,
};

#[derive(Parser)]
pub struct Arguments {
    #[clap(flatten)]
    pub logging: LoggingArguments,

    /// The Ethereum node URL to connect to.
    #[clap(long, env, default_value = "http://localhost:8545")]
    pub node_url: Url,

    /// Hex encoded private key of the account that sends the settlement
    /// transactions.
    #[clap(long, env, hide_env_values = true)]
    pub private_key: String,

    /// Address of the league pool contract whose fees get forwarded to the
    /// winning team's token.
    #[clap(long, env)]
    pub settlement_contract: Address,

    /// TOML file mapping winning team names to settlement targets.
    #[clap(long, env)]
    pub targets_path: PathBuf,

    /// Minutes to wait between the end of one poll cycle and the start of
    /// the next.
    #[clap(
        long,
        env,
        default_value = "5",
        value_parser = clap::value_parser!(u64).range(1..),
    )]
    pub poll_interval_minutes: u64,

    /// How transactions are priced.
    #[clap(long, env, value_enum, default_value = "estimate-and-buffer")]
    pub gas_strategy: GasPolicy,

    /// Gas price in wei used when the node's gas price can't be queried.
    #[clap(long, env, default_value_t = DEFAULT_FALLBACK_GAS_PRICE)]
    pub fallback_gas_price_wei: u128,

    /// Receiver of burned tokens in buy-back transfer logs.
    #[clap(long, env, default_value_t = DEAD_ADDRESS)]
    pub sink_address: Address,

    /// Scoreboard endpoint polled for game results.
    #[clap(long, env, default_value = EspnScoreboard::DEFAULT_URL)]
    pub scoreboard_url: Url,

    /// Timeout of outgoing HTTP requests (scoreboard and announcements).
    #[clap(long, env, default_value = "10s", value_parser = humantime::parse_duration)]
    pub http_timeout: Duration,

    #[clap(flatten)]
    pub announcements: AnnouncementArguments,

    /// Address to serve `/metrics` and `/liveness` on.
    #[clap(long, env, default_value = "0.0.0.0:9586")]
    pub metrics_address: SocketAddr,
}

impl Arguments {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_minutes.saturating_mul(60))
    }
}

#[derive(Parser)]
pub struct LoggingArguments {
    #[clap(long, env, default_value = "warn,game_settler=debug,observe=info")]
    pub log_filter: String,

    /// At which log level logs should be printed to stderr instead of
    /// stdout.
    #[clap(long, env)]
    pub log_stderr_threshold: Option<tracing::Level>,

    /// Whether to use JSON format for the logs.
    #[clap(long, env, default_value = "false")]
    pub use_json_logs: bool,
}

/// X API user context credentials. Announcements are only posted when all
/// four are set.
#[derive(Parser)]
pub struct AnnouncementArguments {
    #[clap(long, env, hide_env_values = true)]
    pub x_consumer_key: Option<String>,

    #[clap(long, env, hide_env_values = true)]
    pub x_consumer_secret: Option<String>,

    #[clap(long, env, hide_env_values = true)]
    pub x_access_token: Option<String>,

    #[clap(long, env, hide_env_values = true)]
    pub x_access_token_secret: Option<String>,

    /// Block explorer linked in announcements.
    #[clap(long, env, default_value = "https://basescan.org")]
    pub explorer_url: Url,
}

impl Display for Arguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            logging,
            node_url,
            private_key: _,
            settlement_contract,
            targets_path,
            poll_interval_minutes,
            gas_strategy,
            fallback_gas_price_wei,
            sink_address,
            scoreboard_url,
            http_timeout,
            announcements,
            metrics_address,
        } = self;

        write!(f, "{logging}")?;
        writeln!(f, "node_url: {node_url}")?;
        writeln!(f, "private_key: SECRET")?;
        writeln!(f, "settlement_contract: {settlement_contract}")?;
        writeln!(f, "targets_path: {}", targets_path.display())?;
        writeln!(f, "poll_interval_minutes: {poll_interval_minutes}")?;
        writeln!(f, "gas_strategy: {gas_strategy:?}")?;
        writeln!(f, "fallback_gas_price_wei: {fallback_gas_price_wei}")?;
        writeln!(f, "sink_address: {sink_address}")?;
        writeln!(f, "scoreboard_url: {scoreboard_url}")?;
        writeln!(f, "http_timeout: {http_timeout:?}")?;
        write!(f, "{announcements}")?;
        writeln!(f, "metrics_address: {metrics_address}")?;
        Ok(())
    }
}

impl Display for LoggingArguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            log_filter,
            log_stderr_threshold,
            use_json_logs,
        } = self;

        writeln!(f, "log_filter: {log_filter}")?;
        display_option(f, "log_stderr_threshold", log_stderr_threshold)?;
        writeln!(f, "use_json_logs: {use_json_logs}")?;
        Ok(())
    }
}

impl Display for AnnouncementArguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            x_consumer_key,
            x_consumer_secret,
            x_access_token,
            x_access_token_secret,
            explorer_url,
        } = self;

        display_secret_option(f, "x_consumer_key", x_consumer_key)?;
        display_secret_option(f, "x_consumer_secret", x_consumer_secret)?;
        display_secret_option(f, "x_access_token", x_access_token)?;
        display_secret_option(f, "x_access_token_secret", x_access_token_secret)?;
        writeln!(f, "explorer_url: {explorer_url}")?;
        Ok(())
    }
}

fn display_secret_option<T>(f: &mut Formatter<'_>, name: &str, option: &Option<T>) -> fmt::Result {
    display_option(f, name, &option.as_ref().map(|_| "SECRET"))
}

fn display_option(f: &mut Formatter<'_>, name: &str, option: &Option<impl Display>) -> fmt::Result {
    write!(f, "{name}: ")?;
    match option {
        Some(display) => writeln!(f, "{display}"),
        None => writeln!(f, "None"),
    }
}
