use std::time::Duration;

/// Driver connection configuration
///
/// Carries the connection target plus the options that gate driver behavior,
/// notably `retry_writes`.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Database name
    pub database: String,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Per-command timeout; a command exceeding it is treated as a network
    /// failure by the classifier
    pub request_timeout: Option<Duration>,

    /// Whether failed writes are retried once on retryable errors
    pub retry_writes: bool,
}

impl ConnectionConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            database: "test".to_string(),
            connect_timeout: Duration::from_secs(30),
            request_timeout: None,
            retry_writes: true,
        }
    }

    /// Set the database name
    pub fn database(mut self, database: &str) -> Self {
        self.database = database.to_string();
        self
    }

    /// Set connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set per-command timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Enable or disable write retries
    pub fn retry_writes(mut self, enabled: bool) -> Self {
        self.retry_writes = enabled;
        self
    }

    /// Parse from connection string
    ///
    /// Format: "rustdocdb://host:port/database?retryWrites=false"
    pub fn from_url(url: &str) -> Result<Self, String> {
        let rest = url
            .strip_prefix("rustdocdb://")
            .ok_or_else(|| "URL must start with 'rustdocdb://'".to_string())?;

        let (address, tail) = match rest.split_once('/') {
            Some((address, tail)) => (address, Some(tail)),
            None => (rest, None),
        };

        let (host, port) = match address.split_once(':') {
            Some((host, port)) => (
                host,
                port.parse().map_err(|_| "Invalid port".to_string())?,
            ),
            None => (address, 27017),
        };
        if host.is_empty() {
            return Err("Host cannot be empty".to_string());
        }

        let mut config = Self::new(host, port);

        let (database, query) = match tail {
            Some(tail) => match tail.split_once('?') {
                Some((database, query)) => (database, Some(query)),
                None => (tail, None),
            },
            None => ("", None),
        };
        if !database.is_empty() {
            config = config.database(database);
        }

        if let Some(query) = query {
            for pair in query.split('&').filter(|p| !p.is_empty()) {
                match pair.split_once('=') {
                    Some(("retryWrites", value)) => {
                        config.retry_writes = value
                            .parse()
                            .map_err(|_| format!("Invalid retryWrites value: {value}"))?;
                    }
                    Some((key, _)) => return Err(format!("Unknown option: {key}")),
                    None => return Err(format!("Malformed option: {pair}")),
                }
            }
        }

        Ok(config)
    }

    /// Convert to connection string
    pub fn to_url(&self) -> String {
        format!(
            "rustdocdb://{}:{}/{}?retryWrites={}",
            self.host, self.port, self.database, self.retry_writes
        )
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.host.is_empty() {
            return Err("Host cannot be empty".to_string());
        }

        if self.database.is_empty() {
            return Err("Database cannot be empty".to_string());
        }

        if self.connect_timeout.is_zero() {
            return Err("connect_timeout must be > 0".to_string());
        }

        Ok(())
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new("localhost", 27017)
    }
}
