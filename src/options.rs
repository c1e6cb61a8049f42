use crate::value::DEFAULT_DATE_FORMAT;

/// Per-connection defaults inherited by every statement.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StatementOptions {
    /// chrono format used by date columns created from schema discovery.
    pub date_format: String,
    /// Prefix of generated deferred-bind labels (`:q1`, `:q2`, ...).
    pub bind_label_prefix: String,
    /// Iteration count passed to the engine for non-row-producing statements.
    pub mutation_iterations: u32,
    /// Byte size for text columns whose reported size is zero.
    pub default_text_size: usize,
}

impl Default for StatementOptions {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_owned(),
            bind_label_prefix: "q".to_owned(),
            mutation_iterations: 1,
            default_text_size: 4000,
        }
    }
}

/// Login credentials and target database.
#[derive(Clone, Eq, PartialEq)]
pub struct ConnectParams {
    pub username: String,
    pub password: String,
    /// Empty selects the engine's default database.
    pub database: String,
}

impl std::fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectParams")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

impl ConnectParams {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            database: database.into(),
        }
    }

    /// Parses a `user/password@database` connect string.
    ///
    /// `/` alone selects external authentication, a missing `/password`
    /// means an empty password and a missing `@database` the default
    /// database.
    pub fn parse(connect: &str) -> Self {
        let connect = connect.trim();
        if connect == "/" {
            return Self::new("/", "/", "");
        }
        let (credentials, database) = match connect.split_once('@') {
            Some((credentials, database)) => (credentials, database),
            None => (connect, ""),
        };
        let (username, password) = match credentials.split_once('/') {
            Some((username, password)) => (username, password),
            None => (credentials, ""),
        };
        Self::new(username, password, database)
    }

    /// Reads connection settings from the environment.
    ///
    /// Reads:
    /// - `SQLCALL_CONNECT`: a full `user/password@database` string, or
    /// - `SQLCALL_USER`, `SQLCALL_PASSWORD` and optional `SQLCALL_DATABASE`.
    ///
    /// Returns an error if neither form is present or the user is empty.
    pub fn from_env() -> std::result::Result<Self, String> {
        if let Ok(connect) = std::env::var("SQLCALL_CONNECT") {
            if connect.trim().is_empty() {
                return Err("SQLCALL_CONNECT is set but empty".to_owned());
            }
            return Ok(Self::parse(&connect));
        }
        let username = std::env::var("SQLCALL_USER")
            .map_err(|_| "missing SQLCALL_USER environment variable".to_owned())?;
        let password = std::env::var("SQLCALL_PASSWORD")
            .map_err(|_| "missing SQLCALL_PASSWORD environment variable".to_owned())?;
        let database = std::env::var("SQLCALL_DATABASE").unwrap_or_default();
        if username.trim().is_empty() {
            return Err("SQLCALL_USER is set but empty".to_owned());
        }
        Ok(Self::new(username, password, database))
    }
}

#[cfg(test)]
mod tests {
    use crate::{ConnectParams, StatementOptions};

    #[test]
    fn parse_full_connect_string() {
        let params = ConnectParams::parse("scott/tiger@orcl");
        assert_eq!(params, ConnectParams::new("scott", "tiger", "orcl"));
    }

    #[test]
    fn parse_without_password_or_database() {
        assert_eq!(ConnectParams::parse("scott"), ConnectParams::new("scott", "", ""));
        assert_eq!(
            ConnectParams::parse("scott@orcl"),
            ConnectParams::new("scott", "", "orcl")
        );
    }

    #[test]
    fn parse_external_auth() {
        assert_eq!(ConnectParams::parse("/"), ConnectParams::new("/", "/", ""));
    }

    #[test]
    fn debug_redacts_password() {
        let debug = format!("{:?}", ConnectParams::new("scott", "tiger", ""));
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("tiger"));
    }

    #[test]
    fn default_options() {
        let options = StatementOptions::default();
        assert_eq!(options.bind_label_prefix, "q");
        assert_eq!(options.mutation_iterations, 1);
        assert_eq!(options.date_format, "%Y/%m/%d %H:%M:%S");
    }
}
