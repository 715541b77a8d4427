/// Log tags identifying the subsystem a message originates from
///
/// Each tag maps to a `--debug-<tag>` command-line flag so diagnostic output
/// can be enabled per subsystem without drowning the console.

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogTag {
    Auth,
    Api,
    Topics,
    Files,
    Jobs,
    Poll,
    Ui,
    Config,
    System,
    Test,
    Other(String),
}

impl LogTag {
    /// Key used for `--debug-<key>` / `--verbose-<key>` flag matching
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::Auth => "auth".to_string(),
            LogTag::Api => "api".to_string(),
            LogTag::Topics => "topics".to_string(),
            LogTag::Files => "files".to_string(),
            LogTag::Jobs => "jobs".to_string(),
            LogTag::Poll => "poll".to_string(),
            LogTag::Ui => "ui".to_string(),
            LogTag::Config => "config".to_string(),
            LogTag::System => "system".to_string(),
            LogTag::Test => "test".to_string(),
            LogTag::Other(name) => name.to_lowercase(),
        }
    }

    /// Uncolored tag text for file output
    pub fn to_plain_string(&self) -> String {
        match self {
            LogTag::Auth => "AUTH".to_string(),
            LogTag::Api => "API".to_string(),
            LogTag::Topics => "TOPICS".to_string(),
            LogTag::Files => "FILES".to_string(),
            LogTag::Jobs => "JOBS".to_string(),
            LogTag::Poll => "POLL".to_string(),
            LogTag::Ui => "UI".to_string(),
            LogTag::Config => "CONFIG".to_string(),
            LogTag::System => "SYSTEM".to_string(),
            LogTag::Test => "TEST".to_string(),
            LogTag::Other(name) => name.to_uppercase(),
        }
    }
}

impl std::fmt::Display for LogTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_plain_string())
    }
}
