/// Log tag definitions for the agent framework
///
/// Each tag maps to one area of the execution pipeline so that
/// per-area debug output can be toggled with --debug-<tag> flags.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTag {
    Coordinator,
    Lookup,
    Analysis,
    Builder,
    Transaction,
    Cache,
    Api,
    Worker,
    System,
}

impl LogTag {
    /// Display name used in the console prefix column
    pub fn as_str(&self) -> &'static str {
        match self {
            LogTag::Coordinator => "COORD",
            LogTag::Lookup => "LOOKUP",
            LogTag::Analysis => "ANALYSIS",
            LogTag::Builder => "BUILDER",
            LogTag::Transaction => "TX",
            LogTag::Cache => "CACHE",
            LogTag::Api => "API",
            LogTag::Worker => "WORKER",
            LogTag::System => "SYSTEM",
        }
    }

    /// Key used to match --debug-<key> command line flags
    pub fn to_debug_key(&self) -> &'static str {
        match self {
            LogTag::Coordinator => "coordinator",
            LogTag::Lookup => "lookup",
            LogTag::Analysis => "analysis",
            LogTag::Builder => "builder",
            LogTag::Transaction => "transaction",
            LogTag::Cache => "cache",
            LogTag::Api => "api",
            LogTag::Worker => "worker",
            LogTag::System => "system",
        }
    }

    /// All tags, used when scanning command line arguments at init
    pub fn all() -> &'static [LogTag] {
        &[
            LogTag::Coordinator,
            LogTag::Lookup,
            LogTag::Analysis,
            LogTag::Builder,
            LogTag::Transaction,
            LogTag::Cache,
            LogTag::Api,
            LogTag::Worker,
            LogTag::System,
        ]
    }
}

impl std::fmt::Display for LogTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
