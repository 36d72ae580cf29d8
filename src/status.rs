use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    #[default]
    Ok,
    Warning,
    Critical,
}

impl Severity {
    pub fn exit_code(self) -> i32 {
        match self {
            Severity::Ok => 0,
            Severity::Warning => 1,
            Severity::Critical => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Ok => "OK",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
}

impl Finding {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn critical(message: impl Into<String>) -> Self {
        Self::new(Severity::Critical, message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AggregateResult {
    pub severity: Severity,
    pub messages: Vec<String>,
}

impl AggregateResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fold(mut self, finding: Finding) -> Self {
        self.severity = self.severity.max(finding.severity);
        self.messages.push(finding.message);
        self
    }

    pub fn fold_all(self, findings: impl IntoIterator<Item = Finding>) -> Self {
        findings.into_iter().fold(self, Self::fold)
    }

    pub fn is_ok(&self) -> bool {
        self.severity == Severity::Ok
    }
}

impl FromIterator<Finding> for AggregateResult {
    fn from_iter<I: IntoIterator<Item = Finding>>(iter: I) -> Self {
        Self::new().fold_all(iter)
    }
}
