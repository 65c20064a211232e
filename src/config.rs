use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

use crate::model::group::GroupLayout;

pub const DEFAULT_SESSION: &str = "S1";
pub const DEFAULT_LAYOUT: &str = "2:5";
pub const DEFAULT_INPUT: &str = "students_data_example.xlsx";
pub const DEFAULT_OUTPUT: &str = "students_group_assignments.xlsx";

/// Longest worksheet name a workbook accepts.
const MAX_SHEET_NAME: usize = 31;
const SHEET_NAME_FORBIDDEN: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Session name is empty")]
    EmptySession,
    #[error("Session `{session}` makes the sheet name `groups_{session}` longer than {max} characters")]
    SessionTooLong { session: String, max: usize },
    #[error("Session `{0}` contains a character not allowed in sheet names ([ ] : * ? / \\)")]
    InvalidSessionChar(String),
}

/// The session names the `groups_<session>` result sheet, so it has to be a
/// valid worksheet name.
pub fn validate_session(session: &str) -> Result<String, ConfigError> {
    if session.is_empty() {
        return Err(ConfigError::EmptySession);
    }
    if session.contains(SHEET_NAME_FORBIDDEN) || session.starts_with('\'') || session.ends_with('\'') {
        return Err(ConfigError::InvalidSessionChar(session.to_string()));
    }
    let max = MAX_SHEET_NAME - "groups_".len();
    if session.chars().count() > max {
        return Err(ConfigError::SessionTooLong { session: session.to_string(), max: MAX_SHEET_NAME });
    }
    Ok(session.to_string())
}

/// Assign the students present at a session to fixed-size groups, keeping
/// students who already met apart
#[derive(Parser, Debug, Clone)]
#[command(name = "group-rotation")]
#[command(about = "Assigns present students to groups while minimizing repeated pairings")]
pub struct Args {
    /// Session column of the attendance sheet to solve
    #[arg(long, default_value = DEFAULT_SESSION, value_parser = validate_session)]
    pub session: String,

    /// Groups to fill, as <size>:<count>[,<size>:<count>...]
    #[arg(long, default_value = DEFAULT_LAYOUT)]
    pub groups: GroupLayout,

    /// Workbook with the `attendance_list` and `historical_pairings` sheets
    #[arg(long, default_value = DEFAULT_INPUT)]
    pub input: PathBuf,

    /// Result workbook
    #[arg(long, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Text summary (defaults to results_<session>.txt)
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub session: String,
    pub layout: GroupLayout,
    pub input: PathBuf,
    pub output: PathBuf,
    pub summary: PathBuf,
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_session(&self.session).map(|_| ())
    }
}

impl From<Args> for RunConfig {
    fn from(args: Args) -> Self {
        let summary = args.summary
            .unwrap_or_else(|| PathBuf::from(format!("results_{}.txt", args.session)));
        RunConfig {
            session: args.session,
            layout: args.groups,
            input: args.input,
            output: args.output,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_example_workbook() {
        let config = RunConfig::from(Args::parse_from(["group-rotation"]));
        assert_eq!(config.session, "S1");
        assert_eq!(config.layout, GroupLayout::new(&[(2, 5)]).unwrap());
        assert_eq!(config.input, PathBuf::from(DEFAULT_INPUT));
        assert_eq!(config.output, PathBuf::from(DEFAULT_OUTPUT));
        assert_eq!(config.summary, PathBuf::from("results_S1.txt"));
    }

    #[test]
    fn flags_override_defaults() {
        let args = Args::parse_from([
            "group-rotation",
            "--session", "S3",
            "--groups", "3:2,2:1",
            "--summary", "out/summary.txt",
        ]);
        let config = RunConfig::from(args);
        assert_eq!(config.layout.capacity(), 8);
        assert_eq!(config.summary, PathBuf::from("out/summary.txt"));
    }

    #[test]
    fn session_must_make_a_valid_sheet_name() {
        assert_eq!(validate_session("S1"), Ok("S1".to_string()));
        assert_eq!(validate_session(&"x".repeat(24)), Ok("x".repeat(24)));
        assert!(matches!(validate_session(&"x".repeat(25)), Err(ConfigError::SessionTooLong { .. })));
        assert_eq!(validate_session("a/b"), Err(ConfigError::InvalidSessionChar("a/b".into())));
        assert_eq!(validate_session("week[1]"), Err(ConfigError::InvalidSessionChar("week[1]".into())));
        assert_eq!(validate_session("'S1"), Err(ConfigError::InvalidSessionChar("'S1".into())));
        assert_eq!(validate_session(""), Err(ConfigError::EmptySession));

        assert!(Args::try_parse_from(["group-rotation", "--session", "a:b"]).is_err());
        let config = RunConfig { session: "S?".into(), ..RunConfig::from(Args::parse_from(["group-rotation"])) };
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_layout_is_rejected() {
        assert!(Args::try_parse_from(["group-rotation", "--groups", "0:2"]).is_err());
        assert!(Args::try_parse_from(["group-rotation", "--groups", "two"]).is_err());
    }
}
