// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// What the reactor does with the rest of the build when a project fails.
///
/// - `FailFast`: stop scheduling anything new; projects already running
///   finish their current item and are then skipped.
/// - `FailAtEnd` (default): ban the failed project and everything downstream
///   of it; unrelated projects keep building.
/// - `FailNever`: record the failure and keep building, downstream included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReactorFailureBehaviour {
    FailFast,
    FailAtEnd,
    FailNever,
}

impl Default for ReactorFailureBehaviour {
    fn default() -> Self {
        ReactorFailureBehaviour::FailAtEnd
    }
}

impl FromStr for ReactorFailureBehaviour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "fail-fast" => Ok(ReactorFailureBehaviour::FailFast),
            "fail-at-end" => Ok(ReactorFailureBehaviour::FailAtEnd),
            "fail-never" => Ok(ReactorFailureBehaviour::FailNever),
            other => Err(format!(
                "invalid failure_behaviour: {other} (expected \"fail-fast\", \"fail-at-end\" or \"fail-never\")"
            )),
        }
    }
}

impl fmt::Display for ReactorFailureBehaviour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReactorFailureBehaviour::FailFast => "fail-fast",
            ReactorFailureBehaviour::FailAtEnd => "fail-at-end",
            ReactorFailureBehaviour::FailNever => "fail-never",
        };
        f.write_str(s)
    }
}
