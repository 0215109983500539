//! Provider-reported call classifications.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};

/// Call status as reported by the telephony provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallStatus {
    Queued,
    Initiated,
    Ringing,
    InProgress,
    Completed,
    Busy,
    Failed,
    NoAnswer,
    Canceled,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Queued => "queued",
            CallStatus::Initiated => "initiated",
            CallStatus::Ringing => "ringing",
            CallStatus::InProgress => "in-progress",
            CallStatus::Completed => "completed",
            CallStatus::Busy => "busy",
            CallStatus::Failed => "failed",
            CallStatus::NoAnswer => "no-answer",
            CallStatus::Canceled => "canceled",
        }
    }

    /// Busy, failed and no-answer: the callee never picked up.
    pub fn is_no_answer(&self) -> bool {
        matches!(
            self,
            CallStatus::Busy | CallStatus::Failed | CallStatus::NoAnswer
        )
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            CallStatus::Queued | CallStatus::Initiated | CallStatus::Ringing | CallStatus::InProgress
        )
    }
}

impl StateMachine for CallStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use CallStatus::*;
        match self {
            Queued => vec![Initiated, Ringing, InProgress, Busy, Failed, NoAnswer, Canceled],
            Initiated => vec![Ringing, InProgress, Busy, Failed, NoAnswer, Canceled],
            Ringing => vec![InProgress, Busy, Failed, NoAnswer, Canceled],
            InProgress => vec![Completed, Failed],
            Completed | Busy | Failed | NoAnswer | Canceled => vec![],
        }
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(CallStatus::Queued),
            "initiated" => Ok(CallStatus::Initiated),
            "ringing" => Ok(CallStatus::Ringing),
            "in-progress" => Ok(CallStatus::InProgress),
            "completed" => Ok(CallStatus::Completed),
            "busy" => Ok(CallStatus::Busy),
            "failed" => Ok(CallStatus::Failed),
            "no-answer" => Ok(CallStatus::NoAnswer),
            "canceled" => Ok(CallStatus::Canceled),
            other => Err(ValidationError::invalid_format(
                "CallStatus",
                format!("unknown call status '{}'", other),
            )),
        }
    }
}

/// Which side started the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    /// Parses the provider value. `outbound-api` and `outbound-dial` are outbound;
    /// anything else, including a missing value, is inbound.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.starts_with("outbound") => Direction::Outbound,
            _ => Direction::Inbound,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answering machine detection result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnsweredBy {
    Human,
    MachineStart,
    MachineEndBeep,
    MachineEndSilence,
    MachineEndOther,
    Fax,
    Unknown,
}

impl AnsweredBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnsweredBy::Human => "human",
            AnsweredBy::MachineStart => "machine_start",
            AnsweredBy::MachineEndBeep => "machine_end_beep",
            AnsweredBy::MachineEndSilence => "machine_end_silence",
            AnsweredBy::MachineEndOther => "machine_end_other",
            AnsweredBy::Fax => "fax",
            AnsweredBy::Unknown => "unknown",
        }
    }

    /// Unrecognized values map to `Unknown`.
    pub fn from_param(value: &str) -> Self {
        match value {
            "human" => AnsweredBy::Human,
            "machine_start" => AnsweredBy::MachineStart,
            "machine_end_beep" => AnsweredBy::MachineEndBeep,
            "machine_end_silence" => AnsweredBy::MachineEndSilence,
            "machine_end_other" => AnsweredBy::MachineEndOther,
            "fax" => AnsweredBy::Fax,
            _ => AnsweredBy::Unknown,
        }
    }
}

impl fmt::Display for AnsweredBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [CallStatus; 9] = [
        CallStatus::Queued,
        CallStatus::Initiated,
        CallStatus::Ringing,
        CallStatus::InProgress,
        CallStatus::Completed,
        CallStatus::Busy,
        CallStatus::Failed,
        CallStatus::NoAnswer,
        CallStatus::Canceled,
    ];

    #[test]
    fn status_round_trips_through_provider_strings() {
        for status in ALL {
            assert_eq!(status.as_str().parse::<CallStatus>().unwrap(), status);
        }
        assert!("answered".parse::<CallStatus>().is_err());
    }

    #[test]
    fn terminal_statuses_have_no_transitions() {
        for status in ALL {
            assert_eq!(status.is_terminal(), !status.is_in_progress());
        }
    }

    #[test]
    fn ringing_can_complete_only_through_in_progress() {
        assert!(!CallStatus::Ringing.can_transition_to(&CallStatus::Completed));
        assert!(CallStatus::InProgress.can_transition_to(&CallStatus::Completed));
    }

    #[test]
    fn no_answer_statuses() {
        assert!(CallStatus::Busy.is_no_answer());
        assert!(CallStatus::Failed.is_no_answer());
        assert!(CallStatus::NoAnswer.is_no_answer());
        assert!(!CallStatus::Completed.is_no_answer());
    }

    #[test]
    fn direction_from_provider_values() {
        assert_eq!(Direction::from_param(Some("outbound-api")), Direction::Outbound);
        assert_eq!(Direction::from_param(Some("outbound-dial")), Direction::Outbound);
        assert_eq!(Direction::from_param(Some("inbound")), Direction::Inbound);
        assert_eq!(Direction::from_param(None), Direction::Inbound);
    }

    #[test]
    fn answered_by_parses_known_and_unknown_values() {
        assert_eq!(AnsweredBy::from_param("machine_start"), AnsweredBy::MachineStart);
        assert_eq!(AnsweredBy::from_param("human"), AnsweredBy::Human);
        assert_eq!(AnsweredBy::from_param("robot"), AnsweredBy::Unknown);
        assert_eq!(
            serde_json::to_string(&AnsweredBy::MachineEndBeep).unwrap(),
            "\"machine_end_beep\""
        );
    }
}
