//! Inline button payloads
//!
//! Wire form is `kind:applicant` (`approve:42`). Payloads are decoded once at
//! the transport boundary; anything else is `None`.

use std::fmt;
use std::str::FromStr;

use super::types::ApplicantId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum CallbackKind {
    Approve,
    Reject,
    Reply,
    Pay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackCommand {
    pub kind: CallbackKind,
    pub applicant: ApplicantId,
}

impl CallbackCommand {
    pub fn new(kind: CallbackKind, applicant: ApplicantId) -> Self {
        Self { kind, applicant }
    }

    pub fn decode(data: &str) -> Option<Self> {
        data.parse().ok()
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Buttons only the administrator may press.
    pub fn is_admin_action(&self) -> bool {
        matches!(self.kind, CallbackKind::Approve | CallbackKind::Reject | CallbackKind::Reply)
    }
}

impl fmt::Display for CallbackCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.applicant)
    }
}

impl FromStr for CallbackCommand {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s.split_once(':').ok_or(())?;
        let kind = kind.parse::<CallbackKind>().map_err(|_| ())?;
        let applicant = id.parse::<ApplicantId>().map_err(|_| ())?;
        Ok(Self { kind, applicant })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        assert_eq!(
            CallbackCommand::new(CallbackKind::Approve, ApplicantId(42)).encode(),
            "approve:42"
        );
        assert_eq!(CallbackCommand::new(CallbackKind::Pay, ApplicantId(7)).encode(), "pay:7");
    }

    #[test]
    fn test_decode() {
        assert_eq!(
            CallbackCommand::decode("reject:42"),
            Some(CallbackCommand::new(CallbackKind::Reject, ApplicantId(42)))
        );
        assert_eq!(
            CallbackCommand::decode("reply:5").map(|c| c.is_admin_action()),
            Some(true)
        );
    }

    #[test]
    fn test_garbage_decodes_to_none() {
        for data in ["", "approve", "approve:", "approve:abc", "refund:1", "approve_42", "pay:1:2"] {
            assert_eq!(CallbackCommand::decode(data), None, "{data}");
        }
    }
}
