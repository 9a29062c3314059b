//! Newline-delimited JSON events that operators and deploy tooling read.

use std::io::{self, Write};

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event")]
pub enum BootstrapEvent {
    #[serde(rename = "bootstrap.role.completed")]
    Completed {
        pass: u32,
        target_role: String,
        template_db: String,
        set_template_owner: bool,
    },
    #[serde(rename = "bootstrap.role.template_missing")]
    TemplateMissing {
        pass: u32,
        target_role: String,
        template_db: String,
        message: String,
    },
    #[serde(rename = "bootstrap.role.verified")]
    Verified { passes: u32, target_role: String },
    #[serde(rename = "bootstrap.role.failed")]
    Failed { message: String },
}

impl BootstrapEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "bootstrap.role.completed",
            Self::TemplateMissing { .. } => "bootstrap.role.template_missing",
            Self::Verified { .. } => "bootstrap.role.verified",
            Self::Failed { .. } => "bootstrap.role.failed",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        let line = self.to_json_line().map_err(io::Error::other)?;
        writeln!(writer, "{line}")?;
        writer.flush()
    }

    /// Failures go to stderr, everything else to stdout.
    pub fn emit(&self) -> io::Result<()> {
        if self.is_failure() {
            self.write_to(io::stderr().lock())
        } else {
            self.write_to(io::stdout().lock())
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    #[test]
    fn test_completed_event_shape() {
        let event = BootstrapEvent::Completed {
            pass: 1,
            target_role: "medusa".to_string(),
            template_db: "template_medusa".to_string(),
            set_template_owner: true,
        };
        let value: Value = serde_json::from_str(&event.to_json_line().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "bootstrap.role.completed",
                "pass": 1,
                "target_role": "medusa",
                "template_db": "template_medusa",
                "set_template_owner": true,
            })
        );
    }

    #[test]
    fn test_failed_event_shape() {
        let event = BootstrapEvent::Failed {
            message: "template database \"template_medusa\" does not exist".to_string(),
        };
        assert!(event.is_failure());
        let value: Value = serde_json::from_str(&event.to_json_line().unwrap()).unwrap();
        assert_eq!(value["event"], "bootstrap.role.failed");
        assert_eq!(
            value["message"],
            "template database \"template_medusa\" does not exist"
        );
    }

    #[test]
    fn test_write_to_emits_one_line() {
        let mut buf = Vec::new();
        let event = BootstrapEvent::Verified {
            passes: 2,
            target_role: "medusa".to_string(),
        };
        event.write_to(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.ends_with('\n'));
        assert!(text.contains(event.name()));
    }
}
