//! Inbound update messages (JSON).
//!
//! One JSON object per message, tagged by `type`:
//!
//! ```json
//! {"type":"command","fire_enable":true,"speed":16,"rate_hz":10.0}
//! {"type":"config","push_angle":0.785,"qd_16":16.0}
//! {"type":"block","block_effort":0.5,"block_duration":0.1}
//! ```
//!
//! A command script is the same format with an extra `at_ms` field giving
//! the delivery time relative to start; blank lines and `#` comments are
//! skipped.
use serde::Deserialize;

use crate::{BlockCfg, DynamicCfg};

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct CommandMsg {
    #[serde(default)]
    pub fire_enable: bool,
    /// Requested muzzle speed level (10, 15, 16, 18 or 30).
    pub speed: u8,
    #[serde(default)]
    pub rate_hz: f64,
    #[serde(default)]
    pub magazine_open: bool,
    #[serde(default)]
    pub stop: bool,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    Config(DynamicCfg),
    Block(BlockCfg),
    Command(CommandMsg),
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct ScriptEntry {
    pub at_ms: u64,
    #[serde(flatten)]
    pub message: Message,
}

pub fn parse_message(line: &str) -> eyre::Result<Message> {
    serde_json::from_str(line).map_err(|e| eyre::eyre!("invalid message: {e}"))
}

/// Parse a command script, returning entries sorted by delivery time.
pub fn parse_script(text: &str) -> eyre::Result<Vec<ScriptEntry>> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let entry: ScriptEntry = serde_json::from_str(line)
            .map_err(|e| eyre::eyre!("invalid script line {}: {}", idx + 1, e))?;
        out.push(entry);
    }
    // Stable: entries with equal times keep file order.
    out.sort_by_key(|e| e.at_ms);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_defaults_missing_flags() {
        let m = parse_message(r#"{"type":"command","speed":16}"#).expect("parse");
        assert_eq!(
            m,
            Message::Command(CommandMsg {
                fire_enable: false,
                speed: 16,
                rate_hz: 0.0,
                magazine_open: false,
                stop: false,
            })
        );
    }

    #[test]
    fn config_message_fills_unset_fields_with_zero() {
        let m = parse_message(r#"{"type":"config","qd_16":16.0}"#).expect("parse");
        match m {
            Message::Config(c) => {
                assert_eq!(c.qd_16, 16.0);
                assert_eq!(c.push_angle, 0.0);
            }
            other => panic!("expected config, got {other:?}"),
        }
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(parse_message(r#"{"type":"launch"}"#).is_err());
    }

    #[test]
    fn script_is_sorted_and_skips_comments() {
        let text = r#"
# spin up
{"at_ms": 50, "type": "command", "speed": 16, "fire_enable": true, "rate_hz": 5}
{"at_ms": 0, "type": "config", "qd_16": 16.0, "push_angle": 0.5}

{"at_ms": 0, "type": "block", "block_effort": 0.5}
"#;
        let entries = parse_script(text).expect("parse");
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].at_ms, 0);
        assert!(matches!(entries[0].message, Message::Config(_)));
        assert!(matches!(entries[1].message, Message::Block(_)));
        assert_eq!(entries[2].at_ms, 50);
    }

    #[test]
    fn script_error_names_line() {
        let err = parse_script("{\"at_ms\": 0, \"type\": \"command\"}").expect_err("no speed");
        assert!(err.to_string().contains("line 1"));
    }
}
