//! Default response decoder.

use crate::recognition::{Intent, ResponseDecoder};

pub const UNDERSTOOD_RESPONSE: &str = "Command received and understood!";
pub const APOLOGY_RESPONSE: &str = "Sorry, I did not understand that.";

/// Acknowledges understood commands and apologizes for everything else.
///
/// This is the bridge to home-automation actions; swapping the recognizer's
/// model only requires a different decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntentDecoder;

impl ResponseDecoder for IntentDecoder {
    fn decode(&self, result: Option<&Intent>) -> String {
        match result {
            Some(found) => {
                tracing::info!(intent = %found.intent, slots = ?found.slots, "Intent recognized");
                UNDERSTOOD_RESPONSE.to_string()
            }
            None => {
                tracing::info!("Utterance not understood");
                APOLOGY_RESPONSE.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn decodes_both_outcomes() {
        let intent = Intent {
            intent: "changeLightState".into(),
            slots: BTreeMap::from([("state".to_string(), "on".to_string())]),
        };
        assert_eq!(IntentDecoder.decode(Some(&intent)), UNDERSTOOD_RESPONSE);
        assert_eq!(IntentDecoder.decode(None), APOLOGY_RESPONSE);
    }
}
