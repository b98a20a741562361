//! Slash-command definitions.

use mintgate_market::TokenLabel;
use serde_json::{json, Value};

pub const VERIFY: &str = "verify";
pub const PRICE: &str = "price";
pub const ADDRESS_OPTION: &str = "address";

const STRING_OPTION: u8 = 3;
const CHAT_INPUT: u8 = 1;

/// Body for a bulk command overwrite.
pub fn command_definitions(label: &TokenLabel) -> Value {
    json!([
        {
            "name": VERIFY,
            "type": CHAT_INPUT,
            "description": "Verify that your wallet holds an eligible NFT",
            "dm_permission": true,
            "options": [{
                "type": STRING_OPTION,
                "name": ADDRESS_OPTION,
                "description": "Your Solana wallet address",
                "required": true
            }]
        },
        {
            "name": PRICE,
            "type": CHAT_INPUT,
            "description": format!("{} token price", label.symbol)
        }
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_requires_address() {
        let defs = command_definitions(&TokenLabel::default());
        let verify = &defs[0];
        assert_eq!(verify["name"], VERIFY);
        assert_eq!(verify["options"][0]["name"], ADDRESS_OPTION);
        assert_eq!(verify["options"][0]["required"], true);
        assert_eq!(defs[1]["description"], "LIKE token price");
    }
}
