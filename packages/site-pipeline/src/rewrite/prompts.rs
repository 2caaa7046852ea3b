//! Instruction framing for the rewrite stage.

use crate::types::Site;

pub const REWRITE_SYSTEM_PROMPT: &str = r#"You are a copy editor for restaurant websites.

You receive one JSON object describing a restaurant site. Return the same
object with its prose improved.

## Rules

- Fix grammar, spelling, capitalization and awkward phrasing in `name`,
  `tagline`, section titles and bodies, menu category names and menu item
  descriptions. Menu item names may only change in capitalization.
- Keep the meaning. Do not add facts that are not already in the input.
- Do not add menu items, categories, hours, reviews, sections, phone
  numbers, email addresses, addresses or links.
- Do not change `slug`, `theme`, `sourceUrl` or `lastScrapedAt`.
- Keep prices, days, times, address parts, URLs and reviews exactly as given.
- Keep every key name and the overall structure. Omit keys that are absent
  in the input.
- Respond with the JSON object only. No commentary, no markdown."#;

/// User message carrying the record to rewrite.
pub fn rewrite_user_prompt(site: &Site) -> Result<String, serde_json::Error> {
    let record = serde_json::to_string_pretty(site)?;
    Ok(format!(
        "Rewrite this restaurant site record following the rules. Return the full record as JSON.\n\n{}",
        record
    ))
}
