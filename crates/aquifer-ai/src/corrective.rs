//! Corrective structured re-parse via the completion service.
//!
//! The model is asked for a JSON object; the reply is parsed leniently
//! (code fences, surrounding prose, partially wrong fields). A field that
//! cannot be read is dropped rather than failing the whole guess.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use aquifer_core::{Category, Intent, Place, YearRange};

use crate::{Completion, CompletionError};

const SYSTEM: &str = "You convert questions about Indian groundwater assessment data into JSON. \
Reply with a single JSON object and nothing else.";

/// Fields the model proposed. Only `place` and `years` are ever applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorrectiveGuess {
    pub intent: Option<Intent>,
    pub years: Option<YearRange>,
    pub place: Option<Place>,
    pub category: Option<Category>,
}

/// Build the user prompt. `states` lists the state names the store knows.
pub fn corrective_prompt(question: &str, states: &[&str]) -> String {
    format!(
        "Question: {question}\n\n\
         Known states: {}\n\n\
         Return JSON with keys:\n\
         \"intent\": one of LIST, DATA, TREND, COMPARE\n\
         \"years\": {{\"y1\": YYYY, \"y2\": YYYY}} or null\n\
         \"place\": {{\"level\": \"state\", \"state\": ...}} or \
         {{\"level\": \"district\", \"state\": ..., \"district\": ...}} or \
         {{\"level\": \"national\"}}, correcting misspelt names\n\
         \"category\": one of Safe, Semi-Critical, Critical, Over-Exploited, or null",
        states.join(", ")
    )
}

/// Ask the service for a guess and parse it.
pub async fn corrective_parse(
    completion: &dyn Completion,
    question: &str,
    states: &[&str],
) -> Result<CorrectiveGuess, CompletionError> {
    let reply = completion
        .complete(SYSTEM, &corrective_prompt(question, states))
        .await?;
    let guess = parse_guess(&reply)?;
    debug!(?guess, "corrective guess");
    Ok(guess)
}

/// Parse a model reply into a guess.
pub fn parse_guess(reply: &str) -> Result<CorrectiveGuess, CompletionError> {
    let object = extract_object(reply)
        .ok_or_else(|| CompletionError::Malformed("no JSON object in reply".into()))?;
    let value: Value = serde_json::from_str(object)?;
    let Value::Object(map) = value else {
        return Err(CompletionError::Malformed("reply is not an object".into()));
    };

    let intent = map
        .get("intent")
        .and_then(Value::as_str)
        .and_then(|s| serde_json::from_value(Value::String(s.to_uppercase())).ok());
    let years = map.get("years").and_then(parse_years);
    let place = map.get("place").and_then(parse_place);
    let category = map
        .get("category")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<Category>().ok());

    if intent.is_none() && years.is_none() && place.is_none() && category.is_none() {
        warn!("corrective reply carried no usable fields");
    }
    Ok(CorrectiveGuess {
        intent,
        years,
        place,
        category,
    })
}

/// The outermost `{...}` span, ignoring fences and surrounding prose.
fn extract_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

fn parse_years(value: &Value) -> Option<YearRange> {
    let year = |v: Option<&Value>| -> Option<i32> {
        let v = v?;
        v.as_i64()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
            .and_then(|n| i32::try_from(n).ok())
    };
    let y1 = year(value.get("y1"));
    let y2 = year(value.get("y2"));
    match (y1, y2) {
        (Some(a), Some(b)) => Some(YearRange::new(a, b)),
        (Some(a), None) | (None, Some(a)) => Some(YearRange::single(a)),
        (None, None) => None,
    }
}

fn parse_place(value: &Value) -> Option<Place> {
    let text = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let level = text("level").map(|l| l.to_lowercase());
    let state = text("state");
    let district = text("district");
    match (level.as_deref(), state, district) {
        (Some("national"), _, _) => Some(Place::National),
        (_, Some(state), Some(district)) => Some(Place::district(state, district)),
        (_, Some(state), None) => Some(Place::state(state)),
        _ => None,
    }
}
