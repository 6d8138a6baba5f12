//! Token extraction, pricing, and human-readable formatting.

use serde_json::Value;

/// A session- or turn-level token/cost tuple.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub cost: f64,
}

impl Usage {
    pub fn new(input_tokens: u64, output_tokens: u64, cost: f64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            cost,
        }
    }

    pub fn combine(&self, other: &Usage) -> Usage {
        Usage {
            input_tokens: self.input_tokens + other.input_tokens,
            output_tokens: self.output_tokens + other.output_tokens,
            total_tokens: self.total_tokens + other.total_tokens,
            cost: self.cost + other.cost,
        }
    }
}

/// `Usage` plus whether the model was recognized in the pricing table —
/// an unknown model prices at 0 and its cost is never displayed.
#[derive(Debug, Clone, Copy)]
pub struct PricedUsage {
    pub usage: Usage,
    pub model_known: bool,
}

/// `(model identifier substring, input $/million tokens, output $/million tokens)`.
/// Matched by substring containment, first match in this declared order wins.
const PRICING_TABLE: &[(&str, f64, f64)] = &[
    ("claude-sonnet-4-5", 3.0, 15.0),
    ("claude-sonnet-4", 3.0, 15.0),
    ("claude-haiku-3-5", 0.80, 4.0),
    ("claude-opus-4", 15.0, 75.0),
    ("claude-opus", 15.0, 75.0),
    ("nova-pro", 0.80, 3.20),
    ("nova-lite", 0.06, 0.24),
    ("llama3-3-70b", 0.72, 0.72),
    ("llama-3.3-70b", 0.72, 0.72),
];

fn price_for_model(model: &str) -> Option<(f64, f64)> {
    let lower = model.to_lowercase();
    PRICING_TABLE
        .iter()
        .find(|(needle, _, _)| lower.contains(needle))
        .map(|(_, input, output)| (*input, *output))
}

/// Extracts raw token counters from a heterogeneous response shape.
///
/// Tries, in order: a `usage` object, top-level keyed counters, a `metrics`
/// object. Falls back to zeros if none match.
pub struct TokenAccountant;

impl TokenAccountant {
    fn counters_from(value: &Value) -> Option<(u64, u64, u64)> {
        let input = value.get("input_tokens")?.as_u64()?;
        let output = value.get("output_tokens").and_then(Value::as_u64).unwrap_or(0);
        let total = value
            .get("total_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(input + output);
        Some((input, output, total))
    }

    /// Extract `(input, output, total)` token counts from a raw response.
    pub fn extract(raw: &Value) -> (u64, u64, u64) {
        if let Some(usage) = raw.get("usage") {
            if let Some(counters) = Self::counters_from(usage) {
                return counters;
            }
        }
        if let Some(counters) = Self::counters_from(raw) {
            return counters;
        }
        if let Some(metrics) = raw.get("metrics") {
            if let Some(counters) = Self::counters_from(metrics) {
                return counters;
            }
        }
        (0, 0, 0)
    }

    /// Extract usage and price it against `model`, if known.
    pub fn price(raw: &Value, model: Option<&str>) -> PricedUsage {
        let (input, output, total) = Self::extract(raw);
        match model.and_then(price_for_model) {
            Some((input_price, output_price)) => {
                let cost = (input as f64 / 1_000_000.0) * input_price
                    + (output as f64 / 1_000_000.0) * output_price;
                PricedUsage {
                    usage: Usage {
                        input_tokens: input,
                        output_tokens: output,
                        total_tokens: total,
                        cost,
                    },
                    model_known: true,
                }
            }
            None => PricedUsage {
                usage: Usage {
                    input_tokens: input,
                    output_tokens: output,
                    total_tokens: total,
                    cost: 0.0,
                },
                model_known: false,
            },
        }
    }
}

/// Format a token count: `999`, `1.0K`, `999.9K`, `1.0M` — truncated (not
/// rounded) to one decimal so the 999,999 boundary never displays as the
/// misleading `1000.0K`.
pub fn format_tokens(n: u64) -> String {
    if n < 1_000 {
        n.to_string()
    } else if n < 1_000_000 {
        let truncated = ((n as f64 / 1000.0) * 10.0).floor() / 10.0;
        format!("{truncated:.1}K")
    } else {
        let truncated = ((n as f64 / 1_000_000.0) * 10.0).floor() / 10.0;
        format!("{truncated:.1}M")
    }
}

/// Per-turn cost display: suppressed when the model is unknown and the
/// computed cost is exactly zero.
pub fn format_cost_for_turn(priced: &PricedUsage) -> Option<String> {
    if !priced.model_known && priced.usage.cost == 0.0 {
        None
    } else {
        Some(format!("${:.4}", priced.usage.cost))
    }
}
