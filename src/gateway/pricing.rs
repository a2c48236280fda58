//! Chat model pricing table.
//!
//! Costs are in nanodollars (1e-9 USD) per token. Prices follow the OpenRouter
//! model pages and need periodic re-checking.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelPricing {
    pub input_nanos_per_token: i64,
    pub output_nanos_per_token: i64,
}

impl ModelPricing {
    const fn new(input: i64, output: i64) -> Self {
        Self {
            input_nanos_per_token: input,
            output_nanos_per_token: output,
        }
    }

    pub fn calculate_cost(&self, input_tokens: u32, output_tokens: u32) -> i64 {
        (input_tokens as i64) * self.input_nanos_per_token
            + (output_tokens as i64) * self.output_nanos_per_token
    }
}

/// Used for models missing from the table.
pub const FALLBACK_PRICING: ModelPricing = ModelPricing::new(1_000, 5_000);

const PRICING: &[(&str, ModelPricing)] = &[
    // $0.15 / $0.60 per 1M
    ("openai/gpt-4o-mini", ModelPricing::new(150, 600)),
    // $2.50 / $10.00 per 1M
    ("openai/gpt-4o", ModelPricing::new(2_500, 10_000)),
    // $0.25 / $2.00 per 1M
    ("openai/gpt-5-mini", ModelPricing::new(250, 2_000)),
    // $0.80 / $4.00 per 1M
    ("anthropic/claude-3-5-haiku", ModelPricing::new(800, 4_000)),
    // $3.00 / $15.00 per 1M
    ("anthropic/claude-sonnet-4", ModelPricing::new(3_000, 15_000)),
    // $0.30 / $2.50 per 1M
    ("google/gemini-2.5-flash", ModelPricing::new(300, 2_500)),
];

/// Look up pricing, ignoring a trailing `-YYYY-MM-DD` / `-YYYYMMDD` snapshot suffix.
pub fn get_pricing(model_id: &str) -> Option<ModelPricing> {
    let base = strip_snapshot_suffix(model_id);
    PRICING
        .iter()
        .find(|(id, _)| *id == model_id || *id == base)
        .map(|(_, p)| *p)
}

pub fn chat_cost(model_id: &str, input_tokens: u32, output_tokens: u32) -> i64 {
    get_pricing(model_id)
        .unwrap_or(FALLBACK_PRICING)
        .calculate_cost(input_tokens, output_tokens)
}

fn strip_snapshot_suffix(model_id: &str) -> &str {
    let digits_only = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    // "-2024-07-18"
    if model_id.len() > 11 {
        let (head, tail) = model_id.split_at(model_id.len() - 11);
        let parts: Vec<&str> = tail.split('-').collect();
        if parts.len() == 4 && parts[0].is_empty() && parts[1..].iter().all(|p| digits_only(p)) {
            return head;
        }
    }
    // "-20241022"
    if let Some((head, tail)) = model_id.rsplit_once('-') {
        if tail.len() == 8 && digits_only(tail) {
            return head;
        }
    }
    model_id
}
