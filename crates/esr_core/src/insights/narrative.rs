use crate::insights::InsightInputs;
use crate::metrics::round0;

/// Decimal rendering used in report prose: whole values keep one decimal (`10.0`),
/// others print their shortest form (`33.3`).
pub fn display_decimal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// `1234567` -> `1,234,567`.
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// `$X.XXM` from one million up, otherwise comma-grouped whole dollars.
pub fn format_currency(amount: i64) -> String {
    if amount >= 1_000_000 {
        format!("${:.2}M", amount as f64 / 1_000_000.0)
    } else {
        format!("${}", group_thousands(amount))
    }
}

pub fn executive_summary_narrative(inputs: &InsightInputs) -> String {
    let mut text = format!(
        "Your security posture remained strong this reporting period. \
         CS SOC triaged {} alerts, partnering with your team on {} decisions and closing {} end-to-end. ",
        group_thousands(inputs.alerts_triaged),
        group_thousands(inputs.client_touch_decisions),
        group_thousands(inputs.closed_end_to_end),
    );

    if inputs.response_advantage_percent > 0.0 {
        text.push_str(&format!(
            "Response speed landed {}% faster than sector medians ({}-minute MTTR, {}-minute P90), ",
            round0(inputs.response_advantage_percent),
            inputs.mttr_minutes,
            inputs.p90_minutes,
        ));
    } else {
        text.push_str(&format!(
            "Response times averaged {}-minute MTTR ({}-minute P90), ",
            inputs.mttr_minutes, inputs.p90_minutes,
        ));
    }

    if inputs.after_hours_escalations > 0 {
        text.push_str(&format!(
            "while {} escalations were absorbed after hours without gaps in coverage. ",
            inputs.after_hours_escalations
        ));
    } else {
        text.push_str("with consistent coverage throughout the period. ");
    }

    text.push_str(&format!(
        "Of the {} incidents escalated, we identified {} true positive threats and contained each \
         before business impact, keeping false positives at {}%.",
        group_thousands(inputs.incidents_escalated),
        inputs.true_threats_contained,
        display_decimal(inputs.false_positive_rate.unwrap_or(0.0)),
    ));
    text
}
