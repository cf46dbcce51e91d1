use crate::domain::Priority;

// First matching rule wins. Numeric prefixes follow the "N - LABEL" export convention.
const PRIORITY_RULES: &[(Priority, &[&str])] = &[
    (Priority::Critical, &["CRITICAL", "1 -"]),
    (Priority::High, &["HIGH", "2 -", "3 -"]),
    (Priority::Medium, &["MEDIUM", "4 -", "5 -"]),
    (Priority::Low, &["LOW", "6 -", "7 -"]),
    (Priority::Informational, &["INFO", "8 -"]),
];

const VENDOR_SEVERITY_RULES: &[(Priority, &[&str])] = &[
    (Priority::Critical, &["CRITICAL"]),
    (Priority::High, &["HIGH"]),
    (Priority::Medium, &["MED"]),
    (Priority::Low, &["LOW"]),
    (Priority::Informational, &["INFO"]),
];

fn match_rules(raw: Option<&str>, rules: &[(Priority, &[&str])]) -> Option<Priority> {
    let upper = raw?.trim().to_uppercase();
    if upper.is_empty() {
        return None;
    }
    rules
        .iter()
        .find(|(_, needles)| needles.iter().any(|n| upper.contains(n)))
        .map(|(p, _)| *p)
}

/// Normalize a CS priority string such as `"3 - HIGH"` or `"Critical"`.
///
/// Unrecognized values are `None` and must be left out of priority-keyed aggregates.
pub fn parse_priority_level(raw: Option<&str>) -> Option<Priority> {
    match_rules(raw, PRIORITY_RULES)
}

/// Normalize a vendor-reported severity. Labels only; vendors do not use numeric prefixes.
pub fn parse_vendor_severity(raw: Option<&str>) -> Option<Priority> {
    match_rules(raw, VENDOR_SEVERITY_RULES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_labels_and_numeric_prefixes() {
        for (raw, want) in [
            ("Critical", Priority::Critical),
            ("CRITICAL", Priority::Critical),
            ("1 - CRITICAL", Priority::Critical),
            ("1 - Urgent", Priority::Critical),
            ("High", Priority::High),
            ("2 - HIGH", Priority::High),
            ("3 - HIGH", Priority::High),
            ("medium", Priority::Medium),
            ("4 - MEDIUM", Priority::Medium),
            ("5 - MEDIUM", Priority::Medium),
            ("Low", Priority::Low),
            ("6 - LOW", Priority::Low),
            ("7 - LOW", Priority::Low),
            ("Info", Priority::Informational),
            ("8 - INFORMATIONAL", Priority::Informational),
        ] {
            assert_eq!(parse_priority_level(Some(raw)), Some(want), "input {raw:?}");
        }
    }

    #[test]
    fn unknown_priorities_are_absent() {
        assert_eq!(parse_priority_level(None), None);
        assert_eq!(parse_priority_level(Some("")), None);
        assert_eq!(parse_priority_level(Some("Unknown")), None);
        assert_eq!(parse_priority_level(Some("Random")), None);
    }

    #[test]
    fn vendor_severity_labels() {
        assert_eq!(parse_vendor_severity(Some("Critical")), Some(Priority::Critical));
        assert_eq!(parse_vendor_severity(Some("high")), Some(Priority::High));
        assert_eq!(parse_vendor_severity(Some("Med")), Some(Priority::Medium));
        assert_eq!(parse_vendor_severity(Some("Medium")), Some(Priority::Medium));
        assert_eq!(parse_vendor_severity(Some("Low")), Some(Priority::Low));
        assert_eq!(
            parse_vendor_severity(Some("Informational")),
            Some(Priority::Informational)
        );
        assert_eq!(parse_vendor_severity(Some("3 - HIGH")), Some(Priority::High));
        assert_eq!(parse_vendor_severity(Some("1 -")), None);
        assert_eq!(parse_vendor_severity(None), None);
    }
}
