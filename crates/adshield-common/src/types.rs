use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Notification severity, ordered from lowest to highest.
///
/// # Examples
///
/// ```
/// use adshield_common::types::Severity;
///
/// let sev: Severity = "WARN".parse().unwrap();
/// assert_eq!(sev, Severity::Warn);
/// assert_eq!(sev.to_string(), "WARN");
/// assert!(Severity::Crit > Severity::Ok);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Ok,
    Warn,
    Crit,
}

impl Severity {
    /// Total, lossy parse used at external boundaries (CSV feeds, historical
    /// JSON payloads). Recognizes the canonical vocabulary plus the legacy
    /// feed vocabulary (`good`/`info`/`warning`/`critical`); anything
    /// unrecognized is coerced to the lowest rank so one bad row can never
    /// block a whole batch.
    ///
    /// # Examples
    ///
    /// ```
    /// use adshield_common::types::Severity;
    ///
    /// assert_eq!(Severity::normalize("good"), Severity::Ok);
    /// assert_eq!(Severity::normalize("warning"), Severity::Warn);
    /// assert_eq!(Severity::normalize("???"), Severity::Ok);
    /// ```
    pub fn normalize(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "crit" | "critical" => Severity::Crit,
            "warn" | "warning" => Severity::Warn,
            // Legacy feed vocabulary: "good" and "info" both rank lowest.
            "ok" | "good" | "info" => Severity::Ok,
            _ => Severity::Ok,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Ok => write!(f, "OK"),
            Severity::Warn => write!(f, "WARN"),
            Severity::Crit => write!(f, "CRIT"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "OK" => Ok(Severity::Ok),
            "WARN" => Ok(Severity::Warn),
            "CRIT" => Ok(Severity::Crit),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// A single alert produced by a feed scan. Transient: consumed by one
/// notification cycle, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertItem {
    pub id: String,
    pub text: String,
    pub severity: Severity,
    /// Brand tag used for per-brand webhook routing, when the feed carries one.
    pub brand: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Keep only items at or above the company's minimum severity.
pub fn filter_by_min_severity(items: Vec<AlertItem>, min: Severity) -> Vec<AlertItem> {
    items.into_iter().filter(|i| i.severity >= min).collect()
}

/// True when no item in the batch is critical. Quiet hours may only suppress
/// such batches; a CRIT item always goes out.
pub fn only_non_critical(items: &[AlertItem]) -> bool {
    items.iter().all(|i| i.severity != Severity::Crit)
}

/// One line of a rendered digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestItem {
    pub brand: Option<String>,
    pub severity: Severity,
    pub title: String,
    pub detail: Option<String>,
    pub link: Option<String>,
}

/// Counts by severity shown in the digest header line.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub ok: u32,
    pub warn: u32,
    pub crit: u32,
}

/// Assembled digest content, rendered to Slack blocks or email HTML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestPayload {
    pub date: DateTime<Utc>,
    pub summary: SeverityCounts,
    pub items: Vec<DigestItem>,
    /// e.g. "Feed CSV, updated 08:45"
    pub source_note: Option<String>,
}

impl DigestPayload {
    /// Build a digest from surviving alert items, tallying the header counts.
    pub fn from_alerts(date: DateTime<Utc>, items: &[AlertItem], source_note: Option<String>) -> Self {
        let mut summary = SeverityCounts::default();
        let digest_items = items
            .iter()
            .map(|a| {
                match a.severity {
                    Severity::Ok => summary.ok += 1,
                    Severity::Warn => summary.warn += 1,
                    Severity::Crit => summary.crit += 1,
                }
                DigestItem {
                    brand: a.brand.clone(),
                    severity: a.severity,
                    title: a.text.clone(),
                    detail: None,
                    link: None,
                }
            })
            .collect();
        Self {
            date,
            summary,
            items: digest_items,
            source_note,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, severity: Severity) -> AlertItem {
        AlertItem {
            id: id.to_string(),
            text: format!("alert {id}"),
            severity,
            brand: None,
            updated_at: None,
        }
    }

    #[test]
    fn severity_order_is_total() {
        assert!(Severity::Ok < Severity::Warn);
        assert!(Severity::Warn < Severity::Crit);
        assert!(Severity::Ok < Severity::Crit);
        for s in [Severity::Ok, Severity::Warn, Severity::Crit] {
            assert_eq!(s.cmp(&s), std::cmp::Ordering::Equal);
        }
    }

    #[test]
    fn strict_parse_rejects_unknown_values() {
        assert!("OK".parse::<Severity>().is_ok());
        assert!("crit".parse::<Severity>().is_ok());
        assert!("fatal".parse::<Severity>().is_err());
        assert!("".parse::<Severity>().is_err());
    }

    #[test]
    fn normalize_maps_legacy_vocabulary() {
        assert_eq!(Severity::normalize("good"), Severity::Ok);
        assert_eq!(Severity::normalize("info"), Severity::Ok);
        assert_eq!(Severity::normalize("warn"), Severity::Warn);
        assert_eq!(Severity::normalize("WARNING"), Severity::Warn);
        assert_eq!(Severity::normalize("critical"), Severity::Crit);
    }

    #[test]
    fn normalize_never_fails_on_garbage() {
        for junk in ["", "   ", "12", "sev=high", "CRITICAL!!"] {
            assert_eq!(Severity::normalize(junk), Severity::Ok);
        }
    }

    #[test]
    fn min_severity_filter_keeps_at_or_above() {
        let items = vec![
            item("a", Severity::Ok),
            item("b", Severity::Warn),
            item("c", Severity::Crit),
        ];
        let kept = filter_by_min_severity(items, Severity::Warn);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|i| i.severity >= Severity::Warn));
    }

    #[test]
    fn only_non_critical_detects_crit() {
        let calm = vec![item("a", Severity::Ok), item("b", Severity::Warn)];
        assert!(only_non_critical(&calm));

        let hot = vec![item("a", Severity::Warn), item("b", Severity::Crit)];
        assert!(!only_non_critical(&hot));

        assert!(only_non_critical(&[]));
    }

    #[test]
    fn digest_payload_tallies_summary() {
        let items = vec![
            item("a", Severity::Ok),
            item("b", Severity::Warn),
            item("c", Severity::Warn),
            item("d", Severity::Crit),
        ];
        let payload = DigestPayload::from_alerts(Utc::now(), &items, None);
        assert_eq!(payload.summary.ok, 1);
        assert_eq!(payload.summary.warn, 2);
        assert_eq!(payload.summary.crit, 1);
        assert_eq!(payload.items.len(), 4);
    }
}
