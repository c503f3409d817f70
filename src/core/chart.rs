use serde::{Deserialize, Serialize};

use crate::core::{ComplianceStatus, HostSummary, Outcome, RawRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SliceColor {
    Positive,
    Negative,
    Neutral,
}

impl SliceColor {
    pub fn for_status(status: ComplianceStatus) -> Self {
        match status {
            ComplianceStatus::Comply => SliceColor::Positive,
            ComplianceStatus::NotComply => SliceColor::Negative,
        }
    }

    pub fn for_outcome(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Pass => SliceColor::Positive,
            Outcome::Fail => SliceColor::Negative,
            Outcome::Other => SliceColor::Neutral,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slice {
    pub label: String,
    pub count: usize,
    pub percent: f64,
    pub color: SliceColor,
}

impl Slice {
    pub fn percent_label(&self) -> String {
        format!("{:.1}%", self.percent)
    }

    /// Fraction of the ring in `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        self.percent / 100.0
    }
}

/// Pre-aggregated counts for one ring chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub title: String,
    pub slices: Vec<Slice>,
    pub total: usize,
    pub center_caption: String,
}

impl Distribution {
    pub fn compliance(rows: &[HostSummary]) -> Self {
        let mut counts: Vec<(String, usize, SliceColor)> = Vec::new();
        for row in rows {
            bump(
                &mut counts,
                row.status.as_str(),
                SliceColor::for_status(row.status),
            );
        }
        Self::from_counts("Compliance Status Distribution", "Hosts", counts)
    }

    pub fn host_results<'a>(
        hostname: &str,
        status: ComplianceStatus,
        records: impl IntoIterator<Item = &'a RawRecord>,
    ) -> Self {
        let mut counts: Vec<(String, usize, SliceColor)> = Vec::new();
        for record in records {
            let label = record.result.to_lowercase();
            bump(&mut counts, &label, SliceColor::for_outcome(record.outcome()));
        }
        Self::from_counts(
            format!("Status for {hostname} : [ {status} ]"),
            "controls",
            counts,
        )
    }

    fn from_counts(
        title: impl Into<String>,
        caption: &str,
        mut counts: Vec<(String, usize, SliceColor)>,
    ) -> Self {
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let total: usize = counts.iter().map(|(_, n, _)| n).sum();
        let slices = counts
            .into_iter()
            .map(|(label, count, color)| Slice {
                label,
                count,
                percent: if total == 0 {
                    0.0
                } else {
                    count as f64 * 100.0 / total as f64
                },
                color,
            })
            .collect();
        Self {
            title: title.into(),
            slices,
            total,
            center_caption: caption.to_string(),
        }
    }

    pub fn center_label(&self) -> String {
        format!("{} {}", self.total, self.center_caption)
    }

    pub fn count_of(&self, label: &str) -> usize {
        self.slices
            .iter()
            .find(|s| s.label == label)
            .map(|s| s.count)
            .unwrap_or(0)
    }
}

fn bump(counts: &mut Vec<(String, usize, SliceColor)>, label: &str, color: SliceColor) {
    if let Some(entry) = counts.iter_mut().find(|(l, _, _)| l == label) {
        entry.1 += 1;
    } else {
        counts.push((label.to_string(), 1, color));
    }
}
