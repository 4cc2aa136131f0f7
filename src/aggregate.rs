// 🏅 Aggregates over a player's race history
//
// - best_records: fastest time per section
// - target_diff: best vs goal, signed and formatted
// - target_progress: target_diff for every target field with a best
// - record_history: chronological series for one section

use crate::error::{RosterError, RosterResult};
use crate::schema::FieldKind;
use crate::store::{CellValue, Row};
use crate::table::compare_cells;
use crate::time_codec::{format_seconds, parse_time};
use serde::Serialize;
use std::collections::BTreeMap;

/// Section labels offered by the record entry form.
pub const STANDARD_SECTIONS: [&str; 6] = [
    "1500m",
    "3000m",
    "5000m",
    "10000m",
    "ハーフマラソン",
    "フルマラソン",
];

/// Player target field → section it is measured against.
pub const TARGET_SECTIONS: [(&str, &str); 6] = [
    ("target_1500m", "1500m"),
    ("target_3000m", "3000m"),
    ("target_5000m", "5000m"),
    ("target_10000m", "10000m"),
    ("target_half", "ハーフマラソン"),
    ("target_full", "フルマラソン"),
];

fn text_of(row: &Row, name: &str) -> String {
    row.get(name).map(ToString::to_string).unwrap_or_default()
}

// ============================================================================
// BEST RECORDS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BestRecord {
    pub time: String,
    pub seconds: i64,
    pub date: String,
    pub race_name: String,
}

/// Fastest parseable time per section.
///
/// Records whose time does not parse are skipped. Ties keep the first
/// record seen. Sections without a usable record are absent.
pub fn best_records(records: &[Row]) -> BTreeMap<String, BestRecord> {
    let mut bests: BTreeMap<String, BestRecord> = BTreeMap::new();

    for record in records {
        let time = text_of(record, "time");
        let Some(seconds) = parse_time(&time) else {
            continue;
        };

        let section = text_of(record, "section");
        let faster = bests.get(&section).map_or(true, |best| seconds < best.seconds);
        if faster {
            bests.insert(
                section,
                BestRecord {
                    time,
                    seconds,
                    date: text_of(record, "date"),
                    race_name: text_of(record, "race_name"),
                },
            );
        }
    }

    bests
}

// ============================================================================
// TARGET DIFF
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetDiff {
    pub best_seconds: i64,
    pub target_seconds: i64,
    /// best - target; negative means faster than target
    pub diff_seconds: i64,
    pub achieved: bool,
    /// "-" + gap when slower than target, "+" + margin otherwise
    pub formatted: String,
    pub message: String,
}

pub fn target_diff(best_time: &str, target_time: &str) -> RosterResult<TargetDiff> {
    let best_seconds = parse_time(best_time)
        .ok_or_else(|| RosterError::Format(format!("invalid best time: {:?}", best_time)))?;
    let target_seconds = parse_time(target_time)
        .ok_or_else(|| RosterError::Format(format!("invalid target time: {:?}", target_time)))?;

    let diff_seconds = best_seconds - target_seconds;
    let achieved = diff_seconds <= 0;
    let sign = if diff_seconds > 0 { "-" } else { "+" };
    let gap = format_seconds(diff_seconds.abs());
    let formatted = format!("{}{}", sign, gap);

    let message = if achieved {
        format!("Target achieved ({} under target)", gap)
    } else {
        format!("{} left to reach target", gap)
    };

    Ok(TargetDiff {
        best_seconds,
        target_seconds,
        diff_seconds,
        achieved,
        formatted,
        message,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetProgress {
    pub target_field: String,
    pub section: String,
    pub target: String,
    pub best: String,
    #[serde(flatten)]
    pub diff: TargetDiff,
}

/// Compare each non-empty target on `player` against the matching best.
///
/// Targets without a best record, or that do not parse, are left out.
pub fn target_progress(
    player: &Row,
    bests: &BTreeMap<String, BestRecord>,
) -> Vec<TargetProgress> {
    TARGET_SECTIONS
        .iter()
        .filter_map(|(field, section)| {
            let target = text_of(player, field);
            if target.trim().is_empty() {
                return None;
            }
            let best = bests.get(*section)?;
            let diff = target_diff(&best.time, &target).ok()?;

            Some(TargetProgress {
                target_field: field.to_string(),
                section: section.to_string(),
                target,
                best: best.time.clone(),
                diff,
            })
        })
        .collect()
}

// ============================================================================
// HISTORY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryPoint {
    /// Date label (YYYY-MM-DD when the date is known)
    pub label: String,
    pub seconds: i64,
    pub time: String,
    pub race_name: String,
    pub section: String,
}

/// Parseable records as a date-ascending series, optionally for one section.
pub fn record_history(records: &[Row], section: Option<&str>) -> Vec<HistoryPoint> {
    let mut usable: Vec<(&Row, i64)> = records
        .iter()
        .filter(|r| section.map_or(true, |s| text_of(r, "section") == s))
        .filter_map(|r| parse_time(&text_of(r, "time")).map(|secs| (r, secs)))
        .collect();

    usable.sort_by(|(a, _), (b, _)| {
        compare_cells(
            a.get("date").unwrap_or(&CellValue::Empty),
            b.get("date").unwrap_or(&CellValue::Empty),
            Some(FieldKind::Date),
        )
    });

    usable
        .into_iter()
        .map(|(record, seconds)| {
            let label = match record.get("date").and_then(CellValue::as_date) {
                Some(d) => d.format("%Y-%m-%d").to_string(),
                None => text_of(record, "date"),
            };
            HistoryPoint {
                label,
                seconds,
                time: text_of(record, "time"),
                race_name: text_of(record, "race_name"),
                section: text_of(record, "section"),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(section: &str, time: &str, date: &str, race: &str) -> Row {
        let mut row = Row::new();
        row.insert("section".to_string(), CellValue::from(section));
        row.insert("time".to_string(), CellValue::from(time));
        row.insert("date".to_string(), CellValue::from(date));
        row.insert("race_name".to_string(), CellValue::from(race));
        row
    }

    #[test]
    fn test_best_records_keeps_minimum_and_skips_invalid() {
        let records = vec![
            record("5000m", "16:30", "2024-04-01", "Spring"),
            record("5000m", "15:45", "2024-06-01", "Summer"),
            record("5000m", "bad", "2024-07-01", "Broken"),
        ];

        let bests = best_records(&records);
        assert_eq!(bests.len(), 1);

        let best = &bests["5000m"];
        assert_eq!(best.time, "15:45");
        assert_eq!(best.seconds, 945);
        assert_eq!(best.race_name, "Summer");
        assert_eq!(best.date, "2024-06-01");
    }

    #[test]
    fn test_best_records_first_wins_ties() {
        let records = vec![
            record("1500m", "4:10", "2024-01-01", "First"),
            record("1500m", "04:10", "2024-02-01", "Second"),
        ];
        assert_eq!(best_records(&records)["1500m"].race_name, "First");
    }

    #[test]
    fn test_best_records_omits_sections_without_valid_times() {
        let records = vec![
            record("3000m", "", "2024-01-01", "Blank"),
            record("10000m", "31:02", "2024-01-01", "Ok"),
        ];
        let bests = best_records(&records);
        assert!(!bests.contains_key("3000m"));
        assert!(bests.contains_key("10000m"));
        assert!(best_records(&[]).is_empty());
    }

    #[test]
    fn test_target_diff_slower_than_target() {
        let diff = target_diff("15:30", "15:00").unwrap();
        assert!(!diff.achieved);
        assert_eq!(diff.diff_seconds, 30);
        assert_eq!(diff.formatted, "-0:30");
        assert_eq!(diff.message, "0:30 left to reach target");
    }

    #[test]
    fn test_target_diff_faster_than_target() {
        let diff = target_diff("14:50", "15:00").unwrap();
        assert!(diff.achieved);
        assert_eq!(diff.diff_seconds, -10);
        assert_eq!(diff.formatted, "+0:10");
        assert!(diff.message.starts_with("Target achieved"));
    }

    #[test]
    fn test_target_diff_exact_is_achieved() {
        let diff = target_diff("1:10:00", "1:10:00").unwrap();
        assert!(diff.achieved);
        assert_eq!(diff.formatted, "+0:00");
    }

    #[test]
    fn test_target_diff_rejects_bad_input() {
        assert!(matches!(target_diff("soon", "15:00"), Err(RosterError::Format(_))));
        assert!(matches!(target_diff("15:00", ""), Err(RosterError::Format(_))));
    }

    #[test]
    fn test_target_progress_pairs_targets_with_bests() {
        let mut player = Row::new();
        player.insert("target_5000m".to_string(), CellValue::from("15:00"));
        player.insert("target_1500m".to_string(), CellValue::from("4:00"));
        player.insert("target_full".to_string(), CellValue::from("someday"));

        let records = vec![
            record("5000m", "15:30", "2024-05-01", "Meet"),
            record("フルマラソン", "2:40:00", "2024-02-01", "Marathon"),
        ];
        let progress = target_progress(&player, &best_records(&records));

        // 1500m has no best, full target does not parse
        assert_eq!(progress.len(), 1);
        assert_eq!(progress[0].section, "5000m");
        assert_eq!(progress[0].diff.diff_seconds, 30);
    }

    #[test]
    fn test_every_target_maps_to_a_standard_section() {
        for (_, section) in TARGET_SECTIONS {
            assert!(STANDARD_SECTIONS.contains(&section));
        }
    }

    #[test]
    fn test_record_history_orders_by_date() {
        let mut typed = record("5000m", "15:10", "", "Typed");
        typed.insert(
            "date".to_string(),
            CellValue::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
        );
        let records = vec![
            record("5000m", "15:40", "2024-09-01", "Autumn"),
            typed,
            record("5000m", "oops", "2024-01-01", "Skipped"),
            record("1500m", "4:05", "2024-02-01", "Other"),
        ];

        let history = record_history(&records, Some("5000m"));
        let labels: Vec<&str> = history.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["2024-03-01", "2024-09-01"]);
        assert_eq!(history[0].seconds, 910);

        assert_eq!(record_history(&records, None).len(), 3);
    }
}
