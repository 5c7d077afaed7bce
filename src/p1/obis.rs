//! OBIS-code to field dispatch table (spec.md §4.2 step 2).
//!
//! Grounded on the teacher's `obis_utils::get_standard_obis_descriptions`
//! (a `HashMap<&str, &str>` of OBIS code to meaning) and
//! `metering_62056::obis_parser::parse_obis_line` (find-the-parens value
//! extraction), generalized here into a typed field-specific extractor per
//! OBIS prefix instead of a free-form string value.

use chrono::{Local, TimeZone};
use log::warn;

use crate::models::{BreakerState, DemandPeak, MAX_DEMAND_YEAR_CAPACITY, TelegramSnapshot};

/// Parses one DSMR telegram data line and applies it to `snapshot`.
///
/// Unknown OBIS prefixes are silently ignored; malformed values leave the
/// field at its zeroed default and log a warning, per spec.md §4.2 step 2
/// and §7 ("field parse error").
pub fn apply_line(line: &str, snapshot: &mut TelegramSnapshot) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    let Some(paren) = line.find('(') else {
        return;
    };
    let obis = &line[..paren];
    let rest = &line[paren..];

    match obis {
        "0-0:96.1.4" => snapshot.version_info = first_group(rest).unwrap_or_default(),
        "0-0:96.1.1" => snapshot.equipment_id = first_group(rest).unwrap_or_default(),
        "0-0:1.0.0" => {
            if let Some(raw) = first_group(rest) {
                snapshot.msg_timestamp = parse_timestamp(&raw).unwrap_or(0);
            }
        }
        "1-0:1.8.1" => snapshot.electricity_delivered_tariff1 = float_before_star(rest),
        "1-0:1.8.2" => snapshot.electricity_delivered_tariff2 = float_before_star(rest),
        "1-0:2.8.1" => snapshot.electricity_returned_tariff1 = float_before_star(rest),
        "1-0:2.8.2" => snapshot.electricity_returned_tariff2 = float_before_star(rest),
        "0-0:96.14.0" => {
            if let Some(raw) = first_group(rest) {
                snapshot.tariff_indicator = raw.trim().parse::<u32>().unwrap_or(0) as u8;
            }
        }
        "1-0:1.4.0" => snapshot.current_avg_demand = float_before_star(rest),
        "1-0:1.6.0" => apply_max_demand_month(rest, snapshot),
        "0-0:98.1.0" => apply_max_demand_year(rest, snapshot),
        "1-0:1.7.0" => snapshot.current_power_usage = float_before_star(rest),
        "1-0:2.7.0" => snapshot.current_power_return = float_before_star(rest),
        "1-0:21.7.0" => snapshot.current_power_usage_l1 = float_before_star(rest),
        "1-0:41.7.0" => snapshot.current_power_usage_l2 = float_before_star(rest),
        "1-0:61.7.0" => snapshot.current_power_usage_l3 = float_before_star(rest),
        "1-0:22.7.0" => snapshot.current_power_return_l1 = float_before_star(rest),
        "1-0:42.7.0" => snapshot.current_power_return_l2 = float_before_star(rest),
        "1-0:62.7.0" => snapshot.current_power_return_l3 = float_before_star(rest),
        "1-0:32.7.0" => snapshot.voltage_l1 = float_before_star(rest),
        "1-0:52.7.0" => snapshot.voltage_l2 = float_before_star(rest),
        "1-0:72.7.0" => snapshot.voltage_l3 = float_before_star(rest),
        "1-0:31.7.0" => snapshot.current_l1 = float_before_star(rest),
        "1-0:51.7.0" => snapshot.current_l2 = float_before_star(rest),
        "1-0:71.7.0" => snapshot.current_l3 = float_before_star(rest),
        "0-0:96.3.10" => {
            if let Some(raw) = first_group(rest) {
                let code = raw.trim().parse::<u32>().unwrap_or(1);
                snapshot.breaker_state = BreakerState::from_code(code);
            }
        }
        "0-0:17.0.0" => snapshot.limiter_threshold = float_before_star(rest),
        "1-0:31.4.0" => snapshot.fuse_supervision_threshold = float_before_star(rest),
        "0-0:96.13.1" => { /* text message: recognized, discarded */ }
        _ => { /* unknown OBIS line, ignored */ }
    }
}

/// Returns the text of the first `(...)` group.
fn first_group(rest: &str) -> Option<String> {
    let rest = rest.strip_prefix('(')?;
    let end = rest.find(')')?;
    Some(rest[..end].to_string())
}

/// Returns every `(...)` group in a line, in order.
fn all_groups(rest: &str) -> Vec<&str> {
    let mut groups = Vec::new();
    let mut cursor = rest;
    while let Some(start) = cursor.find('(') {
        let after = &cursor[start + 1..];
        let Some(end) = after.find(')') else {
            break;
        };
        groups.push(&after[..end]);
        cursor = &after[end + 1..];
    }
    groups
}

/// Parses a float out of the first group, stopping at `*` (the unit
/// separator), defaulting to `0.0` on any failure (spec.md §7).
fn float_before_star(rest: &str) -> f64 {
    let Some(group) = first_group(rest) else {
        warn!("OBIS value missing opening parenthesis content");
        return 0.0;
    };
    let numeric = group.split('*').next().unwrap_or("");
    numeric.trim().parse::<f64>().unwrap_or_else(|_| {
        warn!("OBIS value '{}' is not a valid number", group);
        0.0
    })
}

fn apply_max_demand_month(rest: &str, snapshot: &mut TelegramSnapshot) {
    let groups = all_groups(rest);
    if groups.len() < 2 {
        warn!("max_demand_month line has fewer than 2 groups");
        return;
    }
    let timestamp = parse_timestamp(groups[0]).unwrap_or(0);
    let demand = groups[1].split('*').next().unwrap_or("").trim().parse::<f64>().unwrap_or(0.0);
    snapshot.max_demand_month = DemandPeak { timestamp, demand };
}

/// Parses the `0-0:98.1.0` max-demand-year line: first group is the entry
/// count `N`, the next two groups are header rows to skip, then for each
/// of the `N` entries: two header groups, a timestamp group, a demand
/// group (spec.md §4.2 table).
fn apply_max_demand_year(rest: &str, snapshot: &mut TelegramSnapshot) {
    let groups = all_groups(rest);
    if groups.is_empty() {
        return;
    }
    let count = groups[0].trim().parse::<usize>().unwrap_or(0).min(MAX_DEMAND_YEAR_CAPACITY);

    let mut idx = 3; // skip count + two header groups
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let ts_idx = idx + 2;
        let demand_idx = idx + 3;
        if demand_idx >= groups.len() {
            break;
        }
        let timestamp = parse_timestamp(groups[ts_idx]).unwrap_or(0);
        if timestamp == 0 {
            break;
        }
        let demand = groups[demand_idx].split('*').next().unwrap_or("").trim().parse::<f64>().unwrap_or(0.0);
        entries.push(DemandPeak { timestamp, demand });
        idx += 4;
    }
    snapshot.max_demand_year = entries;
}

/// Parses the DSMR wall-clock timestamp `YYMMDDhhmmss[S|W]` into epoch
/// seconds using the host's current local time zone (spec.md §4.2
/// "Timestamp semantics"). The trailing DST marker is tolerated but
/// ignored.
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let digits: &str = raw.trim_end_matches(|c: char| c == 'S' || c == 'W');
    if digits.len() != 12 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = 2000 + digits[0..2].parse::<i32>().ok()?;
    let month = digits[2..4].parse::<u32>().ok()?;
    let day = digits[4..6].parse::<u32>().ok()?;
    let hour = digits[6..8].parse::<u32>().ok()?;
    let minute = digits[8..10].parse::<u32>().ok()?;
    let second = digits[10..12].parse::<u32>().ok()?;

    let naive_date = chrono::NaiveDate::from_ymd_opt(year, month, day)?;
    let naive_time = chrono::NaiveTime::from_hms_opt(hour, minute, second)?;
    let naive = naive_date.and_time(naive_time);
    let local = Local.from_local_datetime(&naive).single()?;
    Some(local.timestamp())
}
