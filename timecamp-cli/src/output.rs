//! Plain-text rendering of API data for stdout.

use std::fmt::Write as _;

use time::{macros::format_description, Duration, PrimitiveDateTime};
use timecamp::domain::{task_tree, Entry, Me, RunningTimer, Tasks};

/// Go-style compact duration, e.g. `1h5m3s`, `12m0s`, `0s`.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.whole_seconds().max(0);
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    match (hours, minutes) {
        (0, 0) => format!("{}s", seconds),
        (0, _) => format!("{}m{}s", minutes, seconds),
        _ => format!("{}h{}m{}s", hours, minutes, seconds),
    }
}

/// Time spent on `entry`. An entry still being timed (no stored duration,
/// equal bounds) counts up to `now`.
pub fn entry_duration(entry: &Entry, now: PrimitiveDateTime) -> Duration {
    let stored = entry.duration_secs();
    if stored != 0 || entry.start_time != entry.end_time {
        return Duration::seconds(stored);
    }

    let started = PrimitiveDateTime::parse(
        &format!("{} {}", entry.date, entry.start_time),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    );
    match started {
        Ok(started) if started <= now => now - started,
        _ => Duration::ZERO,
    }
}

pub fn entries(entries: &[Entry], now: PrimitiveDateTime) -> String {
    if entries.is_empty() {
        return "No entries.\n".to_string();
    }

    let has_billable = entries.iter().any(|entry| entry.billable > 0);
    let mut out = String::new();
    let mut total = Duration::ZERO;

    for entry in entries {
        let duration = entry_duration(entry, now);
        total += duration;

        let end = if entry.start_time == entry.end_time {
            String::new()
        } else {
            format!(" - {}", entry.end_time)
        };
        let marker = match (entry.billable > 0, has_billable) {
            (true, _) => "$ ",
            (false, true) => "  ",
            (false, false) => "",
        };
        let name = if entry.name.is_empty() {
            String::new()
        } else {
            format!("[{}]", entry.name)
        };

        let line = format!(
            "{:>8}  {:<10}{}{}  {}{} {}",
            entry.id,
            format_duration(duration),
            entry.start_time,
            end,
            marker,
            name,
            entry.description
        );
        let _ = writeln!(out, "{}", line.trim_end());
    }

    let _ = writeln!(out, "Total {}", format_duration(total));
    out
}

pub fn tasks(tasks: &Tasks) -> String {
    if tasks.is_empty() {
        return "No tasks.\n".to_string();
    }

    let mut out = String::new();
    for (depth, task) in task_tree(tasks) {
        let prefix = if depth == 0 { "• " } else { "  └─ " };
        let _ = writeln!(out, "{}{} {}", prefix, task.name, task.task_id);
    }
    out
}

pub fn timers(timers: &[RunningTimer], now: PrimitiveDateTime) -> String {
    let Some(timer) = timers.first() else {
        return "No timer running.\n".to_string();
    };

    let elapsed = timer
        .elapsed(now)
        .map(format_duration)
        .unwrap_or_else(|| "?".to_string());
    let task = timer
        .name
        .clone()
        .or_else(|| timer.task_id.clone())
        .unwrap_or_else(|| "no task".to_string());
    format!(
        "Timer {} running for {} since {} ({})\n",
        timer.timer_id, elapsed, timer.started_at, task
    )
}

pub fn me(me: &Me) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", me.label());
    let _ = writeln!(out, "user id:    {}", me.user_id);
    let _ = writeln!(out, "group id:   {}", me.root_group_id);
    let _ = writeln!(out, "registered: {}", me.register_time);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use timecamp::domain::Task;

    const NOW: PrimitiveDateTime = datetime!(2024-05-01 12:00:00);

    fn entry(id: i64, duration: &str, start: &str, end: &str) -> Entry {
        Entry {
            id,
            duration: duration.to_string(),
            date: "2024-05-01".to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
            ..Entry::default()
        }
    }

    #[test]
    fn durations_use_compact_units() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::seconds(59)), "59s");
        assert_eq!(format_duration(Duration::seconds(720)), "12m0s");
        assert_eq!(format_duration(Duration::seconds(3903)), "1h5m3s");
        assert_eq!(format_duration(Duration::seconds(-5)), "0s");
    }

    #[test]
    fn running_entry_counts_up_to_now() {
        let running = entry(1, "0", "11:30:00", "11:30:00");
        assert_eq!(entry_duration(&running, NOW), Duration::minutes(30));

        let finished = entry(2, "3600", "09:00:00", "10:00:00");
        assert_eq!(entry_duration(&finished, NOW), Duration::hours(1));

        let future = entry(3, "0", "13:00:00", "13:00:00");
        assert_eq!(entry_duration(&future, NOW), Duration::ZERO);
    }

    #[test]
    fn entries_list_with_total() {
        let mut billable = entry(501, "3600", "09:00:00", "10:00:00");
        billable.billable = 1;
        billable.name = "api".to_string();
        let running = entry(502, "0", "11:30:00", "11:30:00");

        let out = entries(&[billable, running], NOW);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("1h0m0s"));
        assert!(lines[0].contains("09:00:00 - 10:00:00"));
        assert!(lines[0].contains("$ [api]"));
        assert!(lines[1].contains("30m0s"));
        assert!(!lines[1].contains(" - "));
        assert_eq!(lines[2], "Total 1h30m0s");
    }

    #[test]
    fn empty_lists_say_so() {
        assert_eq!(entries(&[], NOW), "No entries.\n");
        assert_eq!(tasks(&Tasks::new()), "No tasks.\n");
        assert_eq!(timers(&[], NOW), "No timer running.\n");
    }

    #[test]
    fn tasks_render_as_tree() {
        let task = |id: i64, parent: i64, name: &str| {
            (
                id.to_string(),
                Task {
                    task_id: id,
                    parent_id: parent,
                    name: name.to_string(),
                    ..Task::default()
                },
            )
        };
        let tasks_map = Tasks::from([task(1, 0, "Backend"), task(2, 1, "API")]);
        assert_eq!(tasks(&tasks_map), "• Backend 1\n  └─ API 2\n");
    }

    #[test]
    fn timer_shows_elapsed() {
        let timer = RunningTimer {
            timer_id: "9".to_string(),
            started_at: "2024-05-01 11:00:00".to_string(),
            task_id: Some("11".to_string()),
            ..RunningTimer::default()
        };
        assert_eq!(
            timers(&[timer], NOW),
            "Timer 9 running for 1h0m0s since 2024-05-01 11:00:00 (11)\n"
        );
    }
}
