use std::io::{BufRead, Write};

use anyhow::{bail, Context, Result};
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};
use timecamp::{
    domain::{parent_task_by_prefix, EntryUpdate, Tasks},
    TimeCamp,
};

use crate::{cli::Commands, config::CampConfig, output};

pub async fn run(command: Commands, api: &TimeCamp) -> Result<()> {
    match command {
        Commands::Me => {
            let me = api.me().await.context("Failed to fetch user info")?;
            print!("{}", output::me(&me));
        }
        Commands::Entries { date } => {
            let date = date.unwrap_or_else(today);
            let entries = api
                .entries(date)
                .await
                .context("Failed to fetch entries")?;
            print!("{}", output::entries(&entries, local_now()));
        }
        Commands::Tasks => {
            let tasks = api.tasks().await.context("Failed to fetch tasks")?;
            print!("{}", output::tasks(&tasks));
        }
        Commands::Timer => {
            let timers = api
                .running_timers()
                .await
                .context("Failed to fetch timers")?;
            print!("{}", output::timers(&timers, local_now()));
        }
        Commands::Start => start(api).await?,
        Commands::Stop => stop(api).await?,
        Commands::Edit {
            id,
            date,
            start,
            end,
            task,
        } => edit(api, id, date, start, end, task).await?,
        Commands::Reassign { id, task } => {
            let task_id = resolve_task(api, &task).await?;
            let updated = api
                .reassign_task(id, task_id)
                .await
                .with_context(|| format!("Failed to reassign entry {}", id))?;
            println!("Entry {} moved to task {}", updated.entry_id, updated.task_id);
        }
        Commands::Delete { id, yes } => {
            let stdin = std::io::stdin();
            let confirmed = yes
                || confirm(
                    &format!("Delete entry {}? (y/n) ", id),
                    &mut stdin.lock(),
                    &mut std::io::stdout(),
                )?;
            if !confirmed {
                println!("Aborted.");
                return Ok(());
            }
            let deleted = api
                .delete_entry(id)
                .await
                .with_context(|| format!("Failed to delete entry {}", id))?;
            println!("{}", deleted.message);
        }
        Commands::Overview { date } => overview(api, date.unwrap_or_else(today)).await?,
        Commands::ConfigPath => config_path()?,
    }

    Ok(())
}

/// Print the config path, creating a default file if missing.
pub fn config_path() -> Result<()> {
    let path = CampConfig::config_path()?;
    if CampConfig::write_default(&path)? {
        eprintln!("Created default config.");
    }
    println!("{}", path.display());
    Ok(())
}

async fn start(api: &TimeCamp) -> Result<()> {
    let timers = api
        .running_timers()
        .await
        .context("Failed to fetch timers")?;
    if !timers.is_empty() {
        print!("{}", output::timers(&timers, local_now()));
        return Ok(());
    }

    let started = api.start_timer().await.context("Failed to start timer")?;
    println!("Timer started (entry {}).", started.entry_id);
    Ok(())
}

async fn stop(api: &TimeCamp) -> Result<()> {
    let timers = api
        .running_timers()
        .await
        .context("Failed to fetch timers")?;
    let Some(timer) = timers.first() else {
        println!("No timer running.");
        return Ok(());
    };

    let stopped = api
        .stop_timer(timer.task_id.clone())
        .await
        .context("Failed to stop timer")?;
    println!(
        "Timer stopped, {} logged to entry {}.",
        output::format_duration(time::Duration::seconds(stopped.elapsed)),
        stopped.entry_id
    );
    Ok(())
}

async fn edit(
    api: &TimeCamp,
    id: i64,
    date: Option<Date>,
    start: Option<String>,
    end: Option<String>,
    task: Option<String>,
) -> Result<()> {
    let mut update = EntryUpdate::new(id);
    if let Some(date) = date {
        update = update.date(date);
    }
    if let Some(task) = task {
        update = update.task(resolve_task(api, &task).await?);
    }
    update = update.with_times(
        start.as_deref().unwrap_or_default(),
        end.as_deref().unwrap_or_default(),
    )?;

    if update == EntryUpdate::new(id) {
        bail!("Nothing to change; pass --date, --start, --end or --task");
    }

    // The running timer is always one of today's entries.
    let (entries, timers) = tokio::join!(api.entries(today()), api.running_timers());
    let entries = entries.context("Failed to fetch entries")?;
    let timers = timers.context("Failed to fetch timers")?;

    let updated = match entries.iter().find(|entry| entry.id == id) {
        Some(entry) => {
            if entry.is_running_timer(&timers) && (start.is_some() || end.is_some()) {
                eprintln!("Entry {} is the running timer; its times were left unchanged.", id);
            }
            api.edit_entry(entry, &timers, update).await
        }
        None => api.update_entry(&update).await,
    }
    .with_context(|| format!("Failed to update entry {}", id))?;

    println!("Entry {} updated (task {}).", updated.entry_id, updated.task_id);
    Ok(())
}

async fn overview(api: &TimeCamp, date: Date) -> Result<()> {
    let overview = api.overview(date).await;
    let now = local_now();

    if let Ok(me) = &overview.me {
        print!("{}", output::me(me));
    }
    if let Ok(timers) = &overview.timers {
        print!("\n{}", output::timers(timers, now));
    }
    if let Ok(entries) = &overview.entries {
        print!("\nEntries for {}\n{}", date, output::entries(entries, now));
    }
    if let Ok(tasks) = &overview.tasks {
        println!("\n{} tasks available.", tasks.len());
    }

    let failures = overview.failures();
    for (kind, err) in &failures {
        eprintln!("error fetching {}: {}", kind, err);
    }
    if failures.len() == 4 {
        bail!("Could not load anything from TimeCamp");
    }
    Ok(())
}

/// A numeric task id, or the leading letters of a top-level task name.
async fn resolve_task(api: &TimeCamp, value: &str) -> Result<i64> {
    if let Ok(id) = value.trim().parse::<i64>() {
        return Ok(id);
    }
    let tasks = api.tasks().await.context("Failed to fetch tasks")?;
    task_by_prefix(&tasks, value)
}

fn task_by_prefix(tasks: &Tasks, prefix: &str) -> Result<i64> {
    let task = parent_task_by_prefix(tasks, prefix.trim())
        .with_context(|| format!("No top-level task starts with {:?}", prefix))?;
    Ok(task.task_id)
}

/// Ask a yes/no question; anything but "y"/"yes" is a no.
pub fn confirm(prompt: &str, input: &mut impl BufRead, output: &mut impl Write) -> Result<bool> {
    output.write_all(prompt.as_bytes())?;
    output.flush()?;

    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

fn local_now() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc()
        .to_offset(UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC));
    PrimitiveDateTime::new(now.date(), now.time())
}

fn today() -> Date {
    local_now().date()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use timecamp::domain::Task;

    #[test]
    fn confirm_accepts_only_yes() {
        for (answer, expected) in [
            ("y\n", true),
            ("YES\n", true),
            ("n\n", false),
            ("\n", false),
            ("", false),
        ] {
            let mut out = Vec::new();
            let confirmed =
                confirm("Delete? ", &mut Cursor::new(answer.as_bytes()), &mut out).unwrap();
            assert_eq!(confirmed, expected, "answer {:?}", answer);
            assert_eq!(out, b"Delete? ");
        }
    }

    #[test]
    fn task_prefix_resolves_top_level_tasks() {
        let tasks = Tasks::from([
            (
                "1".to_string(),
                Task {
                    task_id: 1,
                    name: "Backend".to_string(),
                    ..Task::default()
                },
            ),
            (
                "2".to_string(),
                Task {
                    task_id: 2,
                    parent_id: 1,
                    name: "Ops".to_string(),
                    ..Task::default()
                },
            ),
        ]);
        assert_eq!(task_by_prefix(&tasks, "b").unwrap(), 1);
        assert!(task_by_prefix(&tasks, "o").is_err());
    }
}
