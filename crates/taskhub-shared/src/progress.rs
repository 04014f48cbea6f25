//! Completion figures shown on project cards and the home screen.

use chrono::NaiveDate;
use serde::Serialize;

use crate::protocol::Task;
use crate::types::{ProjectId, TaskStatus};

/// `completed / total * 100`, rounded half up. An empty set is 0%.
pub fn completion_percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total) as u64;
    let total = total as u64;
    ((completed * 200 + total) / (2 * total)) as u8
}

/// Percentage of a project's tasks that are completed.
pub fn project_completion(project_id: ProjectId, tasks: &[Task]) -> u8 {
    let (completed, total) = tasks
        .iter()
        .filter(|t| t.project_id == project_id)
        .fold((0, 0), |(done, all), t| {
            (done + usize::from(t.status == TaskStatus::Completed), all + 1)
        });
    completion_percentage(completed, total)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayProgress {
    pub total: usize,
    pub completed: usize,
    pub percent: u8,
}

impl DayProgress {
    pub fn tier(&self) -> ProgressTier {
        ProgressTier::from_progress(self)
    }
}

/// Progress over the tasks due on `day`.
pub fn progress_for_day(tasks: &[Task], day: NaiveDate) -> DayProgress {
    let due: Vec<&Task> = tasks.iter().filter(|t| t.deadline == Some(day)).collect();
    let completed = due
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count();
    DayProgress {
        total: due.len(),
        completed,
        percent: completion_percentage(completed, due.len()),
    }
}

/// Banner state of the daily progress card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProgressTier {
    NothingDue,
    NotStarted,
    GoodStart,
    Halfway,
    AlmostDone,
    Done,
}

impl ProgressTier {
    pub fn from_progress(progress: &DayProgress) -> Self {
        if progress.total == 0 {
            return Self::NothingDue;
        }
        match progress.percent {
            0 => Self::NotStarted,
            1..=30 => Self::GoodStart,
            31..=74 => Self::Halfway,
            75..=99 => Self::AlmostDone,
            _ => Self::Done,
        }
    }

    pub fn headline(&self) -> &'static str {
        match self {
            Self::NothingDue => "No tasks for today!",
            Self::NotStarted => "Time to start your daily tasks!",
            Self::GoodStart => "Good Start! You're making progress!",
            Self::Halfway => "Halfway there! Keep up the good work!",
            Self::AlmostDone => "Almost done! Keep pushing!",
            Self::Done => "Congratulations! All tasks are completed!",
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::types::TaskPriority;

    fn task(id: i64, status: TaskStatus, deadline: Option<NaiveDate>) -> Task {
        Task {
            id,
            title: format!("t{id}"),
            description: None,
            project_id: 9,
            priority: TaskPriority::Low,
            status,
            assigned_to: 1,
            deadline,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn one_of_four_is_twenty_five() {
        let tasks = vec![
            task(1, TaskStatus::Completed, None),
            task(2, TaskStatus::New, None),
            task(3, TaskStatus::InProgress, None),
            task(4, TaskStatus::ToCheck, None),
        ];
        assert_eq!(project_completion(9, &tasks), 25);
        assert_eq!(project_completion(10, &tasks), 0);
    }

    #[test]
    fn rounds_half_up() {
        assert_eq!(completion_percentage(1, 8), 13);
        assert_eq!(completion_percentage(1, 3), 33);
        assert_eq!(completion_percentage(2, 3), 67);
        assert_eq!(completion_percentage(0, 0), 0);
        assert_eq!(completion_percentage(5, 5), 100);
    }

    #[test]
    fn day_progress_and_tiers() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let other = NaiveDate::from_ymd_opt(2025, 6, 3).unwrap();
        let tasks = vec![
            task(1, TaskStatus::Completed, Some(today)),
            task(2, TaskStatus::New, Some(today)),
            task(3, TaskStatus::Completed, Some(other)),
        ];
        let progress = progress_for_day(&tasks, today);
        assert_eq!(progress.total, 2);
        assert_eq!(progress.percent, 50);
        assert_eq!(progress.tier(), ProgressTier::Halfway);

        let empty = progress_for_day(&tasks, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(empty.tier(), ProgressTier::NothingDue);
    }
}
