//! The order in which lists are shown. Caches keep arrival order; screens sort
//! on the way out with these.

use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::protocol::{Category, Project, Task, User};

/// Missing deadlines sort after every real one.
fn cmp_deadline(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Priority rank first (high, medium, low, unknown), then earliest deadline.
pub fn cmp_tasks(a: &Task, b: &Task) -> Ordering {
    a.priority
        .rank()
        .cmp(&b.priority.rank())
        .then_with(|| cmp_deadline(a.deadline, b.deadline))
}

pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(cmp_tasks);
}

/// Most recently updated first.
pub fn sort_projects_by_recent(projects: &mut [Project]) {
    projects.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}

pub fn sort_users_by_name(users: &mut [User]) {
    users.sort_by_cached_key(|u| u.name.to_lowercase());
}

pub fn sort_categories_by_title(categories: &mut [Category]) {
    categories.sort_by_cached_key(|c| c.title.to_lowercase());
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::types::{ProjectStatus, TaskPriority, TaskStatus};

    fn task(id: i64, priority: TaskPriority, deadline: Option<&str>) -> Task {
        Task {
            id,
            title: format!("task {id}"),
            description: None,
            project_id: 1,
            priority,
            status: TaskStatus::New,
            assigned_to: 1,
            deadline: deadline.map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap()),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn priority_then_deadline() {
        let mut tasks = vec![
            task(1, TaskPriority::Low, Some("2025-03-01")),
            task(2, TaskPriority::High, Some("2025-05-01")),
            task(3, TaskPriority::High, Some("2025-02-01")),
        ];
        sort_tasks(&mut tasks);
        let ids: Vec<_> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn unknown_priority_and_missing_deadline_go_last() {
        let mut tasks = vec![
            task(1, TaskPriority::Unknown, Some("2020-01-01")),
            task(2, TaskPriority::Medium, None),
            task(3, TaskPriority::Medium, Some("2030-01-01")),
        ];
        sort_tasks(&mut tasks);
        let ids: Vec<_> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn projects_newest_first() {
        let now = Utc::now();
        let project = |id: i64, age_days: i64| Project {
            id,
            name: format!("p{id}"),
            description: "desc".into(),
            category_id: 1,
            manager_id: 1,
            status: ProjectStatus::New,
            deadline: None,
            updated_at: now - Duration::days(age_days),
        };
        let mut projects = vec![project(1, 5), project(2, 1), project(3, 3)];
        sort_projects_by_recent(&mut projects);
        let ids: Vec<_> = projects.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }
}
