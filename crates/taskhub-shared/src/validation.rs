//! Field rules checked before a write leaves the client, and again by the
//! server before it touches the store.

use std::sync::LazyLock;

use regex::Regex;

use crate::constants::{MIN_CHANGED_PASSWORD_LEN, MIN_NEW_USER_PASSWORD_LEN, MIN_PROJECT_TEXT_LEN};
use crate::error::ValidationErrors;
use crate::protocol::{NewCategory, NewMessage, NewProject, NewTask, NewUser, Project, Task, TaskPatch, UserPatch};
use crate::types::{ProjectStatus, TaskPriority, TaskStatus};

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\S+@\S+\.\S+$").expect("Invalid email regex"));

static TEL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\+\d{1,3}\d{6,14}|0\d{8,14})$").expect("Invalid phone regex")
});

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email.trim())
}

/// International (`+40712345678`) or national (`0712345678`) numbers.
pub fn is_valid_tel(tel: &str) -> bool {
    TEL_REGEX.is_match(tel.trim())
}

fn check_min_len(errors: &mut ValidationErrors, field: &str, label: &str, value: &str, min: usize) {
    if value.trim().chars().count() < min {
        errors.add(field, format!("{label} must be at least {min} characters long"));
    }
}

fn check_project_text(name: &str, description: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_min_len(&mut errors, "name", "Project name", name, MIN_PROJECT_TEXT_LEN);
    check_min_len(&mut errors, "description", "Description", description, MIN_PROJECT_TEXT_LEN);
    errors.into_result()
}

pub fn validate_new_project(project: &NewProject) -> Result<(), ValidationErrors> {
    check_project_text(&project.name, &project.description)
}

/// Field rules for a full project replace. The completion rule needs the
/// project's tasks and lives in [`ensure_project_completable`].
pub fn validate_project(project: &Project) -> Result<(), ValidationErrors> {
    check_project_text(&project.name, &project.description)
}

/// A project may only be marked completed once every one of its tasks is.
pub fn ensure_project_completable(project: &Project, tasks: &[Task]) -> Result<(), ValidationErrors> {
    if project.status != ProjectStatus::Completed {
        return Ok(());
    }
    let incomplete = tasks
        .iter()
        .filter(|t| t.project_id == project.id)
        .any(|t| t.status != TaskStatus::Completed);
    if incomplete {
        return Err(ValidationErrors::single(
            "status",
            "Project status cannot be set to completed because there are incomplete tasks in this project.",
        ));
    }
    Ok(())
}

pub fn validate_new_category(category: &NewCategory) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if category.title.trim().is_empty() {
        errors.add("title", "Category title cannot be empty");
    }
    errors.into_result()
}

/// Rules of the add-user form. `confirm_password` is only known client side;
/// the server passes `None`.
pub fn validate_new_user(user: &NewUser, confirm_password: Option<&str>) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if user.name.trim().is_empty() {
        errors.add("name", "User name cannot be empty");
    }
    if !is_valid_email(&user.email) {
        errors.add("email", "Please enter a valid email");
    }
    if !is_valid_tel(&user.tel) {
        errors.add("tel", "Please enter a valid phone number");
    }
    if user.password.trim().chars().count() < MIN_NEW_USER_PASSWORD_LEN {
        errors.add(
            "password",
            format!("Password must be at least {MIN_NEW_USER_PASSWORD_LEN} characters long"),
        );
    }
    if let Some(confirm) = confirm_password {
        if confirm != user.password {
            errors.add("confirmPassword", "Passwords do not match");
        }
    }
    errors.into_result()
}

pub fn validate_user_patch(patch: &UserPatch) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if patch.is_empty() {
        errors.add("user", "Nothing to update");
    }
    if matches!(&patch.name, Some(name) if name.trim().is_empty()) {
        errors.add("name", "User name cannot be empty");
    }
    if matches!(&patch.email, Some(email) if !is_valid_email(email)) {
        errors.add("email", "Please enter a valid email");
    }
    if matches!(&patch.tel, Some(tel) if !is_valid_tel(tel)) {
        errors.add("tel", "Please enter a valid phone number");
    }
    errors.into_result()
}

pub fn validate_new_task(task: &NewTask) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if task.title.trim().is_empty() {
        errors.add("title", "Task title cannot be empty");
    }
    if task.priority == TaskPriority::Unknown {
        errors.add("priority", "Priority must be high, medium or low");
    }
    errors.into_result()
}

pub fn validate_task_patch(patch: &TaskPatch) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if patch.is_empty() {
        errors.add("task", "Nothing to update");
    }
    if matches!(&patch.title, Some(title) if title.trim().is_empty()) {
        errors.add("title", "Task title cannot be empty");
    }
    if patch.priority == Some(TaskPriority::Unknown) {
        errors.add("priority", "Priority must be high, medium or low");
    }
    errors.into_result()
}

pub fn validate_new_message(message: &NewMessage) -> Result<(), ValidationErrors> {
    if message.message.trim().is_empty() {
        return Err(ValidationErrors::single("message", "Message cannot be empty."));
    }
    Ok(())
}

pub fn validate_password_change(
    old_password: &str,
    new_password: &str,
    confirm_password: Option<&str>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if new_password.chars().count() < MIN_CHANGED_PASSWORD_LEN {
        errors.add(
            "newPassword",
            format!("Password must be at least {MIN_CHANGED_PASSWORD_LEN} characters long."),
        );
    } else if new_password == old_password {
        errors.add("newPassword", "New password must be different from old password.");
    }
    if let Some(confirm) = confirm_password {
        if confirm != new_password {
            errors.add("confirmPassword", "New password and confirmation do not match.");
        }
    }
    errors.into_result()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::types::{Role, UserStatus};

    fn new_user() -> NewUser {
        NewUser {
            name: "Ana Pop".into(),
            email: "ana@example.com".into(),
            tel: "+40712345678".into(),
            role: Role::Developer,
            location: None,
            status: UserStatus::Active,
            password: "secret1".into(),
        }
    }

    fn task(id: i64, status: TaskStatus) -> Task {
        Task {
            id,
            title: format!("task {id}"),
            description: None,
            project_id: 1,
            priority: TaskPriority::Medium,
            status,
            assigned_to: 2,
            deadline: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn email_and_tel_formats() {
        assert!(is_valid_email("dev@corp.io"));
        assert!(!is_valid_email("dev@corp"));
        assert!(!is_valid_email("no spaces@x.io"));
        assert!(is_valid_tel("0712345678"));
        assert!(is_valid_tel("+40712345678"));
        assert!(!is_valid_tel("712345"));
    }

    #[test]
    fn new_user_reports_each_field() {
        let mut user = new_user();
        user.email = "nope".into();
        user.password = "123".into();
        let errors = validate_new_user(&user, Some("different")).unwrap_err();
        assert!(errors.get("email").is_some());
        assert!(errors.get("password").is_some());
        assert!(errors.get("confirmPassword").is_some());
        assert!(errors.get("name").is_none());

        assert!(validate_new_user(&new_user(), Some("secret1")).is_ok());
    }

    #[test]
    fn project_text_needs_three_chars() {
        let project = NewProject {
            name: "ab".into(),
            description: "long enough".into(),
            category_id: 1,
            manager_id: 1,
            deadline: None,
        };
        let errors = validate_new_project(&project).unwrap_err();
        assert!(errors.get("name").is_some());
        assert!(errors.get("description").is_none());
    }

    #[test]
    fn completion_guard_only_applies_to_completed_status() {
        let mut project = Project {
            id: 1,
            name: "Mobile".into(),
            description: "App".into(),
            category_id: 1,
            manager_id: 1,
            status: ProjectStatus::InProgress,
            deadline: None,
            updated_at: Utc::now(),
        };
        let tasks = vec![task(1, TaskStatus::Completed), task(2, TaskStatus::Paused)];
        assert!(ensure_project_completable(&project, &tasks).is_ok());

        project.status = ProjectStatus::Completed;
        let err = ensure_project_completable(&project, &tasks).unwrap_err();
        assert!(err.get("status").is_some());

        let done = vec![task(1, TaskStatus::Completed)];
        assert!(ensure_project_completable(&project, &done).is_ok());
    }

    #[test]
    fn password_change_rules() {
        assert!(validate_password_change("oldpass12", "short", None).is_err());
        assert!(validate_password_change("samepass1", "samepass1", None).is_err());
        let err = validate_password_change("oldpass12", "newpass123", Some("newpass124")).unwrap_err();
        assert!(err.get("confirmPassword").is_some());
        assert!(validate_password_change("oldpass12", "newpass123", Some("newpass123")).is_ok());
    }
}
