//! Rows shared by the per-table tests.

use taskhub_shared::protocol::{NewCategory, NewProject, NewTask, NewUser, Project, Task};
use taskhub_shared::types::{CategoryId, ProjectId, Role, TaskPriority, UserId, UserStatus};

use crate::Database;

pub(crate) struct Seed {
    pub manager: UserId,
    pub developer: UserId,
    pub category: CategoryId,
}

pub(crate) fn new_user(name: &str, email: &str, tel: &str, role: Role) -> NewUser {
    NewUser {
        name: name.into(),
        email: email.into(),
        tel: tel.into(),
        role,
        location: None,
        status: UserStatus::Active,
        password: "secret1".into(),
    }
}

pub(crate) fn seed(db: &Database) -> Seed {
    let manager = db
        .create_user(&new_user("Mara", "mara@example.com", "0711111111", Role::Manager), "h")
        .unwrap();
    let developer = db
        .create_user(&new_user("Dan", "dan@example.com", "0722222222", Role::Developer), "h")
        .unwrap();
    let category = db.create_category(&NewCategory { title: "Web".into() }).unwrap();
    Seed {
        manager: manager.id,
        developer: developer.id,
        category: category.id,
    }
}

pub(crate) fn project(db: &Database, seed: &Seed, name: &str) -> Project {
    db.create_project(&NewProject {
        name: name.into(),
        description: "Something to build".into(),
        category_id: seed.category,
        manager_id: seed.manager,
        deadline: None,
    })
    .unwrap()
}

pub(crate) fn task(db: &Database, seed: &Seed, project_id: ProjectId, title: &str) -> Task {
    db.create_task(&NewTask {
        title: title.into(),
        description: None,
        project_id,
        priority: TaskPriority::Medium,
        assigned_to: seed.developer,
        deadline: None,
    })
    .unwrap()
}
