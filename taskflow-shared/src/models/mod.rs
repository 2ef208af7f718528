/// Database models for TaskFlow
///
/// Each model owns its table and exposes its operations as associated
/// functions taking the pool explicitly.
///
/// # Models
///
/// - `user`: Accounts and the email verification state machine
/// - `task`: Per-user tasks, every query scoped by owner
///
/// # Example
///
/// ```no_run
/// use taskflow_shared::models::{task::Task, user::User};
/// use taskflow_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// if let Some(user) = User::find_by_email(&pool, "ada@example.com").await? {
///     let tasks = Task::list_by_owner(&pool, user.id).await?;
///     println!("{} has {} tasks", user.display_name(), tasks.len());
/// }
/// # Ok(())
/// # }
/// ```

pub mod task;
pub mod user;

pub use task::{CreateTask, Task, UpdateTask};
pub use user::{CreateUser, SupersedePolicy, User, UserStoreError};
