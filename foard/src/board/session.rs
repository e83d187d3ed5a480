//! A live session on one board's task collection.
//!
//! The session keeps a local mirror of the board's tasks, applies every edit
//! optimistically to the mirror, and persists the minimal delta the ordering
//! engine computed. Creation goes through a store transaction so concurrent
//! creators never hand out colliding `order` values; everything else is a
//! plain batch reconciled last-write-wins by the store, with subscription
//! snapshots overwriting the mirror as the shared truth arrives.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use foard_model::board::{BoardId, collections};
use foard_model::{BoardView, Category, Task, TaskId, ordering};
use foard_store::{Direction, Document, DocumentStore, Fields, Mutation, Query, Subscription};

use crate::board::{BoardError, BoardManager};
use crate::identity::AuthUser;

/// The fields a reorder or move needs to persist for one task.
fn position_fields(task: &Task) -> Fields {
    let mut fields = Fields::new();
    fields.insert("order".to_string(), task.order.into());
    fields.insert(
        "category".to_string(),
        Value::String(task.category.to_string()),
    );
    fields.insert("tag".to_string(), Value::String(task.tag.clone()));
    fields
}

fn parse_tasks(docs: &[Document]) -> Result<Vec<Task>, BoardError> {
    docs.iter()
        .map(|doc| Task::from_document(&doc.id, &doc.data).map_err(BoardError::from))
        .collect()
}

/// A member's live handle on one board.
pub struct BoardSession {
    store: Arc<DocumentStore>,
    board_id: BoardId,
    user: AuthUser,
    tasks: Vec<Task>,
    title_limit: usize,
}

impl BoardSession {
    /// Opens a session for `user`, enforcing membership, and subscribes to
    /// the board's task collection ordered by `order`.
    ///
    /// The returned [`Subscription`] delivers the current snapshot first and
    /// then one per remote change; feed each into
    /// [`BoardSession::apply_snapshot`].
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::AccessDenied`] for non-members and
    /// [`BoardError::BoardNotFound`] for unknown boards.
    pub async fn open(
        manager: &BoardManager,
        board_id: &BoardId,
        user: &AuthUser,
    ) -> Result<(Self, Subscription), BoardError> {
        manager.board(board_id).await?;
        if !manager.is_member(board_id, &user.user_id).await? {
            return Err(BoardError::AccessDenied {
                user_id: user.user_id.clone(),
                board_id: board_id.clone(),
            });
        }

        let store = Arc::clone(manager.store());
        let query =
            Query::collection(collections::tasks(board_id)).order_by("order", Direction::Ascending);
        let mut subscription = store.subscribe(query).await;
        // The first snapshot is always delivered at subscribe time.
        let tasks = match subscription.next_snapshot().await {
            Some(docs) => parse_tasks(&docs)?,
            None => Vec::new(),
        };

        tracing::info!(board_id = %board_id, user_id = %user.user_id, tasks = tasks.len(), "session opened");
        Ok((
            Self {
                store,
                board_id: board_id.clone(),
                user: user.clone(),
                tasks,
                title_limit: manager.title_limit(),
            },
            subscription,
        ))
    }

    /// The board this session is on.
    #[must_use]
    pub fn board_id(&self) -> &BoardId {
        &self.board_id
    }

    /// The session's local mirror of every task, active and archived.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// The rendered board shape from the local mirror.
    #[must_use]
    pub fn view(&self) -> BoardView {
        BoardView::project(&self.tasks)
    }

    fn active(&self) -> Vec<Task> {
        self.tasks.iter().filter(|t| t.is_active()).cloned().collect()
    }

    fn tasks_collection(&self) -> String {
        collections::tasks(&self.board_id)
    }

    /// Replaces the active portion of the mirror with a freshly computed set.
    fn apply_active(&mut self, active: Vec<Task>) {
        self.tasks.retain(|t| !t.is_active());
        self.tasks.extend(active);
    }

    /// Overwrites the mirror with a subscription snapshot. Remote truth wins
    /// over any optimistic state.
    ///
    /// # Errors
    ///
    /// Propagates document decode failures.
    pub fn apply_snapshot(&mut self, docs: &[Document]) -> Result<(), BoardError> {
        self.tasks = parse_tasks(docs)?;
        Ok(())
    }

    /// Re-reads the task collection, discarding optimistic state.
    ///
    /// # Errors
    ///
    /// Propagates document decode failures.
    pub async fn resync(&mut self) -> Result<(), BoardError> {
        let query = Query::collection(self.tasks_collection())
            .order_by("order", Direction::Ascending);
        let docs = self.store.run_query(&query).await;
        self.tasks = parse_tasks(&docs)?;
        Ok(())
    }

    /// Creates one task per non-blank line of `input` in `category`.
    ///
    /// Titles are validated against the manager's configured length limit.
    /// Runs inside a store transaction: the active set is re-read on each
    /// attempt, so two clients creating at once never produce colliding
    /// `order` values.
    ///
    /// # Errors
    ///
    /// Returns a model error for blank input or an over-long title, or a
    /// store error if the transaction keeps conflicting.
    pub async fn create_tasks(
        &mut self,
        input: &str,
        category: Category,
    ) -> Result<Vec<Task>, BoardError> {
        let titles: Vec<String> = input
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();

        let collection = self.tasks_collection();
        let query = Query::collection(collection.clone());
        let created_by = self.user.user_id.clone();
        let title_limit = self.title_limit;

        let created = self
            .store
            .run_transaction(|txn| {
                let docs = txn.run_query(&query);
                let all = parse_tasks(&docs)?;
                let active: Vec<Task> = all.into_iter().filter(|t| t.is_active()).collect();
                let created = ordering::bulk_insert_with_limit(
                    &active,
                    &titles,
                    category,
                    Some(created_by.as_str()),
                    title_limit,
                )?;
                for task in &created {
                    txn.set(collection.clone(), task.id.to_string(), task.to_document()?);
                }
                Ok::<_, BoardError>(created)
            })
            .await?;

        tracing::debug!(board_id = %self.board_id, count = created.len(), %category, "tasks created");
        self.tasks.extend(created.clone());
        Ok(created)
    }

    /// Moves a task to `new_index` within its own column.
    ///
    /// # Errors
    ///
    /// Returns `TaskNotFound` for an unknown id.
    pub async fn move_task(
        &mut self,
        task_id: &TaskId,
        new_index: usize,
    ) -> Result<(), BoardError> {
        let outcome = ordering::move_within(&self.active(), task_id, new_index)?;
        // Optimistic: the mirror moves before the write lands.
        self.apply_active(outcome.tasks);
        self.persist_positions(&outcome.changed).await?;
        Ok(())
    }

    /// Moves a task into another column, at `target_index` or the end.
    ///
    /// # Errors
    ///
    /// Returns `TaskNotFound` for an unknown id.
    pub async fn move_task_to(
        &mut self,
        task_id: &TaskId,
        target_category: Category,
        target_index: Option<usize>,
    ) -> Result<(), BoardError> {
        let outcome =
            ordering::move_across(&self.active(), task_id, target_category, target_index)?;
        self.apply_active(outcome.tasks);
        self.persist_positions(&outcome.changed).await?;
        Ok(())
    }

    /// Archives a task, stamping its completion time now.
    ///
    /// # Errors
    ///
    /// Returns `TaskNotFound` for an unknown id.
    pub async fn archive_task(&mut self, task_id: &TaskId) -> Result<(), BoardError> {
        let outcome = ordering::archive(&self.active(), task_id, Utc::now())?;

        let mut tasks: Vec<Task> = self
            .tasks
            .iter()
            .filter(|t| !t.is_active() && t.id != *task_id)
            .cloned()
            .collect();
        tasks.push(outcome.archived.clone());
        tasks.extend(outcome.active);
        self.tasks = tasks;

        let mut mutations = Vec::with_capacity(outcome.changed.len() + 1);
        let mut archive_fields = Fields::new();
        archive_fields.insert("status".to_string(), Value::String("done".to_string()));
        archive_fields.insert(
            "completedAt".to_string(),
            serde_json::to_value(outcome.archived.completed_at)
                .map_err(foard_model::ModelError::from)?,
        );
        mutations.push(Mutation::merge(
            self.tasks_collection(),
            outcome.archived.id.to_string(),
            archive_fields,
        ));
        for task in &outcome.changed {
            mutations.push(Mutation::merge(
                self.tasks_collection(),
                task.id.to_string(),
                position_fields(task),
            ));
        }
        self.store.commit_batch(mutations).await?;

        tracing::debug!(board_id = %self.board_id, task = %task_id, "task archived");
        Ok(())
    }

    /// Hard-deletes a task, active or archived.
    ///
    /// # Errors
    ///
    /// Returns `TaskNotFound` for an unknown id.
    pub async fn delete_task(&mut self, task_id: &TaskId) -> Result<(), BoardError> {
        let outcome = ordering::remove(&self.tasks, task_id)?;
        self.tasks = outcome.tasks;

        let mut mutations = Vec::with_capacity(outcome.changed.len() + 1);
        mutations.push(Mutation::delete(
            self.tasks_collection(),
            outcome.removed.id.to_string(),
        ));
        for task in &outcome.changed {
            mutations.push(Mutation::merge(
                self.tasks_collection(),
                task.id.to_string(),
                position_fields(task),
            ));
        }
        self.store.commit_batch(mutations).await?;

        tracing::debug!(board_id = %self.board_id, task = %task_id, "task deleted");
        Ok(())
    }

    /// Persists the position delta of a reorder or move as one batch.
    async fn persist_positions(&self, changed: &[Task]) -> Result<(), BoardError> {
        if changed.is_empty() {
            return Ok(());
        }
        let mutations = changed
            .iter()
            .map(|task| {
                Mutation::merge(
                    self.tasks_collection(),
                    task.id.to_string(),
                    position_fields(task),
                )
            })
            .collect();
        self.store.commit_batch(mutations).await?;
        Ok(())
    }
}
