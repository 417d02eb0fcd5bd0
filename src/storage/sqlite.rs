//! `SQLite` storage implementation.

use crate::error::{Result, TrackerError};
use crate::model::{
    Comment, Component, Event, EventType, Issue, Priority, SavedView, Severity, Status, Team,
};
use crate::query::{CompiledFilter, sql};
use crate::storage::events::{get_events, insert_event};
use crate::storage::schema::apply_schema;
use crate::storage::{IssuePage, IssueQueryExecutor, IssueUpdate, PageRequest};
use crate::util::time::format_storage;
use crate::validation::{CommentValidator, IssueValidator, RegistryValidator, ViewValidator};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Transaction};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

const ISSUE_COLUMNS: &str = "issues.id, issues.title, issues.description, issues.reproduce_steps, \
     issues.component_id, issues.reporter_id, issues.assignee_id, issues.priority, \
     issues.severity, issues.status, issues.due_date, issues.created_at, issues.updated_at";

const VIEW_COLUMNS: &str =
    "id, name, owner_id, is_team_view, team_id, query_string, created_at, updated_at";

const TEAM_COLUMNS: &str = "id, name, description, lead_id, created_at, updated_at";

const COMPONENT_COLUMNS: &str =
    "id, name, description, owner_id, team_id, created_at, updated_at";

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

/// Context for a mutation operation, collecting audit events.
pub struct MutationContext {
    pub op_name: String,
    pub actor: String,
    pub now: DateTime<Utc>,
    pub events: Vec<Event>,
}

impl MutationContext {
    #[must_use]
    pub fn new(op_name: &str, actor: &str, now: DateTime<Utc>) -> Self {
        Self {
            op_name: op_name.to_string(),
            actor: actor.to_string(),
            now,
            events: Vec::new(),
        }
    }

    pub fn record_event(&mut self, event_type: EventType, issue_id: Uuid, details: Option<String>) {
        self.record_field_change(event_type, issue_id, None, None, details);
    }

    /// Record a field change event with old and new values.
    pub fn record_field_change(
        &mut self,
        event_type: EventType,
        issue_id: Uuid,
        old_value: Option<String>,
        new_value: Option<String>,
        comment: Option<String>,
    ) {
        self.events.push(Event {
            id: 0,
            issue_id,
            event_type,
            actor: self.actor.clone(),
            old_value,
            new_value,
            comment,
            created_at: self.now,
        });
    }
}

impl SqliteStorage {
    /// Open a new connection to the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema application fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a new connection with an optional busy timeout (ms).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema application fails.
    pub fn open_with_timeout(path: &Path, lock_timeout_ms: Option<u64>) -> Result<Self> {
        let conn = Connection::open(path)?;
        if let Some(timeout) = lock_timeout_ms {
            conn.busy_timeout(Duration::from_millis(timeout))?;
        }
        apply_schema(&conn)?;
        debug!(path = %path.display(), "Opened database");
        Ok(Self { conn })
    }

    /// Open an in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Run `f` in an immediate transaction, then write the events it
    /// recorded. Everything rolls back if any step fails.
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails.
    pub fn mutate<F, R>(&mut self, op: &str, actor: &str, now: DateTime<Utc>, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction, &mut MutationContext) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        let mut ctx = MutationContext::new(op, actor, now);

        let result = f(&tx, &mut ctx)?;

        for event in &ctx.events {
            insert_event(&tx, event)?;
        }

        tx.commit()?;
        debug!(op = %ctx.op_name, events = ctx.events.len(), "Committed mutation");

        Ok(result)
    }

    /// Insert a new issue with its labels.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad fields, or a database error
    /// (e.g. ID collision).
    pub fn create_issue(&mut self, issue: &Issue, actor: &str) -> Result<()> {
        IssueValidator::validate(issue).map_err(TrackerError::from_validation_errors)?;

        self.mutate("create_issue", actor, issue.created_at, |tx, ctx| {
            tx.execute(
                "INSERT INTO issues (
                    id, title, description, reproduce_steps, component_id, reporter_id,
                    assignee_id, priority, severity, status, due_date, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                rusqlite::params![
                    issue.id.to_string(),
                    issue.title,
                    issue.description,
                    issue.reproduce_steps,
                    issue.component_id.to_string(),
                    issue.reporter_id.to_string(),
                    issue.assignee_id.map(|id| id.to_string()),
                    issue.priority.as_str(),
                    issue.severity.as_str(),
                    issue.status.as_str(),
                    issue.due_date.as_ref().map(format_storage),
                    format_storage(&issue.created_at),
                    format_storage(&issue.updated_at),
                ],
            )?;

            for label in &issue.labels {
                tx.execute(
                    "INSERT OR IGNORE INTO labels (issue_id, label) VALUES (?1, ?2)",
                    rusqlite::params![issue.id.to_string(), label],
                )?;
            }

            ctx.record_event(
                EventType::Created,
                issue.id,
                Some(format!("Created issue: {}", issue.title)),
            );

            Ok(())
        })
    }

    /// Get an issue by ID, labels included.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_issue(&self, id: &Uuid) -> Result<Option<Issue>> {
        let sql = format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE issues.id = ?1");
        let issue = self
            .conn
            .query_row(&sql, [id.to_string()], issue_from_row)
            .optional()?;

        match issue {
            Some(mut issue) => {
                issue.labels = self.get_labels(&issue.id)?;
                Ok(Some(issue))
            }
            None => Ok(None),
        }
    }

    /// Get an issue or fail with `IssueNotFound`.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` if absent, or a database error.
    pub fn require_issue(&self, id: &Uuid) -> Result<Issue> {
        self.get_issue(id)?
            .ok_or_else(|| TrackerError::IssueNotFound { id: id.to_string() })
    }

    /// Apply `updates` to an issue and bump `updated_at` to `now`.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound`, a validation error, or a database error.
    #[allow(clippy::too_many_lines)]
    pub fn update_issue(
        &mut self,
        id: &Uuid,
        updates: &IssueUpdate,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Issue> {
        let mut issue = self.require_issue(id)?;

        if updates.is_empty() {
            return Ok(issue);
        }

        let old_status = issue.status.clone();
        let old_assignee = issue.assignee_id;

        if let Some(ref title) = updates.title {
            issue.title.clone_from(title);
        }
        if let Some(ref description) = updates.description {
            issue.description.clone_from(description);
        }
        if let Some(ref steps) = updates.reproduce_steps {
            issue.reproduce_steps.clone_from(steps);
        }
        if let Some(component_id) = updates.component_id {
            issue.component_id = component_id;
        }
        issue.updated_at = now;
        for label in &updates.add_labels {
            if !issue.labels.contains(label) {
                issue.labels.push(label.clone());
            }
        }
        issue.labels.retain(|label| !updates.remove_labels.contains(label));
        issue.labels.sort();

        let mut next = issue.clone();
        if let Some(ref status) = updates.status {
            next.status.clone_from(status);
        }
        if let Some(ref priority) = updates.priority {
            next.priority.clone_from(priority);
        }
        if let Some(ref severity) = updates.severity {
            next.severity.clone_from(severity);
        }
        if let Some(assignee) = updates.assignee_id {
            next.assignee_id = assignee;
        }
        if let Some(due) = updates.due_date {
            next.due_date = due;
        }
        IssueValidator::validate(&next).map_err(TrackerError::from_validation_errors)?;

        self.mutate("update_issue", actor, now, |tx, ctx| {
            let mut set_clauses: Vec<&str> = vec![];
            let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![];

            let mut add_update = |field: &'static str, val: Box<dyn rusqlite::ToSql>| {
                set_clauses.push(field);
                params.push(val);
            };

            if updates.title.is_some() {
                add_update("title", Box::new(next.title.clone()));
            }
            if updates.description.is_some() {
                add_update("description", Box::new(next.description.clone()));
            }
            if updates.reproduce_steps.is_some() {
                add_update("reproduce_steps", Box::new(next.reproduce_steps.clone()));
            }
            if updates.component_id.is_some() {
                add_update("component_id", Box::new(next.component_id.to_string()));
            }

            if issue.status != next.status {
                add_update("status", Box::new(next.status.as_str().to_string()));
                ctx.record_field_change(
                    EventType::StatusChanged,
                    *id,
                    Some(issue.status.as_str().to_string()),
                    Some(next.status.as_str().to_string()),
                    None,
                );
            }

            if issue.priority != next.priority {
                add_update("priority", Box::new(next.priority.as_str().to_string()));
                ctx.record_field_change(
                    EventType::PriorityChanged,
                    *id,
                    Some(issue.priority.as_str().to_string()),
                    Some(next.priority.as_str().to_string()),
                    None,
                );
            }

            if issue.severity != next.severity {
                add_update("severity", Box::new(next.severity.as_str().to_string()));
                ctx.record_field_change(
                    EventType::SeverityChanged,
                    *id,
                    Some(issue.severity.as_str().to_string()),
                    Some(next.severity.as_str().to_string()),
                    None,
                );
            }

            if issue.assignee_id != next.assignee_id {
                add_update(
                    "assignee_id",
                    Box::new(next.assignee_id.map(|a| a.to_string())),
                );
                ctx.record_field_change(
                    EventType::AssigneeChanged,
                    *id,
                    issue.assignee_id.map(|a| a.to_string()),
                    next.assignee_id.map(|a| a.to_string()),
                    None,
                );
            }

            if issue.due_date != next.due_date {
                add_update("due_date", Box::new(next.due_date.as_ref().map(format_storage)));
                ctx.record_field_change(
                    EventType::DueDateChanged,
                    *id,
                    issue.due_date.as_ref().map(format_storage),
                    next.due_date.as_ref().map(format_storage),
                    None,
                );
            }

            add_update("updated_at", Box::new(format_storage(&now)));

            let assignments: Vec<String> = set_clauses
                .iter()
                .enumerate()
                .map(|(i, field)| format!("{field} = ?{}", i + 1))
                .collect();
            let sql = format!(
                "UPDATE issues SET {} WHERE id = ?{}",
                assignments.join(", "),
                params.len() + 1
            );
            params.push(Box::new(id.to_string()));
            let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(AsRef::as_ref).collect();
            tx.execute(&sql, params_refs.as_slice())?;

            if updates.title.is_some() || updates.description.is_some() {
                ctx.record_event(EventType::Updated, *id, Some("Text fields changed".to_string()));
            }

            for label in &updates.add_labels {
                let added = tx.execute(
                    "INSERT OR IGNORE INTO labels (issue_id, label) VALUES (?1, ?2)",
                    rusqlite::params![id.to_string(), label],
                )?;
                if added > 0 {
                    ctx.record_field_change(EventType::LabelAdded, *id, None, Some(label.clone()), None);
                }
            }
            for label in &updates.remove_labels {
                let removed = tx.execute(
                    "DELETE FROM labels WHERE issue_id = ?1 AND label = ?2",
                    rusqlite::params![id.to_string(), label],
                )?;
                if removed > 0 {
                    ctx.record_field_change(EventType::LabelRemoved, *id, Some(label.clone()), None, None);
                }
            }

            Ok(())
        })?;

        if old_status != next.status {
            info!(
                issue_id = %id,
                from = %old_status,
                to = %next.status,
                "Issue status changed"
            );
        }
        if old_assignee != next.assignee_id {
            info!(
                issue_id = %id,
                assignee = ?next.assignee_id,
                "Issue assignment changed"
            );
        }

        Ok(next)
    }

    /// Labels for one issue, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_labels(&self, issue_id: &Uuid) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT label FROM labels WHERE issue_id = ?1 ORDER BY label")?;
        let labels = stmt
            .query_map([issue_id.to_string()], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(labels)
    }

    fn attach_labels(&self, issues: &mut [Issue]) -> Result<()> {
        if issues.is_empty() {
            return Ok(());
        }

        let placeholders: Vec<String> = (1..=issues.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "SELECT issue_id, label FROM labels WHERE issue_id IN ({}) ORDER BY issue_id, label",
            placeholders.join(",")
        );
        let ids: Vec<String> = issues.iter().map(|issue| issue.id.to_string()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let mut by_issue: HashMap<String, Vec<String>> = HashMap::new();
        let rows = stmt.query_map(rusqlite::params_from_iter(ids.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (issue_id, label) = row?;
            by_issue.entry(issue_id).or_default().push(label);
        }

        for issue in issues.iter_mut() {
            if let Some(labels) = by_issue.remove(&issue.id.to_string()) {
                issue.labels = labels;
            }
        }
        Ok(())
    }

    fn run_filter(&self, filter: &CompiledFilter, page: PageRequest) -> Result<IssuePage> {
        let rendered = sql::render(filter);
        let where_sql = rendered
            .where_clause
            .as_deref()
            .map_or_else(String::new, |clause| format!(" WHERE {clause}"));
        let params = rendered.param_refs();

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM issues{where_sql}"),
            params.as_slice(),
            |row| row.get(0),
        )?;

        let limit = i64::try_from(page.limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(page.offset).unwrap_or(i64::MAX);
        let n = params.len();
        let page_sql = format!(
            "SELECT {ISSUE_COLUMNS} FROM issues{where_sql} \
             ORDER BY issues.created_at DESC, issues.id DESC LIMIT ?{} OFFSET ?{}",
            n + 1,
            n + 2
        );
        let mut page_params = params;
        page_params.push(&limit);
        page_params.push(&offset);

        let mut stmt = self.conn.prepare(&page_sql)?;
        let mut issues = stmt
            .query_map(page_params.as_slice(), issue_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.attach_labels(&mut issues)?;

        debug!(
            total,
            returned = issues.len(),
            offset = page.offset,
            "Executed issue query"
        );

        Ok(IssuePage {
            issues,
            total: usize::try_from(total).unwrap_or(0),
        })
    }

    /// Add a comment to an issue.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound`, a validation error, or a database error.
    pub fn add_comment(
        &mut self,
        issue_id: &Uuid,
        author_id: Uuid,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<Comment> {
        self.require_issue(issue_id)?;

        let comment = Comment {
            id: Uuid::new_v4(),
            issue_id: *issue_id,
            author_id,
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };
        CommentValidator::validate(&comment)
            .map_err(|e| TrackerError::from_validation_errors(vec![e]))?;

        self.mutate("add_comment", &author_id.to_string(), now, |tx, ctx| {
            tx.execute(
                "INSERT INTO comments (id, issue_id, author_id, content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    comment.id.to_string(),
                    comment.issue_id.to_string(),
                    comment.author_id.to_string(),
                    comment.content,
                    format_storage(&comment.created_at),
                    format_storage(&comment.updated_at),
                ],
            )?;
            ctx.record_event(EventType::Commented, *issue_id, Some(content.to_string()));
            Ok(())
        })?;

        Ok(comment)
    }

    /// Get comments for an issue, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_comments(&self, issue_id: &Uuid) -> Result<Vec<Comment>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, issue_id, author_id, content, created_at, updated_at
             FROM comments
             WHERE issue_id = ?1
             ORDER BY created_at ASC, rowid ASC",
        )?;

        let comments = stmt
            .query_map([issue_id.to_string()], |row| {
                Ok(Comment {
                    id: uuid_col(row, 0)?,
                    issue_id: uuid_col(row, 1)?,
                    author_id: uuid_col(row, 2)?,
                    content: row.get(3)?,
                    created_at: ts_col(row, 4)?,
                    updated_at: ts_col(row, 5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(comments)
    }

    /// Audit events for an issue, newest first. `limit` 0 means all.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_events(&self, issue_id: &Uuid, limit: usize) -> Result<Vec<Event>> {
        get_events(&self.conn, issue_id, limit)
    }

    /// Save a view.
    ///
    /// # Errors
    ///
    /// Returns a validation error or a database error.
    pub fn create_view(&mut self, view: &SavedView) -> Result<()> {
        ViewValidator::validate(view).map_err(TrackerError::from_validation_errors)?;

        self.conn.execute(
            &format!("INSERT INTO saved_views ({VIEW_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
            rusqlite::params![
                view.id.to_string(),
                view.name,
                view.owner_id.to_string(),
                i32::from(view.is_team_view),
                view.team_id.map(|id| id.to_string()),
                view.query_string,
                format_storage(&view.created_at),
                format_storage(&view.updated_at),
            ],
        )?;
        debug!(view_id = %view.id, name = %view.name, "Saved view");
        Ok(())
    }

    /// Get a saved view by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_view(&self, id: &Uuid) -> Result<Option<SavedView>> {
        let view = self
            .conn
            .query_row(
                &format!("SELECT {VIEW_COLUMNS} FROM saved_views WHERE id = ?1"),
                [id.to_string()],
                view_from_row,
            )
            .optional()?;
        Ok(view)
    }

    /// Views owned by `owner` plus every team view, sorted by name.
    ///
    /// Team membership is not modelled, so team views are visible to all.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_views(&self, owner: &Uuid) -> Result<Vec<SavedView>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {VIEW_COLUMNS} FROM saved_views
             WHERE owner_id = ?1 OR is_team_view = 1
             ORDER BY name, id"
        ))?;
        let views = stmt
            .query_map([owner.to_string()], view_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(views)
    }

    /// Delete a view owned by `owner`. Returns false if nothing matched.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub fn delete_view(&mut self, id: &Uuid, owner: &Uuid) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM saved_views WHERE id = ?1 AND owner_id = ?2",
            [id.to_string(), owner.to_string()],
        )?;
        Ok(rows > 0)
    }

    /// Register a team. Names are unique.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad or taken name, or a database error.
    pub fn create_team(&mut self, team: &Team) -> Result<()> {
        RegistryValidator::validate_name(&team.name)
            .map_err(|e| TrackerError::from_validation_errors(vec![e]))?;
        self.ensure_name_free("teams", &team.name)?;

        self.conn.execute(
            &format!("INSERT INTO teams ({TEAM_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
            rusqlite::params![
                team.id.to_string(),
                team.name,
                team.description,
                team.lead_id.to_string(),
                format_storage(&team.created_at),
                format_storage(&team.updated_at),
            ],
        )?;
        info!(team_id = %team.id, name = %team.name, "Registered team");
        Ok(())
    }

    /// Get a team by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_team(&self, id: &Uuid) -> Result<Option<Team>> {
        let team = self
            .conn
            .query_row(
                &format!("SELECT {TEAM_COLUMNS} FROM teams WHERE id = ?1"),
                [id.to_string()],
                team_from_row,
            )
            .optional()?;
        Ok(team)
    }

    /// Get a team by ID or fail with `TeamNotFound`.
    ///
    /// # Errors
    ///
    /// Returns `TeamNotFound` or a database error.
    pub fn require_team(&self, id: &Uuid) -> Result<Team> {
        self.get_team(id)?
            .ok_or_else(|| TrackerError::TeamNotFound { id: id.to_string() })
    }

    /// All teams, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_teams(&self) -> Result<Vec<Team>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {TEAM_COLUMNS} FROM teams ORDER BY name, id"))?;
        let teams = stmt
            .query_map([], team_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(teams)
    }

    /// Register a component. Names are unique and the owning team, if any,
    /// must exist.
    ///
    /// # Errors
    ///
    /// Returns a validation error, `TeamNotFound`, or a database error.
    pub fn create_component(&mut self, component: &Component) -> Result<()> {
        RegistryValidator::validate_name(&component.name)
            .map_err(|e| TrackerError::from_validation_errors(vec![e]))?;
        self.ensure_name_free("components", &component.name)?;
        if let Some(team_id) = &component.team_id {
            self.require_team(team_id)?;
        }

        self.conn.execute(
            &format!(
                "INSERT INTO components ({COMPONENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
            ),
            rusqlite::params![
                component.id.to_string(),
                component.name,
                component.description,
                component.owner_id.to_string(),
                component.team_id.map(|id| id.to_string()),
                format_storage(&component.created_at),
                format_storage(&component.updated_at),
            ],
        )?;
        info!(component_id = %component.id, name = %component.name, "Registered component");
        Ok(())
    }

    /// Get a component by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_component(&self, id: &Uuid) -> Result<Option<Component>> {
        let component = self
            .conn
            .query_row(
                &format!("SELECT {COMPONENT_COLUMNS} FROM components WHERE id = ?1"),
                [id.to_string()],
                component_from_row,
            )
            .optional()?;
        Ok(component)
    }

    /// Get a component by ID or fail with `ComponentNotFound`.
    ///
    /// # Errors
    ///
    /// Returns `ComponentNotFound` or a database error.
    pub fn require_component(&self, id: &Uuid) -> Result<Component> {
        self.get_component(id)?
            .ok_or_else(|| TrackerError::ComponentNotFound { id: id.to_string() })
    }

    /// Components sorted by name, optionally only those owned by `team`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_components(&self, team: Option<&Uuid>) -> Result<Vec<Component>> {
        let components = match team {
            Some(team_id) => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {COMPONENT_COLUMNS} FROM components WHERE team_id = ?1 ORDER BY name, id"
                ))?;
                stmt.query_map([team_id.to_string()], component_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {COMPONENT_COLUMNS} FROM components ORDER BY name, id"
                ))?;
                stmt.query_map([], component_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
        };
        Ok(components)
    }

    fn ensure_name_free(&self, table: &str, name: &str) -> Result<()> {
        let taken: bool = self.conn.query_row(
            &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE name = ?1)"),
            [name],
            |row| row.get(0),
        )?;
        if taken {
            return Err(TrackerError::validation("name", format!("'{name}' already exists")));
        }
        Ok(())
    }
}

impl IssueQueryExecutor for SqliteStorage {
    fn execute(&self, filter: &CompiledFilter, page: PageRequest) -> Result<IssuePage> {
        self.run_filter(filter, page).map_err(|err| match err {
            TrackerError::Database(source) => TrackerError::query_execution(source),
            other => other,
        })
    }
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn uuid_col(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text).map_err(|e| conversion_error(idx, e))
}

fn opt_uuid_col(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    row.get::<_, Option<String>>(idx)?
        .map(|text| Uuid::parse_str(&text).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn ts_col(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn opt_ts_col(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    row.get::<_, Option<String>>(idx)?
        .map(|text| {
            DateTime::parse_from_rfc3339(&text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| conversion_error(idx, e))
        })
        .transpose()
}

fn issue_from_row(row: &rusqlite::Row) -> rusqlite::Result<Issue> {
    Ok(Issue {
        id: uuid_col(row, 0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        reproduce_steps: row.get(3)?,
        component_id: uuid_col(row, 4)?,
        reporter_id: uuid_col(row, 5)?,
        assignee_id: opt_uuid_col(row, 6)?,
        priority: Priority::parse_exact(&row.get::<_, String>(7)?),
        severity: Severity::parse_exact(&row.get::<_, String>(8)?),
        status: Status::parse_exact(&row.get::<_, String>(9)?),
        due_date: opt_ts_col(row, 10)?,
        created_at: ts_col(row, 11)?,
        updated_at: ts_col(row, 12)?,
        labels: vec![], // Loaded separately
    })
}

fn view_from_row(row: &rusqlite::Row) -> rusqlite::Result<SavedView> {
    Ok(SavedView {
        id: uuid_col(row, 0)?,
        name: row.get(1)?,
        owner_id: uuid_col(row, 2)?,
        is_team_view: row.get::<_, i32>(3)? != 0,
        team_id: opt_uuid_col(row, 4)?,
        query_string: row.get(5)?,
        created_at: ts_col(row, 6)?,
        updated_at: ts_col(row, 7)?,
    })
}

fn team_from_row(row: &rusqlite::Row) -> rusqlite::Result<Team> {
    Ok(Team {
        id: uuid_col(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        lead_id: uuid_col(row, 3)?,
        created_at: ts_col(row, 4)?,
        updated_at: ts_col(row, 5)?,
    })
}

fn component_from_row(row: &rusqlite::Row) -> rusqlite::Result<Component> {
    Ok(Component {
        id: uuid_col(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        owner_id: uuid_col(row, 3)?,
        team_id: opt_uuid_col(row, 4)?,
        created_at: ts_col(row, 5)?,
        updated_at: ts_col(row, 6)?,
    })
}

#[cfg(test)]
impl SqliteStorage {
    /// Execute raw SQL for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the SQL execution fails.
    pub fn execute_test_sql(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Identity;
    use crate::query::compile_str;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn make_issue(title: &str, status: Status, created_at: DateTime<Utc>) -> Issue {
        let mut issue = Issue::new(title, Uuid::new_v4(), Uuid::new_v4(), created_at);
        issue.status = status;
        issue
    }

    fn query(storage: &SqliteStorage, filter: &str) -> Vec<String> {
        let compiled = compile_str(filter, &Identity::anonymous());
        storage
            .execute(&compiled, PageRequest::first(100))
            .unwrap()
            .issues
            .into_iter()
            .map(|issue| issue.title)
            .collect()
    }

    #[test]
    fn test_open_memory() {
        let storage = SqliteStorage::open_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_open_file_with_timeout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bugtrack.db");
        let storage = SqliteStorage::open_with_timeout(&path, Some(1000)).unwrap();
        drop(storage);
        assert!(path.exists());
    }

    #[test]
    fn test_create_and_get_issue() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let mut issue = make_issue("Login fails", Status::New, base_time());
        issue.labels = vec!["ui".into(), "auth".into()];
        issue.due_date = Some(base_time() + Duration::hours(72));
        issue.priority = Priority::P1;
        storage.create_issue(&issue, "tester").unwrap();

        let loaded = storage.get_issue(&issue.id).unwrap().unwrap();
        assert_eq!(loaded.title, "Login fails");
        assert_eq!(loaded.priority, Priority::P1);
        assert_eq!(loaded.due_date, issue.due_date);
        assert_eq!(loaded.labels, vec!["auth", "ui"]);

        let events = storage.get_events(&issue.id, 0).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::Created);
    }

    #[test]
    fn test_create_rejects_empty_title() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let issue = make_issue("  ", Status::New, base_time());
        let err = storage.create_issue(&issue, "tester").unwrap_err();
        assert!(matches!(err, TrackerError::Validation { .. }));
    }

    #[test]
    fn test_get_missing_issue() {
        let storage = SqliteStorage::open_memory().unwrap();
        assert!(storage.get_issue(&Uuid::new_v4()).unwrap().is_none());
        assert!(matches!(
            storage.require_issue(&Uuid::new_v4()),
            Err(TrackerError::IssueNotFound { .. })
        ));
    }

    #[test]
    fn test_update_issue_records_events() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let issue = make_issue("Crash", Status::New, base_time());
        storage.create_issue(&issue, "tester").unwrap();

        let assignee = Uuid::new_v4();
        let later = base_time() + Duration::hours(2);
        let updates = IssueUpdate {
            status: Some(Status::Assigned),
            assignee_id: Some(Some(assignee)),
            add_labels: vec!["backend".into()],
            ..IssueUpdate::default()
        };
        let updated = storage.update_issue(&issue.id, &updates, "tester", later).unwrap();
        assert_eq!(updated.status, Status::Assigned);
        assert_eq!(updated.assignee_id, Some(assignee));
        assert_eq!(updated.updated_at, later);

        let reloaded = storage.require_issue(&issue.id).unwrap();
        assert_eq!(reloaded, updated);

        let types: Vec<EventType> = storage
            .get_events(&issue.id, 0)
            .unwrap()
            .into_iter()
            .map(|e| e.event_type)
            .collect();
        assert!(types.contains(&EventType::StatusChanged));
        assert!(types.contains(&EventType::AssigneeChanged));
        assert!(types.contains(&EventType::LabelAdded));
    }

    #[test]
    fn test_update_same_status_records_nothing() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let issue = make_issue("Crash", Status::New, base_time());
        storage.create_issue(&issue, "tester").unwrap();

        let updates = IssueUpdate {
            status: Some(Status::New),
            ..IssueUpdate::default()
        };
        storage
            .update_issue(&issue.id, &updates, "tester", base_time())
            .unwrap();
        assert_eq!(storage.get_events(&issue.id, 0).unwrap().len(), 1);
    }

    #[test]
    fn test_update_missing_issue() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let err = storage
            .update_issue(&Uuid::new_v4(), &IssueUpdate::default(), "tester", base_time())
            .unwrap_err();
        assert!(matches!(err, TrackerError::IssueNotFound { .. }));
    }

    #[test]
    fn test_execute_filters() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let mut a = make_issue("Login crash", Status::New, base_time());
        a.priority = Priority::P1;
        a.labels = vec!["ui".into()];
        let mut b = make_issue("Checkout timeout", Status::Closed, base_time() + Duration::days(1));
        b.description = "crash in payment worker".into();
        let c = make_issue("Typo on footer", Status::Fixed, base_time() + Duration::days(2));
        for issue in [&a, &b, &c] {
            storage.create_issue(issue, "tester").unwrap();
        }

        assert_eq!(query(&storage, ""), vec!["Typo on footer", "Checkout timeout", "Login crash"]);
        assert_eq!(query(&storage, "is:open"), vec!["Typo on footer", "Login crash"]);
        assert_eq!(query(&storage, "is:closed"), vec!["Checkout timeout"]);
        assert_eq!(query(&storage, "CRASH"), vec!["Checkout timeout", "Login crash"]);
        assert_eq!(query(&storage, "crash login"), vec!["Login crash"]);
        assert_eq!(query(&storage, "priority:P1 label:ui"), vec!["Login crash"]);
        assert_eq!(query(&storage, "status:FIXED"), vec!["Typo on footer"]);
        assert!(query(&storage, "component:frontend").is_empty());
        assert!(query(&storage, "team:payments").is_empty());
        assert_eq!(query(&storage, "after:2024-03-02"), vec!["Typo on footer", "Checkout timeout"]);
        assert_eq!(query(&storage, "before:2024-03-02"), vec!["Login crash"]);
        assert!(query(&storage, "50%").is_empty());
    }

    #[test]
    fn test_execute_total_and_window() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        for i in 0..5 {
            let issue = make_issue(&format!("issue {i}"), Status::New, base_time() + Duration::hours(i));
            storage.create_issue(&issue, "tester").unwrap();
        }
        let page = storage
            .execute(&CompiledFilter::match_all(), PageRequest { limit: 2, offset: 2 })
            .unwrap();
        assert_eq!(page.total, 5);
        let titles: Vec<_> = page.issues.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["issue 2", "issue 1"]);
    }

    #[test]
    fn test_execute_wraps_backend_failure() {
        let storage = SqliteStorage::open_memory().unwrap();
        storage.execute_test_sql("DROP TABLE labels; DROP TABLE issues;").unwrap();
        let err = storage
            .execute(&CompiledFilter::match_all(), PageRequest::first(10))
            .unwrap_err();
        assert!(matches!(err, TrackerError::QueryExecution { .. }));
    }

    #[test]
    fn test_comments_round_trip() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let issue = make_issue("Crash", Status::New, base_time());
        storage.create_issue(&issue, "tester").unwrap();
        let author = Uuid::new_v4();

        storage.add_comment(&issue.id, author, "first", base_time()).unwrap();
        storage
            .add_comment(&issue.id, author, "second", base_time() + Duration::minutes(1))
            .unwrap();

        let comments = storage.get_comments(&issue.id).unwrap();
        let contents: Vec<_> = comments.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);

        // Commenting leaves updated_at alone so SLA compliance is unaffected.
        assert_eq!(storage.require_issue(&issue.id).unwrap().updated_at, base_time());

        assert!(storage.add_comment(&issue.id, author, "  ", base_time()).is_err());
        assert!(matches!(
            storage.add_comment(&Uuid::new_v4(), author, "x", base_time()),
            Err(TrackerError::IssueNotFound { .. })
        ));
    }

    #[test]
    fn test_views() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        let team = Uuid::new_v4();
        let view = |name: &str, owner_id: Uuid, team_id: Option<Uuid>| SavedView {
            id: Uuid::new_v4(),
            name: name.to_string(),
            owner_id,
            is_team_view: team_id.is_some(),
            team_id,
            query_string: "is:open".to_string(),
            created_at: base_time(),
            updated_at: base_time(),
        };

        let mine = view("b-mine", owner, None);
        let theirs = view("c-theirs", other, None);
        let shared = view("a-team", other, Some(team));
        for v in [&mine, &theirs, &shared] {
            storage.create_view(v).unwrap();
        }

        assert_eq!(storage.get_view(&mine.id).unwrap(), Some(mine.clone()));
        let names: Vec<_> = storage
            .list_views(&owner)
            .unwrap()
            .into_iter()
            .map(|v| v.name)
            .collect();
        assert_eq!(names, vec!["a-team", "b-mine"]);

        assert!(!storage.delete_view(&mine.id, &other).unwrap());
        assert!(storage.delete_view(&mine.id, &owner).unwrap());
        assert!(storage.get_view(&mine.id).unwrap().is_none());
    }

    #[test]
    fn test_team_and_component_registry() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let lead = Uuid::new_v4();
        let team = Team {
            id: Uuid::new_v4(),
            name: "Payments".to_string(),
            description: String::new(),
            lead_id: lead,
            created_at: base_time(),
            updated_at: base_time(),
        };
        storage.create_team(&team).unwrap();
        assert_eq!(storage.require_team(&team.id).unwrap(), team);

        let component = |name: &str, team_id: Option<Uuid>| Component {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: "area".to_string(),
            owner_id: lead,
            team_id,
            created_at: base_time(),
            updated_at: base_time(),
        };
        let checkout = component("checkout", Some(team.id));
        let search = component("search", None);
        storage.create_component(&search).unwrap();
        storage.create_component(&checkout).unwrap();

        let names: Vec<_> = storage
            .list_components(None)
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["checkout", "search"]);
        assert_eq!(storage.list_components(Some(&team.id)).unwrap(), vec![checkout.clone()]);
        assert_eq!(storage.get_component(&checkout.id).unwrap(), Some(checkout));

        let duplicate = storage.create_component(&component("search", None)).unwrap_err();
        assert!(matches!(duplicate, TrackerError::Validation { ref field, .. } if field == "name"));

        let orphan = storage
            .create_component(&component("billing", Some(Uuid::new_v4())))
            .unwrap_err();
        assert!(matches!(orphan, TrackerError::TeamNotFound { .. }));

        let missing = storage.require_component(&Uuid::new_v4()).unwrap_err();
        assert!(matches!(missing, TrackerError::ComponentNotFound { .. }));
        assert_eq!(storage.list_teams().unwrap().len(), 1);
    }
}
