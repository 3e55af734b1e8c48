//! Field visibility for response shaping.
//!
//! A [`FieldVisibility`] is parsed from a filter expression of
//! comma-separated dotted paths:
//!
//! - `*` exposes every field
//! - `user.name` exposes that path (and nothing else unless `*` is present)
//! - `-user.password` hides that path
//!
//! Paths descend through arrays, so `roles.name` applies to every element
//! of a `roles` array.
//!
//! The descriptor for the in-flight request lives in a request-scoped slot.
//! Two shapes are offered: [`VisibilitySlot`] with an RAII guard for
//! synchronous code, and [`scope`]/[`current`] which bind the descriptor to
//! the tokio task running the request.

use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

type FieldPath = Vec<String>;

/// Which response fields the current request may expose.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldVisibility {
    wildcard: bool,
    includes: Vec<FieldPath>,
    excludes: Vec<FieldPath>,
}

impl FieldVisibility {
    /// A descriptor that exposes everything.
    #[must_use]
    pub fn all() -> Self {
        Self {
            wildcard: true,
            includes: Vec::new(),
            excludes: Vec::new(),
        }
    }

    /// Parses a filter expression.
    ///
    /// Blank segments are ignored. An expression with no inclusions (only
    /// exclusions, or nothing at all) exposes everything not excluded.
    #[must_use]
    pub fn parse(expression: &str) -> Self {
        let mut visibility = Self::default();

        for segment in expression.split(',').map(str::trim) {
            if segment.is_empty() {
                continue;
            }
            if segment == "*" {
                visibility.wildcard = true;
                continue;
            }
            if let Some(excluded) = segment.strip_prefix('-') {
                if let Some(path) = parse_path(excluded) {
                    visibility.excludes.push(path);
                }
                continue;
            }
            if let Some(path) = parse_path(segment) {
                visibility.includes.push(path);
            }
        }

        if visibility.includes.is_empty() {
            visibility.wildcard = true;
        }

        visibility
    }

    /// Returns true if every field not explicitly excluded is exposed.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Returns true if the dotted path would survive [`apply`](Self::apply).
    #[must_use]
    pub fn exposes(&self, path: &str) -> bool {
        let Some(path) = parse_path(path) else {
            return false;
        };

        if self.excludes.iter().any(|excluded| path.starts_with(excluded)) {
            return false;
        }

        self.wildcard
            || self
                .includes
                .iter()
                .any(|included| path.starts_with(included) || included.starts_with(&path))
    }

    /// Shapes a JSON value in place.
    pub fn apply(&self, value: &mut Value) {
        if !self.wildcard {
            *value = retain_paths(value, &self.includes);
        }
        for path in &self.excludes {
            remove_path(value, path);
        }
    }

    /// Returns a shaped copy of a JSON value.
    #[must_use]
    pub fn filtered(&self, value: &Value) -> Value {
        let mut copy = value.clone();
        self.apply(&mut copy);
        copy
    }
}

impl fmt::Display for FieldVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.wildcard {
            parts.push("*".to_string());
        }
        parts.extend(self.includes.iter().map(|path| path.join(".")));
        parts.extend(self.excludes.iter().map(|path| format!("-{}", path.join("."))));
        f.write_str(&parts.join(","))
    }
}

fn parse_path(raw: &str) -> Option<FieldPath> {
    let path: FieldPath = raw.trim().split('.').map(str::to_string).collect();
    if path.iter().any(String::is_empty) {
        return None;
    }
    Some(path)
}

fn retain_paths(value: &Value, paths: &[FieldPath]) -> Value {
    match value {
        Value::Object(map) => {
            let mut kept = Map::new();
            for (key, child) in map {
                let tails: Vec<FieldPath> = paths
                    .iter()
                    .filter(|path| path.first() == Some(key))
                    .map(|path| path[1..].to_vec())
                    .collect();
                if tails.is_empty() {
                    continue;
                }
                if tails.iter().any(Vec::is_empty) {
                    kept.insert(key.clone(), child.clone());
                } else {
                    kept.insert(key.clone(), retain_paths(child, &tails));
                }
            }
            Value::Object(kept)
        }
        Value::Array(items) => Value::Array(items.iter().map(|item| retain_paths(item, paths)).collect()),
        other => other.clone(),
    }
}

fn remove_path(value: &mut Value, path: &[String]) {
    let Some((head, rest)) = path.split_first() else {
        return;
    };
    match value {
        Value::Object(map) => {
            if rest.is_empty() {
                map.remove(head);
            } else if let Some(child) = map.get_mut(head) {
                remove_path(child, rest);
            }
        }
        Value::Array(items) => {
            for item in items {
                remove_path(item, path);
            }
        }
        _ => {}
    }
}

/// Lifecycle of a [`VisibilitySlot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotState {
    /// Nothing set yet for this request.
    Empty,
    /// A descriptor is installed.
    Set(FieldVisibility),
    /// The descriptor was released; reads behave as `Empty`.
    Cleared,
}

/// A single mutable visibility slot owned by one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilitySlot {
    state: SlotState,
}

impl VisibilitySlot {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SlotState::Empty,
        }
    }

    /// Installs a descriptor, replacing any previous one.
    pub fn set(&mut self, visibility: FieldVisibility) {
        self.state = SlotState::Set(visibility);
    }

    /// Returns the installed descriptor.
    #[must_use]
    pub fn get(&self) -> Option<&FieldVisibility> {
        match &self.state {
            SlotState::Set(visibility) => Some(visibility),
            SlotState::Empty | SlotState::Cleared => None,
        }
    }

    /// Releases the descriptor.
    pub fn clear(&mut self) {
        self.state = SlotState::Cleared;
    }

    #[must_use]
    pub fn state(&self) -> &SlotState {
        &self.state
    }

    /// Installs a descriptor for the lifetime of the returned guard.
    ///
    /// The slot is cleared when the guard drops, including during unwinding.
    pub fn enter(&mut self, visibility: FieldVisibility) -> SlotGuard<'_> {
        self.set(visibility);
        SlotGuard { slot: self }
    }
}

impl Default for VisibilitySlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears its [`VisibilitySlot`] on drop.
#[derive(Debug)]
pub struct SlotGuard<'a> {
    slot: &'a mut VisibilitySlot,
}

impl SlotGuard<'_> {
    /// Returns the descriptor installed by this guard.
    #[must_use]
    pub fn get(&self) -> Option<&FieldVisibility> {
        self.slot.get()
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.slot.clear();
    }
}

tokio::task_local! {
    static CURRENT_VISIBILITY: Option<Arc<FieldVisibility>>;
}

/// Runs `future` with `visibility` bound to the current task.
///
/// The binding ends when the future completes or is dropped, so a
/// cancelled request releases its descriptor as well.
pub async fn scope<F>(visibility: Option<FieldVisibility>, future: F) -> F::Output
where
    F: Future,
{
    CURRENT_VISIBILITY
        .scope(visibility.map(Arc::new), future)
        .await
}

/// Returns the descriptor bound by the enclosing [`scope`], if any.
#[must_use]
pub fn current() -> Option<Arc<FieldVisibility>> {
    CURRENT_VISIBILITY.try_with(Clone::clone).ok().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_body() -> Value {
        json!({
            "token": "abc",
            "user": {
                "id": 1,
                "username": "alice",
                "password": "hash",
                "remark": "note",
                "roles": [
                    {"id": 1, "name": "admin", "roleType": "ROOT"},
                    {"id": 2, "name": "ops", "roleType": "ORDINARY"}
                ]
            }
        })
    }

    #[test]
    fn wildcard_with_exclusions_removes_paths() {
        let visibility = FieldVisibility::parse("*,-user.password,-user.remark");
        let body = visibility.filtered(&sample_body());

        assert_eq!(body["token"], "abc");
        assert_eq!(body["user"]["username"], "alice");
        assert!(body["user"].get("password").is_none());
        assert!(body["user"].get("remark").is_none());
    }

    #[test]
    fn inclusions_keep_only_named_paths() {
        let visibility = FieldVisibility::parse("user.username,user.roles.name");
        let body = visibility.filtered(&sample_body());

        assert_eq!(
            body,
            json!({
                "user": {
                    "username": "alice",
                    "roles": [{"name": "admin"}, {"name": "ops"}]
                }
            })
        );
    }

    #[test]
    fn exclusions_descend_through_arrays() {
        let visibility = FieldVisibility::parse("-user.roles.roleType");
        let body = visibility.filtered(&sample_body());

        let roles = body["user"]["roles"].as_array().expect("roles array");
        assert!(roles.iter().all(|role| role.get("roleType").is_none()));
        assert!(roles.iter().all(|role| role.get("name").is_some()));
    }

    #[test]
    fn empty_expression_exposes_everything() {
        let visibility = FieldVisibility::parse(" , ");
        assert!(visibility.is_wildcard());
        assert_eq!(visibility.filtered(&sample_body()), sample_body());
    }

    #[test]
    fn malformed_segments_are_ignored() {
        let visibility = FieldVisibility::parse("*,-,-user..password,user.");
        assert_eq!(visibility, FieldVisibility::all());
    }

    #[test]
    fn exposes_answers_per_path() {
        let visibility = FieldVisibility::parse("user,-user.password");
        assert!(visibility.exposes("user"));
        assert!(visibility.exposes("user.username"));
        assert!(!visibility.exposes("user.password"));
        assert!(!visibility.exposes("token"));
    }

    #[test]
    fn display_renders_expression() {
        let visibility = FieldVisibility::parse("*, -user.password");
        assert_eq!(visibility.to_string(), "*,-user.password");
    }

    #[test]
    fn slot_follows_set_then_clear() {
        let mut slot = VisibilitySlot::new();
        assert_eq!(slot.state(), &SlotState::Empty);
        assert!(slot.get().is_none());

        slot.set(FieldVisibility::all());
        assert!(slot.get().is_some());

        slot.clear();
        assert_eq!(slot.state(), &SlotState::Cleared);
        assert!(slot.get().is_none());

        slot.set(FieldVisibility::parse("user"));
        assert!(slot.get().is_some());
    }

    #[test]
    fn guard_clears_slot_on_drop() {
        let mut slot = VisibilitySlot::new();
        {
            let guard = slot.enter(FieldVisibility::parse("-user.password"));
            assert!(guard.get().is_some());
        }
        assert_eq!(slot.state(), &SlotState::Cleared);
        assert!(slot.get().is_none());
    }

    #[test]
    fn guard_clears_slot_on_panic() {
        let mut slot = VisibilitySlot::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = slot.enter(FieldVisibility::all());
            panic!("handler failed");
        }));
        assert!(result.is_err());
        assert_eq!(slot.state(), &SlotState::Cleared);
    }

    #[tokio::test]
    async fn current_is_none_outside_scope() {
        assert!(current().is_none());
    }

    #[tokio::test]
    async fn scope_binds_and_releases() {
        let seen = scope(Some(FieldVisibility::parse("user")), async {
            current().map(|visibility| visibility.to_string())
        })
        .await;

        assert_eq!(seen.as_deref(), Some("user"));
        assert!(current().is_none());
    }

    #[tokio::test]
    async fn concurrent_scopes_are_isolated() {
        let first = tokio::spawn(scope(Some(FieldVisibility::parse("a")), async {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            current().map(|visibility| visibility.to_string())
        }));
        let second = tokio::spawn(scope(None, async {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            current().map(|visibility| visibility.to_string())
        }));

        assert_eq!(first.await.expect("join").as_deref(), Some("a"));
        assert_eq!(second.await.expect("join"), None);
    }
}
