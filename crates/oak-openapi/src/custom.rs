//! Locally authored actions that shadow or extend the projected catalog.

use crate::error::{OpenApiError, Result};
use oak_core::{consts, gzip, Action, ActionContext, ExecuteActionRequest, ExecuteActionResponse};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Handler invoked when a custom action executes; the OpenAPI pipeline is
/// bypassed entirely.
pub type ActionHandler = Arc<
    dyn Fn(
            Arc<ActionContext>,
            ExecuteActionRequest,
        ) -> Pin<Box<dyn Future<Output = Result<ExecuteActionResponse>> + Send>>
        + Send
        + Sync,
>;

/// Registry of handlers plus the on-disk directory their public definitions
/// live in (`*.action.yaml`, one action per file).
#[derive(Clone, Default)]
pub struct CustomActions {
    handlers: HashMap<String, ActionHandler>,
    actions_dir: PathBuf,
}

impl std::fmt::Debug for CustomActions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomActions")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("actions_dir", &self.actions_dir)
            .finish()
    }
}

impl CustomActions {
    pub fn new(actions_dir: impl Into<PathBuf>) -> Self {
        Self {
            handlers: HashMap::new(),
            actions_dir: actions_dir.into(),
        }
    }

    /// Register a handler under an action name.
    pub fn register<F, Fut>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arc<ActionContext>, ExecuteActionRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ExecuteActionResponse>> + Send + 'static,
    {
        self.handlers.insert(
            name.into(),
            Arc::new(move |ctx, request| Box::pin(handler(ctx, request))),
        );
        self
    }

    pub fn has_action(&self, action_name: &str) -> bool {
        self.handlers.contains_key(action_name)
    }

    pub fn action_names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Execute a registered handler.
    pub async fn execute(
        &self,
        ctx: Arc<ActionContext>,
        request: &ExecuteActionRequest,
    ) -> Result<ExecuteActionResponse> {
        let handler = self
            .handlers
            .get(&request.name)
            .ok_or_else(|| OpenApiError::UnknownAction(request.name.clone()))?;

        handler(ctx, request.clone()).await
    }

    /// Read the public definitions of all custom actions from disk. In prod
    /// mode the directory's gzip bundles are unpacked first. Unreadable
    /// files are logged and skipped.
    pub fn load_actions(&self) -> Vec<Action> {
        if self.actions_dir.as_os_str().is_empty() {
            return Vec::new();
        }

        if consts::prod_enabled() {
            unzip_action_bundles(&self.actions_dir);
        }

        let entries = match std::fs::read_dir(&self.actions_dir) {
            Ok(entries) => entries,
            Err(err) => {
                error!(dir = %self.actions_dir.display(), "failed to read custom actions: {err}");
                return Vec::new();
            }
        };

        let mut actions = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path
                .to_string_lossy()
                .ends_with(consts::ACTION_FILE_SUFFIX)
            {
                continue;
            }

            match read_action_file(&path) {
                Ok(action) => actions.push(action),
                Err(err) => {
                    error!(file = %path.display(), "failed to load custom action: {err}");
                }
            }
        }

        actions.sort_by(|a, b| a.name.cmp(&b.name));
        actions
    }
}

fn read_action_file(path: &Path) -> Result<Action> {
    let data = std::fs::read(path)?;
    Ok(serde_yaml::from_slice(&data)?)
}

fn unzip_action_bundles(dir: &Path) {
    info!(dir = %dir.display(), "prod environment, unpacking custom action bundles");

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %dir.display(), "cannot scan for bundles: {err}");
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Some(path_str) = path.to_str() else {
            continue;
        };
        if let Some(plain) = path_str.strip_suffix(consts::GZIP_SUFFIX) {
            if let Err(err) = gzip::unzip_file(plain) {
                error!(file = %path.display(), "failed to unpack bundle: {err}");
            }
        }
    }
}
