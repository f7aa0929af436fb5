//! Binds the git controllers to gateway method names.
//!
//! All controllers share one git client. Every mutating method carries a
//! schema so malformed calls are rejected before git runs.

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use gitgate_core::{
    CherryPickController, ConflictDetector, RebaseController, RevertController, TodoEntry,
};
use gitgate_git::GitClient;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::gateway::RpcGateway;
use crate::schema::ParamSchema;

const HASH_PATTERN: &str = "^[0-9a-fA-F]{4,64}$";
const ACTION_PATTERN: &str = "^(pick|reword|edit|squash|fixup|drop)$";
/// Refs git would not mistake for an option.
const REF_PATTERN: &str = "^[^-]";
/// Todo messages must stay on their own script line.
const SINGLE_LINE_PATTERN: &str = r"^[^\r\n]*$";

/// Owns the controllers and registers their methods on a gateway.
pub struct OperationRegistry<G> {
    git: Arc<G>,
    rebase: Arc<RebaseController<G>>,
    cherry_pick: Arc<CherryPickController<G>>,
    revert: Arc<RevertController<G>>,
}

impl<G: GitClient + 'static> OperationRegistry<G> {
    #[must_use]
    pub fn new(git: Arc<G>) -> Self {
        Self {
            rebase: Arc::new(RebaseController::new(Arc::clone(&git))),
            cherry_pick: Arc::new(CherryPickController::new(Arc::clone(&git))),
            revert: Arc::new(RevertController::new(Arc::clone(&git))),
            git,
        }
    }

    #[must_use]
    pub fn rebase(&self) -> &RebaseController<G> {
        &self.rebase
    }

    #[must_use]
    pub fn cherry_pick(&self) -> &CherryPickController<G> {
        &self.cherry_pick
    }

    #[must_use]
    pub fn revert(&self) -> &RevertController<G> {
        &self.revert
    }

    /// Register every `git.*` method on `gateway`.
    ///
    /// # Errors
    /// Returns error if any name is already taken on the gateway.
    pub fn register(&self, gateway: &mut RpcGateway) -> Result<()> {
        self.register_queries(gateway)?;
        self.register_rebase(gateway)?;
        self.register_cherry_pick(gateway)?;
        self.register_revert(gateway)?;
        debug!(methods = gateway.methods().len(), "operations registered");
        Ok(())
    }

    fn register_queries(&self, gateway: &mut RpcGateway) -> Result<()> {
        let git = Arc::clone(&self.git);
        bind(gateway, "git.status", None, move |_| {
            let git = Arc::clone(&git);
            async move { Ok(git.status().await?) }
        })?;

        let git = Arc::clone(&self.git);
        bind(gateway, "git.conflicts", None, move |_| {
            let git = Arc::clone(&git);
            async move { Ok(ConflictDetector::detect(git.as_ref()).await?.unwrap_or_default()) }
        })
    }

    fn register_rebase(&self, gateway: &mut RpcGateway) -> Result<()> {
        let c = Arc::clone(&self.rebase);
        bind(
            gateway,
            "git.rebase",
            Some(vec![onto()]),
            move |params| {
                let c = Arc::clone(&c);
                async move {
                    let onto: String = arg(&params, 0, "onto")?;
                    Ok(c.rebase(&onto).await?)
                }
            },
        )?;

        let c = Arc::clone(&self.rebase);
        bind(
            gateway,
            "git.interactiveRebase",
            Some(vec![
                onto(),
                ParamSchema::array(ParamSchema::object([
                    ("hash", ParamSchema::string().pattern(HASH_PATTERN)),
                    ("action", ParamSchema::string().pattern(ACTION_PATTERN)),
                    (
                        "message",
                        ParamSchema::string().pattern(SINGLE_LINE_PATTERN).optional(),
                    ),
                ])),
            ]),
            move |params| {
                let c = Arc::clone(&c);
                async move {
                    let onto: String = arg(&params, 0, "onto")?;
                    let entries: Vec<TodoEntry> = arg(&params, 1, "commits")?;
                    Ok(c.interactive_rebase(&onto, &entries).await?)
                }
            },
        )?;

        let c = Arc::clone(&self.rebase);
        bind(
            gateway,
            "git.rebaseEditCommit",
            Some(vec![ParamSchema::string().min_length(1)]),
            move |params| {
                let c = Arc::clone(&c);
                async move {
                    let message: String = arg(&params, 0, "message")?;
                    Ok(c.edit_commit(&message).await?)
                }
            },
        )?;

        let c = Arc::clone(&self.rebase);
        bind(gateway, "git.rebaseContinue", None, move |_| {
            let c = Arc::clone(&c);
            async move { Ok(c.continue_operation().await?) }
        })?;

        let c = Arc::clone(&self.rebase);
        bind(gateway, "git.rebaseAbort", None, move |_| {
            let c = Arc::clone(&c);
            async move { Ok(c.abort().await?) }
        })?;

        let c = Arc::clone(&self.rebase);
        bind(gateway, "git.rebaseSkip", None, move |_| {
            let c = Arc::clone(&c);
            async move { Ok(c.skip().await?) }
        })?;

        let c = Arc::clone(&self.rebase);
        bind(gateway, "git.rebaseProgress", None, move |_| {
            let c = Arc::clone(&c);
            async move { Ok(c.progress()?) }
        })?;

        let c = Arc::clone(&self.rebase);
        bind(gateway, "git.isRebasing", None, move |_| {
            let c = Arc::clone(&c);
            async move { Ok(c.is_rebasing()) }
        })?;

        let c = Arc::clone(&self.rebase);
        bind(gateway, "git.rebaseState", None, move |_| {
            let c = Arc::clone(&c);
            async move { Ok(c.state()) }
        })
    }

    fn register_cherry_pick(&self, gateway: &mut RpcGateway) -> Result<()> {
        let c = Arc::clone(&self.cherry_pick);
        bind(gateway, "git.cherryPick", Some(commit_list()), move |params| {
            let c = Arc::clone(&c);
            async move {
                let commits: Vec<String> = arg(&params, 0, "commits")?;
                Ok(c.cherry_pick(commits).await?)
            }
        })?;

        let c = Arc::clone(&self.cherry_pick);
        bind(gateway, "git.cherryPickContinue", None, move |_| {
            let c = Arc::clone(&c);
            async move { Ok(c.continue_operation().await?) }
        })?;

        let c = Arc::clone(&self.cherry_pick);
        bind(gateway, "git.cherryPickAbort", None, move |_| {
            let c = Arc::clone(&c);
            async move { Ok(c.abort().await?) }
        })?;

        let c = Arc::clone(&self.cherry_pick);
        bind(gateway, "git.cherryPickSkip", None, move |_| {
            let c = Arc::clone(&c);
            async move { Ok(c.skip().await?) }
        })?;

        let c = Arc::clone(&self.cherry_pick);
        bind(gateway, "git.cherryPickState", None, move |_| {
            let c = Arc::clone(&c);
            async move { Ok(c.state()) }
        })
    }

    fn register_revert(&self, gateway: &mut RpcGateway) -> Result<()> {
        let c = Arc::clone(&self.revert);
        bind(gateway, "git.revert", Some(commit_list()), move |params| {
            let c = Arc::clone(&c);
            async move {
                let commits: Vec<String> = arg(&params, 0, "commits")?;
                Ok(c.revert(commits).await?)
            }
        })?;

        let c = Arc::clone(&self.revert);
        bind(gateway, "git.revertContinue", None, move |_| {
            let c = Arc::clone(&c);
            async move { Ok(c.continue_operation().await?) }
        })?;

        let c = Arc::clone(&self.revert);
        bind(gateway, "git.revertAbort", None, move |_| {
            let c = Arc::clone(&c);
            async move { Ok(c.abort().await?) }
        })?;

        let c = Arc::clone(&self.revert);
        bind(gateway, "git.revertSkip", None, move |_| {
            let c = Arc::clone(&c);
            async move { Ok(c.skip().await?) }
        })?;

        let c = Arc::clone(&self.revert);
        bind(gateway, "git.revertState", None, move |_| {
            let c = Arc::clone(&c);
            async move { Ok(c.state()) }
        })
    }
}

fn onto() -> ParamSchema {
    ParamSchema::string().min_length(1).pattern(REF_PATTERN)
}

fn commit_list() -> Vec<ParamSchema> {
    vec![ParamSchema::array(
        ParamSchema::string().min_length(1).pattern(REF_PATTERN),
    )]
}

/// Register a handler whose output is serialized to JSON.
fn bind<F, Fut, T>(
    gateway: &mut RpcGateway,
    method: &str,
    schema: Option<Vec<ParamSchema>>,
    handler: F,
) -> Result<()>
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Serialize,
{
    gateway.register(
        method,
        move |params| {
            let call = handler(params);
            async move {
                let output = call.await?;
                Ok::<_, anyhow::Error>(serde_json::to_value(output)?)
            }
        },
        schema,
    )
}

/// Deserialize positional parameter `index`.
fn arg<T: DeserializeOwned>(params: &[Value], index: usize, name: &str) -> anyhow::Result<T> {
    let value = params.get(index).cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).with_context(|| format!("invalid {name} parameter"))
}
