//! Script execution with Boa.

use super::parser::inline_scripts;
use crate::{Document, ErrorRecord, ImageOptions, ScriptExecutor, ScriptOutcome};
use futures::future::BoxFuture;
use futures::FutureExt;
use log::{debug, warn};
use std::time::Duration;

/// Resource type of records reported by [`BoaScriptExecutor`].
pub const SCRIPT_RESOURCE_TYPE: &str = "scriptExecution";

/// Runs a page's inline scripts in a fresh Boa context
///
/// Evaluation happens on the blocking pool. Exceptions become
/// `scriptExecution` records; the document itself is returned unchanged
/// because no DOM is exposed to the scripts.
#[derive(Debug, Clone)]
pub struct BoaScriptExecutor {
    /// Maximum loop iterations before Boa throws (0 => disabled)
    pub loop_iteration_limit: u64,
    /// Maximum recursion depth before Boa throws (usize::MAX => disabled)
    pub recursion_limit: usize,
}

impl Default for BoaScriptExecutor {
    fn default() -> Self {
        Self {
            loop_iteration_limit: 1_000_000,
            recursion_limit: 1024,
        }
    }
}

impl BoaScriptExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

fn run_scripts(scripts: Vec<String>, loop_limit: u64, recursion_limit: usize) -> Vec<String> {
    let mut ctx = boa_engine::Context::default();
    if loop_limit > 0 {
        ctx.runtime_limits_mut().set_loop_iteration_limit(loop_limit);
    }
    if recursion_limit < usize::MAX {
        ctx.runtime_limits_mut().set_recursion_limit(recursion_limit);
    }

    let mut failures = Vec::new();
    for code in scripts {
        if let Err(e) = ctx.eval(boa_engine::Source::from_bytes(code.as_bytes())) {
            failures.push(format!("{}", e));
        }
    }
    failures
}

impl ScriptExecutor for BoaScriptExecutor {
    fn execute_javascript<'a>(
        &'a self,
        document: Document,
        base_url: Option<&'a str>,
        timeout_ms: u64,
        _options: &'a ImageOptions,
    ) -> BoxFuture<'a, ScriptOutcome> {
        async move {
            let scripts = inline_scripts(document.markup());
            debug!(
                "running {} inline script(s) (base: {:?}, timeout: {}ms)",
                scripts.len(),
                base_url,
                timeout_ms
            );
            if scripts.is_empty() {
                return ScriptOutcome { document, errors: Vec::new() };
            }

            let (loop_limit, recursion_limit) = (self.loop_iteration_limit, self.recursion_limit);
            let job = tokio::task::spawn_blocking(move || {
                run_scripts(scripts, loop_limit, recursion_limit)
            });

            let joined = if timeout_ms > 0 {
                match tokio::time::timeout(Duration::from_millis(timeout_ms), job).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        warn!("scripts still running after {}ms", timeout_ms);
                        let record = ErrorRecord::new(
                            SCRIPT_RESOURCE_TYPE,
                            format!("Timeout after {}ms", timeout_ms),
                        );
                        return ScriptOutcome { document, errors: vec![record] };
                    }
                }
            } else {
                job.await
            };

            let errors = match joined {
                Ok(failures) => failures
                    .into_iter()
                    .map(|msg| ErrorRecord::new(SCRIPT_RESOURCE_TYPE, msg))
                    .collect(),
                Err(e) => vec![ErrorRecord::new(
                    SCRIPT_RESOURCE_TYPE,
                    format!("Script worker failed: {}", e),
                )],
            };
            ScriptOutcome { document, errors }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResourceType;

    #[tokio::test]
    async fn exceptions_become_records() {
        let doc = Document::new(
            "<script>var a = 1;</script><script>throw new Error('boom');</script>",
        );
        let id = doc.id();
        let out = BoaScriptExecutor::new()
            .execute_javascript(doc, None, 0, &ImageOptions::default())
            .await;
        assert_eq!(out.document.id(), id);
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].resource_type, ResourceType::from(SCRIPT_RESOURCE_TYPE));
        assert!(out.errors[0].msg.contains("boom"));
    }

    #[tokio::test]
    async fn documents_without_scripts_pass_through() {
        let doc = Document::new("<p>static</p>");
        let out = BoaScriptExecutor::new()
            .execute_javascript(doc, Some("http://example.com/"), 42, &ImageOptions::default())
            .await;
        assert!(out.errors.is_empty());
        assert_eq!(out.document.markup(), "<p>static</p>");
    }

    #[tokio::test]
    async fn runaway_loops_are_stopped() {
        let executor = BoaScriptExecutor { loop_iteration_limit: 1000, ..Default::default() };
        let doc = Document::new("<script>while (true) {}</script>");
        let out = executor.execute_javascript(doc, None, 0, &ImageOptions::default()).await;
        assert_eq!(out.errors.len(), 1);
    }
}
