#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use crate::error::{CancelReason, Stage};
    use crate::pipeline::{ExecutionContext, ExecutorConfig, PipelineExecutor};
    use crate::plugins::{FnPlugin, PluginRegistry, PreHookOutcome};
    use crate::types::{Request, Response};
    use crate::{Error, Result};

    async fn ok_provider(req: Request) -> Result<Response> {
        Ok(Response::new(json!({ "model": req.model })))
    }

    fn request() -> Request {
        Request::for_model("openai/gpt-4o")
    }

    #[tokio::test]
    async fn test_hook_reported_cancellation_is_retagged() {
        let registry = PluginRegistry::new()
            .with(FnPlugin::new("first"))
            .with(FnPlugin::new("budget").on_pre(|ctx, _req| {
                ctx.cancel();
                ctx.check()?;
                Ok(PreHookOutcome::proceed())
            }))
            .seal();
        let exec = PipelineExecutor::new(registry);

        let outcome = exec.execute(request(), ok_provider).await;
        match outcome.error {
            Some(Error::Cancelled {
                stage: Stage::Pre,
                plugin_index: Some(1),
                reason: CancelReason::Cancelled,
            }) => {}
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(outcome.record.activated(), &[0, 1]);
        assert_eq!(outcome.record.failed_at(), Some(1));
    }

    #[tokio::test]
    async fn test_context_values_flow_from_pre_to_post() {
        let registry = PluginRegistry::new()
            .with(
                FnPlugin::new("timer")
                    .on_pre(|ctx, req| {
                        assert_eq!(ctx.stage(), Stage::Pre);
                        assert_eq!(ctx.plugin_index(), Some(0));
                        ctx.insert("seen_model", json!(req.model));
                        Ok(PreHookOutcome::proceed())
                    })
                    .on_post(|ctx, resp| {
                        assert_eq!(ctx.stage(), Stage::Post);
                        let mut out = resp.clone();
                        out.payload["seen"] = ctx.get("seen_model").cloned().unwrap_or_default();
                        Ok(Some(out))
                    }),
            )
            .seal();
        let exec = PipelineExecutor::new(registry);

        let resp = exec
            .execute(request(), ok_provider)
            .await
            .into_result()
            .unwrap();
        assert_eq!(resp.payload["seen"], json!("gpt-4o"));
    }

    #[tokio::test]
    async fn test_tagged_provider_error_is_kept() {
        let exec = PipelineExecutor::new(PluginRegistry::new().seal());
        let outcome = exec
            .execute(request(), |_req| async {
                Err::<Response, _>(Error::Provider {
                    source: Box::new(Error::plugin("connection reset")),
                })
            })
            .await;

        match outcome.error {
            Some(Error::Provider { source }) => {
                assert!(matches!(*source, Error::Plugin(_)));
            }
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_short_circuit_may_also_replace_request() {
        let registry = PluginRegistry::new()
            .with(FnPlugin::new("cache").on_pre(|_ctx, _req| {
                Ok(PreHookOutcome::short_circuit(Response::new(json!("hit")))
                    .with_request(Request::for_model("openai/gpt-4o-mini")))
            }))
            .seal();
        let exec = PipelineExecutor::new(registry);

        let outcome = exec.execute(request(), ok_provider).await;
        assert_eq!(outcome.response.payload, json!("hit"));
        assert!(!outcome.record.provider_invoked());
    }

    #[tokio::test(start_paused = true)]
    async fn test_backpressure_wait_respects_deadline() {
        let exec = PipelineExecutor::with_config(
            PluginRegistry::new().with(FnPlugin::new("noop")).seal(),
            ExecutorConfig::new().with_max_inflight(1),
        );

        let blocker = {
            let exec = exec.clone();
            tokio::spawn(async move {
                exec.execute(request(), |_req| async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok::<_, Error>(Response::default())
                })
                .await
            })
        };
        tokio::task::yield_now().await;

        let ctx = ExecutionContext::new().with_timeout(Duration::from_millis(100));
        let outcome = exec.execute_in(ctx, request(), ok_provider).await;
        match outcome.error {
            Some(Error::Cancelled {
                plugin_index: None,
                reason: CancelReason::DeadlineExceeded,
                ..
            }) => {}
            other => panic!("expected backpressure timeout, got {other:?}"),
        }
        assert!(outcome.record.is_empty());

        blocker.abort();
        let _ = blocker.await;
        assert_eq!(exec.signals().inflight, 0);
    }

    #[tokio::test]
    async fn test_zero_max_inflight_is_raised_to_one() {
        let config = ExecutorConfig {
            max_inflight: Some(0),
            ..ExecutorConfig::default()
        };
        let exec = PipelineExecutor::with_config(PluginRegistry::new().seal(), config);

        assert_eq!(exec.config().max_inflight, Some(1));
        let backpressure = exec.signals().backpressure.unwrap();
        assert_eq!((backpressure.max, backpressure.available), (1, 1));
        assert!(exec.execute(request(), ok_provider).await.is_ok());
    }

    #[tokio::test]
    async fn test_registry_shared_between_executors() {
        let registry = PluginRegistry::new().with(FnPlugin::new("shared")).seal();
        let a = PipelineExecutor::new(Arc::clone(&registry));
        let b = PipelineExecutor::new(Arc::clone(&registry));

        assert!(a.execute(request(), ok_provider).await.is_ok());
        assert!(b.execute(request(), ok_provider).await.is_ok());
        assert_eq!(Arc::strong_count(&registry), 3);
    }
}
