use crate::utils::{Method, Metrics, Status, TracingContext};
use opentelemetry::{
    Context, KeyValue,
    global::{self, BoxedTracer},
    propagation::Injector,
    trace::{Span, SpanKind, TraceContextExt, Tracer},
};
use prometheus_client::registry::Registry;
use tokio::time::Instant;
use tonic::{
    Request,
    metadata::{MetadataKey, MetadataMap, MetadataValue},
};
use tracing::{error, info};

/// Writes W3C trace headers into outgoing gRPC metadata.
pub struct MetadataInjector<'a>(pub &'a mut MetadataMap);

impl Injector for MetadataInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        if let Ok(metadata_key) = key.parse::<MetadataKey<_>>()
            && let Ok(metadata_value) = value.parse::<MetadataValue<_>>()
        {
            self.0.insert(metadata_key, metadata_value);
        }
    }
}

/// Span plus request metrics for one named component
/// (`user-query-service`, `product-client`, ...).
#[derive(Clone, Debug)]
pub struct OperationTracer {
    tracer_name: &'static str,
    metrics: Metrics,
}

impl OperationTracer {
    pub fn new(tracer_name: &'static str) -> Self {
        Self {
            tracer_name,
            metrics: Metrics::new(),
        }
    }

    /// `user-query-service` registers as `user_query_service_request_*`.
    pub fn register(&self, registry: &mut Registry) {
        let prefix = self.tracer_name.replace('-', "_");
        self.metrics.register(&prefix, self.tracer_name, registry);
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    fn get_tracer(&self) -> BoxedTracer {
        global::tracer(self.tracer_name)
    }

    pub fn inject_trace_context<T>(&self, cx: &Context, request: &mut Request<T>) {
        global::get_text_map_propagator(|propagator| {
            propagator.inject_context(cx, &mut MetadataInjector(request.metadata_mut()))
        });
    }

    pub fn start_tracing(&self, operation_name: &str, attributes: Vec<KeyValue>) -> TracingContext {
        let start_time = Instant::now();
        let tracer = self.get_tracer();
        let mut span = tracer
            .span_builder(operation_name.to_string())
            .with_kind(SpanKind::Server)
            .with_attributes(attributes)
            .start(&tracer);

        info!("Starting operation: {operation_name}");

        span.add_event(
            "Operation started",
            vec![KeyValue::new("operation", operation_name.to_string())],
        );

        let cx = Context::current_with_span(span);
        TracingContext { cx, start_time }
    }

    pub fn complete_tracing_success(
        &self,
        tracing_ctx: &TracingContext,
        method: Method,
        message: &str,
    ) {
        self.complete_tracing_internal(tracing_ctx, method, true, message);
    }

    pub fn complete_tracing_error(
        &self,
        tracing_ctx: &TracingContext,
        method: Method,
        error_message: &str,
    ) {
        self.complete_tracing_internal(tracing_ctx, method, false, error_message);
    }

    /// Closes the span according to `result`, logging `message` on success
    /// and the error otherwise.
    pub fn complete<T, E: std::fmt::Display>(
        &self,
        tracing_ctx: &TracingContext,
        method: Method,
        result: &Result<T, E>,
        message: &str,
    ) {
        match result {
            Ok(_) => self.complete_tracing_success(tracing_ctx, method, message),
            Err(e) => self.complete_tracing_error(tracing_ctx, method, &e.to_string()),
        }
    }

    fn complete_tracing_internal(
        &self,
        tracing_ctx: &TracingContext,
        method: Method,
        is_success: bool,
        message: &str,
    ) {
        let status_str = if is_success { "SUCCESS" } else { "ERROR" };
        let status = if is_success {
            Status::Success
        } else {
            Status::Error
        };
        let elapsed = tracing_ctx.start_time.elapsed().as_secs_f64();

        tracing_ctx.cx.span().add_event(
            "Operation completed",
            vec![
                KeyValue::new("status", status_str),
                KeyValue::new("duration_secs", elapsed.to_string()),
                KeyValue::new("message", message.to_string()),
            ],
        );

        if is_success {
            info!("✅ Operation completed successfully: {message}");
        } else {
            error!("❌ Operation failed: {message}");
        }

        self.metrics.record(method, status, elapsed);

        tracing_ctx.cx.span().end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::propagation::TextMapPropagator;
    use opentelemetry::trace::{SpanContext, SpanId, TraceFlags, TraceId, TraceState};
    use opentelemetry_sdk::propagation::TraceContextPropagator;

    #[test]
    fn injects_traceparent_into_metadata() {
        let span_context = SpanContext::new(
            TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap(),
            SpanId::from_hex("00f067aa0ba902b7").unwrap(),
            TraceFlags::SAMPLED,
            true,
            TraceState::default(),
        );
        let cx = Context::new().with_remote_span_context(span_context);

        let mut metadata = MetadataMap::new();
        TraceContextPropagator::new().inject_context(&cx, &mut MetadataInjector(&mut metadata));

        let header = metadata.get("traceparent").unwrap().to_str().unwrap();
        assert_eq!(
            header,
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"
        );
    }

    #[tokio::test]
    async fn completing_an_operation_records_its_outcome() {
        let tracer = OperationTracer::new("test-service");
        let ctx = tracer.start_tracing("op", vec![]);
        let result: Result<(), String> = Err("boom".into());

        tracer.complete(&ctx, Method::Get, &result, "done");

        let labels = crate::utils::metrics::Labels {
            method: Method::Get,
            status: Status::Error,
        };
        assert_eq!(tracer.metrics().request_counter.get_or_create(&labels).get(), 1);
    }
}
