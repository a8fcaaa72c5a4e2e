use crate::{abstract_trait::PaymentClientTrait, domain::PaymentReceipt};
use async_trait::async_trait;
use genproto::payment::{
    CaptureRequest, PaymentResponse, RefundRequest,
    payment_service_client::PaymentServiceClient,
};
use opentelemetry::KeyValue;
use prometheus_client::registry::Registry;
use shared::{
    errors::{ServiceError, grpc_status_to_service_error},
    resilience::Resilience,
    utils::{Method, OperationTracer},
};
use tonic::{Request, transport::Channel};

/// Client for the external payment provider. Both calls carry an
/// idempotency key, so retrying them after a timeout is safe.
#[derive(Clone)]
pub struct PaymentGrpcClientService {
    client: PaymentServiceClient<Channel>,
    resilience: Resilience,
    tracer: OperationTracer,
}

impl PaymentGrpcClientService {
    pub fn new(
        client: PaymentServiceClient<Channel>,
        resilience: Resilience,
        registry: &mut Registry,
    ) -> Self {
        let tracer = OperationTracer::new("order-payment-client");
        tracer.register(registry);

        Self {
            client,
            resilience,
            tracer,
        }
    }
}

impl From<PaymentResponse> for PaymentReceipt {
    fn from(value: PaymentResponse) -> Self {
        Self {
            payment_id: value.payment_id,
            status: value.status,
        }
    }
}

#[async_trait]
impl PaymentClientTrait for PaymentGrpcClientService {
    async fn capture(
        &self,
        idempotency_key: &str,
        order_id: i32,
        amount: i64,
    ) -> Result<PaymentReceipt, ServiceError> {
        let tracing_ctx = self.tracer.start_tracing(
            "payment_client.capture",
            vec![
                KeyValue::new("order.id", order_id.to_string()),
                KeyValue::new("payment.amount", amount),
            ],
        );

        let result = self
            .resilience
            .call("capture", || {
                let mut client = self.client.clone();
                let mut request = Request::new(CaptureRequest {
                    idempotency_key: idempotency_key.to_string(),
                    order_id,
                    amount,
                });
                self.tracer
                    .inject_trace_context(&tracing_ctx.cx, &mut request);

                async move {
                    client
                        .capture(request)
                        .await
                        .map(|response| PaymentReceipt::from(response.into_inner()))
                        .map_err(grpc_status_to_service_error)
                }
            })
            .await;

        self.tracer
            .complete(&tracing_ctx, Method::Post, &result, "Captured payment");
        result
    }

    async fn refund(
        &self,
        idempotency_key: &str,
        payment_id: &str,
        amount: i64,
    ) -> Result<PaymentReceipt, ServiceError> {
        let tracing_ctx = self.tracer.start_tracing(
            "payment_client.refund",
            vec![
                KeyValue::new("payment.id", payment_id.to_string()),
                KeyValue::new("payment.amount", amount),
            ],
        );

        let result = self
            .resilience
            .call("refund", || {
                let mut client = self.client.clone();
                let mut request = Request::new(RefundRequest {
                    idempotency_key: idempotency_key.to_string(),
                    payment_id: payment_id.to_string(),
                    amount,
                });
                self.tracer
                    .inject_trace_context(&tracing_ctx.cx, &mut request);

                async move {
                    client
                        .refund(request)
                        .await
                        .map(|response| PaymentReceipt::from(response.into_inner()))
                        .map_err(grpc_status_to_service_error)
                }
            })
            .await;

        self.tracer
            .complete(&tracing_ctx, Method::Post, &result, "Refunded payment");
        result
    }
}
