use crate::{
    abstract_trait::{
        DynOrderCommandRepository, DynOrderQueryRepository, DynPaymentClient, DynProductClient,
        DynUserClient, OrderCommandServiceTrait,
    },
    di::OrderClients,
    domain::{OrderEvent, OrderStatus, capture_key, refund_key},
    model::{NewOrder, Order, OrderLine, OrderStatusUpdate},
};
use async_trait::async_trait;
use chrono::Utc;
use opentelemetry::KeyValue;
use prometheus_client::registry::Registry;
use shared::{
    domain::{
        requests::{
            CreateOrderRequest, OrderLineRequest, ReserveStockRequest, TransitionOrderRequest,
            UpdateOrderRequest,
        },
        responses::{ApiResponse, OrderResponse},
    },
    errors::ServiceError,
    utils::{Method, OperationTracer, retry_on_conflict},
};
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct OrderCommandService {
    query: DynOrderQueryRepository,
    command: DynOrderCommandRepository,
    users: DynUserClient,
    products: DynProductClient,
    payments: DynPaymentClient,
    claim_lease: Duration,
    tracer: OperationTracer,
}

pub struct OrderCommandServiceDeps {
    pub query: DynOrderQueryRepository,
    pub command: DynOrderCommandRepository,
    pub clients: OrderClients,
    pub claim_lease: Duration,
}

impl OrderCommandService {
    pub fn new(deps: OrderCommandServiceDeps, registry: &mut Registry) -> Self {
        let OrderCommandServiceDeps {
            query,
            command,
            clients,
            claim_lease,
        } = deps;

        let tracer = OperationTracer::new("order-command-service");
        tracer.register(registry);

        Self {
            query,
            command,
            users: clients.users,
            products: clients.products,
            payments: clients.payments,
            claim_lease,
            tracer,
        }
    }

    async fn load(&self, order_id: i32) -> Result<Order, ServiceError> {
        self.query
            .find_by_id(order_id)
            .await?
            .ok_or_else(ServiceError::not_found)
    }

    async fn ensure_user_exists(&self, user_id: i32) -> Result<(), ServiceError> {
        match self.users.find_by_id(user_id).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Err(ServiceError::validation(format!(
                "user_id: user {user_id} does not exist"
            ))),
            Err(e) => Err(e),
        }
    }

    /// Reads the current price of every product on the request.
    async fn snapshot_lines(
        &self,
        lines: &[OrderLineRequest],
    ) -> Result<Vec<OrderLine>, ServiceError> {
        let mut snapshot = Vec::with_capacity(lines.len());

        for line in lines {
            let product = match self.products.find_by_id(line.product_id).await {
                Ok(product) => product,
                Err(e) if e.is_not_found() => {
                    return Err(ServiceError::validation(format!(
                        "lines: product {} does not exist",
                        line.product_id
                    )));
                }
                Err(e) => return Err(e),
            };

            snapshot.push(OrderLine {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: product.price,
            });
        }

        Ok(snapshot)
    }

    /// Marks the order as held by `event`, so that nothing else moves it while
    /// other services are called. A claim of the same event older than the
    /// lease is taken over, which is how an interrupted pay or cancel resumes.
    async fn claim(&self, order_id: i32, event: OrderEvent) -> Result<Order, ServiceError> {
        let query = &self.query;
        let command = &self.command;
        let lease = self.claim_lease;

        retry_on_conflict("claim_order", |_| async move {
            let current = query
                .find_by_id(order_id)
                .await?
                .ok_or_else(ServiceError::not_found)?;

            match current.pending()? {
                None => {
                    current.status()?.apply(event)?;
                }
                Some(pending) if pending == event && claim_expired(&current, lease) => {
                    warn!("⏳ Taking over the stalled {event} of order {order_id}");
                }
                Some(pending) => return Err(in_progress(order_id, pending)),
            }

            let update = OrderStatusUpdate {
                pending: Some(event),
                ..current.status_update()?
            };

            command
                .update_status(order_id, current.version, &update)
                .await
                .map_err(ServiceError::from)
        })
        .await
    }

    /// Drops the claim taken on `order`, applying `adjust` to the saga columns
    /// in the same write. When the write fails the claim stays until its lease
    /// runs out.
    async fn release_claim(&self, order: &Order, adjust: impl FnOnce(&mut OrderStatusUpdate)) {
        let result = async {
            let mut update = order.status_update()?;
            update.pending = None;
            adjust(&mut update);

            self.command
                .update_status(order.order_id, order.version, &update)
                .await
                .map_err(ServiceError::from)
        }
        .await;

        if let Err(e) = result {
            error!(
                "❌ Could not release the claim on order {}: {e}",
                order.order_id
            );
        }
    }

    /// Releases the order's stock and drops the claim. A released reservation
    /// is replaced so a later pay can reserve again; when the release fails the
    /// id is kept and the next pay or cancel reuses the live reservation.
    async fn undo_reservation(&self, order: &Order, fresh_payment_key: bool) {
        let reservation_id = order.reservation_id;

        let released = match self.products.release_stock(reservation_id).await {
            Ok(()) => true,
            Err(e) => {
                error!("❌ Stock for reservation {reservation_id} stays reserved: {e}");
                false
            }
        };

        self.release_claim(order, |update| {
            if released {
                update.reservation_id = Uuid::new_v4();
            }
            if fresh_payment_key {
                update.payment_key = Uuid::new_v4();
            }
        })
        .await;
    }

    /// Reserves stock for a claimed order. A reservation that was released
    /// before cannot be reserved again, so the order moves to a fresh one.
    async fn reserve(&self, order: Order) -> Result<Order, (Order, ServiceError)> {
        match self.products.reserve_stock(&reservation(&order)).await {
            Ok(_) => return Ok(order),
            Err(ServiceError::InvalidTransition(reason)) => {
                info!(
                    "♻️ Order {}: {reason}. Moving to a fresh reservation",
                    order.order_id
                );
            }
            Err(e) => return Err((order, e)),
        }

        let update = match order.status_update() {
            Ok(update) => OrderStatusUpdate {
                reservation_id: Uuid::new_v4(),
                ..update
            },
            Err(e) => return Err((order, e)),
        };

        let order = match self
            .command
            .update_status(order.order_id, order.version, &update)
            .await
        {
            Ok(rotated) => rotated,
            Err(e) => return Err((order, e.into())),
        };

        match self.products.reserve_stock(&reservation(&order)).await {
            Ok(_) => Ok(order),
            Err(e) => Err((order, e)),
        }
    }

    /// Created --pay--> Paid on a claimed order: reserve stock, capture
    /// payment, then persist. Each failure undoes the steps that already
    /// happened; when the outcome of a money movement is unknown the claim is
    /// kept so only a retry of the same pay can settle it.
    async fn pay(&self, order: Order) -> Result<Order, ServiceError> {
        let order = match self.reserve(order).await {
            Ok(order) => order,
            Err((order, err @ ServiceError::Validation(_))) => {
                self.release_claim(&order, |_| {}).await;
                return Err(err);
            }
            Err((order, err)) => {
                warn!(
                    "📦 Reserving stock for order {} failed: {err}. Releasing",
                    order.order_id
                );
                self.undo_reservation(&order, false).await;
                return Err(err);
            }
        };

        let amount = order.total_price();

        let receipt = match self
            .payments
            .capture(&capture_key(order.payment_key), order.order_id, amount)
            .await
        {
            Ok(receipt) => receipt,
            Err(err) if outcome_unknown(&err) => {
                error!(
                    "💳 Capture for order {} ended without an answer: {err}. Order stays claimed",
                    order.order_id
                );
                return Err(err);
            }
            Err(err) => {
                warn!(
                    "💳 Capture failed for order {}: {err}. Releasing stock",
                    order.order_id
                );
                self.undo_reservation(&order, true).await;
                return Err(err);
            }
        };

        let update = OrderStatusUpdate {
            status: OrderStatus::Paid,
            payment_id: Some(receipt.payment_id.clone()),
            pending: None,
            ..order.status_update()?
        };

        match self
            .command
            .update_status(order.order_id, order.version, &update)
            .await
        {
            Ok(paid) => {
                info!(
                    "💰 Order {} paid with payment {}",
                    order.order_id, receipt.payment_id
                );
                Ok(paid)
            }
            Err(err) => {
                // a resumed pay of the same order may have won with the same capture
                if let Ok(Some(current)) = self.query.find_by_id(order.order_id).await
                    && current.payment_id.as_deref() == Some(receipt.payment_id.as_str())
                {
                    return Ok(current);
                }

                error!(
                    "❌ Could not persist payment for order {}: {err}. Refunding",
                    order.order_id
                );

                match self
                    .payments
                    .refund(&refund_key(order.payment_key), &receipt.payment_id, amount)
                    .await
                {
                    Ok(_) => self.undo_reservation(&order, true).await,
                    Err(refund_err) => error!(
                        "❌ Refund of payment {} failed: {refund_err}. Order {} stays claimed",
                        receipt.payment_id, order.order_id
                    ),
                }

                Err(err.into())
            }
        }
    }

    /// Created --cancel--> Cancelled on a claimed order. A pay that failed
    /// halfway may have left stock reserved, so the reservation is released
    /// before the order closes.
    async fn cancel_created(&self, order: Order) -> Result<Order, ServiceError> {
        if let Err(err) = self.products.release_stock(order.reservation_id).await {
            warn!(
                "📦 Could not release stock of order {}: {err}",
                order.order_id
            );
            self.release_claim(&order, |_| {}).await;
            return Err(err);
        }

        self.settle(&order, OrderStatus::Cancelled).await
    }

    /// Paid --cancel--> Cancelled on a claimed order: refund, release stock,
    /// persist. A refund that definitely failed leaves the order Paid and
    /// unclaimed. Once money may have moved back the claim is kept, so only a
    /// retry of the cancel can finish it; refund and release are idempotent.
    async fn cancel_paid(&self, order: Order) -> Result<Order, ServiceError> {
        let Some(payment_id) = order.payment_id.clone() else {
            self.release_claim(&order, |_| {}).await;
            return Err(ServiceError::Internal(format!(
                "paid order {} has no payment id",
                order.order_id
            )));
        };

        if let Err(err) = self
            .payments
            .refund(
                &refund_key(order.payment_key),
                &payment_id,
                order.total_price(),
            )
            .await
        {
            if outcome_unknown(&err) {
                error!(
                    "💳 Refund for order {} ended without an answer: {err}. Order stays claimed",
                    order.order_id
                );
            } else {
                warn!("💳 Refund for order {} failed: {err}", order.order_id);
                self.release_claim(&order, |_| {}).await;
            }
            return Err(err);
        }

        if let Err(err) = self.products.release_stock(order.reservation_id).await {
            error!(
                "❌ Order {} is refunded but its stock stays reserved: {err}",
                order.order_id
            );
            return Err(err);
        }

        self.settle(&order, OrderStatus::Cancelled).await
    }

    /// Writes the end state of a claimed order and drops the claim.
    async fn settle(&self, order: &Order, status: OrderStatus) -> Result<Order, ServiceError> {
        let update = OrderStatusUpdate {
            status,
            pending: None,
            ..order.status_update()?
        };

        self.command
            .update_status(order.order_id, order.version, &update)
            .await
            .map_err(ServiceError::from)
    }

    /// Applies `event` to the latest stored version of the order. Only used
    /// for transitions without side effects on other services.
    async fn persist_transition(
        &self,
        order_id: i32,
        event: OrderEvent,
    ) -> Result<Order, ServiceError> {
        let query = &self.query;
        let command = &self.command;

        retry_on_conflict("persist_transition", |_| async move {
            let current = query
                .find_by_id(order_id)
                .await?
                .ok_or_else(ServiceError::not_found)?;

            if let Some(pending) = current.pending()? {
                return Err(in_progress(order_id, pending));
            }

            let update = OrderStatusUpdate {
                status: current.status()?.apply(event)?,
                ..current.status_update()?
            };

            command
                .update_status(order_id, current.version, &update)
                .await
                .map_err(ServiceError::from)
        })
        .await
    }
}

#[async_trait]
impl OrderCommandServiceTrait for OrderCommandService {
    async fn create_order(
        &self,
        req: &CreateOrderRequest,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError> {
        req.validate()?;

        info!("🏗️ Creating new order for user_id={}", req.user_id);

        let tracing_ctx = self.tracer.start_tracing(
            "create_order",
            vec![
                KeyValue::new("component", "order"),
                KeyValue::new("operation", "create"),
                KeyValue::new("user.id", req.user_id.to_string()),
            ],
        );

        let result = async {
            self.ensure_user_exists(req.user_id).await?;
            let lines = self.snapshot_lines(&req.lines).await?;

            self.command
                .create_order(&NewOrder {
                    user_id: req.user_id,
                    lines,
                    reservation_id: Uuid::new_v4(),
                    payment_key: Uuid::new_v4(),
                })
                .await
                .map_err(ServiceError::from)
        }
        .await;

        self.tracer
            .complete(&tracing_ctx, Method::Post, &result, "Order created");

        Ok(ApiResponse::success(
            "Order created successfully",
            OrderResponse::from(result?),
        ))
    }

    async fn update_order(
        &self,
        req: &UpdateOrderRequest,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError> {
        req.validate()?;

        let order_id = req
            .order_id
            .ok_or_else(|| ServiceError::validation("order_id: is required"))?;

        let tracing_ctx = self.tracer.start_tracing(
            "update_order",
            vec![
                KeyValue::new("component", "order"),
                KeyValue::new("operation", "update"),
                KeyValue::new("order.id", order_id.to_string()),
            ],
        );

        let result = async {
            let current = self.load(order_id).await?;
            ensure_editable(&current)?;

            let lines = self.snapshot_lines(&req.lines).await?;
            let lines = &lines;

            let query = &self.query;
            let command = &self.command;

            retry_on_conflict("update_order", |_| async move {
                let current = query
                    .find_by_id(order_id)
                    .await?
                    .ok_or_else(ServiceError::not_found)?;
                ensure_editable(&current)?;

                command
                    .update_lines(order_id, current.version, lines)
                    .await
                    .map_err(ServiceError::from)
            })
            .await
        }
        .await;

        self.tracer
            .complete(&tracing_ctx, Method::Put, &result, "Order updated");

        Ok(ApiResponse::success(
            "Order updated successfully",
            OrderResponse::from(result?),
        ))
    }

    async fn delete_order(&self, id: i32) -> Result<ApiResponse<()>, ServiceError> {
        let tracing_ctx = self.tracer.start_tracing(
            "delete_order",
            vec![
                KeyValue::new("component", "order"),
                KeyValue::new("operation", "delete"),
                KeyValue::new("order.id", id.to_string()),
            ],
        );

        let query = &self.query;
        let command = &self.command;

        let result = retry_on_conflict("delete_order", |_| async move {
            let current = query
                .find_by_id(id)
                .await?
                .ok_or_else(ServiceError::not_found)?;

            if let Some(pending) = current.pending()? {
                return Err(in_progress(id, pending));
            }

            let status = current.status()?;
            if !status.is_deletable() {
                return Err(ServiceError::InvalidTransition(format!(
                    "cannot delete an order that is {status}"
                )));
            }

            command
                .delete_order(id, current.version)
                .await
                .map_err(ServiceError::from)
        })
        .await;

        self.tracer
            .complete(&tracing_ctx, Method::Delete, &result, "Order deleted");
        result?;

        Ok(ApiResponse::success("Order deleted successfully", ()))
    }

    async fn transition(
        &self,
        req: &TransitionOrderRequest,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError> {
        req.validate()?;

        let order_id = req
            .order_id
            .ok_or_else(|| ServiceError::validation("order_id: is required"))?;
        let event: OrderEvent = req.event.parse()?;

        let tracing_ctx = self.tracer.start_tracing(
            "transition_order",
            vec![
                KeyValue::new("component", "order"),
                KeyValue::new("operation", "transition"),
                KeyValue::new("order.id", order_id.to_string()),
                KeyValue::new("order.event", event.as_str()),
            ],
        );

        let result = async {
            let current = self.load(order_id).await?;
            let from = current.status()?;
            let to = from.apply(event)?;

            info!("🔀 Order {order_id}: {from} --{event}--> {to}");

            if event == OrderEvent::Fulfill {
                return self.persist_transition(order_id, event).await;
            }

            let claimed = self.claim(order_id, event).await?;

            match (claimed.status()?, event) {
                (OrderStatus::Created, OrderEvent::Pay) => self.pay(claimed).await,
                (OrderStatus::Created, OrderEvent::Cancel) => self.cancel_created(claimed).await,
                (OrderStatus::Paid, OrderEvent::Cancel) => self.cancel_paid(claimed).await,
                (status, event) => Err(ServiceError::Internal(format!(
                    "no saga for {event} on a {status} order"
                ))),
            }
        }
        .await;

        self.tracer
            .complete(&tracing_ctx, Method::Post, &result, "Order transitioned");

        let order = result?;
        let message = format!("Order is now {}", order.status);

        Ok(ApiResponse::success(message, OrderResponse::from(order)))
    }
}

fn ensure_editable(order: &Order) -> Result<(), ServiceError> {
    if let Some(pending) = order.pending()? {
        return Err(in_progress(order.order_id, pending));
    }

    let status = order.status()?;

    if status.is_editable() {
        Ok(())
    } else {
        Err(ServiceError::InvalidTransition(format!(
            "order {} is {status} and can no longer be edited",
            order.order_id
        )))
    }
}

fn in_progress(order_id: i32, pending: OrderEvent) -> ServiceError {
    ServiceError::InvalidTransition(format!("order {order_id} has a {pending} in progress"))
}

fn claim_expired(order: &Order, lease: Duration) -> bool {
    (Utc::now() - order.updated_at)
        .to_std()
        .is_ok_and(|age| age >= lease)
}

/// Errors after which the peer may or may not have applied the call.
fn outcome_unknown(err: &ServiceError) -> bool {
    matches!(
        err,
        ServiceError::Timeout(_) | ServiceError::Cancelled(_) | ServiceError::Internal(_)
    )
}

fn reservation(order: &Order) -> ReserveStockRequest {
    ReserveStockRequest {
        reservation_id: order.reservation_id,
        lines: order.stock_lines(),
    }
}
