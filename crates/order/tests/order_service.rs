use async_trait::async_trait;
use order::{
    abstract_trait::{
        OrderCommandRepositoryTrait, PaymentClientTrait, ProductClientTrait, UserClientTrait,
    },
    di::{DependenciesInject, OrderClients, OrderRepositories},
    domain::{OrderStatus, PaymentReceipt},
    model::{NewOrder, Order, OrderLine, OrderStatusUpdate},
    repository::InMemoryOrderRepository,
};
use parking_lot::Mutex;
use prometheus_client::registry::Registry;
use shared::{
    domain::{
        requests::{
            CreateOrderRequest, OrderLineRequest, ReserveStockRequest, TransitionOrderRequest,
            UpdateOrderRequest,
        },
        responses::{OrderResponse, ProductResponse, ReservationResponse, UserResponse},
    },
    errors::{RepositoryError, ServiceError},
};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};
use uuid::Uuid;

struct FakeUsers {
    known: HashSet<i32>,
}

#[async_trait]
impl UserClientTrait for FakeUsers {
    async fn find_by_id(&self, id: i32) -> Result<UserResponse, ServiceError> {
        if !self.known.contains(&id) {
            return Err(ServiceError::not_found());
        }

        Ok(UserResponse {
            id,
            name: "Budi".into(),
            email: format!("user{id}@example.com"),
            phone: None,
            addresses: vec![],
            version: 1,
            created_at: String::new(),
            updated_at: String::new(),
        })
    }
}

/// Tracks stock per product and reservations by id, mirroring the product
/// service's reserve/release contract.
#[derive(Default)]
struct FakeProducts {
    prices: HashMap<i32, i64>,
    stock: Mutex<HashMap<i32, i32>>,
    reservations: Mutex<HashMap<Uuid, (ReserveStockRequest, bool)>>,
    released: Mutex<Vec<Uuid>>,
    fail_release: Mutex<bool>,
}

impl FakeProducts {
    fn with(items: &[(i32, i64, i32)]) -> Self {
        Self {
            prices: items.iter().map(|&(id, price, _)| (id, price)).collect(),
            stock: Mutex::new(items.iter().map(|&(id, _, stock)| (id, stock)).collect()),
            ..Self::default()
        }
    }

    fn stock_of(&self, id: i32) -> i32 {
        self.stock.lock()[&id]
    }
}

#[async_trait]
impl ProductClientTrait for FakeProducts {
    async fn find_by_id(&self, id: i32) -> Result<ProductResponse, ServiceError> {
        let price = *self.prices.get(&id).ok_or_else(ServiceError::not_found)?;

        Ok(ProductResponse {
            id,
            name: format!("product-{id}"),
            description: String::new(),
            price,
            stock: self.stock_of(id),
            version: 1,
            created_at: String::new(),
            updated_at: String::new(),
        })
    }

    async fn reserve_stock(
        &self,
        req: &ReserveStockRequest,
    ) -> Result<ReservationResponse, ServiceError> {
        let mut reservations = self.reservations.lock();

        if let Some((existing, released)) = reservations.get(&req.reservation_id) {
            if *released {
                return Err(ServiceError::InvalidTransition("already released".into()));
            }
            return Ok(reservation_response(existing, false));
        }

        let mut stock = self.stock.lock();
        for line in &req.lines {
            if stock[&line.product_id] < line.quantity {
                return Err(ServiceError::validation("lines: insufficient stock"));
            }
        }
        for line in &req.lines {
            *stock.get_mut(&line.product_id).unwrap() -= line.quantity;
        }

        reservations.insert(req.reservation_id, (req.clone(), false));
        Ok(reservation_response(req, false))
    }

    async fn release_stock(&self, reservation_id: Uuid) -> Result<(), ServiceError> {
        if *self.fail_release.lock() {
            return Err(ServiceError::Unavailable("product-service".into()));
        }

        let mut reservations = self.reservations.lock();

        if let Some((req, released)) = reservations.get_mut(&reservation_id)
            && !*released
        {
            let mut stock = self.stock.lock();
            for line in &req.lines {
                *stock.get_mut(&line.product_id).unwrap() += line.quantity;
            }
            *released = true;
            self.released.lock().push(reservation_id);
        }

        Ok(())
    }
}

fn reservation_response(req: &ReserveStockRequest, released: bool) -> ReservationResponse {
    ReservationResponse {
        reservation_id: req.reservation_id.to_string(),
        lines: req.lines.clone(),
        released,
        created_at: String::new(),
    }
}

#[derive(Default)]
struct FakePayments {
    fail_capture: Mutex<bool>,
    capture_times_out: Mutex<bool>,
    fail_refund: Mutex<bool>,
    refund_delay: Mutex<Option<Duration>>,
    captures: Mutex<Vec<(String, i64)>>,
    refunds: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl PaymentClientTrait for FakePayments {
    async fn capture(
        &self,
        idempotency_key: &str,
        _order_id: i32,
        amount: i64,
    ) -> Result<PaymentReceipt, ServiceError> {
        if *self.fail_capture.lock() {
            return Err(ServiceError::Unavailable("payment provider down".into()));
        }
        if *self.capture_times_out.lock() {
            return Err(ServiceError::Timeout("payment-service".into()));
        }

        self.captures
            .lock()
            .push((idempotency_key.to_string(), amount));

        Ok(PaymentReceipt {
            payment_id: format!("pay-{idempotency_key}"),
            status: "captured".into(),
        })
    }

    async fn refund(
        &self,
        idempotency_key: &str,
        payment_id: &str,
        _amount: i64,
    ) -> Result<PaymentReceipt, ServiceError> {
        let delay = *self.refund_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if *self.fail_refund.lock() {
            return Err(ServiceError::Timeout("payment-service".into()));
        }

        self.refunds
            .lock()
            .push((idempotency_key.to_string(), payment_id.to_string()));

        Ok(PaymentReceipt {
            payment_id: payment_id.to_string(),
            status: "refunded".into(),
        })
    }
}

/// Order store that loses writes moving an order to Paid while `fail_paid`
/// is set.
#[derive(Default)]
struct FlakyStatusWrites {
    inner: Arc<InMemoryOrderRepository>,
    fail_paid: Mutex<bool>,
}

#[async_trait]
impl OrderCommandRepositoryTrait for FlakyStatusWrites {
    async fn create_order(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        self.inner.create_order(order).await
    }

    async fn update_lines(
        &self,
        order_id: i32,
        expected_version: i64,
        lines: &[OrderLine],
    ) -> Result<Order, RepositoryError> {
        self.inner
            .update_lines(order_id, expected_version, lines)
            .await
    }

    async fn update_status(
        &self,
        order_id: i32,
        expected_version: i64,
        update: &OrderStatusUpdate,
    ) -> Result<Order, RepositoryError> {
        if update.status == OrderStatus::Paid && *self.fail_paid.lock() {
            return Err(RepositoryError::Custom("connection reset".into()));
        }

        self.inner
            .update_status(order_id, expected_version, update)
            .await
    }

    async fn delete_order(
        &self,
        order_id: i32,
        expected_version: i64,
    ) -> Result<(), RepositoryError> {
        self.inner.delete_order(order_id, expected_version).await
    }
}

struct Harness {
    deps: DependenciesInject,
    products: Arc<FakeProducts>,
    payments: Arc<FakePayments>,
}

const CLAIM_LEASE: Duration = Duration::from_secs(120);

fn harness() -> Harness {
    harness_with(OrderRepositories::in_memory(), CLAIM_LEASE)
}

fn harness_with(repositories: OrderRepositories, claim_lease: Duration) -> Harness {
    let products = Arc::new(FakeProducts::with(&[(1, 15_000, 10), (2, 4_000, 3)]));
    let payments = Arc::new(FakePayments::default());
    let users = Arc::new(FakeUsers {
        known: HashSet::from([7]),
    });

    let mut registry = Registry::default();
    let deps = DependenciesInject::from_parts(
        repositories,
        OrderClients {
            users,
            products: products.clone(),
            payments: payments.clone(),
        },
        claim_lease,
        &mut registry,
    );

    Harness {
        deps,
        products,
        payments,
    }
}

fn line(product_id: i32, quantity: i32) -> OrderLineRequest {
    OrderLineRequest {
        product_id,
        quantity,
    }
}

impl Harness {
    async fn create(&self) -> OrderResponse {
        self.deps
            .order_command
            .create_order(&CreateOrderRequest {
                user_id: 7,
                lines: vec![line(1, 2), line(2, 1)],
            })
            .await
            .unwrap()
            .data
    }

    async fn transition(&self, id: i32, event: &str) -> Result<OrderResponse, ServiceError> {
        self.deps
            .order_command
            .transition(&TransitionOrderRequest {
                order_id: Some(id),
                event: event.into(),
            })
            .await
            .map(|response| response.data)
    }

    async fn get(&self, id: i32) -> OrderResponse {
        self.deps.order_query.find_by_id(id).await.unwrap().data
    }
}

#[tokio::test]
async fn created_order_keeps_only_the_user_id_and_price_snapshots() {
    let h = harness();

    let order = h.create().await;

    assert_eq!(order.user_id, 7);
    assert_eq!(order.status, "created");
    assert_eq!(order.total_price, 2 * 15_000 + 4_000);
    assert_eq!(order.lines[0].unit_price, 15_000);
    assert!(order.payment_id.is_none());

    let json = serde_json::to_value(&order).unwrap();
    let keys: Vec<&str> = json
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert!(keys.contains(&"user_id"));
    assert!(
        keys.iter()
            .all(|k| !k.starts_with("user") || *k == "user_id"),
        "order carries user fields: {keys:?}"
    );

    assert_eq!(h.products.stock_of(1), 10, "creating an order reserves nothing");
}

#[tokio::test]
async fn unknown_user_or_product_is_a_validation_error() {
    let h = harness();

    let err = h
        .deps
        .order_command
        .create_order(&CreateOrderRequest {
            user_id: 99,
            lines: vec![line(1, 1)],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(ref m) if m[0].starts_with("user_id")));

    let err = h
        .deps
        .order_command
        .create_order(&CreateOrderRequest {
            user_id: 7,
            lines: vec![line(42, 1)],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(ref m) if m[0].starts_with("lines")));
}

#[tokio::test]
async fn fulfilling_a_created_order_is_rejected_and_changes_nothing() {
    let h = harness();
    let order = h.create().await;

    let err = h.transition(order.id, "fulfill").await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition(_)));

    let after = h.get(order.id).await;
    assert_eq!(after.status, "created");
    assert_eq!(after.version, order.version);
}

#[tokio::test]
async fn pay_reserves_stock_captures_and_marks_paid() {
    let h = harness();
    let order = h.create().await;

    let paid = h.transition(order.id, "pay").await.unwrap();

    assert_eq!(paid.status, "paid");
    assert_eq!(paid.reservation_id, order.reservation_id);
    assert!(paid.pending_event.is_none());
    let capture_key = h.payments.captures.lock()[0].0.clone();
    assert!(capture_key.starts_with("capture-"));
    assert_eq!(paid.payment_id, Some(format!("pay-{capture_key}")));
    assert_eq!(h.products.stock_of(1), 8);
    assert_eq!(h.products.stock_of(2), 2);
    assert_eq!(h.payments.captures.lock()[0].1, order.total_price);

    let fulfilled = h.transition(order.id, "fulfill").await.unwrap();
    assert_eq!(fulfilled.status, "fulfilled");

    let err = h.transition(order.id, "cancel").await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition(_)));
}

#[tokio::test]
async fn failed_capture_leaves_order_created_and_releases_stock() {
    let h = harness();
    let order = h.create().await;
    *h.payments.fail_capture.lock() = true;

    let err = h.transition(order.id, "pay").await.unwrap_err();
    assert!(matches!(err, ServiceError::Unavailable(_)));

    let after = h.get(order.id).await;
    assert_eq!(after.status, "created");
    assert!(after.payment_id.is_none());
    assert!(after.pending_event.is_none());
    assert_ne!(after.reservation_id, order.reservation_id);
    assert_eq!(h.products.stock_of(1), 10);
    assert_eq!(
        h.products.released.lock().as_slice(),
        &[order.reservation_id.parse::<Uuid>().unwrap()]
    );

    *h.payments.fail_capture.lock() = false;
    let paid = h.transition(order.id, "pay").await.unwrap();
    assert_eq!(paid.status, "paid");
    assert_eq!(h.products.stock_of(1), 8);
}

#[tokio::test]
async fn insufficient_stock_leaves_order_untouched() {
    let h = harness();
    let order = h
        .deps
        .order_command
        .create_order(&CreateOrderRequest {
            user_id: 7,
            lines: vec![line(2, 5)],
        })
        .await
        .unwrap()
        .data;

    let err = h.transition(order.id, "pay").await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let after = h.get(order.id).await;
    assert_eq!(after.status, "created");
    assert_eq!(after.reservation_id, order.reservation_id);
    assert!(h.payments.captures.lock().is_empty());
}

#[tokio::test]
async fn cancelling_a_paid_order_refunds_then_releases() {
    let h = harness();
    let order = h.create().await;
    let paid = h.transition(order.id, "pay").await.unwrap();

    let cancelled = h.transition(order.id, "cancel").await.unwrap();

    assert_eq!(cancelled.status, "cancelled");
    assert_eq!(h.products.stock_of(1), 10);
    let refunds = h.payments.refunds.lock();
    assert_eq!(refunds.len(), 1);
    assert_eq!(Some(refunds[0].1.clone()), paid.payment_id);
}

#[tokio::test]
async fn failed_refund_keeps_the_order_paid() {
    let h = harness();
    let order = h.create().await;
    h.transition(order.id, "pay").await.unwrap();
    *h.payments.fail_refund.lock() = true;

    let err = h.transition(order.id, "cancel").await.unwrap_err();
    assert!(matches!(err, ServiceError::Timeout(_)));

    let after = h.get(order.id).await;
    assert_eq!(after.status, "paid");
    assert_eq!(after.pending_event.as_deref(), Some("cancel"));
    assert_eq!(h.products.stock_of(1), 8);

    let err = h.transition(order.id, "fulfill").await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition(_)));
}

#[tokio::test]
async fn stock_held_by_a_failed_pay_is_returned_on_cancel() {
    let h = harness();
    let order = h.create().await;
    *h.products.fail_release.lock() = true;
    *h.payments.fail_capture.lock() = true;

    let err = h.transition(order.id, "pay").await.unwrap_err();
    assert!(matches!(err, ServiceError::Unavailable(_)));

    let after = h.get(order.id).await;
    assert_eq!(after.status, "created");
    assert!(after.pending_event.is_none());
    assert_eq!(after.reservation_id, order.reservation_id);
    assert_eq!(h.products.stock_of(1), 8);

    *h.products.fail_release.lock() = false;
    let cancelled = h.transition(order.id, "cancel").await.unwrap();

    assert_eq!(cancelled.status, "cancelled");
    assert_eq!(h.products.stock_of(1), 10);
    assert_eq!(h.products.stock_of(2), 3);
}

#[tokio::test]
async fn pay_after_a_stuck_release_reuses_the_live_reservation() {
    let h = harness();
    let order = h.create().await;
    *h.products.fail_release.lock() = true;
    *h.payments.fail_capture.lock() = true;
    h.transition(order.id, "pay").await.unwrap_err();

    *h.products.fail_release.lock() = false;
    *h.payments.fail_capture.lock() = false;
    let paid = h.transition(order.id, "pay").await.unwrap();

    assert_eq!(paid.status, "paid");
    assert_eq!(paid.reservation_id, order.reservation_id);
    assert_eq!(h.products.stock_of(1), 8);
}

#[tokio::test]
async fn released_reservation_is_replaced_on_the_next_pay() {
    let h = harness();
    let order = h.create().await;
    let reservation_id: Uuid = order.reservation_id.parse().unwrap();

    h.products
        .reserve_stock(&ReserveStockRequest {
            reservation_id,
            lines: vec![],
        })
        .await
        .unwrap();
    h.products.release_stock(reservation_id).await.unwrap();

    let paid = h.transition(order.id, "pay").await.unwrap();

    assert_eq!(paid.status, "paid");
    assert_ne!(paid.reservation_id, order.reservation_id);
    assert_eq!(h.products.stock_of(1), 8);
    assert_eq!(h.products.stock_of(2), 2);
}

#[tokio::test(start_paused = true)]
async fn fulfil_during_a_slow_cancel_is_rejected() {
    let h = Arc::new(harness());
    let order = h.create().await;
    h.transition(order.id, "pay").await.unwrap();
    *h.payments.refund_delay.lock() = Some(Duration::from_millis(200));

    let cancel = tokio::spawn({
        let h = h.clone();
        async move { h.transition(order.id, "cancel").await }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    let err = h.transition(order.id, "fulfill").await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition(_)));

    let cancelled = cancel.await.unwrap().unwrap();
    assert_eq!(cancelled.status, "cancelled");
    assert_eq!(h.get(order.id).await.status, "cancelled");
    assert_eq!(h.payments.refunds.lock().len(), 1);
    assert_eq!(h.products.stock_of(1), 10);
}

#[tokio::test]
async fn lost_paid_write_with_failed_refund_never_charges_twice() {
    let store = Arc::new(FlakyStatusWrites::default());
    let h = harness_with(
        OrderRepositories {
            query: store.inner.clone(),
            command: store.clone(),
        },
        Duration::ZERO,
    );
    let order = h.create().await;
    *store.fail_paid.lock() = true;
    *h.payments.fail_refund.lock() = true;

    let err = h.transition(order.id, "pay").await.unwrap_err();
    assert!(matches!(err, ServiceError::Repo(RepositoryError::Custom(_))));

    let after = h.get(order.id).await;
    assert_eq!(after.status, "created");
    assert_eq!(after.pending_event.as_deref(), Some("pay"));
    assert_eq!(h.products.stock_of(1), 8);

    *store.fail_paid.lock() = false;
    *h.payments.fail_refund.lock() = false;
    let paid = h.transition(order.id, "pay").await.unwrap();

    assert_eq!(paid.status, "paid");
    assert_eq!(h.products.stock_of(1), 8);
    assert!(h.payments.refunds.lock().is_empty());

    let captures = h.payments.captures.lock();
    let keys: HashSet<&str> = captures.iter().map(|(key, _)| key.as_str()).collect();
    assert_eq!(keys.len(), 1, "captured under several keys: {captures:?}");
    assert_eq!(paid.payment_id, Some(format!("pay-{}", captures[0].0)));
}

#[tokio::test]
async fn unanswered_capture_holds_the_order_until_pay_is_retried() {
    let h = harness();
    let order = h.create().await;
    *h.payments.capture_times_out.lock() = true;

    let err = h.transition(order.id, "pay").await.unwrap_err();
    assert!(matches!(err, ServiceError::Timeout(_)));

    let after = h.get(order.id).await;
    assert_eq!(after.status, "created");
    assert_eq!(after.pending_event.as_deref(), Some("pay"));
    assert_eq!(h.products.stock_of(1), 8);

    for event in ["cancel", "fulfill", "pay"] {
        let err = h.transition(order.id, event).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidTransition(_)), "{event}: {err}");
    }

    let err = h
        .deps
        .order_command
        .update_order(&UpdateOrderRequest {
            order_id: Some(order.id),
            lines: vec![line(1, 1)],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition(_)));

    let err = h.deps.order_command.delete_order(order.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition(_)));
    assert_eq!(h.products.stock_of(1), 8);
}

#[tokio::test]
async fn lines_are_editable_and_deletable_only_in_allowed_states() {
    let h = harness();
    let order = h.create().await;

    let updated = h
        .deps
        .order_command
        .update_order(&UpdateOrderRequest {
            order_id: Some(order.id),
            lines: vec![line(2, 3)],
        })
        .await
        .unwrap()
        .data;
    assert_eq!(updated.total_price, 12_000);
    assert_eq!(updated.version, order.version + 1);

    h.transition(order.id, "pay").await.unwrap();

    let err = h
        .deps
        .order_command
        .update_order(&UpdateOrderRequest {
            order_id: Some(order.id),
            lines: vec![line(1, 1)],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition(_)));

    let err = h.deps.order_command.delete_order(order.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition(_)));

    h.transition(order.id, "cancel").await.unwrap();
    h.deps.order_command.delete_order(order.id).await.unwrap();

    let err = h.deps.order_query.find_by_id(order.id).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn unknown_event_is_a_validation_error() {
    let h = harness();
    let order = h.create().await;

    let err = h.transition(order.id, "ship").await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}
