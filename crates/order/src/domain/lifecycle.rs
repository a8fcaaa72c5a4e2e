use serde::{Deserialize, Serialize};
use shared::errors::ServiceError;
use std::{fmt, str::FromStr};

/// Order lifecycle. `Fulfilled` and `Cancelled` accept no further events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Created,
    Paid,
    Fulfilled,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderEvent {
    Pay,
    Fulfill,
    Cancel,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::Paid => "paid",
            OrderStatus::Fulfilled => "fulfilled",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// The status reached by applying `event`, or `InvalidTransition` when
    /// the pair is not in the table.
    pub fn apply(self, event: OrderEvent) -> Result<OrderStatus, ServiceError> {
        match (self, event) {
            (OrderStatus::Created, OrderEvent::Pay) => Ok(OrderStatus::Paid),
            (OrderStatus::Paid, OrderEvent::Fulfill) => Ok(OrderStatus::Fulfilled),
            (OrderStatus::Created, OrderEvent::Cancel) => Ok(OrderStatus::Cancelled),
            (OrderStatus::Paid, OrderEvent::Cancel) => Ok(OrderStatus::Cancelled),
            (from, event) => Err(ServiceError::InvalidTransition(format!(
                "cannot {event} an order that is {from}"
            ))),
        }
    }

    pub fn is_editable(&self) -> bool {
        matches!(self, OrderStatus::Created)
    }

    pub fn is_deletable(&self) -> bool {
        matches!(self, OrderStatus::Created | OrderStatus::Cancelled)
    }
}

impl OrderEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderEvent::Pay => "pay",
            OrderEvent::Fulfill => "fulfill",
            OrderEvent::Cancel => "cancel",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for OrderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "created" => Ok(OrderStatus::Created),
            "paid" => Ok(OrderStatus::Paid),
            "fulfilled" => Ok(OrderStatus::Fulfilled),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(ServiceError::Internal(format!(
                "unknown order status in store: {other}"
            ))),
        }
    }
}

impl FromStr for OrderEvent {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pay" => Ok(OrderEvent::Pay),
            "fulfill" => Ok(OrderEvent::Fulfill),
            "cancel" => Ok(OrderEvent::Cancel),
            other => Err(ServiceError::validation(format!(
                "event: expected pay, fulfill or cancel, got {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATUSES: [OrderStatus; 4] = [
        OrderStatus::Created,
        OrderStatus::Paid,
        OrderStatus::Fulfilled,
        OrderStatus::Cancelled,
    ];
    const ALL_EVENTS: [OrderEvent; 3] = [OrderEvent::Pay, OrderEvent::Fulfill, OrderEvent::Cancel];

    #[test]
    fn only_the_four_listed_transitions_are_allowed() {
        let allowed = [
            (OrderStatus::Created, OrderEvent::Pay, OrderStatus::Paid),
            (OrderStatus::Paid, OrderEvent::Fulfill, OrderStatus::Fulfilled),
            (OrderStatus::Created, OrderEvent::Cancel, OrderStatus::Cancelled),
            (OrderStatus::Paid, OrderEvent::Cancel, OrderStatus::Cancelled),
        ];

        for from in ALL_STATUSES {
            for event in ALL_EVENTS {
                let expected = allowed
                    .iter()
                    .find(|(f, e, _)| *f == from && *e == event)
                    .map(|(_, _, to)| *to);

                match (from.apply(event), expected) {
                    (Ok(to), Some(expected)) => assert_eq!(to, expected),
                    (Err(ServiceError::InvalidTransition(_)), None) => {}
                    (got, expected) => {
                        panic!("{from} --{event}--> {got:?}, expected {expected:?}")
                    }
                }
            }
        }
    }

    #[test]
    fn parses_events_case_insensitively() {
        assert_eq!("Pay".parse::<OrderEvent>().unwrap(), OrderEvent::Pay);
        assert_eq!(" cancel ".parse::<OrderEvent>().unwrap(), OrderEvent::Cancel);
        assert!(matches!(
            "ship".parse::<OrderEvent>(),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn status_round_trips_through_its_text_form() {
        for status in ALL_STATUSES {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
    }
}
