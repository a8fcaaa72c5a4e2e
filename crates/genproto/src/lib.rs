pub mod common {
    include!("gen/common.rs");
}

pub mod user {
    include!("gen/user.rs");
}

pub mod product {
    include!("gen/product.rs");
}

pub mod order {
    include!("gen/order.rs");
}

pub mod payment {
    include!("gen/payment.rs");
}
