pub mod gate;
pub mod refund;
pub mod schedule;
pub mod transitions;

pub use gate::{ActionGate, BookingActions};
pub use refund::{
    calculate_refund_eligibility, refund_amount, RefundEligibility, RefundPolicy, RefundTier,
    TieredRefundPolicy,
};
pub use transitions::{can_transition, transition, TransitionError};
