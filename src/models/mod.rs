pub mod booking;
pub mod event;

pub use booking::{
    AdvancePayment, BookingRecord, BookingStatus, FinalPayment, PaymentStatus, Role,
};
pub use event::{BookingEvent, BookingEventKind};
