pub mod order;
pub mod ticket;

pub use order::{
    IssuedTicket, IssuedTicketStatus, NewOrder, Order, OrderStatus, StatusUpdate, MAX_QUANTITY,
    MIN_QUANTITY,
};
pub use ticket::{TicketType, TicketTypeStatus};
