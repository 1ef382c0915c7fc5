pub mod closure;
pub mod request;
pub mod ticket;
pub mod trip;
