mod client;
mod types;

pub use client::{ClientError, SmtpClient};
pub use types::{Response, SmtpTimeouts};
