use std::time::Duration;

/// Per-command deadlines for one SMTP session. All default to the same
/// configured `SMTP_TIMEOUT`; kept as separate fields (rather than one
/// blanket deadline) so a future caller can tune individual phases without
/// changing the client's shape.
#[derive(Debug, Clone, Copy)]
pub struct SmtpTimeouts {
    pub connect: Duration,
    pub banner: Duration,
    pub ehlo: Duration,
    pub mail_from: Duration,
    pub rcpt_to: Duration,
    pub rset: Duration,
    pub quit: Duration,
}

impl SmtpTimeouts {
    pub fn uniform(d: Duration) -> Self {
        Self {
            connect: d,
            banner: d,
            ehlo: d,
            mail_from: d,
            rcpt_to: d,
            rset: d,
            quit: d,
        }
    }
}

/// One parsed SMTP reply: a 3-digit code and the (possibly multi-line,
/// joined) text that followed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub code: u16,
    pub message: String,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_transient(&self) -> bool {
        (400..500).contains(&self.code)
    }

    pub fn is_permanent(&self) -> bool {
        (500..600).contains(&self.code)
    }

    pub fn to_single_line(&self) -> String {
        format!("{} {}", self.code, self.message.replace(['\r', '\n'], " "))
    }
}
