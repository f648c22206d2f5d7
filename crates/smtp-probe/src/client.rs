use crate::types::{Response, SmtpTimeouts};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

const MAX_LINE_LEN: usize = 4096;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connect to {addr} timed out")]
    ConnectTimeout { addr: SocketAddr },
    #[error("connecting to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("command {command} timed out after {duration:?}")]
    CommandTimeout { command: String, duration: Duration },
    #[error("reading response to {command}: {source}")]
    Read {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("writing {command}: {source}")]
    Write {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("connection closed while reading response to {command}")]
    ConnectionClosed { command: String },
    #[error("malformed response line: {0:?}")]
    MalformedResponseLine(String),
    #[error("response line exceeded {MAX_LINE_LEN} bytes")]
    ResponseTooLong,
}

/// A minimal RFC 5321 client for catch-all probing: connect, read the
/// banner, EHLO/HELO, MAIL FROM, RCPT TO, RSET, QUIT. No STARTTLS, no
/// pipelining, no DANE — the probe engine always talks to port 25 in the
/// clear and needs nothing more than this.
pub struct SmtpClient {
    socket: TcpStream,
    read_buffer: Vec<u8>,
    timeouts: SmtpTimeouts,
}

impl SmtpClient {
    pub async fn connect(addr: SocketAddr, timeouts: SmtpTimeouts) -> Result<Self, ClientError> {
        let socket = timeout(timeouts.connect, TcpStream::connect(addr))
            .await
            .map_err(|_| ClientError::ConnectTimeout { addr })?
            .map_err(|source| ClientError::Connect { addr, source })?;
        socket.set_nodelay(true).ok();
        Ok(Self {
            socket,
            read_buffer: Vec::with_capacity(256),
            timeouts,
        })
    }

    pub async fn read_banner(&mut self) -> Result<Response, ClientError> {
        self.read_response("banner", self.timeouts.banner).await
    }

    pub async fn ehlo(&mut self, domain: &str) -> Result<Response, ClientError> {
        self.send_command(&format!("EHLO {domain}\r\n"), "EHLO", self.timeouts.ehlo)
            .await
    }

    pub async fn mail_from(&mut self, sender: &str) -> Result<Response, ClientError> {
        self.send_command(
            &format!("MAIL FROM:<{sender}>\r\n"),
            "MAIL FROM",
            self.timeouts.mail_from,
        )
        .await
    }

    pub async fn rcpt_to(&mut self, recipient: &str) -> Result<Response, ClientError> {
        self.send_command(
            &format!("RCPT TO:<{recipient}>\r\n"),
            "RCPT TO",
            self.timeouts.rcpt_to,
        )
        .await
    }

    pub async fn rset(&mut self) -> Result<Response, ClientError> {
        self.send_command("RSET\r\n", "RSET", self.timeouts.rset)
            .await
    }

    /// Best-effort QUIT: errors here do not invalidate an otherwise
    /// successful probe session, so callers should log and ignore them.
    pub async fn quit(&mut self) -> Result<Response, ClientError> {
        self.send_command("QUIT\r\n", "QUIT", self.timeouts.quit)
            .await
    }

    async fn send_command(
        &mut self,
        command_text: &str,
        command: &str,
        deadline: Duration,
    ) -> Result<Response, ClientError> {
        timeout(deadline, self.socket.write_all(command_text.as_bytes()))
            .await
            .map_err(|_| ClientError::CommandTimeout {
                command: command.to_string(),
                duration: deadline,
            })?
            .map_err(|source| ClientError::Write {
                command: command.to_string(),
                source,
            })?;
        self.read_response(command, deadline).await
    }

    async fn read_response(&mut self, command: &str, deadline: Duration) -> Result<Response, ClientError> {
        let mut lines: Vec<(u16, bool, String)> = Vec::new();
        loop {
            let line = timeout(deadline, self.read_line())
                .await
                .map_err(|_| ClientError::CommandTimeout {
                    command: command.to_string(),
                    duration: deadline,
                })??;
            let (code, is_final, text) = parse_response_line(&line)?;
            lines.push((code, is_final, text));
            if is_final {
                break;
            }
        }
        let code = lines[0].0;
        let message = lines
            .into_iter()
            .map(|(_, _, text)| text)
            .collect::<Vec<_>>()
            .join(" ");
        Ok(Response { code, message })
    }

    /// Scan `read_buffer` for a CRLF-terminated line, topping it up from the
    /// socket as needed. Mirrors the buffer-scan-then-fill pattern used by
    /// full RFC 5321 clients, simplified to the one-line-at-a-time case this
    /// probe needs.
    async fn read_line(&mut self) -> Result<String, ClientError> {
        loop {
            if let Some(pos) = find_crlf(&self.read_buffer) {
                let line: Vec<u8> = self.read_buffer.drain(..pos + 2).collect();
                return String::from_utf8(line[..line.len() - 2].to_vec())
                    .map_err(|_| ClientError::MalformedResponseLine("invalid utf8".to_string()));
            }
            if self.read_buffer.len() > MAX_LINE_LEN {
                return Err(ClientError::ResponseTooLong);
            }
            let mut chunk = [0u8; 512];
            let n = self
                .socket
                .read(&mut chunk)
                .await
                .map_err(|source| ClientError::Read {
                    command: "<line>".to_string(),
                    source,
                })?;
            if n == 0 {
                return Err(ClientError::ConnectionClosed {
                    command: "<line>".to_string(),
                });
            }
            self.read_buffer.extend_from_slice(&chunk[..n]);
        }
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Parse one SMTP reply line: `code[-| ]text`. `-` marks a non-final line in
/// a multi-line response.
fn parse_response_line(line: &str) -> Result<(u16, bool, String), ClientError> {
    if line.len() < 4 {
        return Err(ClientError::MalformedResponseLine(line.to_string()));
    }
    let (code_str, rest) = line.split_at(3);
    let code: u16 = code_str
        .parse()
        .map_err(|_| ClientError::MalformedResponseLine(line.to_string()))?;
    let is_final = match rest.chars().next() {
        Some('-') => false,
        Some(' ') | None => true,
        _ => return Err(ClientError::MalformedResponseLine(line.to_string())),
    };
    let text = rest.get(1..).unwrap_or("").to_string();
    Ok((code, is_final, text))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_single_line_response() {
        let (code, is_final, text) = parse_response_line("250 ok").unwrap();
        assert_eq!(code, 250);
        assert!(is_final);
        assert_eq!(text, "ok");
    }

    #[test]
    fn parses_continuation_line() {
        let (code, is_final, _) = parse_response_line("250-PIPELINING").unwrap();
        assert_eq!(code, 250);
        assert!(!is_final);
    }

    #[test]
    fn rejects_malformed_line() {
        assert!(parse_response_line("ab").is_err());
    }

    #[test]
    fn finds_crlf_boundary() {
        assert_eq!(find_crlf(b"250 ok\r\nmore"), Some(6));
        assert_eq!(find_crlf(b"no terminator"), None);
    }
}
