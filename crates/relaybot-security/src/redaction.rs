use std::io::Write;
use std::sync::LazyLock;

use regex::Regex;
use tracing_subscriber::fmt::MakeWriter;

/// Log sink that masks API keys and bot tokens before they reach the terminal.
pub struct RedactingWriter<W> {
    inner: W,
}

impl<W> RedactingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl RedactingWriter<std::io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let original = String::from_utf8_lossy(buf);
        let redacted = redact_secrets(&original);
        self.inner.write_all(redacted.as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl<'a> MakeWriter<'a> for RedactingWriter<std::io::Stderr> {
    type Writer = RedactingWriter<std::io::Stderr>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::stderr()
    }
}

static PATTERNS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
          sk-or-v1-[0-9A-Za-z]{16,}        # OpenRouter keys
        | sk-[0-9A-Za-z_\-]{20,}           # OpenAI-style keys
        | \b\d{6,12}:[A-Za-z0-9_\-]{30,}   # Telegram bot tokens
        | Bearer\s+[A-Za-z0-9_\-\.]{10,}   # Authorization header values
        ",
    )
    .expect("redaction regex should compile")
});

/// Replace known secret patterns with `[REDACTED]`.
pub fn redact_secrets(input: &str) -> String {
    PATTERNS.replace_all(input, "[REDACTED]").into_owned()
}
