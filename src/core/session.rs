use crate::core::interpreter::interpret;
use crate::core::{CompletionGateway, ControlByte, DeviceChannel, Exchange, Instruction};
use crate::utils::error::{RelayError, Result};
use chrono::Local;
use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// 只保留最近的紀錄
pub const MAX_HISTORY: usize = 100;

pub const HELP_TEXT: &str = "\
Type what you want the LED to do, e.g. \"turn on the LED\" or \"blink three times\".
Direct commands (no AI round-trip):
  /on           turn the LED on
  /off          turn the LED off
  /blink N      blink N times
  /history      show this session's commands
  /clear        forget the command history
  /help         show this text
  quit, exit    leave
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Dispatched {
        instruction: Instruction,
        bytes: Vec<ControlByte>,
        reply: Option<String>,
    },
    Ignored,
    Help,
    History,
    Cleared,
    Quit,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub dispatched: usize,
    pub failed: usize,
}

/// Owns the device channel for its whole lifetime and processes one line at a time.
pub struct Session<G: CompletionGateway, D: DeviceChannel> {
    gateway: G,
    channel: D,
    blink_interval: Duration,
    history: VecDeque<Exchange>,
}

impl<G: CompletionGateway, D: DeviceChannel> Session<G, D> {
    pub fn new(gateway: G, channel: D, blink_interval: Duration) -> Self {
        Self {
            gateway,
            channel,
            blink_interval,
            history: VecDeque::new(),
        }
    }

    pub fn channel(&self) -> &D {
        &self.channel
    }

    pub fn history(&self) -> &VecDeque<Exchange> {
        &self.history
    }

    /// 處理一行輸入：內建指令、直接指令或經由 AI 轉換的指令
    pub async fn handle_line(&mut self, line: &str) -> Result<Outcome> {
        let line = line.trim();

        match line.to_lowercase().as_str() {
            "" => return Ok(Outcome::Ignored),
            "quit" | "exit" | "/quit" | "/exit" => return Ok(Outcome::Quit),
            "/help" => return Ok(Outcome::Help),
            "/history" => return Ok(Outcome::History),
            "/clear" => {
                self.history.clear();
                return Ok(Outcome::Cleared);
            }
            _ => {}
        }

        let mut reply = None;
        let result = self.execute(line, &mut reply).await;
        self.record(line, reply, &result);
        result
    }

    async fn execute(&mut self, line: &str, reply: &mut Option<String>) -> Result<Outcome> {
        let instruction: Instruction = match line.strip_prefix('/') {
            Some(direct) => direct.parse()?,
            None => {
                tracing::debug!("Forwarding to AI gateway: {}", line);
                let text = self.gateway.complete(line).await?;
                tracing::debug!("AI gateway reply: {:?}", text);
                *reply = Some(text.clone());
                text.parse()?
            }
        };

        let bytes = interpret(&instruction)?;
        self.dispatch(&bytes).await?;

        Ok(Outcome::Dispatched {
            instruction,
            bytes,
            reply: reply.clone(),
        })
    }

    /// 依序送出 bytes，兩個 byte 之間等待 blink interval
    pub async fn dispatch(&mut self, bytes: &[ControlByte]) -> Result<()> {
        for (index, byte) in bytes.iter().enumerate() {
            if index > 0 && !self.blink_interval.is_zero() {
                tokio::time::sleep(self.blink_interval).await;
            }
            self.channel.send(*byte)?;
            tracing::debug!("Sent '{}' to {}", byte, self.channel.port_name());
        }
        Ok(())
    }

    fn record(&mut self, line: &str, reply: Option<String>, result: &Result<Outcome>) {
        let outcome = match result {
            Ok(Outcome::Dispatched {
                instruction, bytes, ..
            }) => {
                let sent: String = bytes.iter().map(|b| b.as_char()).collect();
                format!("{} -> {}", instruction, sent)
            }
            Ok(other) => format!("{:?}", other),
            Err(e) => format!("error: {}", e),
        };

        if self.history.len() == MAX_HISTORY {
            self.history.pop_front();
        }
        self.history.push_back(Exchange {
            at: Local::now(),
            input: line.to_string(),
            reply,
            outcome,
        });
    }

    /// Reads lines until end of input, `quit`, or Ctrl-C. Failures are reported and skipped.
    pub async fn run<R, W>(&mut self, input: R, output: &mut W) -> Result<SessionSummary>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.run_until(input, output, interrupted()).await
    }

    /// Like [`Session::run`], but stops as soon as `stop` resolves, even in the
    /// middle of a gateway call or a blink sequence.
    pub async fn run_until<R, W, S>(
        &mut self,
        mut input: R,
        output: &mut W,
        stop: S,
    ) -> Result<SessionSummary>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
        S: Future<Output = ()>,
    {
        tokio::pin!(stop);
        let mut summary = SessionSummary::default();
        let mut buf = Vec::new();

        loop {
            output.write_all(b"> ").await?;
            output.flush().await?;

            buf.clear();
            let read = tokio::select! {
                read = input.read_until(b'\n', &mut buf) => read?,
                _ = &mut stop => {
                    tracing::info!("Interrupted, closing session");
                    break;
                }
            };
            if read == 0 {
                break;
            }

            let result = match std::str::from_utf8(&buf) {
                Ok(line) => tokio::select! {
                    result = self.handle_line(line) => result,
                    _ = &mut stop => {
                        tracing::info!("Interrupted during {:?}, closing session", line.trim());
                        break;
                    }
                },
                Err(_) => {
                    let text = String::from_utf8_lossy(&buf).trim().to_string();
                    let result = Err(RelayError::UnrecognizedInstruction { text: text.clone() });
                    self.record(&text, None, &result);
                    result
                }
            };

            match result {
                Ok(Outcome::Quit) => break,
                Ok(outcome) => {
                    if matches!(outcome, Outcome::Dispatched { .. }) {
                        summary.dispatched += 1;
                    }
                    self.report(&outcome, output).await?;
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(
                        "Command failed: {} (Category: {:?}, Severity: {:?})",
                        e,
                        e.category(),
                        e.severity()
                    );
                    report_error(&e, output).await?;
                }
            }
        }

        tracing::info!(
            "Session finished: {} dispatched, {} failed",
            summary.dispatched,
            summary.failed
        );
        Ok(summary)
    }

    pub async fn report<W: AsyncWrite + Unpin>(&self, outcome: &Outcome, output: &mut W) -> Result<()> {
        let message = match outcome {
            Outcome::Dispatched {
                instruction, reply, ..
            } => {
                let mut message = String::new();
                if reply.is_some() {
                    message.push_str(&format!("🤖 AI: {}\n", instruction));
                }
                message.push_str(&match instruction {
                    Instruction::TurnOn => "✅ LED turned ON\n".to_string(),
                    Instruction::TurnOff => "✅ LED turned OFF\n".to_string(),
                    Instruction::Blink(count) => format!("✅ LED blinked {} times\n", count),
                });
                message
            }
            Outcome::Help => HELP_TEXT.to_string(),
            Outcome::Cleared => "History cleared\n".to_string(),
            Outcome::History => {
                if self.history.is_empty() {
                    "No commands yet\n".to_string()
                } else {
                    self.history
                        .iter()
                        .map(|exchange| {
                            format!(
                                "[{}] {} => {}\n",
                                exchange.at.format("%H:%M:%S"),
                                exchange.input,
                                exchange.outcome
                            )
                        })
                        .collect()
                }
            }
            Outcome::Ignored | Outcome::Quit => return Ok(()),
        };

        output.write_all(message.as_bytes()).await?;
        output.flush().await?;
        Ok(())
    }

    /// 關閉連線並結束 session
    pub fn shutdown(mut self) {
        self.channel.close();
        tracing::info!("Released {}", self.channel.port_name());
    }
}

/// 同一個 Ctrl-C 監聽器貫穿整個 session，處理指令期間的訊號也不會遺失
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Ctrl-C handler unavailable: {}", e);
        std::future::pending::<()>().await;
    }
}

pub async fn report_error<W: AsyncWrite + Unpin>(error: &RelayError, output: &mut W) -> Result<()> {
    let message = format!(
        "❌ {}\n💡 {}\n",
        error.user_friendly_message(),
        error.recovery_suggestion()
    );
    output.write_all(message.as_bytes()).await?;
    output.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::io::BufReader;

    struct MockGateway {
        reply: std::result::Result<String, String>,
        calls: Arc<AtomicUsize>,
    }

    impl MockGateway {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl CompletionGateway for MockGateway {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .clone()
                .map_err(|message| RelayError::GatewayFailure { message })
        }
    }

    #[derive(Clone)]
    struct MockChannel {
        open: Arc<AtomicBool>,
        written: Arc<Mutex<Vec<u8>>>,
    }

    impl MockChannel {
        fn open() -> Self {
            Self {
                open: Arc::new(AtomicBool::new(true)),
                written: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn closed() -> Self {
            let channel = Self::open();
            channel.open.store(false, Ordering::SeqCst);
            channel
        }

        fn written(&self) -> String {
            String::from_utf8(self.written.lock().unwrap().clone()).unwrap()
        }
    }

    impl DeviceChannel for MockChannel {
        fn port_name(&self) -> &str {
            "mock"
        }

        fn is_open(&self) -> bool {
            self.open.load(Ordering::SeqCst)
        }

        fn send(&mut self, byte: ControlByte) -> Result<()> {
            if !self.is_open() {
                return Err(RelayError::ChannelUnavailable {
                    message: "mock is not open".to_string(),
                });
            }
            self.written.lock().unwrap().push(byte.as_byte());
            Ok(())
        }

        fn close(&mut self) {
            self.open.store(false, Ordering::SeqCst);
        }
    }

    fn session(gateway: MockGateway, channel: MockChannel) -> Session<MockGateway, MockChannel> {
        Session::new(gateway, channel, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_turn_on_scenario_writes_single_byte() {
        let channel = MockChannel::open();
        let mut session = session(MockGateway::replying("turn_on"), channel.clone());

        let outcome = session.handle_line("Turn on the LED.").await.unwrap();

        assert_eq!(
            outcome,
            Outcome::Dispatched {
                instruction: Instruction::TurnOn,
                bytes: vec![ControlByte::On],
                reply: Some("turn_on".to_string()),
            }
        );
        assert_eq!(channel.written(), "1");
    }

    #[tokio::test]
    async fn test_blink_scenario_writes_alternating_bytes() {
        let channel = MockChannel::open();
        let mut session = session(MockGateway::replying("blink(3)"), channel.clone());

        session.handle_line("Blink LED three times.").await.unwrap();

        assert_eq!(channel.written(), "101010");
    }

    #[tokio::test]
    async fn test_blink_waits_between_bytes() {
        let channel = MockChannel::open();
        let mut session = Session::new(
            MockGateway::replying("unused"),
            channel.clone(),
            Duration::from_millis(10),
        );

        let started = std::time::Instant::now();
        session.handle_line("/blink 2").await.unwrap();

        // four bytes, three gaps
        assert!(started.elapsed() >= Duration::from_millis(30));
        assert_eq!(channel.written(), "1010");
    }

    #[tokio::test]
    async fn test_unrecognized_reply_sends_nothing() {
        let channel = MockChannel::open();
        let mut session = session(MockGateway::replying("I cannot help with that."), channel.clone());

        let result = session.handle_line("make coffee").await;

        assert!(matches!(result, Err(RelayError::UnrecognizedInstruction { .. })));
        assert_eq!(channel.written(), "");
    }

    #[tokio::test]
    async fn test_invalid_blink_count_sends_nothing() {
        let channel = MockChannel::open();
        let mut session = session(MockGateway::replying("blink(0)"), channel.clone());

        let result = session.handle_line("blink zero times").await;

        assert!(matches!(result, Err(RelayError::InvalidArgument { .. })));
        assert_eq!(channel.written(), "");
    }

    #[tokio::test]
    async fn test_direct_commands_skip_gateway() {
        let channel = MockChannel::open();
        let gateway = MockGateway::replying("turn_off");
        let calls = gateway.calls.clone();
        let mut session = session(gateway, channel.clone());

        session.handle_line("/on").await.unwrap();
        session.handle_line("/blink 1").await.unwrap();
        session.handle_line("/off").await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(channel.written(), "1100");
    }

    #[tokio::test]
    async fn test_closed_channel_reports_unavailable() {
        let mut session = session(MockGateway::replying("turn_on"), MockChannel::closed());

        let result = session.handle_line("Turn on the LED.").await;

        assert!(matches!(result, Err(RelayError::ChannelUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_builtin_commands() {
        let mut session = session(MockGateway::replying("turn_on"), MockChannel::open());

        assert_eq!(session.handle_line("   ").await.unwrap(), Outcome::Ignored);
        assert_eq!(session.handle_line("/help").await.unwrap(), Outcome::Help);
        assert_eq!(session.handle_line("/HISTORY").await.unwrap(), Outcome::History);
        assert_eq!(session.handle_line("Quit").await.unwrap(), Outcome::Quit);
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_history_records_successes_and_failures() {
        let mut session = session(MockGateway::replying("turn_on"), MockChannel::open());

        session.handle_line("light please").await.unwrap();
        let _ = session.handle_line("/dance").await;

        let history = session.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].reply.as_deref(), Some("turn_on"));
        assert_eq!(history[0].outcome, "turn_on -> 1");
        assert!(history[1].reply.is_none());
        assert!(history[1].outcome.starts_with("error:"));
    }

    #[tokio::test]
    async fn test_run_continues_after_failures() {
        let channel = MockChannel::open();
        let mut session = session(MockGateway::failing("HTTP 503"), channel.clone());
        let input = BufReader::new(&b"turn it on\n/dance\n/on\nquit\n/off\n"[..]);
        let mut output = Vec::new();

        let summary = session.run(input, &mut output).await.unwrap();

        assert_eq!(summary, SessionSummary { dispatched: 1, failed: 2 });
        // lines after quit are never read
        assert_eq!(channel.written(), "1");

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("The AI service did not answer"));
        assert!(text.contains("✅ LED turned ON"));
    }

    #[tokio::test]
    async fn test_run_skips_line_that_is_not_utf8() {
        let channel = MockChannel::open();
        let gateway = MockGateway::replying("turn_off");
        let calls = gateway.calls.clone();
        let mut session = session(gateway, channel.clone());
        let input = BufReader::new(&b"\xff\xfe garbage\n/on\n"[..]);
        let mut output = Vec::new();

        let summary = session.run(input, &mut output).await.unwrap();

        assert_eq!(summary, SessionSummary { dispatched: 1, failed: 1 });
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(channel.written(), "1");
        assert_eq!(session.history().len(), 2);
        assert!(session.history()[0].outcome.starts_with("error:"));

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("I don't know how to do that with the LED"));
        assert!(text.contains("✅ LED turned ON"));
    }

    #[tokio::test]
    async fn test_stop_interrupts_long_blink() {
        let channel = MockChannel::open();
        let mut session = Session::new(
            MockGateway::replying("unused"),
            channel.clone(),
            Duration::from_secs(1),
        );
        let input = BufReader::new(&b"/blink 1000\n/on\n"[..]);
        let mut output = Vec::new();

        let started = std::time::Instant::now();
        let summary = session
            .run_until(input, &mut output, tokio::time::sleep(Duration::from_millis(50)))
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(summary, SessionSummary::default());
        // the first byte went out before the first pause
        assert_eq!(channel.written(), "1");
        assert!(session.channel().is_open());
        session.shutdown();
        assert!(!channel.is_open());
    }

    #[tokio::test]
    async fn test_stop_while_waiting_for_input() {
        let (mut terminal, reader) = tokio::io::duplex(64);
        terminal.write_all(b"/on\n").await.unwrap();
        let channel = MockChannel::open();
        let mut session = session(MockGateway::replying("unused"), channel.clone());
        let mut output = Vec::new();

        // the writer stays open, so the next read never completes
        let summary = session
            .run_until(
                BufReader::new(reader),
                &mut output,
                tokio::time::sleep(Duration::from_millis(50)),
            )
            .await
            .unwrap();

        assert_eq!(summary.dispatched, 1);
        assert_eq!(channel.written(), "1");
    }

    #[tokio::test]
    async fn test_clear_forgets_history() {
        let mut session = session(MockGateway::replying("turn_on"), MockChannel::open());

        session.handle_line("/on").await.unwrap();
        session.handle_line("/off").await.unwrap();
        assert_eq!(session.history().len(), 2);

        assert_eq!(session.handle_line("/clear").await.unwrap(), Outcome::Cleared);
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_history_keeps_most_recent_entries() {
        let mut session = session(MockGateway::replying("turn_on"), MockChannel::open());

        for _ in 0..MAX_HISTORY {
            session.handle_line("/on").await.unwrap();
        }
        session.handle_line("/off").await.unwrap();

        let history = session.history();
        assert_eq!(history.len(), MAX_HISTORY);
        assert_eq!(history.back().unwrap().outcome, "turn_off -> 0");
    }

    #[tokio::test]
    async fn test_run_with_unopened_channel_does_not_stop() {
        let mut session = session(MockGateway::replying("turn_on"), MockChannel::closed());
        let input = BufReader::new(&b"Turn on the LED.\n/off\n"[..]);
        let mut output = Vec::new();

        let summary = session.run(input, &mut output).await.unwrap();

        assert_eq!(summary, SessionSummary { dispatched: 0, failed: 2 });
        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.matches("The board is not connected").count(), 2);
    }

    #[tokio::test]
    async fn test_run_reads_scripted_input() {
        let reader = tokio_test::io::Builder::new()
            .read(b"/on\n")
            .wait(Duration::from_millis(5))
            .read(b"/history\n")
            .build();
        let channel = MockChannel::open();
        let mut session = session(MockGateway::replying("unused"), channel.clone());
        let mut output = Vec::new();

        let summary = session.run(BufReader::new(reader), &mut output).await.unwrap();

        assert_eq!(summary.dispatched, 1);
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("/on => turn_on -> 1"));
    }

    #[tokio::test]
    async fn test_shutdown_closes_channel() {
        let channel = MockChannel::open();
        let observer = channel.clone();
        let mut session = session(MockGateway::replying("turn_on"), channel);

        session.handle_line("/on").await.unwrap();
        assert!(session.channel().is_open());
        session.shutdown();

        assert!(!observer.is_open());
        assert_eq!(observer.written(), "1");
    }
}
