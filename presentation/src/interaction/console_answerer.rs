//! Terminal answers for the question stage.
//!
//! The user sees:
//!
//! ```text
//! ── Question 1 ──
//! Who were you travelling with on the ferry to Cacilhas?
//! (empty line or /skip to stop the questions)
//! answer>
//! ```

use async_trait::async_trait;
use atlance_application::{AnswerError, AnswerPort};
use atlance_domain::Question;
use colored::Colorize;
use std::io::{self, BufRead, BufReader, Stdin, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, mpsc};

/// Reads one answer per question from a line-oriented input (stdin by
/// default).
///
/// Lines are read on a dedicated thread and handed over through a channel,
/// so a cancelled question leaves nothing behind that the runtime has to
/// wait for on shutdown.
///
/// An empty line, `/skip` or end of input declines; the interview ends
/// there and the story is refined with what was said so far.
pub struct ConsoleAnswerer {
    lines: Mutex<mpsc::Receiver<io::Result<String>>>,
    asked: AtomicUsize,
}

impl ConsoleAnswerer {
    pub fn new() -> Self {
        Self::from_reader(BufReader::<Stdin>::new(io::stdin()))
    }

    pub fn from_reader<R: BufRead + Send + 'static>(reader: R) -> Self {
        let (tx, rx) = mpsc::channel(1);
        // If the thread cannot start the sender is dropped and every
        // question is declined.
        let _ = std::thread::Builder::new()
            .name("atlance-answers".to_string())
            .spawn(move || {
                for line in reader.lines() {
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                }
            });

        Self {
            lines: Mutex::new(rx),
            asked: AtomicUsize::new(0),
        }
    }

    fn display_question(&self, question: &Question) -> Result<(), AnswerError> {
        let n = self.asked.fetch_add(1, Ordering::Relaxed) + 1;
        println!();
        println!("{}", format!("── Question {} ──", n).cyan().bold());
        println!("{}", question.content());
        println!("{}", "(empty line or /skip to stop the questions)".dimmed());
        print!("{} ", "answer>".magenta().bold());
        io::stdout()
            .flush()
            .map_err(|e| AnswerError::Io(format!("Failed to flush stdout: {}", e)))
    }
}

impl Default for ConsoleAnswerer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnswerPort for ConsoleAnswerer {
    async fn request_answer(&self, question: &Question) -> Result<String, AnswerError> {
        self.display_question(question)?;

        let line = match self.lines.lock().await.recv().await {
            None => return Err(AnswerError::NoAnswer),
            Some(line) => {
                line.map_err(|e| AnswerError::Io(format!("Failed to read input: {}", e)))?
            }
        };

        match line.trim() {
            "" => Err(AnswerError::NoAnswer),
            cmd if cmd.eq_ignore_ascii_case("/skip") => Err(AnswerError::NoAnswer),
            answer => Ok(answer.to_string()),
        }
    }
}
