//! Captcha recognition
//!
//! The service protects every reservation with an image captcha. Recognition
//! is delegated to an external OCR program behind the [`CaptchaSolver`] seam.

use std::io::{self, Write};
use std::process::{Command, Stdio};

use crate::config::CaptchaConfig;
use crate::utils::error::CaptchaError;
use crate::utils::truncate_text;

/// Turns a captcha image into its text
///
/// Implementations are blocking; async callers run them on the blocking pool.
pub trait CaptchaSolver: Send + Sync {
    fn recognize(&self, image: &[u8]) -> Result<String, CaptchaError>;
}

/// Runs an OCR program with the image on stdin and reads the answer from stdout
#[derive(Debug, Clone)]
pub struct CommandSolver {
    program: String,
    args: Vec<String>,
}

impl CommandSolver {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &CaptchaConfig) -> Self {
        Self::new(config.command.clone(), config.args.clone())
    }
}

impl CaptchaSolver for CommandSolver {
    fn recognize(&self, image: &[u8]) -> Result<String, CaptchaError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            // A solver may exit before reading everything
            if let Err(e) = stdin.write_all(image) {
                if e.kind() != io::ErrorKind::BrokenPipe {
                    return Err(e.into());
                }
            }
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(CaptchaError::SolverFailed {
                status: output.status.to_string(),
                stderr: truncate_text(&String::from_utf8_lossy(&output.stderr), 200),
            });
        }

        let answer: String = String::from_utf8_lossy(&output.stdout)
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();

        if answer.is_empty() {
            return Err(CaptchaError::EmptyAnswer);
        }

        tracing::debug!(answer = %answer, "Captcha recognized");
        Ok(answer)
    }
}
