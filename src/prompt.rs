use std::io::{self, BufRead, Write};

use crate::error::{DoraError, Result};

/// Asks questions on `output` and reads answers line by line from `input`.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl Prompter<io::StdinLock<'static>, io::Stderr> {
    /// Reads stdin, prompts on stderr so stdout carries only the report.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Repeats `label` until a non-blank line is entered.
    pub fn ask(&mut self, label: &str) -> Result<String> {
        loop {
            write!(self.output, "{label}")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                let question = label.trim_end_matches(&[' ', ':'][..]);
                return Err(DoraError::Input(format!("no answer given for '{question}'")));
            }

            let answer = line.trim();
            if !answer.is_empty() {
                return Ok(answer.to_string());
            }
        }
    }

    pub fn ask_positive_integer(&mut self, label: &str) -> Result<u32> {
        loop {
            let answer = self.ask(label)?;
            match answer.parse::<u32>() {
                Ok(value) if value > 0 => return Ok(value),
                _ => writeln!(
                    self.output,
                    "'{answer}' is not a whole number greater than zero"
                )?,
            }
        }
    }

    #[cfg(test)]
    fn into_output(self) -> W {
        self.output
    }
}
