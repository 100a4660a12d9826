use crate::render;
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use powledger_core::{Ledger, LedgerError, Record};
use std::io::{BufRead, Write};
use tracing::{debug, info};

const PROMPT: &str = "powledger> ";

#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    cmd: ShellCommand,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum ShellCommand {
    /// Mine a block holding one transfer and append it
    Add {
        sender: String,
        receiver: String,
        /// Parsed as a floating-point number
        #[arg(allow_hyphen_values = true)]
        amount: String,
        /// Override the session's creator id for this block
        #[arg(long)]
        creator_id: Option<u64>,
    },
    /// Show every block as a table
    Chain,
    /// Show one block, with its hash, as JSON
    Inspect { index: usize },
    /// Show the mining difficulty, or set it for future blocks
    Difficulty { value: Option<usize> },
    /// Check that every block links to its predecessor
    Validate,
    /// Overwrite a stored block's prev_hash
    Tamper { index: usize, prev_hash: String },
    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Split a line on whitespace, keeping single- or double-quoted runs together.
pub fn split_line(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if let Some(q) = quote {
        bail!("unterminated {q} quote");
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

pub fn parse_command(line: &str) -> Result<Option<ShellCommand>> {
    let words = split_line(line)?;
    if words.is_empty() {
        return Ok(None);
    }
    let parsed = ShellLine::try_parse_from(words)?;
    Ok(Some(parsed.cmd))
}

pub struct Session {
    ledger: Ledger,
    creator_id: u64,
}

impl Session {
    pub fn new(ledger: Ledger, creator_id: u64) -> Self {
        Self { ledger, creator_id }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Read commands until EOF or `quit`. Errors from single commands are
    /// printed and the loop goes on; only I/O failures end it early.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut out: W) -> Result<()> {
        write!(out, "{PROMPT}")?;
        out.flush()?;
        for line in input.lines() {
            let line = line?;
            let flow = match parse_command(&line) {
                Ok(Some(cmd)) => self.execute(cmd, &mut out)?,
                Ok(None) => Flow::Continue,
                Err(e) => {
                    match e.downcast_ref::<clap::Error>() {
                        Some(clap_err) => write!(out, "{}", clap_err.render())?,
                        None => writeln!(out, "error: {e}")?,
                    }
                    Flow::Continue
                }
            };
            if flow == Flow::Quit {
                break;
            }
            write!(out, "{PROMPT}")?;
            out.flush()?;
        }
        Ok(())
    }

    pub fn execute<W: Write>(&mut self, cmd: ShellCommand, out: &mut W) -> Result<Flow> {
        debug!(?cmd, "shell command");
        match cmd {
            ShellCommand::Add {
                sender,
                receiver,
                amount,
                creator_id,
            } => {
                let record = match Record::parse(sender, receiver, &amount) {
                    Ok(record) => record,
                    Err(e) => {
                        writeln!(out, "error: {e}")?;
                        return Ok(Flow::Continue);
                    }
                };
                let creator_id = creator_id.unwrap_or(self.creator_id);
                match self.ledger.mine_and_append(record, creator_id) {
                    Ok(block) => {
                        info!(index = self.ledger.len() - 1, "block added");
                        writeln!(
                            out,
                            "added block {} nonce={} hash={}",
                            self.ledger.len() - 1,
                            block.nonce,
                            block.hash()
                        )?;
                    }
                    Err(e) => writeln!(out, "error: {e}")?,
                }
            }
            ShellCommand::Chain => {
                writeln!(out, "{}", render::chain_table(&self.ledger))?;
            }
            ShellCommand::Inspect { index } => match render::inspect(&self.ledger, index) {
                Some(json) => writeln!(out, "{}", json?)?,
                None => writeln!(
                    out,
                    "error: no block at index {index} (chain has {} blocks)",
                    self.ledger.len()
                )?,
            },
            ShellCommand::Difficulty { value: None } => {
                writeln!(out, "difficulty: {}", self.ledger.difficulty())?;
            }
            ShellCommand::Difficulty { value: Some(d) } => match self.ledger.set_difficulty(d) {
                Ok(()) => writeln!(out, "difficulty set to {d}")?,
                Err(e) => writeln!(out, "error: {e}")?,
            },
            ShellCommand::Validate => match self.ledger.validate() {
                Ok(()) => writeln!(out, "valid: true")?,
                Err(LedgerError::BrokenLink { index, .. }) => writeln!(
                    out,
                    "valid: false (first broken link at block {index})"
                )?,
                Err(e) => writeln!(out, "valid: false ({e})")?,
            },
            ShellCommand::Tamper { index, prev_hash } => {
                match self.ledger.chain_mut().get_mut(index) {
                    Some(block) => {
                        block.prev_hash = prev_hash;
                        writeln!(out, "block {index} prev_hash overwritten")?;
                    }
                    None => writeln!(out, "error: no block at index {index}")?,
                }
            }
            ShellCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        let mut ledger = Ledger::new();
        ledger.set_difficulty(1).unwrap();
        Session::new(ledger, 42)
    }

    fn run(session: &mut Session, script: &str) -> String {
        let mut out = Vec::new();
        session.run(script.as_bytes(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn split_line_examples() {
        assert_eq!(split_line("add a b 1").unwrap(), ["add", "a", "b", "1"]);
        assert_eq!(
            split_line(r#"add "Alice Smith" 'Bob' 2"#).unwrap(),
            ["add", "Alice Smith", "Bob", "2"]
        );
        assert_eq!(split_line(r#"add "" b 1"#).unwrap(), ["add", "", "b", "1"]);
        assert!(split_line("   ").unwrap().is_empty());
        assert!(split_line(r#"add "oops"#).is_err());
    }

    #[test]
    fn parse_command_examples() {
        assert_eq!(parse_command("").unwrap(), None);
        assert_eq!(parse_command("chain").unwrap(), Some(ShellCommand::Chain));
        assert_eq!(parse_command("exit").unwrap(), Some(ShellCommand::Quit));
        assert_eq!(
            parse_command("add A B -5 --creator-id 3").unwrap(),
            Some(ShellCommand::Add {
                sender: "A".into(),
                receiver: "B".into(),
                amount: "-5".into(),
                creator_id: Some(3),
            })
        );
        assert_eq!(
            parse_command("difficulty 3").unwrap(),
            Some(ShellCommand::Difficulty { value: Some(3) })
        );
        assert!(parse_command("inspect one").is_err());
        assert!(parse_command("mine").is_err());
    }

    #[test]
    fn add_then_validate() {
        let mut s = session();
        let out = run(&mut s, "add A B 10\nvalidate\n");
        assert!(out.contains("added block 1"));
        assert!(out.contains("valid: true"));
        assert_eq!(s.ledger().len(), 2);
        assert_eq!(s.ledger().chain()[1].creator_id, 42);
        assert!(s.ledger().chain()[1].hash().starts_with('0'));
    }

    #[test]
    fn malformed_amount_is_reported_and_shell_continues() {
        let mut s = session();
        let out = run(&mut s, "add A B ten\nadd A B 1.5\n");
        assert!(out.contains("malformed amount"));
        assert!(out.contains("added block 1"));
        assert_eq!(s.ledger().len(), 2);
    }

    #[test]
    fn tamper_is_caught_by_validate() {
        let mut s = session();
        let out = run(&mut s, "add A B 10\nadd B C 5\ntamper 2 deadbeef\nvalidate\n");
        assert!(out.contains("block 2 prev_hash overwritten"));
        assert!(out.contains("valid: false (first broken link at block 2)"));
    }

    #[test]
    fn chain_renders_after_multibyte_tamper() {
        let mut s = session();
        let out = run(&mut s, "add A B 1\ntamper 1 aéééééééé\nchain\nvalidate\n");
        assert!(out.contains("block 1 prev_hash overwritten"));
        assert!(out.contains("Genesis"));
        assert!(out.contains("valid: false (first broken link at block 1)"));
        assert_eq!(s.ledger().len(), 2);
    }

    #[test]
    fn difficulty_show_and_set() {
        let mut s = session();
        let out = run(&mut s, "difficulty\ndifficulty 0\ndifficulty 99\ndifficulty\n");
        assert!(out.contains("difficulty: 1"));
        assert!(out.contains("difficulty set to 0"));
        assert!(out.contains("out of range"));
        assert!(out.contains("difficulty: 0"));
        assert_eq!(s.ledger().difficulty(), 0);
    }

    #[test]
    fn inspect_and_chain_output() {
        let mut s = session();
        let out = run(&mut s, "add Alice Bob 3\ninspect 1\ninspect 7\nchain\n");
        assert!(out.contains(r#""sender": "Alice""#));
        assert!(out.contains("no block at index 7"));
        assert!(out.contains("Genesis"));
    }

    #[test]
    fn quit_stops_reading() {
        let mut s = session();
        run(&mut s, "quit\nadd A B 1\n");
        assert_eq!(s.ledger().len(), 1);
    }

    #[test]
    fn unknown_command_prints_usage() {
        let mut s = session();
        let out = run(&mut s, "mine\n");
        assert!(out.contains("unrecognized subcommand"));
    }
}
