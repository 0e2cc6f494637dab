//! Command parsing
//!
//! A command is the text between delimiters. Before it is interpreted,
//! aliases (`*name`) are expanded and the `=` / `!` shorthands are rewritten
//! to `INS` and `EXEC`. The first word selects the command kind; anything
//! that does not start with a keyword is an `INS` expression.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{Result, TemplateError};

/// Placeholder left in text nodes whose content was moved into a command
pub const CMD_NODE: &str = "CMD_NODE";

/// Recognized command keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CommandKind {
    #[serde(rename = "QUERY")]
    Query,
    #[serde(rename = "CMD_NODE")]
    CmdNode,
    #[serde(rename = "ALIAS")]
    Alias,
    #[serde(rename = "FOR")]
    For,
    #[serde(rename = "END-FOR")]
    EndFor,
    #[serde(rename = "IF")]
    If,
    #[serde(rename = "END-IF")]
    EndIf,
    #[serde(rename = "INS")]
    Ins,
    #[serde(rename = "EXEC")]
    Exec,
    #[serde(rename = "IMAGE")]
    Image,
    #[serde(rename = "LINK")]
    Link,
    #[serde(rename = "HTML")]
    Html,
}

impl CommandKind {
    /// Keyword as written in templates
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Query => "QUERY",
            CommandKind::CmdNode => CMD_NODE,
            CommandKind::Alias => "ALIAS",
            CommandKind::For => "FOR",
            CommandKind::EndFor => "END-FOR",
            CommandKind::If => "IF",
            CommandKind::EndIf => "END-IF",
            CommandKind::Ins => "INS",
            CommandKind::Exec => "EXEC",
            CommandKind::Image => "IMAGE",
            CommandKind::Link => "LINK",
            CommandKind::Html => "HTML",
        }
    }

    /// Case-insensitive keyword lookup
    pub fn from_keyword(word: &str) -> Option<Self> {
        let kind = match word.to_ascii_uppercase().as_str() {
            "QUERY" => CommandKind::Query,
            CMD_NODE => CommandKind::CmdNode,
            "ALIAS" => CommandKind::Alias,
            "FOR" => CommandKind::For,
            "END-FOR" => CommandKind::EndFor,
            "IF" => CommandKind::If,
            "END-IF" => CommandKind::EndIf,
            "INS" => CommandKind::Ins,
            "EXEC" => CommandKind::Exec,
            "IMAGE" => CommandKind::Image,
            "LINK" => CommandKind::Link,
            "HTML" => CommandKind::Html,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command found in a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandSummary {
    /// Command text after alias and shorthand expansion
    pub raw: String,
    /// Command kind
    #[serde(rename = "type")]
    pub kind: CommandKind,
    /// Everything after the keyword
    pub code: String,
}

/// Replace typographic quotes with their ASCII counterparts
pub fn fix_smart_quotes(command: &str) -> String {
    command
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
}

/// Normalize raw command text: trim, expand aliases and shorthands
pub fn expand_command(
    raw: &str,
    aliases: &HashMap<String, String>,
    smart_quotes: bool,
) -> Result<String> {
    let mut command = raw.trim().to_string();
    if smart_quotes {
        command = fix_smart_quotes(&command);
    }
    if let Some(name) = command.strip_prefix('*') {
        let name = name.trim();
        return aliases
            .get(name)
            .cloned()
            .ok_or_else(|| TemplateError::invalid_command("Unknown alias", command.clone()));
    }
    if let Some(rest) = command.strip_prefix('=') {
        return Ok(format!("INS {}", rest.trim()));
    }
    if let Some(rest) = command.strip_prefix('!') {
        return Ok(format!("EXEC {}", rest.trim()));
    }
    Ok(command)
}

/// Split an expanded command into its kind and the remaining code
pub fn split_command(command: &str) -> (CommandKind, String) {
    let command = command.trim();
    let (word, rest) = match command.find(char::is_whitespace) {
        Some(index) => (&command[..index], command[index..].trim()),
        None => (command, ""),
    };
    match CommandKind::from_keyword(word) {
        Some(kind) => (kind, rest.to_string()),
        None => (CommandKind::Ins, command.to_string()),
    }
}

/// Parse and summarize a raw command
pub fn summarize(raw: &str, aliases: &HashMap<String, String>, smart_quotes: bool) -> Result<CommandSummary> {
    let expanded = expand_command(raw, aliases, smart_quotes)?;
    let (kind, code) = split_command(&expanded);
    Ok(CommandSummary {
        raw: expanded,
        kind,
        code,
    })
}

/// Parse the body of `FOR x IN expr` into the loop variable and expression
pub fn parse_for(code: &str) -> Result<(String, String)> {
    static FOR_RE: OnceLock<Regex> = OnceLock::new();
    let re = FOR_RE.get_or_init(|| Regex::new(r"(?is)^\s*\$?([A-Za-z_][A-Za-z0-9_]*)\s+IN\s+(.+?)\s*$").unwrap());
    let caps = re
        .captures(code)
        .ok_or_else(|| TemplateError::invalid_command("Invalid FOR command", format!("FOR {}", code)))?;
    Ok((caps[1].to_string(), caps[2].to_string()))
}

/// Loop variable named by `END-FOR x`
pub fn loop_variable(code: &str) -> String {
    code.trim().trim_start_matches('$').to_string()
}

/// Parse `ALIAS name command...`
pub fn parse_alias(code: &str) -> Result<(String, String)> {
    let code = code.trim();
    match code.split_once(char::is_whitespace) {
        Some((name, body)) if !body.trim().is_empty() => {
            Ok((name.to_string(), body.trim().to_string()))
        }
        _ => Err(TemplateError::invalid_command(
            "Invalid ALIAS command",
            format!("ALIAS {}", code),
        )),
    }
}
