use crate::utils::error::{RelayError, Result};
use chrono::{DateTime, Local};
use std::fmt;
use std::str::FromStr;

/// 一次可被執行的 LED 動作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    TurnOn,
    TurnOff,
    /// 閃爍次數保留正負號，由 interpreter 判斷是否合法
    Blink(i64),
}

/// Bytes understood by the LED firmware. Anything else is ignored by the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlByte {
    On,
    Off,
}

impl ControlByte {
    pub fn as_byte(self) -> u8 {
        match self {
            ControlByte::On => b'1',
            ControlByte::Off => b'0',
        }
    }

    pub fn as_char(self) -> char {
        self.as_byte() as char
    }
}

impl fmt::Display for ControlByte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::TurnOn => write!(f, "turn_on"),
            Instruction::TurnOff => write!(f, "turn_off"),
            Instruction::Blink(count) => write!(f, "blink({})", count),
        }
    }
}

const TURN_ON_PHRASES: &[&str] = &[
    "turn_on",
    "on",
    "led on",
    "turn on",
    "turn on the led",
    "turn the led on",
];

const TURN_OFF_PHRASES: &[&str] = &[
    "turn_off",
    "off",
    "led off",
    "turn off",
    "turn off the led",
    "turn the led off",
];

/// Words that may surround the count in `blink led 3 times`.
const BLINK_FILLER_WORDS: &[&str] = &["the", "led", "time", "times"];

const NUMBER_WORDS: &[&str] = &[
    "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
];

impl FromStr for Instruction {
    type Err = RelayError;

    /// 將 AI 回覆或使用者直接輸入的文字正規化為 Instruction。
    ///
    /// Only the last non-empty line outside any `<think>` block is considered,
    /// and it must match the keyword table exactly after lowercasing and
    /// trimming quotes and trailing punctuation.
    fn from_str(text: &str) -> Result<Self> {
        let phrase = normalize_phrase(text);
        let unrecognized = || RelayError::UnrecognizedInstruction {
            text: text.to_string(),
        };

        if phrase.is_empty() {
            return Err(unrecognized());
        }

        if TURN_ON_PHRASES.contains(&phrase.as_str()) {
            return Ok(Instruction::TurnOn);
        }
        if TURN_OFF_PHRASES.contains(&phrase.as_str()) {
            return Ok(Instruction::TurnOff);
        }

        parse_blink(&phrase).map(Instruction::Blink).ok_or_else(unrecognized)
    }
}

/// 移除推理區塊、取最後一行並清理標點
pub fn normalize_phrase(text: &str) -> String {
    let lowered = text.to_lowercase();
    let visible = strip_reasoning(&lowered);

    let line = visible
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .unwrap_or("");

    let is_decoration = |c: char| matches!(c, '"' | '\'' | '`' | '*') || c.is_whitespace();
    let cleaned = line
        .trim_start_matches(is_decoration)
        .trim_end_matches(|c: char| is_decoration(c) || matches!(c, '.' | '!'));

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drops every `<think>...</think>` block. An unterminated block hides the rest of the text.
fn strip_reasoning(text: &str) -> String {
    let mut visible = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("<think>") {
        visible.push_str(&rest[..start]);
        match rest[start..].find("</think>") {
            Some(end) => rest = &rest[start + end + "</think>".len()..],
            None => return visible,
        }
    }

    visible.push_str(rest);
    visible
}

fn parse_blink(phrase: &str) -> Option<i64> {
    if let Some(inner) = phrase
        .strip_prefix("blink(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return parse_count(inner.trim());
    }

    let mut tokens = phrase.split_whitespace();
    if tokens.next()? != "blink" {
        return None;
    }

    let remaining: Vec<&str> = tokens
        .filter(|token| !BLINK_FILLER_WORDS.contains(token))
        .collect();

    match remaining.as_slice() {
        [count] => parse_count(count),
        _ => None,
    }
}

fn parse_count(token: &str) -> Option<i64> {
    if let Ok(count) = token.parse::<i64>() {
        return Some(count);
    }

    // 超出 i64 的數字仍是數字，飽和後交給 interpreter 判斷範圍
    let digits = token.strip_prefix('-').unwrap_or(token);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        return Some(if token.starts_with('-') { i64::MIN } else { i64::MAX });
    }

    NUMBER_WORDS
        .iter()
        .position(|word| *word == token)
        .map(|index| index as i64 + 1)
}

/// 單次輸入的處理紀錄（僅保存在記憶體中）
#[derive(Debug, Clone)]
pub struct Exchange {
    pub at: DateTime<Local>,
    pub input: String,
    pub reply: Option<String>,
    pub outcome: String,
}
