//! Message-text classification: a fixed command vocabulary with alias
//! matching and positional argument parsing.
//!
//! Matching is an ordered chain: the first matcher that recognizes the
//! message wins. The order is load-bearing (several aliases are substrings
//! or prefixes of one another) and is exported via [`matcher_order`] so the
//! contract stays visible and tested.

use once_cell::sync::Lazy;
use regex::Regex;

/// Grammar switches derived from configuration. Observed deployments differ
/// in which parts of the grammar they carry; these flags fold them into one.
#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    pub batch_add: bool,
    pub weather: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            batch_add: true,
            weather: true,
        }
    }
}

/// A classified inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// One entry per place input line, in message order.
    AddPlaces(Vec<String>),
    ShowList,
    /// First step of the two-step clear: warn, delete nothing.
    ClearRequest,
    /// Exact confirm phrase as its own message: execute the clear.
    ClearConfirm,
    DeleteByIndex(usize),
    AddComment { index: usize, text: String },
    EditComment { index: usize, old: String, new: String },
    WeatherQuery(Option<WeatherTarget>),
    Help,
    /// Recognized trigger with missing or unparsable arguments.
    Malformed(Usage),
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WeatherTarget {
    /// 1-based index into the sorted list view.
    Index(usize),
    /// Free-text location to resolve ad hoc.
    Query(String),
}

/// Which usage hint to show for a malformed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Usage {
    Add,
    Delete,
    Comment,
    EditComment,
}

const ADD_ALIASES: &[&str] = &["新增地點", "新增", "加入", "增加", "+", "加", "增"];
const DELETE_ALIASES: &[&str] = &["刪除", "移除", "delete", "del", "-", "刪", "移"];
const COMMENT_ALIASES: &[&str] = &["註解", "備註", "comment", "note", "註", "*"];
const EDIT_COMMENT_ALIASES: &[&str] = &["修改註解"];
const LIST_ALIASES: &[&str] = &["清單", "地點", "list"];
const CLEAR_ALIASES: &[&str] = &["清空", "全部刪除", "reset"];
const CLEAR_CONFIRM_PHRASES: &[&str] = &["確認清空", "確認"];
const WEATHER_ALIASES: &[&str] = &["天氣", "weather"];
const HELP_ALIASES: &[&str] = &["help", "幫助", "指令", "/", "說明"];

static EDIT_COMMENT_ARGS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([0-9]+)\s+(.+?)\s+(.+)$").unwrap());
static COMMENT_ARGS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([0-9]+)\s+(\S.*)$").unwrap());
static FIRST_INT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").unwrap());
static ALL_DIGITS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").unwrap());

struct Matcher {
    name: &'static str,
    matches: fn(&str, Capabilities) -> Option<Intent>,
}

/// Evaluation order. Rationale, in order:
/// - `確認清空` must be consumed before the `清空` substring triggers a new
///   clear request;
/// - `修改註解` before the `註解` comment prefix;
/// - comment before delete, so a `-` inside a comment payload cannot misfire;
/// - add (prefix, longest alias first) before the `地點` list substring, so
///   `新增地點 …` adds instead of listing;
/// - substring matchers (list, clear) last, as the most general.
static MATCHERS: &[Matcher] = &[
    Matcher { name: "clear_confirm", matches: match_clear_confirm },
    Matcher { name: "help", matches: match_help },
    Matcher { name: "edit_comment", matches: match_edit_comment },
    Matcher { name: "add_comment", matches: match_add_comment },
    Matcher { name: "delete", matches: match_delete },
    Matcher { name: "weather", matches: match_weather },
    Matcher { name: "add", matches: match_add },
    Matcher { name: "show_list", matches: match_show_list },
    Matcher { name: "clear_request", matches: match_clear_request },
];

/// Map trimmed message text to an intent. Never panics on user input;
/// unrecognized text classifies as [`Intent::Unknown`].
pub fn classify(text: &str, caps: Capabilities) -> Intent {
    let msg = text.trim();
    if msg.is_empty() {
        return Intent::Unknown;
    }
    for matcher in MATCHERS {
        if let Some(intent) = (matcher.matches)(msg, caps) {
            return intent;
        }
    }
    Intent::Unknown
}

/// The matcher chain in evaluation order. Pinned by a test.
pub fn matcher_order() -> Vec<&'static str> {
    MATCHERS.iter().map(|m| m.name).collect()
}

/// Strip the longest matching alias prefix, returning the remainder.
fn strip_alias<'a>(msg: &'a str, aliases: &[&str]) -> Option<&'a str> {
    let mut best: Option<&str> = None;
    for alias in aliases {
        if msg.starts_with(alias) && best.is_none_or(|b| alias.len() > b.len()) {
            best = Some(alias);
        }
    }
    best.map(|alias| msg[alias.len()..].trim_start())
}

fn parse_index(digits: &str) -> Option<usize> {
    digits.parse().ok()
}

fn match_clear_confirm(msg: &str, _caps: Capabilities) -> Option<Intent> {
    CLEAR_CONFIRM_PHRASES
        .contains(&msg)
        .then_some(Intent::ClearConfirm)
}

fn match_help(msg: &str, _caps: Capabilities) -> Option<Intent> {
    HELP_ALIASES
        .contains(&msg.to_lowercase().as_str())
        .then_some(Intent::Help)
}

fn match_edit_comment(msg: &str, _caps: Capabilities) -> Option<Intent> {
    let rest = strip_alias(msg, EDIT_COMMENT_ALIASES)?;
    let Some(caps) = EDIT_COMMENT_ARGS_RE.captures(rest) else {
        return Some(Intent::Malformed(Usage::EditComment));
    };
    let Some(index) = parse_index(&caps[1]) else {
        return Some(Intent::Malformed(Usage::EditComment));
    };
    Some(Intent::EditComment {
        index,
        old: caps[2].trim().to_string(),
        new: caps[3].trim().to_string(),
    })
}

fn match_add_comment(msg: &str, _caps: Capabilities) -> Option<Intent> {
    let rest = strip_alias(msg, COMMENT_ALIASES)?;
    let Some(caps) = COMMENT_ARGS_RE.captures(rest) else {
        return Some(Intent::Malformed(Usage::Comment));
    };
    let Some(index) = parse_index(&caps[1]) else {
        return Some(Intent::Malformed(Usage::Comment));
    };
    Some(Intent::AddComment {
        index,
        text: caps[2].trim().to_string(),
    })
}

fn match_delete(msg: &str, _caps: Capabilities) -> Option<Intent> {
    let rest = strip_alias(msg, DELETE_ALIASES)?;
    let Some(m) = FIRST_INT_RE.find(rest) else {
        return Some(Intent::Malformed(Usage::Delete));
    };
    match parse_index(m.as_str()) {
        Some(index) => Some(Intent::DeleteByIndex(index)),
        None => Some(Intent::Malformed(Usage::Delete)),
    }
}

fn match_weather(msg: &str, caps: Capabilities) -> Option<Intent> {
    if !caps.weather {
        return None;
    }
    let rest = strip_alias(msg, WEATHER_ALIASES)?.trim();
    if rest.is_empty() {
        return Some(Intent::WeatherQuery(None));
    }
    if ALL_DIGITS_RE.is_match(rest) {
        return match parse_index(rest) {
            Some(index) => Some(Intent::WeatherQuery(Some(WeatherTarget::Index(index)))),
            None => Some(Intent::WeatherQuery(None)),
        };
    }
    Some(Intent::WeatherQuery(Some(WeatherTarget::Query(
        rest.to_string(),
    ))))
}

/// Batch add: the trigger lives on the first line. A first line that is
/// exactly the trigger is dropped; otherwise the text after the trigger is
/// the first place input. Every further non-blank line is one independent
/// input.
fn match_add(msg: &str, caps: Capabilities) -> Option<Intent> {
    let first_line = msg.lines().next().unwrap_or("").trim();
    let remainder = strip_alias(first_line, ADD_ALIASES)?;

    let mut inputs: Vec<String> = Vec::new();
    if !remainder.is_empty() {
        inputs.push(remainder.to_string());
    }
    for line in msg.lines().skip(1) {
        let line = line.trim();
        if !line.is_empty() {
            inputs.push(line.to_string());
        }
    }

    if inputs.is_empty() {
        return Some(Intent::Malformed(Usage::Add));
    }
    if !caps.batch_add {
        inputs.truncate(1);
    }
    Some(Intent::AddPlaces(inputs))
}

fn match_show_list(msg: &str, _caps: Capabilities) -> Option<Intent> {
    LIST_ALIASES
        .iter()
        .any(|k| msg.contains(k))
        .then_some(Intent::ShowList)
}

fn match_clear_request(msg: &str, _caps: Capabilities) -> Option<Intent> {
    CLEAR_ALIASES
        .iter()
        .any(|k| msg.contains(k))
        .then_some(Intent::ClearRequest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_default(text: &str) -> Intent {
        classify(text, Capabilities::default())
    }

    #[test]
    fn matcher_order_is_a_contract() {
        assert_eq!(
            matcher_order(),
            vec![
                "clear_confirm",
                "help",
                "edit_comment",
                "add_comment",
                "delete",
                "weather",
                "add",
                "show_list",
                "clear_request",
            ]
        );
    }

    #[test]
    fn confirm_phrase_wins_over_clear_substring() {
        assert_eq!(classify_default("確認清空"), Intent::ClearConfirm);
        assert_eq!(classify_default("確認"), Intent::ClearConfirm);
        assert_eq!(classify_default("清空"), Intent::ClearRequest);
        assert_eq!(classify_default("全部刪除"), Intent::ClearRequest);
        assert_eq!(classify_default("reset"), Intent::ClearRequest);
    }

    #[test]
    fn help_aliases_match_exactly() {
        for msg in ["help", "HELP", "幫助", "指令", "/", "說明"] {
            assert_eq!(classify_default(msg), Intent::Help, "msg: {msg}");
        }
        // Help tokens inside longer text do not trigger help.
        assert_eq!(classify_default("這不是 help"), Intent::Unknown);
    }

    #[test]
    fn single_line_add_keeps_argument() {
        assert_eq!(
            classify_default("新增 台北101"),
            Intent::AddPlaces(vec!["台北101".to_string()])
        );
    }

    #[test]
    fn compound_add_alias_beats_list_substring() {
        // "新增地點 X" must add, even though "地點" alone shows the list.
        assert_eq!(
            classify_default("新增地點 台北101"),
            Intent::AddPlaces(vec!["台北101".to_string()])
        );
        assert_eq!(classify_default("地點"), Intent::ShowList);
    }

    #[test]
    fn multi_line_add_drops_bare_trigger_line() {
        assert_eq!(
            classify_default("新增\n台北101\n\n高雄85大樓"),
            Intent::AddPlaces(vec!["台北101".to_string(), "高雄85大樓".to_string()])
        );
    }

    #[test]
    fn first_line_argument_and_extra_lines_combine() {
        assert_eq!(
            classify_default("+台北101\n高雄85大樓"),
            Intent::AddPlaces(vec!["台北101".to_string(), "高雄85大樓".to_string()])
        );
    }

    #[test]
    fn add_without_argument_is_missing_argument() {
        assert_eq!(classify_default("新增"), Intent::Malformed(Usage::Add));
        assert_eq!(classify_default("+"), Intent::Malformed(Usage::Add));
    }

    #[test]
    fn single_line_capability_truncates_batch() {
        let caps = Capabilities {
            batch_add: false,
            weather: true,
        };
        assert_eq!(
            classify("新增\n台北101\n高雄85大樓", caps),
            Intent::AddPlaces(vec!["台北101".to_string()])
        );
    }

    #[test]
    fn delete_parses_first_integer() {
        assert_eq!(classify_default("刪除 2"), Intent::DeleteByIndex(2));
        assert_eq!(classify_default("-2"), Intent::DeleteByIndex(2));
        assert_eq!(classify_default("delete1"), Intent::DeleteByIndex(1));
        assert_eq!(classify_default("刪除第 3 個"), Intent::DeleteByIndex(3));
    }

    #[test]
    fn delete_without_number_is_missing_argument() {
        assert_eq!(classify_default("刪除"), Intent::Malformed(Usage::Delete));
        assert_eq!(
            classify_default("移除 台北"),
            Intent::Malformed(Usage::Delete)
        );
    }

    #[test]
    fn comment_captures_index_and_payload() {
        assert_eq!(
            classify_default("註解 2 好吃"),
            Intent::AddComment {
                index: 2,
                text: "好吃".to_string()
            }
        );
        assert_eq!(
            classify_default("*1 下次再來"),
            Intent::AddComment {
                index: 1,
                text: "下次再來".to_string()
            }
        );
    }

    #[test]
    fn dash_in_comment_payload_does_not_misfire_delete() {
        assert_eq!(
            classify_default("註解 2 好吃-便宜"),
            Intent::AddComment {
                index: 2,
                text: "好吃-便宜".to_string()
            }
        );
    }

    #[test]
    fn comment_without_payload_is_missing_argument() {
        assert_eq!(classify_default("註解"), Intent::Malformed(Usage::Comment));
        assert_eq!(
            classify_default("備註 2"),
            Intent::Malformed(Usage::Comment)
        );
    }

    #[test]
    fn edit_comment_takes_old_and_new() {
        assert_eq!(
            classify_default("修改註解 1 好吃 超級好吃"),
            Intent::EditComment {
                index: 1,
                old: "好吃".to_string(),
                new: "超級好吃".to_string(),
            }
        );
    }

    #[test]
    fn edit_comment_old_match_is_non_greedy() {
        // old captures minimally, the rest is the replacement.
        assert_eq!(
            classify_default("修改註解 2 a b c"),
            Intent::EditComment {
                index: 2,
                old: "a".to_string(),
                new: "b c".to_string(),
            }
        );
    }

    #[test]
    fn edit_comment_prefix_wins_over_comment_prefix() {
        assert_eq!(
            classify_default("修改註解 1 好吃"),
            Intent::Malformed(Usage::EditComment)
        );
    }

    #[test]
    fn weather_targets() {
        assert_eq!(classify_default("天氣"), Intent::WeatherQuery(None));
        assert_eq!(
            classify_default("天氣 2"),
            Intent::WeatherQuery(Some(WeatherTarget::Index(2)))
        );
        assert_eq!(
            classify_default("weather 台北車站"),
            Intent::WeatherQuery(Some(WeatherTarget::Query("台北車站".to_string())))
        );
    }

    #[test]
    fn weather_capability_off_falls_through_to_unknown() {
        let caps = Capabilities {
            batch_add: true,
            weather: false,
        };
        assert_eq!(classify("天氣", caps), Intent::Unknown);
    }

    #[test]
    fn list_aliases_match_as_substrings() {
        assert_eq!(classify_default("清單"), Intent::ShowList);
        assert_eq!(classify_default("看一下清單"), Intent::ShowList);
        assert_eq!(classify_default("list"), Intent::ShowList);
    }

    #[test]
    fn unknown_and_empty_input() {
        assert_eq!(classify_default("早安"), Intent::Unknown);
        assert_eq!(classify_default(""), Intent::Unknown);
        assert_eq!(classify_default("   "), Intent::Unknown);
    }
}
