//! Chat command grammar.
//!
//! Every command the bot understands is a [`Command`] variant; the chat
//! parser and the slash-command mapper both produce one, and the
//! dispatcher matches on it exhaustively.

use std::sync::LazyLock;

use dx3_core::field::{Field, NumericField, Op};
use dx3_core::types::{Attribute, Skill};
use regex::Regex;
use thiserror::Error;

/// What a roll request is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckTarget {
    /// A skill; dice come from its attribute.
    Skill(Skill),
    /// A bare attribute, no skill bonus.
    Attribute(Attribute),
}

impl CheckTarget {
    /// Parse a skill or attribute label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        Skill::from_label(label)
            .map(Self::Skill)
            .or_else(|| Attribute::from_label(label).map(Self::Attribute))
    }

    /// Label as typed.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Skill(s) => s.label(),
            Self::Attribute(a) => a.label(),
        }
    }
}

/// `!상태이상` sub-command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionAction {
    /// 추가
    Add,
    /// 해제
    Remove,
}

/// A parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `!지정 "이름"`
    Assign {
        /// Character name.
        name: String,
    },
    /// `!지정해제`
    Unassign,
    /// `!시트입력 "이름" 항목 값 …`
    SheetInput {
        /// Character name.
        name: String,
        /// Validated field writes, in order.
        entries: Vec<(Field, String)>,
    },
    /// `!시트확인 ["이름"]`
    ShowSheet {
        /// Character name; the active one when omitted.
        name: Option<String>,
    },
    /// `!<항목>+N` / `-N` / `=N`
    Adjust {
        /// Stat to change.
        field: NumericField,
        /// Change to apply.
        op: Op,
    },
    /// `!등침`
    EntryErosion,
    /// `!판정 기능 [보정]`
    Check {
        /// Skill or attribute.
        target: CheckTarget,
        /// Extra dice.
        modifier: i32,
    },
    /// `!로이스 "이름" P감정 N감정 [내용]`
    AddLois {
        /// Lois name.
        name: String,
        /// Positive emotion.
        positive: String,
        /// Negative emotion.
        negative: String,
        /// Free text.
        description: String,
    },
    /// `!로이스삭제 "이름"`
    RemoveLois {
        /// Lois name.
        name: String,
    },
    /// `!로이스목록`
    ListLois,
    /// `!타이터스 "이름"`
    Titus {
        /// Lois name.
        name: String,
    },
    /// `!D로이스 번호 [설명]`
    SetDLois {
        /// D-Lois number.
        number: String,
        /// Description.
        description: String,
    },
    /// `!상태이상 추가|해제 이름`
    Condition {
        /// Add or remove.
        action: ConditionAction,
        /// Condition name.
        name: String,
    },
    /// `!콤보 "이름" 침식비용 내용`
    AddCombo {
        /// Combo name.
        name: String,
        /// Erosion cost.
        cost: i32,
        /// Free text.
        content: String,
    },
    /// `!콤보삭제 "이름"`
    RemoveCombo {
        /// Combo name.
        name: String,
    },
    /// `!콤보목록`
    ListCombos,
    /// `!@이름`
    Invoke {
        /// Combo or effect name.
        name: String,
    },
    /// `!캐릭터삭제 "이름"`
    DeleteCharacter {
        /// Character name.
        name: String,
    },
    /// `!시트등록 <URL|ID>`
    LinkSheet {
        /// Share URL or bare spreadsheet id.
        target: String,
    },
    /// `!시트동기화`
    SyncSheet,
    /// `!리셋`
    Reset,
    /// `!버전`
    Version,
    /// `!버전업`
    VersionBump,
    /// `!도움말`
    Help,
}

impl Command {
    /// Short name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Assign { .. } => "assign",
            Self::Unassign => "unassign",
            Self::SheetInput { .. } => "sheet_input",
            Self::ShowSheet { .. } => "show_sheet",
            Self::Adjust { .. } => "adjust",
            Self::EntryErosion => "entry_erosion",
            Self::Check { .. } => "check",
            Self::AddLois { .. } => "add_lois",
            Self::RemoveLois { .. } => "remove_lois",
            Self::ListLois => "list_lois",
            Self::Titus { .. } => "titus",
            Self::SetDLois { .. } => "set_d_lois",
            Self::Condition { .. } => "condition",
            Self::AddCombo { .. } => "add_combo",
            Self::RemoveCombo { .. } => "remove_combo",
            Self::ListCombos => "list_combos",
            Self::Invoke { .. } => "invoke",
            Self::DeleteCharacter { .. } => "delete_character",
            Self::LinkSheet { .. } => "link_sheet",
            Self::SyncSheet => "sync_sheet",
            Self::Reset => "reset",
            Self::Version => "version",
            Self::VersionBump => "version_bump",
            Self::Help => "help",
        }
    }
}

/// Why a command line was rejected before touching any state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Wrong number or shape of arguments.
    #[error("사용법: {0}")]
    Usage(&'static str),
    /// Unknown stat or profile label.
    #[error("알 수 없는 항목입니다: {0}")]
    UnknownField(String),
    /// A numeric field got a non-number.
    #[error("{field}에는 숫자를 입력해주세요 (입력값: {value})")]
    InvalidValue {
        /// Field label.
        field: String,
        /// Rejected input.
        value: String,
    },
}

/// Usage strings, shown verbatim on bad input.
pub mod usage {
    /// `!지정`
    pub const ASSIGN: &str = "!지정 \"캐릭터 이름\"";
    /// `!시트입력`
    pub const SHEET_INPUT: &str = "!시트입력 \"캐릭터 이름\" 항목 값 [항목 값 …]";
    /// `!판정`
    pub const CHECK: &str = "!판정 기능 [보정]";
    /// `!로이스`
    pub const LOIS: &str = "!로이스 \"이름\" P감정 N감정 [내용]";
    /// `!로이스삭제`
    pub const REMOVE_LOIS: &str = "!로이스삭제 \"이름\"";
    /// `!타이터스`
    pub const TITUS: &str = "!타이터스 \"이름\"";
    /// `!D로이스`
    pub const D_LOIS: &str = "!D로이스 번호 [설명]";
    /// `!상태이상`
    pub const CONDITION: &str = "!상태이상 추가|해제 이름";
    /// `!콤보`
    pub const COMBO: &str = "!콤보 \"이름\" 침식비용 내용";
    /// `!콤보삭제`
    pub const REMOVE_COMBO: &str = "!콤보삭제 \"이름\"";
    /// `!@`
    pub const INVOKE: &str = "!@콤보 또는 이펙트 이름";
    /// `!캐릭터삭제`
    pub const DELETE: &str = "!캐릭터삭제 \"캐릭터 이름\"";
    /// `!시트등록`
    pub const LINK: &str = "!시트등록 <스프레드시트 URL 또는 ID>";
}

static ADJUST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?<label>[^\s+\-=]+)\s*(?<op>[+\-=])\s*(?<amount>\d{1,6})$").expect("valid regex")
});

const fn is_open_quote(c: char) -> bool {
    matches!(c, '"' | '“' | '”')
}

/// Split on whitespace, keeping `"…"` / `“…”` runs together.
#[must_use]
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut had_quotes = false;

    for c in input.chars() {
        if is_open_quote(c) {
            quoted = !quoted;
            had_quotes = true;
        } else if c.is_whitespace() && !quoted {
            if !current.is_empty() || had_quotes {
                tokens.push(std::mem::take(&mut current));
            }
            had_quotes = false;
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() || had_quotes {
        tokens.push(current);
    }
    tokens
}

/// Parse one chat line.
///
/// Returns `None` when the line is not addressed to the bot (no prefix or
/// an unknown command name), so unrelated chatter is ignored silently.
#[must_use]
pub fn parse(line: &str, prefix: &str) -> Option<Result<Command, CommandError>> {
    let body = line.trim().strip_prefix(prefix)?.trim();
    if body.is_empty() {
        return None;
    }

    if let Some(name) = body.strip_prefix('@') {
        let name = tokenize(name).join(" ");
        return Some(if name.is_empty() {
            Err(CommandError::Usage(usage::INVOKE))
        } else {
            Ok(Command::Invoke { name })
        });
    }

    if let Some(caps) = ADJUST.captures(body)
        && let Some(field) = NumericField::parse(&caps["label"])
    {
        let amount: i32 = caps["amount"].parse().ok()?;
        let op = Op::parse(&caps["op"], amount)?;
        return Some(Ok(Command::Adjust { field, op }));
    }

    let tokens = tokenize(body);
    let (name, args) = tokens.split_first()?;
    parse_named(name, args)
}

fn rest(args: &[String]) -> String {
    args.join(" ")
}

fn one_name(args: &[String], usage: &'static str) -> Result<String, CommandError> {
    match args {
        [] => Err(CommandError::Usage(usage)),
        [name] if name.is_empty() => Err(CommandError::Usage(usage)),
        _ => Ok(rest(args)),
    }
}

fn parse_named(name: &str, args: &[String]) -> Option<Result<Command, CommandError>> {
    let command = match name {
        "지정" => one_name(args, usage::ASSIGN).map(|name| Command::Assign { name }),
        "지정해제" => Ok(Command::Unassign),
        "시트입력" => parse_sheet_input(args),
        "시트확인" => Ok(Command::ShowSheet {
            name: (!args.is_empty()).then(|| rest(args)),
        }),
        "등침" => Ok(Command::EntryErosion),
        "판정" => parse_check(args),
        "로이스" => match args {
            [name, positive, negative, description @ ..] => Ok(Command::AddLois {
                name: name.clone(),
                positive: positive.clone(),
                negative: negative.clone(),
                description: rest(description),
            }),
            _ => Err(CommandError::Usage(usage::LOIS)),
        },
        "로이스삭제" => one_name(args, usage::REMOVE_LOIS).map(|name| Command::RemoveLois { name }),
        "로이스목록" => Ok(Command::ListLois),
        "타이터스" => one_name(args, usage::TITUS).map(|name| Command::Titus { name }),
        "D로이스" | "d로이스" => match args {
            [number, description @ ..] => Ok(Command::SetDLois {
                number: number.clone(),
                description: rest(description),
            }),
            [] => Err(CommandError::Usage(usage::D_LOIS)),
        },
        "상태이상" => parse_condition(args),
        "콤보" => match args {
            [name, cost, content @ ..] => cost
                .trim_start_matches('+')
                .parse::<i32>()
                .ok()
                .filter(|cost| *cost >= 0)
                .map(|cost| Command::AddCombo {
                    name: name.clone(),
                    cost,
                    content: rest(content),
                })
                .ok_or(CommandError::Usage(usage::COMBO)),
            _ => Err(CommandError::Usage(usage::COMBO)),
        },
        "콤보삭제" => one_name(args, usage::REMOVE_COMBO).map(|name| Command::RemoveCombo { name }),
        "콤보목록" => Ok(Command::ListCombos),
        "캐릭터삭제" => one_name(args, usage::DELETE).map(|name| Command::DeleteCharacter { name }),
        "시트등록" => one_name(args, usage::LINK).map(|target| Command::LinkSheet { target }),
        "시트동기화" => Ok(Command::SyncSheet),
        "리셋" => Ok(Command::Reset),
        "버전" => Ok(Command::Version),
        "버전업" => Ok(Command::VersionBump),
        "도움말" | "help" => Ok(Command::Help),
        _ => return None,
    };
    Some(command)
}

fn parse_sheet_input(args: &[String]) -> Result<Command, CommandError> {
    let Some((name, pairs)) = args.split_first() else {
        return Err(CommandError::Usage(usage::SHEET_INPUT));
    };
    if name.is_empty() || pairs.is_empty() || pairs.len() % 2 != 0 {
        return Err(CommandError::Usage(usage::SHEET_INPUT));
    }
    let entries = pairs
        .chunks_exact(2)
        .map(|pair| {
            let field =
                Field::parse(&pair[0]).map_err(|_| CommandError::UnknownField(pair[0].clone()))?;
            if let Field::Numeric(f) = field
                && pair[1].trim().parse::<i32>().is_err()
            {
                return Err(CommandError::InvalidValue {
                    field: f.label().to_string(),
                    value: pair[1].clone(),
                });
            }
            Ok((field, pair[1].clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Command::SheetInput {
        name: name.clone(),
        entries,
    })
}

/// Build a [`Command::Check`] from a label and an optional modifier.
///
/// # Errors
/// Returns [`CommandError::Usage`] for an unknown skill or a modifier
/// that is not a number.
pub fn check(label: &str, modifier: Option<&str>) -> Result<Command, CommandError> {
    let target = CheckTarget::parse(label).ok_or(CommandError::Usage(usage::CHECK))?;
    let modifier = match modifier {
        Some(m) => m
            .trim()
            .parse::<i32>()
            .map_err(|_| CommandError::Usage(usage::CHECK))?,
        None => 0,
    };
    Ok(Command::Check { target, modifier })
}

fn parse_check(args: &[String]) -> Result<Command, CommandError> {
    match args {
        [label] => check(label, None),
        [label, modifier] => check(label, Some(modifier)),
        _ => Err(CommandError::Usage(usage::CHECK)),
    }
}

fn parse_condition(args: &[String]) -> Result<Command, CommandError> {
    let [action, name @ ..] = args else {
        return Err(CommandError::Usage(usage::CONDITION));
    };
    let action = match action.as_str() {
        "추가" => ConditionAction::Add,
        "해제" | "삭제" => ConditionAction::Remove,
        _ => return Err(CommandError::Usage(usage::CONDITION)),
    };
    if name.is_empty() {
        return Err(CommandError::Usage(usage::CONDITION));
    }
    Ok(Command::Condition {
        action,
        name: rest(name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dx3_core::field::TextField;

    fn ok(line: &str) -> Command {
        parse(line, "!").expect("addressed").expect("valid")
    }

    fn err(line: &str) -> CommandError {
        parse(line, "!").expect("addressed").expect_err("invalid")
    }

    #[test]
    fn tokenizer_keeps_quoted_runs() {
        assert_eq!(tokenize(r#""카미야 렌" 육체 3"#), vec!["카미야 렌", "육체", "3"]);
        assert_eq!(tokenize("“하루카 이치노세” 동정"), vec!["하루카 이치노세", "동정"]);
        assert_eq!(tokenize(r#""" x"#), vec!["", "x"]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn ignores_unaddressed_lines() {
        assert!(parse("안녕하세요", "!").is_none());
        assert!(parse("!", "!").is_none());
        assert!(parse("!모르는명령", "!").is_none());
    }

    #[test]
    fn deltas() {
        assert_eq!(
            ok("!침식률+5"),
            Command::Adjust {
                field: NumericField::Erosion,
                op: Op::Add(5)
            }
        );
        assert_eq!(
            ok("!HP-3"),
            Command::Adjust {
                field: NumericField::Hp,
                op: Op::Sub(3)
            }
        );
        assert_eq!(
            ok("!백병 = 2"),
            Command::Adjust {
                field: NumericField::Skill(Skill::Melee),
                op: Op::Set(2)
            }
        );
    }

    #[test]
    fn sheet_input_validates_pairs() {
        let cmd = ok(r#"!시트입력 "카미야 렌" 육체 3 코드네임 "검은 번개""#);
        let Command::SheetInput { name, entries } = cmd else {
            panic!("wrong variant");
        };
        assert_eq!(name, "카미야 렌");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1], (Field::Text(TextField::CodeName), "검은 번개".into()));

        assert_eq!(err("!시트입력 카미야 육체"), CommandError::Usage(usage::SHEET_INPUT));
        assert_eq!(err("!시트입력 카미야 근력 3"), CommandError::UnknownField("근력".into()));
        assert!(matches!(
            err("!시트입력 카미야 육체 셋"),
            CommandError::InvalidValue { .. }
        ));
    }

    #[test]
    fn lois_arguments() {
        assert_eq!(
            ok(r#"!로이스 "하루카" 동정 불안 같은 반 친구"#),
            Command::AddLois {
                name: "하루카".into(),
                positive: "동정".into(),
                negative: "불안".into(),
                description: "같은 반 친구".into(),
            }
        );
        assert_eq!(err("!로이스 하루카 동정"), CommandError::Usage(usage::LOIS));
        assert_eq!(err("!타이터스"), CommandError::Usage(usage::TITUS));
    }

    #[test]
    fn check_and_modifier() {
        assert_eq!(
            ok("!판정 백병 +2"),
            Command::Check {
                target: CheckTarget::Skill(Skill::Melee),
                modifier: 2
            }
        );
        assert_eq!(
            ok("!판정 정신"),
            Command::Check {
                target: CheckTarget::Attribute(Attribute::Mind),
                modifier: 0
            }
        );
        assert_eq!(err("!판정 요리"), CommandError::Usage(usage::CHECK));
    }

    #[test]
    fn combos_and_invocation() {
        assert_eq!(
            ok(r#"!콤보 "흑뢰 일섬" 4 백병 공격"#),
            Command::AddCombo {
                name: "흑뢰 일섬".into(),
                cost: 4,
                content: "백병 공격".into(),
            }
        );
        assert_eq!(err("!콤보 흑뢰 넷"), CommandError::Usage(usage::COMBO));
        assert_eq!(err("!콤보 흑뢰 -30 회복"), CommandError::Usage(usage::COMBO));
        assert_eq!(
            ok("!@흑뢰 일섬"),
            Command::Invoke {
                name: "흑뢰 일섬".into()
            }
        );
        assert_eq!(err("!@"), CommandError::Usage(usage::INVOKE));
    }

    #[test]
    fn d_lois_is_not_an_adjustment() {
        assert_eq!(
            ok("!D로이스 No.17 귀환자"),
            Command::SetDLois {
                number: "No.17".into(),
                description: "귀환자".into(),
            }
        );
    }

    #[test]
    fn conditions() {
        assert_eq!(
            ok("!상태이상 추가 사독"),
            Command::Condition {
                action: ConditionAction::Add,
                name: "사독".into()
            }
        );
        assert_eq!(err("!상태이상 토글 사독"), CommandError::Usage(usage::CONDITION));
    }

    #[test]
    fn custom_prefix() {
        assert_eq!(parse("?버전", "?"), Some(Ok(Command::Version)));
        assert!(parse("!버전", "?").is_none());
    }
}
