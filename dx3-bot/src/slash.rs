//! Slash commands: registration payloads and mapping onto [`Command`].

use serenity::all::{CommandOptionType, CreateCommand, CreateCommandOption};

use crate::command::{self, usage, Command, CommandError};

fn text_option(name: &str, description: &str, required: bool) -> CreateCommandOption {
    CreateCommandOption::new(CommandOptionType::String, name, description).required(required)
}

/// Every slash command the bot registers.
#[must_use]
pub fn definitions() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new("지정")
            .description("활성 캐릭터를 지정합니다")
            .add_option(text_option("이름", "캐릭터 이름", true)),
        CreateCommand::new("시트확인")
            .description("캐릭터 시트를 봅니다")
            .add_option(text_option("이름", "캐릭터 이름 (생략하면 활성 캐릭터)", false)),
        CreateCommand::new("등침").description("등장 침식 1D10을 굴립니다"),
        CreateCommand::new("판정")
            .description("판정 다이스 식을 만듭니다")
            .add_option(text_option("기능", "기능 또는 능력치 (예: 백병, 정신)", true))
            .add_option(text_option("보정", "추가 다이스 (예: 2, -1)", false)),
        CreateCommand::new("로이스")
            .description("로이스를 추가하거나 교체합니다")
            .add_option(text_option("이름", "대상 이름", true))
            .add_option(text_option("p감정", "P감정", true))
            .add_option(text_option("n감정", "N감정", true))
            .add_option(text_option("내용", "설명", false)),
        CreateCommand::new("타이터스")
            .description("로이스를 타이터스로 전환합니다")
            .add_option(text_option("이름", "로이스 이름", true)),
        CreateCommand::new("콤보")
            .description("콤보나 이펙트를 사용합니다")
            .add_option(text_option("이름", "콤보 또는 이펙트 이름", true)),
        CreateCommand::new("시트등록")
            .description("구글 시트를 연동합니다")
            .add_option(text_option("주소", "스프레드시트 URL 또는 ID", true)),
    ]
}

fn option<'a>(options: &'a [(String, String)], name: &str) -> Option<&'a str> {
    options
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
}

fn required(
    options: &[(String, String)],
    name: &str,
    usage: &'static str,
) -> Result<String, CommandError> {
    option(options, name)
        .map(str::to_string)
        .ok_or(CommandError::Usage(usage))
}

fn add_lois(options: &[(String, String)]) -> Result<Command, CommandError> {
    Ok(Command::AddLois {
        name: required(options, "이름", usage::LOIS)?,
        positive: required(options, "p감정", usage::LOIS)?,
        negative: required(options, "n감정", usage::LOIS)?,
        description: option(options, "내용").unwrap_or_default().to_string(),
    })
}

/// Map a slash invocation to a [`Command`]. `None` for names the bot did
/// not register.
#[must_use]
pub fn to_command(name: &str, options: &[(String, String)]) -> Option<Result<Command, CommandError>> {
    let command = match name {
        "지정" => required(options, "이름", usage::ASSIGN).map(|name| Command::Assign { name }),
        "시트확인" => Ok(Command::ShowSheet {
            name: option(options, "이름").map(str::to_string),
        }),
        "등침" => Ok(Command::EntryErosion),
        "판정" => required(options, "기능", usage::CHECK)
            .and_then(|label| command::check(&label, option(options, "보정"))),
        "로이스" => add_lois(options),
        "타이터스" => required(options, "이름", usage::TITUS).map(|name| Command::Titus { name }),
        "콤보" => required(options, "이름", usage::INVOKE).map(|name| Command::Invoke { name }),
        "시트등록" => required(options, "주소", usage::LINK).map(|target| Command::LinkSheet { target }),
        _ => return None,
    };
    Some(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CheckTarget;
    use dx3_core::types::Skill;

    fn opts(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn every_definition_maps_to_a_command() {
        let full = opts(&[
            ("이름", "x"),
            ("기능", "백병"),
            ("p감정", "p"),
            ("n감정", "n"),
            ("주소", "https://docs.google.com/spreadsheets/d/abc/edit"),
        ]);
        for name in ["지정", "시트확인", "등침", "판정", "로이스", "타이터스", "콤보", "시트등록"] {
            assert!(
                matches!(to_command(name, &full), Some(Ok(_))),
                "{name} did not map"
            );
        }
        assert_eq!(definitions().len(), 8);
    }

    #[test]
    fn combo_slash_invokes() {
        assert_eq!(
            to_command("콤보", &opts(&[("이름", "흑뢰 일섬")])),
            Some(Ok(Command::Invoke {
                name: "흑뢰 일섬".into()
            }))
        );
    }

    #[test]
    fn check_modifier_is_optional() {
        assert_eq!(
            to_command("판정", &opts(&[("기능", "백병"), ("보정", "2")])),
            Some(Ok(Command::Check {
                target: CheckTarget::Skill(Skill::Melee),
                modifier: 2
            }))
        );
        assert_eq!(
            to_command("판정", &opts(&[("기능", "요리")])),
            Some(Err(CommandError::Usage(usage::CHECK)))
        );
    }

    #[test]
    fn missing_required_option_is_usage_error() {
        assert_eq!(
            to_command("로이스", &opts(&[("이름", "하루카"), ("p감정", "동정")])),
            Some(Err(CommandError::Usage(usage::LOIS)))
        );
        assert_eq!(
            to_command("지정", &opts(&[("이름", "  ")])),
            Some(Err(CommandError::Usage(usage::ASSIGN)))
        );
        assert!(to_command("모름", &[]).is_none());
    }
}
