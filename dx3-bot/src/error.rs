//! Bot-level errors and their chat wording.

use dx3_core::Dx3Error;
use dx3_sheets::SheetsError;
use thiserror::Error;

use crate::command::CommandError;

/// Anything a command can fail with.
#[derive(Debug, Error)]
pub enum BotError {
    /// Rejected by the parser.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Store or model failure.
    #[error(transparent)]
    Core(#[from] Dx3Error),

    /// Spreadsheet failure.
    #[error(transparent)]
    Sheets(#[from] SheetsError),

    /// No credentials configured.
    #[error("Sheets integration is disabled")]
    SheetsDisabled,

    /// Owner-only command from someone else.
    #[error("Owner-only command")]
    NotOwner,

    /// `!시트등록` argument is neither a URL nor an id.
    #[error("Not a spreadsheet URL or id: {0}")]
    InvalidSheetUrl(String),

    /// The character has no linked spreadsheet.
    #[error("No sheet linked to {0}")]
    NotLinked(String),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, BotError>;

impl BotError {
    /// Whether this is an operator-visible failure rather than a user
    /// mistake.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Core(Dx3Error::Io(_) | Dx3Error::Serialization(_) | Dx3Error::Config(_))
        )
    }

    /// Korean reply for the channel.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Command(e) => format!("❌ {e}"),
            Self::Core(e) => core_message(e),
            Self::Sheets(e) => sheets_message(e),
            Self::SheetsDisabled => "❌ 구글 시트 연동이 설정되지 않았습니다.".to_string(),
            Self::NotOwner => "❌ 봇 관리자만 사용할 수 있는 명령어입니다.".to_string(),
            Self::InvalidSheetUrl(input) => {
                format!("❌ 스프레드시트 주소를 인식하지 못했습니다: {input}")
            }
            Self::NotLinked(name) => format!("❌ '{name}'에 연동된 시트가 없습니다. `!시트등록`을 먼저 해주세요."),
        }
    }
}

fn core_message(err: &Dx3Error) -> String {
    match err {
        Dx3Error::NoActiveCharacter => {
            "❌ 활성화된 캐릭터가 없습니다. `!지정 \"캐릭터 이름\"`으로 먼저 지정해주세요.".to_string()
        }
        Dx3Error::CharacterNotFound(name) => format!("❌ '{name}' 캐릭터를 찾을 수 없습니다."),
        Dx3Error::LoisNotFound(name) => format!("❌ '{name}' 로이스를 찾을 수 없습니다."),
        Dx3Error::ComboNotFound(name) => {
            format!("❌ '{name}' 콤보 또는 이펙트를 찾을 수 없습니다.")
        }
        Dx3Error::UnknownField(label) => format!("❌ 알 수 없는 항목입니다: {label}"),
        Dx3Error::InvalidValue { field, value } => {
            format!("❌ {field}에는 숫자를 입력해주세요 (입력값: {value})")
        }
        Dx3Error::Serialization(_) | Dx3Error::Config(_) | Dx3Error::Io(_) => {
            "❌ 데이터를 저장하는 중 오류가 발생했습니다.".to_string()
        }
    }
}

fn sheets_message(err: &SheetsError) -> String {
    match err {
        SheetsError::Http { status: 403, .. } => {
            "❌ 시트에 접근할 권한이 없습니다. 서비스 계정에 편집 권한을 공유해주세요.".to_string()
        }
        SheetsError::Http { status: 404, .. } => "❌ 스프레드시트를 찾을 수 없습니다.".to_string(),
        SheetsError::NotRecognized(_) => {
            "❌ 캐릭터 시트 양식을 인식하지 못했습니다. 캐릭터 이름 칸을 확인해주세요.".to_string()
        }
        SheetsError::Timeout(_) | SheetsError::Unavailable(_) => {
            "❌ 구글 시트가 응답하지 않습니다. 잠시 후 다시 시도해주세요.".to_string()
        }
        _ => "❌ 구글 시트와 통신하는 중 오류가 발생했습니다.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_failures_are_internal() {
        let io = BotError::from(Dx3Error::Io(std::io::Error::other("disk")));
        assert!(io.is_internal());
        assert!(!BotError::from(Dx3Error::NoActiveCharacter).is_internal());
        assert!(!BotError::NotOwner.is_internal());
    }

    #[test]
    fn messages_name_the_missing_thing() {
        let msg = BotError::from(Dx3Error::LoisNotFound("하루카".into())).user_message();
        assert!(msg.contains("하루카"));
        let msg = BotError::from(SheetsError::Http {
            status: 403,
            body: String::new(),
        })
        .user_message();
        assert!(msg.contains("권한"));
    }
}
