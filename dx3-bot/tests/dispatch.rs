//! End-to-end command handling against an in-memory store and sheet.

use std::sync::Arc;

use dx3_bot::{Dispatcher, Invocation};
use dx3_core::erosion::ErosionBand;
use dx3_core::store::Store;
use dx3_core::types::{CharacterKey, ServerId, UserId};
use dx3_core::Dx3Config;
use dx3_sheets::layout::{cell_for, ComboCell, EffectColumn, FieldKey, ScalarField};
use dx3_sheets::{CellWrite, MemorySheet, SheetGateway};

const SERVER: u64 = 10;
const USER: u64 = 20;
const OTHER_USER: u64 = 21;
const OWNER: u64 = 99;
const SHEET_ID: &str = "1AbCdEfGhIjKlMnOpQrStUvWxYz_0123456789";

fn config() -> Dx3Config {
    let mut config = Dx3Config::default();
    config.discord.owner_id = Some(OWNER);
    config
}

fn bot() -> Dispatcher {
    Dispatcher::new(config(), Store::in_memory(), None)
}

fn bot_with_sheet() -> (Dispatcher, Arc<MemorySheet>) {
    let sheet = Arc::new(MemorySheet::new());
    sheet
        .set(SHEET_ID, &ScalarField::Name.cell().to_string(), "카미야 렌")
        .expect("name");
    let gateway: Arc<dyn SheetGateway> = sheet.clone();
    (Dispatcher::new(config(), Store::in_memory(), Some(gateway)), sheet)
}

fn set(sheet: &MemorySheet, key: FieldKey, index: usize, value: &str) {
    let cell = cell_for(key, index).expect("cell");
    sheet.set(SHEET_ID, &cell.to_string(), value).expect("set");
}

fn key(name: &str) -> CharacterKey {
    CharacterKey::new(ServerId(SERVER), UserId(USER), name)
}

async fn say_as(bot: &Dispatcher, user: u64, line: &str) -> String {
    bot.handle_message(Invocation::new(SERVER, user), line)
        .await
        .expect("addressed to the bot")
        .plain()
}

async fn say(bot: &Dispatcher, line: &str) -> String {
    say_as(bot, USER, line).await
}

fn erosion(bot: &Dispatcher, name: &str) -> (i32, i32) {
    bot.with_store(|s| {
        let record = s.character(&key(name)).expect("record");
        (record.erosion_rate(), record.erosion_d())
    })
}

// ---------------------------------------------------------------------------
// Stats and erosion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn erosion_crossing_announces_tier_change() {
    let bot = bot();
    say(&bot, "!시트입력 카미야 침식률 45").await;
    let reply = say(&bot, "!침식률+60").await;

    assert_eq!(erosion(&bot, "카미야"), (105, 3));
    assert!(reply.contains("45% → 105%"), "{reply}");
    assert!(reply.contains("침식D 변경: 0 → 3"), "{reply}");
}

#[tokio::test]
async fn sheet_input_creates_and_activates() {
    let bot = bot();
    let reply = say(&bot, r#"!시트입력 "카미야 렌" HP 24 코드네임 "검은 번개""#).await;
    assert!(reply.contains("지정했습니다"), "{reply}");

    bot.with_store(|s| {
        assert_eq!(s.active(ServerId(SERVER), UserId(USER)), Some("카미야 렌"));
        let record = s.character(&key("카미야 렌")).expect("record");
        assert_eq!(record.hp, 24);
        assert_eq!(record.code_name, "검은 번개");
    });

    say(&bot, "!시트입력 다른사람 HP 1").await;
    bot.with_store(|s| {
        assert_eq!(
            s.active(ServerId(SERVER), UserId(USER)),
            Some("카미야 렌"),
            "an existing pointer is left alone"
        );
    });
}

#[tokio::test]
async fn check_builds_dice_expression() {
    let bot = bot();
    say(&bot, "!시트입력 카미야 육체 3 백병 2 침식률 60").await;
    let reply = say(&bot, "!판정 백병 1").await;
    assert!(reply.contains("`5DX+2@10`"), "{reply}");
}

#[tokio::test]
async fn commands_without_active_character_change_nothing() {
    let bot = bot();
    let reply = say(&bot, "!HP-3").await;
    assert!(reply.contains("활성화된 캐릭터가 없습니다"), "{reply}");
    assert_eq!(bot.with_store(Store::character_count), 0);
}

#[tokio::test]
async fn usage_errors_reply_with_usage() {
    let bot = bot();
    say(&bot, "!시트입력 카미야 HP 10").await;
    let reply = say(&bot, "!로이스 하루카").await;
    assert!(reply.contains("사용법"), "{reply}");
    bot.with_store(|s| assert!(s.character(&key("카미야")).expect("record").lois.is_empty()));

    let reply = say(&bot, "!지정 없는사람").await;
    assert!(reply.contains("찾을 수 없습니다"), "{reply}");
    assert!(bot.handle_message(Invocation::new(SERVER, USER), "안녕").await.is_none());
}

// ---------------------------------------------------------------------------
// Lois
// ---------------------------------------------------------------------------

#[tokio::test]
async fn same_name_lois_replaces_in_place() {
    let bot = bot();
    say(&bot, "!시트입력 카미야 HP 10").await;
    say(&bot, "!로이스 하루카 동정 불안 같은 반").await;
    say(&bot, "!로이스 UGN 신뢰 식상감").await;
    let reply = say(&bot, "!로이스 하루카 연정 불안 소꿉친구").await;
    assert!(reply.contains("갱신"), "{reply}");

    bot.with_store(|s| {
        let lois = &s.character(&key("카미야")).expect("record").lois;
        assert_eq!(lois.len(), 2);
        assert_eq!(lois[0].name, "하루카");
        assert_eq!(lois[0].positive, "연정");
    });
}

#[tokio::test]
async fn titus_is_one_way_and_stays_listed() {
    let bot = bot();
    say(&bot, "!시트입력 카미야 HP 10").await;
    say(&bot, "!로이스 하루카 동정 불안 같은 반").await;

    let first = say(&bot, "!타이터스 하루카").await;
    assert!(first.contains("타이터스로 전환했습니다"), "{first}");
    let second = say(&bot, "!타이터스 하루카").await;
    assert!(second.contains("이미"), "{second}");

    let list = say(&bot, "!로이스목록").await;
    assert!(list.contains("~~하루카~~"), "{list}");
    assert!(list.contains("~~같은 반~~"), "{list}");
}

// ---------------------------------------------------------------------------
// Combos
// ---------------------------------------------------------------------------

#[tokio::test]
async fn local_combo_applies_its_cost() {
    let bot = bot();
    say(&bot, "!시트입력 카미야 침식률 58").await;
    say(&bot, r#"!콤보 "흑뢰 일섬" 4 백병 공격"#).await;

    let reply = say(&bot, "!@흑뢰 일섬").await;
    assert!(reply.contains("백병 공격"), "{reply}");
    assert!(reply.contains("침식D 변경: 0 → 1"), "{reply}");
    assert_eq!(erosion(&bot, "카미야"), (62, 1));

    let list = say(&bot, "!콤보목록").await;
    assert!(list.contains("흑뢰 일섬"), "{list}");

    say(&bot, r#"!콤보삭제 "흑뢰 일섬""#).await;
    let reply = say(&bot, "!@흑뢰 일섬").await;
    assert!(reply.contains("찾을 수 없습니다"), "{reply}");
}

#[tokio::test]
async fn deleting_a_character_cascades() {
    let bot = bot();
    say(&bot, r#"!시트입력 "카미야 렌" HP 20"#).await;
    say(&bot, "!콤보 일섬 3 내용").await;
    say(&bot, r#"!캐릭터삭제 "카미야 렌""#).await;

    bot.with_store(|s| {
        assert!(s.character(&key("카미야 렌")).is_none());
        assert!(s.active(ServerId(SERVER), UserId(USER)).is_none());
        assert!(s.combos(&key("카미야 렌")).is_empty());
    });
}

// ---------------------------------------------------------------------------
// Dice-bot correlation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dice_result_goes_to_requester() {
    let bot = bot();
    say(&bot, "!시트입력 카미야 침식률 30").await;
    let reply = say(&bot, "!등침").await;
    assert!(reply.contains("1D10"), "{reply}");

    assert!(bot.on_dice_result(ServerId(SERVER + 1), 5).await.is_none());
    let reply = bot
        .on_dice_result(ServerId(SERVER), 7)
        .await
        .expect("pending roll");
    assert!(reply.plain().contains("+7"));
    assert_eq!(erosion(&bot, "카미야"), (37, 0));

    assert!(bot.on_dice_result(ServerId(SERVER), 7).await.is_none(), "slot consumed");
}

#[tokio::test]
async fn dice_result_uses_current_active_character() {
    let bot = bot();
    say(&bot, "!시트입력 A 침식률 30").await;
    say(&bot, "!시트입력 B 침식률 40").await;
    say(&bot, "!등침").await;
    say(&bot, "!지정 B").await;

    bot.on_dice_result(ServerId(SERVER), 4).await.expect("pending roll");
    assert_eq!(erosion(&bot, "A").0, 30);
    assert_eq!(erosion(&bot, "B").0, 44);
}

#[tokio::test]
async fn later_request_takes_the_slot() {
    let bot = bot();
    say_as(&bot, USER, "!시트입력 A 침식률 30").await;
    say_as(&bot, OTHER_USER, "!시트입력 B 침식률 40").await;
    say_as(&bot, USER, "!등침").await;
    let reply = say_as(&bot, OTHER_USER, "!등침").await;
    assert!(reply.contains("대체했습니다"), "{reply}");

    bot.on_dice_result(ServerId(SERVER), 3).await.expect("pending roll");
    assert_eq!(erosion(&bot, "A").0, 30);
    bot.with_store(|s| {
        let b = s
            .character(&CharacterKey::new(ServerId(SERVER), UserId(OTHER_USER), "B"))
            .expect("record");
        assert_eq!(b.erosion_rate(), 43);
    });
}

#[tokio::test]
async fn internal_roll_applies_immediately() {
    let mut config = config();
    config.erosion.internal_roll = true;
    let bot = Dispatcher::new(config, Store::in_memory(), None);
    say(&bot, "!시트입력 카미야 침식률 30").await;
    say(&bot, "!등침").await;

    let (rate, _) = erosion(&bot, "카미야");
    assert!((31..=40).contains(&rate), "rolled to {rate}");
    assert!(bot.on_dice_result(ServerId(SERVER), 5).await.is_none());
}

// ---------------------------------------------------------------------------
// Sheets
// ---------------------------------------------------------------------------

#[tokio::test]
async fn link_imports_and_activates() {
    let (bot, sheet) = bot_with_sheet();
    set(&sheet, FieldKey::Scalar(ScalarField::Hp), 0, "21");

    let reply = say(&bot, &format!("!시트등록 https://docs.google.com/spreadsheets/d/{SHEET_ID}/edit")).await;
    assert!(reply.contains("연동"), "{reply}");
    bot.with_store(|s| {
        assert_eq!(s.active(ServerId(SERVER), UserId(USER)), Some("카미야 렌"));
        assert_eq!(s.character(&key("카미야 렌")).expect("record").hp, 21);
        assert_eq!(
            s.sheet_link(&key("카미야 렌")).map(|l| l.spreadsheet_id.as_str()),
            Some(SHEET_ID)
        );
    });
}

#[tokio::test]
async fn linking_without_sheets_is_refused() {
    let bot = bot();
    let reply = say(&bot, &format!("!시트등록 {SHEET_ID}")).await;
    assert!(reply.contains("설정되지 않았습니다"), "{reply}");
}

#[tokio::test]
async fn stat_changes_write_through() {
    let (bot, sheet) = bot_with_sheet();
    say(&bot, &format!("!시트등록 {SHEET_ID}")).await;
    say(&bot, "!HP=12").await;
    say(&bot, "!침식률+5").await;
    say(&bot, "!D로이스 No.17 귀환자").await;

    let writes: Vec<CellWrite> = sheet.writes().into_iter().map(|(_, w)| w).collect();
    assert_eq!(
        writes,
        vec![
            CellWrite::Hp(12),
            CellWrite::Erosion(5),
            CellWrite::DLoisNumber("No.17".into()),
            CellWrite::DLoisDescription("귀환자".into()),
        ]
    );
}

#[tokio::test]
async fn titus_marks_the_sheet_row() {
    let (bot, sheet) = bot_with_sheet();
    set(&sheet, FieldKey::Lois(dx3_sheets::layout::LoisColumn::Name), 2, "UGN");
    say(&bot, &format!("!시트등록 {SHEET_ID}")).await;
    say(&bot, "!타이터스 UGN").await;

    assert_eq!(
        sheet.writes().last().map(|(_, w)| w.clone()),
        Some(CellWrite::LoisBurned { slot: 2, burned: true })
    );
}

#[tokio::test]
async fn failed_write_keeps_local_change() {
    let (bot, sheet) = bot_with_sheet();
    say(&bot, &format!("!시트등록 {SHEET_ID}")).await;
    sheet.set_offline(true);

    let reply = say(&bot, "!HP=5").await;
    assert!(reply.contains("반영하지 못했습니다"), "{reply}");
    bot.with_store(|s| assert_eq!(s.character(&key("카미야 렌")).expect("record").hp, 5));
}

#[tokio::test]
async fn show_sheet_falls_back_when_offline() {
    let (bot, sheet) = bot_with_sheet();
    say(&bot, &format!("!시트등록 {SHEET_ID}")).await;
    sheet.set_offline(true);

    let reply = say(&bot, "!시트확인").await;
    assert!(reply.contains("카미야 렌"), "{reply}");
    assert!(reply.contains("저장된 데이터"), "{reply}");

    let reply = say(&bot, "!시트동기화").await;
    assert!(reply.contains("저장된 데이터"), "{reply}");
}

#[tokio::test]
async fn refresh_keeps_conditions() {
    let (bot, sheet) = bot_with_sheet();
    say(&bot, &format!("!시트등록 {SHEET_ID}")).await;
    say(&bot, "!상태이상 추가 사독").await;
    set(&sheet, FieldKey::Scalar(ScalarField::Hp), 0, "30");

    let reply = say(&bot, "!시트동기화").await;
    assert!(reply.contains("다시 불러왔습니다"), "{reply}");
    bot.with_store(|s| {
        let record = s.character(&key("카미야 렌")).expect("record");
        assert_eq!(record.hp, 30);
        assert_eq!(record.conditions, vec!["사독".to_string()]);
    });
}

#[tokio::test]
async fn chat_lois_survives_refresh() {
    let (bot, _sheet) = bot_with_sheet();
    say(&bot, &format!("!시트등록 {SHEET_ID}")).await;
    let reply = say(&bot, "!로이스 하루카 동정 불안 같은 반").await;
    assert!(reply.contains("하루카"), "{reply}");
    say(&bot, "!로이스 츠바키 우정 질투").await;
    say(&bot, "!타이터스 츠바키").await;

    say(&bot, "!시트확인").await;
    let reply = say(&bot, "!시트동기화").await;
    assert!(reply.contains("다시 불러왔습니다"), "{reply}");
    bot.with_store(|s| {
        let record = s.character(&key("카미야 렌")).expect("record");
        let (_, haruka) = record.find_lois("하루카").expect("chat lois kept");
        assert_eq!(haruka.description, "같은 반");
        assert!(record.find_lois("츠바키").expect("titus kept").1.burned);
    });
}

#[tokio::test]
async fn sheet_combo_variant_is_chosen_before_cost() {
    let (bot, sheet) = bot_with_sheet();
    set(&sheet, FieldKey::Scalar(ScalarField::Erosion), 0, "98");
    set(&sheet, FieldKey::Combo(ComboCell::Name), 0, "흑뢰");
    set(&sheet, FieldKey::Combo(ComboCell::ErosionCost), 0, "4");
    set(&sheet, FieldKey::Combo(ComboCell::Content(ErosionBand::Low)), 0, "저침식 내용");
    set(&sheet, FieldKey::Combo(ComboCell::Content(ErosionBand::High)), 0, "고침식 내용");
    say(&bot, &format!("!시트등록 {SHEET_ID}")).await;

    let reply = say(&bot, "!@흑뢰").await;
    assert!(reply.contains("저침식 내용"), "{reply}");
    assert!(reply.contains("침식D 변경: 1 → 3"), "{reply}");
    assert_eq!(erosion(&bot, "카미야 렌"), (102, 3));
    assert_eq!(
        sheet.writes().last().map(|(_, w)| w.clone()),
        Some(CellWrite::Erosion(102))
    );

    let reply = say(&bot, "!@흑뢰").await;
    assert!(reply.contains("고침식 내용"), "{reply}");
}

#[tokio::test]
async fn effect_shows_erosion_adjusted_level() {
    let (bot, sheet) = bot_with_sheet();
    set(&sheet, FieldKey::Scalar(ScalarField::Erosion), 0, "100");
    set(&sheet, FieldKey::Effect(EffectColumn::Name), 0, "코키토스");
    set(&sheet, FieldKey::Effect(EffectColumn::Level), 0, "2");
    set(&sheet, FieldKey::Effect(EffectColumn::ErosionCost), 0, "2");
    say(&bot, &format!("!시트등록 {SHEET_ID}")).await;

    let reply = say(&bot, "!@코키토스").await;
    assert!(reply.contains("Lv 2 → 3"), "{reply}");
    assert_eq!(erosion(&bot, "카미야 렌").0, 102);
}

// ---------------------------------------------------------------------------
// Admin and persistence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn admin_commands_are_owner_only() {
    let bot = bot();
    say(&bot, "!시트입력 카미야 HP 10").await;

    let reply = say(&bot, "!리셋").await;
    assert!(reply.contains("관리자"), "{reply}");
    assert_eq!(bot.with_store(Store::character_count), 1);

    let reply = say_as(&bot, OWNER, "!버전업").await;
    assert!(reply.contains("v1"), "{reply}");
    let reply = say(&bot, "!버전").await;
    assert!(reply.contains("v1"), "{reply}");

    let reply = say_as(&bot, OWNER, "!리셋").await;
    assert!(reply.contains("1명"), "{reply}");
    assert_eq!(bot.with_store(Store::character_count), 0);
}

#[tokio::test]
async fn reset_drops_pending_roll() {
    let bot = bot();
    say(&bot, "!시트입력 카미야 침식률 40").await;
    say(&bot, "!등침").await;
    say_as(&bot, OWNER, "!리셋").await;

    say(&bot, "!시트입력 카미야 침식률 40").await;
    assert!(bot.on_dice_result(ServerId(SERVER), 7).await.is_none());
    assert_eq!(erosion(&bot, "카미야"), (40, 0));
}

#[tokio::test]
async fn state_survives_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    {
        let bot = Dispatcher::new(config(), Store::open(dir.path()).expect("open"), None);
        say(&bot, "!시트입력 카미야 침식률 72").await;
        say(&bot, "!콤보 일섬 3 내용").await;
        say(&bot, "!로이스 하루카 동정 불안").await;
    }

    let store = Store::open(dir.path()).expect("reopen");
    assert_eq!(store.active(ServerId(SERVER), UserId(USER)), Some("카미야"));
    let record = store.character(&key("카미야")).expect("record");
    assert_eq!(record.erosion_d(), 1);
    assert_eq!(record.lois.len(), 1);
    assert_eq!(store.combos(&key("카미야")).len(), 1);
}
