//! Reply rendering.
//!
//! Replies are built as plain data ([`Reply`], [`Card`]) so the dispatcher
//! can be tested without Discord; the event handler turns them into
//! messages and embeds.

use std::fmt::Write as _;

use dx3_core::character::{Combo, Effect, LocalCombo, Lois};
use dx3_core::erosion::{ErosionBand, ErosionChange};
use dx3_core::field::FieldChange;
use dx3_core::types::{Attribute, Skill};
use dx3_core::CharacterRecord;

/// Embed colour for ordinary cards.
pub const COLOR_DEFAULT: u32 = 0x005B_8DEF;
/// Embed colour once erosion is 100% or more.
pub const COLOR_HIGH_EROSION: u32 = 0x00C0_392B;

// Discord embed limits, in characters.
const MAX_TITLE: usize = 256;
const MAX_DESCRIPTION: usize = 4000;
const MAX_FIELDS: usize = 25;
const MAX_FIELD_NAME: usize = 256;
const MAX_FIELD_VALUE: usize = 1024;
const MAX_FOOTER: usize = 2048;
const MAX_EMBED: usize = 6000;

/// A message to send back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    /// Plain message text.
    pub content: String,
    /// Optional embed.
    pub card: Option<Card>,
}

/// Embed-shaped content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Card {
    /// Title line.
    pub title: String,
    /// Body text.
    pub description: String,
    /// `(name, value, inline)` fields.
    pub fields: Vec<(String, String, bool)>,
    /// Side colour.
    pub color: u32,
    /// Footer text.
    pub footer: Option<String>,
}

impl Card {
    /// Bound every part to Discord's embed limits. When the whole card is
    /// still too long, the description shrinks first, then trailing fields
    /// are dropped.
    #[must_use]
    pub fn fit(mut self) -> Self {
        self.title = clip(self.title, MAX_TITLE);
        self.description = clip(self.description, MAX_DESCRIPTION);
        self.footer = self.footer.map(|f| clip(f, MAX_FOOTER));
        self.fields.truncate(MAX_FIELDS);
        for (name, value, _) in &mut self.fields {
            *name = clip(std::mem::take(name), MAX_FIELD_NAME);
            *value = clip(std::mem::take(value), MAX_FIELD_VALUE);
        }

        let over = self.len().saturating_sub(MAX_EMBED);
        if over > 0 {
            let keep = self.description.chars().count().saturating_sub(over);
            self.description = clip(std::mem::take(&mut self.description), keep);
        }
        while self.len() > MAX_EMBED && self.fields.pop().is_some() {}
        self
    }

    /// Characters Discord counts toward the embed total.
    #[must_use]
    pub fn len(&self) -> usize {
        let fields: usize = self
            .fields
            .iter()
            .map(|(name, value, _)| name.chars().count() + value.chars().count())
            .sum();
        self.title.chars().count()
            + self.description.chars().count()
            + self.footer.as_ref().map_or(0, |f| f.chars().count())
            + fields
    }

    /// Whether the card has no text at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Reply {
    /// Text-only reply.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            card: None,
        }
    }

    /// Card-only reply.
    #[must_use]
    pub fn card(card: Card) -> Self {
        Self {
            content: String::new(),
            card: Some(card),
        }
    }

    /// Append a line to the text part.
    #[must_use]
    pub fn with_note(mut self, note: &str) -> Self {
        if !self.content.is_empty() {
            self.content.push('\n');
        }
        self.content.push_str(note);
        self
    }

    /// Everything the user would read, for tests and logs.
    #[must_use]
    pub fn plain(&self) -> String {
        let mut out = self.content.clone();
        if let Some(card) = &self.card {
            let _ = write!(out, "\n{}\n{}", card.title, card.description);
            for (name, value, _) in &card.fields {
                let _ = write!(out, "\n{name}: {value}");
            }
            if let Some(footer) = &card.footer {
                let _ = write!(out, "\n{footer}");
            }
        }
        out
    }
}

fn or_dash(s: &str) -> &str {
    if s.trim().is_empty() { "-" } else { s }
}

/// Cut `s` to at most `limit` characters, ending in `…` when shortened.
fn clip(s: String, limit: usize) -> String {
    if s.chars().count() <= limit {
        return s;
    }
    if limit == 0 {
        return String::new();
    }
    let mut out: String = s.chars().take(limit - 1).collect();
    out.push('…');
    out
}

fn color_for(rate: i32) -> u32 {
    match ErosionBand::for_rate(rate) {
        ErosionBand::Low => COLOR_DEFAULT,
        ErosionBand::High => COLOR_HIGH_EROSION,
    }
}

// ---------------------------------------------------------------------------
// Erosion and stat changes
// ---------------------------------------------------------------------------

/// `침식률: 45% → 105% (+60)` plus tier and band notices.
#[must_use]
pub fn erosion_change(change: &ErosionChange) -> String {
    let mut out = format!(
        "침식률: {}% → {}% ({:+})",
        change.old_rate,
        change.new_rate,
        change.delta()
    );
    if change.tier_changed() {
        let _ = write!(out, "\n⚠️ 침식D 변경: {} → {}", change.old_tier, change.new_tier);
    }
    if change.crossed_band() {
        let _ = write!(
            out,
            "\n콤보가 [{}] 효과로 전환됩니다.",
            ErosionBand::for_rate(change.new_rate).label()
        );
    }
    out
}

/// One stat change line.
#[must_use]
pub fn field_change(character: &str, change: &FieldChange) -> String {
    match &change.erosion {
        Some(erosion) => format!("**{character}** {}", erosion_change(erosion)),
        None => format!(
            "**{character}** {}: {} → {}",
            change.field,
            or_dash(&change.old),
            or_dash(&change.new)
        ),
    }
}

// ---------------------------------------------------------------------------
// Character sheet
// ---------------------------------------------------------------------------

/// Full sheet card.
#[must_use]
pub fn sheet_card(record: &CharacterRecord, active: bool, linked: bool) -> Card {
    let mut description = String::new();
    if !record.code_name.is_empty() {
        let _ = writeln!(description, "코드네임: **{}**", record.code_name);
    }
    let _ = writeln!(
        description,
        "브리드: {} / 신드롬: {}",
        or_dash(&record.breed),
        or_dash(&record.syndromes.join(" / "))
    );
    let _ = writeln!(
        description,
        "웍스: {} / 커버: {}",
        or_dash(&record.works),
        or_dash(&record.cover)
    );
    if !record.awakening.is_empty() || !record.impulse.is_empty() {
        let _ = writeln!(
            description,
            "각성: {} / 충동: {}",
            or_dash(&record.awakening),
            or_dash(&record.impulse)
        );
    }

    let mut fields = vec![
        (
            "HP".to_string(),
            format!("{} / {}", record.hp, record.max_hp),
            true,
        ),
        (
            "침식률".to_string(),
            format!("{}% (침식D {})", record.erosion_rate(), record.erosion_d()),
            true,
        ),
        (
            "행동치 / 이동".to_string(),
            format!("{} / {}", record.initiative, record.movement),
            true,
        ),
    ];
    for attribute in Attribute::ALL {
        let skills: Vec<String> = Skill::ALL
            .iter()
            .filter(|s| s.attribute() == attribute)
            .map(|s| format!("{} {}", s.label(), record.skill(*s)))
            .collect();
        fields.push((
            format!("{} {}", attribute.label(), record.attribute(attribute)),
            skills.join(" · "),
            true,
        ));
    }
    if !record.lois.is_empty() || record.d_lois.is_some() {
        fields.push(("로이스".to_string(), lois_lines(record), false));
    }
    if !record.conditions.is_empty() {
        fields.push(("상태이상".to_string(), record.conditions.join(", "), false));
    }
    if !record.weapons.is_empty() {
        let weapons: Vec<String> = record
            .weapons
            .iter()
            .map(|w| format!("{} (명중 {} / 공격력 {})", w.name, or_dash(&w.accuracy), or_dash(&w.attack)))
            .collect();
        fields.push(("무기".to_string(), weapons.join("\n"), false));
    }

    let mut footer = format!("재산점 {}", record.stock_points);
    if active {
        footer.push_str(" · 활성 캐릭터");
    }
    if linked {
        footer.push_str(" · 시트 연동됨");
    }

    Card {
        title: format!("📜 {}", record.name),
        description: clip(description, MAX_DESCRIPTION),
        fields,
        color: color_for(record.erosion_rate()),
        footer: Some(footer),
    }
}

// ---------------------------------------------------------------------------
// Lois
// ---------------------------------------------------------------------------

/// One Lois line; a Titus is struck through but still listed.
#[must_use]
pub fn lois_line(lois: &Lois) -> String {
    let emotions = format!("P: {} / N: {}", or_dash(&lois.positive), or_dash(&lois.negative));
    let description = if lois.description.is_empty() {
        String::new()
    } else if lois.burned {
        format!(" — ~~{}~~", lois.description)
    } else {
        format!(" — {}", lois.description)
    };
    if lois.burned {
        format!("~~{}~~ ({emotions}){description} [타이터스]", lois.name)
    } else {
        format!("{} ({emotions}){description}", lois.name)
    }
}

fn lois_lines(record: &CharacterRecord) -> String {
    let mut out = String::new();
    if let Some(d) = &record.d_lois {
        let _ = writeln!(out, "D로이스: {} {}", d.number, d.description);
    }
    for (i, lois) in record.lois.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, lois_line(lois));
    }
    out
}

/// `!로이스목록`.
#[must_use]
pub fn lois_list(record: &CharacterRecord) -> Reply {
    if record.lois.is_empty() && record.d_lois.is_none() {
        return Reply::text(format!("**{}**에게 등록된 로이스가 없습니다.", record.name));
    }
    let burned = record.lois.iter().filter(|l| l.burned).count();
    Reply::card(Card {
        title: format!("💞 {}의 로이스", record.name),
        description: clip(lois_lines(record), MAX_DESCRIPTION),
        fields: Vec::new(),
        color: COLOR_DEFAULT,
        footer: Some(format!("로이스 {}개 · 타이터스 {burned}개", record.lois.len())),
    })
}

// ---------------------------------------------------------------------------
// Combos and effects
// ---------------------------------------------------------------------------

/// `!콤보목록`: sheet combos first, then local ones.
#[must_use]
pub fn combo_list(record: &CharacterRecord, local: &[&LocalCombo]) -> Reply {
    if record.combos.is_empty() && local.is_empty() {
        return Reply::text(format!("**{}**에게 등록된 콤보가 없습니다.", record.name));
    }
    let band = ErosionBand::for_rate(record.erosion_rate());
    let mut description = String::new();
    for combo in &record.combos {
        let variant = combo.variant(band);
        let _ = writeln!(
            description,
            "• **{}** [{}] 침식 {} · {}",
            combo.name,
            or_dash(&combo.timing),
            or_dash(&combo.erosion_cost),
            or_dash(&variant.effects)
        );
    }
    for combo in local {
        let _ = writeln!(
            description,
            "• **{}** (수동) 침식 {} · {}",
            combo.name,
            combo.erosion_cost,
            or_dash(&combo.content)
        );
    }
    Reply::card(Card {
        title: format!("⚔️ {}의 콤보", record.name),
        description: clip(description, MAX_DESCRIPTION),
        fields: Vec::new(),
        color: color_for(record.erosion_rate()),
        footer: Some(band.label().to_string()),
    })
}

/// A sheet combo in the band that applied when it was used.
#[must_use]
pub fn combo_card(character: &str, combo: &Combo, band: ErosionBand) -> Card {
    let variant = combo.variant(band);
    let mut fields = vec![
        ("타이밍".to_string(), or_dash(&combo.timing).to_string(), true),
        ("기능".to_string(), or_dash(&combo.skill).to_string(), true),
        ("난이도".to_string(), or_dash(&combo.difficulty).to_string(), true),
        ("대상".to_string(), or_dash(&combo.target).to_string(), true),
        ("사정거리".to_string(), or_dash(&combo.range).to_string(), true),
        ("침식치".to_string(), or_dash(&combo.erosion_cost).to_string(), true),
        ("이펙트".to_string(), or_dash(&variant.effects).to_string(), false),
        (
            "판정".to_string(),
            format!(
                "다이스 {} · 크리티컬 {} · 공격력 {}",
                or_dash(&variant.dice),
                or_dash(&variant.critical),
                or_dash(&variant.attack)
            ),
            false,
        ),
    ];
    if !combo.restriction.is_empty() {
        fields.push(("제한".to_string(), combo.restriction.clone(), true));
    }
    Card {
        title: format!("⚔️ {character} — {}", combo.name),
        description: clip(variant.content.clone(), MAX_DESCRIPTION),
        fields,
        color: match band {
            ErosionBand::Low => COLOR_DEFAULT,
            ErosionBand::High => COLOR_HIGH_EROSION,
        },
        footer: Some(band.label().to_string()),
    }
}

/// A hand-registered combo.
#[must_use]
pub fn local_combo_card(character: &str, combo: &LocalCombo) -> Card {
    Card {
        title: format!("⚔️ {character} — {}", combo.name),
        description: clip(combo.content.clone(), MAX_DESCRIPTION),
        fields: vec![("침식치".to_string(), combo.erosion_cost.to_string(), true)],
        color: COLOR_DEFAULT,
        footer: None,
    }
}

/// An effect at its erosion-adjusted level.
#[must_use]
pub fn effect_card(character: &str, effect: &Effect, level: i32) -> Card {
    let level_text = if level == effect.level {
        format!("Lv {level}")
    } else {
        format!("Lv {} → {level}", effect.level)
    };
    Card {
        title: format!("✨ {character} — {}", effect.name),
        description: clip(effect.description.clone(), MAX_DESCRIPTION),
        fields: vec![
            ("레벨".to_string(), level_text, true),
            ("타이밍".to_string(), or_dash(&effect.timing).to_string(), true),
            ("기능".to_string(), or_dash(&effect.skill).to_string(), true),
            ("난이도".to_string(), or_dash(&effect.difficulty).to_string(), true),
            ("대상".to_string(), or_dash(&effect.target).to_string(), true),
            ("사정거리".to_string(), or_dash(&effect.range).to_string(), true),
            ("침식치".to_string(), or_dash(&effect.erosion_cost).to_string(), true),
            ("제한".to_string(), or_dash(&effect.restriction).to_string(), true),
        ],
        color: COLOR_DEFAULT,
        footer: None,
    }
}

// ---------------------------------------------------------------------------
// Help
// ---------------------------------------------------------------------------

const HELP_ROWS: &[(&str, &str)] = &[
    ("지정 \"이름\" / 지정해제", "활성 캐릭터 지정 / 해제"),
    ("시트입력 \"이름\" 항목 값 …", "능력치 입력 (캐릭터가 없으면 생성)"),
    ("시트확인 [\"이름\"]", "캐릭터 시트 보기"),
    ("<항목>+N / -N / =N", "수치 변경 (예: 침식률+5, HP-3)"),
    ("등침", "등장 침식 (1D10)"),
    ("판정 기능 [보정]", "판정 다이스 식 만들기"),
    ("로이스 \"이름\" P감정 N감정 [내용]", "로이스 추가 / 교체"),
    ("로이스삭제 \"이름\" / 로이스목록", "로이스 삭제 / 목록"),
    ("타이터스 \"이름\"", "로이스를 타이터스로 전환"),
    ("D로이스 번호 [설명]", "D로이스 설정"),
    ("상태이상 추가|해제 이름", "상태이상 관리"),
    ("콤보 \"이름\" 침식비용 내용", "수동 콤보 등록"),
    ("콤보삭제 \"이름\" / 콤보목록", "콤보 삭제 / 목록"),
    ("@이름", "콤보 또는 이펙트 사용 (침식률 적용)"),
    ("캐릭터삭제 \"이름\"", "캐릭터 삭제"),
    ("시트등록 <URL> / 시트동기화", "구글 시트 연동 / 다시 불러오기"),
    ("버전", "데이터 버전 확인"),
];

/// `!도움말`.
#[must_use]
pub fn help(prefix: &str) -> Reply {
    let mut description = String::new();
    for (usage, meaning) in HELP_ROWS {
        let _ = writeln!(description, "`{prefix}{usage}` — {meaning}");
    }
    Reply::card(Card {
        title: "📖 DX3 봇 명령어".to_string(),
        description,
        fields: Vec::new(),
        color: COLOR_DEFAULT,
        footer: Some("이름에 공백이 있으면 따옴표로 감싸주세요.".to_string()),
    })
}
