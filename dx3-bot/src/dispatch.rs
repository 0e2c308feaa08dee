//! Command execution.
//!
//! The [`Dispatcher`] owns the store, the optional spreadsheet gateway and
//! the pending-roll map. Store locks are taken per statement and never
//! held across an `.await`; a sheet read that fails falls back to the
//! stored record, and a sheet write that fails is reported but does not
//! undo the local change.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use dx3_core::character::combo::parse_cost;
use dx3_core::character::{Combo, DLois, Effect, LocalCombo, Lois, LoisUpsert, TitusOutcome};
use dx3_core::correlation::PendingRolls;
use dx3_core::erosion::{ErosionBand, ErosionChange};
use dx3_core::field::{Field, NumericField};
use dx3_core::store::Store;
use dx3_core::types::{CharacterKey, ServerId, UserId};
use dx3_core::{CharacterRecord, Dx3Config, Dx3Error};
use dx3_sheets::{spreadsheet_id, CellWrite, SheetGateway};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::command::{self, Command, ConditionAction};
use crate::dice::{self, CheckRoll};
use crate::error::{BotError, Result};
use crate::format::{self, Reply};

const SHEET_WRITE_FAILED: &str = "⚠️ 로컬에는 저장했지만 구글 시트에 반영하지 못했습니다.";
const SHEET_READ_FAILED: &str = "⚠️ 구글 시트를 불러오지 못해 저장된 데이터로 표시합니다.";

/// Who sent a command, and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invocation {
    /// Server (guild) the command came from.
    pub server: ServerId,
    /// Sending user.
    pub user: UserId,
}

impl Invocation {
    /// Build an invocation.
    #[must_use]
    pub fn new(server: u64, user: u64) -> Self {
        Self {
            server: ServerId(server),
            user: UserId(user),
        }
    }

    fn key(self, name: &str) -> CharacterKey {
        CharacterKey::new(self.server, self.user, name)
    }
}

enum Invocable {
    Local(LocalCombo),
    Sheet(Combo),
    Effect(Effect),
}

/// Shared command executor.
pub struct Dispatcher {
    config: Dx3Config,
    store: Mutex<Store>,
    sheets: Option<Arc<dyn SheetGateway>>,
    pending: Mutex<PendingRolls>,
}

impl Dispatcher {
    /// Create a dispatcher.
    #[must_use]
    pub fn new(config: Dx3Config, store: Store, sheets: Option<Arc<dyn SheetGateway>>) -> Self {
        let pending = PendingRolls::new(config.erosion.pending_roll_ttl_secs);
        Self {
            config,
            store: Mutex::new(store),
            sheets,
            pending: Mutex::new(pending),
        }
    }

    /// Loaded configuration.
    #[must_use]
    pub fn config(&self) -> &Dx3Config {
        &self.config
    }

    /// Read access to the store.
    pub fn with_store<R>(&self, f: impl FnOnce(&Store) -> R) -> R {
        f(&self.store.lock())
    }

    /// Parse and run one chat line. `None` when the line is not a command.
    pub async fn handle_message(&self, inv: Invocation, content: &str) -> Option<Reply> {
        let parsed = command::parse(content, &self.config.general.prefix)?;
        Some(match parsed {
            Ok(cmd) => self.execute(inv, cmd).await,
            Err(e) => Reply::text(BotError::from(e).user_message()),
        })
    }

    /// Run a command, turning every failure into a reply.
    pub async fn execute(&self, inv: Invocation, cmd: Command) -> Reply {
        let name = cmd.name();
        let start = Instant::now();
        let result = self.run(inv, cmd).await;
        let elapsed_ms = start.elapsed().as_millis();

        match result {
            Ok(reply) => {
                debug!(server = %inv.server, user = %inv.user, command = name, elapsed_ms, "Command handled");
                reply
            }
            Err(e) => {
                if e.is_internal() {
                    error!(server = %inv.server, user = %inv.user, command = name, error = %e, "Command failed");
                } else if matches!(e, BotError::Sheets(_)) {
                    warn!(server = %inv.server, user = %inv.user, command = name, error = %e, "Sheets call failed");
                } else {
                    debug!(server = %inv.server, user = %inv.user, command = name, error = %e, "Command rejected");
                }
                Reply::text(e.user_message())
            }
        }
    }

    /// Credit a dice-bot `1D10` result to whoever is waiting in `server`.
    /// The roll goes to the requester's active character at the time the
    /// result arrives.
    pub async fn on_dice_result(&self, server: ServerId, value: i32) -> Option<Reply> {
        let pending = self.pending.lock().take(server, Utc::now())?;
        let user = pending.character.user;

        let active = self.store.lock().active_key(server, user);
        let key = match active {
            Ok(key) => key,
            Err(e) => {
                warn!(server = %server, user = %user, "Dice result arrived but requester has no active character");
                return Some(Reply::text(BotError::from(e).user_message()));
            }
        };

        let applied = self
            .store
            .lock()
            .update_character(&key, false, |r| r.adjust_erosion(value));
        let change = match applied {
            Ok(change) => change,
            Err(e) => return Some(Reply::text(BotError::from(e).user_message())),
        };

        info!(character = %key, roll = value, rate = change.new_rate, "Entry erosion applied");
        let reply = Reply::text(format!(
            "🎲 **{}** 등장 침식 +{value}\n{}",
            key.name,
            format::erosion_change(&change)
        ));
        Some(self.finish(reply, &key, &[CellWrite::Erosion(change.new_rate)]).await)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn is_owner(&self, inv: Invocation) -> bool {
        self.config.discord.owner_id == Some(inv.user.0)
    }

    fn require_owner(&self, inv: Invocation) -> Result<()> {
        if self.is_owner(inv) {
            Ok(())
        } else {
            Err(BotError::NotOwner)
        }
    }

    fn active_key(&self, inv: Invocation) -> Result<CharacterKey> {
        Ok(self.store.lock().active_key(inv.server, inv.user)?)
    }

    fn record(&self, key: &CharacterKey) -> Result<CharacterRecord> {
        let record = self.store.lock().character(key).cloned();
        record.ok_or_else(|| Dx3Error::CharacterNotFound(key.name.clone()).into())
    }

    fn linked_sheet(&self, key: &CharacterKey) -> Option<String> {
        self.store
            .lock()
            .sheet_link(key)
            .map(|l| l.spreadsheet_id.clone())
    }

    fn gateway(&self) -> Result<Arc<dyn SheetGateway>> {
        self.sheets.clone().ok_or(BotError::SheetsDisabled)
    }

    /// Push cell writes for a linked character. Returns a note on failure.
    async fn push(&self, key: &CharacterKey, writes: &[CellWrite]) -> Option<&'static str> {
        if writes.is_empty() {
            return None;
        }
        let gateway = self.sheets.as_ref()?;
        let id = self.linked_sheet(key)?;
        for write in writes {
            if let Err(e) = gateway.write(&id, write).await {
                warn!(character = %key, cell = %write, error = %e, "Sheet write-through failed");
                return Some(SHEET_WRITE_FAILED);
            }
        }
        debug!(character = %key, writes = writes.len(), "Sheet write-through done");
        None
    }

    async fn finish(&self, reply: Reply, key: &CharacterKey, writes: &[CellWrite]) -> Reply {
        match self.push(key, writes).await {
            Some(note) => reply.with_note(note),
            None => reply,
        }
    }

    /// Re-import a linked character. Returns a note when the sheet could
    /// not be read and the stored record is used instead.
    async fn refresh(&self, key: &CharacterKey) -> Option<&'static str> {
        let gateway = self.sheets.as_ref()?;
        let id = self.linked_sheet(key)?;
        let sheet = match gateway.read_character(&id).await {
            Ok(sheet) => sheet,
            Err(e) => {
                warn!(character = %key, error = %e, "Sheet read failed, using stored record");
                return Some(SHEET_READ_FAILED);
            }
        };
        let merged = self.store.lock().update_character(key, false, |r| {
            r.merge_from_sheet(sheet);
            r.name.clone_from(&key.name);
        });
        if let Err(e) = merged {
            warn!(character = %key, error = %e, "Could not store refreshed sheet");
            return Some(SHEET_READ_FAILED);
        }
        None
    }

    fn apply_erosion(&self, key: &CharacterKey, delta: i32) -> Result<ErosionChange> {
        Ok(self
            .store
            .lock()
            .update_character(key, false, |r| r.adjust_erosion(delta))?)
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    async fn run(&self, inv: Invocation, cmd: Command) -> Result<Reply> {
        match cmd {
            Command::Assign { name } => self.assign(inv, &name),
            Command::Unassign => self.unassign(inv),
            Command::SheetInput { name, entries } => self.sheet_input(inv, &name, &entries).await,
            Command::ShowSheet { name } => self.show_sheet(inv, name.as_deref()).await,
            Command::Adjust { field, op } => {
                let key = self.active_key(inv)?;
                let change = self
                    .store
                    .lock()
                    .update_character(&key, false, |r| field.apply(r, op))?;
                let writes = self.record(&key).map(|r| tracked_write(field, &r)).ok().flatten();
                let reply = Reply::text(format::field_change(&key.name, &change));
                Ok(self.finish(reply, &key, writes.as_slice()).await)
            }
            Command::EntryErosion => self.entry_erosion(inv).await,
            Command::Check { target, modifier } => {
                let key = self.active_key(inv)?;
                let record = self.record(&key)?;
                let roll = CheckRoll::new(&record, target, modifier);
                Ok(Reply::text(format!(
                    "🎲 **{}** 〈{}〉 판정\n`{roll}`",
                    key.name,
                    target.label()
                )))
            }
            Command::AddLois {
                name,
                positive,
                negative,
                description,
            } => {
                let key = self.active_key(inv)?;
                let lois = Lois::new(name.clone(), positive, negative, description);
                let outcome = self
                    .store
                    .lock()
                    .update_character(&key, false, |r| r.upsert_lois(lois))?;
                Ok(Reply::text(match outcome {
                    LoisUpsert::Added(_) => format!("💞 **{}**에게 로이스 '{name}'를 추가했습니다.", key.name),
                    LoisUpsert::Replaced(_) => format!("💞 **{}**의 로이스 '{name}'를 갱신했습니다.", key.name),
                }))
            }
            Command::RemoveLois { name } => {
                let key = self.active_key(inv)?;
                self.store
                    .lock()
                    .update_character(&key, false, |r| r.remove_lois(&name))??;
                Ok(Reply::text(format!("🗑️ **{}**의 로이스 '{name}'를 삭제했습니다.", key.name)))
            }
            Command::ListLois => {
                let key = self.active_key(inv)?;
                Ok(format::lois_list(&self.record(&key)?))
            }
            Command::Titus { name } => self.titus(inv, &name).await,
            Command::SetDLois {
                number,
                description,
            } => {
                let key = self.active_key(inv)?;
                let d_lois = DLois {
                    number: number.clone(),
                    description: description.clone(),
                };
                self.store.lock().update_character(&key, false, |r| {
                    r.d_lois = Some(d_lois);
                    r.touch();
                })?;
                let reply = Reply::text(format!(
                    "💠 **{}**의 D로이스: {number} {description}",
                    key.name
                ));
                let writes = [
                    CellWrite::DLoisNumber(number),
                    CellWrite::DLoisDescription(description),
                ];
                Ok(self.finish(reply, &key, &writes).await)
            }
            Command::Condition { action, name } => {
                let key = self.active_key(inv)?;
                let changed = self.store.lock().update_character(&key, false, |r| match action {
                    ConditionAction::Add => r.add_condition(&name),
                    ConditionAction::Remove => r.remove_condition(&name),
                })?;
                Ok(Reply::text(match (action, changed) {
                    (ConditionAction::Add, true) => format!("**{}** 상태이상 추가: {name}", key.name),
                    (ConditionAction::Add, false) => format!("**{}**은(는) 이미 {name} 상태입니다.", key.name),
                    (ConditionAction::Remove, true) => format!("**{}** 상태이상 해제: {name}", key.name),
                    (ConditionAction::Remove, false) => format!("**{}**은(는) {name} 상태가 아닙니다.", key.name),
                }))
            }
            Command::AddCombo {
                name,
                cost,
                content,
            } => {
                let key = self.active_key(inv)?;
                let combo = LocalCombo {
                    name: name.clone(),
                    erosion_cost: cost,
                    content,
                };
                let replaced = self.store.lock().put_combo(&key, combo)?;
                Ok(Reply::text(if replaced {
                    format!("⚔️ **{}**의 콤보 '{name}'를 갱신했습니다. (침식 {cost})", key.name)
                } else {
                    format!("⚔️ **{}**에게 콤보 '{name}'를 등록했습니다. (침식 {cost})", key.name)
                }))
            }
            Command::RemoveCombo { name } => {
                let key = self.active_key(inv)?;
                self.store.lock().remove_combo(&key, &name)?;
                Ok(Reply::text(format!("🗑️ **{}**의 콤보 '{name}'를 삭제했습니다.", key.name)))
            }
            Command::ListCombos => {
                let key = self.active_key(inv)?;
                let record = self.record(&key)?;
                let local: Vec<LocalCombo> = self.store.lock().combos(&key).into_iter().cloned().collect();
                let local: Vec<&LocalCombo> = local.iter().collect();
                Ok(format::combo_list(&record, &local))
            }
            Command::Invoke { name } => self.invoke(inv, &name).await,
            Command::DeleteCharacter { name } => {
                let key = inv.key(&name);
                self.store.lock().delete_character(&key)?;
                Ok(Reply::text(format!("🗑️ '{name}' 캐릭터를 삭제했습니다.")))
            }
            Command::LinkSheet { target } => self.link_sheet(inv, &target).await,
            Command::SyncSheet => self.sync_sheet(inv).await,
            Command::Reset => {
                self.require_owner(inv)?;
                let removed = self.store.lock().reset_server(inv.server)?;
                let dropped = self.pending.lock().take(inv.server, Utc::now());
                info!(
                    server = %inv.server,
                    characters = removed,
                    dropped_roll = dropped.is_some(),
                    "Server data reset"
                );
                Ok(Reply::text(format!(
                    "🧹 이 서버의 데이터를 초기화했습니다. (캐릭터 {removed}명 삭제)"
                )))
            }
            Command::Version => {
                let version = self.store.lock().version();
                Ok(Reply::text(format!(
                    "📦 데이터 버전 v{version} (봇 {})",
                    env!("CARGO_PKG_VERSION")
                )))
            }
            Command::VersionBump => {
                self.require_owner(inv)?;
                let version = self.store.lock().bump_version()?;
                info!(version, "Data version bumped");
                Ok(Reply::text(format!("📦 데이터 버전을 v{version}(으)로 올렸습니다.")))
            }
            Command::Help => Ok(format::help(&self.config.general.prefix)),
        }
    }

    fn assign(&self, inv: Invocation, name: &str) -> Result<Reply> {
        let key = inv.key(name);
        self.store.lock().set_active(&key)?;
        info!(character = %key, "Active character set");
        Ok(Reply::text(format!("✅ **{name}** 캐릭터를 지정했습니다.")))
    }

    fn unassign(&self, inv: Invocation) -> Result<Reply> {
        let previous = self.store.lock().clear_active(inv.server, inv.user)?;
        Ok(Reply::text(match previous {
            Some(name) => format!("✅ **{name}** 캐릭터 지정을 해제했습니다."),
            None => "지정된 캐릭터가 없습니다.".to_string(),
        }))
    }

    async fn sheet_input(&self, inv: Invocation, name: &str, entries: &[(Field, String)]) -> Result<Reply> {
        let key = inv.key(name);
        let (changes, writes) = self.store.lock().update_character(&key, true, |r| {
            let changes = entries
                .iter()
                .map(|(field, value)| field.set(r, value))
                .collect::<dx3_core::error::Result<Vec<_>>>()?;
            let writes: Vec<CellWrite> = changes
                .iter()
                .filter_map(|c| match c.field {
                    Field::Numeric(f) => tracked_write(f, r),
                    Field::Text(_) => None,
                })
                .collect();
            Ok::<_, Dx3Error>((changes, writes))
        })??;

        let mut lines: Vec<String> = changes
            .iter()
            .map(|c| format::field_change(name, c))
            .collect();

        let activated = {
            let mut store = self.store.lock();
            if store.active(inv.server, inv.user).is_none() {
                store.set_active(&key)?;
                true
            } else {
                false
            }
        };
        if activated {
            lines.push(format!("✅ **{name}** 캐릭터를 지정했습니다."));
        }

        Ok(self.finish(Reply::text(lines.join("\n")), &key, &writes).await)
    }

    async fn show_sheet(&self, inv: Invocation, name: Option<&str>) -> Result<Reply> {
        let key = match name {
            Some(name) => inv.key(name),
            None => self.active_key(inv)?,
        };
        let note = self.refresh(&key).await;
        let record = self.record(&key)?;
        let (active, linked) = {
            let store = self.store.lock();
            (
                store.active(inv.server, inv.user) == Some(key.name.as_str()),
                store.sheet_link(&key).is_some(),
            )
        };
        let reply = Reply::card(format::sheet_card(&record, active, linked));
        Ok(match note {
            Some(note) => reply.with_note(note),
            None => reply,
        })
    }

    async fn entry_erosion(&self, inv: Invocation) -> Result<Reply> {
        let key = self.active_key(inv)?;
        self.record(&key)?;

        if self.config.erosion.internal_roll {
            let roll = dice::roll_d10(&mut rand::thread_rng());
            let change = self.apply_erosion(&key, roll)?;
            let reply = Reply::text(format!(
                "🎲 **{}** 등장 침식 1D10 → {roll}\n{}",
                key.name,
                format::erosion_change(&change)
            ));
            return Ok(self.finish(reply, &key, &[CellWrite::Erosion(change.new_rate)]).await);
        }

        let displaced = self.pending.lock().request(key.clone(), Utc::now());
        let mut reply = Reply::text(format!(
            "🎲 **{}** 등장 침식: 다이스봇으로 `1D10`을 굴려주세요.",
            key.name
        ));
        if let Some(previous) = displaced
            && previous.character != key
        {
            warn!(server = %inv.server, displaced = %previous.character, by = %key, "Pending roll overwritten");
            reply = reply.with_note(&format!(
                "⚠️ 대기 중이던 **{}**의 요청을 대체했습니다.",
                previous.character.name
            ));
        }
        Ok(reply)
    }

    async fn titus(&self, inv: Invocation, name: &str) -> Result<Reply> {
        let key = self.active_key(inv)?;
        let (outcome, slot) = self.store.lock().update_character(&key, false, |r| {
            r.titus(name).map(|(idx, outcome)| (outcome, r.lois[idx].sheet_slot))
        })??;

        match outcome {
            TitusOutcome::Converted => {
                info!(character = %key, lois = name, "Lois converted to Titus");
                let reply = Reply::text(format!(
                    "🔥 **{}**의 로이스 '{name}'를 타이터스로 전환했습니다.",
                    key.name
                ));
                let writes: Vec<CellWrite> = slot
                    .map(|slot| CellWrite::LoisBurned { slot, burned: true })
                    .into_iter()
                    .collect();
                Ok(self.finish(reply, &key, &writes).await)
            }
            TitusOutcome::AlreadyConverted => Ok(Reply::text(format!(
                "'{name}'는 이미 타이터스로 전환된 로이스입니다."
            ))),
        }
    }

    async fn invoke(&self, inv: Invocation, name: &str) -> Result<Reply> {
        let key = self.active_key(inv)?;
        let record = self.record(&key)?;
        let local = self.store.lock().combo(&key, name).cloned();

        let target = local
            .map(Invocable::Local)
            .or_else(|| record.combo(name).cloned().map(Invocable::Sheet))
            .or_else(|| record.effect(name).cloned().map(Invocable::Effect))
            .ok_or_else(|| Dx3Error::ComboNotFound(name.to_string()))?;

        let rate = record.erosion_rate();
        let (card, cost) = match target {
            Invocable::Local(combo) => (format::local_combo_card(&key.name, &combo), combo.erosion_cost),
            Invocable::Sheet(combo) => {
                let band = ErosionBand::for_rate(rate);
                (format::combo_card(&key.name, &combo, band), combo.cost())
            }
            Invocable::Effect(effect) => {
                let level = effect.level_at(rate, record.is_apex());
                (
                    format::effect_card(&key.name, &effect, level),
                    parse_cost(&effect.erosion_cost),
                )
            }
        };

        if cost == 0 {
            return Ok(Reply::card(card));
        }
        let change = self.apply_erosion(&key, cost)?;
        let reply = Reply {
            content: format::erosion_change(&change),
            card: Some(card),
        };
        Ok(self.finish(reply, &key, &[CellWrite::Erosion(change.new_rate)]).await)
    }

    async fn link_sheet(&self, inv: Invocation, target: &str) -> Result<Reply> {
        let gateway = self.gateway()?;
        let id = spreadsheet_id(target).ok_or_else(|| BotError::InvalidSheetUrl(target.to_string()))?;
        let sheet = gateway.read_character(&id).await?;
        let key = inv.key(&sheet.name);

        let record = {
            let mut store = self.store.lock();
            if store.character(&key).is_some() {
                store.update_character(&key, false, |r| r.merge_from_sheet(sheet))?;
            } else {
                store.put_character(&key, sheet)?;
            }
            store.link_sheet(&key, id.as_str())?;
            store.set_active(&key)?;
            store.character(&key).cloned()
        };
        let record = record.ok_or_else(|| Dx3Error::CharacterNotFound(key.name.clone()))?;

        info!(character = %key, spreadsheet = %id, "Sheet linked");
        Ok(Reply {
            content: format!("✅ **{}** 시트를 연동하고 지정했습니다.", key.name),
            card: Some(format::sheet_card(&record, true, true)),
        })
    }

    async fn sync_sheet(&self, inv: Invocation) -> Result<Reply> {
        let key = self.active_key(inv)?;
        self.gateway()?;
        if self.linked_sheet(&key).is_none() {
            return Err(BotError::NotLinked(key.name));
        }
        let note = self.refresh(&key).await;
        let record = self.record(&key)?;
        let card = format::sheet_card(&record, true, true);
        Ok(match note {
            Some(note) => Reply::card(card).with_note(note),
            None => Reply {
                content: format!("🔄 **{}** 시트를 다시 불러왔습니다.", key.name),
                card: Some(card),
            },
        })
    }
}

/// Cells that mirror a local numeric change.
fn tracked_write(field: NumericField, record: &CharacterRecord) -> Option<CellWrite> {
    match field {
        NumericField::Hp => Some(CellWrite::Hp(record.hp)),
        NumericField::Erosion => Some(CellWrite::Erosion(record.erosion_rate())),
        _ => None,
    }
}
