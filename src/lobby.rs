//! Private lobby draws.
//!
//! A lobby is a host-created pool that reuses the shared draw's
//! commitment-reveal and settlement machinery with two differences: the
//! pot is funded by the host's wallet instead of ticket sales, and the
//! entries are the lobby's member list instead of purchased tickets.
//!
//! Winner selection always materializes the member list with an explicit
//! deterministic sort (joined-at, tie-broken by user id) so the result
//! is reproducible no matter how storage happens to iterate.

use rand::rngs::OsRng;
use rand::RngCore;
use redb::ReadableTable;
use serde_json::json;
use tracing::info;

use crate::commitment;
use crate::engine::{current_timestamp, DrawEngine};
use crate::error::{CoreError, CoreResult};
use crate::events::DrawEvent;
use crate::ledger;
use crate::money::{self, Cents};
use crate::store::{self, slot_key, LOBBIES, LOBBY_CODES, LOBBY_MEMBERS};
use crate::types::{
    LedgerEntryKind, Lobby, LobbyMember, LobbyStatus, SettlementOutcome,
};

/// Minimum members before a lobby draw can trigger
pub const MIN_LOBBY_PARTICIPANTS: u64 = 2;

/// Join-code alphabet (ambiguous glyphs removed)
const JOIN_CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const JOIN_CODE_LEN: usize = 6;

fn generate_join_code() -> String {
    (0..JOIN_CODE_LEN)
        .map(|_| JOIN_CODE_CHARSET[OsRng.next_u32() as usize % JOIN_CODE_CHARSET.len()] as char)
        .collect()
}

fn load_lobby_tx(txn: &redb::WriteTransaction, lobby_id: &str) -> CoreResult<Lobby> {
    store::get_json(txn, LOBBIES, lobby_id)?
        .ok_or_else(|| CoreError::LobbyNotFound(lobby_id.to_string()))
}

/// Members in winner-selection order: joined-at, then user id.
fn ordered_members(mut members: Vec<LobbyMember>) -> Vec<LobbyMember> {
    members.sort_by(|a, b| {
        a.joined_at
            .cmp(&b.joined_at)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    members
}

impl DrawEngine {
    /// Create a lobby. Seed and commitment are fixed here, before anyone
    /// joins or the pot is funded; the host is the first member.
    pub fn create_lobby(&self, host_id: &str, max_participants: u64) -> CoreResult<Lobby> {
        if max_participants < MIN_LOBBY_PARTICIPANTS {
            return Err(CoreError::InvalidAmount(format!(
                "lobby capacity must be at least {}",
                MIN_LOBBY_PARTICIPANTS
            )));
        }

        let seed = commitment::generate_seed();
        let now = current_timestamp();
        let lobby = Lobby {
            id: uuid::Uuid::new_v4().to_string(),
            join_code: generate_join_code(),
            host_id: host_id.to_string(),
            prize_pool: 0,
            status: LobbyStatus::Open,
            commitment: commitment::commit_seed(&seed),
            seed,
            winning_index: None,
            max_participants,
            created_at: now,
            drawn_at: None,
        };

        let txn = self.store.begin_write()?;
        if !store::insert_unique(&txn, LOBBY_CODES, &lobby.join_code, &lobby.id)? {
            // 32^6 codes; a collision is lottery-grade luck but still a
            // clean retry for the caller
            return Err(CoreError::Storage("join code collision".to_string()));
        }
        store::put_json(&txn, LOBBIES, &lobby.id, &lobby)?;

        let host_member = LobbyMember {
            lobby_id: lobby.id.clone(),
            user_id: host_id.to_string(),
            joined_at: now,
            join_seq: 0,
        };
        store::put_json(
            &txn,
            LOBBY_MEMBERS,
            &slot_key(&lobby.id, host_id),
            &host_member,
        )?;
        txn.commit()?;

        info!(lobby = %lobby.id, host = %host_id, code = %lobby.join_code, "Lobby created");
        Ok(lobby)
    }

    /// Join an open lobby by code.
    pub fn join_lobby(&self, join_code: &str, user_id: &str) -> CoreResult<Lobby> {
        let txn = self.store.begin_write()?;
        let lobby_id = store::get_index(&txn, LOBBY_CODES, join_code)?
            .ok_or_else(|| CoreError::LobbyNotFound(join_code.to_string()))?;
        let lobby = load_lobby_tx(&txn, &lobby_id)?;

        if lobby.status != LobbyStatus::Open {
            return Err(CoreError::LobbyLocked(lobby_id.clone()));
        }

        let members: Vec<LobbyMember> =
            store::scan_json_tx(&txn, LOBBY_MEMBERS, |m: &LobbyMember| m.lobby_id == lobby_id)?;
        if members.len() as u64 >= lobby.max_participants {
            return Err(CoreError::LobbyFull(lobby_id.clone()));
        }

        let member = LobbyMember {
            lobby_id: lobby_id.clone(),
            user_id: user_id.to_string(),
            joined_at: current_timestamp(),
            join_seq: members.len() as u64,
        };
        // Membership is keyed on (lobby, user): the insert is the
        // duplicate check, same pattern as ticket slots
        {
            let key = slot_key(&lobby_id, user_id);
            let table = txn.open_table(LOBBY_MEMBERS)?;
            let exists = table.get(key.as_str())?.is_some();
            drop(table);
            if exists {
                return Err(CoreError::AlreadyMember {
                    user_id: user_id.to_string(),
                    lobby_id: lobby_id.clone(),
                });
            }
            store::put_json(&txn, LOBBY_MEMBERS, &key, &member)?;
        }
        txn.commit()?;

        info!(lobby = %lobby_id, user = %user_id, seq = member.join_seq, "Member joined lobby");
        Ok(lobby)
    }

    /// Fund the lobby pot from the host's wallet: a wallet-to-pool
    /// transfer in one transaction, no ticket record.
    pub fn seed_lobby_pot(
        &self,
        lobby_id: &str,
        host_user_id: &str,
        amount: Cents,
    ) -> CoreResult<Cents> {
        if amount == 0 {
            return Err(CoreError::InvalidAmount("pot seed of zero".to_string()));
        }

        let txn = self.store.begin_write()?;
        let mut lobby = load_lobby_tx(&txn, lobby_id)?;

        if lobby.host_id != host_user_id {
            return Err(CoreError::NotHost {
                caller: host_user_id.to_string(),
                lobby_id: lobby_id.to_string(),
            });
        }
        if lobby.status != LobbyStatus::Open {
            return Err(CoreError::LobbyLocked(lobby_id.to_string()));
        }

        let balance_after = ledger::debit_tx(
            &txn,
            host_user_id,
            amount,
            LedgerEntryKind::PotSeed,
            json!({ "lobby_id": lobby_id }),
        )?;

        lobby.prize_pool += amount;
        store::put_json(&txn, LOBBIES, lobby_id, &lobby)?;
        let pool_total = lobby.prize_pool;
        txn.commit()?;

        self.store.cache_balance(host_user_id, balance_after);
        self.events.publish(DrawEvent::LobbyPotUpdated {
            lobby_id: lobby_id.to_string(),
            prize_pool: pool_total,
        });

        info!(lobby = %lobby_id, host = %host_user_id, amount = amount, pool = pool_total, "Lobby pot seeded");
        Ok(pool_total)
    }

    /// Draw the lobby: lock, derive the winner over the ordered member
    /// list, apply the identical 99/1 split, pay the winning member.
    pub fn trigger_lobby_draw(
        &self,
        lobby_id: &str,
        host_user_id: &str,
    ) -> CoreResult<SettlementOutcome> {
        let txn = self.store.begin_write()?;
        let mut lobby = load_lobby_tx(&txn, lobby_id)?;

        if lobby.host_id != host_user_id {
            return Err(CoreError::NotHost {
                caller: host_user_id.to_string(),
                lobby_id: lobby_id.to_string(),
            });
        }
        match lobby.status {
            LobbyStatus::Open => {}
            LobbyStatus::Locked => return Err(CoreError::LobbyLocked(lobby_id.to_string())),
            LobbyStatus::Drawn => return Err(CoreError::AlreadyDrawn(lobby_id.to_string())),
        }

        let members = ordered_members(store::scan_json_tx(&txn, LOBBY_MEMBERS, |m: &LobbyMember| {
            m.lobby_id == lobby_id
        })?);
        let total_entries = members.len() as u64;
        if total_entries < MIN_LOBBY_PARTICIPANTS {
            return Err(CoreError::MinParticipantsNotMet {
                lobby_id: lobby_id.to_string(),
                required: MIN_LOBBY_PARTICIPANTS,
                actual: total_entries,
            });
        }
        if lobby.prize_pool == 0 {
            return Err(CoreError::PotNotFunded(lobby_id.to_string()));
        }

        if !commitment::verify_seed(&lobby.seed, &lobby.commitment) {
            tracing::error!(
                lobby = %lobby_id,
                "stored seed does not match published commitment - halting draw"
            );
            return Err(CoreError::CommitmentMismatch(lobby_id.to_string()));
        }

        // Sales are member joins here; the lock and the reveal happen in
        // the same transaction, so no join can slip in between
        lobby.status = LobbyStatus::Locked;

        let winning_index = commitment::winning_index(&lobby.seed, total_entries)
            .ok_or_else(|| CoreError::NoEntries(lobby_id.to_string()))?;
        let winner = &members[winning_index as usize];

        let admin_fee = money::fee_amount(lobby.prize_pool, self.config.admin_fee_bps);
        let winner_amount = lobby.prize_pool - admin_fee;

        let winner_balance = ledger::credit_tx(
            &txn,
            &winner.user_id,
            winner_amount,
            LedgerEntryKind::PrizeWin,
            json!({ "lobby_id": lobby_id, "index": winning_index }),
        )?;
        let admin_balance = if admin_fee > 0 {
            Some(ledger::credit_tx(
                &txn,
                &self.config.admin_wallet,
                admin_fee,
                LedgerEntryKind::AdminFee,
                json!({ "lobby_id": lobby_id }),
            )?)
        } else {
            None
        };

        lobby.status = LobbyStatus::Drawn;
        lobby.winning_index = Some(winning_index);
        lobby.drawn_at = Some(current_timestamp());
        store::put_json(&txn, LOBBIES, lobby_id, &lobby)?;

        let outcome = SettlementOutcome {
            pool_id: lobby_id.to_string(),
            winner_id: winner.user_id.clone(),
            winner_amount,
            admin_fee,
            seed: lobby.seed.clone(),
            commitment: lobby.commitment.clone(),
            winning_index,
            total_entries,
        };

        txn.commit()?;

        self.store.cache_balance(&outcome.winner_id, winner_balance);
        if let Some(balance) = admin_balance {
            self.store.cache_balance(&self.config.admin_wallet, balance);
        }
        self.events.publish(DrawEvent::LobbyWinnerDrawn {
            lobby_id: lobby_id.to_string(),
            winner_id: outcome.winner_id.clone(),
            winner_amount,
        });

        info!(
            lobby = %lobby_id,
            winner = %outcome.winner_id,
            amount = winner_amount,
            fee = admin_fee,
            "Lobby drawn"
        );
        Ok(outcome)
    }

    pub fn get_lobby(&self, lobby_id: &str) -> CoreResult<Option<Lobby>> {
        self.store.read_json(LOBBIES, lobby_id)
    }

    pub fn lobby_by_code(&self, join_code: &str) -> CoreResult<Option<Lobby>> {
        match self.store.read_index(LOBBY_CODES, join_code)? {
            Some(lobby_id) => self.get_lobby(&lobby_id),
            None => Ok(None),
        }
    }

    /// Member list in winner-selection order.
    pub fn lobby_members(&self, lobby_id: &str) -> CoreResult<Vec<LobbyMember>> {
        Ok(ordered_members(self.store.scan_json(
            LOBBY_MEMBERS,
            |m: &LobbyMember| m.lobby_id == lobby_id,
        )?))
    }
}
