//! Shared daily draw lifecycle: open → locked → drawn.
//!
//! The seed and its commitment are generated at creation, before any
//! sale, so the operator is cryptographically committed to an outcome it
//! cannot later steer. Locking is an external trigger (scheduler or
//! admin); settlement verifies the commitment, derives the winner from
//! the revealed seed, and pays out with an exact integer-cent fee split.
//!
//! ## Settlement flow
//! 1. require `locked`, at least one entry
//! 2. re-verify the stored seed against the published commitment
//! 3. winning index over the seed; resolve the ticket at index + 1
//! 4. 99/1 split, floored to the cent; both halves sum to the pool
//! 5. credit winner and admin wallet, mark tickets won/lost
//! 6. draw becomes `drawn` (terminal); commit; notify best-effort

use serde_json::json;
use tracing::{error, info};

use crate::commitment;
use crate::engine::{current_timestamp, DrawEngine};
use crate::error::{CoreError, CoreResult};
use crate::events::DrawEvent;
use crate::ledger;
use crate::money;
use crate::store::{self, position_key, DRAWS, DRAW_DATES, TICKETS, TICKET_POSITIONS};
use crate::types::{
    Draw, DrawAudit, DrawStatus, DrawSummary, LedgerEntryKind, SettlementOutcome, Ticket,
    TicketStatus,
};

pub(crate) fn load_draw_tx(txn: &redb::WriteTransaction, draw_id: &str) -> CoreResult<Draw> {
    store::get_json(txn, DRAWS, draw_id)?
        .ok_or_else(|| CoreError::DrawNotFound(draw_id.to_string()))
}

impl DrawEngine {
    /// Open a new daily draw. The commitment hash is computed and
    /// persisted here, before the first entry can possibly be sold.
    /// One draw per calendar date.
    pub fn open_draw(&self, date: &str) -> CoreResult<DrawSummary> {
        if chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
            return Err(CoreError::InvalidDate(date.to_string()));
        }

        let seed = commitment::generate_seed();
        let draw = Draw {
            id: uuid::Uuid::new_v4().to_string(),
            date: date.to_string(),
            prize_pool: 0,
            total_entries: 0,
            commitment: commitment::commit_seed(&seed),
            seed,
            status: DrawStatus::Open,
            winning_index: None,
            rolled_over_to: None,
            created_at: current_timestamp(),
            drawn_at: None,
        };

        let txn = self.store.begin_write()?;
        if !store::insert_unique(&txn, DRAW_DATES, date, &draw.id)? {
            return Err(CoreError::DrawAlreadyExists(date.to_string()));
        }
        store::put_json(&txn, DRAWS, &draw.id, &draw)?;
        txn.commit()?;

        info!(draw = %draw.id, date = %date, commitment = %draw.commitment, "Draw opened");
        Ok(draw.summary())
    }

    /// Flip an open draw to `locked`, refusing further purchases.
    /// Triggered externally at the sales cutoff.
    pub fn lock_draw(&self, draw_id: &str) -> CoreResult<DrawSummary> {
        let txn = self.store.begin_write()?;
        let mut draw = load_draw_tx(&txn, draw_id)?;

        match draw.status {
            DrawStatus::Open => {}
            DrawStatus::Locked => return Err(CoreError::AlreadyLocked(draw_id.to_string())),
            DrawStatus::Drawn => return Err(CoreError::AlreadyDrawn(draw_id.to_string())),
        }

        draw.status = DrawStatus::Locked;
        store::put_json(&txn, DRAWS, draw_id, &draw)?;
        txn.commit()?;

        self.events.publish(DrawEvent::DrawLocked {
            draw_id: draw_id.to_string(),
        });
        info!(draw = %draw_id, entries = draw.total_entries, "Draw locked");
        Ok(draw.summary())
    }

    /// Settle a locked draw: reveal the seed, pick the winner, pay out.
    ///
    /// Settling a draw that is already `drawn` is a clean error, never a
    /// double payout. A commitment mismatch is a fatal integrity failure:
    /// settlement halts and the draw is left untouched for manual audit.
    pub fn settle_draw(&self, draw_id: &str) -> CoreResult<SettlementOutcome> {
        let txn = self.store.begin_write()?;
        let mut draw = load_draw_tx(&txn, draw_id)?;

        match draw.status {
            DrawStatus::Locked => {}
            DrawStatus::Open => return Err(CoreError::DrawNotLocked(draw_id.to_string())),
            DrawStatus::Drawn => return Err(CoreError::AlreadyDrawn(draw_id.to_string())),
        }

        if draw.total_entries == 0 {
            return Err(CoreError::NoEntries(draw_id.to_string()));
        }

        if !commitment::verify_seed(&draw.seed, &draw.commitment) {
            error!(
                draw = %draw_id,
                commitment = %draw.commitment,
                "stored seed does not match published commitment - halting settlement"
            );
            return Err(CoreError::CommitmentMismatch(draw_id.to_string()));
        }

        let winning_index = commitment::winning_index(&draw.seed, draw.total_entries)
            .ok_or_else(|| CoreError::NoEntries(draw_id.to_string()))?;
        let winning_position = winning_index + 1;

        let winner_ticket_id =
            store::get_index(&txn, TICKET_POSITIONS, &position_key(draw_id, winning_position))?
                .ok_or_else(|| {
                    CoreError::Storage(format!(
                        "no ticket at position {} of draw {}",
                        winning_position, draw_id
                    ))
                })?;
        let winner: Ticket = store::get_json(&txn, TICKETS, &winner_ticket_id)?
            .ok_or_else(|| CoreError::Storage(format!("ticket {} missing", winner_ticket_id)))?;

        let admin_fee = money::fee_amount(draw.prize_pool, self.config.admin_fee_bps);
        let winner_amount = draw.prize_pool - admin_fee;

        let winner_balance = ledger::credit_tx(
            &txn,
            &winner.user_id,
            winner_amount,
            LedgerEntryKind::PrizeWin,
            json!({ "draw_id": draw_id, "position": winning_position }),
        )?;
        let admin_balance = if admin_fee > 0 {
            Some(ledger::credit_tx(
                &txn,
                &self.config.admin_wallet,
                admin_fee,
                LedgerEntryKind::AdminFee,
                json!({ "draw_id": draw_id }),
            )?)
        } else {
            None
        };

        // One pass over the draw's tickets: winner gets status + prize,
        // everyone else is marked lost (no individual payout)
        let tickets: Vec<Ticket> =
            store::scan_json_tx(&txn, TICKETS, |t: &Ticket| t.draw_id == draw_id)?;
        {
            let mut table = txn.open_table(TICKETS)?;
            for mut ticket in tickets {
                if ticket.position == winning_position {
                    ticket.status = TicketStatus::Won;
                    ticket.prize_amount = Some(winner_amount);
                } else {
                    ticket.status = TicketStatus::Lost;
                }
                let bytes = serde_json::to_vec(&ticket)?;
                table.insert(ticket.id.as_str(), bytes.as_slice())?;
            }
        }

        draw.status = DrawStatus::Drawn;
        draw.winning_index = Some(winning_index);
        draw.drawn_at = Some(current_timestamp());
        store::put_json(&txn, DRAWS, draw_id, &draw)?;

        let outcome = SettlementOutcome {
            pool_id: draw_id.to_string(),
            winner_id: winner.user_id.clone(),
            winner_amount,
            admin_fee,
            seed: draw.seed.clone(),
            commitment: draw.commitment.clone(),
            winning_index,
            total_entries: draw.total_entries,
        };

        txn.commit()?;

        self.store.cache_balance(&winner.user_id, winner_balance);
        if let Some(balance) = admin_balance {
            self.store.cache_balance(&self.config.admin_wallet, balance);
        }
        self.events.publish(DrawEvent::WinnerDrawn {
            draw_id: draw_id.to_string(),
            winner_id: outcome.winner_id.clone(),
            winner_amount,
        });

        info!(
            draw = %draw_id,
            winner = %outcome.winner_id,
            amount = winner_amount,
            fee = admin_fee,
            index = winning_index,
            "Draw settled"
        );
        Ok(outcome)
    }

    /// Zero-entry policy: a locked draw that sold no tickets cannot
    /// select a winner, so its pool (if any) is carried into a later
    /// open draw and the empty draw is closed terminally with no winner.
    pub fn roll_forward(&self, from_draw_id: &str, to_draw_id: &str) -> CoreResult<DrawSummary> {
        let txn = self.store.begin_write()?;
        let mut source = load_draw_tx(&txn, from_draw_id)?;

        match source.status {
            DrawStatus::Locked => {}
            DrawStatus::Open => return Err(CoreError::DrawNotLocked(from_draw_id.to_string())),
            DrawStatus::Drawn => return Err(CoreError::AlreadyDrawn(from_draw_id.to_string())),
        }
        if source.total_entries > 0 {
            // A draw with entries settles; rolling it forward would
            // confiscate sold tickets
            return Err(CoreError::DrawClosed(from_draw_id.to_string()));
        }

        let mut target = load_draw_tx(&txn, to_draw_id)?;
        if target.status != DrawStatus::Open {
            return Err(CoreError::DrawClosed(to_draw_id.to_string()));
        }

        let carried = source.prize_pool;
        target.prize_pool += carried;
        source.prize_pool = 0;
        source.status = DrawStatus::Drawn;
        source.rolled_over_to = Some(to_draw_id.to_string());
        source.drawn_at = Some(current_timestamp());

        store::put_json(&txn, DRAWS, from_draw_id, &source)?;
        store::put_json(&txn, DRAWS, to_draw_id, &target)?;
        txn.commit()?;

        self.events.publish(DrawEvent::PoolUpdated {
            draw_id: to_draw_id.to_string(),
            prize_pool: target.prize_pool,
            total_entries: target.total_entries,
        });
        info!(
            from = %from_draw_id,
            to = %to_draw_id,
            carried = carried,
            "Empty draw rolled forward"
        );
        Ok(target.summary())
    }

    pub fn get_draw(&self, draw_id: &str) -> CoreResult<Option<DrawSummary>> {
        Ok(self
            .store
            .read_json::<Draw>(DRAWS, draw_id)?
            .map(|d| d.summary()))
    }

    pub fn draw_for_date(&self, date: &str) -> CoreResult<Option<DrawSummary>> {
        match self.store.read_index(DRAW_DATES, date)? {
            Some(draw_id) => self.get_draw(&draw_id),
            None => Ok(None),
        }
    }

    /// Recompute a draw's commitment and (when settled) winning index
    /// from stored data, the same check any external auditor runs from
    /// the published summary.
    pub fn audit_draw(&self, draw_id: &str) -> CoreResult<DrawAudit> {
        let draw: Draw = self
            .store
            .read_json(DRAWS, draw_id)?
            .ok_or_else(|| CoreError::DrawNotFound(draw_id.to_string()))?;

        let commitment_valid = commitment::verify_seed(&draw.seed, &draw.commitment);
        let winning_index_valid = draw.winning_index.map(|stored| {
            commitment::winning_index(&draw.seed, draw.total_entries) == Some(stored)
        });

        Ok(DrawAudit {
            draw_id: draw_id.to_string(),
            commitment_valid,
            winning_index_valid,
        })
    }
}
