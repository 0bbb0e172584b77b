//! Ticket issuer.
//!
//! Selling one entry binds a wallet debit, the ticket record and the
//! draw's pool update into a single store transaction. Any failure
//! rolls the whole purchase back, so a partial debit or an orphaned
//! ticket is never observable.

use serde_json::json;
use tracing::info;

use crate::commitment;
use crate::engine::{current_timestamp, DrawEngine};
use crate::error::{CoreError, CoreResult};
use crate::events::DrawEvent;
use crate::ledger;
use crate::store::{self, position_key, slot_key, DRAWS, TICKETS, TICKET_POSITIONS, TICKET_SLOTS};
use crate::types::{Draw, DrawStatus, LedgerEntryKind, Ticket, TicketStatus};

impl DrawEngine {
    /// Purchase one entry into an open draw.
    ///
    /// One transaction, in order: draw must be `open` (`DrawClosed`),
    /// buyer is debited the ticket price (`InsufficientBalance`), the
    /// (user, draw) slot is claimed against the uniqueness index
    /// (`DuplicateTicket`, a constraint rather than a read-check, so two
    /// concurrent requests from the same user cannot both pass), the
    /// sealed ticket is inserted, and the pool grows by the full price.
    /// The operator's cut is taken only at settlement.
    pub fn purchase_ticket(&self, user_id: &str, draw_id: &str) -> CoreResult<Ticket> {
        let price = self.config.ticket_price;
        let txn = self.store.begin_write()?;

        let mut draw: Draw = store::get_json(&txn, DRAWS, draw_id)?
            .ok_or_else(|| CoreError::DrawNotFound(draw_id.to_string()))?;

        if draw.status != DrawStatus::Open {
            return Err(CoreError::DrawClosed(draw_id.to_string()));
        }

        let balance_after = ledger::debit_tx(
            &txn,
            user_id,
            price,
            LedgerEntryKind::TicketPurchase,
            json!({ "draw_id": draw_id }),
        )?;

        let ticket_id = uuid::Uuid::new_v4().to_string();

        // Uniqueness constraint on (draw, user): the insert itself is the
        // check, inside the same transaction as the debit
        if !store::insert_unique(&txn, TICKET_SLOTS, &slot_key(draw_id, user_id), &ticket_id)? {
            return Err(CoreError::DuplicateTicket {
                user_id: user_id.to_string(),
                draw_id: draw_id.to_string(),
            });
        }

        let position = draw.total_entries + 1;
        let purchased_at = current_timestamp();
        let ticket = Ticket {
            id: ticket_id.clone(),
            draw_id: draw_id.to_string(),
            user_id: user_id.to_string(),
            position,
            entries_at_purchase: position,
            seal: commitment::seal_ticket(
                &ticket_id,
                draw_id,
                user_id,
                position,
                purchased_at,
                &self.config.ticket_seal_secret,
            ),
            status: TicketStatus::Active,
            prize_amount: None,
            purchased_at,
        };

        store::put_json(&txn, TICKETS, &ticket.id, &ticket)?;
        store::insert_unique(&txn, TICKET_POSITIONS, &position_key(draw_id, position), &ticket_id)?;

        draw.total_entries = position;
        draw.prize_pool += price;
        store::put_json(&txn, DRAWS, draw_id, &draw)?;

        let pool_after = draw.prize_pool;
        let entries_after = draw.total_entries;

        txn.commit()?;

        // Post-commit only: cache refresh and best-effort notification
        self.store.cache_balance(user_id, balance_after);
        self.events.publish(DrawEvent::PoolUpdated {
            draw_id: draw_id.to_string(),
            prize_pool: pool_after,
            total_entries: entries_after,
        });

        info!(
            user = %user_id,
            draw = %draw_id,
            position = position,
            pool = pool_after,
            "Ticket purchased"
        );
        Ok(ticket)
    }

    pub fn get_ticket(&self, ticket_id: &str) -> CoreResult<Option<Ticket>> {
        self.store.read_json(TICKETS, ticket_id)
    }

    /// A user's ticket in a draw, via the uniqueness index.
    pub fn ticket_for_user(&self, draw_id: &str, user_id: &str) -> CoreResult<Option<Ticket>> {
        match self
            .store
            .read_index(TICKET_SLOTS, &slot_key(draw_id, user_id))?
        {
            Some(ticket_id) => self.get_ticket(&ticket_id),
            None => Ok(None),
        }
    }

    /// All tickets of a draw, ordered by position.
    pub fn tickets_for_draw(&self, draw_id: &str) -> CoreResult<Vec<Ticket>> {
        let mut tickets: Vec<Ticket> = self
            .store
            .scan_json(TICKETS, |t: &Ticket| t.draw_id == draw_id)?;
        tickets.sort_by_key(|t| t.position);
        Ok(tickets)
    }

    /// Server-side ticket verification: recompute the keyed seal from
    /// the stored fields and the injected secret.
    pub fn verify_ticket(&self, ticket: &Ticket) -> bool {
        commitment::verify_ticket_seal(
            &ticket.seal,
            &ticket.id,
            &ticket.draw_id,
            &ticket.user_id,
            ticket.position,
            ticket.purchased_at,
            &self.config.ticket_seal_secret,
        )
    }
}
