//! Public types for the countdown-enrich API.

mod game;
mod ticket;

pub use game::{Game, Team, parse_instant, truncate_chars};
pub use ticket::{AffiliateLinks, TicketCandidate, TicketQuery};
