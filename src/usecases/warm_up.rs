//! Warm-Up - Startup Backfill from Paged History
//!
//! Fetches history pages newest first until the configured page count,
//! an empty page, or the first page no domain can serve. The collected
//! draws are reversed into ascending order and stored in one batch.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::domain::draw::DrawRecord;
use crate::ports::draw_feed::DrawFeed;
use crate::ports::repository::Repository;

use super::outcome_store::OutcomeStore;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarmUpReport {
  /// Pages fetched successfully.
  pub pages: u32,
  /// Valid draws handed to the store.
  pub draws: usize,
  /// Rows rejected by validation.
  pub invalid: usize,
  /// Store size afterwards.
  pub stored: usize,
}

pub struct WarmUp<F: DrawFeed> {
  feed: Arc<F>,
  max_pages: u32,
}

impl<F: DrawFeed> WarmUp<F> {
  pub fn new(feed: Arc<F>, max_pages: u32) -> Self {
    Self { feed, max_pages }
  }

  #[instrument(skip(self, store), fields(max_pages = self.max_pages))]
  pub async fn run<R: Repository>(&self, store: &mut OutcomeStore<R>) -> WarmUpReport {
    let mut report = WarmUpReport::default();
    let mut newest_first: Vec<DrawRecord> = Vec::new();
    let observed_at = Utc::now();

    for page in 1..=self.max_pages {
      let rows = match self.feed.history_page(page).await {
        Ok(rows) => rows,
        Err(e) => {
          warn!(page, error = %e, "History page unavailable, stopping warm-up");
          break;
        }
      };
      if rows.is_empty() {
        break;
      }
      report.pages += 1;

      for raw in rows {
        match raw.into_record(observed_at) {
          Ok(draw) => newest_first.push(draw),
          Err(e) => {
            report.invalid += 1;
            warn!(error = %e, "Skipping invalid history row");
          }
        }
      }
    }

    newest_first.reverse();
    report.draws = newest_first.len();
    store.append_many(newest_first).await;
    report.stored = store.len();

    info!(
      pages = report.pages,
      draws = report.draws,
      invalid = report.invalid,
      stored = report.stored,
      "Warm-up complete"
    );
    report
  }
}
