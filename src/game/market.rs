//! Black market: a small rotating selection of the content market table.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::game::content::MarketOffer;

#[derive(Debug, Default)]
pub struct BlackMarket {
    stock: Vec<MarketOffer>,
    refreshed_at: Option<DateTime<Utc>>,
}

impl BlackMarket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resample when the stock is empty or older than `refresh_secs`.
    pub fn refresh_if_stale<R: Rng + ?Sized>(
        &mut self,
        catalog: &[MarketOffer],
        size: usize,
        refresh_secs: i64,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> bool {
        let stale = match self.refreshed_at {
            Some(at) => now.signed_duration_since(at).num_seconds() >= refresh_secs,
            None => true,
        };
        if !stale && !self.stock.is_empty() {
            return false;
        }
        self.stock = catalog
            .choose_multiple(rng, size.min(catalog.len()))
            .cloned()
            .collect();
        self.refreshed_at = Some(now);
        log::info!("black market restocked with {} offers", self.stock.len());
        true
    }

    pub fn offers(&self) -> &[MarketOffer] {
        &self.stock
    }

    /// Offer at 1-based `position`.
    pub fn offer(&self, position: usize) -> Option<&MarketOffer> {
        position.checked_sub(1).and_then(|i| self.stock.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::content::builtin_market;
    use chrono::{Duration, TimeZone};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn samples_without_replacement_and_waits_for_refresh() {
        let catalog = builtin_market();
        let mut rng = StdRng::seed_from_u64(42);
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut market = BlackMarket::new();

        assert!(market.refresh_if_stale(&catalog, 3, 600, t0, &mut rng));
        let first: Vec<String> = market.offers().iter().map(|o| o.item.clone()).collect();
        assert_eq!(first.len(), 3);
        let mut dedup = first.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), 3);

        assert!(!market.refresh_if_stale(&catalog, 3, 600, t0 + Duration::seconds(599), &mut rng));
        assert!(market.refresh_if_stale(&catalog, 3, 600, t0 + Duration::seconds(600), &mut rng));
    }

    #[test]
    fn positions_are_one_based() {
        let catalog = builtin_market();
        let mut rng = StdRng::seed_from_u64(1);
        let mut market = BlackMarket::new();
        market.refresh_if_stale(&catalog, 3, 600, Utc::now(), &mut rng);
        assert!(market.offer(0).is_none());
        assert_eq!(market.offer(1), market.offers().first());
        assert!(market.offer(4).is_none());
    }

    #[test]
    fn small_catalog_is_taken_whole() {
        let catalog = builtin_market()[..2].to_vec();
        let mut rng = StdRng::seed_from_u64(1);
        let mut market = BlackMarket::new();
        market.refresh_if_stale(&catalog, 3, 600, Utc::now(), &mut rng);
        assert_eq!(market.offers().len(), 2);
    }
}
