use crate::types::{DateTime, Utc};

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

pub mod price {
    use std::collections::{BTreeMap, BTreeSet};

    use crate::types::Decimal;

    /// A market-data provider able to quote several tokens in one request.
    #[allow(async_fn_in_trait)]
    #[trait_variant::make(Send)]
    #[cfg_attr(feature = "test-helpers", mockall::automock)]
    pub trait Api {
        /// USD prices keyed by token id. Ids the provider doesn't know are
        /// left out of the result.
        async fn prices(
            &self,
            token_ids: BTreeSet<String>,
        ) -> crate::Result<BTreeMap<String, Decimal>>;
    }

    #[cfg(feature = "test-helpers")]
    pub mod testing {
        use std::{
            collections::{BTreeMap, BTreeSet},
            sync::{
                Arc, Mutex,
                atomic::{AtomicBool, Ordering},
            },
            time::Duration,
        };

        use super::Api;
        use crate::{Error, types::Decimal};

        /// Serves preconfigured prices and records every batch it was asked for.
        #[derive(Debug, Clone, Default)]
        pub struct RecordingPriceApi {
            prices: Arc<Mutex<BTreeMap<String, Decimal>>>,
            requests: Arc<Mutex<Vec<BTreeSet<String>>>>,
            failing: Arc<AtomicBool>,
            latency: Option<Duration>,
        }

        impl RecordingPriceApi {
            pub fn new<'a>(prices: impl IntoIterator<Item = (&'a str, Decimal)>) -> Self {
                let prices = prices
                    .into_iter()
                    .map(|(id, price)| (id.to_string(), price))
                    .collect();

                Self {
                    prices: Arc::new(Mutex::new(prices)),
                    ..Default::default()
                }
            }

            /// Every request sleeps this long before answering.
            pub fn with_latency(mut self, latency: Duration) -> Self {
                self.latency = Some(latency);
                self
            }

            pub fn set_price(&self, token_id: &str, price: Decimal) {
                self.prices
                    .lock()
                    .expect("lock not poisoned")
                    .insert(token_id.to_string(), price);
            }

            pub fn set_failing(&self, failing: bool) {
                self.failing.store(failing, Ordering::SeqCst);
            }

            pub fn requests(&self) -> Vec<BTreeSet<String>> {
                self.requests.lock().expect("lock not poisoned").clone()
            }

            pub fn request_count(&self) -> usize {
                self.requests.lock().expect("lock not poisoned").len()
            }
        }

        impl Api for RecordingPriceApi {
            async fn prices(
                &self,
                token_ids: BTreeSet<String>,
            ) -> crate::Result<BTreeMap<String, Decimal>> {
                self.requests
                    .lock()
                    .expect("lock not poisoned")
                    .push(token_ids.clone());

                if let Some(latency) = self.latency {
                    tokio::time::sleep(latency).await;
                }

                if self.failing.load(Ordering::SeqCst) {
                    return Err(Error::UpstreamUnavailable(
                        "price provider is down".to_string(),
                    ));
                }

                let prices = self.prices.lock().expect("lock not poisoned");
                Ok(token_ids
                    .into_iter()
                    .filter_map(|id| prices.get(&id).map(|price| (id, *price)))
                    .collect())
            }
        }
    }
}
