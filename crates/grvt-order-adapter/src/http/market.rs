/*
[INPUT]:  Environment market-data endpoints
[OUTPUT]: Instrument listings and catalogs
[POS]:    HTTP layer - public market-data reads (idempotent, retried)
[UPDATE]: When adding market-data endpoints or changing response format
*/

use tracing::info;

use crate::catalog::InstrumentCatalog;
use crate::http::client::PreparedRequest;
use crate::http::dispatcher::{ApiCall, BlockingDispatcher, RequestDispatcher};
use crate::http::Result;
use crate::types::{AllInstrumentsRequest, InstrumentInfo, InstrumentsResponse};

impl RequestDispatcher {
    /// List active instruments
    ///
    /// POST {market_data}/full/v1/all_instruments
    pub async fn fetch_instruments(&self) -> Result<Vec<InstrumentInfo>> {
        let request = PreparedRequest::post(
            self.endpoints().instruments_url(),
            &AllInstrumentsRequest::default(),
        )?;
        let response: InstrumentsResponse = self
            .send(ApiCall::new("all_instruments", request).idempotent())
            .await?;

        info!(
            env = %self.endpoints().env,
            count = response.result.len(),
            "instruments fetched"
        );
        Ok(response.result)
    }

    pub async fn fetch_catalog(&self) -> Result<InstrumentCatalog> {
        let listing = self.fetch_instruments().await?;
        InstrumentCatalog::from_listing(&listing)
    }
}

impl BlockingDispatcher {
    pub fn fetch_instruments(&self) -> Result<Vec<InstrumentInfo>> {
        self.block_on(self.inner().fetch_instruments())?
    }

    pub fn fetch_catalog(&self) -> Result<InstrumentCatalog> {
        self.block_on(self.inner().fetch_catalog())?
    }
}
