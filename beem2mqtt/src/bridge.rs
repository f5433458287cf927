use crate::beem_api::{BeemBackend, Credentials, Period};
use crate::error::ApiError;
use crate::metric_collector::MetricCollector;
use crate::session::Session;

use log::{debug, info, log_enabled, warn, Level};

/// Drives one fetch and publish pass per call.
pub struct Bridge<B: BeemBackend> {
    backend: B,
    session: Session,
}

impl<B: BeemBackend> Bridge<B> {
    pub fn new(backend: B, credentials: Credentials) -> Self {
        Self {
            backend,
            session: Session::new(credentials),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run a cycle for the current month. Returns the number of boxes the collector published.
    pub fn run_cycle(&mut self, collector: &mut dyn MetricCollector) -> Result<usize, ApiError> {
        self.run_cycle_for(collector, Period::current())
    }

    pub fn run_cycle_for(
        &mut self,
        collector: &mut dyn MetricCollector,
        period: Period,
    ) -> Result<usize, ApiError> {
        let token = self.session.token(&self.backend)?;

        let boxes = match self.backend.box_summary(&token, period) {
            Ok(boxes) => boxes,
            Err(e) => {
                if e.is_unauthorized() {
                    warn!("access token rejected, logging in again on the next cycle");
                    self.session.invalidate();
                }
                return Err(e);
            }
        };

        if log_enabled!(Level::Debug) {
            match serde_json::to_string_pretty(&boxes) {
                Ok(dump) => debug!("box summary: {dump}"),
                Err(e) => debug!("failed to render box summary: {e}"),
            }
        }

        if boxes.is_empty() {
            info!(
                "no boxes reported for {:02}/{}, nothing to publish",
                period.month, period.year
            );
            return Ok(0);
        }

        Ok(collector.publish(&boxes))
    }
}
