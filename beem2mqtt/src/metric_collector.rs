use crate::beem_api::BoxSummary;

pub trait MetricCollector {
    /// Publish every box, returning how many were actually sent.
    fn publish(&mut self, boxes: &[BoxSummary]) -> usize;
}
