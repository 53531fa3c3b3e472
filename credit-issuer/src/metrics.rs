//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `credit_validations_total` - Transfer validations processed
//! - `credit_transfers_denied_total` - Soft-denied transfers (frozen or defaulted senders)
//! - `credit_periods_renewed_total` - Period renewals
//! - `credit_defaults_total` - Credit line defaults
//! - `credit_written_off_total` - Credit volume written off to network debt
//! - `credit_lines_active` - Currently open credit lines

use prometheus::{Counter, IntCounter, IntGauge, Registry};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Transfer validations processed
    pub validations_total: IntCounter,

    /// Soft-denied transfers
    pub transfers_denied_total: IntCounter,

    /// Period renewals
    pub periods_renewed_total: IntCounter,

    /// Credit line defaults
    pub defaults_total: IntCounter,

    /// Credit volume written off to network debt
    pub written_off_total: Counter,

    /// Currently open credit lines
    pub lines_active: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    ///
    /// Each collector owns its registry, so independent issuers never
    /// collide on metric names.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let validations_total = IntCounter::new(
            "credit_validations_total",
            "Transfer validations processed",
        )?;
        registry.register(Box::new(validations_total.clone()))?;

        let transfers_denied_total = IntCounter::new(
            "credit_transfers_denied_total",
            "Soft-denied transfers",
        )?;
        registry.register(Box::new(transfers_denied_total.clone()))?;

        let periods_renewed_total = IntCounter::new(
            "credit_periods_renewed_total",
            "Period renewals",
        )?;
        registry.register(Box::new(periods_renewed_total.clone()))?;

        let defaults_total = IntCounter::new(
            "credit_defaults_total",
            "Credit line defaults",
        )?;
        registry.register(Box::new(defaults_total.clone()))?;

        let written_off_total = Counter::new(
            "credit_written_off_total",
            "Credit volume written off to network debt",
        )?;
        registry.register(Box::new(written_off_total.clone()))?;

        let lines_active = IntGauge::new(
            "credit_lines_active",
            "Currently open credit lines",
        )?;
        registry.register(Box::new(lines_active.clone()))?;

        Ok(Self {
            validations_total,
            transfers_denied_total,
            periods_renewed_total,
            defaults_total,
            written_off_total,
            lines_active,
            registry,
        })
    }

    /// Record a transfer validation
    pub fn record_validation(&self) {
        self.validations_total.inc();
    }

    /// Record a soft-denied transfer
    pub fn record_transfer_denied(&self) {
        self.transfers_denied_total.inc();
    }

    /// Record a period renewal
    pub fn record_period_renewed(&self) {
        self.periods_renewed_total.inc();
    }

    /// Record a credit line opening
    pub fn record_credit_line_opened(&self) {
        self.lines_active.inc();
    }

    /// Record a default and the volume it wrote off
    pub fn record_default(&self, written_off: Decimal) {
        self.defaults_total.inc();
        self.written_off_total
            .inc_by(written_off.to_f64().unwrap_or(0.0));
        self.lines_active.dec();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("validations_total", &self.validations_total.get())
            .field("defaults_total", &self.defaults_total.get())
            .finish()
    }
}
