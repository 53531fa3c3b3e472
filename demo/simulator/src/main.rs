// Credit Simulator - drives a full member lifecycle against the issuer
//
// Two members take credit lines: one earns income and renews cleanly, the
// other ignores their obligations, freezes in grace, and defaults. Time is
// driven by the manual clock so the whole 120-day window plays out instantly.

use anyhow::Result;
use chrono::{Duration, TimeZone, Utc};
use credit_issuer::{CreditIssuer, IssuerConfig, ManualClock, SyncOutcome};
use credit_ledger::{InMemoryLedger, LedgerService, MemberId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

const ISSUER: &str = "treasury";

fn transfer(
    issuer: &CreditIssuer,
    ledger: &InMemoryLedger,
    from: &MemberId,
    to: &MemberId,
    amount: Decimal,
) -> Result<bool> {
    // the validation hook runs exactly once, before the balance mutation
    if issuer.validate_transaction(from, to, amount)? {
        ledger.apply_transfer(from, to, amount)?;
        tracing::info!(%from, %to, %amount, "transfer settled");
        Ok(true)
    } else {
        tracing::info!(%from, %to, %amount, "transfer skipped by issuer");
        Ok(false)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let clock = Arc::new(ManualClock::starting_at(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));
    let ledger = Arc::new(InMemoryLedger::new());
    let config = IssuerConfig {
        issuers: vec![ISSUER.to_string()],
        ..IssuerConfig::default()
    };
    let issuer = CreditIssuer::new(&config, ledger.clone())?.with_clock(clock.clone());

    let mut notifications = issuer.subscribe();
    let treasury = MemberId::new(ISSUER);
    let baker = MemberId::new("baker");
    let grocer = MemberId::new("grocer");
    let market = MemberId::new("market");

    tracing::info!("opening credit lines (90d period, 30d grace, 10% minimum ITD)");
    for member in [&baker, &grocer] {
        issuer.initialize_credit_line(
            &treasury,
            member,
            config.default_period(),
            config.default_grace(),
            dec!(1000),
            config.default_fee_rate,
            config.default_min_itd,
            Decimal::ZERO,
        )?;
    }

    // both members spend into the network
    transfer(&issuer, &ledger, &baker, &market, dec!(400))?;
    transfer(&issuer, &ledger, &grocer, &market, dec!(250))?;

    // only the baker earns income back before the period ends
    clock.advance(Duration::days(45));
    transfer(&issuer, &ledger, &market, &baker, dec!(60))?;

    // past expiration: the grocer freezes, the baker keeps trading
    clock.advance(Duration::days(50));
    tracing::info!(
        baker_frozen = issuer.is_frozen(&baker)?,
        grocer_frozen = issuer.is_frozen(&grocer)?,
        grocer_needs = %issuer.needed_income_of(&grocer)?,
        "grace window status at day 95"
    );
    transfer(&issuer, &ledger, &baker, &market, dec!(20))?;
    transfer(&issuer, &ledger, &grocer, &market, dec!(20))?; // skipped

    // the grace window runs out; the next sync applies the lazy transitions
    clock.advance(Duration::days(30));
    let baker_outcome = issuer.sync_credit_period(&baker)?;
    let grocer_outcome = issuer.sync_credit_period(&grocer)?;
    assert_eq!(baker_outcome, SyncOutcome::Renewed);
    assert_eq!(grocer_outcome, SyncOutcome::Defaulted);

    while let Ok(event) = notifications.try_recv() {
        tracing::info!(member = %event.member, kind = ?event.kind, "notification");
    }

    tracing::info!(
        baker_balance = %ledger.balance_of(&baker),
        grocer_balance = %ledger.balance_of(&grocer),
        grocer_limit = %ledger.credit_limit(&grocer)?,
        network_debt = %ledger.network_debt()?,
        defaults = issuer.metrics().defaults_total.get(),
        renewals = issuer.metrics().periods_renewed_total.get(),
        "simulation complete"
    );

    Ok(())
}
