//! The consolidation engine — pure aggregation over an advance and its
//! items. No I/O lives here; orchestration and persistence are the API
//! layer's concern.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{advance::Advance, item::Item};

/// An advance is flagged "low" once its remaining balance drops under this
/// share of the disbursed amount.
const LOW_BALANCE_RATIO: Decimal = Decimal::from_parts(1, 0, 0, false, 1);

/// Days without any related movement before an open advance counts as stale.
const STALE_AFTER_DAYS: i64 = 30;

// ─── Per-advance aggregate ───────────────────────────────────────────────────

/// Per-advance consolidation figures — computed on demand, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConsolidationAggregate {
  pub items_count: usize,
  /// Sum of the linked items' amounts.
  pub total_spent: Decimal,
  /// `advance.amount − total_spent`. May be negative (overspend); clamping
  /// happens only when rolling up a legalization batch.
  pub remaining:   Decimal,
}

/// Compute the consolidation figures for one advance and its item set.
pub fn aggregate(advance: &Advance, items: &[Item]) -> ConsolidationAggregate {
  let total_spent: Decimal = items.iter().map(|i| i.amount).sum();
  ConsolidationAggregate {
    items_count: items.len(),
    total_spent,
    remaining: advance.amount - total_spent,
  }
}

// ─── Batch rollup ────────────────────────────────────────────────────────────

/// Legalization totals across a batch of advances. The two owed directions
/// are mutually exclusive per advance but summed independently here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LegalizationRollup {
  /// Σ `total_spent` across the batch.
  pub total_legalized:     Decimal,
  /// Σ non-negative `remaining` — what beneficiaries return to the
  /// organization.
  pub owed_to_org:         Decimal,
  /// Σ overspend — what the organization must reimburse beneficiaries.
  pub owed_to_beneficiary: Decimal,
}

/// Roll up per-advance aggregates into legalization totals for a period.
pub fn rollup<'a>(
  aggregates: impl IntoIterator<Item = &'a ConsolidationAggregate>,
) -> LegalizationRollup {
  let mut out = LegalizationRollup::default();
  for agg in aggregates {
    out.total_legalized += agg.total_spent;
    if agg.remaining >= Decimal::ZERO {
      out.owed_to_org += agg.remaining;
    } else {
      out.owed_to_beneficiary += -agg.remaining;
    }
  }
  out
}

// ─── Advisory signals ────────────────────────────────────────────────────────

/// Reporting signals for an open advance. Advisory only — they drive
/// warnings in read responses, never blocking validation or transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdvanceSignals {
  /// Remaining balance is under 10% of the disbursed amount.
  pub low_balance: bool,
  /// No related movement (disbursement or item expense) in over 30 days.
  pub stale:       bool,
}

/// Compute the advisory signals for an advance as of `today`.
/// Consolidated advances never signal.
pub fn signals(
  advance: &Advance,
  items: &[Item],
  agg: &ConsolidationAggregate,
  today: NaiveDate,
) -> AdvanceSignals {
  if !advance.is_open() {
    return AdvanceSignals { low_balance: false, stale: false };
  }

  let low_balance = agg.remaining < advance.amount * LOW_BALANCE_RATIO;

  let last_movement = items
    .iter()
    .map(|i| i.date)
    .max()
    .map_or(advance.date, |d| d.max(advance.date));
  let stale = (today - last_movement).num_days() > STALE_AFTER_DAYS;

  AdvanceSignals { low_balance, stale }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use rust_decimal::Decimal;

  use super::*;
  use crate::store::RecordId;

  fn date(s: &str) -> NaiveDate { s.parse().unwrap() }

  fn advance(amount: i64) -> Advance {
    Advance {
      id:              RecordId::from("recAdvance000000001"),
      date:            date("2025-03-01"),
      beneficiary:     "Marta Rojas".to_string(),
      tax_id:          "52.841.990".to_string(),
      concept:         "Gastos de oficina".to_string(),
      amount:          Decimal::from(amount),
      registered_by:   "contabilidad".to_string(),
      consolidated_on: None,
      snapshot_url:    None,
      attachment_url:  None,
      item_ids:        Vec::new(),
    }
  }

  fn item(id: &str, amount: i64, on: &str) -> Item {
    Item {
      id:             RecordId::from(id),
      date:           date(on),
      beneficiary:    "Papeleria El Punto".to_string(),
      tax_id:         "900.123.456".to_string(),
      concept:        "Resmas de papel".to_string(),
      cost_center:    "Administracion".to_string(),
      amount:         Decimal::from(amount),
      registered_by:  "contabilidad".to_string(),
      advance_ids:    vec![RecordId::from("recAdvance000000001")],
      attachment_url: None,
    }
  }

  // ── aggregate ─────────────────────────────────────────────────────────

  #[test]
  fn aggregate_sums_items_and_computes_remaining() {
    let adv = advance(100_000);
    let items = vec![
      item("recItem1", 30_000, "2025-03-05"),
      item("recItem2", 50_000, "2025-03-10"),
    ];

    let agg = aggregate(&adv, &items);
    assert_eq!(agg.items_count, 2);
    assert_eq!(agg.total_spent, Decimal::from(80_000));
    assert_eq!(agg.remaining, Decimal::from(20_000));
  }

  #[test]
  fn aggregate_allows_negative_remaining() {
    let adv = advance(100_000);
    let items = vec![item("recItem1", 130_000, "2025-03-05")];

    let agg = aggregate(&adv, &items);
    assert_eq!(agg.total_spent, Decimal::from(130_000));
    assert_eq!(agg.remaining, Decimal::from(-30_000));
  }

  #[test]
  fn aggregate_of_no_items_is_full_remaining() {
    let adv = advance(75_000);
    let agg = aggregate(&adv, &[]);
    assert_eq!(agg.items_count, 0);
    assert_eq!(agg.total_spent, Decimal::ZERO);
    assert_eq!(agg.remaining, Decimal::from(75_000));
  }

  // ── rollup ────────────────────────────────────────────────────────────

  #[test]
  fn rollup_underspent_advance_owes_org() {
    let adv = advance(100_000);
    let items = vec![
      item("recItem1", 30_000, "2025-03-05"),
      item("recItem2", 50_000, "2025-03-10"),
    ];
    let agg = aggregate(&adv, &items);

    let total = rollup([&agg]);
    assert_eq!(total.total_legalized, Decimal::from(80_000));
    assert_eq!(total.owed_to_org, Decimal::from(20_000));
    assert_eq!(total.owed_to_beneficiary, Decimal::ZERO);
  }

  #[test]
  fn rollup_overspent_advance_owes_beneficiary() {
    let adv = advance(100_000);
    let items = vec![item("recItem1", 130_000, "2025-03-05")];
    let agg = aggregate(&adv, &items);

    let total = rollup([&agg]);
    assert_eq!(total.total_legalized, Decimal::from(130_000));
    assert_eq!(total.owed_to_org, Decimal::ZERO);
    assert_eq!(total.owed_to_beneficiary, Decimal::from(30_000));
  }

  #[test]
  fn rollup_sums_both_directions_independently() {
    let under = aggregate(&advance(100_000), &[item("a", 80_000, "2025-03-05")]);
    let over  = aggregate(&advance(50_000),  &[item("b", 65_000, "2025-03-06")]);
    let even  = aggregate(&advance(40_000),  &[item("c", 40_000, "2025-03-07")]);

    let total = rollup([&under, &over, &even]);
    assert_eq!(total.total_legalized, Decimal::from(185_000));
    assert_eq!(total.owed_to_org, Decimal::from(20_000));
    assert_eq!(total.owed_to_beneficiary, Decimal::from(15_000));
  }

  // ── signals ───────────────────────────────────────────────────────────

  #[test]
  fn low_balance_below_ten_percent() {
    let adv = advance(100_000);
    let items = vec![item("recItem1", 95_000, "2025-03-05")];
    let agg = aggregate(&adv, &items);

    let s = signals(&adv, &items, &agg, date("2025-03-06"));
    assert!(s.low_balance);
  }

  #[test]
  fn exactly_ten_percent_is_not_low() {
    let adv = advance(100_000);
    let items = vec![item("recItem1", 90_000, "2025-03-05")];
    let agg = aggregate(&adv, &items);

    let s = signals(&adv, &items, &agg, date("2025-03-06"));
    assert!(!s.low_balance);
  }

  #[test]
  fn stale_after_thirty_days_without_movement() {
    let adv = advance(100_000);
    let items = vec![item("recItem1", 10_000, "2025-03-10")];
    let agg = aggregate(&adv, &items);

    let s = signals(&adv, &items, &agg, date("2025-04-09"));
    assert!(!s.stale, "exactly 30 days since the last movement");

    let s = signals(&adv, &items, &agg, date("2025-04-10"));
    assert!(s.stale);
  }

  #[test]
  fn item_movement_resets_staleness_from_advance_date() {
    let adv = advance(100_000);
    let items = vec![item("recItem1", 10_000, "2025-03-25")];
    let agg = aggregate(&adv, &items);

    // 40 days after disbursement, 15 after the last expense.
    let s = signals(&adv, &items, &agg, date("2025-04-09"));
    assert!(!s.stale);
  }

  #[test]
  fn consolidated_advance_never_signals() {
    let mut adv = advance(100_000);
    adv.consolidated_on = Some(date("2025-03-20"));
    let items = vec![item("recItem1", 99_000, "2025-03-05")];
    let agg = aggregate(&adv, &items);

    let s = signals(&adv, &items, &agg, date("2025-12-31"));
    assert!(!s.low_balance);
    assert!(!s.stale);
  }
}
