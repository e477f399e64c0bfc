//! In-memory fakes for orchestrator and router tests. The fakes honour the
//! same contracts the real backends do: stale ids report `NotFound`,
//! injected faults report `Upstream`, and the object store keeps real
//! key/byte state so cleanup can be asserted.

use std::{
  collections::HashMap,
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
};

use caja_attach::{AttachmentManager, KeyResolver};
use caja_core::{
  Error, RecordId, Result,
  advance::{Advance, AdvancePatch, NewAdvance},
  external::{
    AttachmentFetcher, DeleteOutcome, NotificationDispatcher, ObjectStore,
    OutboundMessage,
  },
  item::{Item, ItemPatch, NewItem},
  store::{LedgerStore, Period},
};
use caja_notify::HtmlSnapshotRenderer;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::{
  AppState,
  cascade::CascadeDeleter,
  consolidate::Consolidator,
  limit::RateLimiter,
};

pub fn date(s: &str) -> NaiveDate { s.parse().unwrap() }

// ─── Fake ledger ─────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeLedger {
  pub advances:             Mutex<HashMap<RecordId, Advance>>,
  pub items:                Mutex<HashMap<RecordId, Item>>,
  pub fail_item_deletes:    AtomicBool,
  pub fail_advance_updates: AtomicBool,
  next_id:                  AtomicUsize,
}

impl FakeLedger {
  fn alloc(&self, prefix: &str) -> RecordId {
    let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
    RecordId::new(format!("{prefix}{n:03}"))
  }

  pub fn seed_advance(
    &self,
    on: &str,
    amount: i64,
    attachment_url: Option<&str>,
  ) -> Advance {
    let advance = Advance {
      id:              self.alloc("recAdv"),
      date:            date(on),
      beneficiary:     "Marta Rojas".to_string(),
      tax_id:          "52.841.990".to_string(),
      concept:         "Gastos de oficina".to_string(),
      amount:          Decimal::from(amount),
      registered_by:   "contabilidad".to_string(),
      consolidated_on: None,
      snapshot_url:    None,
      attachment_url:  attachment_url.map(str::to_string),
      item_ids:        Vec::new(),
    };
    self
      .advances
      .lock()
      .unwrap()
      .insert(advance.id.clone(), advance.clone());
    advance
  }

  pub fn seed_item(
    &self,
    advance_id: &RecordId,
    on: &str,
    amount: i64,
    attachment_url: Option<&str>,
  ) -> Item {
    let item = Item {
      id:             self.alloc("recItem"),
      date:           date(on),
      beneficiary:    "Papeleria El Punto".to_string(),
      tax_id:         "900.123.456".to_string(),
      concept:        "Resmas de papel".to_string(),
      cost_center:    "Administracion".to_string(),
      amount:         Decimal::from(amount),
      registered_by:  "contabilidad".to_string(),
      advance_ids:    vec![advance_id.clone()],
      attachment_url: attachment_url.map(str::to_string),
    };
    self.items.lock().unwrap().insert(item.id.clone(), item.clone());
    if let Some(adv) = self.advances.lock().unwrap().get_mut(advance_id) {
      adv.item_ids.push(item.id.clone());
    }
    item
  }

  pub fn advance(&self, id: &RecordId) -> Option<Advance> {
    self.advances.lock().unwrap().get(id).cloned()
  }

  pub fn item_count(&self) -> usize { self.items.lock().unwrap().len() }
}

impl LedgerStore for FakeLedger {
  async fn create_advance(&self, new: NewAdvance) -> Result<Advance> {
    let advance = Advance {
      id:              self.alloc("recAdv"),
      date:            new.date,
      beneficiary:     new.beneficiary,
      tax_id:          new.tax_id,
      concept:         new.concept,
      amount:          new.amount,
      registered_by:   new.registered_by,
      consolidated_on: None,
      snapshot_url:    None,
      attachment_url:  new.attachment_url,
      item_ids:        Vec::new(),
    };
    self
      .advances
      .lock()
      .unwrap()
      .insert(advance.id.clone(), advance.clone());
    Ok(advance)
  }

  async fn get_advance(&self, id: &RecordId) -> Result<Option<Advance>> {
    Ok(self.advances.lock().unwrap().get(id).cloned())
  }

  async fn list_advances(&self, period: Period) -> Result<Vec<Advance>> {
    let mut advances: Vec<Advance> = self
      .advances
      .lock()
      .unwrap()
      .values()
      .filter(|a| period.contains(a.date))
      .cloned()
      .collect();
    advances.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(advances)
  }

  async fn update_advance(
    &self,
    id: &RecordId,
    patch: AdvancePatch,
  ) -> Result<Advance> {
    if self.fail_advance_updates.load(Ordering::SeqCst) {
      return Err(Error::upstream("record store", "injected update failure"));
    }
    let mut advances = self.advances.lock().unwrap();
    let advance = advances
      .get_mut(id)
      .ok_or_else(|| Error::not_found("advances", id.as_str()))?;

    if let Some(v) = patch.date {
      advance.date = v;
    }
    if let Some(v) = patch.beneficiary {
      advance.beneficiary = v;
    }
    if let Some(v) = patch.tax_id {
      advance.tax_id = v;
    }
    if let Some(v) = patch.concept {
      advance.concept = v;
    }
    if let Some(v) = patch.amount {
      advance.amount = v;
    }
    if let Some(v) = patch.registered_by {
      advance.registered_by = v;
    }
    if let Some(v) = patch.consolidated_on {
      advance.consolidated_on = Some(v);
    }
    if let Some(v) = patch.snapshot_url {
      advance.snapshot_url = Some(v);
    }
    if let Some(v) = patch.attachment_url {
      advance.attachment_url = v;
    }
    Ok(advance.clone())
  }

  async fn delete_advance_row(&self, id: &RecordId) -> Result<()> {
    self
      .advances
      .lock()
      .unwrap()
      .remove(id)
      .map(|_| ())
      .ok_or_else(|| Error::not_found("advances", id.as_str()))
  }

  async fn create_items(&self, new: Vec<NewItem>) -> Result<Vec<Item>> {
    let mut created = Vec::with_capacity(new.len());
    for input in new {
      let item = Item {
        id:             self.alloc("recItem"),
        date:           input.date,
        beneficiary:    input.beneficiary,
        tax_id:         input.tax_id,
        concept:        input.concept,
        cost_center:    input.cost_center,
        amount:         input.amount,
        registered_by:  input.registered_by,
        advance_ids:    vec![input.advance_id.clone()],
        attachment_url: input.attachment_url,
      };
      self.items.lock().unwrap().insert(item.id.clone(), item.clone());
      if let Some(adv) = self.advances.lock().unwrap().get_mut(&input.advance_id)
      {
        adv.item_ids.push(item.id.clone());
      }
      created.push(item);
    }
    Ok(created)
  }

  async fn get_item(&self, id: &RecordId) -> Result<Option<Item>> {
    Ok(self.items.lock().unwrap().get(id).cloned())
  }

  async fn update_item(&self, id: &RecordId, patch: ItemPatch) -> Result<Item> {
    let mut items = self.items.lock().unwrap();
    let item = items
      .get_mut(id)
      .ok_or_else(|| Error::not_found("items", id.as_str()))?;

    if let Some(v) = patch.date {
      item.date = v;
    }
    if let Some(v) = patch.beneficiary {
      item.beneficiary = v;
    }
    if let Some(v) = patch.tax_id {
      item.tax_id = v;
    }
    if let Some(v) = patch.concept {
      item.concept = v;
    }
    if let Some(v) = patch.cost_center {
      item.cost_center = v;
    }
    if let Some(v) = patch.amount {
      item.amount = v;
    }
    if let Some(v) = patch.registered_by {
      item.registered_by = v;
    }
    if let Some(v) = patch.attachment_url {
      item.attachment_url = v;
    }
    Ok(item.clone())
  }

  async fn delete_item_rows(&self, ids: &[RecordId]) -> Result<()> {
    if self.fail_item_deletes.load(Ordering::SeqCst) {
      return Err(Error::upstream("record store", "injected delete failure"));
    }
    let mut items = self.items.lock().unwrap();
    for id in ids {
      items
        .remove(id)
        .ok_or_else(|| Error::not_found("items", id.as_str()))?;
    }
    Ok(())
  }

  async fn items_for_advance(&self, advance_id: &RecordId) -> Result<Vec<Item>> {
    let mut items: Vec<Item> = self
      .items
      .lock()
      .unwrap()
      .values()
      .filter(|i| i.advance_ids.contains(advance_id))
      .cloned()
      .collect();
    items.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(items)
  }
}

// ─── Fake object store ───────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeObjects {
  pub objects:      Mutex<HashMap<String, Vec<u8>>>,
  pub fail_puts:    AtomicBool,
  pub fail_deletes: AtomicBool,
}

impl FakeObjects {
  pub fn seed(&self, key: &str, bytes: &[u8]) -> String {
    self.objects.lock().unwrap().insert(key.to_string(), bytes.to_vec());
    format!("https://bucket.s3.amazonaws.com/{key}")
  }

  pub fn contains(&self, key: &str) -> bool {
    self.objects.lock().unwrap().contains_key(key)
  }
}

impl ObjectStore for FakeObjects {
  async fn put(
    &self,
    key: &str,
    bytes: Vec<u8>,
    _content_type: &str,
  ) -> Result<String> {
    if self.fail_puts.load(Ordering::SeqCst) {
      return Err(Error::upstream("object store", "injected put failure"));
    }
    self.objects.lock().unwrap().insert(key.to_string(), bytes);
    Ok(format!("https://bucket.s3.amazonaws.com/{key}"))
  }

  async fn delete(&self, key: &str) -> Result<DeleteOutcome> {
    if self.fail_deletes.load(Ordering::SeqCst) {
      return Ok(DeleteOutcome::Unexpected(503));
    }
    Ok(match self.objects.lock().unwrap().remove(key) {
      Some(_) => DeleteOutcome::Removed,
      None => DeleteOutcome::Missing,
    })
  }
}

// ─── Fake dispatcher and fetcher ─────────────────────────────────────────────

#[derive(Default)]
pub struct FakeDispatcher {
  pub sent: Mutex<Vec<OutboundMessage>>,
  pub fail: AtomicBool,
}

impl NotificationDispatcher for FakeDispatcher {
  async fn send(&self, message: &OutboundMessage) -> Result<()> {
    if self.fail.load(Ordering::SeqCst) {
      return Err(Error::upstream("mail", "injected dispatch failure"));
    }
    self.sent.lock().unwrap().push(message.clone());
    Ok(())
  }
}

#[derive(Default)]
pub struct FakeFetcher {
  pub bodies: Mutex<HashMap<String, Vec<u8>>>,
}

impl FakeFetcher {
  pub fn seed(&self, url: &str, bytes: &[u8]) {
    self.bodies.lock().unwrap().insert(url.to_string(), bytes.to_vec());
  }
}

impl AttachmentFetcher for FakeFetcher {
  async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
    self
      .bodies
      .lock()
      .unwrap()
      .get(url)
      .cloned()
      .ok_or_else(|| Error::upstream("attachment fetch", format!("no body for {url}")))
  }
}

// ─── Harness ─────────────────────────────────────────────────────────────────

pub type TestState =
  AppState<FakeLedger, FakeObjects, HtmlSnapshotRenderer, FakeDispatcher, FakeFetcher>;

pub struct Harness {
  pub ledger:     Arc<FakeLedger>,
  pub objects:    Arc<FakeObjects>,
  pub dispatcher: Arc<FakeDispatcher>,
  pub fetcher:    Arc<FakeFetcher>,
  pub state:      TestState,
}

/// Wire the fake backends exactly the way `main` wires the real ones.
pub fn harness_with_limit(max_requests: usize) -> Harness {
  let ledger = Arc::new(FakeLedger::default());
  let objects = Arc::new(FakeObjects::default());
  let dispatcher = Arc::new(FakeDispatcher::default());
  let fetcher = Arc::new(FakeFetcher::default());

  let attachments = Arc::new(AttachmentManager::new(
    Arc::clone(&objects),
    KeyResolver::new("bucket"),
    "caja_menor/",
  ));
  let consolidator = Arc::new(Consolidator::new(
    Arc::clone(&ledger),
    Arc::clone(&objects),
    Arc::new(HtmlSnapshotRenderer),
    Arc::clone(&dispatcher),
    Arc::clone(&fetcher),
    vec!["tesoreria@example.com".to_string()],
    "caja_menor/",
  ));
  let cascade =
    Arc::new(CascadeDeleter::new(Arc::clone(&ledger), Arc::clone(&attachments)));

  let state = AppState {
    ledger: Arc::clone(&ledger),
    attachments,
    consolidator,
    cascade,
    limiter: Arc::new(RateLimiter::new(
      max_requests,
      std::time::Duration::from_secs(60),
    )),
  };

  Harness { ledger, objects, dispatcher, fetcher, state }
}

pub fn harness() -> Harness { harness_with_limit(1_000) }
