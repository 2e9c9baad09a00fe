use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use redb::{Database, ReadableTable, TableDefinition};
use serde::{de::DeserializeOwned, Serialize};

use super::model::{
    PaymentNotification, StickerRequest, Transaction, User, Vehicle, VehicleSetting,
    WhitelistedIp,
};

type Table = TableDefinition<'static, &'static str, &'static [u8]>;

const USERS: Table = TableDefinition::new("users");
const VEHICLES: Table = TableDefinition::new("vehicles");
const TRANSACTIONS: Table = TableDefinition::new("transactions");
const STICKER_REQUESTS: Table = TableDefinition::new("sticker_requests");
const PAYMENT_NOTIFICATIONS: Table = TableDefinition::new("payment_notifications");
const WHITELISTED_IPS: Table = TableDefinition::new("whitelisted_ips");
const VEHICLE_SETTINGS: Table = TableDefinition::new("vehicle_settings");

const ALL_TABLES: [Table; 7] = [
    USERS,
    VEHICLES,
    TRANSACTIONS,
    STICKER_REQUESTS,
    PAYMENT_NOTIFICATIONS,
    WHITELISTED_IPS,
    VEHICLE_SETTINGS,
];

/// An entity persisted in its own table, keyed by id.
pub trait Record: Serialize + DeserializeOwned {
    const TABLE: Table;

    fn id(&self) -> &str;

    fn created_at(&self) -> i64;

    /// Soft-deleted records are skipped by every default read.
    fn deleted_at(&self) -> Option<i64> {
        None
    }

    fn is_live(&self) -> bool {
        self.deleted_at().is_none()
    }
}

/// Records that are retired by stamping `deleted_at` instead of removal.
pub trait SoftDelete: Record {
    fn set_deleted_at(&mut self, at: i64);
}

macro_rules! record {
    ($ty:ty, $table:expr) => {
        impl Record for $ty {
            const TABLE: Table = $table;
            fn id(&self) -> &str {
                &self.id
            }
            fn created_at(&self) -> i64 {
                self.created_at
            }
        }
    };
    ($ty:ty, $table:expr, soft_delete) => {
        impl Record for $ty {
            const TABLE: Table = $table;
            fn id(&self) -> &str {
                &self.id
            }
            fn created_at(&self) -> i64 {
                self.created_at
            }
            fn deleted_at(&self) -> Option<i64> {
                self.deleted_at
            }
        }

        impl SoftDelete for $ty {
            fn set_deleted_at(&mut self, at: i64) {
                self.deleted_at = Some(at);
            }
        }
    };
}

record!(User, USERS, soft_delete);
record!(Vehicle, VEHICLES, soft_delete);
record!(Transaction, TRANSACTIONS, soft_delete);
record!(StickerRequest, STICKER_REQUESTS, soft_delete);
record!(PaymentNotification, PAYMENT_NOTIFICATIONS);
record!(WhitelistedIp, WHITELISTED_IPS);
record!(VehicleSetting, VEHICLE_SETTINGS);

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    pub page: u32,
    pub per_page: u32,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<R> {
    pub items: Vec<R>,
    pub total: usize,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

impl<R> Page<R> {
    pub fn map<T>(self, f: impl FnMut(R) -> T) -> Page<T> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            total_pages: self.total_pages,
        }
    }
}

#[derive(Clone)]
pub struct Store {
    db: Arc<Database>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path).context("open redb database")?;

        let write_txn = db.begin_write()?;
        for table in ALL_TABLES {
            write_txn.open_table(table)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Insert or overwrite a record.
    pub fn insert<R: Record>(&self, record: &R) -> Result<()> {
        let bytes = encode(record)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(R::TABLE)?;
            table.insert(record.id(), bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Fetch a record by id, soft-deleted or not.
    pub fn get<R: Record>(&self, id: &str) -> Result<Option<R>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(R::TABLE)?;
        let record = match table.get(id)? {
            Some(v) => Some(decode(v.value())?),
            None => None,
        };
        Ok(record)
    }

    /// Fetch a record by id unless it has been soft-deleted.
    pub fn find<R: Record>(&self, id: &str) -> Result<Option<R>> {
        Ok(self.get::<R>(id)?.filter(R::is_live))
    }

    /// All live records matching `filter`, newest first.
    pub fn list<R: Record>(&self, filter: impl Fn(&R) -> bool) -> Result<Vec<R>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(R::TABLE)?;
        scan(&table, filter)
    }

    pub fn count<R: Record>(&self, filter: impl Fn(&R) -> bool) -> Result<usize> {
        Ok(self.list(filter)?.len())
    }

    /// One page of live records plus the total, read from a single snapshot
    /// so the count matches the page.
    pub fn page<R: Record>(&self, query: PageQuery, filter: impl Fn(&R) -> bool) -> Result<Page<R>> {
        let per_page = query.per_page.max(1);
        let page = query.page.max(1);

        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(R::TABLE)?;
        let matching = scan(&table, filter)?;

        let total = matching.len();
        let offset = (page as usize - 1).saturating_mul(per_page as usize);
        let items = matching
            .into_iter()
            .skip(offset)
            .take(per_page as usize)
            .collect();

        Ok(Page {
            items,
            total,
            page,
            per_page,
            total_pages: u32::try_from(total.div_ceil(per_page as usize)).unwrap_or(u32::MAX),
        })
    }

    /// Insert `record` unless `check` rejects it. `check` sees every live
    /// record of the table from inside the same write transaction, so
    /// uniqueness rules cannot race a concurrent insert.
    pub fn insert_checked<R: Record, E: From<anyhow::Error>>(
        &self,
        record: &R,
        check: impl FnOnce(&[R]) -> Result<(), E>,
    ) -> Result<(), E> {
        self.insert_within(record, check)?
    }

    /// Apply `f` to a live record inside one write transaction. Returns the
    /// updated record, or `None` if it does not exist.
    pub fn update<R: Record>(&self, id: &str, f: impl FnOnce(&mut R)) -> Result<Option<R>> {
        let updated = self.modify::<R, std::convert::Infallible>(id, false, |r, _| {
            f(r);
            Ok(())
        })?;
        Ok(updated.unwrap_or_else(|never| match never {}))
    }

    /// Like [`Store::update`], but `f` may refuse the change. A refusal
    /// aborts the transaction and leaves the record untouched.
    pub fn try_update<R: Record, E: From<anyhow::Error>>(
        &self,
        id: &str,
        f: impl FnOnce(&mut R) -> Result<(), E>,
    ) -> Result<Option<R>, E> {
        self.modify(id, false, |r, _| f(r))?
    }

    /// Like [`Store::try_update`], with the other live records of the table
    /// passed alongside for uniqueness checks.
    pub fn try_update_among<R: Record, E: From<anyhow::Error>>(
        &self,
        id: &str,
        f: impl FnOnce(&mut R, &[R]) -> Result<(), E>,
    ) -> Result<Option<R>, E> {
        self.modify(id, true, f)?
    }

    // The outer result carries storage failures, the inner one the caller's
    // refusal. Only an inner `Ok` commits.
    fn modify<R: Record, E>(
        &self,
        id: &str,
        with_others: bool,
        f: impl FnOnce(&mut R, &[R]) -> Result<(), E>,
    ) -> Result<Result<Option<R>, E>> {
        let write_txn = self.db.begin_write()?;
        let outcome = {
            let mut table = write_txn.open_table(R::TABLE)?;
            let current: Option<R> = match table.get(id)? {
                Some(v) => Some(decode(v.value())?),
                None => None,
            };
            match current.filter(R::is_live) {
                Some(mut record) => {
                    let others = if with_others {
                        scan(&table, |r: &R| r.id() != id)?
                    } else {
                        Vec::new()
                    };
                    match f(&mut record, &others) {
                        Ok(()) => {
                            let bytes = encode(&record)?;
                            table.insert(id, bytes.as_slice())?;
                            Ok(Some(record))
                        }
                        Err(e) => Err(e),
                    }
                }
                None => Ok(None),
            }
        };
        if outcome.is_ok() {
            write_txn.commit()?;
        } else {
            write_txn.abort()?;
        }
        Ok(outcome)
    }

    fn insert_within<R: Record, E>(
        &self,
        record: &R,
        check: impl FnOnce(&[R]) -> Result<(), E>,
    ) -> Result<Result<(), E>> {
        let bytes = encode(record)?;
        let write_txn = self.db.begin_write()?;
        let outcome = {
            let mut table = write_txn.open_table(R::TABLE)?;
            let live = scan(&table, |_: &R| true)?;
            let outcome = check(&live);
            if outcome.is_ok() {
                table.insert(record.id(), bytes.as_slice())?;
            }
            outcome
        };
        if outcome.is_ok() {
            write_txn.commit()?;
        } else {
            write_txn.abort()?;
        }
        Ok(outcome)
    }

    /// Stamp `deleted_at`. Returns false if the record is missing or already
    /// deleted.
    pub fn soft_delete<R: SoftDelete>(&self, id: &str, now: i64) -> Result<bool> {
        Ok(self.update::<R>(id, |r| r.set_deleted_at(now))?.is_some())
    }

    /// Remove a record outright. Returns true if it existed.
    pub fn delete<R: Record>(&self, id: &str) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(R::TABLE)?;
            let existed = table.remove(id)?.is_some();
            existed
        };
        write_txn.commit()?;
        Ok(existed)
    }
}

fn scan<R: Record>(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
    filter: impl Fn(&R) -> bool,
) -> Result<Vec<R>> {
    let mut records = Vec::new();
    for item in table.iter()? {
        let (_k, v) = item?;
        let record: R = decode(v.value())?;
        if record.is_live() && filter(&record) {
            records.push(record);
        }
    }
    records.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| a.id().cmp(b.id()))
    });
    Ok(records)
}

fn encode<R: Serialize>(record: &R) -> Result<Vec<u8>> {
    bincode::serde::encode_to_vec(record, bincode::config::standard()).context("bincode encode")
}

fn decode<R: DeserializeOwned>(bytes: &[u8]) -> Result<R> {
    let (record, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .context("bincode decode")?;
    Ok(record)
}
